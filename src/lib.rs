pub mod config;
pub mod decimal;
pub mod engine;
pub mod errors;
pub mod events;
pub mod loan;
pub mod schedule;
pub mod serialization;
pub mod types;

// re-export key types
pub use config::BillingConfig;
pub use decimal::{Money, Rate};
pub use engine::BillingEngine;
pub use errors::{BillingError, Result};
pub use events::{Event, EventStore};
pub use loan::{Loan, PaymentRecord};
pub use schedule::{Installment, LoanTerms, ScheduleGenerator};
pub use serialization::LoanView;
pub use types::{LoanId, LoanStatus};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
