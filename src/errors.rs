use thiserror::Error;

use crate::decimal::{Money, Rate};
use crate::types::LoanId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BillingError {
    #[error("invalid loan parameters: principal {principal}, rate {rate}, term {term_weeks} weeks")]
    InvalidParameters {
        principal: Money,
        rate: Rate,
        term_weeks: u32,
    },

    #[error("loan already exists: {id}")]
    DuplicateLoan {
        id: LoanId,
    },

    #[error("loan not found: {id}")]
    LoanNotFound {
        id: LoanId,
    },

    #[error("payment must be exactly {expected}, provided {provided}")]
    AmountMismatch {
        expected: Money,
        provided: Money,
    },

    #[error("loan is already fully paid: {id}")]
    LoanFullyPaid {
        id: LoanId,
    },

    #[error("calculation error: {message}")]
    CalculationError {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, BillingError>;
