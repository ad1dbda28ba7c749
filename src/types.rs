use serde::{Deserialize, Serialize};

/// caller-chosen loan identifier
pub type LoanId = String;

/// loan status as of a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    /// not delinquent, installments remain
    Current,
    /// overdue-and-unpaid count exceeds the delinquency threshold
    Delinquent,
    /// every installment paid
    Settled,
}
