/// serialization support for loans
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::BillingConfig;
use crate::decimal::{Money, Rate};
use crate::loan::{Loan, PaymentRecord};
use crate::schedule::Installment;
use crate::types::{LoanId, LoanStatus};

/// serializable point-in-time view of a loan
#[derive(Debug, Serialize, Deserialize)]
pub struct LoanView {
    pub id: LoanId,
    pub as_of: DateTime<Utc>,
    pub status: LoanStatus,
    pub terms: TermsView,
    pub balances: BalanceView,
    pub schedule: Vec<Installment>,
    pub history: Vec<PaymentRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TermsView {
    pub principal: Money,
    pub interest_rate: Rate,
    pub term_weeks: u32,
    pub weekly_payment: Money,
    pub total_interest: Money,
    pub total_repayment: Money,
    pub start_date: DateTime<Utc>,
    pub maturity_date: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceView {
    pub outstanding: Money,
    pub remaining: Money,
    pub total_paid: Money,
    pub overdue_installments: u32,
    pub delinquent: bool,
}

impl LoanView {
    pub fn from_loan(loan: &Loan, as_of: DateTime<Utc>, config: &BillingConfig) -> Self {
        LoanView {
            id: loan.id.clone(),
            as_of,
            status: loan.status(as_of, config),
            terms: TermsView {
                principal: loan.principal(),
                interest_rate: loan.interest_rate(),
                term_weeks: loan.term_weeks(),
                weekly_payment: loan.weekly_payment,
                total_interest: loan.total_interest(),
                total_repayment: loan.total_repayment(),
                start_date: loan.start_date,
                maturity_date: loan.maturity_date(),
            },
            balances: BalanceView {
                outstanding: loan.outstanding_at(as_of),
                remaining: loan.remaining_balance(),
                total_paid: loan.total_paid(),
                overdue_installments: loan.overdue_installments(as_of).count() as u32,
                delinquent: loan.is_delinquent_at(as_of, config.delinquency_threshold),
            },
            schedule: loan.installments().to_vec(),
            history: loan.payment_history().to_vec(),
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
