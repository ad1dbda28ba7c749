use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::BillingConfig;
use crate::decimal::{Money, Rate};
use crate::errors::{BillingError, Result};
use crate::schedule::{Installment, LoanTerms, ScheduleGenerator};
use crate::types::{LoanId, LoanStatus};

/// accepted payment, never mutated after creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub week_number: u32,
    pub amount: Money,
    pub payment_date: DateTime<Utc>,
    pub successful: bool,
}

/// flat-rate weekly installment loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub terms: LoanTerms,
    pub weekly_payment: Money,
    pub start_date: DateTime<Utc>,
    total_interest: Money,
    total_repayment: Money,
    installments: Vec<Installment>,
    payment_history: Vec<PaymentRecord>,
}

impl Loan {
    /// validate terms and build the schedule
    pub fn originate(
        id: LoanId,
        terms: LoanTerms,
        start_date: DateTime<Utc>,
        generator: &ScheduleGenerator,
    ) -> Result<Self> {
        let installments = generator.generate(&terms, start_date)?;

        Ok(Self {
            id,
            weekly_payment: terms.weekly_payment()?,
            total_interest: terms.total_interest()?,
            total_repayment: terms.total_repayment()?,
            terms,
            start_date,
            installments,
            payment_history: Vec::new(),
        })
    }

    pub fn principal(&self) -> Money {
        self.terms.principal
    }

    pub fn interest_rate(&self) -> Rate {
        self.terms.interest_rate
    }

    pub fn term_weeks(&self) -> u32 {
        self.terms.term_weeks
    }

    pub fn total_interest(&self) -> Money {
        self.total_interest
    }

    pub fn total_repayment(&self) -> Money {
        self.total_repayment
    }

    /// due date of the final installment
    pub fn maturity_date(&self) -> DateTime<Utc> {
        self.installments
            .last()
            .map(|i| i.due_date)
            .unwrap_or(self.start_date)
    }

    pub fn installments(&self) -> &[Installment] {
        &self.installments
    }

    pub fn payment_history(&self) -> &[PaymentRecord] {
        &self.payment_history
    }

    pub fn next_unpaid(&self) -> Option<&Installment> {
        self.installments.iter().find(|i| !i.paid)
    }

    pub fn is_fully_paid(&self) -> bool {
        self.next_unpaid().is_none()
    }

    pub fn unpaid_count(&self) -> u32 {
        self.installments.iter().filter(|i| !i.paid).count() as u32
    }

    pub fn total_paid(&self) -> Money {
        self.payment_history.iter().map(|r| r.amount).sum()
    }

    /// every unpaid installment, due or not
    pub fn remaining_balance(&self) -> Money {
        self.installments
            .iter()
            .filter(|i| !i.paid)
            .map(|i| i.amount)
            .sum()
    }

    pub fn overdue_installments(&self, as_of: DateTime<Utc>) -> impl Iterator<Item = &Installment> {
        self.installments.iter().filter(move |i| i.is_overdue(as_of))
    }

    /// unpaid amount due strictly before `as_of`
    pub fn outstanding_at(&self, as_of: DateTime<Utc>) -> Money {
        self.overdue_installments(as_of).map(|i| i.amount).sum()
    }

    /// scans from the latest installment back and stops once more than
    /// `threshold` overdue-and-unpaid installments have been seen
    pub fn is_delinquent_at(&self, as_of: DateTime<Utc>, threshold: u32) -> bool {
        let mut missed = 0;
        for installment in self.installments.iter().rev() {
            if installment.is_overdue(as_of) {
                missed += 1;
                if missed > threshold {
                    return true;
                }
            }
        }
        false
    }

    pub fn status(&self, as_of: DateTime<Utc>, config: &BillingConfig) -> LoanStatus {
        if self.is_fully_paid() {
            LoanStatus::Settled
        } else if self.is_delinquent_at(as_of, config.delinquency_threshold) {
            LoanStatus::Delinquent
        } else {
            LoanStatus::Current
        }
    }

    /// apply an exact weekly payment to the oldest unpaid installment
    pub fn apply_payment(&mut self, amount: Money, payment_date: DateTime<Utc>) -> Result<&PaymentRecord> {
        if amount != self.weekly_payment {
            return Err(BillingError::AmountMismatch {
                expected: self.weekly_payment,
                provided: amount,
            });
        }

        let installment = self
            .installments
            .iter_mut()
            .find(|i| !i.paid)
            .ok_or_else(|| BillingError::LoanFullyPaid {
                id: self.id.clone(),
            })?;

        installment.paid = true;
        let week_number = installment.week_number;

        self.payment_history.push(PaymentRecord {
            week_number,
            amount,
            payment_date,
            successful: true,
        });

        Ok(&self.payment_history[self.payment_history.len() - 1])
    }
}
