use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::decimal::{Money, Rate};
use crate::errors::{BillingError, Result};

/// one scheduled weekly obligation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub week_number: u32,
    pub due_date: DateTime<Utc>,
    pub amount: Money,
    pub paid: bool,
}

impl Installment {
    /// due strictly before `as_of` and still unpaid
    pub fn is_overdue(&self, as_of: DateTime<Utc>) -> bool {
        !self.paid && self.due_date < as_of
    }
}

impl fmt::Display for Installment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "week {}: {} (due: {}){}",
            self.week_number,
            self.amount.round_dp(2),
            self.due_date.format("%Y-%m-%d"),
            if self.paid { " paid" } else { "" }
        )
    }
}

/// flat-rate loan terms
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub principal: Money,
    pub interest_rate: Rate,
    pub term_weeks: u32,
}

impl LoanTerms {
    pub fn new(principal: Money, interest_rate: Rate, term_weeks: u32) -> Self {
        Self {
            principal,
            interest_rate,
            term_weeks,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.principal.is_positive() || !self.interest_rate.is_positive() || self.term_weeks == 0 {
            return Err(BillingError::InvalidParameters {
                principal: self.principal,
                rate: self.interest_rate,
                term_weeks: self.term_weeks,
            });
        }
        Ok(())
    }

    /// interest charged once over the full term
    pub fn total_interest(&self) -> Result<Money> {
        self.principal
            .checked_flat_charge(self.interest_rate)
            .ok_or_else(|| out_of_range("total interest"))
    }

    pub fn total_repayment(&self) -> Result<Money> {
        self.principal
            .checked_add(self.total_interest()?)
            .ok_or_else(|| out_of_range("total repayment"))
    }

    /// total repayment split evenly; remainders are not redistributed
    pub fn weekly_payment(&self) -> Result<Money> {
        let term = Decimal::from(self.term_weeks.max(1));
        let weekly = self
            .total_repayment()?
            .checked_div(term)
            .ok_or_else(|| out_of_range("weekly payment"))?;

        // bounds every running sum over the schedule
        weekly
            .checked_mul(term)
            .ok_or_else(|| out_of_range("scheduled total"))?;

        Ok(weekly)
    }
}

fn out_of_range(what: &str) -> BillingError {
    BillingError::CalculationError {
        message: format!("{} exceeds the representable range", what),
    }
}

/// builds the fixed installment schedule for a loan
#[derive(Debug, Clone, Copy)]
pub struct ScheduleGenerator {
    interval: Duration,
}

impl Default for ScheduleGenerator {
    fn default() -> Self {
        Self::weekly()
    }
}

impl ScheduleGenerator {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn weekly() -> Self {
        Self::new(Duration::days(7))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// `start_date` plus `week_number` intervals, `None` past the calendar range
    pub fn due_date(&self, start_date: DateTime<Utc>, week_number: u32) -> Option<DateTime<Utc>> {
        let periods = i32::try_from(week_number).ok()?;
        let offset = self.interval.checked_mul(periods)?;
        start_date.checked_add_signed(offset)
    }

    /// generate `term_weeks` equal installments, the first due one interval after `start_date`
    pub fn generate(&self, terms: &LoanTerms, start_date: DateTime<Utc>) -> Result<Vec<Installment>> {
        terms.validate()?;

        let weekly_payment = terms.weekly_payment()?;

        // due dates only grow, so the last one bounds the rest
        self.due_date(start_date, terms.term_weeks)
            .ok_or_else(|| out_of_range("maturity date"))?;

        (1..=terms.term_weeks)
            .map(|week_number| -> Result<Installment> {
                let due_date = self
                    .due_date(start_date, week_number)
                    .ok_or_else(|| out_of_range("due date"))?;
                Ok(Installment {
                    week_number,
                    due_date,
                    amount: weekly_payment,
                    paid: false,
                })
            })
            .collect()
    }
}
