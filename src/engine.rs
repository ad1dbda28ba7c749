use std::collections::HashMap;

use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use log::{debug, info, warn};

use crate::config::BillingConfig;
use crate::decimal::{Money, Rate};
use crate::errors::{BillingError, Result};
use crate::events::{Event, EventStore};
use crate::loan::{Loan, PaymentRecord};
use crate::schedule::{Installment, LoanTerms, ScheduleGenerator};
use crate::types::{LoanId, LoanStatus};

/// owns a collection of loans and is the only thing that mutates them
#[derive(Debug)]
pub struct BillingEngine {
    config: BillingConfig,
    generator: ScheduleGenerator,
    loans: HashMap<LoanId, Loan>,
    events: EventStore,
}

impl Default for BillingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl BillingEngine {
    pub fn new() -> Self {
        let config = BillingConfig::default();
        Self {
            generator: ScheduleGenerator::new(config.installment_interval()),
            config,
            loans: HashMap::new(),
            events: EventStore::new(),
        }
    }

    pub fn with_config(config: BillingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            generator: ScheduleGenerator::new(config.installment_interval()),
            config,
            loans: HashMap::new(),
            events: EventStore::new(),
        })
    }

    pub fn config(&self) -> &BillingConfig {
        &self.config
    }

    /// create a loan and its schedule; nothing is inserted on failure
    pub fn create_loan(
        &mut self,
        id: impl Into<LoanId>,
        principal: Money,
        interest_rate: Rate,
        term_weeks: u32,
        start_date: DateTime<Utc>,
    ) -> Result<&Loan> {
        let id = id.into();
        let terms = LoanTerms::new(principal, interest_rate, term_weeks);

        if let Err(err) = terms.validate() {
            warn!("rejected loan {}: {}", id, err);
            return Err(err);
        }

        if self.loans.contains_key(&id) {
            warn!("rejected loan {}: identifier already exists", id);
            return Err(BillingError::DuplicateLoan { id });
        }

        let loan = match Loan::originate(id.clone(), terms, start_date, &self.generator) {
            Ok(loan) => loan,
            Err(err) => {
                warn!("rejected loan {}: {}", id, err);
                return Err(err);
            }
        };

        info!(
            "created loan {}: principal {}, rate {}, {} weeks at {}",
            loan.id,
            loan.principal(),
            loan.interest_rate(),
            loan.term_weeks(),
            loan.weekly_payment
        );

        self.events.emit(Event::LoanCreated {
            loan_id: loan.id.clone(),
            principal: loan.principal(),
            interest_rate: loan.interest_rate(),
            term_weeks: loan.term_weeks(),
            weekly_payment: loan.weekly_payment,
            start_date: loan.start_date,
            maturity_date: loan.maturity_date(),
        });

        Ok(self.loans.entry(id).or_insert(loan))
    }

    /// pay the oldest unpaid installment; `amount` must equal the weekly payment exactly
    pub fn make_payment(&mut self, id: &str, amount: Money, payment_date: DateTime<Utc>) -> Result<()> {
        let loan = self.loans.get_mut(id).ok_or_else(|| {
            warn!("payment rejected: loan {} not found", id);
            BillingError::LoanNotFound { id: id.to_string() }
        })?;

        let record = match loan.apply_payment(amount, payment_date) {
            Ok(record) => record.clone(),
            Err(err) => {
                warn!("payment rejected for loan {}: {}", id, err);
                return Err(err);
            }
        };

        let remaining_installments = loan.unpaid_count();
        debug!(
            "loan {} week {} paid {} on {}, {} installments remaining",
            id, record.week_number, record.amount, record.payment_date, remaining_installments
        );

        self.events.emit(Event::PaymentReceived {
            loan_id: id.to_string(),
            week_number: record.week_number,
            amount: record.amount,
            timestamp: record.payment_date,
            remaining_installments,
        });

        if remaining_installments == 0 {
            info!("loan {} settled with week {}", id, record.week_number);
            self.events.emit(Event::LoanSettled {
                loan_id: id.to_string(),
                final_week: record.week_number,
                timestamp: record.payment_date,
            });
        }

        Ok(())
    }

    /// make a payment dated at the provider's current time
    pub fn make_payment_with(
        &mut self,
        id: &str,
        amount: Money,
        time_provider: &SafeTimeProvider,
    ) -> Result<()> {
        self.make_payment(id, amount, time_provider.now())
    }

    /// overdue unpaid amount as of `as_of`; unknown loans have zero balance
    pub fn get_outstanding(&self, id: &str, as_of: DateTime<Utc>) -> Money {
        match self.loans.get(id) {
            Some(loan) => {
                let outstanding = loan.outstanding_at(as_of);
                debug!("loan {} outstanding as of {}: {}", id, as_of, outstanding);
                outstanding
            }
            None => Money::ZERO,
        }
    }

    pub fn get_outstanding_with(&self, id: &str, time_provider: &SafeTimeProvider) -> Money {
        self.get_outstanding(id, time_provider.now())
    }

    /// false when `as_of` is unset or the loan is unknown
    pub fn is_delinquent(&self, id: &str, as_of: impl Into<Option<DateTime<Utc>>>) -> bool {
        let as_of: Option<DateTime<Utc>> = as_of.into();
        let Some(as_of) = as_of else {
            return false;
        };

        match self.loans.get(id) {
            Some(loan) => {
                let delinquent = loan.is_delinquent_at(as_of, self.config.delinquency_threshold);
                debug!("loan {} delinquent as of {}: {}", id, as_of, delinquent);
                delinquent
            }
            None => false,
        }
    }

    pub fn is_delinquent_with(&self, id: &str, time_provider: &SafeTimeProvider) -> bool {
        self.is_delinquent(id, time_provider.now())
    }

    pub fn get_payment_schedule(&self, id: &str) -> Result<&[Installment]> {
        self.require(id).map(Loan::installments)
    }

    pub fn get_payment_history(&self, id: &str) -> Result<&[PaymentRecord]> {
        self.require(id).map(Loan::payment_history)
    }

    pub fn loan_status(&self, id: &str, as_of: DateTime<Utc>) -> Result<LoanStatus> {
        self.require(id).map(|loan| loan.status(as_of, &self.config))
    }

    pub fn get_loan(&self, id: &str) -> Option<&Loan> {
        self.loans.get(id)
    }

    /// identifiers in ascending order
    pub fn loan_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.loans.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn loan_count(&self) -> usize {
        self.loans.len()
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    fn require(&self, id: &str) -> Result<&Loan> {
        self.loans.get(id).ok_or_else(|| BillingError::LoanNotFound { id: id.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use hourglass_rs::TimeSource;
    use rust_decimal_macros::dec;
    use test_log::test;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap()
    }

    fn days(n: i64) -> DateTime<Utc> {
        t0() + Duration::days(n)
    }

    fn weekly() -> Money {
        Money::from_major(110_000)
    }

    fn engine_with_standard_loan() -> BillingEngine {
        let mut engine = BillingEngine::new();
        engine
            .create_loan(
                "100",
                Money::from_major(5_000_000),
                Rate::from_decimal(dec!(0.10)),
                50,
                t0(),
            )
            .unwrap();
        engine
    }

    #[test]
    fn test_create_loan() {
        let mut engine = BillingEngine::new();
        let loan = engine
            .create_loan(
                "100",
                Money::from_major(5_000_000),
                Rate::from_decimal(dec!(0.10)),
                50,
                t0(),
            )
            .unwrap();

        assert_eq!(loan.id, "100");
        assert_eq!(loan.principal(), Money::from_major(5_000_000));
        assert_eq!(loan.interest_rate(), Rate::from_percentage(10));
        assert_eq!(loan.term_weeks(), 50);
        assert_eq!(loan.weekly_payment, weekly());
        assert_eq!(loan.installments().len(), 50);
        assert_eq!(loan.installments()[0].due_date, days(7));
        assert_eq!(loan.installments()[49].due_date, days(350));

        assert_eq!(engine.loan_count(), 1);
        assert!(matches!(engine.events()[0], Event::LoanCreated { term_weeks: 50, .. }));
    }

    #[test]
    fn test_invalid_parameters_insert_nothing() {
        let mut engine = BillingEngine::new();
        let cases = [
            ("zero principal", Money::ZERO, Rate::from_percentage(10), 50),
            ("negative principal", Money::from_major(-1_000), Rate::from_percentage(10), 50),
            ("zero interest", Money::from_major(5_000_000), Rate::ZERO, 50),
            ("negative interest", Money::from_major(5_000_000), Rate::from_decimal(dec!(-0.10)), 50),
            ("zero term", Money::from_major(5_000_000), Rate::from_percentage(10), 0),
        ];

        for (name, principal, rate, term) in cases {
            let result = engine.create_loan("100", principal, rate, term, t0());
            assert!(
                matches!(result, Err(BillingError::InvalidParameters { .. })),
                "{} should be rejected",
                name
            );
        }
        assert_eq!(engine.loan_count(), 0);
        assert!(engine.events().is_empty());
    }

    #[test]
    fn test_unrepresentable_loan_is_rejected() {
        let mut engine = BillingEngine::new();

        let err = engine
            .create_loan(
                "x",
                Money::from_major(i64::MAX),
                Rate::from_decimal(dec!(10000000000)),
                50,
                t0(),
            )
            .unwrap_err();
        assert!(matches!(err, BillingError::CalculationError { .. }));

        let late = DateTime::<Utc>::MAX_UTC - Duration::days(3);
        let err = engine
            .create_loan("x", Money::from_major(1_000), Rate::from_percentage(10), 1, late)
            .unwrap_err();
        assert!(matches!(err, BillingError::CalculationError { .. }));

        assert_eq!(engine.loan_count(), 0);
        assert!(engine.events().is_empty());

        // the identifier stays free for a valid loan
        assert!(engine
            .create_loan("x", Money::from_major(i64::MAX), Rate::from_percentage(10), 50, t0())
            .is_ok());
    }

    #[test]
    fn test_duplicate_loan_keeps_original() {
        let mut engine = engine_with_standard_loan();
        engine.make_payment("100", weekly(), days(7)).unwrap();
        let before = engine.get_loan("100").cloned().unwrap();
        let event_count = engine.events().len();

        let err = engine
            .create_loan("100", Money::from_major(6_000_000), Rate::from_percentage(15), 60, t0())
            .unwrap_err();
        assert_eq!(err, BillingError::DuplicateLoan { id: "100".to_string() });

        assert_eq!(engine.get_loan("100"), Some(&before));
        assert_eq!(engine.events().len(), event_count);
    }

    #[test]
    fn test_invalid_parameters_checked_before_duplicate() {
        let mut engine = engine_with_standard_loan();
        let err = engine
            .create_loan("100", Money::ZERO, Rate::from_percentage(10), 50, t0())
            .unwrap_err();
        assert!(matches!(err, BillingError::InvalidParameters { .. }));
    }

    #[test]
    fn test_outstanding_scenario() {
        let mut engine = engine_with_standard_loan();
        engine.make_payment("100", weekly(), days(7)).unwrap();
        engine.make_payment("100", weekly(), days(14)).unwrap();

        assert_eq!(engine.get_outstanding("100", t0()), Money::ZERO);
        // week 3 falls due exactly at day 21 so only counts after it
        assert_eq!(engine.get_outstanding("100", days(21)), Money::ZERO);
        assert_eq!(engine.get_outstanding("100", days(21) + Duration::hours(1)), weekly());
        assert_eq!(
            engine.get_outstanding("100", days(35) + Duration::hours(1)),
            Money::from_major(330_000)
        );
    }

    #[test]
    fn test_outstanding_after_all_payments() {
        let mut engine = engine_with_standard_loan();
        for week in 1..=50 {
            engine.make_payment("100", weekly(), days(7 * week)).unwrap();
        }
        assert_eq!(engine.get_outstanding("100", t0()), Money::ZERO);
        assert_eq!(engine.get_outstanding("100", days(400)), Money::ZERO);
    }

    #[test]
    fn test_unknown_loan_queries_default() {
        let engine = engine_with_standard_loan();
        assert_eq!(engine.get_outstanding("999", days(400)), Money::ZERO);
        assert!(!engine.is_delinquent("999", days(400)));
    }

    #[test]
    fn test_unknown_loan_operations_fail() {
        let mut engine = BillingEngine::new();
        let not_found = BillingError::LoanNotFound { id: "999".to_string() };

        assert_eq!(engine.make_payment("999", weekly(), t0()).unwrap_err(), not_found);
        assert_eq!(engine.get_payment_schedule("999").unwrap_err(), not_found);
        assert_eq!(engine.get_payment_history("999").unwrap_err(), not_found);
        assert_eq!(engine.loan_status("999", t0()).unwrap_err(), not_found);
    }

    #[test]
    fn test_amount_mismatch_changes_nothing() {
        let mut engine = engine_with_standard_loan();
        engine.take_events();

        let err = engine
            .make_payment("100", Money::from_major(100_000), days(7))
            .unwrap_err();
        assert_eq!(
            err,
            BillingError::AmountMismatch {
                expected: weekly(),
                provided: Money::from_major(100_000),
            }
        );

        let schedule = engine.get_payment_schedule("100").unwrap();
        assert!(schedule.iter().all(|i| !i.paid));
        assert!(engine.get_payment_history("100").unwrap().is_empty());
        assert!(engine.events().is_empty());
    }

    #[test]
    fn test_payment_marks_lowest_unpaid() {
        let mut engine = engine_with_standard_loan();
        engine.make_payment("100", weekly(), days(30)).unwrap();

        let schedule = engine.get_payment_schedule("100").unwrap();
        assert!(schedule[0].paid);
        assert_eq!(schedule.iter().filter(|i| i.paid).count(), 1);

        let history = engine.get_payment_history("100").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].week_number, 1);
        assert_eq!(history[0].payment_date, days(30));
        assert!(history[0].successful);
    }

    #[test]
    fn test_fully_paid_rejects_and_settles() {
        let mut engine = engine_with_standard_loan();
        for week in 1..=50 {
            engine.make_payment("100", weekly(), days(7 * week)).unwrap();
        }

        let events = engine.take_events();
        assert!(matches!(
            events.last(),
            Some(Event::LoanSettled { final_week: 50, .. })
        ));
        assert_eq!(engine.loan_status("100", days(400)).unwrap(), LoanStatus::Settled);

        let err = engine.make_payment("100", weekly(), days(357)).unwrap_err();
        assert_eq!(err, BillingError::LoanFullyPaid { id: "100".to_string() });
        assert_eq!(engine.get_payment_history("100").unwrap().len(), 50);
        assert!(engine.events().is_empty());
    }

    #[test]
    fn test_delinquency() {
        let mut engine = engine_with_standard_loan();
        engine.make_payment("100", weekly(), days(7)).unwrap();
        engine.make_payment("100", weekly(), days(14)).unwrap();

        assert!(!engine.is_delinquent("100", days(14)));
        assert!(!engine.is_delinquent("100", None::<DateTime<Utc>>));

        // weeks 3, 4 and 5 missed
        let later = days(14 + 21) + Duration::hours(1);
        assert!(engine.is_delinquent("100", later));
        assert!(engine.is_delinquent("100", Some(later)));
        assert_eq!(engine.get_outstanding("100", later), Money::from_major(330_000));
        assert_eq!(engine.loan_status("100", later).unwrap(), LoanStatus::Delinquent);

        // one payment brings the count back to two
        engine.make_payment("100", weekly(), later).unwrap();
        assert!(!engine.is_delinquent("100", later));
        assert_eq!(engine.get_outstanding("100", later), Money::from_major(220_000));
        assert_eq!(engine.loan_status("100", later).unwrap(), LoanStatus::Current);
    }

    #[test]
    fn test_configured_threshold() {
        let config = BillingConfig {
            delinquency_threshold: 0,
            ..BillingConfig::default()
        };
        let mut engine = BillingEngine::with_config(config).unwrap();
        engine
            .create_loan("a", Money::from_major(1_000), Rate::from_percentage(10), 10, t0())
            .unwrap();

        assert!(!engine.is_delinquent("a", days(7)));
        assert!(engine.is_delinquent("a", days(7) + Duration::seconds(1)));
    }

    #[test]
    fn test_with_config_rejects_invalid() {
        let config = BillingConfig {
            installment_interval_days: 0,
            ..BillingConfig::default()
        };
        assert!(matches!(
            BillingEngine::with_config(config),
            Err(BillingError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_independent_engines() {
        let mut first = engine_with_standard_loan();
        let second = BillingEngine::new();

        first.make_payment("100", weekly(), days(7)).unwrap();
        assert!(second.get_loan("100").is_none());
        assert_eq!(second.get_outstanding("100", days(400)), Money::ZERO);
    }

    #[test]
    fn test_loan_ids_sorted() {
        let mut engine = BillingEngine::new();
        for id in ["300", "100", "200"] {
            engine
                .create_loan(id, Money::from_major(1_000), Rate::from_percentage(5), 4, t0())
                .unwrap();
        }
        assert_eq!(engine.loan_ids(), vec!["100", "200", "300"]);
    }

    #[test]
    fn test_time_provider_variants() {
        let time = SafeTimeProvider::new(TimeSource::Test(t0()));
        let controller = time.test_control().unwrap();
        let mut engine = engine_with_standard_loan();

        controller.advance(Duration::days(7));
        engine.make_payment_with("100", weekly(), &time).unwrap();
        assert_eq!(engine.get_payment_history("100").unwrap()[0].payment_date, days(7));

        // weeks 2 through 5 now overdue
        controller.advance(Duration::days(28) + Duration::hours(1));
        assert_eq!(engine.get_outstanding_with("100", &time), Money::from_major(440_000));
        assert!(engine.is_delinquent_with("100", &time));
    }
}
