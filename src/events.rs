use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::types::LoanId;

/// events emitted by the billing engine on successful mutations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    LoanCreated {
        loan_id: LoanId,
        principal: Money,
        interest_rate: Rate,
        term_weeks: u32,
        weekly_payment: Money,
        start_date: DateTime<Utc>,
        maturity_date: DateTime<Utc>,
    },
    PaymentReceived {
        loan_id: LoanId,
        week_number: u32,
        amount: Money,
        timestamp: DateTime<Utc>,
        remaining_installments: u32,
    },
    LoanSettled {
        loan_id: LoanId,
        final_week: u32,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    pub fn loan_id(&self) -> &str {
        match self {
            Event::LoanCreated { loan_id, .. }
            | Event::PaymentReceived { loan_id, .. }
            | Event::LoanSettled { loan_id, .. } => loan_id,
        }
    }
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_take_events_drains() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut store = EventStore::new();
        store.emit(Event::LoanSettled {
            loan_id: "100".to_string(),
            final_week: 50,
            timestamp: now,
        });

        assert_eq!(store.len(), 1);
        assert_eq!(store.events()[0].loan_id(), "100");

        let taken = store.take_events();
        assert_eq!(taken.len(), 1);
        assert!(store.is_empty());
    }
}
