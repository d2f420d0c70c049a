// libs/appointment-cell/src/services/validation.rs
use std::sync::Arc;

use chrono::NaiveDate;
use mockable::Clock;
use tracing::debug;

use crate::models::{AppointmentError, TimeOfDay};
use crate::services::interval::TimeInterval;

/// Temporal rules every persisted appointment must satisfy.
///
/// "Today" comes from the injected clock so callers and tests agree on the
/// calendar date a write happens on.
pub struct SchedulingValidator {
    clock: Arc<dyn Clock + Send + Sync>,
}

impl SchedulingValidator {
    pub fn new(clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self { clock }
    }

    /// Current calendar date (UTC), without a time-of-day component.
    pub fn today(&self) -> NaiveDate {
        self.clock.utc().date_naive()
    }

    /// Checks the interval first, then the date. The first failing rule wins.
    pub fn validate_window(
        &self,
        date: NaiveDate,
        start: TimeOfDay,
        end: TimeOfDay,
    ) -> Result<TimeInterval, AppointmentError> {
        let interval = TimeInterval::new(start, end);

        if !interval.is_non_empty() {
            debug!("Rejecting interval {}-{}: end is not after start", start, end);
            return Err(AppointmentError::InvalidInterval);
        }

        let today = self.today();
        if date < today {
            debug!("Rejecting date {}: earlier than {}", date, today);
            return Err(AppointmentError::PastDate);
        }

        Ok(interval)
    }
}
