// libs/appointment-cell/src/services/conflict.rs
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::CreateConflictPolicy;

use crate::models::{Appointment, AppointmentError, AppointmentStatus};
use crate::services::interval::TimeInterval;
use crate::services::store::AppointmentStore;

/// Which existing appointments can block a candidate slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictScope {
    /// Only `scheduled` appointments block.
    ScheduledOnly,
    /// Everything except `cancelled` blocks.
    NonCancelled,
}

impl ConflictScope {
    pub fn blocks(self, status: AppointmentStatus) -> bool {
        match self {
            ConflictScope::ScheduledOnly => status == AppointmentStatus::Scheduled,
            ConflictScope::NonCancelled => status != AppointmentStatus::Cancelled,
        }
    }
}

impl From<CreateConflictPolicy> for ConflictScope {
    fn from(policy: CreateConflictPolicy) -> Self {
        match policy {
            CreateConflictPolicy::Scheduled => ConflictScope::ScheduledOnly,
            CreateConflictPolicy::Active => ConflictScope::NonCancelled,
        }
    }
}

/// Returns every appointment in `bucket` that blocks `candidate`, ordered by
/// start time.
///
/// `bucket` must already be restricted to one doctor and one date.
pub fn find_conflicts(
    bucket: &[Appointment],
    candidate: &TimeInterval,
    exclude_id: Option<Uuid>,
    scope: ConflictScope,
) -> Vec<Appointment> {
    let mut conflicts: Vec<Appointment> = bucket
        .iter()
        .filter(|existing| Some(existing.id) != exclude_id)
        .filter(|existing| scope.blocks(existing.status))
        .filter(|existing| candidate.overlaps(&existing.interval()))
        .cloned()
        .collect();

    conflicts.sort_by_key(|appointment| (appointment.start_time, appointment.end_time));
    conflicts
}

pub struct ConflictDetectionService {
    store: Arc<dyn AppointmentStore>,
}

impl ConflictDetectionService {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self { store }
    }

    /// Loads the doctor's bucket for `date` and searches it for conflicts.
    pub async fn check_conflicts(
        &self,
        doctor_name: &str,
        date: NaiveDate,
        candidate: &TimeInterval,
        exclude_id: Option<Uuid>,
        scope: ConflictScope,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Checking conflicts for doctor {} on {} from {} to {}",
               doctor_name, date, candidate.start, candidate.end);

        let bucket = self.store.find_by_doctor_and_date(doctor_name, date).await?;
        let conflicts = find_conflicts(&bucket, candidate, exclude_id, scope);

        if !conflicts.is_empty() {
            warn!("Conflict detected for doctor {} on {} - {} conflicting appointments",
                  doctor_name, date, conflicts.len());
        }

        Ok(conflicts)
    }
}
