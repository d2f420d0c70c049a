// libs/appointment-cell/src/services/store/mod.rs
use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Appointment, AppointmentError, AppointmentFilter, NewAppointment};

pub mod memory;
pub mod supabase;

pub use memory::InMemoryAppointmentStore;
pub use supabase::SupabaseAppointmentStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(#[from] anyhow::Error),

    #[error("Malformed appointment record: {0}")]
    Decode(String),
}

impl From<StoreError> for AppointmentError {
    fn from(error: StoreError) -> Self {
        AppointmentError::Internal(error.to_string())
    }
}

/// Persistence contract for appointments.
///
/// Implementations assign ids and timestamps; they never validate schedules.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// All appointments for one doctor on one date, ordered by start time.
    async fn find_by_doctor_and_date(
        &self,
        doctor_name: &str,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, StoreError>;

    /// Matching appointments ordered by date, then start time.
    async fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, StoreError>;

    async fn insert(&self, appointment: NewAppointment) -> Result<Appointment, StoreError>;

    /// Overwrites the mutable fields of `id`. Returns `None` if it no longer exists.
    async fn replace(&self, id: Uuid, appointment: Appointment) -> Result<Option<Appointment>, StoreError>;

    /// Returns whether a record was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}
