// libs/appointment-cell/src/services/store/memory.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::models::{Appointment, AppointmentFilter, NewAppointment};
use super::{AppointmentStore, StoreError};

/// Process-local store used when no database is configured, and in tests.
#[derive(Default)]
pub struct InMemoryAppointmentStore {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a record verbatim, bypassing id and timestamp assignment.
    pub async fn seed(&self, appointment: Appointment) {
        self.appointments.write().await.insert(appointment.id, appointment);
    }

    pub async fn len(&self) -> usize {
        self.appointments.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.appointments.read().await.is_empty()
    }
}

fn sort_by_schedule(appointments: &mut [Appointment]) {
    appointments.sort_by(|a, b| {
        (a.date, a.start_time, a.created_at).cmp(&(b.date, b.start_time, b.created_at))
    });
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn find_by_doctor_and_date(
        &self,
        doctor_name: &str,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, StoreError> {
        let filter = AppointmentFilter {
            doctor_name: Some(doctor_name.to_string()),
            date: Some(date),
            status: None,
        };
        self.list(&filter).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        Ok(self.appointments.read().await.get(&id).cloned())
    }

    async fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, StoreError> {
        let mut matching: Vec<Appointment> = self
            .appointments
            .read()
            .await
            .values()
            .filter(|appointment| filter.matches(appointment))
            .cloned()
            .collect();

        sort_by_schedule(&mut matching);
        Ok(matching)
    }

    async fn insert(&self, appointment: NewAppointment) -> Result<Appointment, StoreError> {
        let now = Utc::now();
        let record = Appointment {
            id: Uuid::new_v4(),
            patient_name: appointment.patient_name,
            doctor_name: appointment.doctor_name,
            date: appointment.date,
            start_time: appointment.start_time,
            end_time: appointment.end_time,
            reason: appointment.reason,
            status: appointment.status,
            created_at: now,
            updated_at: now,
        };

        debug!("Storing appointment {} in memory", record.id);
        self.appointments.write().await.insert(record.id, record.clone());
        Ok(record)
    }

    async fn replace(&self, id: Uuid, appointment: Appointment) -> Result<Option<Appointment>, StoreError> {
        let mut appointments = self.appointments.write().await;

        let Some(existing) = appointments.get_mut(&id) else {
            return Ok(None);
        };

        *existing = Appointment {
            id,
            created_at: existing.created_at,
            updated_at: Utc::now(),
            ..appointment
        };

        Ok(Some(existing.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.appointments.write().await.remove(&id).is_some())
    }
}
