// libs/appointment-cell/src/services/store/supabase.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::models::{Appointment, AppointmentFilter, AppointmentStatus, NewAppointment, TimeOfDay};
use super::{AppointmentStore, StoreError};

const APPOINTMENTS_PATH: &str = "/rest/v1/appointments";

/// Row shape of the `appointments` table (snake_case columns, text times).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AppointmentRow {
    id: Uuid,
    patient_name: String,
    doctor_name: String,
    date: NaiveDate,
    start_time: TimeOfDay,
    end_time: TimeOfDay,
    #[serde(default)]
    reason: Option<String>,
    status: AppointmentStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AppointmentRow> for Appointment {
    fn from(row: AppointmentRow) -> Self {
        Appointment {
            id: row.id,
            patient_name: row.patient_name,
            doctor_name: row.doctor_name,
            date: row.date,
            start_time: row.start_time,
            end_time: row.end_time,
            reason: row.reason.unwrap_or_default(),
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<Appointment> for AppointmentRow {
    fn from(appointment: Appointment) -> Self {
        AppointmentRow {
            id: appointment.id,
            patient_name: appointment.patient_name,
            doctor_name: appointment.doctor_name,
            date: appointment.date,
            start_time: appointment.start_time,
            end_time: appointment.end_time,
            reason: Some(appointment.reason),
            status: appointment.status,
            created_at: appointment.created_at,
            updated_at: appointment.updated_at,
        }
    }
}

/// PostgREST-backed store over the Supabase `appointments` table.
pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn fetch_rows(&self, method: Method, path: &str, body: Option<Value>) -> Result<Vec<Appointment>, StoreError> {
        let result: Vec<Value> = self.supabase.request(method, path, body).await?;

        result.into_iter()
            .map(|row| {
                serde_json::from_value::<AppointmentRow>(row)
                    .map(Appointment::from)
                    .map_err(|e| StoreError::Decode(e.to_string()))
            })
            .collect()
    }

    fn to_body(row: &AppointmentRow) -> Result<Value, StoreError> {
        serde_json::to_value(row).map_err(|e| StoreError::Decode(e.to_string()))
    }
}

fn list_path(filter: &AppointmentFilter) -> String {
    let mut query_parts = Vec::new();

    if let Some(doctor_name) = &filter.doctor_name {
        query_parts.push(format!("doctor_name=eq.{}", urlencoding::encode(doctor_name)));
    }
    if let Some(date) = filter.date {
        query_parts.push(format!("date=eq.{}", date));
    }
    if let Some(status) = filter.status {
        query_parts.push(format!("status=eq.{}", status));
    }
    query_parts.push("order=date.asc,start_time.asc".to_string());

    format!("{}?{}", APPOINTMENTS_PATH, query_parts.join("&"))
}

fn by_id_path(id: Uuid) -> String {
    format!("{}?id=eq.{}", APPOINTMENTS_PATH, id)
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn find_by_doctor_and_date(
        &self,
        doctor_name: &str,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, StoreError> {
        let path = format!(
            "{}?doctor_name=eq.{}&date=eq.{}&order=start_time.asc",
            APPOINTMENTS_PATH,
            urlencoding::encode(doctor_name),
            date
        );
        self.fetch_rows(Method::GET, &path, None).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        let rows = self.fetch_rows(Method::GET, &by_id_path(id), None).await?;
        Ok(rows.into_iter().next())
    }

    async fn list(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, StoreError> {
        debug!("Listing appointments with filter {:?}", filter);
        self.fetch_rows(Method::GET, &list_path(filter), None).await
    }

    async fn insert(&self, appointment: NewAppointment) -> Result<Appointment, StoreError> {
        let now = Utc::now();
        let row = AppointmentRow {
            id: Uuid::new_v4(),
            patient_name: appointment.patient_name,
            doctor_name: appointment.doctor_name,
            date: appointment.date,
            start_time: appointment.start_time,
            end_time: appointment.end_time,
            reason: Some(appointment.reason),
            status: appointment.status,
            created_at: now,
            updated_at: now,
        };

        let rows = self
            .fetch_rows(Method::POST, APPOINTMENTS_PATH, Some(Self::to_body(&row)?))
            .await?;

        let created = rows.into_iter().next().ok_or_else(|| {
            StoreError::Backend(anyhow::anyhow!("Insert returned no representation"))
        })?;

        info!("Inserted appointment {} into Supabase", created.id);
        Ok(created)
    }

    async fn replace(&self, id: Uuid, appointment: Appointment) -> Result<Option<Appointment>, StoreError> {
        let row = AppointmentRow::from(Appointment {
            id,
            updated_at: Utc::now(),
            ..appointment
        });

        let mut body = Self::to_body(&row)?;
        if let Some(fields) = body.as_object_mut() {
            // Identity and creation time are immutable.
            fields.remove("id");
            fields.remove("created_at");
        }

        let rows = self.fetch_rows(Method::PATCH, &by_id_path(id), Some(body)).await?;
        Ok(rows.into_iter().next())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let rows = self.fetch_rows(Method::DELETE, &by_id_path(id), None).await?;
        Ok(!rows.is_empty())
    }
}
