// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::NaiveDate;
use mockable::{Clock, DefaultClock};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use shared_config::{AppConfig, CreateConflictPolicy};
use shared_database::supabase::SupabaseClient;

use crate::models::{
    parse_appointment_id, parse_date, parse_name, parse_time, Appointment, AppointmentError,
    AppointmentFilter, AppointmentListQuery, AppointmentStatus, BucketKey, ConflictCheckQuery,
    CreateAppointmentRequest, NewAppointment, TimeOfDay, UpdateAppointmentRequest,
};
use crate::services::conflict::{ConflictDetectionService, ConflictScope};
use crate::services::locking::BucketLocks;
use crate::services::store::{AppointmentStore, InMemoryAppointmentStore, SupabaseAppointmentStore};
use crate::services::validation::SchedulingValidator;

pub struct AppointmentBookingService {
    store: Arc<dyn AppointmentStore>,
    validator: SchedulingValidator,
    conflict_service: ConflictDetectionService,
    locks: BucketLocks,
    create_policy: CreateConflictPolicy,
}

impl AppointmentBookingService {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        clock: Arc<dyn Clock + Send + Sync>,
        create_policy: CreateConflictPolicy,
    ) -> Self {
        Self {
            conflict_service: ConflictDetectionService::new(Arc::clone(&store)),
            validator: SchedulingValidator::new(clock),
            locks: BucketLocks::new(),
            store,
            create_policy,
        }
    }

    /// Picks Supabase storage when configured, in-memory storage otherwise.
    pub fn from_config(config: &AppConfig) -> Self {
        let store: Arc<dyn AppointmentStore> = if config.is_database_configured() {
            info!("Using Supabase appointment storage at {}", config.supabase_url);
            Arc::new(SupabaseAppointmentStore::new(Arc::new(SupabaseClient::new(config))))
        } else {
            info!("Using in-memory appointment storage");
            Arc::new(InMemoryAppointmentStore::new())
        };

        Self::new(store, Arc::new(DefaultClock), config.create_conflict_policy)
    }

    /// Books a new appointment. Gates run in order and the first failure wins:
    /// temporal validation, participant names, then the conflict search.
    #[instrument(skip(self, request))]
    pub async fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        require_fields(&[
            ("date", &request.date),
            ("startTime", &request.start_time),
            ("endTime", &request.end_time),
        ])?;
        let (date, start_time, end_time) = parse_window(
            request.date.as_deref().unwrap_or_default(),
            request.start_time.as_deref().unwrap_or_default(),
            request.end_time.as_deref().unwrap_or_default(),
        )?;
        let interval = self.validator.validate_window(date, start_time, end_time)?;

        require_fields(&[
            ("patientName", &request.patient_name),
            ("doctorName", &request.doctor_name),
        ])?;
        let patient_name = parse_name("patientName", request.patient_name.as_deref().unwrap_or_default())?;
        let doctor_name = parse_name("doctorName", request.doctor_name.as_deref().unwrap_or_default())?;

        let new_appointment = NewAppointment {
            patient_name,
            doctor_name,
            date,
            start_time,
            end_time,
            reason: request.reason.unwrap_or_default(),
            status: AppointmentStatus::Scheduled,
        };

        let bucket = BucketKey::new(&new_appointment.doctor_name, date);
        let _guard = self.locks.acquire([bucket]).await;

        let conflicts = self.conflict_service.check_conflicts(
            &new_appointment.doctor_name,
            date,
            &interval,
            None,
            ConflictScope::from(self.create_policy),
        ).await?;

        if !conflicts.is_empty() {
            warn!("Rejecting booking for {} on {} {}-{}: slot taken",
                  new_appointment.doctor_name, date, start_time, end_time);
            return Err(AppointmentError::Conflict(conflicts));
        }

        let appointment = self.store.insert(new_appointment).await?;

        info!("Appointment {} booked with {} on {} {}-{}",
              appointment.id, appointment.doctor_name, appointment.date,
              appointment.start_time, appointment.end_time);

        Ok(appointment)
    }

    pub async fn list_appointments(
        &self,
        query: AppointmentListQuery,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let filter = AppointmentFilter {
            doctor_name: non_blank(&query.doctor_name).map(str::to_string),
            date: non_blank(&query.date).map(|raw| parse_date("date", raw)).transpose()?,
            status: non_blank(&query.status).map(str::parse::<AppointmentStatus>).transpose()?,
        };

        debug!("Listing appointments with filter {:?}", filter);
        Ok(self.store.list(&filter).await?)
    }

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.store
            .find_by_id(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    /// Applies a partial update. Temporal and conflict checks only run when
    /// the doctor, date or times actually change.
    #[instrument(skip(self, request))]
    pub async fn update_appointment(
        &self,
        appointment_id: Uuid,
        request: UpdateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let mut current = self.get_appointment(appointment_id).await?;
        let patch = AppointmentPatch::parse(&request)?;

        loop {
            let target = patch.apply_to(&current);
            let guard = self.locks.acquire([current.bucket(), target.bucket()]).await;

            // Re-read under the lock; the record may have moved buckets meanwhile.
            let fresh = self.get_appointment(appointment_id).await?;
            let updated = patch.apply_to(&fresh);
            if !guard.covers(&fresh.bucket()) || !guard.covers(&updated.bucket()) {
                debug!("Appointment {} changed bucket while waiting for lock, retrying", appointment_id);
                current = fresh;
                continue;
            }

            if patch.changes_schedule(&fresh) {
                let interval = self.validator.validate_window(
                    updated.date,
                    updated.start_time,
                    updated.end_time,
                )?;

                let conflicts = self.conflict_service.check_conflicts(
                    &updated.doctor_name,
                    updated.date,
                    &interval,
                    Some(appointment_id),
                    ConflictScope::NonCancelled,
                ).await?;

                if !conflicts.is_empty() {
                    warn!("Rejecting update of appointment {}: {} conflict(s)",
                          appointment_id, conflicts.len());
                    return Err(AppointmentError::Conflict(conflicts));
                }
            }

            let saved = self.store
                .replace(appointment_id, updated)
                .await?
                .ok_or(AppointmentError::NotFound)?;

            info!("Appointment {} updated", appointment_id);
            return Ok(saved);
        }
    }

    pub async fn delete_appointment(&self, appointment_id: Uuid) -> Result<(), AppointmentError> {
        if !self.store.delete(appointment_id).await? {
            return Err(AppointmentError::NotFound);
        }

        info!("Appointment {} deleted", appointment_id);
        Ok(())
    }

    /// Read-only conflict check: returns what would block the slot without writing.
    pub async fn check_conflicts(
        &self,
        query: ConflictCheckQuery,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        require_fields(&[
            ("doctorName", &query.doctor_name),
            ("date", &query.date),
            ("startTime", &query.start_time),
            ("endTime", &query.end_time),
        ])?;

        let doctor_name = parse_name("doctorName", query.doctor_name.as_deref().unwrap_or_default())?;
        let (date, start_time, end_time) = parse_window(
            query.date.as_deref().unwrap_or_default(),
            query.start_time.as_deref().unwrap_or_default(),
            query.end_time.as_deref().unwrap_or_default(),
        )?;
        let interval = self.validator.validate_window(date, start_time, end_time)?;

        let exclude_id = non_blank(&query.exclude_id)
            .map(parse_appointment_id)
            .transpose()?;

        self.conflict_service.check_conflicts(
            &doctor_name,
            date,
            &interval,
            exclude_id,
            ConflictScope::NonCancelled,
        ).await
    }
}

// ==============================================================================
// PRIVATE HELPERS
// ==============================================================================

/// Typed view of an update request; `None` means "keep the stored value".
struct AppointmentPatch {
    patient_name: Option<String>,
    doctor_name: Option<String>,
    date: Option<NaiveDate>,
    start_time: Option<TimeOfDay>,
    end_time: Option<TimeOfDay>,
    reason: Option<String>,
    status: Option<AppointmentStatus>,
}

impl AppointmentPatch {
    fn parse(request: &UpdateAppointmentRequest) -> Result<Self, AppointmentError> {
        Ok(Self {
            patient_name: request.patient_name.as_deref()
                .map(|raw| parse_name("patientName", raw))
                .transpose()?,
            doctor_name: request.doctor_name.as_deref()
                .map(|raw| parse_name("doctorName", raw))
                .transpose()?,
            date: request.date.as_deref()
                .map(|raw| parse_date("date", raw))
                .transpose()?,
            start_time: request.start_time.as_deref()
                .map(|raw| parse_time("startTime", raw))
                .transpose()?,
            end_time: request.end_time.as_deref()
                .map(|raw| parse_time("endTime", raw))
                .transpose()?,
            reason: request.reason.clone(),
            status: request.status.as_deref()
                .map(|raw| raw.trim().parse::<AppointmentStatus>())
                .transpose()?,
        })
    }

    fn apply_to(&self, current: &Appointment) -> Appointment {
        Appointment {
            patient_name: self.patient_name.clone().unwrap_or_else(|| current.patient_name.clone()),
            doctor_name: self.doctor_name.clone().unwrap_or_else(|| current.doctor_name.clone()),
            date: self.date.unwrap_or(current.date),
            start_time: self.start_time.unwrap_or(current.start_time),
            end_time: self.end_time.unwrap_or(current.end_time),
            reason: self.reason.clone().unwrap_or_else(|| current.reason.clone()),
            status: self.status.unwrap_or(current.status),
            ..current.clone()
        }
    }

    /// True when a supplied doctor, date or time differs from the stored one.
    fn changes_schedule(&self, current: &Appointment) -> bool {
        self.doctor_name.as_ref().is_some_and(|name| *name != current.doctor_name)
            || self.date.is_some_and(|date| date != current.date)
            || self.start_time.is_some_and(|start| start != current.start_time)
            || self.end_time.is_some_and(|end| end != current.end_time)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|raw| !raw.is_empty())
}

fn require_fields(fields: &[(&str, &Option<String>)]) -> Result<(), AppointmentError> {
    let missing: Vec<String> = fields
        .iter()
        .filter(|(_, value)| non_blank(value).is_none())
        .map(|(name, _)| name.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppointmentError::MissingParameter(missing))
    }
}

fn parse_window(
    date: &str,
    start_time: &str,
    end_time: &str,
) -> Result<(NaiveDate, TimeOfDay, TimeOfDay), AppointmentError> {
    Ok((
        parse_date("date", date)?,
        parse_time("startTime", start_time)?,
        parse_time("endTime", end_time)?,
    ))
}
