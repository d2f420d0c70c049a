use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
use mockable::Clock;
use serde_json::json;
use uuid::Uuid;

use shared_config::{AppConfig, CreateConflictPolicy};

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub create_conflict_policy: CreateConflictPolicy,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: "test-anon-key".to_string(),
            create_conflict_policy: CreateConflictPolicy::Scheduled,
        }
    }
}

impl TestConfig {
    /// Config pointing at a mock PostgREST server.
    pub fn with_supabase(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            create_conflict_policy: self.create_conflict_policy,
            ..AppConfig::default()
        }
    }
}

/// Clock frozen at a chosen instant; can be moved forward by whole days.
pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Noon UTC on the given calendar day.
    pub fn on_date(year: i32, month: u32, day: u32) -> Self {
        let now = Utc
            .with_ymd_and_hms(year, month, day, 12, 0, 0)
            .single()
            .unwrap_or_else(|| panic!("invalid fixture date {}-{}-{}", year, month, day));
        Self::at(now)
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    pub fn advance_days(&self, days: i64) {
        *self.now_mut() += Duration::days(days);
    }

    fn now(&self) -> DateTime<Utc> {
        *self.now_mut()
    }

    fn now_mut(&self) -> MutexGuard<'_, DateTime<Utc>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.now()
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    /// A row of the `appointments` table as PostgREST returns it.
    pub fn appointment_row(
        id: Uuid,
        doctor_name: &str,
        date: &str,
        start_time: &str,
        end_time: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "patient_name": "Test Patient",
            "doctor_name": doctor_name,
            "date": date,
            "start_time": start_time,
            "end_time": end_time,
            "reason": null,
            "status": status,
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
