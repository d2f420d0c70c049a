// libs/appointment-cell/src/models.rs
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::services::interval::TimeInterval;

// ==============================================================================
// TIME-OF-DAY
// ==============================================================================

static TIME_OF_DAY_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^([01][0-9]|2[0-3]):([0-5][0-9])$").ok());

/// Wall-clock time with minute granularity, stored as minutes since midnight.
///
/// Always travels as an `"HH:mm"` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub fn from_hm(hours: u16, minutes: u16) -> Option<Self> {
        if hours < 24 && minutes < 60 {
            Some(Self(hours * 60 + minutes))
        } else {
            None
        }
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn hours(self) -> u16 {
        self.0 / 60
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a valid HH:mm time")]
pub struct TimeParseError(pub String);

impl FromStr for TimeOfDay {
    type Err = TimeParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || TimeParseError(value.to_string());

        let captures = TIME_OF_DAY_PATTERN
            .as_ref()
            .and_then(|pattern| pattern.captures(value))
            .ok_or_else(invalid)?;

        let hours = captures[1].parse::<u16>().map_err(|_| invalid())?;
        let minutes = captures[2].parse::<u16>().map_err(|_| invalid())?;

        Self::from_hm(hours, minutes).ok_or_else(invalid)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = AppointmentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            other => Err(AppointmentError::Validation(format!(
                "Unknown status '{}' (expected scheduled, completed or cancelled)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub patient_name: String,
    pub doctor_name: String,
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn interval(&self) -> TimeInterval {
        TimeInterval::new(self.start_time, self.end_time)
    }

    pub fn bucket(&self) -> BucketKey {
        BucketKey::new(&self.doctor_name, self.date)
    }
}

/// A validated appointment that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAppointment {
    pub patient_name: String,
    pub doctor_name: String,
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub reason: String,
    pub status: AppointmentStatus,
}

/// All appointments of one doctor on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketKey {
    pub doctor_name: String,
    pub date: NaiveDate,
}

impl BucketKey {
    pub fn new(doctor_name: &str, date: NaiveDate) -> Self {
        Self {
            doctor_name: doctor_name.to_string(),
            date,
        }
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.doctor_name, self.date)
    }
}

// ==============================================================================
// REQUEST/QUERY MODELS
// ==============================================================================

// Request payloads keep raw strings so malformed values surface as
// `AppointmentError`s instead of extractor rejections.

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub patient_name: Option<String>,
    pub doctor_name: Option<String>,
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentRequest {
    pub patient_name: Option<String>,
    pub doctor_name: Option<String>,
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub reason: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentListQuery {
    pub doctor_name: Option<String>,
    pub date: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictCheckQuery {
    pub doctor_name: Option<String>,
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub exclude_id: Option<String>,
}

/// Storage-level listing filter; every `None` matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentFilter {
    pub doctor_name: Option<String>,
    pub date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.doctor_name.as_ref().is_none_or(|name| *name == appointment.doctor_name)
            && self.date.is_none_or(|date| date == appointment.date)
            && self.status.is_none_or(|status| status == appointment.status)
    }
}

// ==============================================================================
// PARSING HELPERS
// ==============================================================================

pub fn parse_appointment_id(raw: &str) -> Result<Uuid, AppointmentError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppointmentError::InvalidId(raw.to_string()))
}

pub fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, AppointmentError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        AppointmentError::Validation(format!("{} must be a YYYY-MM-DD date, got '{}'", field, raw))
    })
}

pub fn parse_time(field: &str, raw: &str) -> Result<TimeOfDay, AppointmentError> {
    raw.trim()
        .parse()
        .map_err(|e: TimeParseError| AppointmentError::Validation(format!("{}: {}", field, e)))
}

pub fn parse_name(field: &str, raw: &str) -> Result<String, AppointmentError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppointmentError::Validation(format!("{} must not be empty", field)));
    }
    Ok(trimmed.to_string())
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppointmentError {
    #[error("End time must be later than start time")]
    InvalidInterval,

    #[error("Appointment date cannot be earlier than today")]
    PastDate,

    #[error("Appointment overlaps with {} existing appointment(s)", .0.len())]
    Conflict(Vec<Appointment>),

    #[error("Appointment not found")]
    NotFound,

    #[error("Invalid appointment id: {0}")]
    InvalidId(String),

    #[error("Missing required parameters: {}", .0.join(", "))]
    MissingParameter(Vec<String>),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
