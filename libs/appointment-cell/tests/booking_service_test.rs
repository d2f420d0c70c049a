use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use mockable::Clock;
use uuid::Uuid;

use appointment_cell::models::*;
use appointment_cell::services::{AppointmentBookingService, AppointmentStore, InMemoryAppointmentStore};
use shared_config::CreateConflictPolicy;
use shared_utils::test_utils::FixedClock;

const DOCTOR: &str = "Dr. Ruiz";
const DAY: &str = "2025-06-01";

struct Harness {
    store: Arc<InMemoryAppointmentStore>,
    clock: Arc<FixedClock>,
    service: Arc<AppointmentBookingService>,
}

fn harness_with_policy(policy: CreateConflictPolicy) -> Harness {
    let store = Arc::new(InMemoryAppointmentStore::new());
    let clock = Arc::new(FixedClock::on_date(2025, 5, 20));
    let service = Arc::new(AppointmentBookingService::new(
        Arc::clone(&store) as Arc<dyn AppointmentStore>,
        Arc::clone(&clock) as Arc<dyn Clock + Send + Sync>,
        policy,
    ));

    Harness { store, clock, service }
}

fn harness() -> Harness {
    harness_with_policy(CreateConflictPolicy::Scheduled)
}

fn booking(doctor: &str, date: &str, start: &str, end: &str) -> CreateAppointmentRequest {
    CreateAppointmentRequest {
        patient_name: Some("Ana Torres".to_string()),
        doctor_name: Some(doctor.to_string()),
        date: Some(date.to_string()),
        start_time: Some(start.to_string()),
        end_time: Some(end.to_string()),
        reason: Some("Checkup".to_string()),
    }
}

fn seeded(date: &str, start: &str, end: &str, status: AppointmentStatus) -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        patient_name: "Seeded Patient".to_string(),
        doctor_name: DOCTOR.to_string(),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        start_time: start.parse().unwrap(),
        end_time: end.parse().unwrap(),
        reason: String::new(),
        status,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn status_update(status: &str) -> UpdateAppointmentRequest {
    UpdateAppointmentRequest {
        status: Some(status.to_string()),
        ..UpdateAppointmentRequest::default()
    }
}

fn time_update(start: &str, end: &str) -> UpdateAppointmentRequest {
    UpdateAppointmentRequest {
        start_time: Some(start.to_string()),
        end_time: Some(end.to_string()),
        ..UpdateAppointmentRequest::default()
    }
}

// ==============================================================================
// CREATE
// ==============================================================================

#[tokio::test]
async fn test_create_assigns_identity_and_scheduled_status() {
    let h = harness();

    let created = h.service.create_appointment(booking(DOCTOR, DAY, "09:00", "10:00")).await.unwrap();

    assert_eq!(created.status, AppointmentStatus::Scheduled);
    assert_eq!(created.start_time.to_string(), "09:00");
    assert_eq!(created.reason, "Checkup");
    assert_eq!(h.service.get_appointment(created.id).await.unwrap(), created);
}

#[tokio::test]
async fn test_create_rejects_inverted_or_empty_interval() {
    let h = harness();

    for (start, end) in [("10:00", "10:00"), ("10:00", "09:59"), ("23:59", "00:00")] {
        assert_matches!(
            h.service.create_appointment(booking(DOCTOR, DAY, start, end)).await,
            Err(AppointmentError::InvalidInterval)
        );
    }

    // Interval rule wins over every other field.
    let mut request = booking(DOCTOR, "2020-01-01", "10:00", "09:00");
    request.patient_name = None;
    assert_matches!(h.service.create_appointment(request).await, Err(AppointmentError::InvalidInterval));

    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn test_create_rejects_yesterday_but_accepts_today() {
    let h = harness();
    let yesterday = h.clock.today().pred_opt().unwrap().to_string();
    let today = h.clock.today().to_string();

    assert_matches!(
        h.service.create_appointment(booking(DOCTOR, &yesterday, "09:00", "10:00")).await,
        Err(AppointmentError::PastDate)
    );
    assert!(h.service.create_appointment(booking(DOCTOR, &today, "09:00", "10:00")).await.is_ok());
}

#[tokio::test]
async fn test_create_reports_exact_conflict_and_allows_back_to_back() {
    let h = harness();
    let existing = h.service.create_appointment(booking(DOCTOR, DAY, "09:00", "10:00")).await.unwrap();

    let result = h.service.create_appointment(booking(DOCTOR, DAY, "09:30", "09:45")).await;
    assert_matches!(result, Err(AppointmentError::Conflict(conflicts)) if conflicts == vec![existing.clone()]);

    assert!(h.service.create_appointment(booking(DOCTOR, DAY, "10:00", "10:30")).await.is_ok());
    assert!(h.service.create_appointment(booking(DOCTOR, DAY, "08:30", "09:00")).await.is_ok());
}

#[tokio::test]
async fn test_other_doctors_and_dates_never_conflict() {
    let h = harness();
    h.service.create_appointment(booking(DOCTOR, DAY, "09:00", "10:00")).await.unwrap();

    assert!(h.service.create_appointment(booking("Dr. Vega", DAY, "09:00", "10:00")).await.is_ok());
    assert!(h.service.create_appointment(booking(DOCTOR, "2025-06-02", "09:00", "10:00")).await.is_ok());
}

#[tokio::test]
async fn test_create_policy_decides_whether_completed_blocks() {
    let lenient = harness_with_policy(CreateConflictPolicy::Scheduled);
    lenient.store.seed(seeded(DAY, "09:00", "10:00", AppointmentStatus::Completed)).await;
    assert!(lenient.service.create_appointment(booking(DOCTOR, DAY, "09:00", "10:00")).await.is_ok());

    let strict = harness_with_policy(CreateConflictPolicy::Active);
    let completed = seeded(DAY, "09:00", "10:00", AppointmentStatus::Completed);
    strict.store.seed(completed.clone()).await;
    assert_matches!(
        strict.service.create_appointment(booking(DOCTOR, DAY, "09:30", "10:30")).await,
        Err(AppointmentError::Conflict(conflicts)) if conflicts == vec![completed]
    );
}

#[tokio::test]
async fn test_create_validates_participants_and_formats() {
    let h = harness();

    let mut blank_name = booking(DOCTOR, DAY, "09:00", "10:00");
    blank_name.doctor_name = Some("   ".to_string());
    assert_matches!(
        h.service.create_appointment(blank_name).await,
        Err(AppointmentError::MissingParameter(fields)) if fields == vec!["doctorName"]
    );

    assert_matches!(
        h.service.create_appointment(booking(DOCTOR, DAY, "9:00", "10:00")).await,
        Err(AppointmentError::Validation(_))
    );
    assert_matches!(
        h.service.create_appointment(booking(DOCTOR, "01/06/2025", "09:00", "10:00")).await,
        Err(AppointmentError::Validation(_))
    );
}

#[tokio::test]
async fn test_create_trims_names() {
    let h = harness();
    let mut request = booking("  Dr. Ruiz ", DAY, "09:00", "10:00");
    request.patient_name = Some(" Ana ".to_string());

    let created = h.service.create_appointment(request).await.unwrap();
    assert_eq!(created.doctor_name, DOCTOR);
    assert_eq!(created.patient_name, "Ana");

    // Trimmed names land in the same bucket.
    assert_matches!(
        h.service.create_appointment(booking(DOCTOR, DAY, "09:15", "09:30")).await,
        Err(AppointmentError::Conflict(_))
    );
}

#[tokio::test]
async fn test_concurrent_overlapping_creates_book_once() {
    let h = harness();

    let attempts = (0..16).map(|i| {
        let service = Arc::clone(&h.service);
        let start = format!("09:{:02}", i);
        tokio::spawn(async move {
            service.create_appointment(booking(DOCTOR, DAY, &start, "10:00")).await
        })
    });

    let results = join_all(attempts).await;
    let booked = results
        .into_iter()
        .map(|joined| joined.unwrap())
        .filter(|result| result.is_ok())
        .count();

    assert_eq!(booked, 1);
    assert_eq!(h.store.len().await, 1);
}

// ==============================================================================
// UPDATE
// ==============================================================================

#[tokio::test]
async fn test_metadata_update_skips_temporal_and_conflict_checks() {
    let h = harness();
    // Stored record is already "invalid": past date, inverted interval, overlapping a neighbour.
    let broken = seeded("2025-01-10", "11:00", "10:00", AppointmentStatus::Scheduled);
    h.store.seed(broken.clone()).await;
    h.store.seed(seeded("2025-01-10", "09:00", "12:00", AppointmentStatus::Scheduled)).await;

    let updated = h.service.update_appointment(broken.id, UpdateAppointmentRequest {
        reason: Some("Bring lab results".to_string()),
        ..UpdateAppointmentRequest::default()
    }).await.unwrap();

    assert_eq!(updated.reason, "Bring lab results");
    assert_eq!(updated.start_time, broken.start_time);
    assert_eq!(updated.created_at, broken.created_at);
}

#[tokio::test]
async fn test_resubmitting_same_times_is_not_a_change() {
    let h = harness();
    let past = seeded("2025-01-10", "09:00", "10:00", AppointmentStatus::Scheduled);
    h.store.seed(past.clone()).await;

    let updated = h.service.update_appointment(past.id, time_update("09:00", "10:00")).await.unwrap();
    assert_eq!(updated.date, past.date);
}

#[tokio::test]
async fn test_update_never_conflicts_with_itself() {
    let h = harness();
    let own = h.service.create_appointment(booking(DOCTOR, DAY, "09:00", "10:00")).await.unwrap();

    let shifted = h.service.update_appointment(own.id, time_update("09:15", "10:15")).await.unwrap();
    assert_eq!(shifted.start_time.to_string(), "09:15");

    let blocking = h.service.check_conflicts(ConflictCheckQuery {
        doctor_name: Some(DOCTOR.to_string()),
        date: Some(DAY.to_string()),
        start_time: Some("09:00".to_string()),
        end_time: Some("10:00".to_string()),
        exclude_id: Some(own.id.to_string()),
    }).await.unwrap();
    assert!(blocking.is_empty());
}

#[tokio::test]
async fn test_update_merges_before_validating() {
    let h = harness();
    let own = h.service.create_appointment(booking(DOCTOR, DAY, "09:00", "10:00")).await.unwrap();

    // Only endTime supplied; merged with stored 09:00 start it is inverted.
    let result = h.service.update_appointment(own.id, UpdateAppointmentRequest {
        end_time: Some("08:30".to_string()),
        ..UpdateAppointmentRequest::default()
    }).await;
    assert_matches!(result, Err(AppointmentError::InvalidInterval));

    let result = h.service.update_appointment(own.id, UpdateAppointmentRequest {
        date: Some("2025-05-01".to_string()),
        ..UpdateAppointmentRequest::default()
    }).await;
    assert_matches!(result, Err(AppointmentError::PastDate));

    // Rejected updates leave the record untouched.
    assert_eq!(h.service.get_appointment(own.id).await.unwrap(), own);
}

#[tokio::test]
async fn test_update_into_occupied_slot_is_rejected() {
    let h = harness();
    let blocker = h.service.create_appointment(booking(DOCTOR, DAY, "09:00", "10:00")).await.unwrap();
    let mover = h.service.create_appointment(booking("Dr. Vega", DAY, "09:00", "10:00")).await.unwrap();

    let result = h.service.update_appointment(mover.id, UpdateAppointmentRequest {
        doctor_name: Some(DOCTOR.to_string()),
        ..UpdateAppointmentRequest::default()
    }).await;

    assert_matches!(result, Err(AppointmentError::Conflict(conflicts)) if conflicts == vec![blocker]);
}

#[tokio::test]
async fn test_update_blocks_on_completed_appointments() {
    let h = harness();
    h.store.seed(seeded(DAY, "09:00", "10:00", AppointmentStatus::Completed)).await;
    let own = h.service.create_appointment(booking(DOCTOR, DAY, "10:00", "11:00")).await.unwrap();

    assert_matches!(
        h.service.update_appointment(own.id, time_update("09:30", "10:30")).await,
        Err(AppointmentError::Conflict(_))
    );
}

#[tokio::test]
async fn test_cancelling_frees_the_slot() {
    let h = harness();
    let first = h.service.create_appointment(booking(DOCTOR, DAY, "09:00", "10:00")).await.unwrap();
    let later = h.service.create_appointment(booking(DOCTOR, DAY, "10:00", "11:00")).await.unwrap();

    assert_matches!(
        h.service.create_appointment(booking(DOCTOR, DAY, "09:00", "10:00")).await,
        Err(AppointmentError::Conflict(_))
    );

    let cancelled = h.service.update_appointment(first.id, status_update("cancelled")).await.unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

    // Cancelled records stay fetchable by id.
    assert_eq!(h.service.get_appointment(first.id).await.unwrap().status, AppointmentStatus::Cancelled);

    assert!(h.service.update_appointment(later.id, time_update("09:30", "10:30")).await.is_ok());
    assert!(h.service.create_appointment(booking(DOCTOR, DAY, "09:00", "09:30")).await.is_ok());
}

#[tokio::test]
async fn test_update_rejects_bad_fields_and_unknown_ids() {
    let h = harness();
    let own = h.service.create_appointment(booking(DOCTOR, DAY, "09:00", "10:00")).await.unwrap();

    assert_matches!(
        h.service.update_appointment(own.id, status_update("postponed")).await,
        Err(AppointmentError::Validation(_))
    );
    assert_matches!(
        h.service.update_appointment(own.id, UpdateAppointmentRequest {
            patient_name: Some(String::new()),
            ..UpdateAppointmentRequest::default()
        }).await,
        Err(AppointmentError::Validation(_))
    );
    assert_matches!(
        h.service.update_appointment(Uuid::new_v4(), status_update("completed")).await,
        Err(AppointmentError::NotFound)
    );
}

#[tokio::test]
async fn test_unknown_id_wins_over_malformed_fields() {
    let h = harness();

    assert_matches!(
        h.service.update_appointment(Uuid::new_v4(), status_update("bogus")).await,
        Err(AppointmentError::NotFound)
    );
    assert_matches!(
        h.service.update_appointment(Uuid::new_v4(), time_update("9am", "10:00")).await,
        Err(AppointmentError::NotFound)
    );
}

#[tokio::test]
async fn test_reactivating_a_cancelled_appointment_skips_the_conflict_search() {
    let h = harness();
    let first = h.service.create_appointment(booking(DOCTOR, DAY, "09:00", "10:00")).await.unwrap();
    h.service.update_appointment(first.id, status_update("cancelled")).await.unwrap();

    let replacement = h.service.create_appointment(booking(DOCTOR, DAY, "09:30", "10:30")).await.unwrap();

    // Status-only updates never re-check the slot, even when it is now taken.
    let reactivated = h.service.update_appointment(first.id, status_update("scheduled")).await.unwrap();
    assert_eq!(reactivated.status, AppointmentStatus::Scheduled);

    let blocking = h.service.check_conflicts(ConflictCheckQuery {
        doctor_name: Some(DOCTOR.to_string()),
        date: Some(DAY.to_string()),
        start_time: Some("09:45".to_string()),
        end_time: Some("09:50".to_string()),
        exclude_id: None,
    }).await.unwrap();
    let ids: Vec<Uuid> = blocking.iter().map(|appointment| appointment.id).collect();
    assert_eq!(ids, vec![first.id, replacement.id]);

    // Any schedule change afterwards does run the search.
    assert_matches!(
        h.service.update_appointment(first.id, time_update("09:00", "09:45")).await,
        Err(AppointmentError::Conflict(conflicts)) if conflicts[0].id == replacement.id
    );
}

#[tokio::test]
async fn test_rescheduling_after_the_day_has_passed() {
    let h = harness();
    let today = h.clock.today().to_string();
    let own = h.service.create_appointment(booking(DOCTOR, &today, "09:00", "10:00")).await.unwrap();

    h.clock.advance_days(1);

    assert!(h.service.update_appointment(own.id, status_update("completed")).await.is_ok());
    assert_matches!(
        h.service.update_appointment(own.id, time_update("10:00", "11:00")).await,
        Err(AppointmentError::PastDate)
    );
}

// ==============================================================================
// DELETE / LIST / CONFLICT CHECK
// ==============================================================================

#[tokio::test]
async fn test_delete_twice_yields_not_found() {
    let h = harness();
    let own = h.service.create_appointment(booking(DOCTOR, DAY, "09:00", "10:00")).await.unwrap();

    assert!(h.service.delete_appointment(own.id).await.is_ok());
    assert_matches!(h.service.delete_appointment(own.id).await, Err(AppointmentError::NotFound));
    assert_matches!(h.service.get_appointment(own.id).await, Err(AppointmentError::NotFound));

    // Deletion frees the slot too.
    assert!(h.service.create_appointment(booking(DOCTOR, DAY, "09:00", "10:00")).await.is_ok());
}

#[tokio::test]
async fn test_list_filters_and_orders() {
    let h = harness();
    h.service.create_appointment(booking(DOCTOR, "2025-06-02", "08:00", "09:00")).await.unwrap();
    h.service.create_appointment(booking(DOCTOR, DAY, "11:00", "12:00")).await.unwrap();
    h.service.create_appointment(booking(DOCTOR, DAY, "09:00", "10:00")).await.unwrap();
    let other = h.service.create_appointment(booking("Dr. Vega", DAY, "09:00", "10:00")).await.unwrap();
    h.service.update_appointment(other.id, status_update("cancelled")).await.unwrap();

    let all = h.service.list_appointments(AppointmentListQuery::default()).await.unwrap();
    assert_eq!(all.len(), 4);
    assert_eq!(all.last().unwrap().date.to_string(), "2025-06-02");

    let ruiz_day = h.service.list_appointments(AppointmentListQuery {
        doctor_name: Some(DOCTOR.to_string()),
        date: Some(DAY.to_string()),
        status: None,
    }).await.unwrap();
    let starts: Vec<String> = ruiz_day.iter().map(|a| a.start_time.to_string()).collect();
    assert_eq!(starts, vec!["09:00", "11:00"]);

    let cancelled = h.service.list_appointments(AppointmentListQuery {
        status: Some("cancelled".to_string()),
        ..AppointmentListQuery::default()
    }).await.unwrap();
    assert_eq!(cancelled.len(), 1);
    assert_eq!(cancelled[0].id, other.id);

    assert_matches!(
        h.service.list_appointments(AppointmentListQuery {
            date: Some("tomorrow".to_string()),
            ..AppointmentListQuery::default()
        }).await,
        Err(AppointmentError::Validation(_))
    );
}

#[tokio::test]
async fn test_conflict_check_is_read_only() {
    let h = harness();
    h.service.create_appointment(booking(DOCTOR, DAY, "10:00", "11:00")).await.unwrap();
    h.service.create_appointment(booking(DOCTOR, DAY, "08:00", "09:30")).await.unwrap();
    h.store.seed(seeded(DAY, "09:00", "12:00", AppointmentStatus::Cancelled)).await;

    let query = ConflictCheckQuery {
        doctor_name: Some(DOCTOR.to_string()),
        date: Some(DAY.to_string()),
        start_time: Some("09:00".to_string()),
        end_time: Some("10:30".to_string()),
        exclude_id: None,
    };

    let conflicts = h.service.check_conflicts(query.clone()).await.unwrap();
    let starts: Vec<String> = conflicts.iter().map(|a| a.start_time.to_string()).collect();
    assert_eq!(starts, vec!["08:00", "10:00"]);
    assert_eq!(h.store.len().await, 3);

    let free = h.service.check_conflicts(ConflictCheckQuery {
        start_time: Some("11:00".to_string()),
        end_time: Some("12:00".to_string()),
        ..query
    }).await.unwrap();
    assert!(free.is_empty());
}

#[tokio::test]
async fn test_conflict_check_parameter_errors() {
    let h = harness();

    assert_matches!(
        h.service.check_conflicts(ConflictCheckQuery {
            doctor_name: Some(DOCTOR.to_string()),
            date: Some(DAY.to_string()),
            ..ConflictCheckQuery::default()
        }).await,
        Err(AppointmentError::MissingParameter(fields)) if fields == vec!["startTime", "endTime"]
    );

    assert_matches!(
        h.service.check_conflicts(ConflictCheckQuery {
            doctor_name: Some(DOCTOR.to_string()),
            date: Some(DAY.to_string()),
            start_time: Some("09:00".to_string()),
            end_time: Some("10:00".to_string()),
            exclude_id: Some("42".to_string()),
        }).await,
        Err(AppointmentError::InvalidId(_))
    );

    assert_matches!(
        h.service.check_conflicts(ConflictCheckQuery {
            doctor_name: Some(DOCTOR.to_string()),
            date: Some(DAY.to_string()),
            start_time: Some("10:00".to_string()),
            end_time: Some("09:00".to_string()),
            exclude_id: None,
        }).await,
        Err(AppointmentError::InvalidInterval)
    );
}
