pub mod booking;
pub mod conflict;
pub mod interval;
pub mod locking;
pub mod store;
pub mod validation;

pub use booking::AppointmentBookingService;
pub use conflict::{find_conflicts, ConflictDetectionService, ConflictScope};
pub use interval::TimeInterval;
pub use locking::BucketLocks;
pub use store::{AppointmentStore, InMemoryAppointmentStore, StoreError, SupabaseAppointmentStore};
pub use validation::SchedulingValidator;
