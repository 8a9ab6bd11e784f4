// =====================================================================================
// SHARED MODELS - CAPABILITIES CONSUMED BY THE SCHEDULING CORE
// =====================================================================================
//
// The core never reads the system clock, delivers a notification, or looks up
// a therapist profile directly. Everything environmental comes in through the
// traits defined here, so the cells stay deterministic under test and the
// out-of-scope HTTP layer decides the real implementations.
//
// =====================================================================================

pub mod clock;
pub mod notify;
pub mod profile;

pub use clock::{Clock, SystemClock};
pub use notify::{NotificationSink, NullSink, SchedulingEvent};
pub use profile::{TherapistDirectory, TherapistProfile};
