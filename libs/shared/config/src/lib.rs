use std::env;
use tracing::warn;

/// Runtime tunables for the scheduling core.
///
/// Every value has a working default so the core boots in development and in
/// tests without any environment at all; deployments override via env vars.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// How far ahead an appointment may be booked, in days.
    pub max_advance_days: u32,
    /// Session length applied when a request carries only a start time and
    /// the therapist has no configured duration.
    pub default_session_minutes: u32,
    /// Gap enforced between sessions when the therapist has not set one.
    pub default_buffer_minutes: u32,
    /// Upper bound on waiting for a therapist's schedule lock.
    pub lock_timeout_ms: u64,
    /// How far ahead open-ended recurrence rules are expanded, in days.
    pub assignment_horizon_days: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            max_advance_days: env_u32("SCHEDULING_MAX_ADVANCE_DAYS", 180),
            default_session_minutes: env_u32("SCHEDULING_DEFAULT_SESSION_MINUTES", 60),
            default_buffer_minutes: env_u32("SCHEDULING_DEFAULT_BUFFER_MINUTES", 0),
            lock_timeout_ms: env_u64("SCHEDULING_LOCK_TIMEOUT_MS", 5_000),
            assignment_horizon_days: env_u32("ASSIGNMENT_HORIZON_DAYS", 365),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_advance_days: 180,
            default_session_minutes: 60,
            default_buffer_minutes: 0,
            lock_timeout_ms: 5_000,
            assignment_horizon_days: 365,
        }
    }
}

fn env_u32(name: &str, default: u32) -> u32 {
    match env::var(name) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            warn!("{} is not a valid integer, using default {}", name, default);
            default
        }),
        Err(_) => default,
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    match env::var(name) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            warn!("{} is not a valid integer, using default {}", name, default);
            default
        }),
        Err(_) => default,
    }
}
