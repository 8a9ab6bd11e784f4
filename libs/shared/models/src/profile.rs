use async_trait::async_trait;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-therapist scheduling preferences, read-only input to conflict checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TherapistProfile {
    pub session_duration_minutes: u32,
    pub break_between_sessions_minutes: u32,
}

impl TherapistProfile {
    pub fn session_duration(&self) -> Duration {
        Duration::minutes(self.session_duration_minutes as i64)
    }

    pub fn break_between(&self) -> Duration {
        Duration::minutes(self.break_between_sessions_minutes as i64)
    }
}

impl Default for TherapistProfile {
    fn default() -> Self {
        Self {
            session_duration_minutes: 60,
            break_between_sessions_minutes: 0,
        }
    }
}

/// Lookup into the (externally owned) therapist directory.
#[async_trait]
pub trait TherapistDirectory: Send + Sync {
    async fn get(&self, therapist_id: Uuid) -> Option<TherapistProfile>;
}
