use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use shared_models::clock::Clock;
use shared_models::notify::{NotificationSink, SchedulingEvent};
use shared_models::profile::{TherapistDirectory, TherapistProfile};

/// Clock fixture that only moves when a test tells it to.
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// Convenience for the common "frozen at Y-M-D H:M UTC" setup.
    pub fn at_utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Self {
        let now = Utc
            .with_ymd_and_hms(year, month, day, hour, minute, 0)
            .single()
            .expect("valid test timestamp");
        Self::starting_at(now)
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write().expect("clock lock poisoned") = now;
    }

    pub fn advance(&self, delta: Duration) {
        let mut now = self.now.write().expect("clock lock poisoned");
        *now += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().expect("clock lock poisoned")
    }
}

/// Sink that records every event for later assertions.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SchedulingEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SchedulingEvent> {
        self.events.lock().expect("sink lock poisoned").clone()
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().expect("sink lock poisoned").len()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(&self, event: SchedulingEvent) {
        self.events.lock().expect("sink lock poisoned").push(event);
    }
}

/// Therapist directory fixture backed by a plain map.
#[derive(Default)]
pub struct StaticDirectory {
    profiles: HashMap<Uuid, TherapistProfile>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, therapist_id: Uuid, profile: TherapistProfile) -> Self {
        self.profiles.insert(therapist_id, profile);
        self
    }
}

#[async_trait]
impl TherapistDirectory for StaticDirectory {
    async fn get(&self, therapist_id: Uuid) -> Option<TherapistProfile> {
        self.profiles.get(&therapist_id).cloned()
    }
}
