use std::sync::{Arc, Mutex};

use log::info;

use crate::backend::{AudioBackend, VoicePool, VoiceSettings};
use crate::clock::Clock;
use crate::error::PlaybackError;

/*

    Backend that records voice pool calls instead of sounding them.

    Drives the --dry-run mode of the binary (with logging turned on) and gives tests a view of
        exactly what the controller asked the synth to do and when.

*/

#[derive(Debug, Clone, PartialEq)]
pub enum VoiceEventKind {
    Trigger {
        pitch: String,
        duration: f64,
        at_time: Option<f64>,
        velocity: f64,
    },
    ReleaseAll,
    Dispose,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoiceEvent {
    pub pool_id: usize,
    // Clock time of the call
    pub time: f64,
    pub kind: VoiceEventKind,
}

/*
    Shared, cloneable view on the recorded events.
*/
#[derive(Debug, Clone, Default)]
pub struct VoiceLog {
    events: Arc<Mutex<Vec<VoiceEvent>>>,
}

impl VoiceLog {
    pub fn new() -> VoiceLog {
        VoiceLog::default()
    }

    fn push(&self, event: VoiceEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    pub fn events(&self) -> Vec<VoiceEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }

    pub fn triggers(&self) -> Vec<VoiceEvent> {
        self.events()
            .into_iter()
            .filter(|event| matches!(event.kind, VoiceEventKind::Trigger { .. }))
            .collect()
    }

    pub fn triggers_for_pool(&self, pool_id: usize) -> Vec<VoiceEvent> {
        self.triggers().into_iter().filter(|event| event.pool_id == pool_id).collect()
    }

    /*
        Voices still sounding at `time`: triggered before it, not yet past their duration, and
            not cut off by a release_all/dispose of their pool in between.
    */
    pub fn sounding_at(&self, time: f64) -> Vec<VoiceEvent> {
        let events = self.events();

        events
            .iter()
            .filter(|event| match &event.kind {
                VoiceEventKind::Trigger { duration, at_time, .. } => {
                    let start = at_time.unwrap_or(event.time);
                    if start > time || start + duration <= time {
                        return false;
                    }

                    !events.iter().any(|other| {
                        other.pool_id == event.pool_id
                            && other.time >= start
                            && other.time <= time
                            && matches!(other.kind, VoiceEventKind::ReleaseAll | VoiceEventKind::Dispose)
                    })
                }
                _ => false,
            })
            .cloned()
            .collect()
    }
}

pub struct RecordingPool<C: Clock> {
    id: usize,
    clock: C,
    settings: VoiceSettings,
    log: VoiceLog,
    log_events: bool,
    disposed: bool,
}

impl<C: Clock> RecordingPool<C> {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn settings(&self) -> &VoiceSettings {
        &self.settings
    }

    fn record(&self, kind: VoiceEventKind) {
        let event = VoiceEvent {
            pool_id: self.id,
            time: self.clock.now(),
            kind,
        };

        if self.log_events {
            info!("[pool {} | {:.3}s] {:?}", event.pool_id, event.time, event.kind);
        }

        self.log.push(event);
    }
}

impl<C: Clock> VoicePool for RecordingPool<C> {
    fn trigger_attack_release(&mut self, pitch: &str, duration: f64, at_time: Option<f64>, velocity: f64) {
        if self.disposed {
            return;
        }

        self.record(VoiceEventKind::Trigger {
            pitch: pitch.to_string(),
            duration,
            at_time,
            velocity,
        });
    }

    fn release_all(&mut self) {
        if self.disposed {
            return;
        }
        self.record(VoiceEventKind::ReleaseAll);
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.record(VoiceEventKind::Dispose);
        self.disposed = true;
    }
}

pub struct RecordingBackend<C: Clock + Clone> {
    clock: C,
    log: VoiceLog,
    available: bool,
    pools_available: bool,
    log_events: bool,
    pools_created: usize,
}

impl<C: Clock + Clone> RecordingBackend<C> {
    pub fn new(clock: C) -> RecordingBackend<C> {
        RecordingBackend {
            clock,
            log: VoiceLog::new(),
            available: true,
            pools_available: true,
            log_events: false,
            pools_created: 0,
        }
    }

    pub fn with_logging(mut self, log_events: bool) -> RecordingBackend<C> {
        self.log_events = log_events;
        self
    }

    // Simulates a synth that refuses to start
    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    // Simulates a running synth that cannot allocate another voice pool
    pub fn set_pools_available(&mut self, available: bool) {
        self.pools_available = available;
    }

    pub fn voice_log(&self) -> VoiceLog {
        self.log.clone()
    }

    pub fn pools_created(&self) -> usize {
        self.pools_created
    }
}

impl<C: Clock + Clone> AudioBackend for RecordingBackend<C> {
    type Pool = RecordingPool<C>;

    fn ensure_running(&mut self) -> Result<(), PlaybackError> {
        if self.available {
            Ok(())
        } else {
            Err(PlaybackError::BackendUnavailable("recording backend disabled".to_string()))
        }
    }

    fn now(&self) -> f64 {
        self.clock.now()
    }

    fn create_voice_pool(&mut self, settings: &VoiceSettings) -> Result<Self::Pool, PlaybackError> {
        if !self.pools_available {
            return Err(PlaybackError::BackendUnavailable("no voice pool available".to_string()));
        }

        let pool = RecordingPool {
            id: self.pools_created,
            clock: self.clock.clone(),
            settings: *settings,
            log: self.log.clone(),
            log_events: self.log_events,
            disposed: false,
        };
        self.pools_created += 1;

        if self.log_events {
            info!("Created voice pool {} ({}, {} dB)", pool.id, settings.timbre, settings.volume_db);
        }

        Ok(pool)
    }
}
