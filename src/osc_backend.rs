use chrono::{DateTime, Duration, Utc};
use log::{info, warn};
use rosc::{OscBundle, OscMessage, OscPacket, OscTime, OscType};

use crate::backend::{AudioBackend, VoicePool, VoiceSettings};
use crate::clock::{Clock, SystemClock};
use crate::error::PlaybackError;
use crate::midi_utils;
use crate::osc_communication::OSCClient;

/*

    Synth backend talking OSC to a SuperCollider-style synth server.

    Every note becomes an /s_new of the timbre's synth definition with freq, amp and sus args;
        the synth definition is expected to free itself once sus has passed. release_all frees
        the default group.

*/

// Seconds between the NTP epoch (1900) and the unix epoch
const NTP_UNIX_OFFSET: i64 = 2_208_988_800;
const DEFAULT_GROUP: i32 = 1;

pub fn to_osc_time(start_time: DateTime<Utc>, at_time: f64) -> OscTime {
    let wall_time = start_time + Duration::microseconds((at_time * 1_000_000.0) as i64);
    let seconds = (wall_time.timestamp() + NTP_UNIX_OFFSET) as u32;
    let fractional = (wall_time.timestamp_subsec_nanos() as f64 / 1_000_000_000.0 * 4_294_967_296.0) as u32;
    OscTime { seconds, fractional }
}

pub fn note_message(settings: &VoiceSettings, frequency: f64, duration: f64, velocity: f64) -> OscMessage {
    let amp = velocity.clamp(0.0, 1.0) * midi_utils::db_to_gain(settings.volume_db);

    OscMessage {
        addr: "/s_new".to_string(),
        args: vec![
            OscType::String(settings.timbre.synth_name().to_string()),
            OscType::Int(-1), // Let the server pick the node id
            OscType::Int(0),  // Add to head
            OscType::Int(DEFAULT_GROUP),
            OscType::String("freq".to_string()),
            OscType::Float(frequency as f32),
            OscType::String("amp".to_string()),
            OscType::Float(amp as f32),
            OscType::String("sus".to_string()),
            OscType::Float(duration as f32),
        ],
    }
}

pub struct OscBackend {
    clock: SystemClock,
    bind_addr: String,
    synth_addr: String,
    client: Option<OSCClient>,
}

impl OscBackend {
    pub fn new(bind_addr: &str, synth_addr: &str) -> OscBackend {
        OscBackend {
            clock: SystemClock::new(),
            bind_addr: bind_addr.to_string(),
            synth_addr: synth_addr.to_string(),
            client: None,
        }
    }
}

impl AudioBackend for OscBackend {
    type Pool = OscVoicePool;

    // Binding the socket is the readiness step; later calls are no-ops
    fn ensure_running(&mut self) -> Result<(), PlaybackError> {
        if self.client.is_none() {
            let client = OSCClient::new(&self.bind_addr, &self.synth_addr)
                .map_err(|e| PlaybackError::BackendUnavailable(e.to_string()))?;
            info!("OSC synth backend bound to {}, sending to {}", self.bind_addr, self.synth_addr);
            self.client = Some(client);
        }
        Ok(())
    }

    fn now(&self) -> f64 {
        self.clock.now()
    }

    fn create_voice_pool(&mut self, settings: &VoiceSettings) -> Result<OscVoicePool, PlaybackError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| PlaybackError::BackendUnavailable("backend not started".to_string()))?
            .try_clone()?;

        Ok(OscVoicePool {
            client,
            settings: *settings,
            start_time: self.clock.start_time(),
            sounding: false,
            disposed: false,
        })
    }
}

pub struct OscVoicePool {
    client: OSCClient,
    settings: VoiceSettings,
    start_time: DateTime<Utc>,
    // Notes sent since the last /g_freeAll
    sounding: bool,
    disposed: bool,
}

impl OscVoicePool {
    fn send(&self, packet: OscPacket) {
        if let Err(e) = self.client.send(&packet) {
            warn!("Failed to send to synth server: {}", e);
        }
    }
}

impl VoicePool for OscVoicePool {
    fn trigger_attack_release(&mut self, pitch: &str, duration: f64, at_time: Option<f64>, velocity: f64) {
        if self.disposed {
            return;
        }

        let frequency = match midi_utils::pitch_name_to_frequency(pitch) {
            Some(frequency) => frequency,
            None => {
                warn!("Skipping note with unknown pitch {}", pitch);
                return;
            }
        };

        let message = OscPacket::Message(note_message(&self.settings, frequency, duration, velocity));
        self.sounding = true;

        match at_time {
            Some(time) => self.send(OscPacket::Bundle(OscBundle {
                timetag: to_osc_time(self.start_time, time),
                content: vec![message],
            })),
            None => self.send(message),
        }
    }

    fn release_all(&mut self) {
        if self.disposed {
            return;
        }
        self.send(OscPacket::Message(OscMessage {
            addr: "/g_freeAll".to_string(),
            args: vec![OscType::Int(DEFAULT_GROUP)],
        }));
        self.sounding = false;
    }

    fn dispose(&mut self) {
        if self.sounding {
            self.release_all();
        }
        self.disposed = true;
    }
}
