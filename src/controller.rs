use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::channel::mpsc::UnboundedReceiver;
use log::{debug, info};
use tracing::instrument;

use crate::backend::{AudioBackend, VoicePool, VoiceSettings};
use crate::commands::PlayerCommand;
use crate::error::PlaybackError;
use crate::model::{MidiDocument, PlaybackState, ProgressSample, Role};
use crate::progress::{FrameOutcome, ProgressReporter};
use crate::scheduler::NoteScheduler;
use crate::timer_queue::CancelHandle;

/*

    Playback controller: Idle <-> Playing(role).

    Every play/seek starts a new session: whatever the previous session had pending or sounding
        is cancelled first, the generation counter is bumped, a fresh voice pool is created and
        a new anchor (clock time of logical offset zero) is taken. Seeking is therefore a full
        re-schedule with a short audible gap, not a patch of the running session.

    Only one session exists at a time, which is what keeps the two roles from ever sounding
        together.

*/

#[derive(Debug, Clone)]
pub struct PlaybackSession {
    pub role: Role,
    pub anchor_time: f64,
    pub logical_duration: f64,
    pub generation: u64,
    pending: Vec<CancelHandle>,
}

impl PlaybackSession {
    pub fn pending_triggers(&self) -> &[CancelHandle] {
        &self.pending
    }
}

pub struct PlaybackController<B: AudioBackend> {
    backend: B,
    documents: HashMap<Role, MidiDocument>,
    voice_settings: VoiceSettings,
    voice_pool: Option<B::Pool>,
    session: Option<PlaybackSession>,
    generation: u64,
    scheduler: NoteScheduler,
    progress: ProgressReporter,
}

impl<B: AudioBackend> PlaybackController<B> {
    pub fn new(backend: B, voice_settings: VoiceSettings) -> PlaybackController<B> {
        PlaybackController {
            backend,
            documents: HashMap::new(),
            voice_settings,
            voice_pool: None,
            session: None,
            generation: 0,
            scheduler: NoteScheduler::new(),
            progress: ProgressReporter::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn state(&self) -> PlaybackState {
        match &self.session {
            Some(session) => PlaybackState::Playing(session.role),
            None => PlaybackState::Idle,
        }
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pending_trigger_count(&self) -> usize {
        self.scheduler.pending_count()
    }

    pub fn subscribe(&mut self) -> UnboundedReceiver<ProgressSample> {
        self.progress.subscribe()
    }

    // Replacing the document of the role that is currently playing stops it first
    pub fn load_document(&mut self, role: Role, document: MidiDocument) {
        if self.state() == PlaybackState::Playing(role) {
            self.stop();
        }
        info!(
            "Loaded {} document: {} notes, {:.2}s",
            role,
            document.note_count(),
            document.logical_duration()
        );
        self.documents.insert(role, document);
    }

    pub fn unload_document(&mut self, role: Role) -> Option<MidiDocument> {
        if self.state() == PlaybackState::Playing(role) {
            self.stop();
        }
        self.documents.remove(&role)
    }

    pub fn document(&self, role: Role) -> Option<&MidiDocument> {
        self.documents.get(&role)
    }

    pub fn voice_settings(&self) -> VoiceSettings {
        self.voice_settings
    }

    // Takes effect on the next play/seek, which creates a new pool
    pub fn set_voice_settings(&mut self, settings: VoiceSettings) {
        self.voice_settings = settings;
    }

    #[instrument(skip(self))]
    pub fn play(&mut self, role: Role, offset: f64) -> Result<(), PlaybackError> {
        // Documents may still be loading; playing nothing is not an error
        let document = match self.documents.get(&role) {
            Some(document) if !document.is_empty() => document,
            _ => {
                debug!("Nothing loaded for {}, ignoring play", role);
                return Ok(());
            }
        };
        let logical_duration = document.logical_duration();

        // Everything that can fail happens before the running session is touched
        self.backend.ensure_running()?;
        let mut pool = self.backend.create_voice_pool(&self.voice_settings)?;

        if let Some(previous) = end_session(&mut self.session, &mut self.voice_pool, &mut self.scheduler, &mut self.progress) {
            debug!("Cancelled {} session (generation {})", previous.role, previous.generation);
        }

        let offset = if offset.is_finite() { offset.max(0.0) } else { 0.0 };

        self.generation += 1;
        let generation = self.generation;

        let now = self.backend.now();
        let anchor_time = now - offset;

        let pending = self.scheduler.schedule_notes(document.notes(), offset, now, generation, |note, duration, _| {
            pool.trigger_attack_release(&note.pitch_name, duration, None, note.velocity);
        });

        info!(
            "Playing {} from {:.3}s of {:.3}s ({} deferred triggers, generation {})",
            role,
            offset,
            logical_duration,
            pending.len(),
            generation
        );

        self.voice_pool = Some(pool);
        self.session = Some(PlaybackSession {
            role,
            anchor_time,
            logical_duration,
            generation,
            pending,
        });
        self.progress.start();

        Ok(())
    }

    #[instrument(skip(self))]
    pub fn seek(&mut self, role: Role, offset: f64) -> Result<(), PlaybackError> {
        self.play(role, offset)
    }

    #[instrument(skip(self))]
    pub fn stop(&mut self) {
        match end_session(&mut self.session, &mut self.voice_pool, &mut self.scheduler, &mut self.progress) {
            Some(session) => {
                info!("Stopped {} playback", session.role);
                self.progress.publish(ProgressSample {
                    playing_role: None,
                    elapsed_time: 0.0,
                    total_duration: session.logical_duration,
                });
            }
            None => debug!("Stop requested while idle"),
        }
    }

    /*
        One host frame: dispatch due deferred triggers, then run the progress frame.
            Reaching the end of the document stops playback.
    */
    pub fn tick(&mut self) -> FrameOutcome {
        let (role, anchor_time, logical_duration, generation) = match &self.session {
            Some(session) => (session.role, session.anchor_time, session.logical_duration, session.generation),
            None => return FrameOutcome::Idle,
        };

        let now = self.backend.now();

        if let Some(pool) = self.voice_pool.as_mut() {
            self.scheduler.fire_due(now, generation, |note, duration, _| {
                pool.trigger_attack_release(&note.pitch_name, duration, None, note.velocity);
            });
        }

        let outcome = self.progress.on_frame(role, now, anchor_time, logical_duration);
        if let FrameOutcome::Finished(_) = outcome {
            info!("Reached end of {} document", role);
            self.stop();
        }

        outcome
    }

    pub fn execute(&mut self, command: PlayerCommand) -> Result<(), PlaybackError> {
        match command {
            PlayerCommand::Play { role, offset } => self.play(role, offset),
            PlayerCommand::Seek { role, offset } => self.seek(role, offset),
            PlayerCommand::Stop => {
                self.stop();
                Ok(())
            }
            PlayerCommand::SetVoice(settings) => {
                self.set_voice_settings(settings);
                Ok(())
            }
        }
    }
}

impl<B: AudioBackend> Drop for PlaybackController<B> {
    fn drop(&mut self) {
        end_session(&mut self.session, &mut self.voice_pool, &mut self.scheduler, &mut self.progress);
    }
}

// Split out over fields so play() can call it while holding a document borrow
fn end_session<P: VoicePool>(
    session: &mut Option<PlaybackSession>,
    voice_pool: &mut Option<P>,
    scheduler: &mut NoteScheduler,
    progress: &mut ProgressReporter,
) -> Option<PlaybackSession> {
    progress.cancel();

    let ended = session.take();
    if let Some(ended) = &ended {
        scheduler.cancel(&ended.pending);
    }

    if let Some(mut pool) = voice_pool.take() {
        pool.release_all();
        pool.dispose();
    }

    ended
}

/*
    Shared command interface to a controller. Clones address the same controller; hand one to
        each component that needs to drive playback (host loop, command listener, UI).
*/
pub struct PlaybackHandle<B: AudioBackend> {
    inner: Arc<Mutex<PlaybackController<B>>>,
}

impl<B: AudioBackend> Clone for PlaybackHandle<B> {
    fn clone(&self) -> Self {
        PlaybackHandle {
            inner: self.inner.clone(),
        }
    }
}

impl<B: AudioBackend> PlaybackHandle<B> {
    pub fn new(controller: PlaybackController<B>) -> PlaybackHandle<B> {
        PlaybackHandle {
            inner: Arc::new(Mutex::new(controller)),
        }
    }

    pub fn with<R, F>(&self, operations: F) -> Result<R, PlaybackError>
    where
        F: FnOnce(&mut PlaybackController<B>) -> R,
    {
        let mut controller = self.inner.lock().map_err(|_| PlaybackError::LockPoisoned)?;
        Ok(operations(&mut controller))
    }

    pub fn play(&self, role: Role, offset: f64) -> Result<(), PlaybackError> {
        self.with(|controller| controller.play(role, offset))?
    }

    pub fn seek(&self, role: Role, offset: f64) -> Result<(), PlaybackError> {
        self.with(|controller| controller.seek(role, offset))?
    }

    pub fn stop(&self) -> Result<(), PlaybackError> {
        self.with(|controller| controller.stop())
    }

    pub fn tick(&self) -> Result<FrameOutcome, PlaybackError> {
        self.with(|controller| controller.tick())
    }

    pub fn execute(&self, command: PlayerCommand) -> Result<(), PlaybackError> {
        self.with(|controller| controller.execute(command))?
    }

    pub fn state(&self) -> Result<PlaybackState, PlaybackError> {
        self.with(|controller| controller.state())
    }

    pub fn load_document(&self, role: Role, document: MidiDocument) -> Result<(), PlaybackError> {
        self.with(|controller| controller.load_document(role, document))
    }

    pub fn subscribe(&self) -> Result<UnboundedReceiver<ProgressSample>, PlaybackError> {
        self.with(|controller| controller.subscribe())
    }
}
