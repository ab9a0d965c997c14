use midi_preview_player::backend::VoiceSettings;
use midi_preview_player::clock::ManualClock;
use midi_preview_player::commands::PlayerCommand;
use midi_preview_player::controller::{PlaybackController, PlaybackHandle};
use midi_preview_player::model::{MidiDocument, Note, PlaybackState, Role, Track};
use midi_preview_player::progress::FrameOutcome;
use midi_preview_player::recording::{RecordingBackend, VoiceEventKind, VoiceLog};
use midi_preview_player::PlaybackError;

type TestHandle = PlaybackHandle<RecordingBackend<ManualClock>>;

fn doc(notes: Vec<Note>) -> MidiDocument {
    MidiDocument::new(vec![Track::new(notes)])
}

fn setup(reference: MidiDocument, student: Option<MidiDocument>) -> (TestHandle, ManualClock, VoiceLog) {
    let clock = ManualClock::new();
    clock.set(5.0);
    let backend = RecordingBackend::new(clock.clone());
    let log = backend.voice_log();

    let mut controller = PlaybackController::new(backend, VoiceSettings::default());
    controller.load_document(Role::Reference, reference);
    if let Some(student) = student {
        controller.load_document(Role::Student, student);
    }

    (PlaybackHandle::new(controller), clock, log)
}

fn trigger_duration(kind: &VoiceEventKind) -> f64 {
    match kind {
        VoiceEventKind::Trigger { duration, .. } => *duration,
        other => panic!("expected a trigger, got {:?}", other),
    }
}

#[test]
fn seek_into_a_note_plays_the_remainder() {
    let (handle, _clock, log) = setup(doc(vec![Note::new("C4", 2.0, 1.0, 0.8)]), None);

    handle.seek(Role::Reference, 2.5).unwrap();

    let triggers = log.triggers();
    assert_eq!(triggers.len(), 1);
    assert_eq!(triggers[0].time, 5.0);
    assert_eq!(trigger_duration(&triggers[0].kind), 0.5);
    assert_eq!(handle.state().unwrap(), PlaybackState::Playing(Role::Reference));
}

#[test]
fn seek_before_a_note_defers_it() {
    let (handle, clock, log) = setup(doc(vec![Note::new("C4", 2.0, 1.0, 0.8)]), None);

    handle.seek(Role::Reference, 0.0).unwrap();
    handle.tick().unwrap();
    assert!(log.triggers().is_empty());

    clock.set(6.999);
    handle.tick().unwrap();
    assert!(log.triggers().is_empty());

    clock.set(7.0);
    handle.tick().unwrap();
    let triggers = log.triggers();
    assert_eq!(triggers.len(), 1);
    assert_eq!(trigger_duration(&triggers[0].kind), 1.0);
    match &triggers[0].kind {
        VoiceEventKind::Trigger { pitch, velocity, .. } => {
            assert_eq!(pitch, "C4");
            assert_eq!(*velocity, 0.8);
        }
        _ => unreachable!(),
    }
}

#[test]
fn notes_in_the_past_are_never_played() {
    let (handle, clock, log) = setup(
        doc(vec![Note::new("C4", 0.0, 1.0, 0.8), Note::new("D4", 1.0, 1.0, 0.8), Note::new("E4", 4.0, 1.0, 0.8)]),
        None,
    );

    handle.play(Role::Reference, 2.0).unwrap();
    clock.advance(2.5);
    handle.tick().unwrap();

    let pitches: Vec<String> = log
        .triggers()
        .into_iter()
        .map(|event| match event.kind {
            VoiceEventKind::Trigger { pitch, .. } => pitch,
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(pitches, vec!["E4"]);
}

#[test]
fn replaying_does_not_double_triggers() {
    let (handle, clock, log) = setup(doc(vec![Note::new("C4", 1.0, 1.0, 0.8), Note::new("E4", 2.0, 1.0, 0.8)]), None);

    handle.play(Role::Reference, 0.0).unwrap();
    handle.play(Role::Reference, 0.0).unwrap();

    clock.advance(3.0);
    handle.tick().unwrap();

    assert_eq!(log.triggers().len(), 2);
}

#[test]
fn switching_roles_silences_the_previous_one() {
    let (handle, clock, log) = setup(
        doc(vec![Note::new("C4", 0.0, 4.0, 0.8)]),
        Some(doc(vec![Note::new("G4", 0.0, 4.0, 0.8)])),
    );

    handle.play(Role::Reference, 0.0).unwrap();
    handle.tick().unwrap();
    assert_eq!(log.sounding_at(5.0).len(), 1);

    clock.advance(0.5);
    handle.play(Role::Student, 0.0).unwrap();
    handle.tick().unwrap();

    let sounding = log.sounding_at(5.5);
    assert_eq!(sounding.len(), 1);
    match &sounding[0].kind {
        VoiceEventKind::Trigger { pitch, .. } => assert_eq!(pitch, "G4"),
        _ => unreachable!(),
    }
    assert_eq!(handle.state().unwrap(), PlaybackState::Playing(Role::Student));
}

#[test]
fn stop_is_idempotent() {
    let (handle, _clock, log) = setup(doc(vec![Note::new("C4", 1.0, 1.0, 0.8)]), None);

    handle.stop().unwrap();
    assert_eq!(handle.state().unwrap(), PlaybackState::Idle);
    assert!(log.events().is_empty());

    handle.play(Role::Reference, 0.0).unwrap();
    handle.stop().unwrap();
    let events_after_first_stop = log.events().len();

    handle.stop().unwrap();
    assert_eq!(handle.state().unwrap(), PlaybackState::Idle);
    assert_eq!(log.events().len(), events_after_first_stop);
    assert!(log.triggers().is_empty());
}

#[test]
fn stopped_session_never_sounds_late_notes() {
    let (handle, clock, log) = setup(doc(vec![Note::new("C4", 1.0, 1.0, 0.8)]), None);

    handle.play(Role::Reference, 0.0).unwrap();
    handle.stop().unwrap();

    clock.advance(5.0);
    assert_eq!(handle.tick().unwrap(), FrameOutcome::Idle);
    assert!(log.triggers().is_empty());
}

#[test]
fn playback_stops_itself_at_the_end() {
    let (handle, clock, _log) = setup(doc(vec![Note::new("C4", 0.0, 4.0, 0.8), Note::new("E4", 8.0, 2.0, 0.8)]), None);
    let mut progress = handle.subscribe().unwrap();

    handle.play(Role::Reference, 0.0).unwrap();

    clock.set(14.99);
    match handle.tick().unwrap() {
        FrameOutcome::Continue(sample) => assert!((sample.elapsed_time - 9.99).abs() < 1e-9),
        other => panic!("expected to keep playing, got {:?}", other),
    }

    clock.set(15.0);
    match handle.tick().unwrap() {
        FrameOutcome::Finished(sample) => assert_eq!(sample.elapsed_time, 10.0),
        other => panic!("expected to finish, got {:?}", other),
    }
    assert_eq!(handle.state().unwrap(), PlaybackState::Idle);

    let mut samples = vec![];
    while let Ok(Some(sample)) = progress.try_next() {
        samples.push(sample);
    }
    assert_eq!(samples.len(), 3);
    assert_eq!(samples[0].playing_role, Some(Role::Reference));
    assert_eq!(samples[1].total_duration, 10.0);
    assert_eq!(samples[2].playing_role, None);
}

#[test]
fn missing_documents_are_ignored() {
    let (handle, _clock, log) = setup(doc(vec![Note::new("C4", 0.0, 1.0, 0.8)]), None);

    handle.play(Role::Student, 0.0).unwrap();
    assert_eq!(handle.state().unwrap(), PlaybackState::Idle);

    handle.load_document(Role::Student, MidiDocument::default()).unwrap();
    handle.execute(PlayerCommand::Seek { role: Role::Student, offset: 1.0 }).unwrap();
    assert_eq!(handle.state().unwrap(), PlaybackState::Idle);
    assert!(log.events().is_empty());
}

#[test]
fn unavailable_backend_rejects_play() {
    let clock = ManualClock::new();
    let mut backend = RecordingBackend::new(clock);
    backend.set_available(false);

    let mut controller = PlaybackController::new(backend, VoiceSettings::default());
    controller.load_document(Role::Reference, doc(vec![Note::new("C4", 0.0, 1.0, 0.8)]));

    let result = controller.play(Role::Reference, 0.0);
    assert!(matches!(result, Err(PlaybackError::BackendUnavailable(_))));
    assert_eq!(controller.state(), PlaybackState::Idle);
}
