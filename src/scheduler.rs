use log::debug;

use crate::model::Note;
use crate::timer_queue::{CancelHandle, TimerQueue};

/*

    Note scheduler: turns a note list and a seek offset into triggers.

    Relative to the seek offset every note falls into one of three buckets:
        - Entirely in the past: skipped.
        - Sounding at the seek point: fired immediately with only the remaining part of its
            duration (no new attack for a note that was interrupted mid-sustain).
        - In the future: deferred until (start - seek) has elapsed, then fired in full.

    A note ending exactly on the seek point has nothing left to play and counts as past.

*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerTiming {
    Immediate,
    Deferred,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedTrigger<'a> {
    pub note: &'a Note,
    pub play_duration: f64,
    pub delay_ms: f64,
    pub timing: TriggerTiming,
}

pub fn plan_note(note: &Note, seek_offset: f64) -> Option<PlannedTrigger<'_>> {
    let end_time = note.end_time();

    if end_time <= seek_offset {
        return None;
    }

    if note.start_time < seek_offset {
        return Some(PlannedTrigger {
            note,
            play_duration: end_time - seek_offset,
            delay_ms: 0.0,
            timing: TriggerTiming::Immediate,
        });
    }

    Some(PlannedTrigger {
        note,
        play_duration: note.duration,
        delay_ms: (note.start_time - seek_offset) * 1000.0,
        timing: TriggerTiming::Deferred,
    })
}

pub fn plan_triggers<'a, I>(notes: I, seek_offset: f64) -> Vec<PlannedTrigger<'a>>
where
    I: IntoIterator<Item = &'a Note>,
{
    notes
        .into_iter()
        .filter_map(|note| plan_note(note, seek_offset))
        .collect()
}

/*
    A deferred trigger waiting in the timer queue. Carries the generation of the session that
        scheduled it so that dispatch can tell live triggers from stale ones.
*/
#[derive(Debug, Clone)]
pub struct PendingTrigger {
    pub note: Note,
    pub play_duration: f64,
    pub delay_ms: f64,
    pub generation: u64,
}

#[derive(Debug, Default)]
pub struct NoteScheduler {
    timers: TimerQueue<PendingTrigger>,
}

impl NoteScheduler {
    pub fn new() -> NoteScheduler {
        NoteScheduler { timers: TimerQueue::new() }
    }

    /*
        Fires immediate triggers right away through on_trigger(note, play_duration, 0.0) and
            queues the deferred ones relative to `now`. Returns one handle per deferred trigger.
    */
    pub fn schedule_notes<'a, I, F>(
        &mut self,
        notes: I,
        seek_offset: f64,
        now: f64,
        generation: u64,
        mut on_trigger: F,
    ) -> Vec<CancelHandle>
    where
        I: IntoIterator<Item = &'a Note>,
        F: FnMut(&Note, f64, f64),
    {
        let mut handles = vec![];

        for planned in plan_triggers(notes, seek_offset) {
            match planned.timing {
                TriggerTiming::Immediate => {
                    on_trigger(planned.note, planned.play_duration, 0.0);
                }
                TriggerTiming::Deferred => {
                    let due = now + planned.delay_ms / 1000.0;
                    let handle = self.timers.insert(
                        due,
                        PendingTrigger {
                            note: planned.note.clone(),
                            play_duration: planned.play_duration,
                            delay_ms: planned.delay_ms,
                            generation,
                        },
                    );
                    handles.push(handle);
                }
            }
        }

        handles
    }

    /*
        Dispatch every deferred trigger due at `now`. Triggers from any other generation than
            the given one are dropped without sounding. Returns the number actually fired.
    */
    pub fn fire_due<F>(&mut self, now: f64, generation: u64, mut on_trigger: F) -> usize
    where
        F: FnMut(&Note, f64, f64),
    {
        let mut fired = 0;

        for pending in self.timers.pop_due(now) {
            if pending.generation != generation {
                debug!(
                    "Dropping stale trigger for {} (generation {}, current {})",
                    pending.note.pitch_name, pending.generation, generation
                );
                continue;
            }

            on_trigger(&pending.note, pending.play_duration, pending.delay_ms);
            fired += 1;
        }

        fired
    }

    pub fn cancel(&mut self, handles: &[CancelHandle]) {
        for handle in handles {
            self.timers.cancel(*handle);
        }
    }

    pub fn cancel_all(&mut self) {
        self.timers.clear();
    }

    pub fn pending_count(&self) -> usize {
        self.timers.len()
    }

    pub fn next_due(&self) -> Option<f64> {
        self.timers.next_due()
    }
}
