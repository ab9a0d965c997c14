use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};

use crate::model::{ProgressSample, Role};

/*

    Progress reporter: a per-frame, self-rescheduling sample loop.

    start() requests a frame. The host loop calls on_frame() once per frame; a requested frame
        samples the elapsed time, publishes it, and either requests the next frame or reports
        that the end was reached. Without a pending request on_frame() does nothing, which is
        how cancel() stops the loop.

    Subscribers receive samples over unbounded futures channels; closed receivers are dropped
        on the next publish.

*/

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    Idle,
    Continue(ProgressSample),
    Finished(ProgressSample),
}

#[derive(Debug, Default)]
pub struct ProgressReporter {
    frame_requested: bool,
    subscribers: Vec<UnboundedSender<ProgressSample>>,
}

impl ProgressReporter {
    pub fn new() -> ProgressReporter {
        ProgressReporter::default()
    }

    pub fn subscribe(&mut self) -> UnboundedReceiver<ProgressSample> {
        let (sender, receiver) = unbounded();
        self.subscribers.push(sender);
        receiver
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn start(&mut self) {
        self.frame_requested = true;
    }

    // Safe to call when not running
    pub fn cancel(&mut self) {
        self.frame_requested = false;
    }

    pub fn is_running(&self) -> bool {
        self.frame_requested
    }

    pub fn on_frame(&mut self, role: Role, now: f64, anchor_time: f64, total_duration: f64) -> FrameOutcome {
        if !self.frame_requested {
            return FrameOutcome::Idle;
        }
        self.frame_requested = false;

        let elapsed_time = (now - anchor_time).max(0.0).min(total_duration);
        let sample = ProgressSample {
            playing_role: Some(role),
            elapsed_time,
            total_duration,
        };
        self.publish(sample);

        if elapsed_time >= total_duration {
            FrameOutcome::Finished(sample)
        } else {
            self.frame_requested = true;
            FrameOutcome::Continue(sample)
        }
    }

    pub fn publish(&mut self, sample: ProgressSample) {
        self.subscribers.retain(|sender| sender.unbounded_send(sample).is_ok());
    }
}
