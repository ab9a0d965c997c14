use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Utc;
use log::{debug, error, info, warn};

use crate::backend::AudioBackend;
use crate::controller::PlaybackHandle;
use crate::progress::FrameOutcome;

/*

    Host loop: ticks the playback controller once per frame in its own thread.

    Deferred note triggers and progress samples are both dispatched from here, so their timing
        resolution is the frame time. spin_sleep keeps the frame pacing tight without burning a
        full core.

*/

pub struct PlaybackDaemon {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl PlaybackDaemon {
    pub fn start<B>(handle: PlaybackHandle<B>, frame_time: Duration) -> PlaybackDaemon
    where
        B: AudioBackend + Send + 'static,
        B::Pool: Send,
    {
        let running = Arc::new(AtomicBool::new(true));
        let loop_running = running.clone();

        let thread = thread::spawn(move || {
            let sleeper = spin_sleep::SpinSleeper::new(100);
            let frame_time_us = frame_time.as_micros() as i64;
            let mut was_playing = false;

            info!("Playback loop started, frame time {}us", frame_time_us);

            while loop_running.load(Ordering::SeqCst) {
                let this_loop_time = Utc::now();

                match handle.tick() {
                    Ok(FrameOutcome::Idle) => {
                        if was_playing {
                            debug!("Playback loop idle");
                        }
                        was_playing = false;
                    }
                    Ok(FrameOutcome::Continue(_)) => was_playing = true,
                    Ok(FrameOutcome::Finished(sample)) => {
                        debug!("Playback finished at {:.3}s", sample.elapsed_time);
                        was_playing = false;
                    }
                    Err(e) => {
                        error!("Playback loop stopping: {}", e);
                        break;
                    }
                }

                let time_taken = (Utc::now() - this_loop_time).num_microseconds().unwrap_or(0);
                if time_taken > frame_time_us {
                    warn!("Frame operations (time: {}us) exceed frame time, overflow...", time_taken);
                }

                sleeper.sleep(frame_time);
            }

            info!("Playback loop stopped");
        });

        PlaybackDaemon {
            running,
            thread: Some(thread),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst) && self.thread.as_ref().map_or(false, |t| !t.is_finished())
    }

    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Playback loop panicked");
            }
        }
    }
}

impl Drop for PlaybackDaemon {
    fn drop(&mut self) {
        self.shutdown();
    }
}
