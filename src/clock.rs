use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Utc};

/*
    Monotonic time source in seconds. All anchors and trigger due times in the playback core
        are expressed in this unit.
*/
pub trait Clock {
    fn now(&self) -> f64;
}

/*
    Monotonic clock counted from the moment of creation. The wall-clock time of that moment is
        kept next to it so clock times can be mapped onto absolute timestamps (OSC timetags).
*/
#[derive(Debug, Clone)]
pub struct SystemClock {
    started: Instant,
    start_time: DateTime<Utc>,
}

impl SystemClock {
    pub fn new() -> SystemClock {
        SystemClock {
            started: Instant::now(),
            start_time: Utc::now(),
        }
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

/*
    Externally advanced clock. Clones share the same time, so a test can keep one
        copy and hand the other to a backend.
*/
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    time: Arc<Mutex<f64>>,
}

impl ManualClock {
    pub fn new() -> ManualClock {
        ManualClock::default()
    }

    pub fn set(&self, seconds: f64) {
        if let Ok(mut time) = self.time.lock() {
            *time = seconds;
        }
    }

    pub fn advance(&self, seconds: f64) {
        if let Ok(mut time) = self.time.lock() {
            *time += seconds;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.time.lock().map(|time| *time).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{Clock, ManualClock, SystemClock};

    #[test]
    fn manual_clock_is_shared() {
        let clock = ManualClock::new();
        let other = clock.clone();
        assert_eq!(clock.now(), 0.0);

        other.advance(1.5);
        assert_eq!(clock.now(), 1.5);

        clock.set(10.0);
        assert_eq!(other.now(), 10.0);
    }

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock::new();
        let first = clock.now();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = clock.now();
        assert!(first >= 0.0);
        assert!(second > first);
    }

    #[test]
    fn system_clock_never_goes_backwards() {
        let clock = SystemClock::new();
        let copy = clock.clone();

        let mut last = clock.now();
        for _ in 0..10_000 {
            let now = copy.now();
            assert!(now >= last);
            last = now;
        }

        // Clones measure from the same origin
        assert_eq!(clock.start_time(), copy.start_time());
        assert!(clock.now() >= last);
    }
}
