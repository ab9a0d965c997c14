use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/*

    Host-side timer facility for deferred triggers.

    Generic over the payload: entries are <due: seconds, T>. Nothing fires on its own, the
        owner polls pop_due() with the current clock time once per frame and receives every
        payload whose due time has passed. Entries can be cancelled through the handle returned
        on insert, which is what allows a new playback session to drop everything the previous
        one had pending.

    Entries are kept ordered by (due, handle), so polling only touches what is due and a cancel
        is a keyed removal. Handles are issued in insertion order, which keeps equal due times
        firing in the order they were inserted.

*/

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CancelHandle(u64);

impl CancelHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

// Total order over f64 due times
#[derive(Debug, Clone, Copy)]
struct Due(f64);

impl PartialEq for Due {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Due {}

impl PartialOrd for Due {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Due {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug)]
pub struct TimerQueue<T> {
    entries: BTreeMap<(Due, CancelHandle), T>,
    due_by_handle: HashMap<CancelHandle, Due>,
    next_id: u64,
}

impl<T> TimerQueue<T> {
    pub fn new() -> TimerQueue<T> {
        TimerQueue {
            entries: BTreeMap::new(),
            due_by_handle: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn insert(&mut self, due: f64, contents: T) -> CancelHandle {
        let handle = CancelHandle(self.next_id);
        self.next_id += 1;
        self.entries.insert((Due(due), handle), contents);
        self.due_by_handle.insert(handle, Due(due));
        handle
    }

    // Returns false if the entry already fired or was cancelled before
    pub fn cancel(&mut self, handle: CancelHandle) -> bool {
        match self.due_by_handle.remove(&handle) {
            Some(due) => self.entries.remove(&(due, handle)).is_some(),
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.due_by_handle.clear();
    }

    /*
        Remove and return all entries with due <= now, earliest first. Entries with equal due
            times keep their insertion order.
    */
    pub fn pop_due(&mut self, now: f64) -> Vec<T> {
        let mut due = vec![];

        while let Some(entry) = self.entries.first_entry() {
            if entry.key().0 .0 > now {
                break;
            }
            let ((_, handle), contents) = entry.remove_entry();
            self.due_by_handle.remove(&handle);
            due.push(contents);
        }

        due
    }

    pub fn next_due(&self) -> Option<f64> {
        self.entries.keys().next().map(|(due, _)| due.0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::TimerQueue;

    #[test]
    fn pop_due_test() {
        let mut queue = TimerQueue::new();
        queue.insert(1.0, "two");
        queue.insert(0.0, "one");
        queue.insert(2.5, "three");

        assert_eq!(queue.pop_due(0.5), vec!["one"]);
        assert_eq!(queue.len(), 2);
        assert!(queue.pop_due(0.9).is_empty());
        assert_eq!(queue.pop_due(3.0), vec!["two", "three"]);
        assert!(queue.is_empty());
        assert!(queue.pop_due(10.0).is_empty());
    }

    #[test]
    fn equal_due_keeps_insertion_order() {
        let mut queue = TimerQueue::new();
        queue.insert(1.0, "a");
        queue.insert(1.0, "b");
        queue.insert(0.5, "c");

        assert_eq!(queue.pop_due(1.0), vec!["c", "a", "b"]);
    }

    #[test]
    fn cancel_test() {
        let mut queue = TimerQueue::new();
        let first = queue.insert(1.0, "one");
        let second = queue.insert(2.0, "two");
        assert_ne!(first, second);

        assert!(queue.cancel(first));
        assert!(!queue.cancel(first));
        assert_eq!(queue.next_due(), Some(2.0));
        assert_eq!(queue.pop_due(5.0), vec!["two"]);

        // Already fired
        assert!(!queue.cancel(second));
        assert_eq!(queue.next_due(), None);
    }

    #[test]
    fn cancel_many_entries() {
        let mut queue = TimerQueue::new();
        let handles: Vec<_> = (0..50_000).map(|i| queue.insert(i as f64 * 0.01, i)).collect();

        let started = Instant::now();
        for handle in handles.iter().step_by(2) {
            assert!(queue.cancel(*handle));
        }
        assert!(started.elapsed() < Duration::from_secs(1));

        assert_eq!(queue.len(), 25_000);
        assert_eq!(queue.next_due(), Some(0.01));
        assert_eq!(queue.pop_due(0.055), vec![1, 3, 5]);
    }

    #[test]
    fn clear_test() {
        let mut queue = TimerQueue::new();
        queue.insert(1.0, 1);
        queue.insert(2.0, 2);
        queue.clear();
        assert!(queue.is_empty());
        assert!(queue.pop_due(100.0).is_empty());
    }
}
