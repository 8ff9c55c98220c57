use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Handle for one scheduled write. Scheduling the same key again
/// invalidates the previous token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WriteToken(u64);

/// Delays writes per key until the key has been quiet for `delay`.
///
/// The owner polls with the current instant; nothing runs in the background.
#[derive(Debug)]
pub struct Debouncer<K> {
    delay: Duration,
    next_token: u64,
    pending: HashMap<K, (WriteToken, Instant)>,
}

impl<K: Eq + Hash + Clone> Debouncer<K> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            next_token: 0,
            pending: HashMap::new(),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// (Re)arm the timer for `key`. Any earlier schedule for the key is dropped.
    pub fn schedule(&mut self, key: K, now: Instant) -> WriteToken {
        self.next_token += 1;
        let token = WriteToken(self.next_token);
        self.pending.insert(key, (token, now + self.delay));
        token
    }

    pub fn cancel(&mut self, key: &K) -> bool {
        self.pending.remove(key).is_some()
    }

    /// Whether `token` is still the live schedule for `key`.
    pub fn is_current(&self, key: &K, token: WriteToken) -> bool {
        self.pending.get(key).is_some_and(|(live, _)| *live == token)
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Remove and return every key whose deadline has passed, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<K> {
        let mut due: Vec<(Instant, K)> = self
            .pending
            .iter()
            .filter(|(_, (_, deadline))| *deadline <= now)
            .map(|(key, (_, deadline))| (*deadline, key.clone()))
            .collect();
        due.sort_by_key(|(deadline, _)| *deadline);
        for (_, key) in &due {
            self.pending.remove(key);
        }
        due.into_iter().map(|(_, key)| key).collect()
    }

    /// Remove and return every pending key regardless of deadline.
    pub fn drain(&mut self) -> Vec<K> {
        let mut all: Vec<(Instant, K)> = self
            .pending
            .drain()
            .map(|(key, (_, deadline))| (deadline, key))
            .collect();
        all.sort_by_key(|(deadline, _)| *deadline);
        all.into_iter().map(|(_, key)| key).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(500);

    #[test]
    fn rescheduling_pushes_deadline_back() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);
        let first = debouncer.schedule("note-1", start);
        let second = debouncer.schedule("note-1", start + Duration::from_millis(300));

        assert!(!debouncer.is_current(&"note-1", first));
        assert!(debouncer.is_current(&"note-1", second));
        assert!(debouncer.take_due(start + DELAY).is_empty());
        assert_eq!(debouncer.take_due(start + Duration::from_millis(800)), vec!["note-1"]);
        assert!(debouncer.is_empty());
    }

    #[test]
    fn cancel_drops_pending_write() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.schedule(1u32, start);
        assert!(debouncer.cancel(&1));
        assert!(!debouncer.cancel(&1));
        assert!(debouncer.take_due(start + DELAY * 4).is_empty());
    }

    #[test]
    fn due_keys_come_out_earliest_first() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.schedule("b", start + Duration::from_millis(10));
        debouncer.schedule("a", start + Duration::from_millis(20));
        debouncer.schedule("c", start);
        assert_eq!(debouncer.take_due(start + DELAY * 2), vec!["c", "b", "a"]);
    }

    #[test]
    fn drain_ignores_deadlines() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.schedule("x", start);
        debouncer.schedule("y", start + Duration::from_millis(1));
        assert_eq!(debouncer.drain(), vec!["x", "y"]);
        assert_eq!(debouncer.len(), 0);
    }
}
