//! Cancellable deferred values driven by injected timestamps.

/// Milliseconds on a caller-supplied monotonic clock.
pub type Millis = u64;

#[derive(Debug, Clone)]
struct Pending<T> {
    value: T,
    due: Millis,
}

/// Holds at most one pending value; scheduling replaces it and restarts the
/// delay, so only the newest value is ever delivered.
#[derive(Debug, Clone)]
pub struct Debounce<T> {
    delay: Millis,
    pending: Option<Pending<T>>,
}

impl<T> Debounce<T> {
    pub fn new(delay: Millis) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn schedule(&mut self, value: T, now: Millis) {
        self.pending = Some(Pending {
            value,
            due: now.saturating_add(self.delay),
        });
    }

    /// Take the value if its delay has elapsed.
    pub fn poll(&mut self, now: Millis) -> Option<T> {
        match &self.pending {
            Some(p) if p.due <= now => self.pending.take().map(|p| p.value),
            _ => None,
        }
    }

    /// Take the value immediately, regardless of the delay.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|p| p.value)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// True while a value is scheduled and not yet due.
    pub fn is_waiting(&self, now: Millis) -> bool {
        self.pending.as_ref().is_some_and(|p| now < p.due)
    }

    pub fn peek(&self) -> Option<&T> {
        self.pending.as_ref().map(|p| &p.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_after_delay() {
        let mut d = Debounce::new(300);
        d.schedule("a", 1000);
        assert_eq!(d.poll(1299), None);
        assert_eq!(d.poll(1300), Some("a"));
        assert_eq!(d.poll(2000), None);
    }

    #[test]
    fn test_reschedule_restarts_and_replaces() {
        let mut d = Debounce::new(300);
        d.schedule("old", 1000);
        d.schedule("new", 1200);
        assert_eq!(d.poll(1350), None);
        assert_eq!(d.poll(1500), Some("new"));
    }

    #[test]
    fn test_flush_and_cancel() {
        let mut d = Debounce::new(300);
        d.schedule(1, 0);
        assert_eq!(d.flush(), Some(1));
        d.schedule(2, 0);
        d.cancel();
        assert!(!d.is_pending());
        assert_eq!(d.poll(10_000), None);
    }

    #[test]
    fn test_is_waiting_window() {
        let mut d = Debounce::new(200);
        assert!(!d.is_waiting(0));
        d.schedule((), 100);
        assert!(d.is_waiting(299));
        assert!(!d.is_waiting(300));
    }
}
