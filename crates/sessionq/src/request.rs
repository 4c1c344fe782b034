use core::time::Duration;
use std::time::{Instant, SystemTime};

/// One unit of work: generate a response to `payload` for `session_id` and
/// push it to `destination` after `delay_seconds`.
///
/// A request is immutable once constructed; fields are only reachable through
/// accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    session_id: String,
    payload: String,
    destination: String,
    delay_seconds: u64,
    queued_at: SystemTime,
    queued_instant: Instant,
}

impl SessionRequest {
    /// Creates a request stamped with the current time.
    pub fn new(
        session_id: impl Into<String>,
        payload: impl Into<String>,
        destination: impl Into<String>,
        delay_seconds: u64,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            payload: payload.into(),
            destination: destination.into(),
            delay_seconds,
            queued_at: SystemTime::now(),
            queued_instant: Instant::now(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub const fn delay_seconds(&self) -> u64 {
        self.delay_seconds
    }

    /// The simulated processing latency as a [`Duration`].
    pub const fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_seconds)
    }

    /// Wall-clock time at which the request was created. Informational only.
    pub const fn queued_at(&self) -> SystemTime {
        self.queued_at
    }

    /// Time spent since the request was created.
    pub fn age(&self) -> Duration {
        self.queued_instant.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_session_and_destination_separate() {
        let req = SessionRequest::new("s1", "hello", "c1", 5);
        assert_eq!(req.session_id(), "s1");
        assert_eq!(req.payload(), "hello");
        assert_eq!(req.destination(), "c1");
        assert_eq!(req.delay_seconds(), 5);
        assert_eq!(req.delay(), Duration::from_secs(5));
    }

    #[test]
    fn zero_delay_is_valid() {
        let req = SessionRequest::new("s1", "now", "c1", 0);
        assert_eq!(req.delay(), Duration::ZERO);
    }

    #[test]
    fn queued_at_is_not_in_the_future() {
        let req = SessionRequest::new("s1", "hello", "c1", 0);
        assert!(req.queued_at() <= SystemTime::now());
    }
}
