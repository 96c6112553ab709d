use std::time::Duration;

/// A point in time. Every time-dependent operation in this crate takes the
/// current `Instant` as an argument rather than reading the clock itself, so
/// callers (and tests) decide how time advances.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant {
    inner: std::time::Instant,
}

impl Instant {
    pub fn now() -> Self {
        Self {
            inner: std::time::Instant::now(),
        }
    }

    /// Time elapsed between `self` and `now`; zero if `now` is earlier.
    pub fn elapsed(&self, now: &Self) -> Duration {
        now.inner.saturating_duration_since(self.inner)
    }

    pub fn add_millis(&mut self, millis: u32) {
        self.inner += Duration::from_millis(u64::from(millis));
    }

    pub fn add_duration(&mut self, duration: Duration) {
        self.inner += duration;
    }

    pub fn is_after(&self, other: &Self) -> bool {
        self.inner > other.inner
    }
}

#[cfg(test)]
mod tests {
    use super::Instant;
    use std::time::Duration;

    #[test]
    fn elapsed_saturates() {
        let earlier = Instant::now();
        let mut later = earlier;
        later.add_millis(250);

        assert_eq!(earlier.elapsed(&later), Duration::from_millis(250));
        assert_eq!(later.elapsed(&earlier), Duration::ZERO);
        assert!(later.is_after(&earlier));
    }
}
