use std::time::Duration;

/// Smoothed round-trip time estimate (exponentially weighted moving average).
#[derive(Clone, Debug)]
pub struct RttEstimator {
    rtt_millis: f32,
    smoothing_factor: f32,
}

impl RttEstimator {
    pub fn new(initial: Duration, smoothing_factor: f32) -> Self {
        Self {
            rtt_millis: initial.as_secs_f32() * 1000.0,
            smoothing_factor: smoothing_factor.clamp(0.0, 1.0),
        }
    }

    pub fn record_sample(&mut self, sample: Duration) {
        let sample_millis = sample.as_secs_f32() * 1000.0;
        self.rtt_millis += (sample_millis - self.rtt_millis) * self.smoothing_factor;
    }

    pub fn rtt_millis(&self) -> f32 {
        self.rtt_millis
    }
}

#[cfg(test)]
mod tests {
    use super::RttEstimator;
    use std::time::Duration;

    #[test]
    fn moves_toward_samples() {
        let mut rtt = RttEstimator::new(Duration::from_millis(200), 0.5);
        rtt.record_sample(Duration::from_millis(100));
        assert!((rtt.rtt_millis() - 150.0).abs() < 0.01);
        rtt.record_sample(Duration::from_millis(100));
        assert!((rtt.rtt_millis() - 125.0).abs() < 0.01);
    }
}
