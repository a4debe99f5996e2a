use std::time::Duration;

/// Smoothing factor for the mean estimate.
const RTT_ALPHA: f64 = 1.0 / 8.0;
/// Smoothing factor for the variance estimate.
const RTT_BETA: f64 = 1.0 / 4.0;

/// Smoothed round-trip-time estimator.
///
/// Uses the standard exponentially weighted update over microsecond samples:
/// `srtt = (1 - α)·srtt + α·sample` and `rttvar = (1 - β)·rttvar +
/// β·|srtt - sample|`. There is no estimate until the first sample; the
/// retransmission timeout falls back to its floor until then.
#[derive(Debug, Clone, Default)]
pub struct RttEstimator {
    srtt_us: Option<f64>,
    rttvar_us: f64,
}

impl RttEstimator {
    /// Creates an estimator with no samples yet.
    pub fn new() -> RttEstimator {
        RttEstimator::default()
    }

    /// Returns true once at least one sample has been taken.
    pub fn has_sample(&self) -> bool {
        self.srtt_us.is_some()
    }

    /// Feeds one RTT sample.
    ///
    /// Callers must only pass samples from first transmissions; a
    /// retransmission's ACK is ambiguous about which send it answers.
    pub fn update(&mut self, sample: Duration) {
        let sample_us = sample.as_micros() as f64;
        match self.srtt_us {
            None => {
                self.srtt_us = Some(sample_us);
                self.rttvar_us = sample_us / 2.0;
            }
            Some(srtt) => {
                let diff = (srtt - sample_us).abs();
                self.rttvar_us = (1.0 - RTT_BETA) * self.rttvar_us + RTT_BETA * diff;
                self.srtt_us = Some((1.0 - RTT_ALPHA) * srtt + RTT_ALPHA * sample_us);
            }
        }
    }

    /// Returns the current smoothed RTT, if any sample has been taken.
    pub fn smoothed_rtt(&self) -> Option<Duration> {
        self.srtt_us.map(|us| Duration::from_micros(us as u64))
    }

    /// Returns the retransmission timeout: `max(floor, srtt + 4·rttvar)`,
    /// or the floor alone while no sample exists.
    pub fn rto(&self, floor: Duration) -> Duration {
        match self.srtt_us {
            None => floor,
            Some(srtt) => {
                let rto = Duration::from_micros((srtt + 4.0 * self.rttvar_us) as u64);
                rto.max(floor)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLOOR: Duration = Duration::from_millis(20);

    #[test]
    fn test_no_estimate_before_first_sample() {
        let rtt = RttEstimator::new();
        assert!(!rtt.has_sample());
        assert_eq!(rtt.smoothed_rtt(), None);
        assert_eq!(rtt.rto(FLOOR), FLOOR);
    }

    #[test]
    fn test_first_sample_seeds_the_estimate() {
        let mut rtt = RttEstimator::new();
        rtt.update(Duration::from_millis(100));
        assert_eq!(rtt.smoothed_rtt(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_estimate_is_smoothed() {
        let mut rtt = RttEstimator::new();
        rtt.update(Duration::from_millis(100));
        rtt.update(Duration::from_millis(200));

        // 7/8 * 100ms + 1/8 * 200ms = 112.5ms
        let srtt = rtt.smoothed_rtt().unwrap();
        assert!(srtt > Duration::from_millis(100));
        assert!(srtt < Duration::from_millis(200));
    }

    #[test]
    fn test_rto_exceeds_srtt_under_jitter() {
        let mut rtt = RttEstimator::new();
        rtt.update(Duration::from_millis(100));
        rtt.update(Duration::from_millis(300));

        let rto = rtt.rto(FLOOR);
        assert!(rto > rtt.smoothed_rtt().unwrap());
    }

    #[test]
    fn test_rto_never_below_floor() {
        let mut rtt = RttEstimator::new();
        // Sub-millisecond loopback samples with zero variance would push the
        // raw RTO near zero.
        for _ in 0..32 {
            rtt.update(Duration::from_micros(300));
        }
        assert_eq!(rtt.rto(FLOOR), FLOOR);
    }
}
