//! Sample-index to host-time mapping with output-latency compensation.

/// Microseconds per second.
pub const MICROS_PER_SEC: f64 = 1_000_000.0;

/// Host time for a control-rate consumer: the synchronization clock's
/// current reading plus the configured output latency.
#[inline]
pub fn control_time(now_micros: i64, latency_micros: i64) -> i64 {
    now_micros + latency_micros
}

/// Running host-time cursor for an audio-rate consumer.
///
/// Primed once from the synchronization clock (plus latency), then advanced
/// purely arithmetically: the time of sample `k` past the base is
/// `base + k * 1e6 / sample_rate`, computed from the absolute sample count.
/// Repeated blocks accumulate no rounding error beyond single-sample
/// truncation, and the clock is never re-read mid-stream, so the sequence can
/// neither rewind nor gap regardless of how long a block takes to render.
#[derive(Debug, Clone)]
pub struct HostTimeCursor {
    base_micros: i64,
    samples_elapsed: u64,
    micros_per_sample: f64,
    primed: bool,
}

impl HostTimeCursor {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            base_micros: 0,
            samples_elapsed: 0,
            micros_per_sample: MICROS_PER_SEC / sample_rate,
            primed: false,
        }
    }

    /// Changing the rate invalidates the anchor; the next prime re-reads the
    /// clock.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.micros_per_sample = MICROS_PER_SEC / sample_rate;
        self.primed = false;
    }

    pub fn is_primed(&self) -> bool {
        self.primed
    }

    /// Anchor the cursor so the next sample maps to `now + latency`.
    pub fn prime(&mut self, now_micros: i64, latency_micros: i64) {
        self.base_micros = now_micros + latency_micros;
        self.samples_elapsed = 0;
        self.primed = true;
    }

    /// Drop the anchor so the next prime re-reads the clock.
    pub fn unprime(&mut self) {
        self.primed = false;
    }

    /// Host time of the sample `offset` places past the cursor.
    #[inline]
    pub fn sample_time(&self, offset: usize) -> i64 {
        let count = self.samples_elapsed + offset as u64;
        self.base_micros + (count as f64 * self.micros_per_sample) as i64
    }

    /// Advance past `samples` produced samples.
    #[inline]
    pub fn advance(&mut self, samples: usize) {
        self.samples_elapsed += samples as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_control_time_adds_latency() {
        assert_eq!(control_time(1_000, 250), 1_250);
        assert_eq!(control_time(1_000, -250), 750);
    }

    #[test]
    fn test_prime_anchors_to_now_plus_latency() {
        let mut cursor = HostTimeCursor::new(48_000.0);
        assert!(!cursor.is_primed());

        cursor.prime(2_000_000, 10_000);
        assert!(cursor.is_primed());
        assert_eq!(cursor.sample_time(0), 2_010_000);
    }

    #[test]
    fn test_block_advancement_is_exact() {
        let sample_rate = 48_000.0;
        let mut cursor = HostTimeCursor::new(sample_rate);
        cursor.prime(0, 0);

        // One second of 64-sample blocks lands exactly one second later.
        for _ in 0..750 {
            cursor.advance(64);
        }
        assert!((cursor.sample_time(0) - 1_000_000).abs() <= 1);
    }

    #[test]
    fn test_unprime_then_prime_rebases() {
        let mut cursor = HostTimeCursor::new(44_100.0);
        cursor.prime(0, 0);
        cursor.advance(512);

        cursor.unprime();
        cursor.prime(9_000_000, 5_000);
        assert_eq!(cursor.sample_time(0), 9_005_000);
    }

    proptest! {
        #[test]
        fn prop_no_drift_across_blocks(
            sample_rate in 8_000.0f64..192_000.0,
            blocks in 1usize..2_000,
            block_len in 1usize..256,
        ) {
            let mut cursor = HostTimeCursor::new(sample_rate);
            cursor.prime(0, 0);
            for _ in 0..blocks {
                cursor.advance(block_len);
            }

            let expected = (blocks * block_len) as f64 * MICROS_PER_SEC / sample_rate;
            let actual = cursor.sample_time(0) as f64;
            // Truncation of the final product only, never accumulated.
            prop_assert!((expected - actual).abs() < 1.0);
        }

        #[test]
        fn prop_monotone_within_block(
            sample_rate in 8_000.0f64..192_000.0,
            base in 0i64..1_000_000_000,
        ) {
            let mut cursor = HostTimeCursor::new(sample_rate);
            cursor.prime(base, 0);
            for i in 1..256 {
                prop_assert!(cursor.sample_time(i) >= cursor.sample_time(i - 1));
            }
        }
    }
}
