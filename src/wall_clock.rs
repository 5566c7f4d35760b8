//! One-shot offset between the synchronization clock and unix wall time.
//!
//! Beat-to-time answers leave the synchronization clock's domain by adding a
//! cached `wall - sync` offset. The offset is only recomputed on an explicit
//! [`resync`](WallClockSync::resync); it never self-invalidates.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::lockfree::AtomicMicros;
use crate::session::Session;
use crate::timeline::{SyncTimeline, TimelineSnapshot};

/// Paired clock reads averaged per resync. Both reads carry independent
/// scheduling jitter; averaging tames the one-shot noise.
const RESYNC_SAMPLES: i64 = 10;

pub struct WallClockSync<T: SyncTimeline> {
    session: Arc<Session<T>>,
    offset: AtomicMicros,
}

impl<T: SyncTimeline> WallClockSync<T> {
    pub fn new(session: Arc<Session<T>>) -> Self {
        Self {
            session,
            offset: AtomicMicros::new(0),
        }
    }

    /// Recompute the cached offset from [`RESYNC_SAMPLES`] back-to-back
    /// clock pairs. No-op without a session; the previous offset (0 if never
    /// resynced) stays in effect.
    pub fn resync(&self) {
        let Some(timeline) = self.session.active() else {
            return;
        };
        let mut accumulated: i64 = 0;
        for _ in 0..RESYNC_SAMPLES {
            accumulated += unix_micros() - timeline.clock_micros();
        }
        let offset = accumulated / RESYNC_SAMPLES;
        self.offset.set(offset);
        debug!(offset, "wall clock offset resynced");
    }

    /// Cached `wall - sync` offset in microseconds.
    pub fn offset_micros(&self) -> i64 {
        self.offset.get()
    }

    /// Wall-clock time (fractional seconds since the unix epoch) at which
    /// `beat` falls. Returns 0.0 with no session.
    pub fn wall_time_for_beat(&self, beat: f64) -> f64 {
        match self.session.active() {
            Some(timeline) => {
                let mut snapshot = T::snapshot();
                timeline.capture_app(&mut snapshot);
                let micros = snapshot.time_at_beat(beat, self.session.quantum());
                (micros + self.offset.get()) as f64 * 1e-6
            }
            None => 0.0,
        }
    }
}

fn unix_micros() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_micros() as i64)
        .unwrap_or(0)
}
