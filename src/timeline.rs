//! Seam over the external synchronized timeline.
//!
//! Everything else in this crate talks to Ableton Link exclusively through
//! the [`SyncTimeline`]/[`TimelineSnapshot`] trait pair, so the translation
//! logic can be exercised against a deterministic clock in tests while the
//! production path runs on [`LinkTimeline`].

use std::cell::UnsafeCell;

use rusty_link::{AblLink, SessionState};

/// Immutable read of the timeline's tempo and beat-phase mapping.
///
/// Edits stay local to the caller's copy until committed back through the
/// owning [`SyncTimeline`].
pub trait TimelineSnapshot: Send + Sync {
    /// Tempo in beats per minute.
    fn tempo(&self) -> f64;

    /// Set the tempo, effective at `at_micros` on the synchronization clock.
    fn set_tempo(&mut self, bpm: f64, at_micros: i64);

    /// Beat value at a host time, phase-aligned to `quantum` beats per bar.
    fn beat_at_time(&self, micros: i64, quantum: f64) -> f64;

    /// Host time at which `beat` falls, phase-aligned to `quantum`.
    fn time_at_beat(&self, beat: f64, quantum: f64) -> i64;
}

/// A peer-synchronized timeline: a monotonic clock plus snapshot exchange.
///
/// Snapshot capture/commit is the sole cross-thread synchronization primitive
/// in this crate. The `audio` variants must be callable from the real-time
/// thread (non-blocking, no allocation); the `app` variants are for every
/// other caller. Dropping the timeline disables peer synchronization.
pub trait SyncTimeline: Send + Sync + Sized + 'static {
    type Snapshot: TimelineSnapshot;

    /// Construct the timeline with a starting tempo and enable peer sync.
    fn start(initial_tempo: f64) -> Self;

    /// Current reading of the synchronization clock, in microseconds.
    fn clock_micros(&self) -> i64;

    /// Allocate a snapshot value. Not real-time safe; audio-path callers
    /// allocate up front and reuse.
    fn snapshot() -> Self::Snapshot;

    fn capture_audio(&self, snapshot: &mut Self::Snapshot);
    fn commit_audio(&self, snapshot: &Self::Snapshot);
    fn capture_app(&self, snapshot: &mut Self::Snapshot);
    fn commit_app(&self, snapshot: &Self::Snapshot);

    /// Number of other peers currently visible on the network.
    fn num_peers(&self) -> u64;
}

/// Production timeline backed by Ableton Link through `rusty_link`.
pub struct LinkTimeline {
    link: UnsafeCell<AblLink>,
}

// SAFETY: the underlying Link instance is internally synchronized; every call
// below funnels into its own thread-safe entry points. The UnsafeCell only
// papers over the binding's receiver types, the reference never escapes.
unsafe impl Send for LinkTimeline {}
unsafe impl Sync for LinkTimeline {}

impl LinkTimeline {
    #[allow(clippy::mut_from_ref)]
    fn raw(&self) -> &mut AblLink {
        // SAFETY: see the Send/Sync note above.
        unsafe { &mut *self.link.get() }
    }
}

impl SyncTimeline for LinkTimeline {
    type Snapshot = LinkSnapshot;

    fn start(initial_tempo: f64) -> Self {
        let timeline = Self {
            link: UnsafeCell::new(AblLink::new(initial_tempo)),
        };
        timeline.raw().enable(true);
        timeline
    }

    fn clock_micros(&self) -> i64 {
        self.raw().clock_micros()
    }

    fn snapshot() -> LinkSnapshot {
        LinkSnapshot {
            state: SessionState::new(),
        }
    }

    fn capture_audio(&self, snapshot: &mut LinkSnapshot) {
        self.raw().capture_audio_session_state(&mut snapshot.state);
    }

    fn commit_audio(&self, snapshot: &LinkSnapshot) {
        self.raw().commit_audio_session_state(&snapshot.state);
    }

    fn capture_app(&self, snapshot: &mut LinkSnapshot) {
        self.raw().capture_app_session_state(&mut snapshot.state);
    }

    fn commit_app(&self, snapshot: &LinkSnapshot) {
        self.raw().commit_app_session_state(&snapshot.state);
    }

    fn num_peers(&self) -> u64 {
        self.raw().num_peers()
    }
}

impl Drop for LinkTimeline {
    fn drop(&mut self) {
        self.link.get_mut().enable(false);
    }
}

/// Snapshot wrapper around `rusty_link::SessionState`.
pub struct LinkSnapshot {
    state: SessionState,
}

// SAFETY: a session state is a plain value capture of tempo and beat origin;
// there is no interior sharing, and mutation requires &mut.
unsafe impl Send for LinkSnapshot {}
unsafe impl Sync for LinkSnapshot {}

impl TimelineSnapshot for LinkSnapshot {
    fn tempo(&self) -> f64 {
        self.state.tempo()
    }

    fn set_tempo(&mut self, bpm: f64, at_micros: i64) {
        self.state.set_tempo(bpm, at_micros);
    }

    fn beat_at_time(&self, micros: i64, quantum: f64) -> f64 {
        self.state.beat_at_time(micros, quantum)
    }

    fn time_at_beat(&self, beat: f64, quantum: f64) -> i64 {
        self.state.time_at_beat(beat, quantum)
    }
}
