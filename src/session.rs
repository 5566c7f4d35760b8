//! Session lifecycle and the shared timeline handle.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::lockfree::AtomicMicros;
use crate::timeline::{SyncTimeline, TimelineSnapshot};

/// Beats per bar used for beat-phase alignment unless configured otherwise.
pub const DEFAULT_QUANTUM: f64 = 4.0;

/// Tempo reported by non-audio queries when no session is active.
///
/// Distinct from the audio-path fallback: beat units freeze at their last
/// computed value instead. Callers must not conflate the two.
pub const FALLBACK_TEMPO: f64 = 120.0;

/// Validated construction parameters for a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Starting tempo in BPM, applied once at creation.
    pub initial_tempo: f64,
    /// Beats per bar for beat-phase calculations.
    pub quantum: f64,
    /// Output buffering delay compensated into host-time lookups.
    pub output_latency_micros: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_tempo: FALLBACK_TEMPO,
            quantum: DEFAULT_QUANTUM,
            output_latency_micros: 0,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        if !(20.0..=999.0).contains(&self.initial_tempo) {
            return Err(Error::InvalidTempo(self.initial_tempo));
        }
        if !(self.quantum > 0.0) {
            return Err(Error::InvalidQuantum(self.quantum));
        }
        Ok(())
    }
}

/// Owner of the single shared timeline handle.
///
/// Created via [`Session::new`] and cloned as an `Arc` into every unit that
/// needs it. `create`/`destroy` are idempotent, serialized against each
/// other, and must stay off the audio thread; the audio thread only ever
/// reaches the timeline through lock-free handle loads and snapshot
/// capture/commit.
pub struct Session<T: SyncTimeline> {
    timeline: ArcSwapOption<T>,
    // Serializes create/destroy; never touched by the audio thread.
    lifecycle: Mutex<()>,
    output_latency: AtomicMicros,
    quantum: f64,
}

impl<T: SyncTimeline> Session<T> {
    /// New inactive session with the default quantum.
    pub fn new() -> Arc<Self> {
        Self::with_quantum(DEFAULT_QUANTUM)
    }

    pub fn with_quantum(quantum: f64) -> Arc<Self> {
        Arc::new(Self {
            timeline: ArcSwapOption::const_empty(),
            lifecycle: Mutex::new(()),
            output_latency: AtomicMicros::new(0),
            quantum,
        })
    }

    /// Validated construction that also starts the timeline.
    pub fn with_config(config: SessionConfig) -> Result<Arc<Self>> {
        config.validate()?;
        let session = Self::with_quantum(config.quantum);
        session.set_output_latency_micros(config.output_latency_micros);
        session.create(config.initial_tempo);
        Ok(session)
    }

    /// Start the shared timeline with `initial_tempo` and enable peer
    /// synchronization. A second create while one is live logs a warning and
    /// has no effect.
    pub fn create(&self, initial_tempo: f64) {
        let _guard = self.lifecycle.lock();
        if self.timeline.load().is_some() {
            warn!("timeline session already running, create ignored");
            return;
        }
        info!(initial_tempo, "starting timeline session");
        self.timeline.store(Some(Arc::new(T::start(initial_tempo))));
    }

    /// Disable peer synchronization and release the handle. Safe to call
    /// repeatedly; a later [`create`](Self::create) starts fresh.
    pub fn destroy(&self) {
        let _guard = self.lifecycle.lock();
        if self.timeline.swap(None).is_some() {
            info!("timeline session stopped");
        }
    }

    pub fn is_active(&self) -> bool {
        self.timeline.load().is_some()
    }

    /// The live handle, if any. Lock-free and allocation-free; safe on the
    /// audio thread.
    pub(crate) fn active(&self) -> Option<Arc<T>> {
        self.timeline.load_full()
    }

    /// Store the output latency compensated into host-time lookups. Valid at
    /// any time, including before a timeline exists.
    pub fn set_output_latency_micros(&self, micros: i64) {
        self.output_latency.set(micros);
    }

    pub fn output_latency_micros(&self) -> i64 {
        self.output_latency.get()
    }

    pub fn quantum(&self) -> f64 {
        self.quantum
    }

    /// Peers currently visible on the network; 0 with no session.
    pub fn num_peers(&self) -> u64 {
        self.active().map(|timeline| timeline.num_peers()).unwrap_or(0)
    }

    /// Current beat from a fresh app snapshot; 0.0 with no session.
    pub fn current_beat(&self) -> f64 {
        match self.active() {
            Some(timeline) => {
                let mut snapshot = T::snapshot();
                timeline.capture_app(&mut snapshot);
                snapshot.beat_at_time(timeline.clock_micros(), self.quantum)
            }
            None => 0.0,
        }
    }

    /// Current tempo from a fresh app snapshot; [`FALLBACK_TEMPO`] with no
    /// session.
    pub fn current_tempo(&self) -> f64 {
        match self.active() {
            Some(timeline) => {
                let mut snapshot = T::snapshot();
                timeline.capture_app(&mut snapshot);
                snapshot.tempo()
            }
            None => FALLBACK_TEMPO,
        }
    }
}
