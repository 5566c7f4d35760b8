//! Tempo units: ramped tempo commits and a tempo generator.

use std::sync::Arc;

use fundsp::prelude::*;
use tracing::warn;

use crate::session::{Session, FALLBACK_TEMPO};
use crate::timeline::{SyncTimeline, TimelineSnapshot};

/// Baseline captured once when a ramp is built against a live session.
#[derive(Debug, Clone, Copy)]
struct RampBaseline {
    tempo: f64,
    delta: f64,
}

/// Tempo ramp: commits `T0 - p * (T0 - target)` to the shared timeline, where
/// `T0` is the tempo captured once at construction and `p` is the ramp
/// position read from input 0.
///
/// The baseline is deliberately never re-read: interpolation always runs from
/// the activation-time tempo toward the declared target, so the ramp's own
/// commits cannot perturb its next step. `p` is not clamped; values outside
/// [0, 1] extrapolate linearly.
///
/// Built without a live session, the unit is inert for its whole lifetime.
pub struct TempoRampNode<T: SyncTimeline> {
    session: Arc<Session<T>>,
    snapshot: T::Snapshot,
    baseline: Option<RampBaseline>,
}

impl<T: SyncTimeline> TempoRampNode<T> {
    pub fn new(session: Arc<Session<T>>, target_tempo: f64) -> Self {
        let mut snapshot = T::snapshot();
        let baseline = match session.active() {
            Some(timeline) => {
                timeline.capture_audio(&mut snapshot);
                let tempo = snapshot.tempo();
                Some(RampBaseline {
                    tempo,
                    delta: tempo - target_tempo,
                })
            }
            None => {
                warn!("no timeline session, tempo ramp will be inert");
                None
            }
        };

        Self {
            snapshot,
            session,
            baseline,
        }
    }

    /// Tempo captured at construction, if a session was live.
    pub fn baseline_tempo(&self) -> Option<f64> {
        self.baseline.map(|baseline| baseline.tempo)
    }

    fn commit(&mut self, position: f32) {
        let (Some(timeline), Some(baseline)) = (self.session.active(), self.baseline) else {
            return;
        };
        timeline.capture_audio(&mut self.snapshot);
        let tempo = baseline.tempo - f64::from(position) * baseline.delta;
        self.snapshot.set_tempo(tempo, timeline.clock_micros());
        timeline.commit_audio(&self.snapshot);
    }
}

impl<T: SyncTimeline> Clone for TempoRampNode<T> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            snapshot: T::snapshot(),
            baseline: self.baseline,
        }
    }
}

impl<T: SyncTimeline> AudioUnit for TempoRampNode<T> {
    fn inputs(&self) -> usize {
        1 // Ramp position
    }

    fn outputs(&self) -> usize {
        0 // Sink: side effect only
    }

    fn reset(&mut self) {}

    fn set_sample_rate(&mut self, _sample_rate: f64) {}

    #[inline]
    fn tick(&mut self, input: &[f32], _output: &mut [f32]) {
        self.commit(input[0]);
    }

    fn process(&mut self, size: usize, input: &BufferRef, _output: &mut BufferMut) {
        // Control-rate semantics: the ramp position is read once per block.
        if size > 0 {
            self.commit(input.at_f32(0, 0));
        }
    }

    fn get_id(&self) -> u64 {
        const TEMPO_RAMP_ID: u64 = 0x_4C4E_4B54_524D_5000; // "LNKTRMP"
        TEMPO_RAMP_ID
    }

    fn route(&mut self, _input: &SignalFrame, _frequency: f64) -> SignalFrame {
        SignalFrame::new(0)
    }

    fn footprint(&self) -> usize {
        core::mem::size_of::<Self>()
    }
}

/// Tempo generator: outputs the shared timeline's current tempo, or
/// [`FALLBACK_TEMPO`] with no session.
pub struct TempoGenNode<T: SyncTimeline> {
    session: Arc<Session<T>>,
    snapshot: T::Snapshot,
    last_tempo: f64,
}

impl<T: SyncTimeline> TempoGenNode<T> {
    pub fn new(session: Arc<Session<T>>) -> Self {
        Self {
            snapshot: T::snapshot(),
            session,
            last_tempo: FALLBACK_TEMPO,
        }
    }

    fn next_tempo(&mut self) -> f64 {
        match self.session.active() {
            Some(timeline) => {
                timeline.capture_audio(&mut self.snapshot);
                self.last_tempo = self.snapshot.tempo();
                self.last_tempo
            }
            None => FALLBACK_TEMPO,
        }
    }
}

impl<T: SyncTimeline> Clone for TempoGenNode<T> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            snapshot: T::snapshot(),
            last_tempo: self.last_tempo,
        }
    }
}

impl<T: SyncTimeline> AudioUnit for TempoGenNode<T> {
    fn inputs(&self) -> usize {
        0
    }

    fn outputs(&self) -> usize {
        1
    }

    fn reset(&mut self) {
        self.last_tempo = FALLBACK_TEMPO;
    }

    fn set_sample_rate(&mut self, _sample_rate: f64) {}

    #[inline]
    fn tick(&mut self, _input: &[f32], output: &mut [f32]) {
        output[0] = self.next_tempo() as f32;
    }

    fn process(&mut self, size: usize, _input: &BufferRef, output: &mut BufferMut) {
        let tempo = self.next_tempo() as f32;
        for i in 0..size {
            output.set_f32(0, i, tempo);
        }
    }

    fn get_id(&self) -> u64 {
        const TEMPO_GEN_ID: u64 = 0x_4C4E_4B54_4745_4E00; // "LNKTGEN"
        TEMPO_GEN_ID
    }

    fn route(&mut self, _input: &SignalFrame, _frequency: f64) -> SignalFrame {
        let mut output = SignalFrame::new(1);
        output.set(0, Signal::Value(self.last_tempo));
        output
    }

    fn footprint(&self) -> usize {
        core::mem::size_of::<Self>()
    }
}
