//! Beat-producing audio units.
//!
//! Two fixed-rate variants of the same beat-producer capability, chosen once
//! by [`beat_node`]: [`ControlRateBeat`] emits one beat value per block,
//! [`AudioRateBeat`] one per sample with continuity across block boundaries.
//! Both capture a single timeline snapshot per block; tempo changes landing
//! mid-block take effect on the next one.
//!
//! With no active session both variants hold their last computed beat (0.0
//! before the first valid read). Across a disable the output freezes rather
//! than resetting; across a re-enable it resumes from the new session's
//! snapshot on the next processed block.

use std::sync::Arc;

use fundsp::prelude::*;

use crate::host_time::{control_time, HostTimeCursor};
use crate::lockfree::AtomicDouble;
use crate::session::Session;
use crate::timeline::{SyncTimeline, TimelineSnapshot};

/// Output granularity of a beat unit, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeatRate {
    /// One beat value per processing block.
    Control,
    /// One beat value per sample.
    Audio,
}

/// Build a beat unit at the requested rate.
pub fn beat_node<T: SyncTimeline>(
    session: &Arc<Session<T>>,
    rate: BeatRate,
    sample_rate: f64,
) -> Box<dyn AudioUnit> {
    match rate {
        BeatRate::Control => Box::new(ControlRateBeat::new(session.clone())),
        BeatRate::Audio => Box::new(AudioRateBeat::new(session.clone(), sample_rate)),
    }
}

/// Control-rate beat generator: one timeline evaluation per block, held for
/// every sample of the block.
pub struct ControlRateBeat<T: SyncTimeline> {
    session: Arc<Session<T>>,
    snapshot: T::Snapshot,
    last_beat: f64,
}

impl<T: SyncTimeline> ControlRateBeat<T> {
    pub fn new(session: Arc<Session<T>>) -> Self {
        Self {
            snapshot: T::snapshot(),
            session,
            last_beat: 0.0,
        }
    }

    /// Last beat value emitted; the fallback while no session is active.
    pub fn last_beat(&self) -> f64 {
        self.last_beat
    }

    fn next_beat(&mut self) -> f64 {
        if let Some(timeline) = self.session.active() {
            timeline.capture_audio(&mut self.snapshot);
            let time = control_time(
                timeline.clock_micros(),
                self.session.output_latency_micros(),
            );
            self.last_beat = self.snapshot.beat_at_time(time, self.session.quantum());
        }
        self.last_beat
    }
}

impl<T: SyncTimeline> Clone for ControlRateBeat<T> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            snapshot: T::snapshot(),
            last_beat: self.last_beat,
        }
    }
}

impl<T: SyncTimeline> AudioUnit for ControlRateBeat<T> {
    fn inputs(&self) -> usize {
        0
    }

    fn outputs(&self) -> usize {
        1
    }

    fn reset(&mut self) {
        self.last_beat = 0.0;
    }

    fn set_sample_rate(&mut self, _sample_rate: f64) {}

    #[inline]
    fn tick(&mut self, _input: &[f32], output: &mut [f32]) {
        output[0] = self.next_beat() as f32;
    }

    fn process(&mut self, size: usize, _input: &BufferRef, output: &mut BufferMut) {
        let beat = self.next_beat() as f32;
        for i in 0..size {
            output.set_f32(0, i, beat);
        }
    }

    fn get_id(&self) -> u64 {
        const CONTROL_BEAT_ID: u64 = 0x_4C4E_4B42_4B52_0000; // "LNKBKR"
        CONTROL_BEAT_ID
    }

    fn route(&mut self, _input: &SignalFrame, _frequency: f64) -> SignalFrame {
        let mut output = SignalFrame::new(1);
        output.set(0, Signal::Value(self.last_beat));
        output
    }

    fn footprint(&self) -> usize {
        core::mem::size_of::<Self>()
    }
}

/// Audio-rate beat generator: one snapshot per block, one beat per sample
/// along an arithmetically advanced host-time cursor.
pub struct AudioRateBeat<T: SyncTimeline> {
    session: Arc<Session<T>>,
    snapshot: T::Snapshot,
    cursor: HostTimeCursor,
    last_beat: f64,
    beat_writeback: Option<Arc<AtomicDouble>>,
}

impl<T: SyncTimeline> AudioRateBeat<T> {
    pub fn new(session: Arc<Session<T>>, sample_rate: f64) -> Self {
        Self {
            snapshot: T::snapshot(),
            session,
            cursor: HostTimeCursor::new(sample_rate),
            last_beat: 0.0,
            beat_writeback: None,
        }
    }

    /// Publish the last beat of every block to `writeback` for UI/meter use.
    pub fn with_beat_writeback(mut self, writeback: Arc<AtomicDouble>) -> Self {
        self.beat_writeback = Some(writeback);
        self
    }

    pub fn beat_writeback(&mut self) -> Arc<AtomicDouble> {
        Arc::clone(
            self.beat_writeback
                .get_or_insert_with(|| Arc::new(AtomicDouble::new(0.0))),
        )
    }

    /// Last beat value emitted; the fallback while no session is active.
    pub fn last_beat(&self) -> f64 {
        self.last_beat
    }
}

impl<T: SyncTimeline> Clone for AudioRateBeat<T> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            snapshot: T::snapshot(),
            cursor: self.cursor.clone(),
            last_beat: self.last_beat,
            beat_writeback: self.beat_writeback.as_ref().map(Arc::clone),
        }
    }
}

impl<T: SyncTimeline> AudioUnit for AudioRateBeat<T> {
    fn inputs(&self) -> usize {
        0
    }

    fn outputs(&self) -> usize {
        1
    }

    fn reset(&mut self) {
        self.last_beat = 0.0;
        self.cursor.unprime();
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.cursor.set_sample_rate(sample_rate);
    }

    #[inline]
    fn tick(&mut self, _input: &[f32], output: &mut [f32]) {
        if let Some(timeline) = self.session.active() {
            if !self.cursor.is_primed() {
                self.cursor.prime(
                    timeline.clock_micros(),
                    self.session.output_latency_micros(),
                );
            }
            timeline.capture_audio(&mut self.snapshot);
            self.last_beat = self
                .snapshot
                .beat_at_time(self.cursor.sample_time(0), self.session.quantum());
            self.cursor.advance(1);
        } else {
            self.cursor.unprime();
        }
        output[0] = self.last_beat as f32;

        if let Some(ref writeback) = self.beat_writeback {
            writeback.set(self.last_beat);
        }
    }

    fn process(&mut self, size: usize, _input: &BufferRef, output: &mut BufferMut) {
        if let Some(timeline) = self.session.active() {
            if !self.cursor.is_primed() {
                self.cursor.prime(
                    timeline.clock_micros(),
                    self.session.output_latency_micros(),
                );
            }
            // One capture per block: tempo and phase are treated as static
            // across a single block.
            timeline.capture_audio(&mut self.snapshot);
            let quantum = self.session.quantum();
            for i in 0..size {
                let beat = self
                    .snapshot
                    .beat_at_time(self.cursor.sample_time(i), quantum);
                output.set_f32(0, i, beat as f32);
                self.last_beat = beat;
            }
            self.cursor.advance(size);
        } else {
            self.cursor.unprime();
            let beat = self.last_beat as f32;
            for i in 0..size {
                output.set_f32(0, i, beat);
            }
        }

        // Once per block, not per sample.
        if let Some(ref writeback) = self.beat_writeback {
            writeback.set(self.last_beat);
        }
    }

    fn get_id(&self) -> u64 {
        const AUDIO_BEAT_ID: u64 = 0x_4C4E_4B42_4152_0000; // "LNKBAR"
        AUDIO_BEAT_ID
    }

    fn route(&mut self, _input: &SignalFrame, _frequency: f64) -> SignalFrame {
        let mut output = SignalFrame::new(1);
        output.set(0, Signal::Value(self.last_beat));
        output
    }

    fn footprint(&self) -> usize {
        core::mem::size_of::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::fake::{self, FakeTimeline};

    const SR: f64 = 48_000.0;

    fn active_session() -> Arc<Session<FakeTimeline>> {
        fake::set_now(0);
        let session = Session::<FakeTimeline>::new();
        session.create(120.0);
        session
    }

    #[test]
    fn test_control_rate_tracks_clock() {
        let session = active_session();
        let mut unit = ControlRateBeat::new(session);
        let mut output = [0.0f32];

        fake::set_now(1_000_000);
        unit.tick(&[], &mut output);
        // 120 BPM: 2 beats after one second.
        assert!((output[0] - 2.0).abs() < 1e-4);

        fake::advance(500_000);
        unit.tick(&[], &mut output);
        assert!((output[0] - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_control_rate_applies_latency() {
        let session = active_session();
        session.set_output_latency_micros(500_000);
        let mut unit = ControlRateBeat::new(session);
        let mut output = [0.0f32];

        fake::set_now(1_000_000);
        unit.tick(&[], &mut output);
        // Evaluated at now + latency = 1.5 s = 3 beats.
        assert!((output[0] - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_control_rate_freezes_without_session() {
        let session = active_session();
        let mut unit = ControlRateBeat::new(session.clone());
        let mut output = [0.0f32];

        fake::set_now(2_000_000);
        unit.tick(&[], &mut output);
        let frozen = output[0];
        assert!(frozen > 0.0);

        session.destroy();
        fake::advance(5_000_000);
        unit.tick(&[], &mut output);
        assert_eq!(output[0], frozen);
        unit.tick(&[], &mut output);
        assert_eq!(output[0], frozen);
    }

    #[test]
    fn test_control_rate_zero_before_first_session() {
        let session = Session::<FakeTimeline>::new();
        let mut unit = ControlRateBeat::new(session);
        let mut output = [1.0f32];
        unit.tick(&[], &mut output);
        assert_eq!(output[0], 0.0);
    }

    #[test]
    fn test_audio_rate_advances_one_sample_per_tick() {
        let session = active_session();
        let mut unit = AudioRateBeat::new(session, SR);
        let mut output = [0.0f32];

        unit.tick(&[], &mut output);
        let first = unit.last_beat();
        unit.tick(&[], &mut output);
        let second = unit.last_beat();

        // 120 BPM at 48 kHz: 2 beats/s over 48000 samples.
        let beat_per_sample = 2.0 / SR;
        assert!((second - first - beat_per_sample).abs() < 3e-6);
    }

    #[test]
    fn test_audio_rate_continuity_across_ticks() {
        let session = active_session();
        let mut unit = AudioRateBeat::new(session, SR);
        let mut output = [0.0f32];

        let mut previous = None;
        let beat_per_sample = 2.0 / SR;
        for _ in 0..1024 {
            unit.tick(&[], &mut output);
            let beat = unit.last_beat();
            if let Some(prev) = previous {
                let step: f64 = beat - prev;
                assert!((step - beat_per_sample).abs() < 3e-6, "seam: {step}");
            }
            previous = Some(beat);
        }
    }

    #[test]
    fn test_audio_rate_ignores_clock_between_blocks() {
        let session = active_session();
        let mut unit = AudioRateBeat::new(session, SR);
        let mut output = [0.0f32];

        unit.tick(&[], &mut output);
        let first = unit.last_beat();

        // A clock jump must not disturb the arithmetic cursor.
        fake::advance(10_000_000);
        unit.tick(&[], &mut output);
        let second = unit.last_beat();
        assert!((second - first - 2.0 / SR).abs() < 3e-6);
    }

    #[test]
    fn test_audio_rate_freezes_then_reprimes() {
        let session = active_session();
        let mut unit = AudioRateBeat::new(session.clone(), SR);
        let mut output = [0.0f32];

        for _ in 0..64 {
            unit.tick(&[], &mut output);
        }
        let frozen = unit.last_beat();

        session.destroy();
        for _ in 0..64 {
            unit.tick(&[], &mut output);
            assert_eq!(unit.last_beat(), frozen);
        }

        // Re-enable: output resumes from the new session's snapshot.
        fake::set_now(0);
        session.create(60.0);
        unit.tick(&[], &mut output);
        assert!((unit.last_beat() - 0.0).abs() < 1e-6);
    }

    #[test]
    fn test_audio_rate_beat_writeback_once_per_block() {
        let session = active_session();
        let mut unit = AudioRateBeat::new(session, SR);
        let writeback = unit.beat_writeback();

        let mut output = [0.0f32];
        fake::set_now(1_000_000);
        unit.tick(&[], &mut output);
        assert!((writeback.get() - unit.last_beat()).abs() < 1e-12);
    }

    #[test]
    fn test_factory_picks_variant() {
        let session = active_session();
        let control = beat_node(&session, BeatRate::Control, SR);
        let audio = beat_node(&session, BeatRate::Audio, SR);
        assert_eq!(control.inputs(), 0);
        assert_eq!(control.outputs(), 1);
        assert_ne!(control.get_id(), audio.get_id());
    }
}
