//! Application-facing handle.
//!
//! Bundles the session lifecycle, the read-only tempo/beat queries, and the
//! wall-clock mapping into one cloneable value for non-audio-thread callers.

use std::sync::Arc;

use crate::session::Session;
use crate::timeline::SyncTimeline;
use crate::wall_clock::WallClockSync;

/// Handle for everything outside the audio thread.
///
/// # Example
/// ```ignore
/// let handle = LinkSessionHandle::new(LinkSession::new());
/// handle.create(120.0);
/// handle.resync_wall_clock();
/// let downbeat_at = handle.wall_time_for_beat(handle.current_beat().ceil());
/// ```
pub struct SessionHandle<T: SyncTimeline> {
    session: Arc<Session<T>>,
    wall_clock: Arc<WallClockSync<T>>,
}

impl<T: SyncTimeline> Clone for SessionHandle<T> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            wall_clock: Arc::clone(&self.wall_clock),
        }
    }
}

impl<T: SyncTimeline> SessionHandle<T> {
    pub fn new(session: Arc<Session<T>>) -> Self {
        Self {
            wall_clock: Arc::new(WallClockSync::new(session.clone())),
            session,
        }
    }

    /// Start the shared timeline; a no-op if one is already live.
    pub fn create(&self, initial_tempo: f64) {
        self.session.create(initial_tempo);
    }

    /// Stop the shared timeline; safe to call repeatedly.
    pub fn destroy(&self) {
        self.session.destroy();
    }

    pub fn is_active(&self) -> bool {
        self.session.is_active()
    }

    pub fn set_output_latency_micros(&self, micros: i64) {
        self.session.set_output_latency_micros(micros);
    }

    /// Current beat, 0.0 with no session.
    pub fn current_beat(&self) -> f64 {
        self.session.current_beat()
    }

    /// Current tempo, 120.0 with no session.
    pub fn current_tempo(&self) -> f64 {
        self.session.current_tempo()
    }

    /// Wall-clock seconds since the unix epoch at which `beat` falls; 0.0
    /// with no session. Meaningful after [`resync_wall_clock`](Self::resync_wall_clock).
    pub fn wall_time_for_beat(&self, beat: f64) -> f64 {
        self.wall_clock.wall_time_for_beat(beat)
    }

    /// Recompute the cached sync-to-wall clock offset.
    pub fn resync_wall_clock(&self) {
        self.wall_clock.resync();
    }

    pub fn num_peers(&self) -> u64 {
        self.session.num_peers()
    }

    /// Underlying session, for building audio units against.
    pub fn session(&self) -> &Arc<Session<T>> {
        &self.session
    }

    pub fn wall_clock(&self) -> &Arc<WallClockSync<T>> {
        &self.wall_clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::FALLBACK_TEMPO;
    use crate::timeline::fake::{self, FakeTimeline};

    #[test]
    fn test_handle_lifecycle_passthrough() {
        fake::set_now(0);
        let handle = SessionHandle::new(Session::<FakeTimeline>::new());
        assert!(!handle.is_active());

        handle.create(128.0);
        assert!(handle.is_active());
        assert!((handle.current_tempo() - 128.0).abs() < 1e-9);

        handle.destroy();
        assert!(!handle.is_active());
        assert_eq!(handle.current_tempo(), FALLBACK_TEMPO);
        assert_eq!(handle.current_beat(), 0.0);
        assert_eq!(handle.wall_time_for_beat(3.0), 0.0);
    }

    #[test]
    fn test_clones_share_session() {
        fake::set_now(0);
        let handle = SessionHandle::new(Session::<FakeTimeline>::new());
        let other = handle.clone();
        handle.create(100.0);
        assert!(other.is_active());
        assert!((other.current_tempo() - 100.0).abs() < 1e-9);
    }
}
