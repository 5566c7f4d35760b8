//! Ableton Link bridge for sample-accurate audio graphs.
//!
//! Translates between a peer-synchronized musical timeline (Ableton Link via
//! `rusty_link`) and a block/sample-based audio graph (fundsp [`AudioUnit`]s),
//! plus a small non-real-time application surface.
//!
//! # Primary API
//!
//! - [`Session`] / [`SessionHandle`]: lifecycle of the single shared timeline
//!   handle and the non-audio-thread queries
//! - [`beat_node`] / [`ControlRateBeat`] / [`AudioRateBeat`]: beat generators
//!   for the audio graph
//! - [`TempoRampNode`] / [`TempoGenNode`]: tempo control and readout units
//! - [`WallClockSync`]: beat-to-unix-time mapping
//!
//! The audio path never locks, never allocates, and never returns errors:
//! with no active session every unit degrades to its documented fallback
//! value. Snapshot capture/commit on the timeline is the sole cross-thread
//! synchronization primitive.
//!
//! # Example
//!
//! ```ignore
//! use tempolink::{beat_node, BeatRate, LinkSession, LinkSessionHandle};
//!
//! let session = LinkSession::new();
//! session.create(120.0);
//! session.set_output_latency_micros(11_610); // 512 samples at 44.1 kHz
//!
//! let beat = beat_node(&session, BeatRate::Audio, 44_100.0);
//! // hand `beat` to the audio graph...
//!
//! let handle = LinkSessionHandle::new(session);
//! handle.resync_wall_clock();
//! let at = handle.wall_time_for_beat(handle.current_beat().ceil());
//! ```

pub mod error;
pub use error::{Error, Result};

mod timeline;
pub use timeline::{LinkSnapshot, LinkTimeline, SyncTimeline, TimelineSnapshot};

mod session;
pub use session::{Session, SessionConfig, DEFAULT_QUANTUM, FALLBACK_TEMPO};

mod host_time;
pub use host_time::{control_time, HostTimeCursor, MICROS_PER_SEC};

mod beat;
pub use beat::{beat_node, AudioRateBeat, BeatRate, ControlRateBeat};

mod tempo;
pub use tempo::{TempoGenNode, TempoRampNode};

mod wall_clock;
pub use wall_clock::WallClockSync;

mod handle;
pub use handle::SessionHandle;

pub(crate) mod lockfree;
pub use lockfree::{AtomicDouble, AtomicMicros};

pub use fundsp::prelude::AudioUnit;

/// Session over the production Link timeline.
pub type LinkSession = Session<LinkTimeline>;

/// Application handle over the production Link timeline.
pub type LinkSessionHandle = SessionHandle<LinkTimeline>;
