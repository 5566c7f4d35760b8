//! Error types for tempolink.
//!
//! Errors exist only at the non-real-time configuration boundary. The
//! real-time path never returns them: "no active session" degrades to the
//! documented fallback value of each unit instead.

use thiserror::Error;

/// Error type for tempolink configuration.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid tempo: {0}. Must be between 20.0 and 999.0 BPM")]
    InvalidTempo(f64),

    #[error("Invalid quantum: {0}. Must be positive")]
    InvalidQuantum(f64),
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
