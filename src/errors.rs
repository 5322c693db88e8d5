use std::io;
use thiserror::Error;

/// Possible errors that arise from attempting to expand a compressed stream
/// into its original data, or vice versa.
#[derive(Error, Debug)]
pub enum PakError {
    #[error("malformed stream: {0}")]
    Malformed(#[from] MalformedStream),

    #[error("invalid encoder settings: {0}")]
    InvalidSettings(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// The ways a token stream can be rejected by the bounds checked decoders.
///
/// None of these can occur for a stream produced by this crate's encoders
/// when it is decoded into a destination of at least the original size.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedStream {
    #[error("stream ended at byte {position} before its terminator")]
    UnexpectedEnd { position: usize },

    #[error("copy back of {distance} bytes with only {written} bytes written")]
    BadLookBack { distance: usize, written: usize },

    #[error("token needs {needed} bytes of output, but the destination holds {capacity}")]
    OutputOverflow { needed: usize, capacity: usize },
}
