//! The VM's error taxonomy.
//!
//! Every fallible boundary in the core (image loading, TRAP dispatch, host
//! I/O) returns a `Result<_, VmError>` rather than panicking, so a caller
//! (the CLI in `main.rs`, or a test) can decide how to report the failure.

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VmError {
    /// The object image could not be opened or read to completion.
    #[error("failed to read object image: {0}")]
    ImageUnreadable(#[from] io::Error),

    /// A `TRAP` instruction specified a vector outside `0x20..=0x25`.
    #[error("invalid trap vector: {0:#04x}")]
    InvalidTrapVector(u16),

    /// Reading or writing the host terminal failed.
    #[error("terminal I/O error: {0}")]
    HostIo(io::Error),
}
