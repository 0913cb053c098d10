//! Command-line argument parsing for the `lc3-vm` binary.

use std::path::PathBuf;

use clap::Parser;

/// Runs a compiled LC-3 object image.
#[derive(Debug, Parser)]
#[command(name = "lc3-vm", about = "A virtual machine for the LC-3 architecture")]
pub struct Cli {
    /// Path to a big-endian `.obj` image to load and execute.
    pub program: PathBuf,
}
