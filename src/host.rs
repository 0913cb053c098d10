//! Host collaborators: the four I/O primitives the execution core depends on
//! but does not implement itself (§4.6 of the spec).
//!
//! The core only ever talks to these through the [`Keyboard`] trait, so unit
//! tests can substitute [`ScriptedKeyboard`] and never touch a real terminal
//! or stdin file descriptor.

use crate::error::VmError;
use std::io::{self, Read, Write};
use std::time::Duration;
use termios::Termios;

/// The non-blocking poll / blocking read pair the memory-mapped keyboard
/// registers are built on.
pub trait Keyboard {
    /// True if a keypress is available without waiting.
    fn poll(&mut self) -> bool;
    /// Blocks until a byte is available on the keyboard and returns it.
    fn read_byte(&mut self) -> io::Result<u8>;
}

/// Reads directly from the process's stdin, using a zero-timeout `select`
/// to implement [`Keyboard::poll`] without consuming a byte.
#[derive(Debug, Default)]
pub struct TermiosKeyboard;

impl Keyboard for TermiosKeyboard {
    fn poll(&mut self) -> bool {
        stdin_ready(Duration::from_secs(0))
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        let mut buffer = [0u8; 1];
        io::stdin().read_exact(&mut buffer)?;
        Ok(buffer[0])
    }
}

/// Zero-timeout readiness check on stdin via `select(2)`.
///
/// This must not consume input: a program polling KBSR without a key
/// waiting has to observe `0`, not block.
fn stdin_ready(timeout: Duration) -> bool {
    use nix::sys::select::{select, FdSet};
    use nix::sys::time::{TimeVal, TimeValLike};
    use std::os::unix::io::RawFd;

    const STDIN: RawFd = libc::STDIN_FILENO;

    let mut readfds = FdSet::new();
    readfds.insert(STDIN);

    let mut timeval = TimeVal::milliseconds(timeout.as_millis() as i64);
    matches!(select(None, &mut readfds, None, None, &mut timeval), Ok(n) if n > 0)
}

/// Writes a character to the host's stdout and flushes immediately.
pub fn write_char(c: char) -> Result<(), VmError> {
    print!("{}", c);
    io::stdout().flush().map_err(VmError::HostIo)
}

/// Writes a literal string to the host's stdout and flushes immediately.
pub fn write_str(s: &str) -> Result<(), VmError> {
    print!("{}", s);
    io::stdout().flush().map_err(VmError::HostIo)
}

/// Puts the terminal into non-canonical, no-echo mode and returns the prior
/// settings so they can be restored on any exit path.
pub fn disable_input_buffering() -> io::Result<Termios> {
    use termios::{tcsetattr, ECHO, ICANON, TCSANOW};

    let original = Termios::from_fd(libc::STDIN_FILENO)?;
    let mut raw = original;
    raw.c_lflag &= !(ICANON | ECHO);
    tcsetattr(libc::STDIN_FILENO, TCSANOW, &raw)?;
    Ok(original)
}

/// Restores a previously captured terminal mode.
pub fn restore_input_buffering(original: &Termios) -> io::Result<()> {
    use termios::{tcsetattr, TCSANOW};
    tcsetattr(libc::STDIN_FILENO, TCSANOW, original)
}

/// A deterministic [`Keyboard`] for tests: serves a fixed queue of bytes and
/// never touches a real file descriptor.
#[derive(Debug, Default)]
pub struct ScriptedKeyboard {
    pending: std::collections::VecDeque<u8>,
}

impl ScriptedKeyboard {
    pub fn with_bytes(bytes: impl IntoIterator<Item = u8>) -> Self {
        Self {
            pending: bytes.into_iter().collect(),
        }
    }
}

impl Keyboard for ScriptedKeyboard {
    fn poll(&mut self) -> bool {
        !self.pending.is_empty()
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        self.pending
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted input left"))
    }
}
