//! `TRAP` service routines (trap vectors `0x20..=0x25`)

use crate::error::VmError;
use crate::host::{self, Keyboard};
use crate::vm::{memory, Memory, Registers};

use std::convert::TryFrom;

pub enum TrapCode {
    Getc,
    Out,
    Puts,
    In,
    Putsp,
    Halt,
}

impl TryFrom<u16> for TrapCode {
    type Error = ();

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        use TrapCode::*;

        let trap_code = match value {
            0x20 => Getc,
            0x21 => Out,
            0x22 => Puts,
            0x23 => In,
            0x24 => Putsp,
            0x25 => Halt,
            _ => return Err(()),
        };

        Ok(trap_code)
    }
}

/// Reads a single character from the keyboard into R0, without echoing it.
pub fn getc(regs: &mut Registers, keyboard: &mut dyn Keyboard) -> Result<(), VmError> {
    let byte = keyboard.read_byte().map_err(VmError::HostIo)?;
    regs.write(0, byte as u16);
    regs.update_cond_flags(byte as u16);
    Ok(())
}

/// Writes the character in R0 to the console.
pub fn out(regs: &Registers) -> Result<(), VmError> {
    host::write_char(regs.read(0) as u8 as char)
}

/// Writes the NUL-terminated string starting at the address in R0, one character per word.
pub fn puts(regs: &Registers, mem: &mut Memory, keyboard: &mut dyn Keyboard) -> Result<(), VmError> {
    let mut buf = String::new();
    let mut addr = regs.read(0);
    loop {
        let word = mem.read(addr, keyboard);
        if word == 0x0000 {
            break;
        }
        buf.push(word as u8 as char);
        if addr as usize + 1 >= memory::MEMORY_SIZE {
            break;
        }
        addr += 1;
    }
    host::write_str(&buf)
}

/// Writes the NUL-terminated string starting at the address in R0, two characters packed per
/// word (low byte first, then high byte).
pub fn putsp(regs: &Registers, mem: &mut Memory, keyboard: &mut dyn Keyboard) -> Result<(), VmError> {
    let mut buf = String::new();
    let mut addr = regs.read(0);
    loop {
        let word = mem.read(addr, keyboard);
        if word == 0x0000 {
            break;
        }
        let [chr2, chr1] = word.to_be_bytes();
        buf.push(chr1 as char);
        if chr2 != 0 {
            buf.push(chr2 as char);
        }
        if addr as usize + 1 >= memory::MEMORY_SIZE {
            break;
        }
        addr += 1;
    }
    host::write_str(&buf)
}

/// Prompts for and reads a single character from the keyboard into R0, echoing it back.
pub fn r#in(regs: &mut Registers, keyboard: &mut dyn Keyboard) -> Result<(), VmError> {
    host::write_str("Enter a character: ")?;
    let byte = keyboard.read_byte().map_err(VmError::HostIo)?;
    host::write_char(byte as char)?;
    regs.write(0, byte as u16);
    regs.update_cond_flags(byte as u16);
    Ok(())
}

/// Halts execution.
pub fn halt() -> Result<(), VmError> {
    host::write_str("HALT\n")
}
