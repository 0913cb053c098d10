pub mod decode;
mod instructions;
mod memory;
mod opcode;
pub mod registers;
mod utils;

use decode::Decoded;
use memory::Memory;
use opcode::Opcode;
use registers::Registers;

use crate::error::VmError;
use crate::host::Keyboard;

use byteorder::{BigEndian, ReadBytesExt};
use std::convert::TryFrom;
use std::io::{self, Read};

/// A complete LC-3 machine: registers, memory, and the fetch-decode-execute loop.
///
/// `Vm` owns no terminal state of its own; all host I/O — keyboard polling, stdout writes,
/// raw-mode toggling — is threaded through a [`Keyboard`] implementation supplied by the caller,
/// so the core can run headless under test.
pub struct Vm {
    regs: Registers,
    mem: Memory,
    running: bool,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(),
            running: false,
        }
    }

    /// Loads a big-endian `.obj` image: a two-byte origin address followed by the program
    /// words, which are written starting at that address.
    pub fn load_program<R: Read>(&mut self, mut reader: R) -> Result<(), VmError> {
        let origin = reader.read_u16::<BigEndian>()?;
        for address in origin..=u16::MAX {
            match reader.read_u16::<BigEndian>() {
                Ok(instr) => self.mem.write(address, instr),
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Runs the fetch-decode-execute loop to completion (HALT or an unrecoverable error).
    pub fn run(&mut self, keyboard: &mut dyn Keyboard) -> Result<(), VmError> {
        self.running = true;
        self.main_loop(keyboard)
    }

    pub fn abort(&mut self) {
        self.running = false;
    }

    fn main_loop(&mut self, keyboard: &mut dyn Keyboard) -> Result<(), VmError> {
        while self.running {
            self.step(keyboard)?;
        }
        Ok(())
    }

    /// Executes a single instruction at the current `PC`.
    fn step(&mut self, keyboard: &mut dyn Keyboard) -> Result<(), VmError> {
        let instr = Decoded::new(self.mem.read(self.regs.pc, keyboard));
        self.regs.pc = self.regs.pc.wrapping_add(1);
        let (regs, mem) = (&mut self.regs, &mut self.mem);
        let opcode = Opcode::try_from(instr.opcode_bits()).expect("opcode decode is total over 4 bits");
        match opcode {
            Opcode::Br => instructions::br(instr, regs),
            Opcode::Add => instructions::add(instr, regs),
            Opcode::Ld => instructions::ld(instr, regs, mem, keyboard),
            Opcode::St => instructions::st(instr, regs, mem),
            Opcode::Jsr => instructions::jsr(instr, regs),
            Opcode::And => instructions::and(instr, regs),
            Opcode::Ldr => instructions::ldr(instr, regs, mem, keyboard),
            Opcode::Str => instructions::str(instr, regs, mem),
            // Unused in this implementation; inert rather than fatal.
            Opcode::Rti => {}
            Opcode::Not => instructions::not(instr, regs),
            Opcode::Ldi => instructions::ldi(instr, regs, mem, keyboard),
            Opcode::Sti => instructions::sti(instr, regs, mem, keyboard),
            Opcode::Jmp => instructions::jmp(instr, regs),
            // Unused in this implementation; inert rather than fatal.
            Opcode::Res => {}
            Opcode::Lea => instructions::lea(instr, regs),
            Opcode::Trap => {
                let should_halt = instructions::trap(instr, regs, mem, keyboard)?;
                if should_halt {
                    self.running = false;
                }
            }
        };
        Ok(())
    }
}
