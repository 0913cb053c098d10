//! All instructions that are supported and have an implementation
//!
//! Instructions are 16-bit values and have a specific binary encoding. The first four bits of
//! each instruction express the [`Opcode`](super::Opcode). Each handler here takes a
//! [`Decoded`] view rather than the raw word, so the bit arithmetic for a given field lives in
//! exactly one place.

mod trap;

use super::decode::Decoded;
use super::{Memory, Registers};
use crate::error::VmError;
use crate::host::Keyboard;
use std::convert::TryFrom;
use trap::TrapCode;

/// Parses and performs the `BR` (*branch*) instruction
///
/// # Binary encoding
///
/// ```plain
/// ┌───┬───┬───┬───┬───┬───┬───┬───┬───┬───┬───┬───┬───┬───┬───┬───┐
/// │ 0   0   0   0 │ n │ z │ p │             PCoffset9             │
/// └───┴───┴───┴───┴───┴───┴───┴───┴───┴───┴───┴───┴───┴───┴───┴───┘
/// ```
///
/// A `cond-mask` of `0` never branches, regardless of `COND`; `0b111` always branches. BR never
/// updates `COND`.
pub fn br(instr: Decoded, regs: &mut Registers) {
    if (instr.cond_mask() & (regs.cond as u16)) > 0 {
        regs.pc = regs.pc.wrapping_add(instr.offset9());
    }
}

/// Parses and performs the `ADD` (*addition*) instruction
///
/// **Note**: this instruction updates the `COND` register (NZP flags) based on the value written
/// to `DR`.
pub fn add(instr: Decoded, regs: &mut Registers) {
    let value = if instr.is_imm_mode() {
        regs.read(instr.sr1()).wrapping_add(instr.imm5())
    } else {
        regs.read(instr.sr1()).wrapping_add(regs.read(instr.sr2()))
    };

    regs.write(instr.dr(), value);
    regs.update_cond_flags(value);
}

/// Parses and performs the `LD` (*load*) instruction
///
/// **Note**: this instruction updates the `COND` register (NZP flags) based on the value written
/// to `DR`.
pub fn ld(instr: Decoded, regs: &mut Registers, mem: &mut Memory, keyboard: &mut dyn Keyboard) {
    let address = regs.pc.wrapping_add(instr.offset9());
    let value = mem.read(address, keyboard);
    regs.write(instr.dr(), value);
    regs.update_cond_flags(value);
}

/// Parses and performs the `ST` (*store*) instruction
pub fn st(instr: Decoded, regs: &Registers, mem: &mut Memory) {
    let address = regs.pc.wrapping_add(instr.offset9());
    mem.write(address, regs.read(instr.dr()));
}

/// Parses and performs the `JSR` / `JSRR` (*jump to subroutine*) instruction
///
/// R7 receives the (already incremented) return address before PC is updated, so the callee
/// returns to the instruction following this one.
pub fn jsr(instr: Decoded, regs: &mut Registers) {
    regs.write(7, regs.pc);
    if instr.is_jsr_mode() {
        regs.pc = regs.pc.wrapping_add(instr.offset11());
    } else {
        regs.pc = regs.read(instr.base_r());
    }
}

/// Parses and performs the `AND` (*bitwise AND*) instruction
///
/// **Note**: this instruction updates the `COND` register (NZP flags) based on the value written
/// to `DR`.
pub fn and(instr: Decoded, regs: &mut Registers) {
    let value = if instr.is_imm_mode() {
        regs.read(instr.sr1()) & instr.imm5()
    } else {
        regs.read(instr.sr1()) & regs.read(instr.sr2())
    };

    regs.write(instr.dr(), value);
    regs.update_cond_flags(value);
}

/// Parses and performs the `LDR` (*load base + offset*) instruction
///
/// **Note**: this instruction updates the `COND` register (NZP flags) based on the value written
/// to `DR`.
pub fn ldr(instr: Decoded, regs: &mut Registers, mem: &mut Memory, keyboard: &mut dyn Keyboard) {
    let address = regs.read(instr.base_r()).wrapping_add(instr.offset6());
    let value = mem.read(address, keyboard);
    regs.write(instr.dr(), value);
    regs.update_cond_flags(value);
}

/// Parses and performs the `STR` (*store base + offset*) instruction
pub fn str(instr: Decoded, regs: &Registers, mem: &mut Memory) {
    let address = regs.read(instr.base_r()).wrapping_add(instr.offset6());
    mem.write(address, regs.read(instr.dr()));
}

/// Parses and performs the `NOT` (*bitwise complement*) instruction
///
/// **Note**: this instruction updates the `COND` register (NZP flags) based on the value written
/// to `DR`.
pub fn not(instr: Decoded, regs: &mut Registers) {
    let value = !regs.read(instr.sr1());
    regs.write(instr.dr(), value);
    regs.update_cond_flags(value);
}

/// Parses and performs the `LDI` (*load indirect*) instruction
///
/// **Note**: this instruction updates the `COND` register (NZP flags) based on the value written
/// to `DR`.
pub fn ldi(instr: Decoded, regs: &mut Registers, mem: &mut Memory, keyboard: &mut dyn Keyboard) {
    let pointer = regs.pc.wrapping_add(instr.offset9());
    let address = mem.read(pointer, keyboard);
    let value = mem.read(address, keyboard);
    regs.write(instr.dr(), value);
    regs.update_cond_flags(value);
}

/// Parses and performs the `STI` (*store indirect*) instruction
pub fn sti(instr: Decoded, regs: &Registers, mem: &mut Memory, keyboard: &mut dyn Keyboard) {
    let pointer = regs.pc.wrapping_add(instr.offset9());
    let address = mem.read(pointer, keyboard);
    mem.write(address, regs.read(instr.dr()));
}

/// Parses and performs the `JMP` (*jump*) instruction
///
/// Note that if the instruction's BaseR is R7, this instruction is equivalent to the `RET`
/// (*return from subroutine*) instruction.
pub fn jmp(instr: Decoded, regs: &mut Registers) {
    regs.pc = regs.read(instr.base_r());
}

/// Parses and performs the `LEA` (*load effective address*) instruction
///
/// **Note**: this instruction updates the `COND` register (NZP flags) based on the value written
/// to `DR`.
pub fn lea(instr: Decoded, regs: &mut Registers) {
    let value = regs.pc.wrapping_add(instr.offset9());
    regs.write(instr.dr(), value);
    regs.update_cond_flags(value);
}

/// Parses and performs the `TRAP` (*system call*) instruction; returns whether the vm should halt
///
/// # Binary encoding
///
/// ```plain
/// ┌───┬───┬───┬───┬───┬───┬───┬───┬───┬───┬───┬───┬───┬───┬───┬───┐
/// │ 1   1   1   1 │ 0   0   0   0 │           trapvect8           │
/// └───┴───┴───┴───┴───┴───┴───┴───┴───┴───┴───┴───┴───┴───┴───┴───┘
/// ```
///
/// An out-of-range trap vector is a [`VmError::InvalidTrapVector`], not a panic.
///
/// R7 receives the (already incremented) return address before vector dispatch, mirroring
/// `jsr`'s linkage, so a service routine that `RET`s returns to the instruction after the TRAP.
pub fn trap(
    instr: Decoded,
    regs: &mut Registers,
    mem: &mut Memory,
    keyboard: &mut dyn Keyboard,
) -> Result<bool, VmError> {
    regs.write(7, regs.pc);

    let trapvector = instr.trapvect();
    let trap_code =
        TrapCode::try_from(trapvector).map_err(|_| VmError::InvalidTrapVector(trapvector))?;

    match trap_code {
        TrapCode::Getc => trap::getc(regs, keyboard)?,
        TrapCode::Out => trap::out(regs)?,
        TrapCode::Puts => trap::puts(regs, mem, keyboard)?,
        TrapCode::In => trap::r#in(regs, keyboard)?,
        TrapCode::Putsp => trap::putsp(regs, mem, keyboard)?,
        TrapCode::Halt => {
            trap::halt()?;
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ScriptedKeyboard;
    use crate::vm::registers::CondFlag;

    fn decoded(bits: u16) -> Decoded {
        Decoded::new(bits)
    }

    #[test]
    fn add_is_identity_on_zero_immediate() {
        let mut regs = Registers::new();
        regs.write(1, 0x1234);

        // ADD R2, R1, #0
        add(decoded(0b0001_010_001_1_00000), &mut regs);

        assert_eq!(regs.read(2), 0x1234);
        assert_eq!(regs.cond, CondFlag::Pos);
    }

    #[test]
    fn add_register_mode_wraps() {
        let mut regs = Registers::new();
        regs.write(0, 0xFFFF);
        regs.write(1, 1);

        // ADD R2, R0, R1
        add(decoded(0b0001_010_000_0_00_001), &mut regs);

        assert_eq!(regs.read(2), 0);
        assert_eq!(regs.cond, CondFlag::Zero);
    }

    #[test]
    fn and_immediate_zero_zeroes_dr() {
        let mut regs = Registers::new();
        regs.write(0, 0xFFFF);

        // AND R0, R0, #0
        and(decoded(0b0101_000_000_1_00000), &mut regs);

        assert_eq!(regs.read(0), 0);
        assert_eq!(regs.cond, CondFlag::Zero);
    }

    #[test]
    fn not_is_involutive() {
        let mut regs = Registers::new();
        regs.write(1, 0b1111_1111_1101_0110); // -42

        // NOT R0, R1
        not(decoded(0b1001_000_001_111111), &mut regs);
        let once = regs.read(0);
        regs.write(1, once);
        not(decoded(0b1001_000_001_111111), &mut regs);

        assert_eq!(regs.read(0), 0b1111_1111_1101_0110);
    }

    #[test]
    fn br_mask_zero_never_branches() {
        let mut regs = Registers::new();
        regs.pc = 0x3001;
        regs.cond = CondFlag::Zero;

        // BR (mask 0) #5
        br(decoded(0b0000_000_000000101), &mut regs);

        assert_eq!(regs.pc, 0x3001);
    }

    #[test]
    fn br_nzp_always_branches() {
        let mut regs = Registers::new();
        regs.pc = 0x3001;
        regs.cond = CondFlag::Zero;

        // BRnzp #9
        br(decoded(0b0000_111_000001001), &mut regs);

        assert_eq!(regs.pc, 0x3001 + 9);
    }

    #[test]
    fn jmp_r7_acts_as_ret() {
        let mut regs = Registers::new();
        regs.write(7, 0x4242);

        // JMP R7
        jmp(decoded(0b1100_000_111_000000), &mut regs);

        assert_eq!(regs.pc, 0x4242);
    }

    #[test]
    fn jsr_then_ret_returns_to_the_following_instruction() {
        let mut regs = Registers::new();
        regs.pc = 0x3001;

        // JSR #0x10
        jsr(decoded(0b0100_1_00000010000), &mut regs);
        assert_eq!(regs.read(7), 0x3001);

        // JMP R7
        jmp(decoded(0b1100_000_111_000000), &mut regs);
        assert_eq!(regs.pc, 0x3001);
    }

    #[test]
    fn ld_sets_dr_and_cond() {
        let mut regs = Registers::new();
        let mut mem = Memory::new();
        let mut kb = ScriptedKeyboard::default();
        regs.pc = 0x3001;
        mem.write(0x3001 + 14, 42);

        // LD R0, #14
        ld(decoded(0b0010_000_000001110), &mut regs, &mut mem, &mut kb);

        assert_eq!(regs.read(0), 42);
        assert_eq!(regs.cond, CondFlag::Pos);
    }

    #[test]
    fn ldi_double_dereferences() {
        let mut regs = Registers::new();
        let mut mem = Memory::new();
        let mut kb = ScriptedKeyboard::default();
        regs.pc = 0x3001;
        mem.write(0x3001 + 1, 0x1234);
        mem.write(0x1234, 10);

        // LDI R0, #1
        ldi(decoded(0b1010_000_000000001), &mut regs, &mut mem, &mut kb);

        assert_eq!(regs.read(0), 10);
        assert_eq!(regs.cond, CondFlag::Pos);
    }

    #[test]
    fn lea_then_ldr_matches_ld() {
        let mut regs = Registers::new();
        let mut mem = Memory::new();
        let mut kb = ScriptedKeyboard::default();
        regs.pc = 0x3001;
        mem.write(0x3001 + 5, 99);

        // LEA R0, #5
        lea(decoded(0b1110_000_000000101), &mut regs);
        // LDR R0, R0, #0
        ldr(decoded(0b0110_000_000_000000), &mut regs, &mut mem, &mut kb);

        assert_eq!(regs.read(0), 99);
    }

    #[test]
    fn st_then_ld_round_trips() {
        let mut regs = Registers::new();
        let mut mem = Memory::new();
        let mut kb = ScriptedKeyboard::default();
        regs.pc = 0x3001;
        regs.write(3, 7);

        // ST R3, #2
        st(decoded(0b0011_011_000000010), &regs, &mut mem);
        // LD R4, #2
        ld(decoded(0b0010_100_000000010), &mut regs, &mut mem, &mut kb);

        assert_eq!(regs.read(4), 7);
    }

    #[test]
    fn str_then_ldr_round_trips() {
        let mut regs = Registers::new();
        let mut mem = Memory::new();
        let mut kb = ScriptedKeyboard::default();
        regs.write(1, 0x3100);
        regs.write(2, 55);

        // STR R2, R1, #4
        str(decoded(0b0111_010_001_000100), &regs, &mut mem);
        // LDR R3, R1, #4
        ldr(decoded(0b0110_011_001_000100), &mut regs, &mut mem, &mut kb);

        assert_eq!(regs.read(3), 55);
    }

    #[test]
    fn trap_with_unknown_vector_is_a_typed_error() {
        let mut regs = Registers::new();
        let mut mem = Memory::new();
        let mut kb = ScriptedKeyboard::default();

        // TRAP 0x99 (unassigned vector)
        let result = trap(decoded(0b1111_0000_1001_1001), &mut regs, &mut mem, &mut kb);

        assert!(matches!(result, Err(VmError::InvalidTrapVector(0x99))));
    }

    #[test]
    fn trap_halt_requests_a_stop() {
        let mut regs = Registers::new();
        let mut mem = Memory::new();
        let mut kb = ScriptedKeyboard::default();

        // TRAP 0x25 (HALT)
        let result = trap(decoded(0b1111_0000_0010_0101), &mut regs, &mut mem, &mut kb);

        assert_eq!(result.unwrap(), true);
    }

    #[test]
    fn trap_writes_r7_linkage_before_dispatch() {
        let mut regs = Registers::new();
        let mut mem = Memory::new();
        let mut kb = ScriptedKeyboard::with_bytes([b'Q']);
        regs.pc = 0x3001;

        // TRAP 0x20 (GETC)
        trap(decoded(0b1111_0000_0010_0000), &mut regs, &mut mem, &mut kb).unwrap();

        assert_eq!(regs.read(7), 0x3001);
    }

    #[test]
    fn trap_getc_reads_from_the_keyboard() {
        let mut regs = Registers::new();
        let mut mem = Memory::new();
        let mut kb = ScriptedKeyboard::with_bytes([b'Q']);

        // TRAP 0x20 (GETC)
        trap(decoded(0b1111_0000_0010_0000), &mut regs, &mut mem, &mut kb).unwrap();

        assert_eq!(regs.read(0), b'Q' as u16);
    }
}
