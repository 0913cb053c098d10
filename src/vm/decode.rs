//! A pure, side-effect-free view over a raw 16-bit instruction word.
//!
//! [`Decoded`] never fails to construct and never inspects validity beyond
//! what the bit layout itself determines — field extraction is total, even
//! for fields a given opcode doesn't use. Dispatch on the opcode tag lives
//! in [`super::opcode::Opcode`] and [`super::instructions`].

use super::utils::bit_ops::sign_extend;

/// A 16-bit instruction word, decoded into the named fields the LC-3 ISA
/// defines across its various encodings.
#[derive(Debug, Clone, Copy)]
pub struct Decoded(u16);

impl Decoded {
    pub fn new(word: u16) -> Self {
        Self(word)
    }

    /// Bits \[15:12\].
    pub fn opcode_bits(self) -> u16 {
        self.0 >> 12
    }

    /// Bits \[11:9\] as a destination register index.
    pub fn dr(self) -> u16 {
        (self.0 >> 9) & 0x7
    }

    /// Bits \[8:6\] as a first source / base register index.
    pub fn sr1(self) -> u16 {
        (self.0 >> 6) & 0x7
    }

    /// Alias for [`Decoded::sr1`] used where the field plays the role of a
    /// base register rather than a first source operand.
    pub fn base_r(self) -> u16 {
        self.sr1()
    }

    /// Bits \[2:0\] as a second source register index (register mode only).
    pub fn sr2(self) -> u16 {
        self.0 & 0x7
    }

    /// Bit 5: `true` when ADD/AND should use `imm5` rather than SR2.
    pub fn is_imm_mode(self) -> bool {
        (self.0 >> 5) & 0x1 == 1
    }

    /// Bits \[4:0\], sign-extended to 16 bits.
    pub fn imm5(self) -> u16 {
        sign_extend(self.0 & 0x1F, 5)
    }

    /// Bits \[5:0\], sign-extended to 16 bits.
    pub fn offset6(self) -> u16 {
        sign_extend(self.0 & 0x3F, 6)
    }

    /// Bits \[8:0\], sign-extended to 16 bits.
    pub fn offset9(self) -> u16 {
        sign_extend(self.0 & 0x1FF, 9)
    }

    /// Bits \[10:0\], sign-extended to 16 bits.
    pub fn offset11(self) -> u16 {
        sign_extend(self.0 & 0x7FF, 11)
    }

    /// Bit 11: `true` selects JSR's PC-relative form, `false` selects JSRR.
    pub fn is_jsr_mode(self) -> bool {
        (self.0 >> 11) & 0x1 == 1
    }

    /// Bits \[11:9\] as the BR condition mask (n, z, p).
    pub fn cond_mask(self) -> u16 {
        (self.0 >> 9) & 0x7
    }

    /// Bits \[7:0\] as the TRAP service selector.
    pub fn trapvect(self) -> u16 {
        self.0 & 0xFF
    }
}
