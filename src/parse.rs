/*
    z80core: Zilog Z80 CPU instruction interpreter library.
    Copyright (C) 2020-2024  z80core contributors

    For the full copyright notice, see the lib.rs file.
*/
//! Opcode bit-field parsing: the small enums the dispatcher decodes
//! register, operation and condition fields into.
//!
//! The Z80 encodes most operands in three-bit fields. The eight-value
//! register field maps `0..=7` to `B C D E H L (HL) A`; value `6` selects
//! the memory operand and is represented here as the `Err(())` side of
//! [Reg8::try_from], mirroring the fact that it is not a register at all.
use core::convert::TryFrom;

use crate::flags::CpuFlags;

/// An 8-bit register operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Reg8 {
    B = 0b000,
    C = 0b001,
    D = 0b010,
    E = 0b011,
    H = 0b100,
    L = 0b101,
    A = 0b111,
}

impl TryFrom<u8> for Reg8 {
    type Error = ();

    /// Parses the three lowest bits; `Err(())` is the `(HL)` operand.
    #[inline]
    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code & 0b111 {
            0b000 => Ok(Reg8::B),
            0b001 => Ok(Reg8::C),
            0b010 => Ok(Reg8::D),
            0b011 => Ok(Reg8::E),
            0b100 => Ok(Reg8::H),
            0b101 => Ok(Reg8::L),
            0b111 => Ok(Reg8::A),
            _ => Err(())
        }
    }
}

impl Reg8 {
    /// Parses bits 3..=5 of an opcode (the destination field).
    #[inline]
    pub(crate) fn from_b5_3(code: u8) -> Result<Self, ()> {
        Reg8::try_from(code >> 3)
    }

    /// Parses bits 0..=2 of an opcode (the source field).
    #[inline]
    pub(crate) fn from_b2_0(code: u8) -> Result<Self, ()> {
        Reg8::try_from(code)
    }
}

/// A 16-bit register pair operand of the `dd` field: `BC DE HL SP`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Reg16 {
    BC = 0b00,
    DE = 0b01,
    HL = 0b10,
    SP = 0b11,
}

impl Reg16 {
    /// Parses bits 4..=5 of an opcode.
    #[inline]
    pub(crate) fn from_b5_4(code: u8) -> Self {
        match (code >> 4) & 0b11 {
            0b00 => Reg16::BC,
            0b01 => Reg16::DE,
            0b10 => Reg16::HL,
            _ => Reg16::SP,
        }
    }
}

/// A 16-bit register pair operand of the `qq` (stack) field: `BC DE HL AF`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StkReg16 {
    BC = 0b00,
    DE = 0b01,
    HL = 0b10,
    AF = 0b11,
}

impl StkReg16 {
    /// Parses bits 4..=5 of an opcode.
    #[inline]
    pub(crate) fn from_b5_4(code: u8) -> Self {
        match (code >> 4) & 0b11 {
            0b00 => StkReg16::BC,
            0b01 => StkReg16::DE,
            0b10 => StkReg16::HL,
            _ => StkReg16::AF,
        }
    }
}

/// The accumulator operation field of the `10_ooo_rrr` opcode block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub(crate) enum AluOp {
    Add = 0b000,
    Adc = 0b001,
    Sub = 0b010,
    Sbc = 0b011,
    And = 0b100,
    Xor = 0b101,
    Or  = 0b110,
    Cp  = 0b111,
}

impl AluOp {
    /// Parses bits 3..=5 of an opcode.
    #[inline]
    pub(crate) fn from_b5_3(code: u8) -> Self {
        match (code >> 3) & 0b111 {
            0b000 => AluOp::Add,
            0b001 => AluOp::Adc,
            0b010 => AluOp::Sub,
            0b011 => AluOp::Sbc,
            0b100 => AluOp::And,
            0b101 => AluOp::Xor,
            0b110 => AluOp::Or,
            _ => AluOp::Cp,
        }
    }
}

/// The shift/rotate selector of the CB plane, rows `0x00..=0x3F`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub(crate) enum Rot {
    Rlc = 0b000,
    Rrc = 0b001,
    Rl  = 0b010,
    Rr  = 0b011,
    Sla = 0b100,
    Sra = 0b101,
    /// The undocumented shift-left that feeds a 1 into bit 0.
    Sll = 0b110,
    Srl = 0b111,
}

impl Rot {
    /// Parses bits 3..=5 of a CB-plane opcode.
    #[inline]
    pub(crate) fn from_b5_3(code: u8) -> Self {
        match (code >> 3) & 0b111 {
            0b000 => Rot::Rlc,
            0b001 => Rot::Rrc,
            0b010 => Rot::Rl,
            0b011 => Rot::Rr,
            0b100 => Rot::Sla,
            0b101 => Rot::Sra,
            0b110 => Rot::Sll,
            _ => Rot::Srl,
        }
    }
}

/// A branch condition of the `ccc` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Condition {
    NZ = 0b000,
    Z  = 0b001,
    NC = 0b010,
    C  = 0b011,
    PO = 0b100,
    PE = 0b101,
    P  = 0b110,
    M  = 0b111,
}

impl Condition {
    /// Parses bits 3..=5 of an opcode.
    #[inline]
    pub(crate) fn from_b5_3(code: u8) -> Self {
        match (code >> 3) & 0b111 {
            0b000 => Condition::NZ,
            0b001 => Condition::Z,
            0b010 => Condition::NC,
            0b011 => Condition::C,
            0b100 => Condition::PO,
            0b101 => Condition::PE,
            0b110 => Condition::P,
            _ => Condition::M,
        }
    }

    /// Parses a `JR cc` opcode; only `NZ Z NC C` exist in that group.
    #[inline]
    pub(crate) fn from_jr_subset(code: u8) -> Self {
        Condition::from_b5_3(code & 0b00_011_000)
    }

    /// Evaluates the condition against the Flags register.
    #[inline]
    pub fn is_satisfied(self, flags: CpuFlags) -> bool {
        match self {
            Condition::NZ => !flags.zf(),
            Condition::Z  => flags.zf(),
            Condition::NC => !flags.cf(),
            Condition::C  => flags.cf(),
            Condition::PO => !flags.pvf(),
            Condition::PE => flags.pvf(),
            Condition::P  => !flags.sf(),
            Condition::M  => flags.sf(),
        }
    }
}

/// Parses an `RST p` opcode into its absolute target address.
#[inline]
pub(crate) fn parse_restart_address(code: u8) -> u16 {
    (code & 0b00_111_000) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reg8_field_parses() {
        assert_eq!(Reg8::try_from(0), Ok(Reg8::B));
        assert_eq!(Reg8::try_from(5), Ok(Reg8::L));
        assert_eq!(Reg8::try_from(6), Err(()));
        assert_eq!(Reg8::try_from(7), Ok(Reg8::A));
        // only the low three bits participate
        assert_eq!(Reg8::try_from(0b1111_1000), Ok(Reg8::B));
        assert_eq!(Reg8::from_b5_3(0x7E), Ok(Reg8::A));
        assert_eq!(Reg8::from_b2_0(0x7E), Err(()));
    }

    #[test]
    fn conditions_evaluate() {
        let none = CpuFlags::empty();
        let all = CpuFlags::all();
        assert!(Condition::NZ.is_satisfied(none));
        assert!(!Condition::NZ.is_satisfied(all));
        assert!(Condition::Z.is_satisfied(all));
        assert!(Condition::NC.is_satisfied(none));
        assert!(Condition::C.is_satisfied(all));
        assert!(Condition::PO.is_satisfied(none));
        assert!(Condition::PE.is_satisfied(all));
        assert!(Condition::P.is_satisfied(none));
        assert!(Condition::M.is_satisfied(all));
    }

    #[test]
    fn jr_subset_folds_onto_carry_and_zero() {
        assert_eq!(Condition::from_jr_subset(0x20), Condition::NZ);
        assert_eq!(Condition::from_jr_subset(0x28), Condition::Z);
        assert_eq!(Condition::from_jr_subset(0x30), Condition::NC);
        assert_eq!(Condition::from_jr_subset(0x38), Condition::C);
    }

    #[test]
    fn restart_addresses() {
        for (code, addr) in [(0xC7u8, 0x00u16), (0xCF, 0x08), (0xD7, 0x10),
                             (0xDF, 0x18), (0xE7, 0x20), (0xEF, 0x28),
                             (0xF7, 0x30), (0xFF, 0x38)] {
            assert_eq!(parse_restart_address(code), addr);
        }
    }
}
