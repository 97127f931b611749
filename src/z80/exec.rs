/*
    z80core: Zilog Z80 CPU instruction interpreter library.
    Copyright (C) 2020-2024  z80core contributors

    For the full copyright notice, see the lib.rs file.
*/
//! The fetch/decode dispatcher and the instruction bodies.
//!
//! One dense `match` per decode plane: the main plane, CB, ED, the sparse
//! DD plane and the composite DDCB plane. The FD planes are the DD planes
//! executed with IX and IY swapped, so a single implementation serves
//! both index registers.
//!
//! Base T-state costs come from the per-plane tables; the arms of the
//! dispatcher only add the conditional extras (taken branches, block
//! repeats).
use crate::flags::CpuFlags;
use crate::host::Bus;
use crate::parse::{parse_restart_address, AluOp, Condition, Reg8, Reg16, Rot, StkReg16};
use crate::registers::InterruptMode;
use crate::tables::{CYCLES_CB, CYCLES_DD, CYCLES_ED, CYCLES_MAIN};
use super::{ops, Z80};

impl Rot {
    /// Runs the selected shift or rotate kernel.
    #[inline]
    pub(crate) fn apply(self, val: u8, flags: &mut CpuFlags) -> u8 {
        match self {
            Rot::Rlc => ops::rlc(val, flags),
            Rot::Rrc => ops::rrc(val, flags),
            Rot::Rl  => ops::rl(val, flags),
            Rot::Rr  => ops::rr(val, flags),
            Rot::Sla => ops::sla(val, flags),
            Rot::Sra => ops::sra(val, flags),
            Rot::Sll => ops::sll(val, flags),
            Rot::Srl => ops::srl(val, flags),
        }
    }
}

impl<B: Bus> Z80<B> {
    /// Fetches the next opcode byte: R is bumped for every opcode byte
    /// consumed, immediate operands go through [Z80::fetch_imm8] instead.
    #[inline]
    pub(super) fn fetch_opcode(&mut self) -> u8 {
        self.bump_r();
        let pc = self.pc.get16();
        let code = self.bus.mem_read(pc);
        self.pc.set16(pc.wrapping_add(1));
        code
    }

    #[inline]
    fn fetch_imm8(&mut self) -> u8 {
        let pc = self.pc.get16();
        let val = self.bus.mem_read(pc);
        self.pc.set16(pc.wrapping_add(1));
        val
    }

    #[inline]
    fn fetch_imm16(&mut self) -> u16 {
        let lo = self.fetch_imm8();
        let hi = self.fetch_imm8();
        u16::from_le_bytes([lo, hi])
    }

    /// Reads an unaligned little-endian word, low byte first.
    #[inline]
    pub(super) fn mem_read16(&mut self, addr: u16) -> u16 {
        let lo = self.bus.mem_read(addr);
        let hi = self.bus.mem_read(addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    #[inline]
    fn mem_write16(&mut self, addr: u16, val: u16) {
        let [lo, hi] = val.to_le_bytes();
        self.bus.mem_write(addr, lo);
        self.bus.mem_write(addr.wrapping_add(1), hi);
    }

    /// High byte to `SP-1`, low byte to `SP-2`.
    #[inline]
    fn push2(&mut self, hi: u8, lo: u8) {
        let sp = self.sp.get16().wrapping_sub(1);
        self.bus.mem_write(sp, hi);
        let sp = sp.wrapping_sub(1);
        self.bus.mem_write(sp, lo);
        self.sp.set16(sp);
    }

    #[inline]
    pub(super) fn push16(&mut self, val: u16) {
        let [lo, hi] = val.to_le_bytes();
        self.push2(hi, lo);
    }

    /// Low byte from `SP`, high byte from `SP+1`.
    #[inline]
    fn pop16(&mut self) -> u16 {
        let sp = self.sp.get16();
        let lo = self.bus.mem_read(sp);
        let hi = self.bus.mem_read(sp.wrapping_add(1));
        self.sp.set16(sp.wrapping_add(2));
        u16::from_le_bytes([lo, hi])
    }

    #[inline]
    fn reg8_get(&self, reg: Reg8) -> u8 {
        match reg {
            Reg8::B => self.regs.bc.get8hi(),
            Reg8::C => self.regs.bc.get8lo(),
            Reg8::D => self.regs.de.get8hi(),
            Reg8::E => self.regs.de.get8lo(),
            Reg8::H => self.regs.hl.get8hi(),
            Reg8::L => self.regs.hl.get8lo(),
            Reg8::A => self.af.get8hi(),
        }
    }

    #[inline]
    fn reg8_set(&mut self, reg: Reg8, val: u8) {
        match reg {
            Reg8::B => self.regs.bc.set8hi(val),
            Reg8::C => self.regs.bc.set8lo(val),
            Reg8::D => self.regs.de.set8hi(val),
            Reg8::E => self.regs.de.set8lo(val),
            Reg8::H => self.regs.hl.set8hi(val),
            Reg8::L => self.regs.hl.set8lo(val),
            Reg8::A => self.af.set8hi(val),
        }
    }

    /// The DD-plane twist of [Z80::reg8_get]: H and L address the halves
    /// of the active index register.
    #[inline]
    fn ix_reg8_get(&self, reg: Reg8) -> u8 {
        match reg {
            Reg8::H => self.index.ix.get8hi(),
            Reg8::L => self.index.ix.get8lo(),
            _ => self.reg8_get(reg),
        }
    }

    #[inline]
    fn ix_reg8_set(&mut self, reg: Reg8, val: u8) {
        match reg {
            Reg8::H => self.index.ix.set8hi(val),
            Reg8::L => self.index.ix.set8lo(val),
            _ => self.reg8_set(reg, val),
        }
    }

    #[inline]
    fn reg16_get(&self, rp: Reg16) -> u16 {
        match rp {
            Reg16::BC => self.regs.bc.get16(),
            Reg16::DE => self.regs.de.get16(),
            Reg16::HL => self.regs.hl.get16(),
            Reg16::SP => self.sp.get16(),
        }
    }

    #[inline]
    fn reg16_set(&mut self, rp: Reg16, val: u16) {
        match rp {
            Reg16::BC => self.regs.bc.set16(val),
            Reg16::DE => self.regs.de.set16(val),
            Reg16::HL => self.regs.hl.set16(val),
            Reg16::SP => self.sp.set16(val),
        }
    }

    /// `IX+d` with the displacement taken as signed.
    #[inline]
    fn index_addr(&self, d: u8) -> u16 {
        self.index.ix.get16().wrapping_add(i16::from(d as i8) as u16)
    }

    /// Adds the signed displacement of a relative branch to PC, which
    /// already addresses the following instruction.
    #[inline]
    fn jump_relative(&mut self, d: u8) {
        let pc = self.pc.get16().wrapping_add(i16::from(d as i8) as u16);
        self.pc.set16(pc);
    }

    /// Runs one of the eight accumulator operations.
    fn alu_acc(&mut self, op: AluOp, rhs: u8) {
        let acc = self.af.get8hi();
        let mut flags = self.get_flags();
        let res = match op {
            AluOp::Add => Some(ops::add(acc, rhs, false, &mut flags)),
            AluOp::Adc => Some(ops::add(acc, rhs, flags.cf(), &mut flags)),
            AluOp::Sub => Some(ops::sub(acc, rhs, false, &mut flags)),
            AluOp::Sbc => Some(ops::sub(acc, rhs, flags.cf(), &mut flags)),
            AluOp::And => Some(ops::and(acc, rhs, &mut flags)),
            AluOp::Xor => Some(ops::xor(acc, rhs, &mut flags)),
            AluOp::Or  => Some(ops::or(acc, rhs, &mut flags)),
            AluOp::Cp  => {
                ops::cp(acc, rhs, &mut flags);
                None
            }
        };
        if let Some(res) = res {
            self.af.set8hi(res);
        }
        self.set_flags(flags);
    }

    /// Decodes and executes one main-plane opcode. The byte has already
    /// been consumed (PC advanced, R bumped); prefix arms take over the
    /// consumption of their own plane's bytes.
    pub(super) fn exec_main(&mut self, code: u8) {
        self.cycles += u32::from(CYCLES_MAIN[code as usize]);
        match code {
            0x00 => {} // NOP

            // HALT sits in the hole of the LD matrix and must win over it
            0x76 => self.halted = true,

            // LD r,r | LD r,(HL) | LD (HL),r          0b01_ddd_sss
            0x40..=0x7F => {
                let val = match Reg8::from_b2_0(code) {
                    Ok(src) => self.reg8_get(src),
                    Err(_) => self.bus.mem_read(self.regs.hl.get16()),
                };
                match Reg8::from_b5_3(code) {
                    Ok(dst) => self.reg8_set(dst, val),
                    Err(_) => self.bus.mem_write(self.regs.hl.get16(), val),
                }
            }

            // ALU A, r|(HL)                           0b10_ooo_sss
            0x80..=0xBF => {
                let rhs = match Reg8::from_b2_0(code) {
                    Ok(src) => self.reg8_get(src),
                    Err(_) => self.bus.mem_read(self.regs.hl.get16()),
                };
                self.alu_acc(AluOp::from_b5_3(code), rhs);
            }

            // LD dd,nn
            0x01 | 0x11 | 0x21 | 0x31 => {
                let nn = self.fetch_imm16();
                self.reg16_set(Reg16::from_b5_4(code), nn);
            }
            0x02 => {
                let addr = self.regs.bc.get16();
                let acc = self.af.get8hi();
                self.bus.mem_write(addr, acc);
            }
            0x12 => {
                let addr = self.regs.de.get16();
                let acc = self.af.get8hi();
                self.bus.mem_write(addr, acc);
            }
            0x0A => {
                let val = self.bus.mem_read(self.regs.bc.get16());
                self.af.set8hi(val);
            }
            0x1A => {
                let val = self.bus.mem_read(self.regs.de.get16());
                self.af.set8hi(val);
            }
            0x22 => {
                let nn = self.fetch_imm16();
                let hl = self.regs.hl.get16();
                self.mem_write16(nn, hl);
            }
            0x2A => {
                let nn = self.fetch_imm16();
                let val = self.mem_read16(nn);
                self.regs.hl.set16(val);
            }
            0x32 => {
                let nn = self.fetch_imm16();
                let acc = self.af.get8hi();
                self.bus.mem_write(nn, acc);
            }
            0x3A => {
                let nn = self.fetch_imm16();
                let val = self.bus.mem_read(nn);
                self.af.set8hi(val);
            }

            // INC dd | DEC dd: no flags move
            0x03 | 0x13 | 0x23 | 0x33 => {
                let rp = Reg16::from_b5_4(code);
                self.reg16_set(rp, self.reg16_get(rp).wrapping_add(1));
            }
            0x0B | 0x1B | 0x2B | 0x3B => {
                let rp = Reg16::from_b5_4(code);
                self.reg16_set(rp, self.reg16_get(rp).wrapping_sub(1));
            }

            // INC r | INC (HL)                        0b00_rrr_100
            0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x34 | 0x3C => {
                let mut flags = self.get_flags();
                match Reg8::from_b5_3(code) {
                    Ok(reg) => {
                        let res = ops::inc(self.reg8_get(reg), &mut flags);
                        self.reg8_set(reg, res);
                    }
                    Err(_) => {
                        let hl = self.regs.hl.get16();
                        let res = ops::inc(self.bus.mem_read(hl), &mut flags);
                        self.bus.mem_write(hl, res);
                    }
                }
                self.set_flags(flags);
            }

            // DEC r | DEC (HL)                        0b00_rrr_101
            0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x35 | 0x3D => {
                let mut flags = self.get_flags();
                match Reg8::from_b5_3(code) {
                    Ok(reg) => {
                        let res = ops::dec(self.reg8_get(reg), &mut flags);
                        self.reg8_set(reg, res);
                    }
                    Err(_) => {
                        let hl = self.regs.hl.get16();
                        let res = ops::dec(self.bus.mem_read(hl), &mut flags);
                        self.bus.mem_write(hl, res);
                    }
                }
                self.set_flags(flags);
            }

            // LD r,n | LD (HL),n                      0b00_rrr_110
            0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x36 | 0x3E => {
                let n = self.fetch_imm8();
                match Reg8::from_b5_3(code) {
                    Ok(reg) => self.reg8_set(reg, n),
                    Err(_) => self.bus.mem_write(self.regs.hl.get16(), n),
                }
            }

            // ADD HL,dd
            0x09 | 0x19 | 0x29 | 0x39 => {
                let rhs = self.reg16_get(Reg16::from_b5_4(code));
                let mut flags = self.get_flags();
                let res = ops::add16(self.regs.hl.get16(), rhs, &mut flags);
                self.regs.hl.set16(res);
                self.set_flags(flags);
            }

            // accumulator rotates keep S, Z and P/V
            0x07 => {
                let mut flags = self.get_flags();
                let res = ops::rlca(self.af.get8hi(), &mut flags);
                self.af.set8hi(res);
                self.set_flags(flags);
            }
            0x0F => {
                let mut flags = self.get_flags();
                let res = ops::rrca(self.af.get8hi(), &mut flags);
                self.af.set8hi(res);
                self.set_flags(flags);
            }
            0x17 => {
                let mut flags = self.get_flags();
                let res = ops::rla(self.af.get8hi(), &mut flags);
                self.af.set8hi(res);
                self.set_flags(flags);
            }
            0x1F => {
                let mut flags = self.get_flags();
                let res = ops::rra(self.af.get8hi(), &mut flags);
                self.af.set8hi(res);
                self.set_flags(flags);
            }

            0x27 => {
                let mut flags = self.get_flags();
                let res = ops::daa(self.af.get8hi(), &mut flags);
                self.af.set8hi(res);
                self.set_flags(flags);
            }
            0x2F => {
                let mut flags = self.get_flags();
                let res = ops::cpl(self.af.get8hi(), &mut flags);
                self.af.set8hi(res);
                self.set_flags(flags);
            }
            0x37 => {
                let mut flags = self.get_flags();
                ops::scf(self.af.get8hi(), &mut flags);
                self.set_flags(flags);
            }
            0x3F => {
                let mut flags = self.get_flags();
                ops::ccf(self.af.get8hi(), &mut flags);
                self.set_flags(flags);
            }

            0x08 => self.ex_af_af(),
            0xD9 => self.exx(),
            0xEB => core::mem::swap(&mut self.regs.de, &mut self.regs.hl),
            0xE3 => {
                // EX (SP),HL
                let sp = self.sp.get16();
                let lo = self.bus.mem_read(sp);
                let hi = self.bus.mem_read(sp.wrapping_add(1));
                let (h, l) = self.regs.hl.get();
                self.bus.mem_write(sp, l);
                self.bus.mem_write(sp.wrapping_add(1), h);
                self.regs.hl.set(hi, lo);
            }

            // relative branches: +5 when taken
            0x10 => {
                // DJNZ e
                let d = self.fetch_imm8();
                let b = self.regs.bc.get8hi().wrapping_sub(1);
                self.regs.bc.set8hi(b);
                if b != 0 {
                    self.cycles += 5;
                    self.jump_relative(d);
                }
            }
            0x18 => {
                let d = self.fetch_imm8();
                self.jump_relative(d);
            }
            0x20 | 0x28 | 0x30 | 0x38 => {
                let d = self.fetch_imm8();
                if Condition::from_jr_subset(code).is_satisfied(self.get_flags()) {
                    self.cycles += 5;
                    self.jump_relative(d);
                }
            }

            0xC3 => {
                let nn = self.fetch_imm16();
                self.pc.set16(nn);
            }
            0xC2 | 0xCA | 0xD2 | 0xDA | 0xE2 | 0xEA | 0xF2 | 0xFA => {
                let nn = self.fetch_imm16();
                if Condition::from_b5_3(code).is_satisfied(self.get_flags()) {
                    self.pc.set16(nn);
                }
            }
            0xE9 => {
                let hl = self.regs.hl.get16();
                self.pc.set16(hl);
            }

            0xCD => {
                let nn = self.fetch_imm16();
                let pc = self.pc.get16();
                self.push16(pc);
                self.pc.set16(nn);
            }
            // CALL cc: +7 when taken
            0xC4 | 0xCC | 0xD4 | 0xDC | 0xE4 | 0xEC | 0xF4 | 0xFC => {
                let nn = self.fetch_imm16();
                if Condition::from_b5_3(code).is_satisfied(self.get_flags()) {
                    self.cycles += 7;
                    let pc = self.pc.get16();
                    self.push16(pc);
                    self.pc.set16(nn);
                }
            }

            0xC9 => {
                let addr = self.pop16();
                self.pc.set16(addr);
            }
            // RET cc: +6 when taken
            0xC0 | 0xC8 | 0xD0 | 0xD8 | 0xE0 | 0xE8 | 0xF0 | 0xF8 => {
                if Condition::from_b5_3(code).is_satisfied(self.get_flags()) {
                    self.cycles += 6;
                    let addr = self.pop16();
                    self.pc.set16(addr);
                }
            }

            0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
                let pc = self.pc.get16();
                self.push16(pc);
                self.pc.set16(parse_restart_address(code));
            }

            0xC5 | 0xD5 | 0xE5 | 0xF5 => {
                let (hi, lo) = match StkReg16::from_b5_4(code) {
                    StkReg16::BC => self.regs.bc.get(),
                    StkReg16::DE => self.regs.de.get(),
                    StkReg16::HL => self.regs.hl.get(),
                    StkReg16::AF => self.af.get(),
                };
                self.push2(hi, lo);
            }
            0xC1 | 0xD1 | 0xE1 | 0xF1 => {
                let val = self.pop16();
                match StkReg16::from_b5_4(code) {
                    StkReg16::BC => self.regs.bc.set16(val),
                    StkReg16::DE => self.regs.de.set16(val),
                    StkReg16::HL => self.regs.hl.set16(val),
                    StkReg16::AF => self.af.set16(val),
                }
            }

            // ALU A,n
            0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => {
                let n = self.fetch_imm8();
                self.alu_acc(AluOp::from_b5_3(code), n);
            }

            0xF9 => {
                let hl = self.regs.hl.get16();
                self.sp.set16(hl);
            }

            0xD3 => {
                // OUT (n),A: A rides the upper half of the port
                let n = self.fetch_imm8();
                let acc = self.af.get8hi();
                let port = u16::from_be_bytes([acc, n]);
                self.bus.io_write(port, acc);
            }
            0xDB => {
                // IN A,(n): no flags move
                let n = self.fetch_imm8();
                let port = u16::from_be_bytes([self.af.get8hi(), n]);
                let val = self.bus.io_read(port);
                self.af.set8hi(val);
            }

            // EI and DI both commit after the next instruction retires
            0xF3 => self.pending_di = true,
            0xFB => self.pending_ei = true,

            0xCB => self.exec_cb(),
            0xED => self.exec_ed(),
            0xDD => self.exec_dd(),
            0xFD => {
                self.index.swap();
                self.exec_dd();
                self.index.swap();
            }
        }
    }

    /// The CB plane: shifts, rotates and the bit test/set/reset matrix.
    fn exec_cb(&mut self) {
        let code = self.fetch_opcode();
        self.cycles += u32::from(CYCLES_CB[code as usize]);
        let target = Reg8::from_b2_0(code);
        match code >> 6 {
            0 => {
                let rot = Rot::from_b5_3(code);
                let mut flags = self.get_flags();
                match target {
                    Ok(reg) => {
                        let res = rot.apply(self.reg8_get(reg), &mut flags);
                        self.reg8_set(reg, res);
                    }
                    Err(_) => {
                        let hl = self.regs.hl.get16();
                        let res = rot.apply(self.bus.mem_read(hl), &mut flags);
                        self.bus.mem_write(hl, res);
                    }
                }
                self.set_flags(flags);
            }
            1 => {
                let val = match target {
                    Ok(reg) => self.reg8_get(reg),
                    Err(_) => self.bus.mem_read(self.regs.hl.get16()),
                };
                let mut flags = self.get_flags();
                ops::bit(code >> 3 & 7, val, &mut flags);
                self.set_flags(flags);
            }
            _ => {
                // RES when bit 6 is low, SET when high
                let mask = 1u8 << (code >> 3 & 7);
                let apply = |val: u8| if code & 0x40 != 0 { val | mask } else { val & !mask };
                match target {
                    Ok(reg) => {
                        let res = apply(self.reg8_get(reg));
                        self.reg8_set(reg, res);
                    }
                    Err(_) => {
                        let hl = self.regs.hl.get16();
                        let res = apply(self.bus.mem_read(hl));
                        self.bus.mem_write(hl, res);
                    }
                }
            }
        }
    }

    /// The ED plane. Every slot without an instruction is a two-byte NOP
    /// charged at the main-plane NOP cost.
    fn exec_ed(&mut self) {
        let code = self.fetch_opcode();
        self.cycles += u32::from(CYCLES_ED[code as usize]);
        match code {
            // IN r,(C); the r=6 slot only sets flags
            0x40 | 0x48 | 0x50 | 0x58 | 0x60 | 0x68 | 0x70 | 0x78 => {
                let port = self.regs.bc.get16();
                let val = self.bus.io_read(port);
                let mut flags = self.get_flags();
                ops::io(val, &mut flags);
                self.set_flags(flags);
                if let Ok(reg) = Reg8::from_b5_3(code) {
                    self.reg8_set(reg, val);
                }
            }
            // OUT (C),r; the r=6 slot emits a constant zero
            0x41 | 0x49 | 0x51 | 0x59 | 0x61 | 0x69 | 0x71 | 0x79 => {
                let val = match Reg8::from_b5_3(code) {
                    Ok(reg) => self.reg8_get(reg),
                    Err(_) => 0,
                };
                let port = self.regs.bc.get16();
                self.bus.io_write(port, val);
            }

            0x42 | 0x52 | 0x62 | 0x72 => {
                let rhs = self.reg16_get(Reg16::from_b5_4(code));
                let mut flags = self.get_flags();
                let res = ops::sbc16(self.regs.hl.get16(), rhs, &mut flags);
                self.regs.hl.set16(res);
                self.set_flags(flags);
            }
            0x4A | 0x5A | 0x6A | 0x7A => {
                let rhs = self.reg16_get(Reg16::from_b5_4(code));
                let mut flags = self.get_flags();
                let res = ops::adc16(self.regs.hl.get16(), rhs, &mut flags);
                self.regs.hl.set16(res);
                self.set_flags(flags);
            }

            0x43 | 0x53 | 0x63 | 0x73 => {
                let nn = self.fetch_imm16();
                let val = self.reg16_get(Reg16::from_b5_4(code));
                self.mem_write16(nn, val);
            }
            0x4B | 0x5B | 0x6B | 0x7B => {
                let nn = self.fetch_imm16();
                let val = self.mem_read16(nn);
                self.reg16_set(Reg16::from_b5_4(code), val);
            }

            // NEG occupies the whole column
            0x44 | 0x4C | 0x54 | 0x5C | 0x64 | 0x6C | 0x74 | 0x7C => {
                let mut flags = self.get_flags();
                let res = ops::neg(self.af.get8hi(), &mut flags);
                self.af.set8hi(res);
                self.set_flags(flags);
            }

            // RETI; its undocumented mirrors behave as RETN
            0x4D => {
                let addr = self.pop16();
                self.pc.set16(addr);
            }
            0x45 | 0x55 | 0x5D | 0x65 | 0x6D | 0x75 | 0x7D => {
                let addr = self.pop16();
                self.pc.set16(addr);
                self.iff1 = self.iff2;
            }

            0x46 | 0x4E | 0x66 | 0x6E => self.im = InterruptMode::Mode0,
            0x56 | 0x76 => self.im = InterruptMode::Mode1,
            0x5E | 0x7E => self.im = InterruptMode::Mode2,

            0x47 => {
                let acc = self.af.get8hi();
                self.ir.set8hi(acc);
            }
            0x4F => {
                // LD R,A writes all eight bits, the sticky bit 7 included
                let acc = self.af.get8hi();
                self.ir.set8lo(acc);
            }
            0x57 => {
                let val = self.ir.get8hi();
                self.af.set8hi(val);
                let mut flags = self.get_flags();
                ops::ld_a_ir(val, self.iff2, &mut flags);
                self.set_flags(flags);
            }
            0x5F => {
                let val = self.ir.get8lo();
                self.af.set8hi(val);
                let mut flags = self.get_flags();
                ops::ld_a_ir(val, self.iff2, &mut flags);
                self.set_flags(flags);
            }

            0x67 => {
                // RRD
                let hl = self.regs.hl.get16();
                let mem = self.bus.mem_read(hl);
                let mut flags = self.get_flags();
                let (acc, mem) = ops::rrd(self.af.get8hi(), mem, &mut flags);
                self.bus.mem_write(hl, mem);
                self.af.set8hi(acc);
                self.set_flags(flags);
            }
            0x6F => {
                // RLD
                let hl = self.regs.hl.get16();
                let mem = self.bus.mem_read(hl);
                let mut flags = self.get_flags();
                let (acc, mem) = ops::rld(self.af.get8hi(), mem, &mut flags);
                self.bus.mem_write(hl, mem);
                self.af.set8hi(acc);
                self.set_flags(flags);
            }

            0xA0 => {
                self.block_ld(1);
            }
            0xA8 => {
                self.block_ld(-1);
            }
            0xB0 => {
                if self.block_ld(1) {
                    self.repeat_block();
                }
            }
            0xB8 => {
                if self.block_ld(-1) {
                    self.repeat_block();
                }
            }

            0xA1 => {
                self.block_cp(1);
            }
            0xA9 => {
                self.block_cp(-1);
            }
            0xB1 => {
                let (bc_nonzero, matched) = self.block_cp(1);
                if bc_nonzero && !matched {
                    self.repeat_block();
                }
            }
            0xB9 => {
                let (bc_nonzero, matched) = self.block_cp(-1);
                if bc_nonzero && !matched {
                    self.repeat_block();
                }
            }

            0xA2 => {
                self.block_in(1);
            }
            0xAA => {
                self.block_in(-1);
            }
            0xB2 => {
                if self.block_in(1) {
                    self.repeat_block();
                }
            }
            0xBA => {
                if self.block_in(-1) {
                    self.repeat_block();
                }
            }

            0xA3 => {
                self.block_out(1);
            }
            0xAB => {
                self.block_out(-1);
            }
            0xB3 => {
                if self.block_out(1) {
                    self.repeat_block();
                }
            }
            0xBB => {
                if self.block_out(-1) {
                    self.repeat_block();
                }
            }

            // the rest of the plane: two-byte NOP
            _ => self.cycles += u32::from(CYCLES_MAIN[0]),
        }
    }

    /// `LDI`/`LDD` body. Returns `true` while BC has not reached zero.
    fn block_ld(&mut self, delta: i16) -> bool {
        let hl = self.regs.hl.get16();
        let de = self.regs.de.get16();
        let byte = self.bus.mem_read(hl);
        self.bus.mem_write(de, byte);
        self.regs.hl.set16(hl.wrapping_add(delta as u16));
        self.regs.de.set16(de.wrapping_add(delta as u16));
        let bc_nonzero = !self.regs.bc.dec16_is_zero();
        let mut flags = self.get_flags();
        ops::ldx(self.af.get8hi(), byte, bc_nonzero, &mut flags);
        self.set_flags(flags);
        bc_nonzero
    }

    /// `CPI`/`CPD` body. Returns `(BC != 0, byte matched A)`.
    fn block_cp(&mut self, delta: i16) -> (bool, bool) {
        let hl = self.regs.hl.get16();
        let byte = self.bus.mem_read(hl);
        self.regs.hl.set16(hl.wrapping_add(delta as u16));
        let bc_nonzero = !self.regs.bc.dec16_is_zero();
        let mut flags = self.get_flags();
        let matched = ops::cpx(self.af.get8hi(), byte, bc_nonzero, &mut flags);
        self.set_flags(flags);
        (bc_nonzero, matched)
    }

    /// `INI`/`IND` body. Returns `true` while B has not reached zero.
    fn block_in(&mut self, delta: i16) -> bool {
        let port = self.regs.bc.get16();
        let byte = self.bus.io_read(port);
        let hl = self.regs.hl.get16();
        self.bus.mem_write(hl, byte);
        self.regs.hl.set16(hl.wrapping_add(delta as u16));
        let mut flags = self.get_flags();
        let b = ops::dec(self.regs.bc.get8hi(), &mut flags);
        self.regs.bc.set8hi(b);
        self.set_flags(flags);
        b != 0
    }

    /// `OUTI`/`OUTD` body; the port sees B before the decrement.
    fn block_out(&mut self, delta: i16) -> bool {
        let hl = self.regs.hl.get16();
        let byte = self.bus.mem_read(hl);
        let port = self.regs.bc.get16();
        self.bus.io_write(port, byte);
        self.regs.hl.set16(hl.wrapping_add(delta as u16));
        let mut flags = self.get_flags();
        let b = ops::dec(self.regs.bc.get8hi(), &mut flags);
        self.regs.bc.set8hi(b);
        self.set_flags(flags);
        b != 0
    }

    /// Re-arms a repeating block instruction: 5 extra T-states and PC back
    /// onto the two opcode bytes.
    #[inline]
    fn repeat_block(&mut self) {
        self.cycles += 5;
        let pc = self.pc.get16().wrapping_sub(2);
        self.pc.set16(pc);
    }

    /// The sparse DD plane (and, via the IX/IY swap, FD).
    ///
    /// The next byte is only peeked first: if the plane has no instruction
    /// at that slot the prefix retires as a plain NOP and the byte is
    /// decoded as a fresh main-plane instruction by the next step.
    fn exec_dd(&mut self) {
        let code = self.bus.mem_read(self.pc.get16());
        if code != 0xCB && CYCLES_DD[code as usize] == 0 {
            self.cycles += u32::from(CYCLES_MAIN[0]);
            return;
        }
        self.bump_r();
        let pc = self.pc.get16();
        self.pc.set16(pc.wrapping_add(1));
        if code == 0xCB {
            self.exec_ddcb();
            return;
        }
        self.cycles += u32::from(CYCLES_DD[code as usize]);
        match code {
            // ADD IX,dd with IX standing in the HL slot
            0x09 | 0x19 | 0x29 | 0x39 => {
                let rhs = match Reg16::from_b5_4(code) {
                    Reg16::HL => self.index.ix.get16(),
                    rp => self.reg16_get(rp),
                };
                let mut flags = self.get_flags();
                let res = ops::add16(self.index.ix.get16(), rhs, &mut flags);
                self.index.ix.set16(res);
                self.set_flags(flags);
            }

            0x21 => {
                let nn = self.fetch_imm16();
                self.index.ix.set16(nn);
            }
            0x22 => {
                let nn = self.fetch_imm16();
                let val = self.index.ix.get16();
                self.mem_write16(nn, val);
            }
            0x2A => {
                let nn = self.fetch_imm16();
                let val = self.mem_read16(nn);
                self.index.ix.set16(val);
            }
            0x23 => self.index.ix.inc16(),
            0x2B => self.index.ix.dec16(),
            0xF9 => {
                let val = self.index.ix.get16();
                self.sp.set16(val);
            }
            0xE9 => {
                let val = self.index.ix.get16();
                self.pc.set16(val);
            }

            // INC/DEC IXH, IXL
            0x24 | 0x25 | 0x2C | 0x2D => {
                if let Ok(reg) = Reg8::from_b5_3(code) {
                    let mut flags = self.get_flags();
                    let val = self.ix_reg8_get(reg);
                    let res = if code & 1 == 0 {
                        ops::inc(val, &mut flags)
                    }
                    else {
                        ops::dec(val, &mut flags)
                    };
                    self.ix_reg8_set(reg, res);
                    self.set_flags(flags);
                }
            }
            // LD IXH,n | LD IXL,n
            0x26 | 0x2E => {
                let n = self.fetch_imm8();
                if let Ok(reg) = Reg8::from_b5_3(code) {
                    self.ix_reg8_set(reg, n);
                }
            }

            // INC/DEC (IX+d)
            0x34 | 0x35 => {
                let d = self.fetch_imm8();
                let addr = self.index_addr(d);
                let mut flags = self.get_flags();
                let val = self.bus.mem_read(addr);
                let res = if code & 1 == 0 {
                    ops::inc(val, &mut flags)
                }
                else {
                    ops::dec(val, &mut flags)
                };
                self.bus.mem_write(addr, res);
                self.set_flags(flags);
            }
            0x36 => {
                let d = self.fetch_imm8();
                let n = self.fetch_imm8();
                let addr = self.index_addr(d);
                self.bus.mem_write(addr, n);
            }

            // the LD matrix. A memory operand forces the other side onto
            // the plain register file; register-to-register forms see
            // IXH/IXL in the H and L slots.
            0x40..=0x7F => {
                match (Reg8::from_b5_3(code), Reg8::from_b2_0(code)) {
                    (Ok(dst), Err(_)) => {
                        let d = self.fetch_imm8();
                        let addr = self.index_addr(d);
                        let val = self.bus.mem_read(addr);
                        self.reg8_set(dst, val);
                    }
                    (Err(_), Ok(src)) => {
                        let d = self.fetch_imm8();
                        let addr = self.index_addr(d);
                        let val = self.reg8_get(src);
                        self.bus.mem_write(addr, val);
                    }
                    (Ok(dst), Ok(src)) => {
                        let val = self.ix_reg8_get(src);
                        self.ix_reg8_set(dst, val);
                    }
                    (Err(_), Err(_)) => {} // 0x76 never passes the plane gate
                }
            }

            // ALU A, IXH|IXL|(IX+d)
            0x80..=0xBF => {
                let rhs = match Reg8::from_b2_0(code) {
                    Ok(reg) => self.ix_reg8_get(reg),
                    Err(_) => {
                        let d = self.fetch_imm8();
                        let addr = self.index_addr(d);
                        self.bus.mem_read(addr)
                    }
                };
                self.alu_acc(AluOp::from_b5_3(code), rhs);
            }

            0xE1 => {
                let val = self.pop16();
                self.index.ix.set16(val);
            }
            0xE5 => {
                let val = self.index.ix.get16();
                self.push16(val);
            }
            0xE3 => {
                // EX (SP),IX
                let sp = self.sp.get16();
                let lo = self.bus.mem_read(sp);
                let hi = self.bus.mem_read(sp.wrapping_add(1));
                let (ixh, ixl) = self.index.ix.get();
                self.bus.mem_write(sp, ixl);
                self.bus.mem_write(sp.wrapping_add(1), ixh);
                self.index.ix.set(hi, lo);
            }

            _ => {} // excluded by the plane gate above
        }
    }

    /// The composite DDCB/FDCB plane: `DD CB d op`. The operation targets
    /// `(IX+d)` and, for every slot whose register field is not 6 and
    /// which is not a BIT test, the result is also copied into that
    /// register — the undocumented double write.
    fn exec_ddcb(&mut self) {
        let d = self.fetch_imm8();
        let code = self.fetch_imm8();
        self.cycles += u32::from(CYCLES_CB[code as usize]) + 8;
        let addr = self.index_addr(d);
        let val = self.bus.mem_read(addr);
        match code >> 6 {
            0 => {
                let mut flags = self.get_flags();
                let res = Rot::from_b5_3(code).apply(val, &mut flags);
                self.set_flags(flags);
                self.bus.mem_write(addr, res);
                if let Ok(reg) = Reg8::from_b2_0(code) {
                    self.reg8_set(reg, res);
                }
            }
            1 => {
                let mut flags = self.get_flags();
                ops::bit(code >> 3 & 7, val, &mut flags);
                self.set_flags(flags);
            }
            _ => {
                let mask = 1u8 << (code >> 3 & 7);
                let res = if code & 0x40 != 0 { val | mask } else { val & !mask };
                self.bus.mem_write(addr, res);
                if let Ok(reg) = Reg8::from_b2_0(code) {
                    self.reg8_set(reg, res);
                }
            }
        }
    }
}
