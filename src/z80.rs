/*
    z80core: Zilog Z80 CPU instruction interpreter library.
    Copyright (C) 2020-2024  z80core contributors

    For the full copyright notice, see the lib.rs file.
*/
//! The CPU state machine and its host-facing operations.
mod exec;
mod ops;
#[cfg(test)]
mod tests;

use core::mem::swap;

#[cfg(feature = "serde")]
use serde::{Serialize, Deserialize};

use crate::flags::CpuFlags;
use crate::host::Bus;
use crate::registers::{GeneralRegisters, IndexRegisters, InterruptMode, RegisterPair};

/// The address of the NMI service routine.
pub const NMI_RESTART: u16 = 0x66;

/// The address of the IM 1 service routine.
pub const IM1_RESTART: u16 = 0x38;

/// A Zilog Z80 instruction interpreter owning its [Bus].
///
/// The interpreter retires whole instructions; the host drives it with
/// [Z80::step_instruction] and posts interrupts with [Z80::irq] between
/// steps. Every step reports the T-states consumed, taken from the
/// per-plane base cost tables in [crate::tables] plus the conditional
/// extras of branches and repeating block instructions.
///
/// The core is strictly sequential and non-reentrant: bus callbacks must
/// not call back into the interpreter.
#[derive(Clone, Debug)]
pub struct Z80<B> {
    bus: B,
    af: RegisterPair,
    af_alt: RegisterPair,
    regs: GeneralRegisters,
    regs_alt: GeneralRegisters,
    index: IndexRegisters,
    pc: RegisterPair,
    sp: RegisterPair,
    /// Interrupt page I in the high byte, refresh counter R in the low.
    ir: RegisterPair,
    im: InterruptMode,
    iff1: bool,
    iff2: bool,
    halted: bool,
    pending_di: bool,
    pending_ei: bool,
    /// T-states accumulated by the instruction being retired; drained on
    /// return from `step_instruction`/`irq`.
    cycles: u32,
}

/// A value snapshot of the complete architectural and run-state vector.
///
/// Two snapshots compare equal exactly when the cores they were taken
/// from would behave identically. The bus is not part of the vector.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Z80State {
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub a_alt: u8,
    pub f_alt: u8,
    pub b_alt: u8,
    pub c_alt: u8,
    pub d_alt: u8,
    pub e_alt: u8,
    pub h_alt: u8,
    pub l_alt: u8,
    pub ix: u16,
    pub iy: u16,
    pub sp: u16,
    pub pc: u16,
    pub i: u8,
    pub r: u8,
    pub iff1: bool,
    pub iff2: bool,
    pub im: InterruptMode,
    pub halted: bool,
    pub pending_di: bool,
    pub pending_ei: bool,
}

impl<B> Z80<B> {
    /// Creates a new interpreter around the given bus.
    ///
    /// The core comes up in the reset state of [Z80::reset]; registers the
    /// reset leaves undefined read as zero until the program writes them.
    pub fn new(bus: B) -> Self {
        let mut cpu = Z80 {
            bus,
            af: RegisterPair::default(),
            af_alt: RegisterPair::default(),
            regs: GeneralRegisters::default(),
            regs_alt: GeneralRegisters::default(),
            index: IndexRegisters::default(),
            pc: RegisterPair::default(),
            sp: RegisterPair::default(),
            ir: RegisterPair::default(),
            im: InterruptMode::default(),
            iff1: false,
            iff2: false,
            halted: false,
            pending_di: false,
            pending_ei: false,
            cycles: 0,
        };
        cpu.reset();
        cpu
    }

    /// Consumes the interpreter, returning the bus.
    pub fn into_bus(self) -> B {
        self.bus
    }

    /// Borrows the bus.
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Mutably borrows the bus.
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Applies the hardware reset state.
    ///
    /// `SP=0xDFF0`, `PC=0`, `A=0`, all flags reset, `R=0`, `IM 0`,
    /// interrupts disabled, HALT and the pending `EI`/`DI` latches
    /// cleared. Every other register keeps its value; on real silicon the
    /// post-power-on content of those registers is undefined.
    pub fn reset(&mut self) {
        self.sp.set16(0xDFF0);
        self.pc.set16(0);
        self.af.set16(0);
        self.ir.set8lo(0);
        self.im = InterruptMode::Mode0;
        self.iff1 = false;
        self.iff2 = false;
        self.halted = false;
        self.pending_di = false;
        self.pending_ei = false;
        self.cycles = 0;
    }

    /// Returns the Accumulator.
    #[inline]
    pub fn get_acc(&self) -> u8 {
        self.af.get8hi()
    }

    /// Sets the Accumulator.
    #[inline]
    pub fn set_acc(&mut self, val: u8) {
        self.af.set8hi(val)
    }

    /// Returns the Flags register.
    #[inline]
    pub fn get_flags(&self) -> CpuFlags {
        CpuFlags::from_bits_truncate(self.af.get8lo())
    }

    /// Sets the Flags register.
    #[inline]
    pub fn set_flags(&mut self, flags: CpuFlags) {
        self.af.set8lo(flags.bits())
    }

    /// Returns the `AF` register pair.
    #[inline]
    pub fn get_af(&self) -> u16 {
        self.af.get16()
    }

    /// Sets the `AF` register pair.
    #[inline]
    pub fn set_af(&mut self, af: u16) {
        self.af.set16(af)
    }

    /// Returns the `BC` register pair.
    #[inline]
    pub fn get_bc(&self) -> u16 {
        self.regs.bc.get16()
    }

    /// Sets the `BC` register pair.
    #[inline]
    pub fn set_bc(&mut self, bc: u16) {
        self.regs.bc.set16(bc)
    }

    /// Returns the `DE` register pair.
    #[inline]
    pub fn get_de(&self) -> u16 {
        self.regs.de.get16()
    }

    /// Sets the `DE` register pair.
    #[inline]
    pub fn set_de(&mut self, de: u16) {
        self.regs.de.set16(de)
    }

    /// Returns the `HL` register pair.
    #[inline]
    pub fn get_hl(&self) -> u16 {
        self.regs.hl.get16()
    }

    /// Sets the `HL` register pair.
    #[inline]
    pub fn set_hl(&mut self, hl: u16) {
        self.regs.hl.set16(hl)
    }

    /// Returns the `IX` register.
    #[inline]
    pub fn get_ix(&self) -> u16 {
        self.index.ix.get16()
    }

    /// Sets the `IX` register.
    #[inline]
    pub fn set_ix(&mut self, ix: u16) {
        self.index.ix.set16(ix)
    }

    /// Returns the `IY` register.
    #[inline]
    pub fn get_iy(&self) -> u16 {
        self.index.iy.get16()
    }

    /// Sets the `IY` register.
    #[inline]
    pub fn set_iy(&mut self, iy: u16) {
        self.index.iy.set16(iy)
    }

    /// Returns the stack pointer.
    #[inline]
    pub fn get_sp(&self) -> u16 {
        self.sp.get16()
    }

    /// Sets the stack pointer.
    #[inline]
    pub fn set_sp(&mut self, sp: u16) {
        self.sp.set16(sp)
    }

    /// Returns the program counter.
    #[inline]
    pub fn get_pc(&self) -> u16 {
        self.pc.get16()
    }

    /// Sets the program counter.
    #[inline]
    pub fn set_pc(&mut self, pc: u16) {
        self.pc.set16(pc)
    }

    /// Returns the interrupt page register `I`.
    #[inline]
    pub fn get_i(&self) -> u8 {
        self.ir.get8hi()
    }

    /// Sets the interrupt page register `I`.
    #[inline]
    pub fn set_i(&mut self, i: u8) {
        self.ir.set8hi(i)
    }

    /// Returns the memory refresh register `R`.
    #[inline]
    pub fn get_r(&self) -> u8 {
        self.ir.get8lo()
    }

    /// Sets the memory refresh register `R`, bit 7 included, the same way
    /// `LD R,A` does.
    #[inline]
    pub fn set_r(&mut self, r: u8) {
        self.ir.set8lo(r)
    }

    /// Returns the interrupt flip-flops as `(IFF1, IFF2)`.
    #[inline]
    pub fn get_iffs(&self) -> (bool, bool) {
        (self.iff1, self.iff2)
    }

    /// Sets the interrupt flip-flops.
    #[inline]
    pub fn set_iffs(&mut self, iff1: bool, iff2: bool) {
        self.iff1 = iff1;
        self.iff2 = iff2;
    }

    /// Returns the maskable interrupt mode.
    #[inline]
    pub fn get_im(&self) -> InterruptMode {
        self.im
    }

    /// Sets the maskable interrupt mode.
    #[inline]
    pub fn set_im(&mut self, im: InterruptMode) {
        self.im = im;
    }

    /// Returns `true` while the CPU sits in the HALT state.
    #[inline]
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Swaps `AF` with `AF'`.
    #[inline]
    pub fn ex_af_af(&mut self) {
        swap(&mut self.af, &mut self.af_alt);
    }

    /// Swaps `BC`, `DE` and `HL` with their alternative bank.
    #[inline]
    pub fn exx(&mut self) {
        swap(&mut self.regs, &mut self.regs_alt);
    }

    /// Captures the complete state vector.
    pub fn snapshot(&self) -> Z80State {
        let (a, f) = self.af.get();
        let (a_alt, f_alt) = self.af_alt.get();
        let (b, c) = self.regs.bc.get();
        let (d, e) = self.regs.de.get();
        let (h, l) = self.regs.hl.get();
        let (b_alt, c_alt) = self.regs_alt.bc.get();
        let (d_alt, e_alt) = self.regs_alt.de.get();
        let (h_alt, l_alt) = self.regs_alt.hl.get();
        Z80State {
            a, f, b, c, d, e, h, l,
            a_alt, f_alt, b_alt, c_alt, d_alt, e_alt, h_alt, l_alt,
            ix: self.index.ix.get16(),
            iy: self.index.iy.get16(),
            sp: self.sp.get16(),
            pc: self.pc.get16(),
            i: self.ir.get8hi(),
            r: self.ir.get8lo(),
            iff1: self.iff1,
            iff2: self.iff2,
            im: self.im,
            halted: self.halted,
            pending_di: self.pending_di,
            pending_ei: self.pending_ei,
        }
    }

    /// Restores a state vector captured with [Z80::snapshot].
    pub fn load(&mut self, state: Z80State) {
        self.af.set(state.a, state.f);
        self.af_alt.set(state.a_alt, state.f_alt);
        self.regs.bc.set(state.b, state.c);
        self.regs.de.set(state.d, state.e);
        self.regs.hl.set(state.h, state.l);
        self.regs_alt.bc.set(state.b_alt, state.c_alt);
        self.regs_alt.de.set(state.d_alt, state.e_alt);
        self.regs_alt.hl.set(state.h_alt, state.l_alt);
        self.index.ix.set16(state.ix);
        self.index.iy.set16(state.iy);
        self.sp.set16(state.sp);
        self.pc.set16(state.pc);
        self.ir.set(state.i, state.r);
        self.iff1 = state.iff1;
        self.iff2 = state.iff2;
        self.im = state.im;
        self.halted = state.halted;
        self.pending_di = state.pending_di;
        self.pending_ei = state.pending_ei;
        self.cycles = 0;
    }

    /// Increments the memory refresh counter. Bit 7 is sticky: only the
    /// seven low bits count.
    #[inline]
    fn bump_r(&mut self) {
        let r = self.ir.get8lo();
        self.ir.set8lo(r & 0x80 | r.wrapping_add(1) & 0x7F);
    }
}

impl<B: Bus> Z80<B> {
    /// Retires exactly one instruction and returns the T-states consumed.
    ///
    /// In the HALT state no fetch happens and a single T-state is
    /// reported, letting the host keep advancing virtual time until it
    /// posts an interrupt.
    ///
    /// A pending `EI` or `DI` from the previous instruction commits to the
    /// interrupt flip-flops after this instruction retires, which is what
    /// keeps the window between `EI` and the following instruction free of
    /// interrupts.
    pub fn step_instruction(&mut self) -> u32 {
        if self.halted {
            return 1;
        }
        let commit_di = self.pending_di;
        let commit_ei = self.pending_ei;
        self.pending_di = false;
        self.pending_ei = false;
        let code = self.fetch_opcode();
        self.exec_main(code);
        if commit_di {
            self.iff1 = false;
            self.iff2 = false;
        }
        if commit_ei {
            self.iff1 = true;
            self.iff2 = true;
        }
        core::mem::take(&mut self.cycles)
    }

    /// Posts an interrupt between instructions. Returns the T-states the
    /// acceptance consumed, `0` when a maskable request is refused.
    ///
    /// A non-maskable interrupt is always accepted: it saves `IFF1` into
    /// `IFF2`, masks further interrupts and restarts at `0x66`.
    ///
    /// A maskable request is accepted only while `IFF1` is set. `data` is
    /// the byte the requesting device would place on the data bus: in
    /// mode 0 it is decoded as an instruction (typically an `RST`), in
    /// mode 2 it selects the entry of the vector table at `I`; mode 1
    /// ignores it and restarts at `0x38`. Vector table reads in mode 2 are
    /// not forced to even addresses; the manual asks for alignment but the
    /// core executes whatever the table holds.
    ///
    /// Either flavour of acceptance releases the HALT state.
    pub fn irq(&mut self, non_maskable: bool, data: u8) -> u32 {
        if non_maskable {
            self.bump_r();
            self.halted = false;
            self.iff2 = self.iff1;
            self.iff1 = false;
            let pc = self.pc.get16();
            self.push16(pc);
            self.pc.set16(NMI_RESTART);
            self.cycles += 11;
            return core::mem::take(&mut self.cycles);
        }
        if !self.iff1 {
            return 0;
        }
        self.bump_r();
        self.halted = false;
        self.iff1 = false;
        self.iff2 = false;
        match self.im {
            InterruptMode::Mode0 => {
                // the bus byte replaces the usual opcode fetch, PC still
                // addressing the interrupted instruction
                self.cycles += 2;
                self.exec_main(data);
            }
            InterruptMode::Mode1 => {
                let pc = self.pc.get16();
                self.push16(pc);
                self.pc.set16(IM1_RESTART);
                self.cycles += 13;
            }
            InterruptMode::Mode2 => {
                let pc = self.pc.get16();
                self.push16(pc);
                let vaddr = u16::from_be_bytes([self.ir.get8hi(), data]);
                let target = self.mem_read16(vaddr);
                self.pc.set16(target);
                self.cycles += 19;
            }
        }
        core::mem::take(&mut self.cycles)
    }
}
