/*
    z80core: Zilog Z80 CPU instruction interpreter library.
    Copyright (C) 2020-2024  z80core contributors

    z80core is free software: you can redistribute it and/or modify it under
    the terms of the GNU Lesser General Public License (LGPL) as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    z80core is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Lesser General Public License for more details.

    You should have received a copy of the GNU Lesser General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/
/*! # z80core

`z80core` is an instruction-level interpreter for the Zilog Z80: the piece
an 8-bit machine emulator wraps a bus, a clock and peripherals around.

The documented instruction set is implemented together with the major
undocumented behaviour the software of the era depends on: the DD/FD
index planes including the `IXH`/`IXL`/`IYH`/`IYL` register halves, the
composite DDCB/FDCB plane with its double write-back, `SLL`, the ED-plane
mirror slots, the undocumented `X`/`Y` flag bits everywhere, and the
`LD A,I`/`LD A,R` interrupt-flag parity rule. NMI and the three maskable
interrupt modes are handled, with the Z80's delayed `EI`/`DI` commit.

The interpreter is not cycle-accurate. Each retired instruction reports
its total T-states from per-plane base cost tables plus the conditional
extras of taken branches and repeating block instructions; M-cycle
boundaries and bus contention are the host's business, if it has any.

The host supplies the machine as an implementation of the [Bus] trait —
four total operations over memory and the 16-bit I/O port space — and
drives the core one instruction at a time:

```
use z80core::{Bus, Z80};

struct Ram([u8; 32768]);

impl Bus for Ram {
    fn mem_read(&mut self, addr: u16) -> u8 {
        self.0[addr as usize & 0x7FFF]
    }
    fn mem_write(&mut self, addr: u16, val: u8) {
        self.0[addr as usize & 0x7FFF] = val;
    }
    fn io_read(&mut self, _port: u16) -> u8 { 0xFF }
    fn io_write(&mut self, _port: u16, _val: u8) {}
}

let mut ram = Ram([0; 32768]);
// LD A,0x15; ADD A,0x27; DAA; HALT
ram.0[..6].copy_from_slice(&[0x3E, 0x15, 0xC6, 0x27, 0x27, 0x76]);

let mut cpu = Z80::new(ram);
cpu.reset();
let mut tstates = 0u32;
while !cpu.is_halted() {
    tstates += cpu.step_instruction();
}
assert_eq!(cpu.get_acc(), 0x42); // 15 + 27 = 42 in BCD
assert_eq!(tstates, 7 + 7 + 4 + 4);
```

Interrupts are posted by the host between steps with [Z80::irq]; a
pending maskable request is refused (returning 0) while interrupts are
disabled, so the host simply keeps offering it.

The whole architectural state is readable and writable through
accessors, and [Z80::snapshot]/[Z80::load] move it in and out as a plain
[Z80State] value (`serde`-capable behind the `serde` feature flag).
*/
#![cfg_attr(not(feature = "std"), no_std)]

#[macro_use]
extern crate bitflags;

mod flags;
pub mod host;
mod parse;
mod registers;
pub mod tables;
mod z80;

pub use flags::CpuFlags;
pub use host::Bus;
pub use parse::{Condition, Reg8, Reg16, StkReg16};
pub use registers::{InterruptMode, RegisterPair};
pub use z80::{Z80, Z80State, IM1_RESTART, NMI_RESTART};

/// Selected opcodes, useful to hosts assembling boot stubs or feeding
/// mode-0 interrupt data.
pub mod opconsts {
    /// No operation.
    pub const NOP_OPCODE: u8 = 0x00;
    /// Halt execution.
    pub const HALT_OPCODE: u8 = 0x76;
    /// Disable interrupts.
    pub const DI_OPCODE: u8 = 0xF3;
    /// Enable interrupts.
    pub const EI_OPCODE: u8 = 0xFB;
    /// Return from subroutine.
    pub const RET_OPCODE: u8 = 0xC9;
    /// Call a subroutine.
    pub const CALL_OPCODE: u8 = 0xCD;
    /// Branch to an absolute address.
    pub const JP_OPCODE: u8 = 0xC3;
    /// Branch to a relative address.
    pub const JR_OPCODE: u8 = 0x18;
    /// Restart at `0x38`; also what a mode-1 interrupt effectively runs.
    pub const RST_38H_OPCODE: u8 = 0xFF;
    /// The CB prefix.
    pub const CB_PREFIX: u8 = 0xCB;
    /// The ED prefix.
    pub const ED_PREFIX: u8 = 0xED;
    /// The IX prefix.
    pub const DD_PREFIX: u8 = 0xDD;
    /// The IY prefix.
    pub const FD_PREFIX: u8 = 0xFD;
}
