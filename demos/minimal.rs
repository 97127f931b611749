//! The smallest possible host: 32 KiB of RAM, no devices, one program.
//!
//! Run with `cargo run --example minimal`.
use z80core::{Bus, Z80};

struct Ram32 {
    mem: [u8; 0x8000],
}

impl Bus for Ram32 {
    fn mem_read(&mut self, addr: u16) -> u8 {
        self.mem[addr as usize & 0x7FFF]
    }

    fn mem_write(&mut self, addr: u16, val: u8) {
        self.mem[addr as usize & 0x7FFF] = val;
    }

    fn io_read(&mut self, _port: u16) -> u8 {
        0xFF
    }

    fn io_write(&mut self, port: u16, val: u8) {
        println!("out ({:#06X}) <- {:#04X}", port, val);
    }
}

// Sum the bytes 1..=10 into A, report the total on port 1, halt.
static PROGRAM: &[u8] = &[
    0xAF,             // 0x0000  XOR  A
    0x06, 0x0A,       // 0x0001  LD   B,10
    0x80,             // 0x0003  ADD  A,B
    0x10, 0xFD,       // 0x0004  DJNZ 0x0003
    0xD3, 0x01,       // 0x0006  OUT  (1),A
    0x76,             // 0x0008  HALT
];

fn main() {
    let mut ram = Ram32 { mem: [0; 0x8000] };
    ram.mem[..PROGRAM.len()].copy_from_slice(PROGRAM);

    let mut cpu = Z80::new(ram);
    cpu.reset();

    let mut tstates = 0u32;
    while !cpu.is_halted() {
        tstates += cpu.step_instruction();
    }
    println!("A = {} after {} T-states", cpu.get_acc(), tstates);
    assert_eq!(cpu.get_acc(), 55);
}
