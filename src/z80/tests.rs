/*
    z80core: Zilog Z80 CPU instruction interpreter library.
    Copyright (C) 2020-2024  z80core contributors

    For the full copyright notice, see the lib.rs file.
*/
//! Dispatcher-level unit tests on a flat RAM machine.
use crate::flags::CpuFlags;
use crate::host::Bus;
use crate::registers::InterruptMode;
use super::Z80;

struct TestBus {
    mem: Vec<u8>,
    io_feed: Vec<u8>,
    io_log: Vec<(u16, u8)>,
}

impl TestBus {
    fn new(prog: &[u8]) -> Self {
        let mut mem = vec![0u8; 0x10000];
        mem[..prog.len()].copy_from_slice(prog);
        TestBus { mem, io_feed: Vec::new(), io_log: Vec::new() }
    }
}

impl Bus for TestBus {
    fn mem_read(&mut self, addr: u16) -> u8 {
        self.mem[addr as usize]
    }

    fn mem_write(&mut self, addr: u16, val: u8) {
        self.mem[addr as usize] = val;
    }

    fn io_read(&mut self, _port: u16) -> u8 {
        if self.io_feed.is_empty() { 0xFF } else { self.io_feed.remove(0) }
    }

    fn io_write(&mut self, port: u16, val: u8) {
        self.io_log.push((port, val));
    }
}

fn cpu_with(prog: &[u8]) -> Z80<TestBus> {
    let mut cpu = Z80::new(TestBus::new(prog));
    cpu.reset();
    cpu
}

fn run_to_halt(cpu: &mut Z80<TestBus>) -> u32 {
    let mut total = 0;
    for _ in 0..10_000 {
        if cpu.is_halted() {
            return total;
        }
        total += cpu.step_instruction();
    }
    panic!("program never reached HALT");
}

#[test]
fn reset_state() {
    let mut cpu = cpu_with(&[]);
    cpu.set_bc(0x1234);
    cpu.set_ix(0x5678);
    cpu.set_i(0x3B);
    cpu.set_acc(0xAA);
    cpu.set_flags(CpuFlags::all());
    cpu.set_r(0x55);
    cpu.set_im(InterruptMode::Mode2);
    cpu.set_iffs(true, true);
    cpu.set_sp(0x1111);
    cpu.set_pc(0x2222);
    cpu.reset();
    assert_eq!(cpu.get_sp(), 0xDFF0);
    assert_eq!(cpu.get_pc(), 0);
    assert_eq!(cpu.get_acc(), 0);
    assert_eq!(cpu.get_flags(), CpuFlags::empty());
    assert_eq!(cpu.get_r(), 0);
    assert_eq!(cpu.get_im(), InterruptMode::Mode0);
    assert_eq!(cpu.get_iffs(), (false, false));
    assert!(!cpu.is_halted());
    // everything else is deliberately untouched
    assert_eq!(cpu.get_bc(), 0x1234);
    assert_eq!(cpu.get_ix(), 0x5678);
    assert_eq!(cpu.get_i(), 0x3B);
}

#[test]
fn reset_is_idempotent() {
    let mut cpu = cpu_with(&[]);
    cpu.set_de(0xBEEF);
    cpu.reset();
    let once = cpu.snapshot();
    cpu.reset();
    assert_eq!(cpu.snapshot(), once);
}

#[test]
fn halt_stops_the_fetch_stream() {
    let mut cpu = cpu_with(&[0x76]);
    assert_eq!(cpu.step_instruction(), 4);
    assert!(cpu.is_halted());
    assert_eq!(cpu.get_pc(), 1);
    let r = cpu.get_r();
    // halted ticks cost one T-state and touch nothing
    assert_eq!(cpu.step_instruction(), 1);
    assert_eq!(cpu.step_instruction(), 1);
    assert_eq!(cpu.get_r(), r);
    assert_eq!(cpu.get_pc(), 1);
}

#[test]
fn refresh_counter_counts_opcode_bytes() {
    // NOP; NOP; INC A; CB rot; ED nop-slot; HALT
    let mut cpu = cpu_with(&[0x00, 0x00, 0x3C, 0xCB, 0x07, 0xED, 0x77, 0x76]);
    cpu.step_instruction();
    assert_eq!(cpu.get_r(), 1);
    cpu.step_instruction();
    cpu.step_instruction();
    assert_eq!(cpu.get_r(), 3);
    cpu.step_instruction(); // CB 07: two opcode bytes
    assert_eq!(cpu.get_r(), 5);
    cpu.step_instruction(); // ED 77: two opcode bytes
    assert_eq!(cpu.get_r(), 7);
    cpu.step_instruction();
    assert_eq!(cpu.get_r(), 8);
    assert!(cpu.is_halted());
}

#[test]
fn refresh_counter_wraps_preserving_bit7() {
    let mut cpu = cpu_with(&[0x00; 0x300]);
    cpu.set_r(0x80 | 0x7E);
    cpu.step_instruction();
    assert_eq!(cpu.get_r(), 0x80 | 0x7F);
    cpu.step_instruction();
    assert_eq!(cpu.get_r(), 0x80);
    cpu.step_instruction();
    assert_eq!(cpu.get_r(), 0x81);
}

#[test]
fn unknown_dd_opcode_retires_the_prefix_as_a_nop() {
    // DD 05 is not in the DD plane: the prefix is a 4 T-state NOP and
    // DEC B runs as the following instruction.
    let mut cpu = cpu_with(&[0xDD, 0x05, 0x76]);
    cpu.set_bc(0x0200);
    assert_eq!(cpu.step_instruction(), 4);
    assert_eq!(cpu.get_pc(), 1);
    assert_eq!(cpu.get_bc(), 0x0200);
    assert_eq!(cpu.step_instruction(), 4);
    assert_eq!(cpu.get_bc(), 0x0100);
    assert_eq!(cpu.get_r(), 2);
}

#[test]
fn unknown_ed_opcode_is_a_two_byte_nop() {
    let mut cpu = cpu_with(&[0xED, 0x00, 0x76]);
    assert_eq!(cpu.step_instruction(), 4);
    assert_eq!(cpu.get_pc(), 2);
    assert_eq!(cpu.get_r(), 2);
}

#[test]
fn ei_commits_after_the_following_instruction() {
    let mut cpu = cpu_with(&[0xFB, 0x00, 0x76]);
    cpu.step_instruction(); // EI
    assert_eq!(cpu.get_iffs(), (false, false));
    // the request posted inside the window is refused
    assert_eq!(cpu.irq(false, 0), 0);
    cpu.step_instruction(); // NOP retires, EI commits
    assert_eq!(cpu.get_iffs(), (true, true));
}

#[test]
fn di_commits_after_the_following_instruction() {
    let mut cpu = cpu_with(&[0xF3, 0x00, 0x76]);
    cpu.set_iffs(true, true);
    cpu.step_instruction(); // DI
    assert_eq!(cpu.get_iffs(), (true, true));
    cpu.step_instruction(); // NOP retires, DI commits
    assert_eq!(cpu.get_iffs(), (false, false));
}

#[test]
fn nmi_saves_iff1_and_restarts_at_0x66() {
    let mut cpu = cpu_with(&[0x76]);
    cpu.set_iffs(true, true);
    cpu.step_instruction();
    assert!(cpu.is_halted());
    let sp = cpu.get_sp();
    assert_eq!(cpu.irq(true, 0), 11);
    assert!(!cpu.is_halted());
    assert_eq!(cpu.get_pc(), 0x66);
    assert_eq!(cpu.get_sp(), sp.wrapping_sub(2));
    assert_eq!(cpu.get_iffs(), (false, true));
    // the return address is the byte after the HALT
    let top = cpu.get_sp();
    let lo = cpu.bus_mut().mem_read(top);
    let hi = cpu.bus_mut().mem_read(top.wrapping_add(1));
    assert_eq!(u16::from_le_bytes([lo, hi]), 0x0001);
}

#[test]
fn maskable_irq_is_refused_without_iff1() {
    let mut cpu = cpu_with(&[0x00, 0x76]);
    assert_eq!(cpu.irq(false, 0), 0);
    assert_eq!(cpu.get_pc(), 0);
}

#[test]
fn im1_pushes_and_restarts_at_0x38() {
    let mut cpu = cpu_with(&[0x00, 0x76]);
    cpu.set_im(InterruptMode::Mode1);
    cpu.set_iffs(true, true);
    cpu.step_instruction();
    assert_eq!(cpu.irq(false, 0xE7), 13);
    assert_eq!(cpu.get_pc(), 0x38);
    assert_eq!(cpu.get_iffs(), (false, false));
}

#[test]
fn im0_executes_the_bus_byte() {
    let mut cpu = cpu_with(&[0x00, 0x76]);
    cpu.set_im(InterruptMode::Mode0);
    cpu.set_iffs(true, true);
    cpu.step_instruction();
    let sp = cpu.get_sp();
    // RST 28h from the bus: 11 T-states for the RST plus the 2-T overhead
    assert_eq!(cpu.irq(false, 0xEF), 13);
    assert_eq!(cpu.get_pc(), 0x28);
    assert_eq!(cpu.get_sp(), sp.wrapping_sub(2));
    let top = cpu.get_sp();
    let lo = cpu.bus_mut().mem_read(top);
    let hi = cpu.bus_mut().mem_read(top.wrapping_add(1));
    // the interrupted instruction resumes at 0x0001
    assert_eq!(u16::from_le_bytes([lo, hi]), 0x0001);
}

#[test]
fn im2_fetches_the_vector_from_the_table() {
    let mut cpu = cpu_with(&[0x00, 0x76]);
    cpu.set_im(InterruptMode::Mode2);
    cpu.set_iffs(true, true);
    cpu.set_i(0x3F);
    cpu.bus_mut().mem[0x3F21] = 0xCD;
    cpu.bus_mut().mem[0x3F22] = 0xAB;
    cpu.step_instruction();
    assert_eq!(cpu.irq(false, 0x21), 19);
    assert_eq!(cpu.get_pc(), 0xABCD);
    assert_eq!(cpu.get_iffs(), (false, false));
}

#[test]
fn snapshot_load_round_trips() {
    let mut cpu = cpu_with(&[0x3E, 0x55, 0x06, 0x44, 0x76]);
    run_to_halt(&mut cpu);
    cpu.set_ix(0x1234);
    cpu.set_iy(0x4321);
    cpu.ex_af_af();
    cpu.set_acc(0x99);
    let state = cpu.snapshot();
    let mut other = cpu_with(&[]);
    other.load(state.clone());
    assert_eq!(other.snapshot(), state);
    assert_eq!(other.get_acc(), 0x99);
    assert_eq!(other.get_ix(), 0x1234);
    assert!(other.is_halted());
}

#[test]
fn out_instruction_places_a_on_the_upper_port_byte() {
    // LD A,0x5A; OUT (0x17),A; HALT
    let mut cpu = cpu_with(&[0x3E, 0x5A, 0xD3, 0x17, 0x76]);
    run_to_halt(&mut cpu);
    assert_eq!(cpu.bus().io_log, vec![(0x5A17, 0x5A)]);
}

#[test]
fn in_a_n_does_not_move_flags() {
    let mut cpu = cpu_with(&[0xDB, 0x99, 0x76]);
    cpu.bus_mut().io_feed = vec![0x00];
    cpu.set_flags(CpuFlags::all());
    run_to_halt(&mut cpu);
    assert_eq!(cpu.get_acc(), 0x00);
    assert_eq!(cpu.get_flags(), CpuFlags::all());
}

#[test]
fn ed_in_r_c_sets_flags() {
    // IN D,(C)
    let mut cpu = cpu_with(&[0xED, 0x50, 0x76]);
    cpu.set_bc(0x1234);
    cpu.bus_mut().io_feed = vec![0x80];
    cpu.set_flags(CpuFlags::N | CpuFlags::H | CpuFlags::C);
    run_to_halt(&mut cpu);
    assert_eq!(cpu.get_de() >> 8, 0x80);
    assert_eq!(cpu.get_flags(), CpuFlags::S | CpuFlags::C);
}

#[test]
fn out_c_undocumented_slot_emits_zero() {
    let mut cpu = cpu_with(&[0xED, 0x71, 0x76]);
    cpu.set_bc(0x8001);
    run_to_halt(&mut cpu);
    assert_eq!(cpu.bus().io_log, vec![(0x8001, 0x00)]);
}
