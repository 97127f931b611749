//! Interrupt acceptance, the delayed EI/DI commit and the related ED-plane
//! instructions.
use z80core::{Bus, InterruptMode};

mod ram;
use ram::cpu_with;

#[test]
fn im1_accepts_after_the_ei_window() {
    // EI; NOP; NOP
    let mut cpu = cpu_with(&[0xFB, 0x00, 0x00]);
    cpu.set_im(InterruptMode::Mode1);
    assert_eq!(cpu.step_instruction(), 4); // EI
    // a request in the shadow of EI is refused
    assert_eq!(cpu.irq(false, 0), 0);
    assert_eq!(cpu.step_instruction(), 4); // NOP, EI commits
    let sp = cpu.get_sp();
    assert_eq!(cpu.irq(false, 0), 13);
    assert_eq!(cpu.get_pc(), 0x38);
    assert_eq!(cpu.get_sp(), sp - 2);
    assert_eq!(cpu.get_iffs(), (false, false));
    // the interrupted PC sits on the stack
    let top = cpu.get_sp();
    let lo = cpu.bus_mut().mem_read(top);
    let hi = cpu.bus_mut().mem_read(top + 1);
    assert_eq!(u16::from_le_bytes([lo, hi]), 0x0002);
}

#[test]
fn im2_uses_the_vector_table() {
    let mut cpu = cpu_with(&[0xFB, 0x00, 0x00]);
    cpu.set_im(InterruptMode::Mode2);
    cpu.set_i(0x21);
    cpu.bus_mut().mem[0x21FE] = 0x00;
    cpu.bus_mut().mem[0x21FF] = 0x30;
    cpu.step_instruction();
    cpu.step_instruction();
    assert_eq!(cpu.irq(false, 0xFE), 19);
    assert_eq!(cpu.get_pc(), 0x3000);
}

#[test]
fn im2_vector_table_is_not_forced_even() {
    let mut cpu = cpu_with(&[]);
    cpu.set_im(InterruptMode::Mode2);
    cpu.set_iffs(true, true);
    cpu.set_i(0x40);
    cpu.bus_mut().mem[0x4001] = 0x34;
    cpu.bus_mut().mem[0x4002] = 0x12;
    cpu.irq(false, 0x01); // odd low byte is taken as-is
    assert_eq!(cpu.get_pc(), 0x1234);
}

#[test]
fn im0_runs_the_injected_restart() {
    let mut cpu = cpu_with(&[0x00, 0x00]);
    cpu.set_im(InterruptMode::Mode0);
    cpu.set_iffs(true, true);
    cpu.step_instruction();
    assert_eq!(cpu.irq(false, 0xF7), 11 + 2); // RST 30h
    assert_eq!(cpu.get_pc(), 0x30);
}

#[test]
fn nmi_interrupts_even_with_iff1_clear() {
    let mut cpu = cpu_with(&[0x00, 0x00]);
    cpu.set_iffs(false, false);
    cpu.step_instruction();
    assert_eq!(cpu.irq(true, 0), 11);
    assert_eq!(cpu.get_pc(), 0x66);
    assert_eq!(cpu.get_iffs(), (false, false));
}

#[test]
fn nmi_preserves_iff1_in_iff2() {
    let mut cpu = cpu_with(&[0xFB, 0x00, 0x00]);
    cpu.step_instruction();
    cpu.step_instruction(); // EI committed
    cpu.irq(true, 0);
    assert_eq!(cpu.get_iffs(), (false, true));
    // RETN at 0x66 brings IFF1 back
    cpu.bus_mut().mem[0x66] = 0xED;
    cpu.bus_mut().mem[0x67] = 0x45;
    cpu.step_instruction();
    assert_eq!(cpu.get_iffs(), (true, true));
    assert_eq!(cpu.get_pc(), 0x0002);
}

#[test]
fn reti_does_not_restore_iff1() {
    let mut cpu = cpu_with(&[0xED, 0x4D]);
    cpu.set_iffs(false, true);
    cpu.set_sp(0xC000);
    cpu.bus_mut().mem[0xC000] = 0x21;
    cpu.bus_mut().mem[0xC001] = 0x43;
    assert_eq!(cpu.step_instruction(), 14);
    assert_eq!(cpu.get_pc(), 0x4321);
    assert_eq!(cpu.get_iffs(), (false, true));
}

#[test]
fn retn_mirror_slots_restore_iff1() {
    for second in [0x45u8, 0x55, 0x5D, 0x65, 0x6D, 0x75, 0x7D] {
        let mut cpu = cpu_with(&[0xED, second]);
        cpu.set_iffs(false, true);
        cpu.set_sp(0xC000);
        cpu.bus_mut().mem[0xC000] = 0x00;
        cpu.bus_mut().mem[0xC001] = 0x10;
        cpu.step_instruction();
        assert_eq!(cpu.get_pc(), 0x1000, "opcode ED {:02X}", second);
        assert_eq!(cpu.get_iffs(), (true, true), "opcode ED {:02X}", second);
    }
}

#[test]
fn maskable_irq_releases_halt() {
    // EI; HALT
    let mut cpu = cpu_with(&[0xFB, 0x76, 0x00]);
    cpu.set_im(InterruptMode::Mode1);
    cpu.step_instruction(); // EI
    cpu.step_instruction(); // HALT retires, EI commits
    assert!(cpu.is_halted());
    assert_eq!(cpu.step_instruction(), 1);
    assert_eq!(cpu.irq(false, 0), 13);
    assert!(!cpu.is_halted());
    assert_eq!(cpu.get_pc(), 0x38);
}

#[test]
fn im_is_selected_by_the_ed_plane() {
    let mut cpu = cpu_with(&[0xED, 0x5E, 0xED, 0x56, 0xED, 0x46, 0x76]);
    cpu.step_instruction();
    assert_eq!(cpu.get_im(), InterruptMode::Mode2);
    cpu.step_instruction();
    assert_eq!(cpu.get_im(), InterruptMode::Mode1);
    cpu.step_instruction();
    assert_eq!(cpu.get_im(), InterruptMode::Mode0);
}

#[test]
fn ld_a_i_reports_iff2_in_parity() {
    let mut cpu = cpu_with(&[0xED, 0x57, 0xED, 0x57]);
    cpu.set_i(0x00);
    cpu.set_iffs(false, true);
    assert_eq!(cpu.step_instruction(), 9);
    assert_eq!(cpu.get_acc(), 0);
    let f = cpu.get_flags();
    assert!(f.zf());
    assert!(f.pvf());
    cpu.set_iffs(false, false);
    cpu.step_instruction();
    assert!(!cpu.get_flags().pvf());
}

#[test]
fn ld_a_r_reads_the_live_counter() {
    let mut cpu = cpu_with(&[0x00, 0xED, 0x5F]);
    cpu.set_iffs(true, true);
    cpu.step_instruction();
    cpu.step_instruction();
    // NOP bumped R to 1, the two ED bytes bump it to 3
    assert_eq!(cpu.get_acc(), 3);
    assert!(cpu.get_flags().pvf());
    assert!(!cpu.get_flags().zf());
}

#[test]
fn ld_r_a_writes_the_sticky_bit() {
    let mut cpu = cpu_with(&[0x3E, 0xC1, 0xED, 0x4F, 0x00, 0x76]);
    cpu.set_iffs(false, false);
    let mut steps = 0;
    while !cpu.is_halted() {
        cpu.step_instruction();
        steps += 1;
    }
    assert_eq!(steps, 4);
    // R was written as 0xC1 by LD R,A, then bumped by NOP and HALT
    assert_eq!(cpu.get_r(), 0xC3);
}
