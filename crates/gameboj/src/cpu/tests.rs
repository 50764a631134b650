use std::rc::Rc;

use super::*;
use crate::bus::{Bus, Handle};
use crate::memory::{RamController, SharedRam};

/// A CPU on a bus whose RAM covers everything below the I/O page.
struct Harness {
    bus: Bus,
    cpu: Handle<Cpu>,
    ram: SharedRam,
    cycle: u64,
}

impl Harness {
    fn new(program: &[u8]) -> Self {
        crate::init_test_logging();
        let ram = Ram::shared(0xFF00);
        for (i, &b) in program.iter().enumerate() {
            ram.borrow_mut().write(i, b);
        }
        let mut bus = Bus::new();
        bus.attach(RamController::with_start(Rc::clone(&ram), 0x0000));
        let cpu = bus.attach(Cpu::new(InterruptLine::new()));
        Self {
            bus,
            cpu,
            ram,
            cycle: 0,
        }
    }

    fn cpu(&self) -> &Cpu {
        self.bus.get(self.cpu)
    }

    fn try_run_until(&mut self, cycle: u64) -> Result<()> {
        while self.cycle < cycle {
            self.bus.cycle(self.cpu, self.cycle)?;
            self.cycle += 1;
        }
        Ok(())
    }

    fn run_until(&mut self, cycle: u64) {
        self.try_run_until(cycle).unwrap();
    }

    fn mem(&self, address: u16) -> u8 {
        self.ram.borrow().read(address as usize)
    }
}

#[test]
fn two_nops_only_advance_pc() {
    let mut h = Harness::new(&[0x00, 0x00]);
    h.run_until(2);
    let state = h.cpu().state();
    assert_eq!(
        state,
        CpuState {
            pc: 2,
            ..CpuState::default()
        }
    );
}

#[test]
fn add_a_n8_zero_sets_only_z() {
    // ADD A,0x00
    let mut h = Harness::new(&[0xC6, 0x00]);
    h.run_until(2);
    let state = h.cpu().state();
    assert_eq!(state.pc, 2);
    assert_eq!(state.a, 0);
    assert_eq!(state.f, 0x80);
}

#[test]
fn vblank_is_serviced_before_timer() {
    // LD SP,0xD000 ; EI ; NOP
    let mut h = Harness::new(&[0x31, 0x00, 0xD0, 0xFB, 0x00]);
    h.bus.write(0xFFFF, 0x05);
    h.bus.write(0xFF0F, 0x05);
    h.run_until(4);
    assert!(h.cpu().state().ime);

    h.run_until(5);
    let state = h.cpu().state();
    assert_eq!(state.pc, 0x0040);
    assert_eq!(state.if_, 0x04);
    assert!(!state.ime);
    assert_eq!(state.sp, 0xCFFE);
    assert_eq!(h.mem(0xCFFE), 0x04);
    assert_eq!(h.mem(0xCFFF), 0x00);
    assert_eq!(h.cpu().next_non_idle_cycle(), 4 + 5);
}

#[test]
fn halt_waits_for_pending_interrupt() {
    // LD SP,0xD000 ; HALT ; INC A
    let mut h = Harness::new(&[0x31, 0x00, 0xD0, 0x76, 0x3C]);
    h.bus.write(0xFFFF, 0x04);
    h.run_until(20);
    assert!(h.cpu().is_halted());
    assert_eq!(h.cpu().state().a, 0);

    h.cpu().request_interrupt(Interrupt::Timer);
    h.run_until(21);
    let state = h.cpu().state();
    // IME is clear: the CPU resumes without entering the handler.
    assert_eq!(state.a, 1);
    assert_eq!(state.pc, 5);
    assert_eq!(state.if_, 0x04);
}

#[test]
fn stop_is_reported() {
    let mut h = Harness::new(&[0x10, 0x00]);
    let err = h.try_run_until(1).unwrap_err();
    assert!(err.to_string().contains("STOP"));
}

#[test]
fn illegal_opcode_is_reported() {
    let mut h = Harness::new(&[0xD3]);
    let err = h.try_run_until(1).unwrap_err();
    assert!(err.to_string().contains("0xD3"));
}

#[test]
fn conditional_jump_charges_extra_cycles_when_taken() {
    // JR NZ,+2 (taken) ; ... ; XOR A ; JR NZ,+2 (not taken)
    let mut h = Harness::new(&[0x20, 0x02, 0x00, 0x00, 0xAF, 0x20, 0x02]);
    h.run_until(1);
    assert_eq!(h.cpu().pc(), 4);
    assert_eq!(h.cpu().next_non_idle_cycle(), 3);

    h.run_until(4);
    assert_eq!(h.cpu().state().f, 0x80);
    h.run_until(5);
    assert_eq!(h.cpu().pc(), 7);
    assert_eq!(h.cpu().next_non_idle_cycle(), 4 + 2);
}

#[test]
fn call_and_return() {
    // LD SP,0xD000 ; CALL 0x0010 ; NOP ... 0x0010: RET
    let mut program = vec![0x31, 0x00, 0xD0, 0xCD, 0x10, 0x00];
    program.resize(0x10, 0x00);
    program.push(0xC9);
    let mut h = Harness::new(&program);

    h.run_until(4);
    assert_eq!(h.cpu().pc(), 0x0010);
    assert_eq!(h.cpu().sp(), 0xCFFE);
    assert_eq!(h.mem(0xCFFE), 0x06);

    h.run_until(10);
    assert_eq!(h.cpu().pc(), 0x0006);
    assert_eq!(h.cpu().sp(), 0xD000);
}

#[test]
fn pop_af_clears_low_flag_bits() {
    // LD SP,0xD000 ; LD BC,0x12FF ; PUSH BC ; POP AF
    let mut h = Harness::new(&[0x31, 0x00, 0xD0, 0x01, 0xFF, 0x12, 0xC5, 0xF1]);
    h.run_until(3 + 3 + 4 + 3);
    let state = h.cpu().state();
    assert_eq!(state.a, 0x12);
    assert_eq!(state.f, 0xF0);
    assert_eq!(h.cpu().reg16(Reg16::AF), 0x12F0);
}

#[test]
fn daa_corrects_bcd_addition() {
    // LD A,0x45 ; ADD A,0x38 ; DAA
    let mut h = Harness::new(&[0x3E, 0x45, 0xC6, 0x38, 0x27]);
    h.run_until(2 + 2 + 1);
    let state = h.cpu().state();
    assert_eq!(state.a, 0x83);
    assert_eq!(state.f, 0x00);
}

#[test]
fn prefixed_rotate_set_and_test() {
    // LD B,0x80 ; RLC B ; SET 3,B ; BIT 7,B
    let mut h = Harness::new(&[0x06, 0x80, 0xCB, 0x00, 0xCB, 0xD8, 0xCB, 0x78]);
    h.run_until(2 + 2);
    assert_eq!(h.cpu().reg(Reg::B), 0x01);
    assert_eq!(h.cpu().reg(Reg::F), 0x10);

    h.run_until(2 + 2 + 2 + 2);
    assert_eq!(h.cpu().reg(Reg::B), 0x09);
    assert_eq!(h.cpu().reg(Reg::F), 0xB0);
    assert_eq!(h.cpu().pc(), 8);
}

#[test]
fn load_through_hl_with_increment() {
    // LD HL,0xC000 ; LD A,0x5A ; LD (HL+),A ; LD (HL-),A
    let mut h = Harness::new(&[0x21, 0x00, 0xC0, 0x3E, 0x5A, 0x22, 0x32]);
    h.run_until(3 + 2 + 2);
    assert_eq!(h.mem(0xC000), 0x5A);
    assert_eq!(h.cpu().reg16(Reg16::HL), 0xC001);
    h.run_until(3 + 2 + 2 + 2);
    assert_eq!(h.mem(0xC001), 0x5A);
    assert_eq!(h.cpu().reg16(Reg16::HL), 0xC000);
}

#[test]
fn ld_hl_sp_offset_uses_low_byte_flags() {
    // LD SP,0x00FF ; LD HL,SP+1 ; ADD SP,-1
    let mut h = Harness::new(&[0x31, 0xFF, 0x00, 0xF8, 0x01, 0xE8, 0xFF]);
    h.run_until(3 + 3);
    assert_eq!(h.cpu().reg16(Reg16::HL), 0x0100);
    assert_eq!(h.cpu().reg(Reg::F), 0x30);
    h.run_until(3 + 3 + 4);
    assert_eq!(h.cpu().sp(), 0x00FE);
    assert_eq!(h.cpu().reg(Reg::F), 0x30);
}

#[test]
fn inc_keeps_carry() {
    // SCF ; LD A,0xFF ; INC A
    let mut h = Harness::new(&[0x37, 0x3E, 0xFF, 0x3C]);
    h.run_until(1 + 2 + 1);
    let state = h.cpu().state();
    assert_eq!(state.a, 0x00);
    assert_eq!(state.f, 0xB0);
}

#[test]
fn answers_its_own_registers() {
    let mut h = Harness::new(&[]);
    h.bus.write(0xFF80, 0x12);
    h.bus.write(0xFFFE, 0x34);
    h.bus.write(0xFFFF, 0x1F);
    assert_eq!(h.bus.read(0xFF80), 0x12);
    assert_eq!(h.bus.read(0xFFFE), 0x34);
    assert_eq!(h.bus.read(0xFFFF), 0x1F);
    assert_eq!(h.cpu().state().ie, 0x1F);
    assert_eq!(h.bus.read(0xFF7F), 0xFF);
}

#[test]
fn adc_adds_carry_and_add_ignores_it() {
    // SCF ; LD A,0x0F ; LD B,0x00 ; ADC A,B ; SCF ; ADD A,B
    let mut h = Harness::new(&[0x37, 0x3E, 0x0F, 0x06, 0x00, 0x88, 0x37, 0x80]);
    h.run_until(1 + 2 + 2 + 1);
    let state = h.cpu().state();
    assert_eq!(state.a, 0x10);
    assert_eq!(state.f, 0x20);
    assert_eq!(h.cpu().next_non_idle_cycle(), 6);

    h.run_until(6 + 1 + 1);
    let state = h.cpu().state();
    assert_eq!(state.a, 0x10);
    assert_eq!(state.f, 0x00);
}

#[test]
fn sbc_subtracts_borrow() {
    // SCF ; LD A,0x10 ; SBC A,0x0F ; SCF ; LD B,0x01 ; SBC A,B
    let mut h = Harness::new(&[0x37, 0x3E, 0x10, 0xDE, 0x0F, 0x37, 0x06, 0x01, 0x98]);
    h.run_until(1 + 2 + 2);
    let state = h.cpu().state();
    assert_eq!(state.a, 0x00);
    assert_eq!(state.f, 0xE0);
    assert_eq!(h.cpu().next_non_idle_cycle(), 5);

    h.run_until(5 + 1 + 2 + 1);
    let state = h.cpu().state();
    assert_eq!(state.a, 0xFE);
    assert_eq!(state.f, 0x70);
}

#[test]
fn scf_and_ccf_keep_only_z() {
    // AND A ; SCF ; CCF ; CCF
    let mut h = Harness::new(&[0xA7, 0x37, 0x3F, 0x3F]);
    h.run_until(1);
    assert_eq!(h.cpu().reg(Reg::F), 0xA0);
    h.run_until(2);
    assert_eq!(h.cpu().reg(Reg::F), 0x90);
    h.run_until(3);
    assert_eq!(h.cpu().reg(Reg::F), 0x80);
    h.run_until(4);
    assert_eq!(h.cpu().reg(Reg::F), 0x90);
}

#[test]
fn cpl_sets_n_and_h_and_keeps_carry() {
    // SCF ; LD A,0x35 ; CPL
    let mut h = Harness::new(&[0x37, 0x3E, 0x35, 0x2F]);
    h.run_until(1 + 2 + 1);
    let state = h.cpu().state();
    assert_eq!(state.a, 0xCA);
    assert_eq!(state.f, 0x70);
    assert_eq!(h.cpu().next_non_idle_cycle(), 4);
}

#[test]
fn reti_enables_interrupts_and_di_disables_them() {
    // LD SP,0xD000 ; CALL 0x0010 ; DI ... 0x0010: RETI
    let mut program = vec![0x31, 0x00, 0xD0, 0xCD, 0x10, 0x00, 0xF3];
    program.resize(0x10, 0x00);
    program.push(0xD9);
    let mut h = Harness::new(&program);

    h.run_until(3 + 6 + 1);
    let state = h.cpu().state();
    assert_eq!(state.pc, 0x0006);
    assert_eq!(state.sp, 0xD000);
    assert!(state.ime);
    assert_eq!(h.cpu().next_non_idle_cycle(), 3 + 6 + 4);

    h.run_until(3 + 6 + 4 + 1);
    assert!(!h.cpu().state().ime);
    assert_eq!(h.cpu().pc(), 0x0007);
}

#[test]
fn rst_pushes_return_address() {
    // LD SP,0xD000 ; RST 0x18
    let mut h = Harness::new(&[0x31, 0x00, 0xD0, 0xDF]);
    h.run_until(3 + 1);
    assert_eq!(h.cpu().pc(), 0x0018);
    assert_eq!(h.cpu().sp(), 0xCFFE);
    assert_eq!(h.mem(0xCFFE), 0x04);
    assert_eq!(h.mem(0xCFFF), 0x00);
    assert_eq!(h.cpu().next_non_idle_cycle(), 3 + 4);
}

#[test]
fn jp_hl_jumps_to_hl() {
    // LD HL,0x1234 ; JP HL
    let mut h = Harness::new(&[0x21, 0x34, 0x12, 0xE9]);
    h.run_until(3 + 1);
    assert_eq!(h.cpu().pc(), 0x1234);
    assert_eq!(h.cpu().next_non_idle_cycle(), 3 + 1);
}

#[test]
fn add_hl_r16_keeps_z_and_uses_high_byte_carries() {
    // XOR A ; LD HL,0x8FFF ; LD BC,0x7001 ; ADD HL,BC
    let mut h = Harness::new(&[0xAF, 0x21, 0xFF, 0x8F, 0x01, 0x01, 0x70, 0x09]);
    h.run_until(1 + 3 + 3 + 1);
    assert_eq!(h.cpu().reg16(Reg16::HL), 0x0000);
    assert_eq!(h.cpu().reg(Reg::F), 0xB0);
    assert_eq!(h.cpu().next_non_idle_cycle(), 1 + 3 + 3 + 2);
}

#[test]
fn rotations_through_carry() {
    // SCF ; LD B,0x80 ; RL B
    let mut h = Harness::new(&[0x37, 0x06, 0x80, 0xCB, 0x10]);
    h.run_until(1 + 2 + 1);
    assert_eq!(h.cpu().reg(Reg::B), 0x01);
    assert_eq!(h.cpu().reg(Reg::F), 0x10);
    assert_eq!(h.cpu().next_non_idle_cycle(), 1 + 2 + 2);

    // XOR A ; RLA ; RL A ; LD C,0x01 ; RR C
    let mut h = Harness::new(&[0xAF, 0x17, 0xCB, 0x17, 0x0E, 0x01, 0xCB, 0x19]);
    h.run_until(2);
    // RLA never sets Z, RL A does.
    assert_eq!(h.cpu().reg(Reg::A), 0x00);
    assert_eq!(h.cpu().reg(Reg::F), 0x00);
    h.run_until(3);
    assert_eq!(h.cpu().reg(Reg::F), 0x80);
    h.run_until(1 + 1 + 2 + 2 + 1);
    assert_eq!(h.cpu().reg(Reg::C), 0x00);
    assert_eq!(h.cpu().reg(Reg::F), 0x90);
}

#[test]
fn swap_and_shifts_on_registers() {
    // LD D,0xF0 ; SWAP D ; LD E,0x81 ; SRA E ; SRL E
    let mut h = Harness::new(&[0x16, 0xF0, 0xCB, 0x32, 0x1E, 0x81, 0xCB, 0x2B, 0xCB, 0x3B]);
    h.run_until(2 + 1);
    assert_eq!(h.cpu().reg(Reg::D), 0x0F);
    assert_eq!(h.cpu().reg(Reg::F), 0x00);

    h.run_until(2 + 2 + 2 + 1);
    assert_eq!(h.cpu().reg(Reg::E), 0xC0);
    assert_eq!(h.cpu().reg(Reg::F), 0x10);

    h.run_until(2 + 2 + 2 + 2 + 1);
    assert_eq!(h.cpu().reg(Reg::E), 0x60);
    assert_eq!(h.cpu().reg(Reg::F), 0x00);
    assert_eq!(h.cpu().next_non_idle_cycle(), 10);
}

#[test]
fn read_modify_write_through_hl() {
    // LD HL,0xC000 ; LD (HL),0xFF ; SCF ; INC (HL) ; DEC (HL) ; SWAP (HL)
    // RES 7,(HL) ; SRL (HL) ; RL (HL)
    let mut h = Harness::new(&[
        0x21, 0x00, 0xC0, 0x36, 0xFF, 0x37, 0x34, 0x35, 0xCB, 0x36, 0xCB, 0xBE, 0xCB, 0x3E,
        0xCB, 0x16,
    ]);

    h.run_until(8);
    assert_eq!(h.mem(0xC000), 0x00);
    assert_eq!(h.cpu().reg(Reg::F), 0xB0);
    assert_eq!(h.cpu().next_non_idle_cycle(), 10);

    h.run_until(11);
    assert_eq!(h.mem(0xC000), 0xFF);
    assert_eq!(h.cpu().reg(Reg::F), 0x70);
    assert_eq!(h.cpu().next_non_idle_cycle(), 13);

    h.run_until(14);
    assert_eq!(h.mem(0xC000), 0xFF);
    assert_eq!(h.cpu().reg(Reg::F), 0x00);
    assert_eq!(h.cpu().next_non_idle_cycle(), 17);

    h.run_until(18);
    assert_eq!(h.mem(0xC000), 0x7F);
    assert_eq!(h.cpu().reg(Reg::F), 0x00);

    h.run_until(22);
    assert_eq!(h.mem(0xC000), 0x3F);
    assert_eq!(h.cpu().reg(Reg::F), 0x10);

    h.run_until(26);
    assert_eq!(h.mem(0xC000), 0x7F);
    assert_eq!(h.cpu().reg(Reg::F), 0x00);
    assert_eq!(h.cpu().next_non_idle_cycle(), 29);
}

#[test]
fn conditional_call_and_return() {
    // LD SP,0xD000 ; XOR A ; CALL NZ,0x0020 ; CALL Z,0x0020
    // 0x0020: RET NZ ; RET Z
    let mut program = vec![0x31, 0x00, 0xD0, 0xAF, 0xC4, 0x20, 0x00, 0xCC, 0x20, 0x00];
    program.resize(0x20, 0x00);
    program.extend([0xC0, 0xC8]);
    let mut h = Harness::new(&program);

    h.run_until(5);
    assert_eq!(h.cpu().pc(), 0x0007);
    assert_eq!(h.cpu().sp(), 0xD000);
    assert_eq!(h.cpu().next_non_idle_cycle(), 7);

    h.run_until(8);
    assert_eq!(h.cpu().pc(), 0x0020);
    assert_eq!(h.cpu().sp(), 0xCFFE);
    assert_eq!(h.mem(0xCFFE), 0x0A);
    assert_eq!(h.cpu().next_non_idle_cycle(), 13);

    h.run_until(14);
    assert_eq!(h.cpu().pc(), 0x0021);
    assert_eq!(h.cpu().next_non_idle_cycle(), 15);

    h.run_until(16);
    assert_eq!(h.cpu().pc(), 0x000A);
    assert_eq!(h.cpu().sp(), 0xD000);
    assert_eq!(h.cpu().next_non_idle_cycle(), 20);
}
