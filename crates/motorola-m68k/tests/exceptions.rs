//! Exception, interrupt, and privilege tests.
//!
//! The vector table lives at 0; handlers are parked at distinct addresses
//! so the tests can tell which vector was taken.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use emu_core::{Bus, SimpleBus};
use motorola_m68k::{Cpu68k, CpuType, Hooks, Register, SPURIOUS};

const STACK: u32 = 0x1000;
const ORIGIN: u32 = 0x400;

fn setup_with(cpu_type: CpuType, words: &[u16]) -> (Cpu68k, SimpleBus) {
    let mut bus = SimpleBus::with_size(0x10_0000);
    bus.write32(0, STACK);
    bus.write32(4, ORIGIN);
    for (i, &word) in words.iter().enumerate() {
        bus.write16(ORIGIN + i as u32 * 2, word);
    }
    let mut cpu = Cpu68k::new(cpu_type);
    cpu.reset(&mut bus);
    (cpu, bus)
}

fn setup(words: &[u16]) -> (Cpu68k, SimpleBus) {
    setup_with(CpuType::M68000, words)
}

fn set_vector(bus: &mut SimpleBus, vector: u32, handler: u32) {
    bus.write32(vector * 4, handler);
}

// === Interrupts ===

#[test]
fn autovectored_interrupt_builds_frame_and_vectors() {
    // Mask 2, level 3 asserted: autovector 0x18 + 3 at 0x6C
    let (mut cpu, mut bus) = setup(&[0x4E71, 0x4E71]);
    set_vector(&mut bus, 0x1B, 0x2000);
    cpu.set_sr(0x2200);
    cpu.set_irq(3);

    cpu.execute(&mut bus, 1);

    assert_eq!(cpu.regs.pc, 0x2000);
    assert_eq!(cpu.get_sr() & 0x0700, 0x0300, "mask raised to 3");
    assert_ne!(cpu.get_sr() & 0x2000, 0, "supervisor forced");
    // Frame: SR at the top, PC above it
    assert_eq!(cpu.regs.a[7], STACK - 6);
    assert_eq!(bus.read16(STACK - 6), 0x2200);
    assert_eq!(bus.read32(STACK - 4), ORIGIN);
}

#[test]
fn masked_interrupt_is_deferred() {
    let (mut cpu, mut bus) = setup(&[0x4E71]);
    cpu.set_sr(0x2500); // mask 5
    cpu.set_irq(3);
    cpu.execute(&mut bus, 1);
    assert_eq!(cpu.regs.pc, ORIGIN + 2, "level 3 <= mask 5 stays pending");
}

#[test]
fn level_seven_ignores_the_mask() {
    let (mut cpu, mut bus) = setup(&[0x4E71]);
    set_vector(&mut bus, 0x1F, 0x2000);
    cpu.set_sr(0x2700);
    cpu.set_irq(7);
    cpu.execute(&mut bus, 1);
    assert_eq!(cpu.regs.pc, 0x2000);
}

#[test]
fn interrupt_ack_supplies_the_vector() {
    struct Ack(Arc<AtomicU32>);
    impl Hooks for Ack {
        fn interrupt_ack(&mut self, level: u8) -> u32 {
            self.0.store(u32::from(level), Ordering::SeqCst);
            0x40
        }
    }

    let seen = Arc::new(AtomicU32::new(0));
    let (mut cpu, mut bus) = setup(&[0x4E71]);
    set_vector(&mut bus, 0x40, 0x3000);
    cpu.set_hooks(Box::new(Ack(seen.clone())));
    cpu.set_sr(0x2000);
    cpu.set_irq(5);

    cpu.execute(&mut bus, 1);

    assert_eq!(seen.load(Ordering::SeqCst), 5);
    assert_eq!(cpu.regs.pc, 0x3000);
}

#[test]
fn spurious_interrupt_uses_vector_24() {
    struct Spurious;
    impl Hooks for Spurious {
        fn interrupt_ack(&mut self, _level: u8) -> u32 {
            SPURIOUS
        }
    }

    let (mut cpu, mut bus) = setup(&[0x4E71]);
    set_vector(&mut bus, 0x18, 0x3000);
    cpu.set_hooks(Box::new(Spurious));
    cpu.set_sr(0x2000);
    cpu.set_irq(2);
    cpu.execute(&mut bus, 1);
    assert_eq!(cpu.regs.pc, 0x3000);
}

#[test]
fn default_hooks_autovector() {
    let (mut cpu, mut bus) = setup(&[0x4E71]);
    set_vector(&mut bus, 0x19, 0x2000);
    cpu.set_sr(0x2000);
    cpu.set_irq(1);
    cpu.execute(&mut bus, 1);
    assert_eq!(cpu.regs.pc, 0x2000);
}

#[test]
fn virq_latches_track_the_highest_line() {
    let mut cpu = Cpu68k::new(CpuType::M68000);
    cpu.set_virq(3, true);
    cpu.set_virq(5, true);
    cpu.set_virq(2, true);
    assert_eq!(cpu.irq_level(), 5);
    assert!(cpu.get_virq(5));

    cpu.set_virq(5, false);
    assert_eq!(cpu.irq_level(), 3);

    cpu.set_virq(3, false);
    cpu.set_virq(2, false);
    assert_eq!(cpu.irq_level(), 0);
}

#[test]
fn stop_waits_for_an_enabled_interrupt() {
    // STOP #$2000 (mask 0), then a NOP the interrupt handler returns past
    let (mut cpu, mut bus) = setup(&[0x4E72, 0x2000]);
    set_vector(&mut bus, 0x19, 0x2000);

    cpu.execute(&mut bus, 100);
    assert!(cpu.is_stopped());
    assert_eq!(cpu.regs.pc, ORIGIN + 4);

    // Still stopped with nothing pending
    assert_eq!(cpu.execute(&mut bus, 100), 0);

    cpu.set_irq(1);
    cpu.execute(&mut bus, 1);
    assert!(!cpu.is_stopped());
    assert_eq!(cpu.regs.pc, 0x2000);
}

// === Synchronous exceptions ===

#[test]
fn trap_vectors_through_its_slot() {
    // TRAP #5 -> vector 32 + 5 at 0x94
    let (mut cpu, mut bus) = setup(&[0x4E45]);
    set_vector(&mut bus, 37, 0x2000);
    cpu.execute(&mut bus, 1);
    assert_eq!(cpu.regs.pc, 0x2000);
    // Return address is past the TRAP
    assert_eq!(bus.read32(STACK - 4), ORIGIN + 2);
}

#[test]
fn trap_and_rte_resume() {
    // TRAP #0; NOP — handler at 0x2000 is just RTE
    let (mut cpu, mut bus) = setup(&[0x4E40, 0x4E71]);
    set_vector(&mut bus, 32, 0x2000);
    bus.write16(0x2000, 0x4E73);

    cpu.execute(&mut bus, 1); // TRAP
    assert_eq!(cpu.regs.pc, 0x2000);
    cpu.execute(&mut bus, 1); // RTE
    assert_eq!(cpu.regs.pc, ORIGIN + 2);
    assert_eq!(cpu.regs.a[7], STACK);
}

#[test]
fn zero_divide_traps() {
    // DIVU D1, D0 with D1 = 0
    let (mut cpu, mut bus) = setup(&[0x80C1]);
    set_vector(&mut bus, 5, 0x2000);
    cpu.regs.d[0] = 100;
    cpu.execute(&mut bus, 1);
    assert_eq!(cpu.regs.pc, 0x2000);
}

#[test]
fn chk_out_of_range_traps() {
    // CHK D1, D0 with D0 negative
    let (mut cpu, mut bus) = setup(&[0x4181]);
    set_vector(&mut bus, 6, 0x2000);
    cpu.regs.d[0] = 0x8000;
    cpu.regs.d[1] = 10;
    cpu.execute(&mut bus, 1);
    assert_eq!(cpu.regs.pc, 0x2000);
}

#[test]
fn trapv_fires_only_with_v() {
    // TRAPV; TRAPV with V set in between
    let (mut cpu, mut bus) = setup(&[0x4E76, 0x4E76]);
    set_vector(&mut bus, 7, 0x2000);
    cpu.execute(&mut bus, 1);
    assert_eq!(cpu.regs.pc, ORIGIN + 2, "V clear, no trap");

    cpu.set_sr(cpu.get_sr() | 0x0002);
    cpu.execute(&mut bus, 1);
    assert_eq!(cpu.regs.pc, 0x2000);
}

#[test]
fn illegal_opcode_raises_vector_4() {
    // 0x4AFC is the designated ILLEGAL pattern
    let (mut cpu, mut bus) = setup(&[0x4AFC]);
    set_vector(&mut bus, 4, 0x2000);
    cpu.execute(&mut bus, 1);
    assert_eq!(cpu.regs.pc, 0x2000);
    // Group 1: the pushed PC is the faulting instruction itself
    assert_eq!(bus.read32(STACK - 4), ORIGIN);
}

#[test]
fn illegal_hook_can_rescue() {
    struct Rescue(Arc<AtomicU32>);
    impl Hooks for Rescue {
        fn illegal_instruction(&mut self, opcode: u16) -> bool {
            self.0.store(u32::from(opcode), Ordering::SeqCst);
            true
        }
    }

    let seen = Arc::new(AtomicU32::new(0));
    // An unallocated group-4 encoding, then a NOP
    let (mut cpu, mut bus) = setup(&[0x4E00, 0x4E71]);
    cpu.set_hooks(Box::new(Rescue(seen.clone())));
    cpu.execute(&mut bus, 8);
    assert_eq!(seen.load(Ordering::SeqCst), 0x4E00);
    assert_eq!(cpu.regs.pc, ORIGIN + 4, "execution continued past the NOP");
}

#[test]
fn line_a_and_line_f_trap() {
    let (mut cpu, mut bus) = setup(&[0xA000]);
    set_vector(&mut bus, 10, 0x2000);
    set_vector(&mut bus, 11, 0x3000);
    cpu.execute(&mut bus, 1);
    assert_eq!(cpu.regs.pc, 0x2000);

    let (mut cpu, mut bus) = setup(&[0xF000]);
    set_vector(&mut bus, 10, 0x2000);
    set_vector(&mut bus, 11, 0x3000);
    cpu.execute(&mut bus, 1);
    assert_eq!(cpu.regs.pc, 0x3000);
}

// === Privilege ===

#[test]
fn move_to_sr_in_user_mode_violates() {
    // Drop to user mode, then MOVE D0, SR
    let (mut cpu, mut bus) = setup(&[0x46C0]);
    set_vector(&mut bus, 8, 0x2000);
    cpu.set_register(Register::Usp, 0x800);
    cpu.set_sr(0x0000);
    cpu.execute(&mut bus, 1);
    assert_eq!(cpu.regs.pc, 0x2000);
    assert_ne!(cpu.get_sr() & 0x2000, 0, "handler runs in supervisor mode");
    // The frame went to the supervisor stack
    assert_eq!(cpu.regs.a[7], STACK - 6);
}

#[test]
fn sr_write_swaps_stack_banks() {
    let (mut cpu, _bus) = setup(&[0x4E71]);
    // Supervisor A7 from the reset vector
    assert_eq!(cpu.regs.a[7], STACK);
    cpu.set_register(Register::Usp, 0x800);

    // Drop to user mode: A7 becomes the user bank
    cpu.set_sr(0x0000);
    assert_eq!(cpu.regs.a[7], 0x800);
    assert_eq!(cpu.get_register(Register::Isp), STACK);

    // Push something user-side, then return to supervisor
    cpu.regs.a[7] = 0x7F8;
    cpu.set_sr(0x2700);
    assert_eq!(cpu.regs.a[7], STACK, "supervisor bank restored");
    assert_eq!(cpu.get_register(Register::Usp), 0x7F8, "user bank preserved");
}

#[test]
fn sp_reads_the_active_bank() {
    let (mut cpu, _bus) = setup(&[0x4E71]);
    cpu.set_register(Register::Usp, 0x800);
    assert_eq!(cpu.get_register(Register::Sp), STACK);
    cpu.set_sr(0x0000);
    assert_eq!(cpu.get_register(Register::Sp), 0x800);
}

#[test]
fn move_from_sr_privileged_on_68010() {
    let (mut cpu, mut bus) = setup_with(CpuType::M68010, &[0x40C0]);
    set_vector(&mut bus, 8, 0x2000);
    cpu.set_register(Register::Usp, 0x800);
    cpu.set_sr(0x0000);
    cpu.execute(&mut bus, 1);
    assert_eq!(cpu.regs.pc, 0x2000);
}

// === 68010+ frames ===

#[test]
fn frame_word_pushed_and_popped_on_68010() {
    // TRAP #0 on a 68010 pushes a format/offset word; RTE pops it
    let (mut cpu, mut bus) = setup_with(CpuType::M68010, &[0x4E40, 0x4E71]);
    set_vector(&mut bus, 32, 0x2000);
    bus.write16(0x2000, 0x4E73);

    cpu.execute(&mut bus, 1);
    assert_eq!(cpu.regs.a[7], STACK - 8, "8-byte format-0 frame");
    assert_eq!(bus.read16(STACK - 2), 32 * 4, "vector offset word");

    cpu.execute(&mut bus, 1); // RTE
    assert_eq!(cpu.regs.pc, ORIGIN + 2);
    assert_eq!(cpu.regs.a[7], STACK);
}

#[test]
fn vbr_relocates_the_vector_table_on_68010() {
    let (mut cpu, mut bus) = setup_with(CpuType::M68010, &[0x4E40]);
    cpu.set_register(Register::Vbr, 0x8000);
    bus.write32(0x8000 + 32 * 4, 0x2000);
    cpu.execute(&mut bus, 1);
    assert_eq!(cpu.regs.pc, 0x2000);
}

#[test]
fn bkpt_acknowledges_then_traps_on_68010() {
    struct Bkpt(Arc<AtomicU32>);
    impl Hooks for Bkpt {
        fn breakpoint_ack(&mut self, data: u32) {
            self.0.store(data + 1, Ordering::SeqCst);
        }
    }

    let seen = Arc::new(AtomicU32::new(0));
    let (mut cpu, mut bus) = setup_with(CpuType::M68010, &[0x484A]);
    set_vector(&mut bus, 4, 0x2000);
    cpu.set_hooks(Box::new(Bkpt(seen.clone())));
    cpu.execute(&mut bus, 1);
    assert_eq!(seen.load(Ordering::SeqCst), 3, "BKPT #2 acknowledged");
    assert_eq!(cpu.regs.pc, 0x2000);
}

// === Address errors and bus errors ===

#[test]
fn odd_word_access_raises_address_error() {
    // MOVE.W (A0), D0 with A0 odd
    let (mut cpu, mut bus) = setup(&[0x3010]);
    set_vector(&mut bus, 3, 0x2000);
    cpu.regs.a[0] = 0x2001;
    cpu.execute(&mut bus, 1);
    assert_eq!(cpu.regs.pc, 0x2000);
    // Group-0 frame carries the fault address below IR/SR/PC
    assert_eq!(cpu.regs.a[7], STACK - 14);
    assert_eq!(bus.read32(STACK - 12), 0x2001);
}

#[test]
fn alignment_check_can_be_disabled() {
    let (mut cpu, mut bus) = setup(&[0x3010, 0x4E71]);
    cpu.set_strict_alignment(false);
    cpu.regs.a[0] = 0x2001;
    cpu.execute(&mut bus, 1);
    assert_eq!(cpu.regs.pc, ORIGIN + 2, "odd access tolerated");
}

#[test]
fn no_address_error_on_68020() {
    let (mut cpu, mut bus) = setup_with(CpuType::M68020, &[0x3010]);
    cpu.regs.a[0] = 0x2001;
    cpu.execute(&mut bus, 1);
    assert_eq!(cpu.regs.pc, ORIGIN + 2);
}

#[test]
fn pulsed_bus_error_is_serviced_at_the_boundary() {
    let (mut cpu, mut bus) = setup(&[0x4E71, 0x4E71]);
    set_vector(&mut bus, 2, 0x2000);
    cpu.pulse_bus_error();
    cpu.execute(&mut bus, 1);
    assert_eq!(cpu.regs.pc, 0x2000);
}

// === Trace ===

#[test]
fn trace_fires_after_each_instruction() {
    // NOP with T set traces into the handler
    let (mut cpu, mut bus) = setup(&[0x4E71]);
    set_vector(&mut bus, 9, 0x2000);
    cpu.set_sr(0xA700);
    cpu.execute(&mut bus, 1);
    assert_eq!(cpu.regs.pc, 0x2000);
    assert_eq!(cpu.get_sr() & 0x8000, 0, "exception entry clears T");
    // The frame resumes after the traced instruction
    assert_eq!(bus.read32(STACK - 4), ORIGIN + 2);
}

// === Halt ===

#[test]
fn pulse_halt_stops_the_loop() {
    let (mut cpu, mut bus) = setup(&[0x4E71, 0x4E71]);
    cpu.pulse_halt();
    assert_eq!(cpu.execute(&mut bus, 100), 0);
    assert!(cpu.is_halted());
    assert_eq!(cpu.regs.pc, ORIGIN);
}

// === Hook surfaces ===

#[test]
fn instruction_hook_sees_every_pc() {
    struct Trace(Arc<AtomicU32>);
    impl Hooks for Trace {
        fn instruction_hook(&mut self, _pc: u32) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    let count = Arc::new(AtomicU32::new(0));
    let (mut cpu, mut bus) = setup(&[0x4E71, 0x4E71, 0x4E71]);
    cpu.set_hooks(Box::new(Trace(count.clone())));
    cpu.execute(&mut bus, 12);
    assert_eq!(count.load(Ordering::SeqCst), 3);
}

#[test]
fn reset_instruction_pulses_the_hook() {
    struct ResetLine(Arc<AtomicU32>);
    impl Hooks for ResetLine {
        fn reset_instruction(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    let pulses = Arc::new(AtomicU32::new(0));
    let (mut cpu, mut bus) = setup(&[0x4E70]);
    cpu.set_hooks(Box::new(ResetLine(pulses.clone())));
    cpu.execute(&mut bus, 1);
    assert_eq!(pulses.load(Ordering::SeqCst), 1);
    assert_eq!(cpu.regs.pc, ORIGIN + 2, "RESET does not reset the CPU itself");
}

#[test]
fn tas_hook_overrides_the_written_byte() {
    struct Arbiter;
    impl Hooks for Arbiter {
        fn tas(&mut self) -> i32 {
            0x55
        }
    }

    let (mut cpu, mut bus) = setup(&[0x4AD0]);
    cpu.set_hooks(Box::new(Arbiter));
    cpu.regs.a[0] = 0x2000;
    bus.write8(0x2000, 0x00);
    cpu.execute(&mut bus, 1);
    assert_eq!(bus.peek(0x2000), 0x55);
}
