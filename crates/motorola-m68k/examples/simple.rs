//! Minimal host: vector table, a short program, one timeslice.
//!
//! Run with `cargo run -p motorola-m68k --example simple`.

use emu_core::{Bus, SimpleBus};
use motorola_m68k::{Cpu68k, CpuType, Register};

fn main() {
    let mut bus = SimpleBus::new();

    // Reset vectors: stack at 0x1000, program at 0x400
    bus.write32(0, 0x0000_1000);
    bus.write32(4, 0x0000_0400);

    // A tiny program:
    //   MOVEQ #42, D0
    //   ADDQ.L #1, D0
    //   MOVE.L D0, $2000.L
    //   BRA *          (spin)
    bus.write16(0x400, 0x702A);
    bus.write16(0x402, 0x5280);
    bus.write16(0x404, 0x23C0);
    bus.write32(0x406, 0x0000_2000);
    bus.write16(0x40A, 0x60FE);

    let mut cpu = Cpu68k::new(CpuType::M68000);
    cpu.reset(&mut bus);
    println!("{} reset: PC={:08X} SP={:08X} SR={:04X}",
        cpu.cpu_type(), cpu.get_pc(), cpu.get_sp(), cpu.get_sr());

    let cycles = cpu.execute(&mut bus, 1000);
    println!("executed {cycles} cycles, PC={:08X}", cpu.get_pc());
    println!("D0 = {}", cpu.get_register(Register::D0));
    println!("mem[$2000] = {}", bus.read32(0x2000));
}
