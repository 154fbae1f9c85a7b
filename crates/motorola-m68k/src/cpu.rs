//! The CPU aggregate and its bounded execution loop.
//!
//! One [`Cpu68k`] owns all architectural state; memory is reached through
//! the [`Bus`] the host passes into [`reset`](Cpu68k::reset) and
//! [`execute`](Cpu68k::execute). `execute` runs whole instructions until
//! the cycle budget is spent, the CPU stops or halts, or a callback ends
//! the timeslice.
//!
//! Instances are independent: nothing is shared between CPUs, so separate
//! instances may run on separate threads against their own buses.

use std::fmt;

use emu_core::{Bus, Observable, Value};

use crate::alu::Size;
use crate::exceptions::{Exception, Exec};
use crate::flags::{C, M, N, S, V, X, Z};
use crate::hooks::{Hooks, NoHooks};
use crate::model::CpuType;
use crate::registers::{Register, Registers};

/// User data function code.
pub const FC_USER_DATA: u8 = 1;
/// User program function code.
pub const FC_USER_PROGRAM: u8 = 2;
/// Supervisor data function code.
pub const FC_SUPERVISOR_DATA: u8 = 5;
/// Supervisor program function code.
pub const FC_SUPERVISOR_PROGRAM: u8 = 6;

/// A Motorola 68000-family CPU.
pub struct Cpu68k {
    /// Architectural registers. Public for test and debugger access.
    pub regs: Registers,
    cpu_type: CpuType,
    stopped: bool,
    halted: bool,
    cycles_run: i32,
    cycles_remain: i32,
    irq_level: u8,
    virq: u8,
    pending_bus_error: bool,
    strict_alignment: bool,
    fc: u8,
    hooks: Box<dyn Hooks>,
}

/// A full snapshot of the architectural state.
///
/// `set_context(get_context())` is a no-op; two contexts compare equal
/// field-for-field exactly when the architectural states match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    /// CPU variant.
    pub cpu_type: CpuType,
    /// Data registers.
    pub d: [u32; 8],
    /// Address registers (A7 = active stack pointer).
    pub a: [u32; 8],
    /// Program counter.
    pub pc: u32,
    /// Status register.
    pub sr: u16,
    /// User stack pointer bank.
    pub usp: u32,
    /// Interrupt stack pointer bank.
    pub isp: u32,
    /// Master stack pointer bank.
    pub msp: u32,
    /// Source function code.
    pub sfc: u8,
    /// Destination function code.
    pub dfc: u8,
    /// Vector base register.
    pub vbr: u32,
    /// Cache control register.
    pub cacr: u32,
    /// Cache address register.
    pub caar: u32,
}

impl Cpu68k {
    /// Create a CPU of the given variant in the pre-reset state.
    #[must_use]
    pub fn new(cpu_type: CpuType) -> Self {
        Self {
            regs: Registers::new(),
            cpu_type,
            stopped: false,
            halted: false,
            cycles_run: 0,
            cycles_remain: 0,
            irq_level: 0,
            virq: 0,
            pending_bus_error: false,
            strict_alignment: true,
            fc: 0,
            hooks: Box::new(NoHooks),
        }
    }

    /// The emulated variant.
    #[must_use]
    pub const fn cpu_type(&self) -> CpuType {
        self.cpu_type
    }

    /// Change the emulated variant.
    pub fn set_cpu_type(&mut self, cpu_type: CpuType) {
        self.cpu_type = cpu_type;
    }

    /// Install host callbacks, replacing the previous set.
    pub fn set_hooks(&mut self, hooks: Box<dyn Hooks>) {
        self.hooks = hooks;
    }

    /// Gate the 68000/68010 address-error check for misaligned word and
    /// long accesses. Strict (the hardware behavior) by default; turning it
    /// off reproduces emulators that silently allow odd addresses.
    pub fn set_strict_alignment(&mut self, strict: bool) {
        self.strict_alignment = strict;
    }

    // === Reset and execution ===

    /// Pulse the RESET pin: reinitialise state and load SSP/PC from the
    /// vector table at address 0.
    pub fn reset<B: Bus>(&mut self, bus: &mut B) {
        self.regs = Registers::new();
        self.stopped = false;
        self.halted = false;
        self.cycles_run = 0;
        self.cycles_remain = 0;
        self.irq_level = 0;
        self.virq = 0;
        self.pending_bus_error = false;
        self.fc = 0;
        self.set_fc(FC_SUPERVISOR_PROGRAM);

        let ssp = bus.read32(0);
        self.regs.a[7] = ssp;
        self.regs.isp = ssp;
        self.regs.pc = bus.read32(4);
        self.regs.ppc = self.regs.pc;
    }

    /// Run instructions until `cycles` have been consumed (or the CPU
    /// stops, halts, or a callback ends the timeslice).
    ///
    /// Returns the number of cycles actually consumed, which may exceed the
    /// budget by the tail of the final instruction.
    pub fn execute<B: Bus>(&mut self, bus: &mut B, cycles: i32) -> i32 {
        self.cycles_remain = cycles;
        self.cycles_run = 0;

        while self.cycles_remain > 0 && !self.halted {
            if self.pending_bus_error {
                self.pending_bus_error = false;
                let fault = Exception::BusError {
                    address: self.regs.pc,
                    read: true,
                };
                self.process_exception(bus, &fault);
                continue;
            }

            self.service_interrupts(bus);
            if self.stopped {
                break;
            }

            self.hooks.instruction_hook(self.regs.pc);
            self.regs.ppc = self.regs.pc;
            let trace = self.regs.is_trace();

            match self.step(bus) {
                Ok(()) => {
                    if trace && !self.stopped && !self.halted {
                        self.process_exception(bus, &Exception::Trace);
                    }
                }
                Err(fault) => self.process_exception(bus, &fault),
            }
        }

        self.cycles_run
    }

    /// Fetch and execute one instruction.
    fn step<B: Bus>(&mut self, bus: &mut B) -> Exec {
        let opcode = self.fetch_word(bus)?;
        self.regs.ir = opcode;
        self.decode_and_execute(bus, opcode)
    }

    // === Timeslice accounting ===

    /// Consume cycles from the current timeslice.
    pub(crate) fn use_cycles(&mut self, cycles: i32) {
        self.cycles_run += cycles;
        self.cycles_remain -= cycles;
    }

    /// Cycles consumed so far in the current timeslice.
    #[must_use]
    pub const fn cycles_run(&self) -> i32 {
        self.cycles_run
    }

    /// Cycles left in the current timeslice.
    #[must_use]
    pub const fn cycles_remaining(&self) -> i32 {
        self.cycles_remain
    }

    /// Adjust the remaining budget mid-execution (callable from hooks).
    pub fn modify_timeslice(&mut self, cycles: i32) {
        self.cycles_remain += cycles;
    }

    /// Force the execution loop to exit at the next instruction boundary.
    pub fn end_timeslice(&mut self) {
        self.cycles_remain = 0;
    }

    // === Interrupt and halt lines ===

    /// Assert an interrupt level (0-7, 0 = none, 7 = non-maskable).
    /// Out-of-range levels deassert.
    pub fn set_irq(&mut self, level: u8) {
        self.irq_level = if level <= 7 { level } else { 0 };
    }

    /// Asserted interrupt level.
    #[must_use]
    pub const fn irq_level(&self) -> u8 {
        self.irq_level
    }

    /// Latch a virtual IRQ line (1-7). The asserted level becomes the
    /// highest active line before this call returns.
    pub fn set_virq(&mut self, level: u8, active: bool) {
        if !(1..=7).contains(&level) {
            return;
        }
        if active {
            self.virq |= 1 << level;
        } else {
            self.virq &= !(1 << level);
        }
        self.irq_level = if self.virq == 0 {
            0
        } else {
            7 - self.virq.leading_zeros() as u8
        };
    }

    /// Read back a virtual IRQ line (1-7).
    #[must_use]
    pub fn get_virq(&self, level: u8) -> bool {
        (1..=7).contains(&level) && self.virq & (1 << level) != 0
    }

    /// Pulse the HALT pin: execution stops until the next reset.
    pub fn pulse_halt(&mut self) {
        self.halted = true;
    }

    /// Latch a bus error, serviced at the next instruction boundary.
    pub fn pulse_bus_error(&mut self) {
        self.pending_bus_error = true;
    }

    /// The CPU executed STOP and is waiting for an enabled interrupt.
    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// The CPU is halted (HALT pin or double fault).
    #[must_use]
    pub const fn is_halted(&self) -> bool {
        self.halted
    }

    pub(crate) fn set_stopped(&mut self, stopped: bool) {
        self.stopped = stopped;
    }

    pub(crate) fn set_halted(&mut self) {
        self.halted = true;
    }

    pub(crate) fn hooks(&mut self) -> &mut dyn Hooks {
        &mut *self.hooks
    }

    // === Register control surface ===

    /// Read a register by symbolic identifier.
    #[must_use]
    pub fn get_register(&self, reg: Register) -> u32 {
        match reg {
            Register::D0 => self.regs.d[0],
            Register::D1 => self.regs.d[1],
            Register::D2 => self.regs.d[2],
            Register::D3 => self.regs.d[3],
            Register::D4 => self.regs.d[4],
            Register::D5 => self.regs.d[5],
            Register::D6 => self.regs.d[6],
            Register::D7 => self.regs.d[7],
            Register::A0 => self.regs.a[0],
            Register::A1 => self.regs.a[1],
            Register::A2 => self.regs.a[2],
            Register::A3 => self.regs.a[3],
            Register::A4 => self.regs.a[4],
            Register::A5 => self.regs.a[5],
            Register::A6 => self.regs.a[6],
            Register::A7 => self.regs.a[7],
            Register::Pc => self.regs.pc,
            Register::Sr => u32::from(self.regs.sr),
            Register::Sp => self.get_sp(),
            Register::Usp => {
                if self.regs.is_supervisor() {
                    self.regs.usp
                } else {
                    self.regs.a[7]
                }
            }
            Register::Isp => {
                if self.regs.is_supervisor() && !self.master_selected() {
                    self.regs.a[7]
                } else {
                    self.regs.isp
                }
            }
            Register::Msp => {
                if self.regs.is_supervisor() && self.master_selected() {
                    self.regs.a[7]
                } else {
                    self.regs.msp
                }
            }
            Register::Sfc => u32::from(self.regs.sfc),
            Register::Dfc => u32::from(self.regs.dfc),
            Register::Vbr => self.regs.vbr,
            Register::Cacr => self.regs.cacr,
            Register::Caar => self.regs.caar,
            Register::Ppc => self.regs.ppc,
            Register::Ir => u32::from(self.regs.ir),
            Register::CpuType => self.cpu_type as u32,
        }
    }

    /// Write a register by symbolic identifier.
    ///
    /// SR writes mask reserved bits and switch stack banks; the CPU type is
    /// read-only through this surface.
    pub fn set_register(&mut self, reg: Register, value: u32) {
        match reg {
            Register::D0 => self.regs.d[0] = value,
            Register::D1 => self.regs.d[1] = value,
            Register::D2 => self.regs.d[2] = value,
            Register::D3 => self.regs.d[3] = value,
            Register::D4 => self.regs.d[4] = value,
            Register::D5 => self.regs.d[5] = value,
            Register::D6 => self.regs.d[6] = value,
            Register::D7 => self.regs.d[7] = value,
            Register::A0 => self.regs.a[0] = value,
            Register::A1 => self.regs.a[1] = value,
            Register::A2 => self.regs.a[2] = value,
            Register::A3 => self.regs.a[3] = value,
            Register::A4 => self.regs.a[4] = value,
            Register::A5 => self.regs.a[5] = value,
            Register::A6 => self.regs.a[6] = value,
            Register::A7 => self.regs.a[7] = value,
            Register::Pc => self.regs.pc = value,
            Register::Sr => self.set_sr_raw(value as u16),
            Register::Sp => self.set_sp(value),
            Register::Usp => {
                if self.regs.is_supervisor() {
                    self.regs.usp = value;
                } else {
                    self.regs.a[7] = value;
                }
            }
            Register::Isp => {
                if self.regs.is_supervisor() && !self.master_selected() {
                    self.regs.a[7] = value;
                } else {
                    self.regs.isp = value;
                }
            }
            Register::Msp => {
                if self.regs.is_supervisor() && self.master_selected() {
                    self.regs.a[7] = value;
                } else {
                    self.regs.msp = value;
                }
            }
            Register::Sfc => self.regs.sfc = (value & 7) as u8,
            Register::Dfc => self.regs.dfc = (value & 7) as u8,
            Register::Vbr => self.regs.vbr = value,
            Register::Cacr => self.regs.cacr = value,
            Register::Caar => self.regs.caar = value,
            Register::Ppc => self.regs.ppc = value,
            Register::Ir => self.regs.ir = value as u16,
            Register::CpuType => {}
        }
    }

    /// Program counter.
    #[must_use]
    pub const fn get_pc(&self) -> u32 {
        self.regs.pc
    }

    /// Set the program counter, notifying the PC-changed hook.
    pub fn set_pc(&mut self, address: u32) {
        self.regs.pc = address;
        self.hooks.pc_changed(address);
    }

    /// Active stack pointer: A7 in supervisor mode, USP otherwise.
    #[must_use]
    pub const fn get_sp(&self) -> u32 {
        if self.regs.is_supervisor() {
            self.regs.a[7]
        } else {
            self.regs.usp
        }
    }

    /// Set the active stack pointer.
    pub fn set_sp(&mut self, address: u32) {
        if self.regs.is_supervisor() {
            self.regs.a[7] = address;
        } else {
            self.regs.usp = address;
        }
    }

    /// Status register.
    #[must_use]
    pub const fn get_sr(&self) -> u16 {
        self.regs.sr
    }

    /// Set the status register, masking reserved bits and switching stack
    /// banks when S (or M) changes.
    pub fn set_sr(&mut self, value: u16) {
        self.set_sr_raw(value);
    }

    fn master_selected(&self) -> bool {
        self.cpu_type.has_msp() && self.regs.is_master()
    }

    fn active_bank_slot(&mut self, sr: u16) -> &mut u32 {
        if sr & S == 0 {
            &mut self.regs.usp
        } else if self.cpu_type.has_msp() && sr & M != 0 {
            &mut self.regs.msp
        } else {
            &mut self.regs.isp
        }
    }

    /// Replace SR, preserving the outgoing stack bank in its slot and
    /// loading the incoming one into A7.
    pub(crate) fn set_sr_raw(&mut self, value: u16) {
        let value = value & self.cpu_type.sr_mask();
        let old = self.regs.sr;
        if (old ^ value) & (S | M) != 0 {
            let outgoing = self.regs.a[7];
            *self.active_bank_slot(old) = outgoing;
            self.regs.sr = value;
            let incoming = *self.active_bank_slot(value);
            self.regs.a[7] = incoming;
        } else {
            self.regs.sr = value;
        }
    }

    // === Context snapshot ===

    /// Capture the full architectural state.
    #[must_use]
    pub fn get_context(&self) -> Context {
        Context {
            cpu_type: self.cpu_type,
            d: self.regs.d,
            a: self.regs.a,
            pc: self.regs.pc,
            sr: self.regs.sr,
            usp: self.regs.usp,
            isp: self.regs.isp,
            msp: self.regs.msp,
            sfc: self.regs.sfc,
            dfc: self.regs.dfc,
            vbr: self.regs.vbr,
            cacr: self.regs.cacr,
            caar: self.regs.caar,
        }
    }

    /// Restore a previously captured state.
    pub fn set_context(&mut self, ctx: &Context) {
        self.cpu_type = ctx.cpu_type;
        self.regs.d = ctx.d;
        self.regs.a = ctx.a;
        self.regs.pc = ctx.pc;
        self.regs.sr = ctx.sr;
        self.regs.usp = ctx.usp;
        self.regs.isp = ctx.isp;
        self.regs.msp = ctx.msp;
        self.regs.sfc = ctx.sfc;
        self.regs.dfc = ctx.dfc;
        self.regs.vbr = ctx.vbr;
        self.regs.cacr = ctx.cacr;
        self.regs.caar = ctx.caar;
    }

    // === Memory access ===

    fn check_alignment(&self, address: u32, size: Size, read: bool) -> Exec {
        if size != Size::Byte
            && address & 1 != 0
            && self.strict_alignment
            && self.cpu_type.traps_unaligned()
        {
            return Err(Exception::AddressError { address, read });
        }
        Ok(())
    }

    pub(crate) fn set_fc(&mut self, fc: u8) {
        if fc != self.fc {
            self.fc = fc;
            self.hooks.function_code(fc);
        }
    }

    fn data_fc(&self) -> u8 {
        if self.regs.is_supervisor() {
            FC_SUPERVISOR_DATA
        } else {
            FC_USER_DATA
        }
    }

    fn program_fc(&self) -> u8 {
        if self.regs.is_supervisor() {
            FC_SUPERVISOR_PROGRAM
        } else {
            FC_USER_PROGRAM
        }
    }

    /// Read a data operand from memory.
    pub(crate) fn read_mem<B: Bus>(&mut self, bus: &mut B, address: u32, size: Size) -> Exec<u32> {
        self.check_alignment(address, size, true)?;
        self.set_fc(self.data_fc());
        let address = address & self.cpu_type.address_mask();
        Ok(match size {
            Size::Byte => u32::from(bus.read8(address)),
            Size::Word => u32::from(bus.read16(address)),
            Size::Long => bus.read32(address),
        })
    }

    /// Write a data operand to memory.
    pub(crate) fn write_mem<B: Bus>(
        &mut self,
        bus: &mut B,
        address: u32,
        size: Size,
        value: u32,
    ) -> Exec {
        self.check_alignment(address, size, false)?;
        self.set_fc(self.data_fc());
        let address = address & self.cpu_type.address_mask();
        match size {
            Size::Byte => bus.write8(address, value as u8),
            Size::Word => bus.write16(address, value as u16),
            Size::Long => bus.write32(address, value),
        }
        Ok(())
    }

    /// Fetch the next word from the instruction stream.
    pub(crate) fn fetch_word<B: Bus>(&mut self, bus: &mut B) -> Exec<u16> {
        let pc = self.regs.pc;
        self.check_alignment(pc, Size::Word, true)?;
        self.set_fc(self.program_fc());
        let word = bus.read16(pc & self.cpu_type.address_mask());
        self.regs.pc = pc.wrapping_add(2);
        Ok(word)
    }

    /// Fetch the next long from the instruction stream.
    pub(crate) fn fetch_long<B: Bus>(&mut self, bus: &mut B) -> Exec<u32> {
        let hi = self.fetch_word(bus)?;
        let lo = self.fetch_word(bus)?;
        Ok(u32::from(hi) << 16 | u32::from(lo))
    }

    /// Push a word onto the active stack.
    pub(crate) fn push_word<B: Bus>(&mut self, bus: &mut B, value: u16) -> Exec {
        let sp = self.regs.a[7].wrapping_sub(2);
        self.regs.a[7] = sp;
        self.write_mem(bus, sp, Size::Word, u32::from(value))
    }

    /// Push a long onto the active stack.
    pub(crate) fn push_long<B: Bus>(&mut self, bus: &mut B, value: u32) -> Exec {
        let sp = self.regs.a[7].wrapping_sub(4);
        self.regs.a[7] = sp;
        self.write_mem(bus, sp, Size::Long, value)
    }

    /// Pop a word from the active stack.
    pub(crate) fn pop_word<B: Bus>(&mut self, bus: &mut B) -> Exec<u16> {
        let value = self.read_mem(bus, self.regs.a[7], Size::Word)?;
        self.regs.a[7] = self.regs.a[7].wrapping_add(2);
        Ok(value as u16)
    }

    /// Pop a long from the active stack.
    pub(crate) fn pop_long<B: Bus>(&mut self, bus: &mut B) -> Exec<u32> {
        let value = self.read_mem(bus, self.regs.a[7], Size::Long)?;
        self.regs.a[7] = self.regs.a[7].wrapping_add(4);
        Ok(value)
    }

    /// Set the PC through a jump (branch, JMP, return, vector), notifying
    /// the PC-changed hook.
    pub(crate) fn jump(&mut self, address: u32) {
        self.regs.pc = address;
        self.hooks.pc_changed(address);
    }

    // === Register operand helpers ===

    /// Read a data register at the given width.
    pub(crate) fn read_data_reg(&self, reg: u8, size: Size) -> u32 {
        self.regs.d[reg as usize] & size.mask()
    }

    /// Write a data register at the given width, preserving upper bits.
    pub(crate) fn write_data_reg(&mut self, reg: u8, value: u32, size: Size) {
        let slot = &mut self.regs.d[reg as usize];
        *slot = match size {
            Size::Byte => *slot & 0xFFFF_FF00 | value & 0x0000_00FF,
            Size::Word => *slot & 0xFFFF_0000 | value & 0x0000_FFFF,
            Size::Long => value,
        };
    }
}

impl Default for Cpu68k {
    fn default() -> Self {
        Self::new(CpuType::M68000)
    }
}

impl fmt::Debug for Cpu68k {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cpu68k")
            .field("cpu_type", &self.cpu_type)
            .field("regs", &self.regs)
            .field("stopped", &self.stopped)
            .field("halted", &self.halted)
            .field("irq_level", &self.irq_level)
            .field("cycles_run", &self.cycles_run)
            .finish_non_exhaustive()
    }
}

const M68K_QUERY_PATHS: &[&str] = &[
    "d0", "d1", "d2", "d3", "d4", "d5", "d6", "d7",
    "a0", "a1", "a2", "a3", "a4", "a5", "a6", "a7",
    "usp", "isp", "msp",
    "pc", "ppc",
    "sr", "ccr",
    "flags.x", "flags.n", "flags.z", "flags.v", "flags.c",
    "flags.s", "flags.t",
    "int_mask", "irq_level",
    "stopped", "halted", "cycles",
    "opcode",
];

impl Observable for Cpu68k {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "d0" => Some(self.regs.d[0].into()),
            "d1" => Some(self.regs.d[1].into()),
            "d2" => Some(self.regs.d[2].into()),
            "d3" => Some(self.regs.d[3].into()),
            "d4" => Some(self.regs.d[4].into()),
            "d5" => Some(self.regs.d[5].into()),
            "d6" => Some(self.regs.d[6].into()),
            "d7" => Some(self.regs.d[7].into()),
            "a0" => Some(self.regs.a[0].into()),
            "a1" => Some(self.regs.a[1].into()),
            "a2" => Some(self.regs.a[2].into()),
            "a3" => Some(self.regs.a[3].into()),
            "a4" => Some(self.regs.a[4].into()),
            "a5" => Some(self.regs.a[5].into()),
            "a6" => Some(self.regs.a[6].into()),
            "a7" => Some(self.regs.a[7].into()),
            "usp" => Some(self.get_register(Register::Usp).into()),
            "isp" => Some(self.get_register(Register::Isp).into()),
            "msp" => Some(self.get_register(Register::Msp).into()),
            "pc" => Some(self.regs.pc.into()),
            "ppc" => Some(self.regs.ppc.into()),
            "sr" => Some(Value::U16(self.regs.sr)),
            "ccr" => Some(self.regs.ccr().into()),
            "flags.x" => Some((self.regs.sr & X != 0).into()),
            "flags.n" => Some((self.regs.sr & N != 0).into()),
            "flags.z" => Some((self.regs.sr & Z != 0).into()),
            "flags.v" => Some((self.regs.sr & V != 0).into()),
            "flags.c" => Some((self.regs.sr & C != 0).into()),
            "flags.s" => Some(self.regs.is_supervisor().into()),
            "flags.t" => Some(self.regs.is_trace().into()),
            "int_mask" => Some(self.regs.interrupt_mask().into()),
            "irq_level" => Some(self.irq_level.into()),
            "stopped" => Some(self.stopped.into()),
            "halted" => Some(self.halted.into()),
            "cycles" => Some(Value::U64(self.cycles_run.max(0) as u64)),
            "opcode" => Some(Value::U16(self.regs.ir)),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        M68K_QUERY_PATHS
    }
}
