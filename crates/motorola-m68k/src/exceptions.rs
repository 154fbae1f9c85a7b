//! Exception and interrupt sequencing.
//!
//! Faults raised during execution travel up as `Err(Exception)` and are
//! turned into guest-visible stack frames here. Group 1/2 exceptions push
//! SR and PC (plus a format/offset word on 68010+); address and bus errors
//! push the 68000's longer group-0 frame. A fault while building a frame is
//! a double fault and halts the CPU.

use emu_core::Bus;

use crate::alu::Size;
use crate::cpu::Cpu68k;
use crate::flags::{S, T};
use crate::hooks::{AUTOVECTOR, SPURIOUS};

/// Result type for instruction execution: `Err` carries a pending fault.
pub(crate) type Exec<T = ()> = Result<T, Exception>;

/// Vector numbers from the published exception table.
pub(crate) mod vector {
    /// Bus error.
    pub const BUS_ERROR: u8 = 2;
    /// Address error (odd word/long access).
    pub const ADDRESS_ERROR: u8 = 3;
    /// Illegal instruction.
    pub const ILLEGAL: u8 = 4;
    /// Integer divide by zero.
    pub const ZERO_DIVIDE: u8 = 5;
    /// CHK out of bounds.
    pub const CHK: u8 = 6;
    /// TRAPV with V set.
    pub const TRAPV: u8 = 7;
    /// Privilege violation.
    pub const PRIVILEGE: u8 = 8;
    /// Trace.
    pub const TRACE: u8 = 9;
    /// Line 1010 emulator.
    pub const LINE_A: u8 = 10;
    /// Line 1111 emulator.
    pub const LINE_F: u8 = 11;
    /// RTE format error (68010+).
    pub const FORMAT_ERROR: u8 = 14;
    /// Spurious interrupt.
    pub const SPURIOUS_INTERRUPT: u8 = 24;
    /// Base of the autovectored interrupts (level is added).
    pub const AUTOVECTOR_BASE: u8 = 24;
    /// Base of the TRAP #n vectors.
    pub const TRAP_BASE: u8 = 32;
}

/// A pending processor exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Exception {
    /// Unrecognised or explicitly illegal opcode.
    Illegal,
    /// Privileged instruction in user mode.
    Privilege,
    /// Integer division by zero.
    ZeroDivide,
    /// CHK register out of bounds.
    Check,
    /// TRAPV with the overflow flag set.
    Overflow,
    /// TRAP #n.
    Trap(u8),
    /// Trace after an instruction with T set.
    Trace,
    /// Line 1010 opcode.
    LineA,
    /// Line 1111 opcode.
    LineF,
    /// RTE frame with an unsupported format nibble (68010+).
    Format,
    /// Word or long access at an odd address (68000/68010).
    AddressError {
        /// Faulting address.
        address: u32,
        /// Access direction.
        read: bool,
    },
    /// External bus fault.
    BusError {
        /// Faulting address.
        address: u32,
        /// Access direction.
        read: bool,
    },
}

impl Exception {
    /// Vector number for this exception.
    pub(crate) fn vector(self) -> u8 {
        match self {
            Self::Illegal => vector::ILLEGAL,
            Self::Privilege => vector::PRIVILEGE,
            Self::ZeroDivide => vector::ZERO_DIVIDE,
            Self::Check => vector::CHK,
            Self::Overflow => vector::TRAPV,
            Self::Trap(n) => vector::TRAP_BASE + (n & 0x0F),
            Self::Trace => vector::TRACE,
            Self::LineA => vector::LINE_A,
            Self::LineF => vector::LINE_F,
            Self::Format => vector::FORMAT_ERROR,
            Self::AddressError { .. } => vector::ADDRESS_ERROR,
            Self::BusError { .. } => vector::BUS_ERROR,
        }
    }

    /// Published processing time for the exception sequence.
    fn cycles(self) -> i32 {
        match self {
            Self::Illegal | Self::Privilege | Self::LineA | Self::LineF => 34,
            Self::ZeroDivide => 38,
            Self::Check => 40,
            Self::Overflow | Self::Trap(_) | Self::Trace | Self::Format => 34,
            Self::AddressError { .. } | Self::BusError { .. } => 50,
        }
    }

}

impl Cpu68k {
    /// Location of a vector, scaled through VBR on 68010+.
    pub(crate) fn vector_address(&self, vector: u8) -> u32 {
        let offset = u32::from(vector) * 4;
        if self.cpu_type().has_vbr() {
            self.regs.vbr.wrapping_add(offset)
        } else {
            offset
        }
    }

    /// Build the stack frame for a synchronous exception and vector to its
    /// handler.
    pub(crate) fn process_exception<B: Bus>(&mut self, bus: &mut B, fault: &Exception) {
        // Group 1 faults resume at the offending instruction; traps and
        // trace resume after it.
        let return_pc = match fault {
            Exception::Illegal | Exception::Privilege | Exception::LineA | Exception::LineF => {
                self.regs.ppc
            }
            _ => self.regs.pc,
        };

        let result = self.enter_exception(bus, fault.vector(), return_pc, |cpu, bus| {
            if let &Exception::AddressError { address, read } | &Exception::BusError { address, read } =
                fault
            {
                // 68000 group-0 extension: IR, fault address, access info.
                cpu.push_word(bus, cpu.regs.ir)?;
                cpu.push_long(bus, address)?;
                let info = u16::from(read) << 4 | u16::from(cpu.regs.sr & S != 0) << 2 | 0x01;
                cpu.push_word(bus, info)?;
            }
            Ok(())
        });

        if result.is_err() {
            // Double fault: the frame itself could not be written.
            self.set_halted();
            return;
        }

        self.use_cycles(fault.cycles());
    }

    /// Accept a pending interrupt if its level beats the mask.
    pub(crate) fn service_interrupts<B: Bus>(&mut self, bus: &mut B) {
        let level = self.irq_level();
        if level == 0 {
            return;
        }
        if level < 7 && level <= self.regs.interrupt_mask() {
            return;
        }

        let ack = self.hooks().interrupt_ack(level);
        let vector = match ack {
            AUTOVECTOR => vector::AUTOVECTOR_BASE + level,
            SPURIOUS => vector::SPURIOUS_INTERRUPT,
            other => other as u8,
        };

        self.set_stopped(false);
        let return_pc = self.regs.pc;
        let result = self.enter_exception(bus, vector, return_pc, |cpu, _bus| {
            cpu.regs.set_interrupt_mask(level);
            Ok(())
        });
        if result.is_err() {
            self.set_halted();
            return;
        }
        self.use_cycles(44);
    }

    /// Common exception entry: force supervisor, clear trace, push the
    /// frame, and load the new PC from the vector table.
    ///
    /// `fixup` runs after the standard pushes, so interrupts can raise the
    /// mask (the frame holds the pre-exception SR either way) and group-0
    /// faults can extend the frame below SR.
    fn enter_exception<B: Bus>(
        &mut self,
        bus: &mut B,
        vector: u8,
        return_pc: u32,
        fixup: impl FnOnce(&mut Self, &mut B) -> Exec,
    ) -> Exec {
        let old_sr = self.regs.sr;
        self.set_sr_raw(old_sr & !(T | 0x4000) | S);

        if self.cpu_type().has_frame_word() {
            // Format 0 frame: vector offset in the low 12 bits.
            self.push_word(bus, u16::from(vector) * 4)?;
        }
        self.push_long(bus, return_pc)?;
        self.push_word(bus, old_sr)?;

        fixup(self, bus)?;

        let handler = self.read_mem(bus, self.vector_address(vector), Size::Long)?;
        self.jump(handler);
        Ok(())
    }

    /// Return from exception: pop SR and PC (and the 68010+ format word),
    /// restoring the interrupted privilege.
    pub(crate) fn op_rte<B: Bus>(&mut self, bus: &mut B) -> Exec {
        if !self.regs.is_supervisor() {
            return Err(Exception::Privilege);
        }
        let sr = self.pop_word(bus)?;
        let pc = self.pop_long(bus)?;
        if self.cpu_type().has_frame_word() {
            let format = self.pop_word(bus)?;
            if format >> 12 != 0 {
                return Err(Exception::Format);
            }
        }
        self.set_sr_raw(sr);
        self.jump(pc);
        self.use_cycles(20);
        Ok(())
    }
}
