//! Logical operations and status-register moves: AND, OR, EOR, NOT, TST,
//! CLR, and the MOVE to/from SR/CCR group.
//!
//! Flag purity: every operation here leaves X alone and clears V and C.

use emu_core::Bus;

use crate::addressing::AddrMode;
use crate::alu::Size;
use crate::cpu::Cpu68k;
use crate::exceptions::{Exception, Exec};
use crate::flags::{C, N, V, Z};
use crate::timing::ea_cycles;

impl Cpu68k {
    /// AND (both directions).
    pub(crate) fn op_and<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        self.logical_dn_ea(bus, op, |d, s| d & s)
    }

    /// OR (both directions).
    pub(crate) fn op_or<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        self.logical_dn_ea(bus, op, |d, s| d | s)
    }

    /// Shared AND/OR body: direction bit 8 selects EA->Dn or Dn->EA.
    fn logical_dn_ea<B: Bus>(
        &mut self,
        bus: &mut B,
        op: u16,
        apply: fn(u32, u32) -> u32,
    ) -> Exec {
        let reg = (op >> 9 & 7) as u8;
        let opmode = op >> 6 & 7;
        let size = Size::from_bits(opmode & 3).ok_or(Exception::Illegal)?;
        let ea = AddrMode::decode((op >> 3) as u8, op as u8).ok_or(Exception::Illegal)?;
        let long_penalty = i32::from(size == Size::Long) * 2;

        if opmode < 4 {
            let src = self.ea_read(bus, ea, size)?;
            let result = apply(self.read_data_reg(reg, size), src);
            self.set_flags_logical(result, size);
            self.write_data_reg(reg, result, size);
            self.use_cycles(4 + long_penalty + ea_cycles(ea, size));
        } else {
            let target = self.ea_resolve(bus, ea, size)?;
            let dest = self.ea_target_read(bus, target, size)?;
            let result = apply(dest, self.read_data_reg(reg, size));
            self.set_flags_logical(result, size);
            self.ea_target_write(bus, target, size, result)?;
            self.use_cycles(8 + long_penalty * 2 + ea_cycles(ea, size));
        }
        Ok(())
    }

    /// EOR: always Dn ^ EA -> EA.
    pub(crate) fn op_eor<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        let reg = (op >> 9 & 7) as u8;
        let size = Size::from_bits(op >> 6).ok_or(Exception::Illegal)?;
        let ea = AddrMode::decode((op >> 3) as u8, op as u8).ok_or(Exception::Illegal)?;

        let target = self.ea_resolve(bus, ea, size)?;
        let dest = self.ea_target_read(bus, target, size)?;
        let result = dest ^ self.read_data_reg(reg, size);
        self.set_flags_logical(result, size);
        self.ea_target_write(bus, target, size, result)?;

        let cycles = if matches!(ea, AddrMode::DataReg(_)) {
            if size == Size::Long {
                8
            } else {
                4
            }
        } else {
            let base = if size == Size::Long { 12 } else { 8 };
            base + ea_cycles(ea, size)
        };
        self.use_cycles(cycles);
        Ok(())
    }

    /// NOT: ones-complement.
    pub(crate) fn op_not<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        let size = Size::from_bits(op >> 6).ok_or(Exception::Illegal)?;
        let ea = AddrMode::decode((op >> 3) as u8, op as u8).ok_or(Exception::Illegal)?;

        let target = self.ea_resolve(bus, ea, size)?;
        let dest = self.ea_target_read(bus, target, size)?;
        let result = size.truncate(!dest);
        self.set_flags_logical(result, size);
        self.ea_target_write(bus, target, size, result)?;
        self.use_rmw_cycles(ea, size);
        Ok(())
    }

    /// CLR: store zero; N/V/C cleared, Z set.
    pub(crate) fn op_clr<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        let size = Size::from_bits(op >> 6).ok_or(Exception::Illegal)?;
        let ea = AddrMode::decode((op >> 3) as u8, op as u8).ok_or(Exception::Illegal)?;

        self.ea_write(bus, ea, size, 0)?;
        self.regs.sr = self.regs.sr & !(N | V | C) | Z;
        self.use_rmw_cycles(ea, size);
        Ok(())
    }

    /// TST: compare operand against zero.
    pub(crate) fn op_tst<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        let size = Size::from_bits(op >> 6).ok_or(Exception::Illegal)?;
        let ea = AddrMode::decode((op >> 3) as u8, op as u8).ok_or(Exception::Illegal)?;

        let value = self.ea_read(bus, ea, size)?;
        self.set_flags_logical(value, size);
        self.use_cycles(4 + ea_cycles(ea, size));
        Ok(())
    }

    /// MOVE from SR: store SR at a word EA. Privileged from the 68010 on.
    pub(crate) fn op_move_from_sr<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        if self.cpu_type().privileged_sr_read() && !self.regs.is_supervisor() {
            return Err(Exception::Privilege);
        }
        let ea = AddrMode::decode((op >> 3) as u8, op as u8).ok_or(Exception::Illegal)?;
        let sr = u32::from(self.regs.sr);
        self.ea_write(bus, ea, Size::Word, sr)?;
        let cycles = if matches!(ea, AddrMode::DataReg(_)) {
            6
        } else {
            8 + ea_cycles(ea, Size::Word)
        };
        self.use_cycles(cycles);
        Ok(())
    }

    /// MOVE from CCR (68010+): store the condition codes as a word.
    pub(crate) fn op_move_from_ccr<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        if !self.cpu_type().has_frame_word() {
            return self.op_unimplemented(op);
        }
        let ea = AddrMode::decode((op >> 3) as u8, op as u8).ok_or(Exception::Illegal)?;
        let ccr = u32::from(self.regs.ccr());
        self.ea_write(bus, ea, Size::Word, ccr)?;
        let cycles = if matches!(ea, AddrMode::DataReg(_)) {
            6
        } else {
            8 + ea_cycles(ea, Size::Word)
        };
        self.use_cycles(cycles);
        Ok(())
    }

    /// MOVE to CCR: the low byte of a word source becomes the CCR.
    pub(crate) fn op_move_to_ccr<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        let ea = AddrMode::decode((op >> 3) as u8, op as u8).ok_or(Exception::Illegal)?;
        let value = self.ea_read(bus, ea, Size::Word)?;
        self.regs.set_ccr(value as u8);
        self.use_cycles(12 + ea_cycles(ea, Size::Word));
        Ok(())
    }

    /// MOVE to SR: privileged; switches stack banks if S changes.
    pub(crate) fn op_move_to_sr<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        if !self.regs.is_supervisor() {
            return Err(Exception::Privilege);
        }
        let ea = AddrMode::decode((op >> 3) as u8, op as u8).ok_or(Exception::Illegal)?;
        let value = self.ea_read(bus, ea, Size::Word)?;
        self.set_sr_raw(value as u16);
        self.use_cycles(12 + ea_cycles(ea, Size::Word));
        Ok(())
    }
}
