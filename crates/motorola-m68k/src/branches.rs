//! Control transfer: BRA, BSR, Bcc, DBcc, Scc, JMP, JSR, RTS, RTR.
//!
//! Branch displacements are relative to the PC after the opcode word; a
//! zero 8-bit field selects a 16-bit extension word, which is consumed
//! whether or not the branch is taken.

use emu_core::Bus;

use crate::addressing::AddrMode;
use crate::alu::{sign_extend_16, sign_extend_8, Size};
use crate::cpu::Cpu68k;
use crate::exceptions::{Exception, Exec};
use crate::timing::{ea_cycles, jump_ea_cycles};

impl Cpu68k {
    /// Read the branch displacement; returns (displacement, used 16-bit
    /// extension).
    fn branch_displacement<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec<(u32, bool)> {
        let d8 = op & 0xFF;
        if d8 == 0 {
            let ext = self.fetch_word(bus)?;
            Ok((sign_extend_16(u32::from(ext)), true))
        } else {
            Ok((sign_extend_8(u32::from(d8)), false))
        }
    }

    /// BRA.
    pub(crate) fn op_bra<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        let base = self.regs.pc;
        let (disp, _) = self.branch_displacement(bus, op)?;
        self.jump(base.wrapping_add(disp));
        self.use_cycles(10);
        Ok(())
    }

    /// BSR: push the address after the full instruction, then branch.
    pub(crate) fn op_bsr<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        let base = self.regs.pc;
        let (disp, _) = self.branch_displacement(bus, op)?;
        let return_pc = self.regs.pc;
        self.push_long(bus, return_pc)?;
        self.jump(base.wrapping_add(disp));
        self.use_cycles(18);
        Ok(())
    }

    /// Bcc: the extension word is consumed even when the branch falls
    /// through.
    pub(crate) fn op_bcc<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        let cond = (op >> 8 & 0x0F) as u8;
        let base = self.regs.pc;
        let (disp, word_form) = self.branch_displacement(bus, op)?;

        if self.test_condition(cond) {
            self.jump(base.wrapping_add(disp));
            self.use_cycles(10);
        } else {
            self.use_cycles(if word_form { 12 } else { 8 });
        }
        Ok(())
    }

    /// DBcc: when the condition fails, decrement the low word of Dn and
    /// branch unless it rolled to -1.
    pub(crate) fn op_dbcc<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        let cond = (op >> 8 & 0x0F) as u8;
        let reg = (op & 7) as usize;
        let base = self.regs.pc;
        let disp = sign_extend_16(u32::from(self.fetch_word(bus)?));

        if self.test_condition(cond) {
            self.use_cycles(12);
            return Ok(());
        }

        let counter = self.regs.d[reg].wrapping_sub(1) & 0xFFFF;
        self.regs.d[reg] = self.regs.d[reg] & 0xFFFF_0000 | counter;
        if counter != 0xFFFF {
            self.jump(base.wrapping_add(disp));
            self.use_cycles(10);
        } else {
            self.use_cycles(14);
        }
        Ok(())
    }

    /// Scc: store all-ones or all-zeros to a byte EA.
    pub(crate) fn op_scc<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        let cond = (op >> 8 & 0x0F) as u8;
        let ea = AddrMode::decode((op >> 3) as u8, op as u8).ok_or(Exception::Illegal)?;

        let taken = self.test_condition(cond);
        let value = if taken { 0xFF } else { 0x00 };
        self.ea_write(bus, ea, Size::Byte, value)?;

        let cycles = if matches!(ea, AddrMode::DataReg(_)) {
            if taken {
                6
            } else {
                4
            }
        } else {
            8 + ea_cycles(ea, Size::Byte)
        };
        self.use_cycles(cycles);
        Ok(())
    }

    /// JMP through a control EA.
    pub(crate) fn op_jmp<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        let ea = AddrMode::decode((op >> 3) as u8, op as u8).ok_or(Exception::Illegal)?;
        let addr = self.control_address(bus, ea)?;
        self.jump(addr);
        self.use_cycles(8 + jump_ea_cycles(ea));
        Ok(())
    }

    /// JSR: push the return address, then jump.
    pub(crate) fn op_jsr<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        let ea = AddrMode::decode((op >> 3) as u8, op as u8).ok_or(Exception::Illegal)?;
        let addr = self.control_address(bus, ea)?;
        let return_pc = self.regs.pc;
        self.push_long(bus, return_pc)?;
        self.jump(addr);
        self.use_cycles(16 + jump_ea_cycles(ea));
        Ok(())
    }

    /// RTS.
    pub(crate) fn op_rts<B: Bus>(&mut self, bus: &mut B) -> Exec {
        let pc = self.pop_long(bus)?;
        self.jump(pc);
        self.use_cycles(16);
        Ok(())
    }

    /// RTR: pop CCR, then PC.
    pub(crate) fn op_rtr<B: Bus>(&mut self, bus: &mut B) -> Exec {
        let ccr = self.pop_word(bus)?;
        self.regs.set_ccr(ccr as u8);
        let pc = self.pop_long(bus)?;
        self.jump(pc);
        self.use_cycles(20);
        Ok(())
    }
}
