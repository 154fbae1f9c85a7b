//! Immediate arithmetic and logic: ORI/ANDI/SUBI/ADDI/EORI/CMPI, plus the
//! forms that target CCR and SR.
//!
//! Encoding `0000 OOO0 SS EEEEEE` with the immediate in the instruction
//! stream (one word for byte/word, two for long). An EA field of `111100`
//! redirects the logical forms at CCR (byte size) or SR (word size,
//! privileged).

use emu_core::Bus;

use crate::addressing::AddrMode;
use crate::alu::Size;
use crate::cpu::Cpu68k;
use crate::decode::{CcrOp, ImmOp};
use crate::exceptions::{Exception, Exec};
use crate::timing::ea_cycles;

impl Cpu68k {
    /// The shared ORI/ANDI/SUBI/ADDI/EORI/CMPI body.
    pub(crate) fn op_immediate<B: Bus>(&mut self, bus: &mut B, op: u16, kind: ImmOp) -> Exec {
        let size = Size::from_bits(op >> 6).ok_or(Exception::Illegal)?;
        let imm = match size {
            Size::Byte => u32::from(self.fetch_word(bus)?) & 0xFF,
            Size::Word => u32::from(self.fetch_word(bus)?),
            Size::Long => self.fetch_long(bus)?,
        };
        let ea = AddrMode::decode((op >> 3) as u8, op as u8).ok_or(Exception::Illegal)?;
        let is_reg = matches!(ea, AddrMode::DataReg(_));

        if kind == ImmOp::Cmp {
            let dest = self.ea_read(bus, ea, size)?;
            let result = u64::from(dest).wrapping_sub(u64::from(imm));
            self.set_flags_cmp(dest, imm, result, size);
            let cycles = match (is_reg, size) {
                (true, Size::Long) => 14,
                (true, _) => 8,
                (false, Size::Long) => 12 + ea_cycles(ea, size),
                (false, _) => 8 + ea_cycles(ea, size),
            };
            self.use_cycles(cycles);
            return Ok(());
        }

        let target = self.ea_resolve(bus, ea, size)?;
        let dest = self.ea_target_read(bus, target, size)?;
        let result = match kind {
            ImmOp::Or => {
                let r = dest | imm;
                self.set_flags_logical(r, size);
                u64::from(r)
            }
            ImmOp::And => {
                let r = dest & imm;
                self.set_flags_logical(r, size);
                u64::from(r)
            }
            ImmOp::Eor => {
                let r = dest ^ imm;
                self.set_flags_logical(r, size);
                u64::from(r)
            }
            ImmOp::Add => {
                let r = u64::from(dest) + u64::from(imm);
                self.set_flags_add(dest, imm, r, size);
                r
            }
            ImmOp::Sub => {
                let r = u64::from(dest).wrapping_sub(u64::from(imm));
                self.set_flags_sub(dest, imm, r, size);
                r
            }
            ImmOp::Cmp => unreachable!(),
        };
        self.ea_target_write(bus, target, size, result as u32)?;

        let cycles = match (is_reg, size) {
            (true, Size::Long) => 16,
            (true, _) => 8,
            (false, Size::Long) => 20 + ea_cycles(ea, size),
            (false, _) => 12 + ea_cycles(ea, size),
        };
        self.use_cycles(cycles);
        Ok(())
    }

    /// ORI/ANDI/EORI #imm,CCR: operate on the low byte of SR.
    pub(crate) fn op_ccr_immediate<B: Bus>(&mut self, bus: &mut B, kind: CcrOp) -> Exec {
        let imm = self.fetch_word(bus)? & 0xFF;
        let ccr = u16::from(self.regs.ccr());
        let result = match kind {
            CcrOp::Or => ccr | imm,
            CcrOp::And => ccr & imm,
            CcrOp::Eor => ccr ^ imm,
        };
        self.regs.set_ccr(result as u8);
        self.use_cycles(20);
        Ok(())
    }

    /// ORI/ANDI/EORI #imm,SR: privileged, full status register.
    pub(crate) fn op_sr_immediate<B: Bus>(&mut self, bus: &mut B, kind: CcrOp) -> Exec {
        if !self.regs.is_supervisor() {
            return Err(Exception::Privilege);
        }
        let imm = self.fetch_word(bus)?;
        let sr = self.regs.sr;
        let result = match kind {
            CcrOp::Or => sr | imm,
            CcrOp::And => sr & imm,
            CcrOp::Eor => sr ^ imm,
        };
        self.set_sr_raw(result);
        self.use_cycles(20);
        Ok(())
    }
}
