//! Effective-address resolution.
//!
//! `ea_resolve` turns a decoded [`AddrMode`] into an [`EaTarget`],
//! consuming extension words and applying auto-increment/decrement exactly
//! once. Read-modify-write instructions keep the target and reuse it for
//! the writeback, so (An)+ and -(An) never step twice.
//!
//! PC-relative modes use the address of the extension word itself as the
//! base, matching the silicon.

use emu_core::Bus;

use crate::addressing::AddrMode;
use crate::alu::{sign_extend_16, Size};
use crate::cpu::Cpu68k;
use crate::exceptions::{Exception, Exec};

/// A resolved operand location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EaTarget {
    /// Data register Dn.
    DataReg(u8),
    /// Address register An.
    AddrReg(u8),
    /// Memory at a fixed address.
    Memory(u32),
    /// Immediate value from the instruction stream.
    Immediate(u32),
}

impl Cpu68k {
    /// Resolve an addressing mode to an operand location.
    ///
    /// Register-stepping side effects happen here, once.
    pub(crate) fn ea_resolve<B: Bus>(
        &mut self,
        bus: &mut B,
        mode: AddrMode,
        size: Size,
    ) -> Exec<EaTarget> {
        match mode {
            AddrMode::DataReg(r) => Ok(EaTarget::DataReg(r)),
            AddrMode::AddrReg(r) => Ok(EaTarget::AddrReg(r)),
            AddrMode::AddrInd(r) => Ok(EaTarget::Memory(self.regs.a[r as usize])),
            AddrMode::AddrIndPostInc(r) => {
                let addr = self.regs.a[r as usize];
                self.regs.a[r as usize] = addr.wrapping_add(self.ea_step(r, size));
                Ok(EaTarget::Memory(addr))
            }
            AddrMode::AddrIndPreDec(r) => {
                let addr = self.regs.a[r as usize].wrapping_sub(self.ea_step(r, size));
                self.regs.a[r as usize] = addr;
                Ok(EaTarget::Memory(addr))
            }
            AddrMode::AddrIndDisp(r) => {
                let disp = sign_extend_16(u32::from(self.fetch_word(bus)?));
                Ok(EaTarget::Memory(self.regs.a[r as usize].wrapping_add(disp)))
            }
            AddrMode::AddrIndIndex(r) => {
                let ext = self.fetch_word(bus)?;
                let base = self.regs.a[r as usize];
                Ok(EaTarget::Memory(self.indexed_address(base, ext)))
            }
            AddrMode::AbsShort => {
                let addr = sign_extend_16(u32::from(self.fetch_word(bus)?));
                Ok(EaTarget::Memory(addr))
            }
            AddrMode::AbsLong => Ok(EaTarget::Memory(self.fetch_long(bus)?)),
            AddrMode::PcDisp => {
                let base = self.regs.pc;
                let disp = sign_extend_16(u32::from(self.fetch_word(bus)?));
                Ok(EaTarget::Memory(base.wrapping_add(disp)))
            }
            AddrMode::PcIndex => {
                let base = self.regs.pc;
                let ext = self.fetch_word(bus)?;
                Ok(EaTarget::Memory(self.indexed_address(base, ext)))
            }
            AddrMode::Immediate => {
                let value = match size {
                    Size::Byte => u32::from(self.fetch_word(bus)?) & 0xFF,
                    Size::Word => u32::from(self.fetch_word(bus)?),
                    Size::Long => self.fetch_long(bus)?,
                };
                Ok(EaTarget::Immediate(value))
            }
        }
    }

    /// Read an operand from a resolved location.
    pub(crate) fn ea_target_read<B: Bus>(
        &mut self,
        bus: &mut B,
        target: EaTarget,
        size: Size,
    ) -> Exec<u32> {
        match target {
            EaTarget::DataReg(r) => Ok(self.read_data_reg(r, size)),
            EaTarget::AddrReg(r) => Ok(size.truncate(self.regs.a[r as usize])),
            EaTarget::Memory(addr) => self.read_mem(bus, addr, size),
            EaTarget::Immediate(value) => Ok(size.truncate(value)),
        }
    }

    /// Store an operand to a resolved location.
    ///
    /// Data-register stores preserve the upper bits; address-register
    /// stores are full 32 bits (callers sign-extend first).
    pub(crate) fn ea_target_write<B: Bus>(
        &mut self,
        bus: &mut B,
        target: EaTarget,
        size: Size,
        value: u32,
    ) -> Exec {
        match target {
            EaTarget::DataReg(r) => {
                self.write_data_reg(r, value, size);
                Ok(())
            }
            EaTarget::AddrReg(r) => {
                self.regs.a[r as usize] = value;
                Ok(())
            }
            EaTarget::Memory(addr) => self.write_mem(bus, addr, size, value),
            EaTarget::Immediate(_) => Err(Exception::Illegal),
        }
    }

    /// Resolve and read a source operand in one step.
    pub(crate) fn ea_read<B: Bus>(
        &mut self,
        bus: &mut B,
        mode: AddrMode,
        size: Size,
    ) -> Exec<u32> {
        let target = self.ea_resolve(bus, mode, size)?;
        self.ea_target_read(bus, target, size)
    }

    /// Resolve and write a destination operand in one step.
    pub(crate) fn ea_write<B: Bus>(
        &mut self,
        bus: &mut B,
        mode: AddrMode,
        size: Size,
        value: u32,
    ) -> Exec {
        let target = self.ea_resolve(bus, mode, size)?;
        self.ea_target_write(bus, target, size, value)
    }

    /// Compute the address of a control-mode EA (LEA/PEA/JMP/JSR/MOVEM).
    ///
    /// Non-control modes are encoding errors and raise illegal instruction.
    pub(crate) fn control_address<B: Bus>(&mut self, bus: &mut B, mode: AddrMode) -> Exec<u32> {
        if !mode.is_control() {
            return Err(Exception::Illegal);
        }
        match self.ea_resolve(bus, mode, Size::Long)? {
            EaTarget::Memory(addr) => Ok(addr),
            _ => Err(Exception::Illegal),
        }
    }

    /// Byte steps on A7 stay word-aligned.
    fn ea_step(&self, reg: u8, size: Size) -> u32 {
        if size == Size::Byte && reg == 7 {
            2
        } else {
            size.bytes()
        }
    }

    /// Decode a brief extension word: base + d8 + index register.
    ///
    /// Bit 15 selects A/D for the index, bits 14-12 the register, bit 11
    /// long/word index width, low byte the signed displacement.
    fn indexed_address(&self, base: u32, ext: u16) -> u32 {
        let disp = ext as u8 as i8 as i32 as u32;
        let xn = usize::from(ext >> 12 & 0x07);
        let raw = if ext & 0x8000 != 0 {
            self.regs.a[xn]
        } else {
            self.regs.d[xn]
        };
        let index = if ext & 0x0800 != 0 {
            raw
        } else {
            sign_extend_16(raw)
        };
        base.wrapping_add(disp).wrapping_add(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CpuType;
    use emu_core::SimpleBus;

    #[test]
    fn postincrement_steps_once_per_resolve() {
        let mut cpu = Cpu68k::new(CpuType::M68000);
        let mut bus = SimpleBus::with_size(0x1000);
        cpu.regs.a[0] = 0x100;

        let t = cpu
            .ea_resolve(&mut bus, AddrMode::AddrIndPostInc(0), Size::Word)
            .unwrap();
        assert_eq!(t, EaTarget::Memory(0x100));
        assert_eq!(cpu.regs.a[0], 0x102);

        // Reusing the target must not step again.
        cpu.ea_target_read(&mut bus, t, Size::Word).unwrap();
        cpu.ea_target_write(&mut bus, t, Size::Word, 0x1234).unwrap();
        assert_eq!(cpu.regs.a[0], 0x102);
    }

    #[test]
    fn byte_step_on_a7_keeps_alignment() {
        let mut cpu = Cpu68k::new(CpuType::M68000);
        let mut bus = SimpleBus::with_size(0x1000);
        cpu.regs.a[7] = 0x200;

        cpu.ea_resolve(&mut bus, AddrMode::AddrIndPostInc(7), Size::Byte)
            .unwrap();
        assert_eq!(cpu.regs.a[7], 0x202);

        cpu.ea_resolve(&mut bus, AddrMode::AddrIndPreDec(7), Size::Byte)
            .unwrap();
        assert_eq!(cpu.regs.a[7], 0x200);
    }

    #[test]
    fn pc_displacement_uses_extension_word_address() {
        let mut cpu = Cpu68k::new(CpuType::M68000);
        let mut bus = SimpleBus::with_size(0x1000);
        cpu.regs.pc = 0x400;
        bus.write16(0x400, 0x0010);

        let t = cpu
            .ea_resolve(&mut bus, AddrMode::PcDisp, Size::Word)
            .unwrap();
        assert_eq!(t, EaTarget::Memory(0x410));
    }

    #[test]
    fn indexed_word_index_is_sign_extended() {
        let mut cpu = Cpu68k::new(CpuType::M68000);
        let mut bus = SimpleBus::with_size(0x1000);
        cpu.regs.a[0] = 0x500;
        cpu.regs.d[2] = 0xFFFF_FFFE; // -2 as a word
        cpu.regs.pc = 0x400;
        // Xn = D2, word index, d8 = 4
        bus.write16(0x400, 0x2004);

        let t = cpu
            .ea_resolve(&mut bus, AddrMode::AddrIndIndex(0), Size::Word)
            .unwrap();
        assert_eq!(t, EaTarget::Memory(0x502));
    }
}
