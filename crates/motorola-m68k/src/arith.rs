//! Integer arithmetic: ADD/SUB, ADDA/SUBA, ADDX/SUBX, ADDQ/SUBQ, NEG/NEGX,
//! the CMP family, and multiply/divide.
//!
//! Encoding for groups 0x9/0xD: `TTTT RRR OOO MMMRRR`, opmode `OOO`:
//! 000-010 = EA op Dn -> Dn, 011 = ADDA/SUBA.w, 100-110 = Dn op EA -> EA,
//! 111 = ADDA/SUBA.l. The Dn->EA row doubles as ADDX/SUBX when the mode
//! field is 000 (register) or 001 (predecrement memory).

use emu_core::Bus;

use crate::addressing::AddrMode;
use crate::alu::{sign_extend_16, Size};
use crate::cpu::Cpu68k;
use crate::exceptions::{Exception, Exec};
use crate::flags::{Status, C, V};
use crate::timing::{
    ea_cycles, DIVS_CYCLES, DIVU_CYCLES, DIV_OVERFLOW_CYCLES, MUL_CYCLES,
};

impl Cpu68k {
    /// ADD / SUB (data-register forms, both directions).
    pub(crate) fn op_add_sub<B: Bus>(&mut self, bus: &mut B, op: u16, is_add: bool) -> Exec {
        let reg = (op >> 9 & 7) as u8;
        let opmode = op >> 6 & 7;
        let size = Size::from_bits(opmode & 3).ok_or(Exception::Illegal)?;
        let ea = AddrMode::decode((op >> 3) as u8, op as u8).ok_or(Exception::Illegal)?;
        let long_penalty = i32::from(size == Size::Long) * 2;

        if opmode < 4 {
            // EA op Dn -> Dn
            let src = self.ea_read(bus, ea, size)?;
            let dest = self.read_data_reg(reg, size);
            let result = self.arith(dest, src, is_add);
            if is_add {
                self.set_flags_add(dest, src, result, size);
            } else {
                self.set_flags_sub(dest, src, result, size);
            }
            self.write_data_reg(reg, result as u32, size);
            self.use_cycles(4 + long_penalty + ea_cycles(ea, size));
        } else {
            // Dn op EA -> EA (read-modify-write)
            let target = self.ea_resolve(bus, ea, size)?;
            let dest = self.ea_target_read(bus, target, size)?;
            let src = self.read_data_reg(reg, size);
            let result = self.arith(dest, src, is_add);
            if is_add {
                self.set_flags_add(dest, src, result, size);
            } else {
                self.set_flags_sub(dest, src, result, size);
            }
            self.ea_target_write(bus, target, size, result as u32)?;
            self.use_cycles(8 + long_penalty * 2 + ea_cycles(ea, size));
        }
        Ok(())
    }

    fn arith(&self, dest: u32, src: u32, is_add: bool) -> u64 {
        if is_add {
            u64::from(dest) + u64::from(src)
        } else {
            u64::from(dest).wrapping_sub(u64::from(src))
        }
    }

    /// ADDA / SUBA: word sources sign-extend, flags untouched.
    pub(crate) fn op_adda_suba<B: Bus>(&mut self, bus: &mut B, op: u16, is_add: bool) -> Exec {
        let reg = (op >> 9 & 7) as usize;
        let size = if op & 0x0100 != 0 { Size::Long } else { Size::Word };
        let ea = AddrMode::decode((op >> 3) as u8, op as u8).ok_or(Exception::Illegal)?;

        let mut src = self.ea_read(bus, ea, size)?;
        if size == Size::Word {
            src = sign_extend_16(src);
        }
        self.regs.a[reg] = if is_add {
            self.regs.a[reg].wrapping_add(src)
        } else {
            self.regs.a[reg].wrapping_sub(src)
        };
        self.use_cycles(8 + ea_cycles(ea, size));
        Ok(())
    }

    /// ADDQ / SUBQ: 3-bit immediate, 0 encoding 8. Address-register
    /// destinations take the full 32-bit operation and leave flags alone.
    pub(crate) fn op_addq_subq<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        let is_add = op & 0x0100 == 0;
        let mut data = u32::from(op >> 9 & 7);
        if data == 0 {
            data = 8;
        }
        let size = Size::from_bits(op >> 6).ok_or(Exception::Illegal)?;
        let ea = AddrMode::decode((op >> 3) as u8, op as u8).ok_or(Exception::Illegal)?;

        if let AddrMode::AddrReg(r) = ea {
            let a = &mut self.regs.a[r as usize];
            *a = if is_add {
                a.wrapping_add(data)
            } else {
                a.wrapping_sub(data)
            };
            self.use_cycles(8);
            return Ok(());
        }

        let target = self.ea_resolve(bus, ea, size)?;
        let dest = self.ea_target_read(bus, target, size)?;
        let result = self.arith(dest, data, is_add);
        if is_add {
            self.set_flags_add(dest, data, result, size);
        } else {
            self.set_flags_sub(dest, data, result, size);
        }
        self.ea_target_write(bus, target, size, result as u32)?;
        let base = if size == Size::Long { 8 } else { 4 };
        self.use_cycles(base + ea_cycles(ea, size));
        Ok(())
    }

    /// ADDX / SUBX: register-register or predecrement-memory pairs, with
    /// the X flag folded in and the accumulating Z discipline.
    pub(crate) fn op_addx_subx<B: Bus>(&mut self, bus: &mut B, op: u16, is_add: bool) -> Exec {
        let rx = (op >> 9 & 7) as usize;
        let ry = (op & 7) as usize;
        let size = Size::from_bits(op >> 6).ok_or(Exception::Illegal)?;
        let x = u64::from(self.x_bit());
        let memory = op & 0x0008 != 0;

        if memory {
            // -(Ay) op -(Ax), source stepped first
            let src_t = self.ea_resolve(bus, AddrMode::AddrIndPreDec(ry as u8), size)?;
            let src = self.ea_target_read(bus, src_t, size)?;
            let dst_t = self.ea_resolve(bus, AddrMode::AddrIndPreDec(rx as u8), size)?;
            let dest = self.ea_target_read(bus, dst_t, size)?;
            let result = self.arith_x(dest, src, x, is_add);
            self.set_flags_extended(dest, src, result, size, is_add);
            self.ea_target_write(bus, dst_t, size, result as u32)?;
            self.use_cycles(if size == Size::Long { 30 } else { 18 });
        } else {
            let src = self.read_data_reg(ry as u8, size);
            let dest = self.read_data_reg(rx as u8, size);
            let result = self.arith_x(dest, src, x, is_add);
            self.set_flags_extended(dest, src, result, size, is_add);
            self.write_data_reg(rx as u8, result as u32, size);
            self.use_cycles(if size == Size::Long { 8 } else { 4 });
        }
        Ok(())
    }

    fn arith_x(&self, dest: u32, src: u32, x: u64, is_add: bool) -> u64 {
        if is_add {
            u64::from(dest) + u64::from(src) + x
        } else {
            u64::from(dest).wrapping_sub(u64::from(src)).wrapping_sub(x)
        }
    }

    /// NEG: 0 - operand.
    pub(crate) fn op_neg<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        let size = Size::from_bits(op >> 6).ok_or(Exception::Illegal)?;
        let ea = AddrMode::decode((op >> 3) as u8, op as u8).ok_or(Exception::Illegal)?;

        let target = self.ea_resolve(bus, ea, size)?;
        let dest = self.ea_target_read(bus, target, size)?;
        let result = 0u64.wrapping_sub(u64::from(dest));
        self.set_flags_sub(0, dest, result, size);
        self.ea_target_write(bus, target, size, result as u32)?;
        self.use_rmw_cycles(ea, size);
        Ok(())
    }

    /// NEGX: 0 - operand - X, Z accumulating.
    pub(crate) fn op_negx<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        let size = Size::from_bits(op >> 6).ok_or(Exception::Illegal)?;
        let ea = AddrMode::decode((op >> 3) as u8, op as u8).ok_or(Exception::Illegal)?;

        let target = self.ea_resolve(bus, ea, size)?;
        let dest = self.ea_target_read(bus, target, size)?;
        let result = 0u64
            .wrapping_sub(u64::from(dest))
            .wrapping_sub(u64::from(self.x_bit()));
        self.set_flags_extended(0, dest, result, size, false);
        self.ea_target_write(bus, target, size, result as u32)?;
        self.use_rmw_cycles(ea, size);
        Ok(())
    }

    /// Cycle charge shared by the single-operand read-modify-write row.
    pub(crate) fn use_rmw_cycles(&mut self, ea: AddrMode, size: Size) {
        let cycles = match ea {
            AddrMode::DataReg(_) | AddrMode::AddrReg(_) => {
                if size == Size::Long {
                    6
                } else {
                    4
                }
            }
            _ => {
                let base = if size == Size::Long { 12 } else { 8 };
                base + ea_cycles(ea, size)
            }
        };
        self.use_cycles(cycles);
    }

    /// CMP: Dn - EA, flags only. X is not touched.
    pub(crate) fn op_cmp<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        let reg = (op >> 9 & 7) as u8;
        let size = Size::from_bits(op >> 6).ok_or(Exception::Illegal)?;
        let ea = AddrMode::decode((op >> 3) as u8, op as u8).ok_or(Exception::Illegal)?;

        let src = self.ea_read(bus, ea, size)?;
        let dest = self.read_data_reg(reg, size);
        let result = u64::from(dest).wrapping_sub(u64::from(src));
        self.set_flags_cmp(dest, src, result, size);
        let long_penalty = i32::from(size == Size::Long) * 2;
        self.use_cycles(4 + long_penalty + ea_cycles(ea, size));
        Ok(())
    }

    /// CMPA: word sources sign-extend and the compare is always long.
    pub(crate) fn op_cmpa<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        let reg = (op >> 9 & 7) as usize;
        let size = if op & 0x0100 != 0 { Size::Long } else { Size::Word };
        let ea = AddrMode::decode((op >> 3) as u8, op as u8).ok_or(Exception::Illegal)?;

        let mut src = self.ea_read(bus, ea, size)?;
        if size == Size::Word {
            src = sign_extend_16(src);
        }
        let dest = self.regs.a[reg];
        let result = u64::from(dest).wrapping_sub(u64::from(src));
        self.set_flags_cmp(dest, src, result, Size::Long);
        self.use_cycles(6 + ea_cycles(ea, size));
        Ok(())
    }

    /// CMPM: (Ay)+ compared into (Ax)+.
    pub(crate) fn op_cmpm<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        let rx = (op >> 9 & 7) as u8;
        let ry = (op & 7) as u8;
        let size = Size::from_bits(op >> 6).ok_or(Exception::Illegal)?;

        let src = self.ea_read(bus, AddrMode::AddrIndPostInc(ry), size)?;
        let dest = self.ea_read(bus, AddrMode::AddrIndPostInc(rx), size)?;
        let result = u64::from(dest).wrapping_sub(u64::from(src));
        self.set_flags_cmp(dest, src, result, size);
        self.use_cycles(if size == Size::Long { 20 } else { 12 });
        Ok(())
    }

    /// MULU: 16 x 16 -> 32 unsigned product.
    pub(crate) fn op_mulu<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        let reg = (op >> 9 & 7) as usize;
        let ea = AddrMode::decode((op >> 3) as u8, op as u8).ok_or(Exception::Illegal)?;

        let src = self.ea_read(bus, ea, Size::Word)?;
        let product = (self.regs.d[reg] & 0xFFFF) * src;
        self.regs.d[reg] = product;
        self.set_flags_logical(product, Size::Long);
        self.use_cycles(MUL_CYCLES + ea_cycles(ea, Size::Word));
        Ok(())
    }

    /// MULS: 16 x 16 -> 32 signed product.
    pub(crate) fn op_muls<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        let reg = (op >> 9 & 7) as usize;
        let ea = AddrMode::decode((op >> 3) as u8, op as u8).ok_or(Exception::Illegal)?;

        let src = self.ea_read(bus, ea, Size::Word)? as u16 as i16;
        let dst = self.regs.d[reg] as u16 as i16;
        let product = i32::from(dst) * i32::from(src);
        self.regs.d[reg] = product as u32;
        self.set_flags_logical(product as u32, Size::Long);
        self.use_cycles(MUL_CYCLES + ea_cycles(ea, Size::Word));
        Ok(())
    }

    /// DIVU: 32 / 16 -> 16-bit quotient (low) and remainder (high).
    ///
    /// Division by zero traps; a quotient over 16 bits sets V and leaves
    /// the register untouched.
    pub(crate) fn op_divu<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        let reg = (op >> 9 & 7) as usize;
        let ea = AddrMode::decode((op >> 3) as u8, op as u8).ok_or(Exception::Illegal)?;

        let divisor = self.ea_read(bus, ea, Size::Word)?;
        if divisor == 0 {
            return Err(Exception::ZeroDivide);
        }
        let dividend = self.regs.d[reg];
        let quotient = dividend / divisor;
        if quotient > 0xFFFF {
            self.set_div_overflow();
            self.use_cycles(DIV_OVERFLOW_CYCLES + ea_cycles(ea, Size::Word));
            return Ok(());
        }
        let remainder = dividend % divisor;
        self.regs.d[reg] = remainder << 16 | quotient;
        self.set_flags_logical(quotient, Size::Word);
        self.use_cycles(DIVU_CYCLES + ea_cycles(ea, Size::Word));
        Ok(())
    }

    /// DIVS: signed 32 / 16, quotient truncated toward zero.
    pub(crate) fn op_divs<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        let reg = (op >> 9 & 7) as usize;
        let ea = AddrMode::decode((op >> 3) as u8, op as u8).ok_or(Exception::Illegal)?;

        let divisor = self.ea_read(bus, ea, Size::Word)? as u16 as i16;
        if divisor == 0 {
            return Err(Exception::ZeroDivide);
        }
        let dividend = self.regs.d[reg] as i32;
        let quotient = match dividend.checked_div(i32::from(divisor)) {
            Some(q) if i16::try_from(q).is_ok() => q,
            _ => {
                self.set_div_overflow();
                self.use_cycles(DIV_OVERFLOW_CYCLES + ea_cycles(ea, Size::Word));
                return Ok(());
            }
        };
        let remainder = dividend.wrapping_rem(i32::from(divisor));
        self.regs.d[reg] = (remainder as u32 & 0xFFFF) << 16 | quotient as u32 & 0xFFFF;
        self.set_flags_logical(quotient as u32, Size::Word);
        self.use_cycles(DIVS_CYCLES + ea_cycles(ea, Size::Word));
        Ok(())
    }

    /// Divide overflow: V set, C cleared, register and N/Z untouched.
    fn set_div_overflow(&mut self) {
        let sr = Status::set_if(self.regs.sr, V, true);
        self.regs.sr = Status::set_if(sr, C, false);
    }
}
