//! Data movement: MOVE, MOVEA, MOVEQ.

use emu_core::Bus;

use crate::addressing::AddrMode;
use crate::alu::{sign_extend_16, sign_extend_8, Size};
use crate::cpu::Cpu68k;
use crate::exceptions::{Exception, Exec};
use crate::timing::{ea_cycles, move_dest_cycles};

impl Cpu68k {
    /// MOVE / MOVEA.
    ///
    /// Encoding `00ss RRRMMM mmmrrr`: the size field is non-uniform
    /// (01=byte, 11=word, 10=long) and a destination mode field of 001
    /// selects MOVEA.
    pub(crate) fn op_move<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        let size = Size::from_move_bits(op >> 12).ok_or(Exception::Illegal)?;
        let src = AddrMode::decode((op >> 3) as u8, op as u8).ok_or(Exception::Illegal)?;
        let dst_mode = (op >> 6 & 7) as u8;
        let dst_reg = (op >> 9 & 7) as u8;

        if dst_mode == 1 {
            // MOVEA: word source sign-extends, no flags
            if size == Size::Byte {
                return Err(Exception::Illegal);
            }
            let mut value = self.ea_read(bus, src, size)?;
            if size == Size::Word {
                value = sign_extend_16(value);
            }
            self.regs.a[dst_reg as usize] = value;
            self.use_cycles(4 + ea_cycles(src, size));
            return Ok(());
        }

        let dst = AddrMode::decode(dst_mode, dst_reg).ok_or(Exception::Illegal)?;
        if !dst.is_data_alterable() {
            return Err(Exception::Illegal);
        }

        let value = self.ea_read(bus, src, size)?;
        self.ea_write(bus, dst, size, value)?;
        self.set_flags_logical(value, size);
        self.use_cycles(4 + ea_cycles(src, size) + move_dest_cycles(dst, size));
        Ok(())
    }

    /// MOVEQ: sign-extended 8-bit immediate into the full data register.
    pub(crate) fn op_moveq(&mut self, op: u16) -> Exec {
        let reg = (op >> 9 & 7) as usize;
        let data = sign_extend_8(u32::from(op & 0xFF));
        self.regs.d[reg] = data;
        self.set_flags_logical(data, Size::Long);
        self.use_cycles(4);
        Ok(())
    }
}
