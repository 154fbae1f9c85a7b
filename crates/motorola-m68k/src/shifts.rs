//! Shifts and rotates: ASL/ASR, LSL/LSR, ROL/ROR, ROXL/ROXR.
//!
//! Register variant `1110 CCC D SS I TT RRR`: count from a register
//! (modulo 64) or a 3-bit immediate (0 encoding 8). Memory variant
//! `1110 0TT D 11 MMMRRR`: single-bit shift of a word operand.
//!
//! Flag rules: C takes the last bit shifted out (cleared for a zero count,
//! except ROXd where C mirrors X); X follows C except for the plain
//! rotates, which leave it alone; ASL sets V if the sign bit changes at
//! any step.

use emu_core::Bus;

use crate::addressing::AddrMode;
use crate::alu::Size;
use crate::cpu::Cpu68k;
use crate::exceptions::{Exception, Exec};
use crate::flags::{Status, C, V, X};
use crate::timing::ea_cycles;

/// Shift kind, from the TT field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShiftKind {
    Arithmetic,
    Logical,
    RotateX,
    Rotate,
}

impl ShiftKind {
    fn from_bits(bits: u16) -> Self {
        match bits & 3 {
            0 => Self::Arithmetic,
            1 => Self::Logical,
            2 => Self::RotateX,
            _ => Self::Rotate,
        }
    }
}

impl Cpu68k {
    /// Register shift/rotate.
    pub(crate) fn op_shift_reg(&mut self, op: u16) -> Exec {
        let count_field = op >> 9 & 7;
        let left = op & 0x0100 != 0;
        let size = Size::from_bits(op >> 6).ok_or(Exception::Illegal)?;
        let kind = ShiftKind::from_bits(op >> 3);
        let reg = (op & 7) as u8;

        let count = if op & 0x0020 == 0 {
            // Immediate count, 0 encodes 8
            if count_field == 0 {
                8
            } else {
                u32::from(count_field)
            }
        } else {
            self.regs.d[count_field as usize] % 64
        };

        let value = self.read_data_reg(reg, size);
        let result = self.shift_value(kind, left, value, count, size);
        self.write_data_reg(reg, result, size);

        let base = if size == Size::Long { 8 } else { 6 };
        self.use_cycles(base + 2 * count as i32);
        Ok(())
    }

    /// Memory shift/rotate: word operand, single bit.
    pub(crate) fn op_shift_mem<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        let kind = ShiftKind::from_bits(op >> 9);
        let left = op & 0x0100 != 0;
        let ea = AddrMode::decode((op >> 3) as u8, op as u8).ok_or(Exception::Illegal)?;
        if !ea.is_memory_alterable() {
            return Err(Exception::Illegal);
        }

        let target = self.ea_resolve(bus, ea, Size::Word)?;
        let value = self.ea_target_read(bus, target, Size::Word)?;
        let result = self.shift_value(kind, left, value, 1, Size::Word);
        self.ea_target_write(bus, target, Size::Word, result)?;
        self.use_cycles(8 + ea_cycles(ea, Size::Word));
        Ok(())
    }

    /// Apply a shift/rotate and its full flag discipline, returning the
    /// masked result.
    fn shift_value(&mut self, kind: ShiftKind, left: bool, value: u32, count: u32, size: Size) -> u32 {
        let mask = size.mask();
        let sign = size.sign_bit();
        let mut v = value & mask;
        let mut x = self.x_bit() != 0;
        let mut carry = false;
        let mut overflow = false;

        for _ in 0..count {
            match (kind, left) {
                (ShiftKind::Arithmetic, true) => {
                    carry = v & sign != 0;
                    // Sign change at any step sets V
                    if (v ^ v << 1) & sign != 0 {
                        overflow = true;
                    }
                    v = v << 1 & mask;
                }
                (ShiftKind::Logical, true) => {
                    carry = v & sign != 0;
                    v = v << 1 & mask;
                }
                (ShiftKind::Rotate, true) => {
                    carry = v & sign != 0;
                    v = (v << 1 | u32::from(carry)) & mask;
                }
                (ShiftKind::RotateX, true) => {
                    carry = v & sign != 0;
                    v = (v << 1 | u32::from(x)) & mask;
                    x = carry;
                }
                (ShiftKind::Arithmetic, false) => {
                    carry = v & 1 != 0;
                    v = v >> 1 | v & sign;
                }
                (ShiftKind::Logical, false) => {
                    carry = v & 1 != 0;
                    v >>= 1;
                }
                (ShiftKind::Rotate, false) => {
                    carry = v & 1 != 0;
                    v = v >> 1 | u32::from(carry) * sign;
                }
                (ShiftKind::RotateX, false) => {
                    carry = v & 1 != 0;
                    v = v >> 1 | u32::from(x) * sign;
                    x = carry;
                }
            }
        }

        let mut sr = self.regs.sr;
        if count == 0 {
            // C cleared, except ROXd reflects X; X and V untouched
            let c = kind == ShiftKind::RotateX && x;
            sr = Status::set_if(sr, C, c);
            sr = Status::set_if(sr, V, false);
        } else {
            sr = Status::set_if(sr, C, carry);
            sr = Status::set_if(sr, V, kind == ShiftKind::Arithmetic && left && overflow);
            match kind {
                ShiftKind::Arithmetic | ShiftKind::Logical => {
                    sr = Status::set_if(sr, X, carry);
                }
                ShiftKind::RotateX => {
                    sr = Status::set_if(sr, X, x);
                }
                ShiftKind::Rotate => {}
            }
        }
        self.regs.sr = Status::update_nz(sr, v, size);
        v
    }
}
