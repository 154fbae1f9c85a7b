//! Everything else in group 4: LEA, PEA, LINK/UNLK, SWAP, EXG, EXT,
//! MOVEM, TAS, CHK, TRAP/TRAPV, STOP, RESET, NOP, BKPT, MOVE USP.

use emu_core::Bus;

use crate::addressing::AddrMode;
use crate::alu::{sign_extend_16, sign_extend_8, Size};
use crate::cpu::Cpu68k;
use crate::exceptions::{Exception, Exec};
use crate::flags::{Status, N, V};
use crate::timing::{control_ea_cycles, ea_cycles, RESET_CYCLES};

impl Cpu68k {
    /// LEA: resolve a control EA into An.
    pub(crate) fn op_lea<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        let reg = (op >> 9 & 7) as usize;
        let ea = AddrMode::decode((op >> 3) as u8, op as u8).ok_or(Exception::Illegal)?;
        let addr = self.control_address(bus, ea)?;
        self.regs.a[reg] = addr;
        self.use_cycles(4 + control_ea_cycles(ea));
        Ok(())
    }

    /// PEA: push a resolved control EA.
    pub(crate) fn op_pea<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        let ea = AddrMode::decode((op >> 3) as u8, op as u8).ok_or(Exception::Illegal)?;
        let addr = self.control_address(bus, ea)?;
        self.push_long(bus, addr)?;
        self.use_cycles(12 + control_ea_cycles(ea));
        Ok(())
    }

    /// LINK: push An, copy SP to An, bump SP by the displacement.
    pub(crate) fn op_link<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        let reg = (op & 7) as usize;
        let disp = sign_extend_16(u32::from(self.fetch_word(bus)?));
        self.push_long(bus, self.regs.a[reg])?;
        self.regs.a[reg] = self.regs.a[7];
        self.regs.a[7] = self.regs.a[7].wrapping_add(disp);
        self.use_cycles(16);
        Ok(())
    }

    /// UNLK: copy An to SP, pop An.
    pub(crate) fn op_unlk<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        let reg = (op & 7) as usize;
        self.regs.a[7] = self.regs.a[reg];
        self.regs.a[reg] = self.pop_long(bus)?;
        self.use_cycles(12);
        Ok(())
    }

    /// SWAP: exchange the halves of Dn.
    pub(crate) fn op_swap(&mut self, op: u16) -> Exec {
        let reg = (op & 7) as usize;
        let value = self.regs.d[reg];
        let result = value << 16 | value >> 16;
        self.regs.d[reg] = result;
        self.set_flags_logical(result, Size::Long);
        self.use_cycles(4);
        Ok(())
    }

    /// EXG: swap two registers (D-D, A-A, or D-A by the mode field).
    pub(crate) fn op_exg(&mut self, op: u16) -> Exec {
        let rx = (op >> 9 & 7) as usize;
        let ry = (op & 7) as usize;
        match op >> 3 & 0x1F {
            0x08 => self.regs.d.swap(rx, ry),
            0x09 => self.regs.a.swap(rx, ry),
            0x11 => {
                let d = self.regs.d[rx];
                self.regs.d[rx] = self.regs.a[ry];
                self.regs.a[ry] = d;
            }
            _ => return Err(Exception::Illegal),
        }
        self.use_cycles(6);
        Ok(())
    }

    /// EXT: sign-extend byte to word or word to long in Dn.
    pub(crate) fn op_ext(&mut self, op: u16) -> Exec {
        let reg = (op & 7) as usize;
        if op & 0x0040 == 0 {
            let value = sign_extend_8(self.regs.d[reg]) & 0xFFFF;
            self.regs.d[reg] = self.regs.d[reg] & 0xFFFF_0000 | value;
            self.set_flags_logical(value, Size::Word);
        } else {
            let value = sign_extend_16(self.regs.d[reg]);
            self.regs.d[reg] = value;
            self.set_flags_logical(value, Size::Long);
        }
        self.use_cycles(4);
        Ok(())
    }

    /// MOVEM: move a register list to or from memory.
    ///
    /// The mask word follows the opcode; for the predecrement form it is
    /// reversed (bit 0 = A7) and registers store their values from before
    /// the instruction. Word loads sign-extend into the full register. A
    /// postincrement base register in the list ends up holding the final
    /// address.
    pub(crate) fn op_movem<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        let to_regs = op & 0x0400 != 0;
        let size = if op & 0x0040 != 0 {
            Size::Long
        } else {
            Size::Word
        };
        let mask = self.fetch_word(bus)?;
        let ea = AddrMode::decode((op >> 3) as u8, op as u8).ok_or(Exception::Illegal)?;
        let step = size.bytes();
        let per_reg = if size == Size::Long { 8 } else { 4 };
        let count = i32::from(mask.count_ones() as u16);

        if to_regs {
            let mut addr = match ea {
                AddrMode::AddrIndPostInc(r) => self.regs.a[r as usize],
                m if m.is_control() => self.control_address(bus, m)?,
                _ => return Err(Exception::Illegal),
            };
            for i in 0..16 {
                if mask & 1 << i == 0 {
                    continue;
                }
                let raw = self.read_mem(bus, addr, size)?;
                let value = if size == Size::Word {
                    sign_extend_16(raw)
                } else {
                    raw
                };
                if i < 8 {
                    self.regs.d[i] = value;
                } else {
                    self.regs.a[i - 8] = value;
                }
                addr = addr.wrapping_add(step);
            }
            if let AddrMode::AddrIndPostInc(r) = ea {
                self.regs.a[r as usize] = addr;
            }
            self.use_cycles(12 + control_ea_cycles(ea) + per_reg * count);
        } else {
            match ea {
                AddrMode::AddrIndPreDec(r) => {
                    // Reversed mask; stored values predate any decrement.
                    let d = self.regs.d;
                    let a = self.regs.a;
                    let mut addr = self.regs.a[r as usize];
                    for i in 0..16 {
                        if mask & 1 << i == 0 {
                            continue;
                        }
                        let value = if i < 8 { a[7 - i] } else { d[15 - i] };
                        addr = addr.wrapping_sub(step);
                        self.write_mem(bus, addr, size, value)?;
                        self.regs.a[r as usize] = addr;
                    }
                }
                AddrMode::PcDisp | AddrMode::PcIndex => return Err(Exception::Illegal),
                m if m.is_control() => {
                    let mut addr = self.control_address(bus, m)?;
                    for i in 0..16 {
                        if mask & 1 << i == 0 {
                            continue;
                        }
                        let value = if i < 8 {
                            self.regs.d[i]
                        } else {
                            self.regs.a[i - 8]
                        };
                        self.write_mem(bus, addr, size, value)?;
                        addr = addr.wrapping_add(step);
                    }
                }
                _ => return Err(Exception::Illegal),
            }
            self.use_cycles(8 + control_ea_cycles(ea) + per_reg * count);
        }
        Ok(())
    }

    /// TAS: test a byte, set N/Z, then set bit 7. The hook can override
    /// the written value for hosts that arbitrate the bus themselves.
    pub(crate) fn op_tas<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        let ea = AddrMode::decode((op >> 3) as u8, op as u8).ok_or(Exception::Illegal)?;
        let target = self.ea_resolve(bus, ea, Size::Byte)?;
        let value = self.ea_target_read(bus, target, Size::Byte)?;
        self.set_flags_logical(value, Size::Byte);

        let arbitration = self.hooks().tas();
        let written = if arbitration >= 0 {
            arbitration as u32 & 0xFF
        } else {
            value | 0x80
        };
        self.ea_target_write(bus, target, Size::Byte, written)?;

        let cycles = if matches!(ea, AddrMode::DataReg(_)) {
            4
        } else {
            14 + ea_cycles(ea, Size::Byte)
        };
        self.use_cycles(cycles);
        Ok(())
    }

    /// CHK: trap through vector 6 when Dn is outside [0, bound].
    pub(crate) fn op_chk<B: Bus>(&mut self, bus: &mut B, op: u16) -> Exec {
        let reg = (op >> 9 & 7) as usize;
        let ea = AddrMode::decode((op >> 3) as u8, op as u8).ok_or(Exception::Illegal)?;

        let bound = self.ea_read(bus, ea, Size::Word)? as u16 as i16;
        let value = self.regs.d[reg] as u16 as i16;

        if value < 0 {
            self.regs.sr = Status::set_if(self.regs.sr, N, true);
            return Err(Exception::Check);
        }
        if value > bound {
            self.regs.sr = Status::set_if(self.regs.sr, N, false);
            return Err(Exception::Check);
        }
        self.use_cycles(10 + ea_cycles(ea, Size::Word));
        Ok(())
    }

    /// TRAP #n.
    pub(crate) fn op_trap(&mut self, op: u16) -> Exec {
        Err(Exception::Trap((op & 0x0F) as u8))
    }

    /// TRAPV: trap through vector 7 when V is set.
    pub(crate) fn op_trapv(&mut self) -> Exec {
        if self.regs.sr & V != 0 {
            return Err(Exception::Overflow);
        }
        self.use_cycles(4);
        Ok(())
    }

    /// STOP: load SR from the immediate and wait for an enabled interrupt.
    pub(crate) fn op_stop<B: Bus>(&mut self, bus: &mut B) -> Exec {
        if !self.regs.is_supervisor() {
            return Err(Exception::Privilege);
        }
        let sr = self.fetch_word(bus)?;
        self.set_sr_raw(sr);
        self.set_stopped(true);
        self.use_cycles(4);
        Ok(())
    }

    /// RESET: pulse the external reset line through the hook.
    pub(crate) fn op_reset(&mut self) -> Exec {
        if !self.regs.is_supervisor() {
            return Err(Exception::Privilege);
        }
        self.hooks().reset_instruction();
        self.use_cycles(RESET_CYCLES);
        Ok(())
    }

    /// NOP.
    pub(crate) fn op_nop(&mut self) -> Exec {
        self.use_cycles(4);
        Ok(())
    }

    /// BKPT #n (68010+): acknowledge through the hook, then raise illegal.
    pub(crate) fn op_bkpt(&mut self, op: u16) -> Exec {
        if self.cpu_type().has_frame_word() {
            self.hooks().breakpoint_ack(u32::from(op & 7));
        }
        Err(Exception::Illegal)
    }

    /// MOVE USP: transfer between An and the user stack bank (privileged).
    pub(crate) fn op_move_usp(&mut self, op: u16) -> Exec {
        if !self.regs.is_supervisor() {
            return Err(Exception::Privilege);
        }
        let reg = (op & 7) as usize;
        if op & 0x0008 != 0 {
            self.regs.a[reg] = self.regs.usp;
        } else {
            self.regs.usp = self.regs.a[reg];
        }
        self.use_cycles(4);
        Ok(())
    }
}
