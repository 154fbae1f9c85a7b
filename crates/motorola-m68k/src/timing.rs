//! Published 68000 cycle counts.
//!
//! Timing is instruction-granular: each handler charges a base count plus
//! the standard effective-address overhead from the processor manual.
//! Divide instructions use the documented worst-case bounds.

use crate::addressing::AddrMode;
use crate::alu::Size;

/// Cycles to calculate and fetch an EA operand (table 8-1 style: byte/word
/// column, +4 for long in the memory and immediate modes).
pub(crate) fn ea_cycles(mode: AddrMode, size: Size) -> i32 {
    let long = i32::from(size == Size::Long) * 4;
    match mode {
        AddrMode::DataReg(_) | AddrMode::AddrReg(_) => 0,
        AddrMode::AddrInd(_) | AddrMode::AddrIndPostInc(_) => 4 + long,
        AddrMode::AddrIndPreDec(_) => 6 + long,
        AddrMode::AddrIndDisp(_) | AddrMode::AbsShort | AddrMode::PcDisp => 8 + long,
        AddrMode::AddrIndIndex(_) | AddrMode::PcIndex => 10 + long,
        AddrMode::AbsLong => 12 + long,
        AddrMode::Immediate => 4 + long,
    }
}

/// Destination overhead for MOVE (predecrement costs the same as
/// postincrement on stores).
pub(crate) fn move_dest_cycles(mode: AddrMode, size: Size) -> i32 {
    match mode {
        AddrMode::AddrIndPreDec(_) => 4 + i32::from(size == Size::Long) * 4,
        _ => ea_cycles(mode, size),
    }
}

/// Address-calculation overhead for LEA/PEA/MOVEM control modes.
pub(crate) fn control_ea_cycles(mode: AddrMode) -> i32 {
    match mode {
        AddrMode::AddrInd(_) => 0,
        AddrMode::AddrIndDisp(_) | AddrMode::AbsShort | AddrMode::PcDisp => 4,
        AddrMode::AddrIndIndex(_) | AddrMode::PcIndex => 8,
        AddrMode::AbsLong => 8,
        _ => 0,
    }
}

/// Address-calculation overhead for JMP/JSR (indexing is cheaper than the
/// operand-fetch table because nothing is read).
pub(crate) fn jump_ea_cycles(mode: AddrMode) -> i32 {
    match mode {
        AddrMode::AddrInd(_) => 0,
        AddrMode::AddrIndDisp(_) | AddrMode::AbsShort | AddrMode::PcDisp => 2,
        AddrMode::AddrIndIndex(_) | AddrMode::PcIndex => 6,
        AddrMode::AbsLong => 4,
        _ => 0,
    }
}

/// Worst-case DIVU timing.
pub(crate) const DIVU_CYCLES: i32 = 140;
/// Worst-case DIVS timing.
pub(crate) const DIVS_CYCLES: i32 = 158;
/// Early exit when the quotient cannot fit.
pub(crate) const DIV_OVERFLOW_CYCLES: i32 = 10;
/// Worst-case MULU/MULS timing.
pub(crate) const MUL_CYCLES: i32 = 70;
/// RESET instruction: the external reset line is held for 124 cycles.
pub(crate) const RESET_CYCLES: i32 = 132;
