//! Disassembler contract.
//!
//! Disassembly is a read-only view consumed by external tooling; the
//! execution engine never needs it. Only the interface lives here.

use emu_core::Bus;

/// A 68000-family disassembler.
pub trait Disassembler {
    /// Disassemble one instruction at `address`.
    ///
    /// Returns the mnemonic text and the instruction length in bytes
    /// (always a multiple of 2).
    fn disassemble(&mut self, bus: &mut dyn Bus, address: u32) -> (String, u32);
}
