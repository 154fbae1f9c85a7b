//! Host integration hooks.
//!
//! The CPU owns a single capability object for everything the host may want
//! to intercept: interrupt acknowledge, the RESET instruction pulse, PC
//! changes, function-code transitions, per-instruction tracing, BKPT
//! acknowledge, illegal-opcode rescue, and TAS bus arbitration. Every method
//! has a no-op default, so the hot path never tests for a handler.

/// Interrupt-acknowledge return value requesting the autovector for the
/// asserted level.
pub const AUTOVECTOR: u32 = 0xFFFF_FFFF;

/// Interrupt-acknowledge return value signalling a spurious interrupt.
pub const SPURIOUS: u32 = 0xFFFF_FFFE;

/// Host callbacks invoked by the execution engine.
///
/// Hooks run synchronously on the executing thread and may inspect shared
/// host state; they must not re-enter `execute` on the same CPU.
pub trait Hooks: Send {
    /// Acknowledge an interrupt at `level` (1-7).
    ///
    /// Return a vector number, [`AUTOVECTOR`] to synthesise `0x18 + level`,
    /// or [`SPURIOUS`] for the spurious-interrupt vector.
    fn interrupt_ack(&mut self, _level: u8) -> u32 {
        AUTOVECTOR
    }

    /// The guest executed RESET, pulsing the external reset line.
    fn reset_instruction(&mut self) {}

    /// The PC changed through a jump, branch, return, or vector.
    fn pc_changed(&mut self, _new_pc: u32) {}

    /// The function code lines changed (user/supervisor, program/data).
    fn function_code(&mut self, _fc: u8) {}

    /// Called before each instruction with the PC about to be fetched.
    fn instruction_hook(&mut self, _pc: u32) {}

    /// The guest executed BKPT #n (68010+).
    fn breakpoint_ack(&mut self, _data: u32) {}

    /// An unrecognised opcode was fetched.
    ///
    /// Return `true` if the host resolved the situation (the engine then
    /// continues with the next instruction), `false` to raise the standard
    /// illegal-instruction exception.
    fn illegal_instruction(&mut self, _opcode: u16) -> bool {
        false
    }

    /// TAS bus arbitration.
    ///
    /// A non-negative return value overrides the byte TAS would write back;
    /// return a negative value for the normal read-modify-write.
    fn tas(&mut self) -> i32 {
        -1
    }
}

/// Default hook set: every callback is a no-op.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl Hooks for NoHooks {}
