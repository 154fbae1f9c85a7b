//! Core traits and types for instruction-level emulation.
//!
//! Components communicate through a big-endian byte-addressable [`Bus`] and
//! expose their internal state through [`Observable`]. CPU cores consume
//! these traits; machines and test harnesses implement them.

mod bus;
mod observable;

pub use bus::{Bus, SimpleBus};
pub use observable::{Observable, Value};
