//! The CHIP-8 virtual machine as described at
//! https://en.wikipedia.org/wiki/CHIP-8#Virtual_machine_description:
//! machine state, instruction decoder, executor, frontend ports, and the
//! quirk toggles that pick between historical interpreter behaviors.

pub mod emulator;
pub mod error;
pub mod instruction;
pub mod ports;
pub mod quirks;
pub mod state;
