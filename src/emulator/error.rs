//! Errors surfaced at the virtual machine boundary.

/// Failures raised while loading a ROM image.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("ROM is {size} bytes, at most {max} bytes fit above the program base")]
    RomTooLarge { size: usize, max: usize },

    #[error("failed to read ROM: {0}")]
    RomReadFailed(#[from] std::io::Error),
}

/// Faults raised by a step. A fault latches: the machine refuses to execute
/// further instructions until it is reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Fault {
    #[error("call with all 16 stack slots in use")]
    StackOverflow,

    #[error("return with an empty call stack")]
    StackUnderflow,

    #[error("program counter {pc:#06X} points past the end of memory")]
    BadPc { pc: u16 },

    #[error("illegal opcode {opcode:#06X}")]
    IllegalOpcode { opcode: u16 },
}
