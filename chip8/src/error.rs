//! Result and errors.
use std::fmt::{self, Display, Formatter};

use crate::constants::Address;

pub type Chip8Result<T> = std::result::Result<T, Chip8Error>;

#[derive(Debug)]
pub enum Chip8Error {
    /// The instruction matches none of the known opcode patterns.
    UnknownOpcode { opcode: u16, address: Address },
    /// Attempt to read or write outside of VM memory.
    MemoryFault { address: usize },
    /// Return instruction executed with an empty call stack.
    StackUnderflow { address: Address },
    /// Subroutine call nested deeper than the configured stack depth.
    StackOverflow { address: Address, depth: usize },
    /// Attempt to load a bytecode program that can't fit in memory.
    LargeProgram { size: usize },
    Fmt(fmt::Error),
}

impl Display for Chip8Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownOpcode { opcode, address } => {
                write!(f, "unknown opcode {opcode:04X} at 0x{address:03X}")
            }
            Self::MemoryFault { address } => {
                write!(f, "memory fault: address 0x{address:04X} is out of bounds")
            }
            Self::StackUnderflow { address } => {
                write!(f, "call stack underflow at 0x{address:03X}")
            }
            Self::StackOverflow { address, depth } => write!(
                f,
                "call stack overflow at 0x{address:03X}, depth limit is {depth}"
            ),
            Self::LargeProgram { size } => {
                write!(f, "program of {size} bytes is too large for VM memory")
            }
            Self::Fmt(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Chip8Error {}

impl From<fmt::Error> for Chip8Error {
    fn from(err: fmt::Error) -> Self {
        Chip8Error::Fmt(err)
    }
}
