use displaydoc::Display;
use std::error::Error;
use std::io;

/// Errors while reading a program image into memory.
#[derive(Display, Debug)]
pub enum LoadProgramError {
    /// Program is missing valid .ORIG header
    MissingOrigHeader,
    /// Program image ends in the middle of a 16 bit word
    TruncatedImage,
    /// Program too long, got {actual_instructions} u16 instructions while limit is {maximum_instructions}
    ProgramTooLong {
        actual_instructions: usize,
        maximum_instructions: usize,
    },
    /// Error reading program image: {0}
    Io(io::Error),
}

impl Error for LoadProgramError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for LoadProgramError {
    fn from(error: io::Error) -> Self {
        Self::Io(error)
    }
}

/// Conditions that stop the machine abnormally, carrying the offending
/// bit pattern and the address the instruction was fetched from.
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Reserved opcode {opcode:#06b} fetched from address {pc:#06X}
    ReservedOpcode { opcode: u8, pc: u16 },
    /// Unknown trap vector {vector:#04X} called from address {pc:#06X}
    UnknownTrapVector { vector: u8, pc: u16 },
}

impl Error for Fault {}

/// Errors surfaced by the execution loop, distinct from a normal HALT.
#[derive(Display, Debug, PartialEq, Eq)]
pub enum ExecutionError {
    /// Error during reading Stdin or writing program output to Stdout: {0}
    IOInputOutputError(String),
    /// {0}
    Fault(Fault),
    /// Execution interrupted from the keyboard
    Interrupted,
}

impl Error for ExecutionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Fault(fault) => Some(fault),
            _ => None,
        }
    }
}

impl From<Fault> for ExecutionError {
    fn from(fault: Fault) -> Self {
        Self::Fault(fault)
    }
}
