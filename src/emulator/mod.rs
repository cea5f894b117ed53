//! The fetch, decode, execute machinery of the LC-3.

use crate::emulator::instruction::Instruction;
use crate::errors::{ExecutionError, Fault, LoadProgramError};
use crate::hardware::console::Console;
use crate::hardware::memory::{Memory, PROGRAM_SECTION_START};
use crate::hardware::registers::Registers;
use crate::terminal::TerminalConsole;
use std::cell::RefCell;
use std::fs;
use std::ops::ControlFlow;
use std::path::Path;
use std::rc::Rc;

pub mod instruction;
pub mod opcodes;
pub mod trap_routines;

#[cfg(test)]
pub(crate) mod test_helpers;

/// The 16 opcode slots selected by the top four instruction bits.
///
/// `Rti` and `Reserved` are not part of the implemented instruction set,
/// dispatching either one faults the machine.
#[repr(u8)]
#[derive(enumn::N, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Br = 0,
    Add = 1,
    Ld = 2,
    St = 3,
    Jsr = 4,
    And = 5,
    Ldr = 6,
    Str = 7,
    Rti = 8,
    Not = 9,
    Ldi = 10,
    Sti = 11,
    Jmp = 12,
    Reserved = 13,
    Lea = 14,
    Trap = 15,
}

/// Execution state of the machine, `Halted` and `Faulted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Running,
    /// The HALT trap ran.
    Halted,
    /// A reserved opcode or unknown trap vector was dispatched.
    Faulted(Fault),
}

/// The public facing emulator used to run LC-3 programs.
///
/// Owns all mutable machine state, so independent instances can run side
/// by side. All I/O goes through the injected [`Console`].
pub struct Emulator<C: Console> {
    pub(crate) memory: Memory<C>,
    pub(crate) registers: Registers,
    pub(crate) console: Rc<RefCell<C>>,
    state: RunState,
    origin: u16,
    instructions_executed: u64,
}

impl<C: Console> Emulator<C> {
    /// Creates a machine with zeroed memory and registers talking to `console`.
    pub fn with_console(console: C) -> Self {
        let console = Rc::new(RefCell::new(console));
        Self {
            memory: Memory::new(Rc::clone(&console)),
            registers: Registers::new(),
            console,
            state: RunState::default(),
            origin: PROGRAM_SECTION_START,
            instructions_executed: 0,
        }
    }

    /// Loads a program image into memory.
    ///
    /// The first word of the image is the origin address, the remaining words
    /// are loaded starting there. PC is initialized to the origin.
    ///
    /// # Errors
    /// - Program is missing the leading `.ORIG` word
    /// - Program does not fit between its origin and the program section end
    pub fn load_image(&mut self, image: &[u16]) -> Result<(), LoadProgramError> {
        let Some((origin, rest)) = image.split_first() else {
            return Err(LoadProgramError::MissingOrigHeader);
        };
        self.memory.load_at(*origin, rest)?;
        self.origin = *origin;
        self.reset_registers();
        Ok(())
    }

    /// Resets registers, flags and PC to the load origin so the loaded
    /// program can run again. Memory contents are kept.
    pub fn reset_registers(&mut self) {
        self.registers = Registers::with_pc(self.origin);
        self.state = RunState::default();
        self.instructions_executed = 0;
    }

    #[must_use]
    pub const fn registers(&self) -> &Registers {
        &self.registers
    }

    #[must_use]
    pub const fn state(&self) -> RunState {
        self.state
    }

    /// Number of completed fetch, decode, execute cycles since the last
    /// (re-)initialization.
    #[must_use]
    pub const fn instructions_executed(&self) -> u64 {
        self.instructions_executed
    }

    /// Runs fetch, decode, execute cycles until the program halts or faults.
    ///
    /// A normal HALT returns `Ok(())`, every other termination is an error,
    /// so callers can tell "program completed" from "program crashed".
    /// A machine that already faulted returns the same fault again.
    ///
    /// # Errors
    /// - a reserved opcode or unknown trap vector was dispatched
    /// - console input or output failed
    /// - CTRL-C was triggered on the console
    pub fn execute(&mut self) -> Result<(), ExecutionError> {
        if let RunState::Faulted(fault) = self.state {
            return Err(ExecutionError::Fault(fault));
        }
        while self.state == RunState::Running {
            if self.console.borrow().is_interrupted() {
                return Err(ExecutionError::Interrupted);
            }
            self.step()?;
        }
        Ok(())
    }

    /// Executes a single fetch, decode, execute cycle.
    ///
    /// In a terminal state no fetch happens: a halted machine reports
    /// `Ok(())`, a faulted one its fault.
    ///
    /// # Errors
    /// See [`Emulator::execute`].
    pub fn step(&mut self) -> Result<(), ExecutionError> {
        match self.state {
            RunState::Halted => return Ok(()),
            RunState::Faulted(fault) => return Err(ExecutionError::Fault(fault)),
            RunState::Running => {}
        }
        let pc = self.registers.pc().as_binary();
        let i = Instruction::from(self.memory.read(pc));
        self.registers.set_pc(pc.wrapping_add(1));
        self.instructions_executed += 1;
        let r = &mut self.registers;
        let opcode = OpCode::n(i.op_code()).expect("a four bit value always names an opcode slot");
        match opcode {
            OpCode::Add => opcodes::add(i, r),
            OpCode::And => opcodes::and(i, r),
            OpCode::Not => opcodes::not(i, r),
            OpCode::Br => opcodes::br(i, r),
            OpCode::Jmp => opcodes::jmp_or_ret(i, r),
            OpCode::Jsr => opcodes::jsr(i, r),
            OpCode::Lea => opcodes::lea(i, r),
            OpCode::Ld => opcodes::ld(i, r, &self.memory),
            OpCode::Ldi => opcodes::ldi(i, r, &self.memory),
            OpCode::Ldr => opcodes::ldr(i, r, &self.memory),
            OpCode::St => opcodes::st(i, r, &mut self.memory),
            OpCode::Sti => opcodes::sti(i, r, &mut self.memory),
            OpCode::Str => opcodes::str(i, r, &mut self.memory),
            OpCode::Rti | OpCode::Reserved => {
                return Err(self.fault(Fault::ReservedOpcode {
                    opcode: i.op_code(),
                    pc,
                }));
            }
            OpCode::Trap => {
                let flow = trap_routines::dispatch(
                    i,
                    &mut self.registers,
                    &self.memory,
                    &mut *self.console.borrow_mut(),
                    pc,
                );
                if let ControlFlow::Break(result) = flow {
                    return match result {
                        Ok(()) => {
                            self.state = RunState::Halted;
                            Ok(())
                        }
                        Err(ExecutionError::Fault(fault)) => Err(self.fault(fault)),
                        Err(e) => Err(e),
                    };
                }
            }
        }
        Ok(())
    }

    fn fault(&mut self, fault: Fault) -> ExecutionError {
        self.state = RunState::Faulted(fault);
        ExecutionError::Fault(fault)
    }
}

/// Creates a terminal backed emulator from a program image file.
///
/// The image is a sequence of big-endian 16 bit words, the first word is
/// the origin address.
///
/// # Errors
/// - the file cannot be read
/// - the image is empty, truncated or too long, see [`Emulator::load_image`]
pub fn from_program<P: AsRef<Path>>(path: P) -> Result<Emulator<TerminalConsole>, LoadProgramError> {
    let bytes = fs::read(path)?;
    from_program_words(&parse_image(&bytes)?)
}

/// Creates a terminal backed emulator from an already decoded program image.
///
/// # Errors
/// See [`Emulator::load_image`].
pub fn from_program_words(image: &[u16]) -> Result<Emulator<TerminalConsole>, LoadProgramError> {
    let mut emulator = Emulator::with_console(TerminalConsole::new());
    emulator.load_image(image)?;
    Ok(emulator)
}

/// Decodes the big-endian byte stream of a program image file into words.
fn parse_image(bytes: &[u8]) -> Result<Vec<u16>, LoadProgramError> {
    if bytes.is_empty() {
        return Err(LoadProgramError::MissingOrigHeader);
    }
    if bytes.len() % 2 != 0 {
        return Err(LoadProgramError::TruncatedImage);
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect())
}
