//! # LC-3 Virtual Machine.
//!
//! `lc3-vm` emulates the LC-3 system: fetch, decode and execute cycles over a
//! 16-bit address space with memory-mapped keyboard registers and trap-based I/O.
//! Usage starts with loading a program image via [`emulator::from_program`] or
//! [`emulator::Emulator::load_image`] and driving it with
//! [`emulator::Emulator::execute`].
//!
//! # Example
//! ```
//! use lc3_vm::emulator::{Emulator, RunState};
//! use lc3_vm::hardware::console::ScriptedConsole;
//!
//! // .ORIG x3000 ; LEA R0, #2 ; PUTS ; HALT ; "Hi!"
//! let image = [0x3000, 0xE002, 0xF022, 0xF025, 0x48, 0x69, 0x21, 0x0];
//! let mut emu = Emulator::with_console(ScriptedConsole::new());
//! emu.load_image(&image).unwrap();
//! emu.execute().unwrap();
//! assert_eq!(emu.state(), RunState::Halted);
//! ```
//! # Errors
//! - Program image is missing the leading `.ORIG` word or is truncated
//! - Program does not fit into the program section
//! - A reserved opcode or unknown trap vector faults the running machine

pub mod emulator;
pub mod errors;
pub mod hardware;
pub(crate) mod numbers;
pub mod terminal;
