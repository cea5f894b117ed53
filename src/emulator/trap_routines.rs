//! Trap vector table and the I/O routines behind the TRAP opcode.

use crate::emulator::instruction::Instruction;
use crate::errors::{ExecutionError, Fault};
use crate::hardware::console::Console;
use crate::hardware::memory::Memory;
use crate::hardware::registers::{Registers, from_binary};
use std::io;
use std::ops::ControlFlow;

/// Trap vectors of the baseline vector table.
#[repr(u8)]
#[derive(enumn::N, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapVector {
    /// Read one character, no echo
    GetC = 0x20,
    /// Write the character in R0
    Out = 0x21,
    /// Write a zero-terminated string, one character per word
    PutS = 0x22,
    /// Prompt for and read one character, echoed
    In = 0x23,
    /// Write a zero-terminated string, two packed characters per word
    PutSp = 0x24,
    /// Stop the machine
    Halt = 0x25,
}

/// Routes a TRAP instruction to its vector routine.
///
/// `pc` is the address the TRAP was fetched from, for fault diagnostics.
/// `Break(Ok(()))` means HALT ran and no further cycle may start.
pub fn dispatch<C: Console>(
    i: Instruction,
    regs: &mut Registers,
    mem: &Memory<C>,
    console: &mut impl Console,
    pc: u16,
) -> ControlFlow<Result<(), ExecutionError>> {
    match TrapVector::n(i.trap_vector()) {
        Some(TrapVector::GetC) => get_c(regs, console),
        Some(TrapVector::Out) => out(regs, console),
        Some(TrapVector::PutS) => put_s(regs, mem, console),
        Some(TrapVector::In) => in_trap(regs, console),
        Some(TrapVector::PutSp) => put_sp(regs, mem, console),
        Some(TrapVector::Halt) => halt(),
        None => ControlFlow::Break(Err(ExecutionError::Fault(Fault::UnknownTrapVector {
            vector: i.trap_vector(),
            pc,
        }))),
    }
}

fn read_character_from_console(
    regs: &mut Registers,
    console: &mut impl Console,
    echo: bool,
) -> ControlFlow<Result<(), ExecutionError>> {
    // Workaround for still unstable try blocks
    match (|| -> io::Result<()> {
        let b = console.read_char()?;
        if echo {
            console.write_char(b)?;
        }
        regs.set(0, from_binary(u16::from(b)));
        Ok(())
    })() {
        Ok(()) => ControlFlow::Continue(()),
        Err(e) => wrap_io_error_in_cf(&e),
    }
}

/// GETC: Read a single character from the keyboard. The character is not echoed onto the console.
///
/// Its ASCII code is copied into R0. The high eight bits of R0 are cleared.
/// The condition flags are not touched.
pub fn get_c(
    regs: &mut Registers,
    console: &mut impl Console,
) -> ControlFlow<Result<(), ExecutionError>> {
    read_character_from_console(regs, console, false)
}

/// IN: Print a prompt on the screen and read a single character echoed back to the console.
///
/// Otherwise, like 0x20 GETC.
pub fn in_trap(
    regs: &mut Registers,
    console: &mut impl Console,
) -> ControlFlow<Result<(), ExecutionError>> {
    write_str_out("Input: ", console)?;
    read_character_from_console(regs, console, true)
}

/// OUT: Write the character in R0[7:0] to the console display.
pub fn out(regs: &Registers, console: &mut impl Console) -> ControlFlow<Result<(), ExecutionError>> {
    let [low, _] = regs.get(0).as_binary().to_le_bytes();
    match console.write_char(low) {
        Ok(()) => ControlFlow::Continue(()),
        Err(e) => wrap_io_error_in_cf(&e),
    }
}

fn put_one_char_per_u16(input: u16, append_to: &mut String) -> bool {
    let [low, _] = input.to_le_bytes();
    append_to.push(char::from(low));
    true
}

fn put_two_chars_per_u16(input: u16, append_to: &mut String) -> bool {
    let [low, high] = input.to_le_bytes();
    if low == 0 {
        return false;
    }
    append_to.push(char::from(low));
    if high == 0 {
        return false;
    }
    append_to.push(char::from(high));
    true
}

fn put<C: Console>(
    regs: &Registers,
    mem: &Memory<C>,
    console: &mut impl Console,
    handle_char: fn(u16, &mut String) -> bool,
) -> ControlFlow<Result<(), ExecutionError>> {
    let mut address = regs.get(0).as_binary();
    let mut s = String::with_capacity(120);
    loop {
        let word = mem.read(address);
        if word == 0 || !handle_char(word, &mut s) {
            break;
        }
        address = address.wrapping_add(1);
    }
    write_str_out(s.as_str(), console)
}

/// PUTS: print the zero-terminated string at the address in R0, one character per word.
pub fn put_s<C: Console>(
    regs: &Registers,
    mem: &Memory<C>,
    console: &mut impl Console,
) -> ControlFlow<Result<(), ExecutionError>> {
    put(regs, mem, console, put_one_char_per_u16)
}

/// PUTSP: Packed version of PUTS.
///
/// The ASCII code contained in bits [7:0] of a memory location is written to the console first.
/// The second character of the last memory location can be 0x00.
/// Writing terminates with a 0x00 byte.
pub fn put_sp<C: Console>(
    regs: &Registers,
    mem: &Memory<C>,
    console: &mut impl Console,
) -> ControlFlow<Result<(), ExecutionError>> {
    put(regs, mem, console, put_two_chars_per_u16)
}

/// HALT: End the program, no further cycles run.
pub fn halt() -> ControlFlow<Result<(), ExecutionError>> {
    ControlFlow::Break(Ok(()))
}

fn write_str_out(
    message: &str,
    console: &mut impl Console,
) -> ControlFlow<Result<(), ExecutionError>> {
    match console.write_str(message) {
        Ok(()) => ControlFlow::Continue(()),
        Err(e) => wrap_io_error_in_cf(&e),
    }
}

fn wrap_io_error_in_cf(error: &io::Error) -> ControlFlow<Result<(), ExecutionError>, ()> {
    if error.kind() == io::ErrorKind::Interrupted {
        return ControlFlow::Break(Err(ExecutionError::Interrupted));
    }
    ControlFlow::Break(Err(ExecutionError::IOInputOutputError(error.to_string())))
}
