use lc3_vm::emulator;
use std::env;
use std::process::ExitCode;

fn main() -> ExitCode {
    let Some(path) = env::args().nth(1) else {
        eprintln!("Usage: lc3-vm <program.obj>");
        return ExitCode::FAILURE;
    };
    let mut emu = match emulator::from_program(&path) {
        Ok(emu) => emu,
        Err(e) => {
            eprintln!("Error loading {path}: {e}");
            return ExitCode::FAILURE;
        }
    };
    match emu.execute() {
        Ok(()) => {
            println!("\nProgram halted");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("\n{e}");
            ExitCode::FAILURE
        }
    }
}
