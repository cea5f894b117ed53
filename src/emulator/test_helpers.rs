use crate::emulator::Emulator;
use crate::hardware::console::ScriptedConsole;

/// Emulator over a scripted console with the program placed at `0x3000`.
pub struct FakeEmulator {
    pub inner: Emulator<ScriptedConsole>,
}

impl FakeEmulator {
    pub fn new(program_no_header: &[u16]) -> Self {
        let mut program = Vec::with_capacity(program_no_header.len() + 1);
        program.push(0x3000u16);
        if program_no_header.is_empty() {
            program.push(0);
        } else {
            program.extend_from_slice(program_no_header);
        }

        let mut inner = Emulator::with_console(ScriptedConsole::new());
        inner
            .load_image(program.as_slice())
            .expect("Error loading program");
        Self { inner }
    }

    pub fn add_input(&mut self, input: &str) {
        self.inner.console.borrow_mut().add_input(input);
    }

    pub fn output(&self) -> String {
        self.inner.console.borrow().output()
    }
}
