use std::collections::VecDeque;
use std::io;

/// Console capability the machine performs all of its I/O against.
///
/// The trap routines and the memory-mapped keyboard registers only ever talk
/// to this trait, so the engine runs headless against a [`ScriptedConsole`]
/// in tests while the binary injects a
/// [`crate::terminal::TerminalConsole`].
pub trait Console {
    /// Blocking read of a single character.
    fn read_char(&mut self) -> io::Result<u8>;
    /// Writes a single character to the display.
    fn write_char(&mut self, character: u8) -> io::Result<()>;
    /// Checks if input is available, does not block.
    fn poll_available(&mut self) -> io::Result<bool>;
    /// True if CTRL-C was triggered.
    fn is_interrupted(&self) -> bool {
        false
    }
    /// Writes a whole string to the display.
    fn write_str(&mut self, message: &str) -> io::Result<()> {
        for b in message.bytes() {
            self.write_char(b)?;
        }
        Ok(())
    }
}

/// In-memory console fed from a prepared input script, capturing all output.
pub struct ScriptedConsole {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

impl ScriptedConsole {
    #[must_use]
    pub fn new() -> Self {
        Self::with_input("")
    }
    #[must_use]
    pub fn with_input(input: &str) -> Self {
        Self {
            input: input.bytes().collect(),
            output: Vec::with_capacity(120),
        }
    }
    /// Appends to the pending input script.
    pub fn add_input(&mut self, input: &str) {
        self.input.extend(input.bytes());
    }
    /// All output written so far.
    #[must_use]
    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl Default for ScriptedConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for ScriptedConsole {
    fn read_char(&mut self) -> io::Result<u8> {
        self.input
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "scripted input exhausted"))
    }
    fn write_char(&mut self, character: u8) -> io::Result<()> {
        self.output.push(character);
        Ok(())
    }
    fn poll_available(&mut self) -> io::Result<bool> {
        Ok(!self.input.is_empty())
    }
}
