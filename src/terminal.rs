//! Crossterm backed console for interactive terminal sessions.

use crate::hardware::console::Console;
use crossterm::event::{self, KeyCode, KeyModifiers};
use crossterm::terminal;
use std::io;
use std::io::Write;
use std::time::Duration;

/// Scoped raw mode, restores the terminal state on drop.
pub struct RawLock {}

impl Drop for RawLock {
    fn drop(&mut self) {
        // terminal stays in raw mode but no means to repair
        if let Err(e) = terminal::disable_raw_mode() {
            eprintln!("Error resetting terminal {e}");
        }
    }
}

/// Set terminal to raw in best-effort mode, only log on failure, since it
/// does not work for cargo doc tests and disabling does not work because of a
/// [rust issue](https://github.com/rust-lang/rust/issues/67295).
pub fn set_terminal_raw() -> RawLock {
    if let Err(e) = terminal::enable_raw_mode() {
        eprintln!("Could not set terminal to raw mode: {e}");
    }
    RawLock {}
}

/// Console implementation reading keyboard events and writing to Stdout.
///
/// A key consumed while polling the event queue is latched until the next
/// read so the keyboard data register sees what the status register
/// reported. CTRL-C sets the interrupt flag checked by the execution loop
/// between instructions.
pub struct TerminalConsole {
    stdout: io::Stdout,
    pending: Option<u8>,
    interrupted: bool,
}

impl TerminalConsole {
    #[must_use]
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
            pending: None,
            interrupted: false,
        }
    }

    fn next_key_press(&mut self) -> io::Result<Option<u8>> {
        if let Some(event) = event::read()?.as_key_press_event() {
            if event.modifiers == KeyModifiers::CONTROL && event.code.as_char() == Some('c') {
                self.interrupted = true;
                return Err(io::Error::new(io::ErrorKind::Interrupted, "CTRL-C"));
            }
            if event.code == KeyCode::Enter {
                return Ok(Some(b'\n'));
            }
            if let Some(c) = event.code.as_char()
                && let Ok(b) = u8::try_from(c)
            {
                return Ok(Some(b));
            }
        }
        Ok(None)
    }
}

impl Default for TerminalConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for TerminalConsole {
    fn read_char(&mut self) -> io::Result<u8> {
        if let Some(b) = self.pending.take() {
            return Ok(b);
        }
        let _lock = set_terminal_raw();
        loop {
            if let Some(b) = self.next_key_press()? {
                return Ok(b);
            }
        }
    }

    fn write_char(&mut self, character: u8) -> io::Result<()> {
        self.stdout.write_all(&[character])?;
        self.stdout.flush()
    }

    fn write_str(&mut self, message: &str) -> io::Result<()> {
        self.stdout.write_all(message.as_bytes())?;
        self.stdout.flush()
    }

    fn poll_available(&mut self) -> io::Result<bool> {
        if self.pending.is_some() {
            return Ok(true);
        }
        let _lock = set_terminal_raw();
        while event::poll(Duration::from_secs(0))? {
            if let Some(b) = self.next_key_press()? {
                self.pending = Some(b);
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn is_interrupted(&self) -> bool {
        self.interrupted
    }
}
