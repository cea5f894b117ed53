use crate::errors::LoadProgramError;
use crate::hardware::console::Console;
use std::cell::RefCell;
use std::rc::Rc;

pub const PROGRAM_SECTION_START: u16 = 0x3000;
pub const PROGRAM_SECTION_END: u16 = 0xFDFF;
pub const PROGRAM_SECTION_MAX_INSTRUCTION_COUNT: u16 =
    PROGRAM_SECTION_END - PROGRAM_SECTION_START + 1;
const MEMORY_SIZE: usize = 1 << 16;

/// Memory regions mapped to IO functionality.
#[repr(u16)]
#[derive(enumn::N)]
pub enum MemoryMappedIOLocations {
    /// Keyboard Status Register
    Kbsr = 0xFE00,
    /// Keyboard Data Register
    Kbdr = 0xFE02,
}

/// The full 16 bit address space of the machine, including the memory-mapped
/// keyboard registers.
///
/// Every `u16` address is valid; address arithmetic at the call sites wraps
/// modulo the address space instead of faulting.
pub struct Memory<C: Console> {
    /// Index equals memory address
    data: Vec<u16>,
    console: Rc<RefCell<C>>,
}

impl<C: Console> Memory<C> {
    const KEYBOARD_STATUS_REGISTER_SET: u16 = 1 << 15;
    const KEYBOARD_STATUS_REGISTER_UNSET: u16 = 0;

    pub fn new(console: Rc<RefCell<C>>) -> Self {
        Self {
            data: vec![0x0u16; MEMORY_SIZE],
            console,
        }
    }

    /// Reads the word at `address`.
    ///
    /// Reading the keyboard status register polls the console for pending
    /// input, reading the keyboard data register consumes one pending
    /// character. All other addresses are plain storage.
    #[must_use]
    pub fn read(&self, address: u16) -> u16 {
        match MemoryMappedIOLocations::n(address) {
            None => self.data[usize::from(address)],
            Some(MemoryMappedIOLocations::Kbsr) => {
                if self.key_available() {
                    Self::KEYBOARD_STATUS_REGISTER_SET
                } else {
                    Self::KEYBOARD_STATUS_REGISTER_UNSET
                }
            }
            Some(MemoryMappedIOLocations::Kbdr) => self.consume_key().map_or(0, u16::from),
        }
    }

    /// Writes `value` at `address`.
    ///
    /// The mapped keyboard registers are read-only from the program's
    /// perspective, writes to them are no-ops.
    pub fn write(&mut self, address: u16, value: u16) {
        if MemoryMappedIOLocations::n(address).is_none() {
            self.data[usize::from(address)] = value;
        }
    }

    /// Copies `data` into memory starting at `origin`.
    ///
    /// # Errors
    /// - Program does not fit between `origin` and the program section end
    pub fn load_at(&mut self, origin: u16, data: &[u16]) -> Result<(), LoadProgramError> {
        let capacity = if origin > PROGRAM_SECTION_END {
            0
        } else {
            usize::from(PROGRAM_SECTION_END - origin) + 1
        };
        if data.len() > capacity {
            return Err(LoadProgramError::ProgramTooLong {
                actual_instructions: data.len(),
                maximum_instructions: capacity,
            });
        }
        let start = usize::from(origin);
        self.data[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn key_available(&self) -> bool {
        self.console
            .try_borrow_mut()
            .is_ok_and(|mut console| console.poll_available().unwrap_or(false))
    }

    fn consume_key(&self) -> Option<u8> {
        let mut console = self.console.try_borrow_mut().ok()?;
        if console.poll_available().unwrap_or(false) {
            console.read_char().ok()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::console::ScriptedConsole;

    fn empty_memory() -> Memory<ScriptedConsole> {
        Memory::new(Rc::new(RefCell::new(ScriptedConsole::new())))
    }

    #[test]
    pub fn test_plain_storage_round_trip() {
        let mut mem = empty_memory();
        mem.write(0x3000, 4711);
        mem.write(0xFFFF, 815);
        mem.write(0x0000, 42);
        assert_eq!(mem.read(0x3000), 4711);
        assert_eq!(mem.read(0xFFFF), 815);
        assert_eq!(mem.read(0x0000), 42);
        assert_eq!(mem.read(0x3001), 0);
    }

    #[test]
    pub fn test_keyboard_status_and_data_registers() {
        let console = Rc::new(RefCell::new(ScriptedConsole::with_input("x")));
        let mem = Memory::new(Rc::clone(&console));
        assert_eq!(mem.read(0xFE00), 0x8000);
        assert_eq!(mem.read(0xFE02), u16::from(b'x'));
        // input consumed, availability cleared
        assert_eq!(mem.read(0xFE00), 0);
        assert_eq!(mem.read(0xFE02), 0);
    }

    #[test]
    pub fn test_writes_to_mapped_registers_are_no_ops() {
        let mut mem = empty_memory();
        mem.write(0xFE00, 0xFFFF);
        mem.write(0xFE02, 0xFFFF);
        assert_eq!(mem.read(0xFE00), 0);
        assert_eq!(mem.read(0xFE02), 0);
    }

    #[test]
    pub fn test_load_at_max_size() {
        let mut mem = empty_memory();
        let program = vec![0x0u16; usize::from(PROGRAM_SECTION_MAX_INSTRUCTION_COUNT)];
        mem.load_at(PROGRAM_SECTION_START, &program).unwrap();
    }

    #[test]
    pub fn test_load_at_too_long() {
        let mut mem = empty_memory();
        let program = vec![0x0u16; usize::from(PROGRAM_SECTION_MAX_INSTRUCTION_COUNT) + 1];
        assert_eq!(
            mem.load_at(PROGRAM_SECTION_START, &program)
                .unwrap_err()
                .to_string(),
            "Program too long, got 52737 u16 instructions while limit is 52736"
        );
    }

    #[test]
    pub fn test_load_at_respects_origin() {
        let mut mem = empty_memory();
        mem.load_at(0x4000, &[1, 2, 3]).unwrap();
        assert_eq!(mem.read(0x4000), 1);
        assert_eq!(mem.read(0x4002), 3);
        assert!(mem.load_at(0xFDFF, &[1, 2]).is_err());
    }
}
