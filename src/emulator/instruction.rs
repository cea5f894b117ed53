use crate::numbers;
use std::fmt::{Debug, Formatter};

/// Wrapper for an LC-3 u16 instruction word.
/// Bits 15 to 12 select the opcode, the remaining bits are operand fields.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Instruction(u16);

impl Instruction {
    /// Gives the value of only the specified bit range.
    ///
    /// # Parameters
    /// - `from`: starting index
    /// - `to`: end index (inclusive), must be greater or equal to `from`
    ///
    /// # Panics
    /// - asserts that to is greater or equal from and both are valid indexes
    #[must_use]
    pub fn get_bit_range(self, from: u8, to: u8) -> u16 {
        debug_assert!(
            to >= from,
            "wrong direction of from: {from:?} and to: {to:?}"
        );
        debug_assert!(
            (00..u16::BITS).contains(&u32::from(to)),
            "index: {to:?} to u16 is greater than maximum value {:?}",
            u16::BITS - 1
        );
        (self.0 >> from) & ((0b1 << (to - from + 1)) - 1)
    }
    /// Gives the value of only the specified bit range and converts that to u8.
    /// See [`Instruction::get_bit_range()`]
    /// # Panics
    /// - value does not fit into u8 with message from `expect`
    #[must_use]
    pub fn get_bit_range_u8(self, from: u8, to: u8, expect: &str) -> u8 {
        u8::try_from(self.get_bit_range(from, to)).expect(expect)
    }
    #[must_use]
    pub fn get_bit(self, index: u8) -> bool {
        self.get_bit_range(index, index) & 1 != 0
    }
    #[must_use]
    pub fn op_code(self) -> u8 {
        self.get_bit_range_u8(12, 15, "Error parsing op_code")
    }
    #[must_use]
    pub fn dr_number(self) -> u8 {
        self.get_bit_range_u8(9, 11, "Error parsing dr")
    }
    #[must_use]
    pub fn sr1_number(self) -> u8 {
        self.get_bit_range_u8(6, 8, "Error parsing sr1")
    }
    #[must_use]
    pub fn sr2_number(self) -> u8 {
        self.get_bit_range_u8(0, 2, "Error parsing sr2")
    }
    #[must_use]
    pub fn base_r_number(self) -> u8 {
        self.get_bit_range_u8(6, 8, "Error parsing base register")
    }
    /// The `nzp` mask of a BR instruction.
    #[must_use]
    pub fn condition_mask(self) -> u16 {
        self.get_bit_range(9, 11)
    }
    /// The vector of a TRAP instruction, the higher operand bits are unused.
    #[must_use]
    pub fn trap_vector(self) -> u8 {
        self.get_bit_range_u8(0, 7, "Error parsing trap vector")
    }
    #[must_use]
    pub fn is_immediate(self) -> bool {
        self.get_bit_range(5, 5) == 1
    }
    #[must_use]
    pub fn get_immediate(self) -> u16 {
        numbers::sign_extend(self.get_bit_range(0, 4), 5)
    }
    /// Offset to add to program counter PC.
    /// Can be positive or negative.
    #[must_use]
    pub fn pc_offset(self, len: u8) -> i16 {
        let bin_rep = numbers::sign_extend(self.get_bit_range(0, len - 1), len);
        let res = numbers::twos_complement_to_decimal(bin_rep);
        #[expect(clippy::cast_possible_truncation)]
        {
            debug_assert!(
                ((-(2 << (len - 1))) as i16..(2 << (len - 1))).contains(&res),
                "pc_offset out of range"
            );
        }
        res
    }
}

impl Debug for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Op: {:04b}, DR: {:03b}, PC_Off: {:09b}",
            self.op_code(),
            self.dr_number(),
            self.pc_offset(9)
        )
    }
}

impl From<u16> for Instruction {
    fn from(bits: u16) -> Self {
        Self(bits)
    }
}
