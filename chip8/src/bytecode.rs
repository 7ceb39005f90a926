//! Helpers for extracting data from opcodes.
use crate::constants::*;

/// Combine the two big-endian bytes at the cursor into an opcode.
///
/// Returns `None` when the instruction does not fit inside the buffer.
#[inline(always)]
pub fn fetch(bytecode: &[u8], cursor: usize) -> Option<u16> {
    let a = *bytecode.get(cursor)?;
    let b = *bytecode.get(cursor + 1)?;
    Some(((a as u16) << 8) | b as u16)
}

/// Split the opcode into its four nibbles, most significant first.
#[inline(always)]
pub fn nibbles(opcode: u16) -> [u8; 4] {
    [
        ((opcode >> 12) & 0xF) as u8,
        ((opcode >> 8) & 0xF) as u8,
        ((opcode >> 4) & 0xF) as u8,
        (opcode & 0xF) as u8,
    ]
}

/// Extract operand NNN, the 12-bit address.
#[inline(always)]
pub fn op_nnn(opcode: u16) -> Address {
    opcode & ADDRESS_MASK
}

/// Extract operand NN, the low byte.
#[inline(always)]
pub fn op_nn(opcode: u16) -> u8 {
    (opcode & 0xFF) as u8
}

/// Extract operand X, the register in bits 8-11.
#[inline(always)]
pub fn op_x(opcode: u16) -> u8 {
    ((opcode >> 8) & 0xF) as u8
}

/// Extract operand Y, the register in bits 4-7.
#[inline(always)]
pub fn op_y(opcode: u16) -> u8 {
    ((opcode >> 4) & 0xF) as u8
}

/// Extract operand N, the low nibble.
#[inline(always)]
pub fn op_n(opcode: u16) -> u8 {
    (opcode & 0xF) as u8
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_operands() {
        let op = 0xABCD;
        assert_eq!(nibbles(op), [0xA, 0xB, 0xC, 0xD]);
        assert_eq!(op_nnn(op), 0xBCD);
        assert_eq!(op_nn(op), 0xCD);
        assert_eq!(op_x(op), 0xB);
        assert_eq!(op_y(op), 0xC);
        assert_eq!(op_n(op), 0xD);
    }

    #[test]
    fn test_fetch_bounds() {
        let bytecode = [0x12, 0x34, 0x56];
        assert_eq!(fetch(&bytecode, 0), Some(0x1234));
        assert_eq!(fetch(&bytecode, 1), Some(0x3456));
        assert_eq!(fetch(&bytecode, 2), None);
    }
}
