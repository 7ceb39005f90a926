//! Instruction decoding.
//!
//! Opcodes are classified by an ordered table of nibble patterns. A pattern
//! nibble of `0` accepts any value in that position, while any other nibble
//! must match exactly. The first pattern in table order wins.
use std::fmt::{self, Formatter};

use crate::{bytecode::*, constants::Address};

/// Decoded instruction with its operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum Instr {
    /// 00E0 (CLS)
    ///
    /// Clear the screen.
    ClearScreen,
    /// 00EE (RET)
    ///
    /// Return from the sub-routine.
    Return,
    /// 1nnn (JP addr)
    ///
    /// Jump to the address in `nnn`.
    JumpAddress { address: Address },
    /// 2nnn (CALL addr)
    ///
    /// Call the sub-routine at address `nnn`.
    Call { address: Address },
    /// 3xnn (SE Vx, byte)
    ///
    /// Skip the next instruction if register `Vx` equals value `nn`
    Skip_Eq_Byte { vx: u8, nn: u8 },
    /// 4xnn (SNE Vx, byte)
    ///
    /// Skip the next instruction if register `Vx` does not equal value `nn`.
    Skip_NotEq_Byte { vx: u8, nn: u8 },
    /// 5xy0 (SE Vx, Vy)
    ///
    /// Skip the next instruction if register `Vx` equals register `Vy`.
    Skip_Eq { vx: u8, vy: u8 },
    /// 6xnn (LD Vx, byte)
    Load_Byte { vx: u8, nn: u8 },
    /// 7xnn (ADD Vx, byte)
    ///
    /// Add byte to the value in register `Vx`, store the result in `Vx`.
    /// The carry flag is not touched.
    Add_Byte { vx: u8, nn: u8 },

    // ------------------------------------------------------------------------
    // Math
    /// 8xy0 (LD Vx, Vy)
    Load_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy1 (OR Vx, Vy)
    Or_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy2 (AND Vx, Vy)
    And_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy3 (XOR Vx, Vy)
    Xor_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy4 (ADD Vx, Vy)
    ///
    /// VF is set to 1 on overflow, else 0.
    Add_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy5 (SUB Vx, Vy)
    ///
    /// VF is set to 0 when there is a borrow, set to 1 when there isn't.
    Sub_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy6 (SHR Vx, Vy)
    ///
    /// Store `Vy >> 1` in `Vx`. VF receives the shifted out bit.
    ShiftRight { vx: u8, vy: u8 },
    /// 8xy7 (SUBN Vx, Vy)
    ///
    /// Subtracts VX from VY, and stores the result in VX.
    SubReverse_Vx_Vy { vx: u8, vy: u8 },
    /// 8xyE (SHL Vx, Vy)
    ///
    /// Store `Vy << 1` in `Vx`. VF receives the high bit of `Vy` unshifted,
    /// so it is either 0 or 0x80.
    ShiftLeft { vx: u8, vy: u8 },
    /// 9xy0 (SNE Vx, Vy)
    Skip_NotEq { vx: u8, vy: u8 },

    /// Annn (LD I, addr)
    ///
    /// Load address into register `I`.
    Load_Address { address: Address },
    /// Bnnn (JP V0, addr)
    ///
    /// Jump to location nnn + V0.
    Jump_V0 { address: Address },
    /// Cxnn (RND Vx, byte)
    Random { vx: u8, nn: u8 },
    /// Dxyn (DRW Vx, Vy, nibble)
    ///
    /// Draw sprite to the display buffer.
    Draw { vx: u8, vy: u8, n: u8 },

    // ------------------------------------------------------------------------
    // Keyboard
    /// Ex9E (SKP Vx)
    Skip_Key { vx: u8 },
    /// ExA1 (SKNP Vx)
    Skip_NotKey { vx: u8 },

    // ------------------------------------------------------------------------
    // Miscellaneous
    /// Fx07 (LD Vx, DT)
    Load_Vx_Delay { vx: u8 },
    /// Fx0A (LD Vx, K)
    ///
    /// Wait for a key press, store the value of the key in Vx.
    Load_Vx_Key { vx: u8 },
    /// Fx15 (LD DT, Vx)
    Load_Delay_Vx { vx: u8 },
    /// Fx18 (LD ST, Vx)
    Load_Sound_Vx { vx: u8 },
    /// Fx1E (ADD I, Vx)
    Add_Address_Vx { vx: u8 },
    /// Fx29 (LD F, Vx)
    Load_Font { vx: u8 },
    /// Fx33 (LD B, Vx)
    Load_Bcd { vx: u8 },
    /// Fx55 (LD [I], Vx)
    Store_Registers { vx: u8 },
    /// Fx65 (LD Vx, [I])
    Load_Registers { vx: u8 },
}

type Build = fn(u16) -> Instr;

/// Ordered pattern table.
///
/// Families sharing a prefix:
///
/// - `8000` accepts every `8xyN`, so the specific `800N` entries come first.
///   Unassigned sub-opcodes (`8xy8`-`8xyD`, `8xyF`) fall through to `LD Vx, Vy`.
/// - `5000` and `9000` accept any last nibble.
/// - `F007` and `F00A` ignore the third nibble, so they come after the
///   other `F` entries.
#[rustfmt::skip]
const PATTERNS: [(u16, Build); 32] = [
    (0x1000, |op| Instr::JumpAddress { address: op_nnn(op) }),
    (0x2000, |op| Instr::Call { address: op_nnn(op) }),
    (0x3000, |op| Instr::Skip_Eq_Byte { vx: op_x(op), nn: op_nn(op) }),
    (0x4000, |op| Instr::Skip_NotEq_Byte { vx: op_x(op), nn: op_nn(op) }),
    (0x5000, |op| Instr::Skip_Eq { vx: op_x(op), vy: op_y(op) }),
    (0x6000, |op| Instr::Load_Byte { vx: op_x(op), nn: op_nn(op) }),
    (0x7000, |op| Instr::Add_Byte { vx: op_x(op), nn: op_nn(op) }),
    (0x8001, |op| Instr::Or_Vx_Vy { vx: op_x(op), vy: op_y(op) }),
    (0x8002, |op| Instr::And_Vx_Vy { vx: op_x(op), vy: op_y(op) }),
    (0x8003, |op| Instr::Xor_Vx_Vy { vx: op_x(op), vy: op_y(op) }),
    (0x8004, |op| Instr::Add_Vx_Vy { vx: op_x(op), vy: op_y(op) }),
    (0x8005, |op| Instr::Sub_Vx_Vy { vx: op_x(op), vy: op_y(op) }),
    (0x8006, |op| Instr::ShiftRight { vx: op_x(op), vy: op_y(op) }),
    (0x8007, |op| Instr::SubReverse_Vx_Vy { vx: op_x(op), vy: op_y(op) }),
    (0x800E, |op| Instr::ShiftLeft { vx: op_x(op), vy: op_y(op) }),
    (0x8000, |op| Instr::Load_Vx_Vy { vx: op_x(op), vy: op_y(op) }),
    (0x9000, |op| Instr::Skip_NotEq { vx: op_x(op), vy: op_y(op) }),
    (0xA000, |op| Instr::Load_Address { address: op_nnn(op) }),
    (0xB000, |op| Instr::Jump_V0 { address: op_nnn(op) }),
    (0xC000, |op| Instr::Random { vx: op_x(op), nn: op_nn(op) }),
    (0xD000, |op| Instr::Draw { vx: op_x(op), vy: op_y(op), n: op_n(op) }),
    (0xE09E, |op| Instr::Skip_Key { vx: op_x(op) }),
    (0xE0A1, |op| Instr::Skip_NotKey { vx: op_x(op) }),
    (0xF015, |op| Instr::Load_Delay_Vx { vx: op_x(op) }),
    (0xF018, |op| Instr::Load_Sound_Vx { vx: op_x(op) }),
    (0xF01E, |op| Instr::Add_Address_Vx { vx: op_x(op) }),
    (0xF029, |op| Instr::Load_Font { vx: op_x(op) }),
    (0xF033, |op| Instr::Load_Bcd { vx: op_x(op) }),
    (0xF055, |op| Instr::Store_Registers { vx: op_x(op) }),
    (0xF065, |op| Instr::Load_Registers { vx: op_x(op) }),
    (0xF007, |op| Instr::Load_Vx_Delay { vx: op_x(op) }),
    (0xF00A, |op| Instr::Load_Vx_Key { vx: op_x(op) }),
];

/// Check the opcode against a pattern, where zero nibbles in the pattern are wildcards.
#[inline]
fn matches(pattern: u16, opcode: u16) -> bool {
    nibbles(pattern)
        .iter()
        .zip(nibbles(opcode).iter())
        .all(|(p, o)| *p == 0 || p == o)
}

impl Instr {
    /// Decode a raw opcode.
    ///
    /// Returns `None` when no pattern matches.
    pub fn decode(opcode: u16) -> Option<Self> {
        match opcode {
            0x00E0 => Some(Instr::ClearScreen),
            0x00EE => Some(Instr::Return),
            _ => PATTERNS
                .iter()
                .find(|(pattern, _)| matches(*pattern, opcode))
                .map(|(_, build)| build(opcode)),
        }
    }

    /// Whether the instruction sets the program counter itself, in which
    /// case the cycle must not advance it.
    #[inline]
    pub fn is_jump(&self) -> bool {
        matches!(
            self,
            Instr::Return | Instr::JumpAddress { .. } | Instr::Call { .. } | Instr::Jump_V0 { .. }
        )
    }
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Instr::ClearScreen => write!(f, "CLS"),
            Instr::Return => write!(f, "RET"),
            Instr::JumpAddress { address } => write!(f, "JP 0x{address:03X}"),
            Instr::Call { address } => write!(f, "CALL 0x{address:03X}"),
            Instr::Skip_Eq_Byte { vx, nn } => write!(f, "SE v{vx:X}, 0x{nn:02X}"),
            Instr::Skip_NotEq_Byte { vx, nn } => write!(f, "SNE v{vx:X}, 0x{nn:02X}"),
            Instr::Skip_Eq { vx, vy } => write!(f, "SE v{vx:X}, v{vy:X}"),
            Instr::Load_Byte { vx, nn } => write!(f, "LD v{vx:X}, 0x{nn:02X}"),
            Instr::Add_Byte { vx, nn } => write!(f, "ADD v{vx:X}, 0x{nn:02X}"),
            // ------
            Instr::Load_Vx_Vy { vx, vy } => write!(f, "LD v{vx:X}, v{vy:X}"),
            Instr::Or_Vx_Vy { vx, vy } => write!(f, "OR v{vx:X}, v{vy:X}"),
            Instr::And_Vx_Vy { vx, vy } => write!(f, "AND v{vx:X}, v{vy:X}"),
            Instr::Xor_Vx_Vy { vx, vy } => write!(f, "XOR v{vx:X}, v{vy:X}"),
            Instr::Add_Vx_Vy { vx, vy } => write!(f, "ADD v{vx:X}, v{vy:X}"),
            Instr::Sub_Vx_Vy { vx, vy } => write!(f, "SUB v{vx:X}, v{vy:X}"),
            Instr::ShiftRight { vx, vy } => write!(f, "SHR v{vx:X}, v{vy:X}"),
            Instr::SubReverse_Vx_Vy { vx, vy } => write!(f, "SUBN v{vx:X}, v{vy:X}"),
            Instr::ShiftLeft { vx, vy } => write!(f, "SHL v{vx:X}, v{vy:X}"),
            Instr::Skip_NotEq { vx, vy } => write!(f, "SNE v{vx:X}, v{vy:X}"),
            // ------
            Instr::Load_Address { address } => write!(f, "LD I, 0x{address:03X}"),
            Instr::Jump_V0 { address } => write!(f, "JP v0, 0x{address:03X}"),
            Instr::Random { vx, nn } => write!(f, "RND v{vx:X}, 0x{nn:02X}"),
            Instr::Draw { vx, vy, n } => write!(f, "DRW v{vx:X}, v{vy:X}, {n}"),
            // ------
            Instr::Skip_Key { vx } => write!(f, "SKP v{vx:X}"),
            Instr::Skip_NotKey { vx } => write!(f, "SKNP v{vx:X}"),
            Instr::Load_Vx_Delay { vx } => write!(f, "LD v{vx:X}, DT"),
            Instr::Load_Vx_Key { vx } => write!(f, "LD v{vx:X}, K"),
            Instr::Load_Delay_Vx { vx } => write!(f, "LD DT, v{vx:X}"),
            Instr::Load_Sound_Vx { vx } => write!(f, "LD ST, v{vx:X}"),
            Instr::Add_Address_Vx { vx } => write!(f, "ADD I, v{vx:X}"),
            Instr::Load_Font { vx } => write!(f, "LD F, v{vx:X}"),
            Instr::Load_Bcd { vx } => write!(f, "LD B, v{vx:X}"),
            Instr::Store_Registers { vx } => write!(f, "LD [I], v{vx:X}"),
            Instr::Load_Registers { vx } => write!(f, "LD v{vx:X}, [I]"),
        }
    }
}
