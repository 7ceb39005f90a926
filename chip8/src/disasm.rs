//! Disassembler.
use std::fmt::{self, Write as FmtWrite};

use crate::{bytecode::*, constants::*, instr::Instr};

/// Produces a listing of a program image, one instruction per line.
///
/// Words that don't decode are printed as `???`, since programs freely
/// mix sprite data with code.
pub struct Disassembler<'a> {
    bytecode: &'a [u8],
    cursor: usize,
}

impl<'a> Disassembler<'a> {
    pub fn new(bytecode: &'a [u8]) -> Self {
        Self {
            bytecode,
            cursor: 0,
        }
    }

    /// Write the whole program to the given writer.
    pub fn disassemble<W: FmtWrite>(&mut self, w: &mut W) -> fmt::Result {
        self.cursor = 0;
        while self.cursor < self.bytecode.len() {
            self.disassemble_instr(w)?;
            self.cursor += 2;
        }
        self.cursor = 0;

        Ok(())
    }

    /// Write a single instruction to the given writer.
    fn disassemble_instr<W: FmtWrite>(&self, w: &mut W) -> fmt::Result {
        let addr = MEM_START + self.cursor;

        match fetch(self.bytecode, self.cursor) {
            Some(opcode) => match Instr::decode(opcode) {
                Some(instr) => writeln!(w, "0x{addr:04X}: {opcode:04X}  {instr}"),
                None => writeln!(w, "0x{addr:04X}: {opcode:04X}  ???"),
            },
            // Odd trailing byte
            None => writeln!(w, "0x{addr:04X}: {:02X}", self.bytecode[self.cursor]),
        }
    }

    pub fn listing(&mut self) -> Result<String, fmt::Error> {
        let mut buf = String::new();
        self.disassemble(&mut buf)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_listing() {
        let bytecode = [0x00, 0xE0, 0x6A, 0x12, 0x01, 0x23, 0xFF];
        let listing = Disassembler::new(&bytecode).listing().unwrap();
        let lines: Vec<&str> = listing.lines().collect();

        assert_eq!(
            lines,
            vec![
                "0x0200: 00E0  CLS",
                "0x0202: 6A12  LD vA, 0x12",
                "0x0204: 0123  ???",
                "0x0206: FF",
            ]
        );
    }
}
