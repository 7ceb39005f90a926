mod bytecode;
pub mod constants;
mod cpu;
mod disasm;
mod error;
mod instr;
mod keycode;
mod vm;

pub use self::{
    error::{Chip8Error, Chip8Result},
    keycode::{InvalidKeyCode, KeyCode},
    vm::Hz,
};

pub const IMPL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use super::{
        disasm::Disassembler,
        error::{Chip8Error, Chip8Result},
        instr::Instr,
        keycode::KeyCode,
        vm::{Chip8Conf, Chip8Vm, Flow, Hz},
    };
}
