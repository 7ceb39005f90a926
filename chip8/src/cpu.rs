//! CPU and memory state.
use std::collections::VecDeque;

use crate::{
    bytecode,
    constants::*,
    error::{Chip8Error, Chip8Result},
    keycode::KeyCode,
};

/// Core state for a chip8 interpreter.
pub struct Chip8Cpu {
    // ------------------------------------------------------------------------
    // Registers
    /// Program counter pointing to the current position in the bytecode.
    pub(crate) pc: Address,
    /// General purpose registers for temporary values.
    ///
    /// Register 16 (VF) is used for either the carry flag or borrow switch depending on opcode.
    pub(crate) registers: [u8; REGISTER_COUNT],
    /// Pointer register used for temporarily storing an address.
    pub(crate) address: Address,
    /// (DT) Delay timer that counts down to 0.
    pub(crate) delay_timer: u8,
    /// (ST) Sound timer that counts down to 0. When it has a non-zero value, a beep is played.
    pub(crate) sound_timer: u8,
    /// The most recently fetched instruction.
    pub(crate) opcode: u16,
    /// Set when the display buffer changed during the current cycle.
    pub(crate) draw_flag: bool,
    /// Number of instructions fetched since the program was loaded.
    pub(crate) cycles: u64,
    /// Recently fetched `(address, opcode)` pairs, oldest first.
    pub(crate) history: VecDeque<(Address, u16)>,

    // ------------------------------------------------------------------------
    // Input
    /// Keyboard input state. Pressed is a 1 bit, released is a 0 bit.
    pub(crate) key_state: u16,
    /// Register waiting to receive a keypress, when the machine is stalled on `Fx0A`.
    pub(crate) key_wait: Option<u8>,
    /// Last key that went from released to pressed.
    pub(crate) key_event: Option<KeyCode>,

    // ------------------------------------------------------------------------
    // Memory
    /// Main memory storage space.
    pub(crate) ram: Box<[u8; MEM_SIZE]>,
    /// Addresses of the calls that entered the active subroutines.
    pub(crate) stack: Vec<Address>,
    /// Screen buffer that is drawn too.
    pub(crate) display: Box<[bool; DISPLAY_BUFFER_SIZE]>,
}

impl Default for Chip8Cpu {
    fn default() -> Self {
        let mut cpu = Self {
            pc: MEM_START as Address,
            registers: [0; REGISTER_COUNT],
            address: 0,
            delay_timer: 0,
            sound_timer: 0,
            opcode: 0,
            draw_flag: false,
            cycles: 0,
            history: VecDeque::with_capacity(HISTORY_LENGTH),

            key_state: 0,
            key_wait: None,
            key_event: None,

            ram: Box::new([0; MEM_SIZE]),
            stack: Vec::with_capacity(STACK_SIZE),
            display: Box::new([false; DISPLAY_BUFFER_SIZE]),
        };
        cpu.load_font();
        cpu
    }
}

impl Chip8Cpu {
    pub fn new() -> Self {
        Default::default()
    }

    /// Return every register, timer and memory buffer to its power-on state.
    ///
    /// Keyboard state is left alone since it mirrors the host's devices.
    pub(crate) fn reset(&mut self) {
        self.pc = MEM_START as Address;
        self.registers.fill(0);
        self.address = 0;
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.opcode = 0;
        self.draw_flag = false;
        self.cycles = 0;
        self.history.clear();
        self.key_wait = None;
        self.key_event = None;

        self.clear_memory();
        self.load_font();
    }

    /// Erase the contents of the memory buffers `ram`, `stack` and `display`.
    pub(crate) fn clear_memory(&mut self) {
        self.ram.fill(0);
        self.stack.clear();
        self.display.fill(false);
    }

    fn load_font(&mut self) {
        let start = FONTSET_START as usize;
        self.ram[start..start + FONTSET_DATA_LENGTH].copy_from_slice(&FONTSET);
    }

    pub fn clear_display(&mut self) {
        self.display.fill(false);
    }

    /// Update the pressed state of a key.
    ///
    /// Returns `true` when the key went from released to pressed.
    pub fn set_key_state(&mut self, key_id: u8, state: bool) -> bool {
        if key_id < KEY_COUNT {
            let was_pressed = self.key_state(key_id);
            if state {
                self.key_state |= 1 << key_id;
            } else {
                self.key_state &= !(1 << key_id);
            }
            state && !was_pressed
        } else {
            false
        }
    }

    /// Check whether a key is pressed down. Values outside the keypad are never pressed.
    pub fn key_state(&self, key_id: u8) -> bool {
        if key_id < KEY_COUNT {
            self.key_state & (1 << key_id) > 0
        } else {
            false
        }
    }

    /// Check whether any key is pressed down.
    #[inline(always)]
    pub fn any_key(&self) -> bool {
        self.key_state > 0
    }

    /// Clear the keyboard input state, setting all keys to up.
    #[inline(always)]
    pub fn clear_keys(&mut self) {
        self.key_state = 0;
    }

    /// Count down the delay timer.
    #[inline]
    pub fn tick_delay(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
    }

    /// Count down the sound timer.
    #[inline]
    pub fn tick_sound(&mut self) {
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }

    /// Extract the instruction at the current program counter.
    #[inline]
    pub fn fetch(&self) -> Chip8Result<u16> {
        bytecode::fetch(&*self.ram, self.pc as usize)
            .ok_or_else(|| Self::fault(self.pc as usize))
    }

    /// Count a fetched instruction and remember it, dropping the oldest entry when full.
    pub(crate) fn record(&mut self, opcode: u16) {
        self.cycles += 1;
        if self.history.len() == HISTORY_LENGTH {
            self.history.pop_front();
        }
        self.history.push_back((self.pc, opcode));
    }

    /// Borrow `len` bytes of memory starting at the address register.
    pub(crate) fn mem(&self, len: usize) -> Chip8Result<&[u8]> {
        let start = self.address as usize;
        self.ram
            .get(start..start + len)
            .ok_or_else(|| Self::fault(start))
    }

    /// Mutably borrow `len` bytes of memory starting at the address register.
    pub(crate) fn mem_mut(&mut self, len: usize) -> Chip8Result<&mut [u8]> {
        let start = self.address as usize;
        self.ram
            .get_mut(start..start + len)
            .ok_or_else(|| Self::fault(start))
    }

    /// Error reporting the first address of the range that falls outside memory.
    fn fault(start: usize) -> Chip8Error {
        Chip8Error::MemoryFault {
            address: start.max(MEM_SIZE),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_key_state() {
        let mut cpu = Chip8Cpu::default();

        assert!(cpu.set_key_state(0, true));
        assert_eq!(cpu.key_state, 0b00000000_00000001);
        assert!(cpu.key_state(0));
        assert!(!cpu.key_state(1));
        assert!(!cpu.key_state(7));

        assert!(cpu.set_key_state(7, true));
        assert_eq!(cpu.key_state, 0b00000000_10000001);
        assert!(cpu.key_state(0));
        assert!(!cpu.key_state(1));
        assert!(cpu.key_state(7));

        assert!(!cpu.set_key_state(0, false));
        assert_eq!(cpu.key_state, 0b00000000_10000000);
        assert!(!cpu.key_state(0));
        assert!(!cpu.key_state(1));
        assert!(cpu.key_state(7));

        assert!(cpu.set_key_state(15, true));
        assert_eq!(cpu.key_state, 0b10000000_10000000);
        assert!(!cpu.key_state(0));
        assert!(!cpu.key_state(1));
        assert!(cpu.key_state(7));
        assert!(cpu.key_state(15));

        // Holding a key down is not a new press.
        assert!(!cpu.set_key_state(15, true));
        // Outside the keypad.
        assert!(!cpu.set_key_state(16, true));
        assert!(!cpu.key_state(16));
        assert!(!cpu.key_state(0xFF));
    }

    #[test]
    fn test_font_loaded() {
        let cpu = Chip8Cpu::new();
        let start = FONTSET_START as usize;
        assert_eq!(&cpu.ram[start..start + 5], &[0xF0, 0x90, 0x90, 0x90, 0xF0]);
        assert_eq!(cpu.pc, 0x200);
    }

    #[test]
    fn test_timers_floor_at_zero() {
        let mut cpu = Chip8Cpu::new();
        cpu.delay_timer = 1;
        cpu.tick_delay();
        cpu.tick_delay();
        cpu.tick_sound();
        assert_eq!(cpu.delay_timer, 0);
        assert_eq!(cpu.sound_timer, 0);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut cpu = Chip8Cpu::new();
        for i in 0..HISTORY_LENGTH as u16 + 3 {
            cpu.pc = MEM_START as Address + i * 2;
            cpu.record(0x6000 | i);
        }

        assert_eq!(cpu.cycles, HISTORY_LENGTH as u64 + 3);
        assert_eq!(cpu.history.len(), HISTORY_LENGTH);
        assert_eq!(cpu.history.front(), Some(&(0x206, 0x6003)));

        cpu.reset();
        assert_eq!(cpu.cycles, 0);
        assert!(cpu.history.is_empty());
    }

    #[test]
    fn test_memory_bounds() {
        let mut cpu = Chip8Cpu::new();
        cpu.address = (MEM_SIZE - 3) as Address;
        assert_eq!(cpu.mem(3).unwrap().len(), 3);
        assert!(matches!(
            cpu.mem_mut(4),
            Err(Chip8Error::MemoryFault { address: MEM_SIZE })
        ));

        cpu.pc = (MEM_SIZE - 1) as Address;
        assert!(matches!(
            cpu.fetch(),
            Err(Chip8Error::MemoryFault { address: MEM_SIZE })
        ));
    }
}
