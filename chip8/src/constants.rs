//! Constant values of the Chip-8 architecture.

/// Number of general purpose registers.
pub const REGISTER_COUNT: usize = 0x10; // 16

/// Index of the flag register VF.
pub const FLAG_REGISTER: usize = 0xF;

/// The lower memory space was historically used for the interpreter itself,
/// but is now used for fonts.
pub const MEM_START: usize = 0x200; // 512
pub const MEM_SIZE: usize = 0x1000; // 4096

/// Largest program that fits in memory after the reserved interpreter area.
pub const MAX_PROGRAM_SIZE: usize = MEM_SIZE - MEM_START;

/// Mask for the 12-bit address space.
pub const ADDRESS_MASK: u16 = 0x0FFF;

/// Levels of nesting allowed in the call stack.
///
/// The original COSMAC VIP interpreter allowed 16 levels of nesting.
/// It can be raised through the VM configuration.
pub const STACK_SIZE: usize = 0x10; // 16

/// Location of the built-in hexadecimal font.
pub const FONTSET_START: u16 = 0x50;
/// Each glyph is 8 pixels wide and 5 pixels high.
pub const FONTSET_HEIGHT: usize = 5;
pub const FONTSET_GLYPH_COUNT: usize = 16;
pub const FONTSET_DATA_LENGTH: usize = FONTSET_HEIGHT * FONTSET_GLYPH_COUNT;

#[rustfmt::skip]
pub const FONTSET: [u8; FONTSET_DATA_LENGTH] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;
pub const DISPLAY_BUFFER_SIZE: usize = DISPLAY_WIDTH * DISPLAY_HEIGHT;
/// Sprite coordinates wrap on the linear index of the display buffer,
/// not per axis.
pub const DISPLAY_BUFFER_MASK: usize = DISPLAY_BUFFER_SIZE - 1;

/// Number of recently fetched instructions kept for the state dump.
pub const HISTORY_LENGTH: usize = 22;

/// Default number of instructions executed per second.
pub const DEFAULT_CLOCK_FREQUENCY: u64 = 500;

/// Number of clock cycles in a second that delay timers count down.
pub const DELAY_FREQUENCY: u64 = 60;

/// Default number of frames presented per second by a host.
pub const DEFAULT_RENDER_FREQUENCY: u64 = 30;

/// Number of nanoseconds in a second
#[doc(hidden)]
pub const NANOS_IN_SECOND: u64 = 1_000_000_000;

/// Number of keys ob the keyboard (0x0-0xF)
pub const KEY_COUNT: u8 = 16;

/// Type for storing the 12-bit memory addresses.
pub type Address = u16;

/// Borrowed view of the display buffer.
pub type Chip8DisplayBuffer<'a> = &'a [bool; DISPLAY_BUFFER_SIZE];
