//! Virtual machine.
use std::{
    fmt::{self, Write},
    time::Duration,
};

use log::debug;
use rand::{prelude::*, rngs::StdRng};

use crate::{
    constants::*,
    cpu::Chip8Cpu,
    error::{Chip8Error, Chip8Result},
    instr::Instr,
    keycode::KeyCode,
};

pub struct Chip8Vm {
    cpu: Chip8Cpu,
    rng: StdRng,
    conf: Chip8Conf,
}

impl Chip8Vm {
    pub fn new(conf: Chip8Conf) -> Self {
        let rng = match conf.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Chip8Vm {
            cpu: Chip8Cpu::new(),
            rng,
            conf,
        }
    }

    /// Configuration that was used to instantiate the VM.
    pub fn config(&self) -> &Chip8Conf {
        &self.conf
    }

    pub fn load_bytecode(&mut self, bytecode: &[u8]) -> Chip8Result<()> {
        if bytecode.len() > MAX_PROGRAM_SIZE {
            return Err(Chip8Error::LargeProgram {
                size: bytecode.len(),
            });
        }

        // Start with clean memory to avoid leaking previous program.
        // This also resets the fonts and the program counter.
        self.cpu.reset();

        // Load program into virtual RAM
        self.cpu.ram[MEM_START..MEM_START + bytecode.len()].copy_from_slice(bytecode);

        debug!("loaded program of {} bytes", bytecode.len());

        Ok(())
    }

    pub fn display_buffer(&self) -> Chip8DisplayBuffer {
        &self.cpu.display
    }

    /// Whether the display buffer changed during the last cycle.
    pub fn draw_flag(&self) -> bool {
        self.cpu.draw_flag
    }

    pub fn clear_draw_flag(&mut self) {
        self.cpu.draw_flag = false;
    }

    /// The buzzer should sound while the sound timer counts down.
    pub fn sound_active(&self) -> bool {
        self.cpu.sound_timer > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Flow {
    Ok,
    /// Program counter has jumped to a new address.
    ///
    /// This is useful for the caller to avoid being
    /// blocked on infinite or long running loops.
    ///
    /// This is returned when the interpreter encounters:
    ///
    /// - 1nnn (`JP addr`)
    /// - 2nnn (`CALL addr`)
    /// - 00EE (`RET`)
    /// - Bnnn (`JP V0, addr`)
    Jump,
    /// The display buffer was changed and should be presented.
    Draw,
    /// The sound timer was loaded.
    Sound,
    /// Wait for a keypress.
    ///
    /// This is triggered by the opcode `Fx0A` (`LD Vx, K`), which stops
    /// execution until a key is pressed, and loads the key value into `Vx`.
    KeyWait,
}

/// VM Configuration Parameters.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Chip8Conf {
    /// Instructions executed per second by the host.
    pub clock_frequency: Option<Hz>,
    /// Levels of subroutine nesting before a call overflows the stack.
    pub stack_depth: usize,
    /// Seed for the random number generator. Seeded from system entropy when not set.
    pub seed: Option<u64>,
}

impl Default for Chip8Conf {
    fn default() -> Self {
        Self {
            clock_frequency: None,
            stack_depth: STACK_SIZE,
            seed: None,
        }
    }
}

impl Chip8Conf {
    /// Configured instruction rate, falling back to the default.
    pub fn clock_frequency(&self) -> Hz {
        self.clock_frequency.unwrap_or(Hz(DEFAULT_CLOCK_FREQUENCY))
    }
}

/// CPU clock frequency, in hertz (per second)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Hz(pub u64);

impl From<Hz> for Duration {
    fn from(freq: Hz) -> Self {
        if freq.0 == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(NANOS_IN_SECOND / freq.0)
        }
    }
}

/// Interpreter
impl Chip8Vm {
    /// Sets the keyboard key input state.
    ///
    /// A key going down is recorded as a key event, which resumes
    /// the VM if it is waiting for keyboard input.
    pub fn set_key(&mut self, key: KeyCode, pressed: bool) {
        if self.cpu.set_key_state(key.as_u8(), pressed) {
            self.cpu.key_event = Some(key);
        }
    }

    /// Clear the keyboard input state, setting all keys to up.
    pub fn clear_keys(&mut self) {
        self.cpu.clear_keys()
    }

    /// Count down the delay and sound timers.
    ///
    /// Intended to be called at 60Hz, independent of the instruction rate.
    pub fn tick_timers(&mut self) {
        self.cpu.tick_delay();
        self.cpu.tick_sound();
    }

    /// Execute a number of cycles, stopping at the first error.
    ///
    /// Returns the control flow of the last cycle.
    pub fn run_steps(&mut self, step_count: usize) -> Chip8Result<Flow> {
        let mut flow = Flow::Ok;

        for _ in 0..step_count {
            flow = self.step()?;
        }

        Ok(flow)
    }

    /// Execute a single fetch-decode-execute cycle.
    pub fn step(&mut self) -> Chip8Result<Flow> {
        self.cpu.draw_flag = false;

        if let Some(vx) = self.cpu.key_wait {
            return Ok(self.resume_key_wait(vx));
        }

        // Each instruction is two bytes, with the opcode identity in the first 4-bit nibble.
        let opcode = self.cpu.fetch()?;
        self.cpu.opcode = opcode;
        self.cpu.record(opcode);

        let instr = Instr::decode(opcode).ok_or(Chip8Error::UnknownOpcode {
            opcode,
            address: self.cpu.pc,
        })?;

        op_trace(&self.cpu, &instr);

        let control_flow = self.exec(instr)?;

        if !instr.is_jump() && control_flow != Flow::KeyWait {
            self.cpu.pc += 2;
        }

        Ok(control_flow)
    }

    /// Complete a pending `Fx0A` once a key event has arrived.
    fn resume_key_wait(&mut self, vx: u8) -> Flow {
        match self.cpu.key_event.take() {
            Some(key) => {
                debug!("key wait resumed by {key}");
                self.cpu.registers[vx as usize] = key.as_u8();
                self.cpu.key_wait = None;
                self.cpu.pc += 2;
                Flow::Ok
            }
            None => Flow::KeyWait,
        }
    }

    /// Execute a decoded instruction.
    ///
    /// Instructions that skip increment the program counter by 2 here,
    /// on top of the regular advance at the end of the cycle.
    fn exec(&mut self, instr: Instr) -> Chip8Result<Flow> {
        let Self { cpu, rng, conf } = self;

        let mut control_flow = Flow::Ok;

        match instr {
            // 00E0 (CLS)
            //
            // Clear display
            Instr::ClearScreen => {
                cpu.clear_display();
                cpu.draw_flag = true;
                control_flow = Flow::Draw;
            }
            // 00EE (RET)
            //
            // Return from a subroutine.
            // The stack holds the address of the call, so resume at the instruction after it.
            Instr::Return => {
                let call_site = *cpu
                    .stack
                    .last()
                    .ok_or(Chip8Error::StackUnderflow { address: cpu.pc })?;
                let target = call_site as usize + 2;
                if target >= MEM_SIZE {
                    return Err(Chip8Error::MemoryFault { address: target });
                }
                cpu.stack.pop();
                cpu.pc = target as Address;
                control_flow = Flow::Jump;
            }
            // 1NNN (JP addr)
            //
            // Jump to address.
            Instr::JumpAddress { address } => {
                cpu.pc = address;
                control_flow = Flow::Jump;
            }
            // 2NNN (CALL addr)
            //
            // Call subroutine at NNN.
            Instr::Call { address } => {
                if cpu.stack.len() >= conf.stack_depth {
                    return Err(Chip8Error::StackOverflow {
                        address: cpu.pc,
                        depth: conf.stack_depth,
                    });
                }
                cpu.stack.push(cpu.pc);
                cpu.pc = address;
                control_flow = Flow::Jump;
            }
            // 3XNN (SE Vx, byte)
            //
            // Skip the next instruction if register VX equals value NN.
            Instr::Skip_Eq_Byte { vx, nn } => {
                if cpu.registers[vx as usize] == nn {
                    cpu.pc += 2;
                }
            }
            // 4XNN (SNE Vx, byte)
            //
            // Skip the next instruction if register VX does not equal value NN.
            Instr::Skip_NotEq_Byte { vx, nn } => {
                if cpu.registers[vx as usize] != nn {
                    cpu.pc += 2;
                }
            }
            // 5XY0 (SE Vx, Vy)
            //
            // Skip the next instruction if register VX equals value VY.
            Instr::Skip_Eq { vx, vy } => {
                if cpu.registers[vx as usize] == cpu.registers[vy as usize] {
                    cpu.pc += 2;
                }
            }
            // 6XNN (LD Vx, byte)
            //
            // Set register VX to value NN.
            Instr::Load_Byte { vx, nn } => {
                cpu.registers[vx as usize] = nn;
            }
            // 7xnn (ADD Vx, byte)
            //
            // Add value NN to register VX. Carry flag is not set.
            Instr::Add_Byte { vx, nn } => {
                let x = cpu.registers[vx as usize];
                cpu.registers[vx as usize] = x.wrapping_add(nn);
            }
            // 8XY0 (LD Vx, Vy)
            Instr::Load_Vx_Vy { vx, vy } => {
                cpu.registers[vx as usize] = cpu.registers[vy as usize];
            }
            // 8XY1 (OR Vx, Vy)
            Instr::Or_Vx_Vy { vx, vy } => {
                cpu.registers[vx as usize] |= cpu.registers[vy as usize];
            }
            // 8XY2 (AND Vx, Vy)
            Instr::And_Vx_Vy { vx, vy } => {
                cpu.registers[vx as usize] &= cpu.registers[vy as usize];
            }
            // 8XY3 (XOR Vx, Vy)
            Instr::Xor_Vx_Vy { vx, vy } => {
                cpu.registers[vx as usize] ^= cpu.registers[vy as usize];
            }
            // 8XY4 (ADD Vx, Vy)
            //
            // ADDs VX to VY, and stores the result in VX.
            // Overflow is wrapped.
            // If overflow, set VF to 1, else 0.
            Instr::Add_Vx_Vy { vx, vy } => {
                let (x, y) = (cpu.registers[vx as usize], cpu.registers[vy as usize]);
                let (result, carry) = x.overflowing_add(y);
                cpu.registers[vx as usize] = result;
                cpu.registers[FLAG_REGISTER] = carry as u8;
            }
            // 8XY5 (SUB Vx, Vy)
            //
            // Subtracts VY from VX, and stores the result in VX.
            // VF is set to 0 when there is a borrow, set to 1 when there isn't.
            Instr::Sub_Vx_Vy { vx, vy } => {
                let (x, y) = (cpu.registers[vx as usize], cpu.registers[vy as usize]);
                let (result, borrow) = x.overflowing_sub(y);
                cpu.registers[vx as usize] = result;
                cpu.registers[FLAG_REGISTER] = !borrow as u8;
            }
            // 8XY6 (SHR Vx, Vy)
            //
            // VF is set to the least-significant bit of VY.
            // VY shifted right by 1 is stored in VX.
            Instr::ShiftRight { vx, vy } => {
                let y = cpu.registers[vy as usize];
                cpu.registers[FLAG_REGISTER] = y & 1;
                cpu.registers[vx as usize] = y >> 1;
            }
            // 8XY7 (SUBN Vx, Vy)
            //
            // Subtracts VX from VY, and stores the result in VX.
            // VF is set to 0 when there is a borrow, set to 1 when there isn't.
            Instr::SubReverse_Vx_Vy { vx, vy } => {
                let (x, y) = (cpu.registers[vx as usize], cpu.registers[vy as usize]);
                let (result, borrow) = y.overflowing_sub(x);
                cpu.registers[vx as usize] = result;
                cpu.registers[FLAG_REGISTER] = !borrow as u8;
            }
            // 8XYE (SHL Vx, Vy)
            //
            // VF is set to the most-significant bit of VY, left in place (0x80 or 0).
            // VY shifted left by 1 is stored in VX.
            Instr::ShiftLeft { vx, vy } => {
                let y = cpu.registers[vy as usize];
                cpu.registers[FLAG_REGISTER] = y & 0x80;
                cpu.registers[vx as usize] = y << 1;
            }
            // 9xy0 (SNE Vx, Vy)
            //
            // Skip next instruction if Vx != Vy.
            Instr::Skip_NotEq { vx, vy } => {
                if cpu.registers[vx as usize] != cpu.registers[vy as usize] {
                    cpu.pc += 2;
                }
            }
            // Annn (LD I, addr)
            //
            // Set address register I to value NNN.
            Instr::Load_Address { address } => {
                cpu.address = address;
            }
            // Bnnn (JP V0, addr)
            //
            // Jump to location nnn + V0.
            Instr::Jump_V0 { address } => {
                let target = address as usize + cpu.registers[0] as usize;
                if target >= MEM_SIZE {
                    return Err(Chip8Error::MemoryFault { address: target });
                }
                cpu.pc = target as Address;
                control_flow = Flow::Jump;
            }
            // CXNN (RND Vx, byte)
            //
            // Generate random number.
            // Set register VX to the result of bitwise AND between a random number and NN.
            Instr::Random { vx, nn } => {
                cpu.registers[vx as usize] = nn & rng.gen::<u8>();
            }
            // Dxyn (DRW Vx, Vy, nibble)
            //
            // Draw sprite to the display buffer, at coordinate as per registers Vx and Vy.
            // Sprite is encoded as 8 pixels wide, N pixels high, stored in bits located in
            // memory pointed to by address register I.
            //
            // Pixels drawn past the end of the display buffer wrap around to the start.
            //
            // If the drawing operation erases existing pixels in the display buffer, register VF is set to
            // 1, and set to 0 if no display bits are unset. This is used for collision detection.
            Instr::Draw { vx, vy, n } => {
                let (x, y) = (
                    cpu.registers[vx as usize] as usize,
                    cpu.registers[vy as usize] as usize,
                );
                let height = n as usize;
                let mut sprite = [0u8; 0x10];
                sprite[..height].copy_from_slice(cpu.mem(height)?);

                let mut is_erased = false;

                for (r, row) in sprite[..height].iter().enumerate() {
                    let start = x + (y + r) * DISPLAY_WIDTH;

                    // Each row is 8 bits representing the 8 pixels of the sprite.
                    for c in 0..8 {
                        if (row >> (7 - c)) & 1 == 0 {
                            continue;
                        }

                        let d = (start + c) & DISPLAY_BUFFER_MASK;
                        let old_px = cpu.display[d];

                        // XOR erases a pixel when both the old and new values are both 1.
                        is_erased |= old_px;
                        cpu.display[d] = !old_px;
                    }
                }

                // If a pixel was erased, then a collision occurred.
                cpu.registers[FLAG_REGISTER] = is_erased as u8;
                cpu.draw_flag = true;
                control_flow = Flow::Draw;
            }
            // Ex9E (SKP Vx)
            Instr::Skip_Key { vx } => {
                if cpu.key_state(cpu.registers[vx as usize]) {
                    cpu.pc += 2;
                }
            }
            // ExA1 (SKNP Vx)
            Instr::Skip_NotKey { vx } => {
                if !cpu.key_state(cpu.registers[vx as usize]) {
                    cpu.pc += 2;
                }
            }
            // Fx07 (LD Vx, DT)
            //
            // The value of DT is placed into Vx.
            Instr::Load_Vx_Delay { vx } => {
                cpu.registers[vx as usize] = cpu.delay_timer;
            }
            // Fx0A (LD Vx, K)
            //
            // Wait for a key press, store the value of the key in Vx.
            // The machine stalls on this instruction until a key goes down.
            Instr::Load_Vx_Key { vx } => {
                debug!("waiting for key into v{vx:X}");
                cpu.key_wait = Some(vx);
                cpu.key_event = None;
                control_flow = Flow::KeyWait;
            }
            // Fx15 (LD DT, Vx)
            Instr::Load_Delay_Vx { vx } => {
                cpu.delay_timer = cpu.registers[vx as usize];
            }
            // Fx18 (LD ST, Vx)
            Instr::Load_Sound_Vx { vx } => {
                cpu.sound_timer = cpu.registers[vx as usize];
                control_flow = Flow::Sound;
            }
            // Fx1E (ADD I, Vx)
            //
            // Add Vx to I, wrapping in the 12-bit address space.
            Instr::Add_Address_Vx { vx } => {
                let x = cpu.registers[vx as usize] as u16;
                cpu.address = cpu.address.wrapping_add(x) & ADDRESS_MASK;
            }
            // Fx29 (LD F, Vx)
            //
            // Set I = location of sprite for hexadecimal digit Vx.
            Instr::Load_Font { vx } => {
                let digit = (cpu.registers[vx as usize] & 0xF) as u16;
                cpu.address = FONTSET_START + digit * FONTSET_HEIGHT as u16;
            }
            // Fx33 (LD B, Vx)
            //
            // Store the binary-coded decimal representation of Vx
            // in the memory locations I, I+1, and I+2.
            Instr::Load_Bcd { vx } => {
                let x = cpu.registers[vx as usize];
                cpu.mem_mut(3)?
                    .copy_from_slice(&[x / 100, x / 10 % 10, x % 10]);
            }
            // Fx55 (LD [I], Vx)
            //
            // Store registers V0 through Vx in memory starting at location I.
            Instr::Store_Registers { vx } => {
                let count = vx as usize + 1;
                let registers = cpu.registers;
                cpu.mem_mut(count)?.copy_from_slice(&registers[..count]);
            }
            // Fx65 (LD Vx, [I])
            //
            // Read registers V0 through Vx from memory starting at location I.
            Instr::Load_Registers { vx } => {
                let count = vx as usize + 1;
                let mut values = [0u8; REGISTER_COUNT];
                values[..count].copy_from_slice(cpu.mem(count)?);
                cpu.registers[..count].copy_from_slice(&values[..count]);
            }
        }

        Ok(control_flow)
    }
}

/// Introspection
impl Chip8Vm {
    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.cpu.registers
    }

    /// Index register `I`.
    pub fn index(&self) -> Address {
        self.cpu.address
    }

    pub fn pc(&self) -> Address {
        self.cpu.pc
    }

    /// Return addresses, with the most recent call last.
    pub fn stack(&self) -> &[Address] {
        &self.cpu.stack
    }

    /// The most recently fetched opcode.
    pub fn opcode(&self) -> u16 {
        self.cpu.opcode
    }

    pub fn delay_timer(&self) -> u8 {
        self.cpu.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.cpu.sound_timer
    }

    /// Register waiting for a keypress, if the VM is stalled on `Fx0A`.
    pub fn key_wait(&self) -> Option<u8> {
        self.cpu.key_wait
    }

    /// Number of instructions fetched since the program was loaded.
    pub fn cycles(&self) -> u64 {
        self.cpu.cycles
    }

    /// Recently fetched `(address, opcode)` pairs, oldest first.
    pub fn history(&self) -> impl Iterator<Item = (Address, u16)> + '_ {
        self.cpu.history.iter().copied()
    }

    pub fn ram(&self) -> &[u8] {
        &*self.cpu.ram
    }
}

/// Troubleshooting
impl Chip8Vm {
    /// Returns `count` bytes of program memory as a human readable string,
    /// one instruction word per line.
    pub fn dump_ram(&self, count: usize) -> Result<String, fmt::Error> {
        let iter = self
            .cpu
            .ram
            .iter()
            .enumerate()
            .skip(MEM_START)
            .take(count)
            .step_by(2);
        let mut buf = String::new();

        for (i, op) in iter {
            let lo = self.cpu.ram.get(i + 1).copied().unwrap_or_default();
            writeln!(buf, "{:04X}: {:02X}{:02X}", i, op, lo)?;
        }

        Ok(buf)
    }

    pub fn dump_display(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        for y in 0..DISPLAY_HEIGHT {
            for x in 0..DISPLAY_WIDTH {
                if self.cpu.display[x + y * DISPLAY_WIDTH] {
                    write!(buf, "#")?;
                } else {
                    write!(buf, ".")?;
                }
            }
            writeln!(buf)?;
        }

        Ok(buf)
    }

    pub fn dump_keys(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        if self.cpu.any_key() {
            write!(buf, "keys: ")?;
            for i in 0..KEY_COUNT {
                if self.cpu.key_state(i) {
                    write!(buf, "k{i:x}")?;
                }
            }
        }

        Ok(buf)
    }

    /// Returns the full machine state as a human readable string.
    pub fn dump_state(&self) -> Result<String, fmt::Error> {
        let cpu = &self.cpu;
        let mut buf = String::new();

        write!(buf, "OPCODE: {:04X}", cpu.opcode)?;
        if let Some(instr) = Instr::decode(cpu.opcode) {
            write!(buf, " ({instr})")?;
        }
        writeln!(buf)?;
        writeln!(buf, "CYCLES: {}", cpu.cycles)?;
        writeln!(buf, "PC: 0x{:03X}  I: 0x{:03X}", cpu.pc, cpu.address)?;

        for (i, chunk) in cpu.registers.chunks(4).enumerate() {
            for (j, v) in chunk.iter().enumerate() {
                write!(buf, "V{:X}: 0x{:02X}  ", i * 4 + j, v)?;
            }
            writeln!(buf)?;
        }

        writeln!(buf, "DT: 0x{:02X}  ST: 0x{:02X}", cpu.delay_timer, cpu.sound_timer)?;

        write!(buf, "STACK:")?;
        for addr in cpu.stack.iter() {
            write!(buf, " 0x{addr:03X}")?;
        }
        writeln!(buf)?;

        if let Some(vx) = cpu.key_wait {
            writeln!(buf, "WAITING FOR KEY: v{vx:X}")?;
        }

        let keys = self.dump_keys()?;
        if !keys.is_empty() {
            writeln!(buf, "{keys}")?;
        }

        writeln!(buf, "HISTORY:")?;
        for (addr, opcode) in cpu.history.iter() {
            match Instr::decode(*opcode) {
                Some(instr) => writeln!(buf, "  0x{addr:03X}: {opcode:04X}  {instr}")?,
                None => writeln!(buf, "  0x{addr:03X}: {opcode:04X}  ???")?,
            }
        }

        Ok(buf)
    }
}

#[cfg(feature = "op_trace")]
#[inline]
fn op_trace(cpu: &Chip8Cpu, instr: &Instr) {
    log::trace!("{:04X}: {:04X} {}", cpu.pc, cpu.opcode, instr);
}

#[cfg(not(feature = "op_trace"))]
#[inline]
fn op_trace(_: &Chip8Cpu, _: &Instr) {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_clock_hz() {
        let interval: Duration = Hz(60).into();
        assert_eq!(interval.as_millis(), 16);

        let interval: Duration = Hz(0).into();
        assert_eq!(interval.as_nanos(), 0);
    }

    #[test]
    fn test_default_conf() {
        let conf = Chip8Conf::default();
        assert_eq!(conf.clock_frequency(), Hz(500));
        assert_eq!(conf.stack_depth, 16);
    }

    /// Fx0A (LD Vx, K)
    ///
    /// Wait for a keypress, then store the key value in Vx.
    /// The VM must stall while waiting, and signal the state to the outer executer.
    #[test]
    #[rustfmt::skip]
    fn test_key_wait() {
        let mut vm = Chip8Vm::new(Chip8Conf::default());
        vm.load_bytecode(&[
            0xF1, 0x0A, // LD v1, K
            0x62, 0x42  // LD v2, 0x42  ; sentinal
        ]).unwrap();

        // machine must stall
        assert_eq!(vm.cpu.pc as usize, MEM_START);
        for _ in 0..6 {
            assert_eq!(vm.step().unwrap(), Flow::KeyWait);
            assert_eq!(vm.cpu.pc as usize, MEM_START);
            assert_eq!(vm.key_wait(), Some(1));
        }

        // machine has yielded, waiting for any key to be pressed.
        vm.set_key(KeyCode::Key5, true);

        // machine will now advance
        assert_eq!(vm.step().unwrap(), Flow::Ok);
        assert_eq!(vm.cpu.pc as usize, MEM_START + 2);
        assert!(vm.cpu.key_state(0x05));
        assert_eq!(vm.cpu.registers[1], 0x05);
        assert_eq!(vm.key_wait(), None);

        // Ensure the machine is continuing
        vm.step().unwrap();
        assert_eq!(vm.cpu.pc as usize, MEM_START + 4);
        assert_eq!(vm.cpu.registers[2], 0x42); // sentinal
    }

    /// A key that was already held when the wait started does not resume the machine.
    #[test]
    fn test_key_wait_needs_new_press() {
        let mut vm = Chip8Vm::new(Chip8Conf::default());
        vm.load_bytecode(&[0xF3, 0x0A]).unwrap();

        vm.set_key(KeyCode::KeyA, true);
        assert_eq!(vm.step().unwrap(), Flow::KeyWait);
        assert_eq!(vm.step().unwrap(), Flow::KeyWait);

        // Still held, no new event.
        vm.set_key(KeyCode::KeyA, true);
        assert_eq!(vm.step().unwrap(), Flow::KeyWait);

        vm.set_key(KeyCode::KeyA, false);
        vm.set_key(KeyCode::KeyA, true);
        assert_eq!(vm.step().unwrap(), Flow::Ok);
        assert_eq!(vm.cpu.registers[3], 0xA);
    }

    #[test]
    #[rustfmt::skip]
    fn test_draw_collision() {
        let mut vm = Chip8Vm::new(Chip8Conf::default());

        // Draw two pixels next to each other.
        // The zero bits of the second draw must not erase
        // the pixels of the first draw
        //
        // draw sprite 1
        // ____####, vf == 0
        //
        // draw sprite 2
        // ########, vf == 0
        vm.load_bytecode(&[
            0xA2, 0x0C, // LD I, .sprite
            0x60, 0x04, // LD v0, 4
            0x61, 0x00, // LD v1, 0
            0xD0, 0x11, // DRW v0, v1, 1
            0x60, 0x00, // LD v0, 0
            0xD0, 0x11, // DRW v0, v1, 1
            // .sprite
            0b11110000,
            0b00000000,
        ]).unwrap();

        vm.run_steps(6).unwrap();

        assert_eq!(vm.display_buffer()[0], true); // sprite 2
        assert_eq!(vm.display_buffer()[4], true); // sprite 1
        assert_eq!(vm.display_buffer()[8], false);
        assert_eq!(vm.cpu.registers[0xF], 0);
    }

    #[test]
    fn test_dump_state() {
        let mut vm = Chip8Vm::new(Chip8Conf::default());
        vm.load_bytecode(&[0x6A, 0x12, 0x22, 0x08]).unwrap();
        vm.run_steps(2).unwrap();

        let state = vm.dump_state().unwrap();
        assert!(state.contains("OPCODE: 2208 (CALL 0x208)"));
        assert!(state.contains("PC: 0x208"));
        assert!(state.contains("VA: 0x12"));
        assert!(state.contains("STACK: 0x202"));
        assert!(state.contains("CYCLES: 2"));
    }

    #[test]
    fn test_dump_ram() {
        let mut vm = Chip8Vm::new(Chip8Conf::default());
        vm.load_bytecode(&[0x6A, 0x12, 0x22, 0x08, 0xFF]).unwrap();

        assert_eq!(vm.dump_ram(4).unwrap(), "0200: 6A12\n0202: 2208\n");
        // Odd trailing byte is paired with the following memory cell.
        assert_eq!(
            vm.dump_ram(5).unwrap(),
            "0200: 6A12\n0202: 2208\n0204: FF00\n"
        );
        assert_eq!(vm.dump_ram(0).unwrap(), "");
    }

    #[test]
    fn test_dump_state_history_after_failure() {
        let mut vm = Chip8Vm::new(Chip8Conf::default());
        vm.load_bytecode(&[
            0x6A, 0x12, // LD vA, 0x12
            0x22, 0x06, // CALL 0x206
            0x00, 0x00, // padding
            0xFF, 0xFF, // unknown
        ])
        .unwrap();

        assert!(vm.run_steps(3).is_err());
        assert_eq!(vm.cycles(), 3);
        assert_eq!(
            vm.history().collect::<Vec<_>>(),
            vec![(0x200, 0x6A12), (0x202, 0x2206), (0x206, 0xFFFF)]
        );

        let state = vm.dump_state().unwrap();
        let history: Vec<&str> = state
            .lines()
            .skip_while(|line| *line != "HISTORY:")
            .skip(1)
            .collect();
        assert_eq!(
            history,
            vec![
                "  0x200: 6A12  LD vA, 0x12",
                "  0x202: 2206  CALL 0x206",
                "  0x206: FFFF  ???",
            ]
        );
    }
}
