use chip8::{constants::*, prelude::*};

/// Maze, by David Winter
#[rustfmt::skip]
const MAZE: &[u8] = &[
    0xA2, 0x1E, 0xC2, 0x01, 0x32, 0x01, 0xA2, 0x1A,
    0xD0, 0x14, 0x70, 0x04, 0x30, 0x40, 0x12, 0x00,
    0x60, 0x00, 0x71, 0x04, 0x31, 0x20, 0x12, 0x00,
    0x12, 0x18, 0x80, 0x40, 0x20, 0x10, 0x20, 0x40,
    0x80, 0x10,
];

#[test]
fn test_maze_runs_to_completion() {
    let mut vm = Chip8Vm::new(Chip8Conf {
        seed: Some(42),
        ..Chip8Conf::default()
    });
    vm.load_bytecode(MAZE).unwrap();

    // The maze is finished when the program spins on its final jump.
    assert_eq!(vm.run_steps(3000).unwrap(), Flow::Jump);
    assert_eq!(vm.pc(), 0x218);
    assert_eq!(vm.registers()[1], 0x20);

    let lit = vm.display_buffer().iter().filter(|px| **px).count();
    assert!(lit > 0 && lit < DISPLAY_BUFFER_SIZE);

    let display = vm.dump_display().unwrap();
    assert_eq!(display.lines().count(), DISPLAY_HEIGHT);
    assert!(display.lines().all(|line| line.len() == DISPLAY_WIDTH));
}

#[test]
fn test_maze_listing() {
    let listing = Disassembler::new(MAZE).listing().unwrap();
    let lines: Vec<&str> = listing.lines().collect();

    assert_eq!(lines.len(), MAZE.len() / 2);
    assert_eq!(lines[0], "0x0200: A21E  LD I, 0x21E");
    assert_eq!(lines[1], "0x0202: C201  RND v2, 0x01");
    assert_eq!(lines[4], "0x0208: D014  DRW v0, v1, 4");
    assert_eq!(lines[12], "0x0218: 1218  JP 0x218");
}
