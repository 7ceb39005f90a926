//! Headless host loop.
use std::{collections::VecDeque, io::Write};

use chip8::prelude::*;
use log::{info, warn};

use crate::{
    clock::Clock,
    config::{CliConfig, ScriptedKey},
    error::AppError,
};

/// Drives a [`Chip8Vm`] at the configured rates, feeding it scripted
/// input and printing frames to `out`.
pub struct Runner<W> {
    vm: Chip8Vm,
    out: W,
    script: VecDeque<ScriptedKey>,
    step_budget: Option<u64>,
    steps: u64,
    cpu_clock: Clock,
    timer_clock: Clock,
    steps_per_frame: Option<u64>,
    render: bool,
    /// Display changed since the last printed frame.
    dirty: bool,
    frames: u64,
    buzzer: bool,
    /// Waiting on a key with no scripted input left.
    starved: bool,
}

impl<W: Write> Runner<W> {
    pub fn new(conf: CliConfig, out: W) -> Self {
        let steps_per_frame = conf.steps_per_frame();
        let mut script: Vec<ScriptedKey> = conf.input;
        script.sort_by_key(|event| event.step);

        Self {
            cpu_clock: Clock::new(conf.vm.clock_frequency()),
            timer_clock: Clock::new(conf.timer_frequency),
            vm: Chip8Vm::new(conf.vm),
            out,
            script: script.into(),
            step_budget: conf.steps,
            steps: 0,
            steps_per_frame,
            render: conf.render,
            dirty: false,
            frames: 0,
            buzzer: false,
            starved: false,
        }
    }

    pub fn load_bytecode(&mut self, bytecode: &[u8]) -> Result<(), AppError> {
        self.vm.load_bytecode(bytecode)?;
        self.steps = 0;
        self.dirty = false;
        Ok(())
    }

    pub fn vm(&self) -> &Chip8Vm {
        &self.vm
    }

    /// Instructions executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Frames printed so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Run until the step budget is spent.
    ///
    /// Without a budget, the run also ends when the program waits for
    /// a key and the input script is exhausted. Core failures are
    /// returned with the VM left as it was at the failing instruction.
    pub fn run(&mut self) -> Result<(), AppError> {
        info!("running program");

        self.cpu_clock.reset();
        self.timer_clock.reset();

        while self.step_budget.map_or(true, |budget| self.steps < budget) {
            self.apply_script();

            let flow = self.vm.step()?;
            self.steps += 1;

            if flow == Flow::KeyWait && self.script.is_empty() {
                if !self.starved {
                    warn!("waiting for key input, but no scripted input is left");
                    self.starved = true;
                }
                if self.step_budget.is_none() {
                    break;
                }
            } else {
                self.starved = false;
            }

            if self.vm.draw_flag() {
                self.dirty = true;
            }

            if self.timer_clock.tick() {
                self.vm.tick_timers();
            }
            self.update_buzzer();

            if let Some(n) = self.steps_per_frame {
                if self.steps % n == 0 {
                    self.present()?;
                }
            }

            self.cpu_clock.wait();
        }

        self.present()?;
        info!("finished after {} steps", self.steps);

        Ok(())
    }

    /// Apply every scripted key event that is due.
    fn apply_script(&mut self) {
        while let Some(event) = self.script.front() {
            if event.step > self.steps {
                break;
            }
            self.vm.set_key(event.key, event.pressed);
            self.script.pop_front();
        }
    }

    fn update_buzzer(&mut self) {
        let active = self.vm.sound_active();
        if active != self.buzzer {
            if active {
                info!("buzzer on");
            } else {
                info!("buzzer off");
            }
            self.buzzer = active;
        }
    }

    /// Print the display if it changed since the last frame.
    fn present(&mut self) -> Result<(), AppError> {
        if self.render && self.dirty {
            let display = self.vm.dump_display().map_err(Chip8Error::from)?;
            writeln!(self.out, "{display}")?;
            self.frames += 1;
        }
        self.dirty = false;

        Ok(())
    }
}
