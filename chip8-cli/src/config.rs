//! Run configuration, loaded from YAML.
use std::{fs, path::Path};

use chip8::{constants::*, prelude::*};
use serde::Deserialize;

use crate::error::AppError;

/// Settings for a headless run.
///
/// Every field is optional in the file. Command line flags are applied
/// on top of the loaded values.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub vm: Chip8Conf,
    /// Rate at which the delay and sound timers count down.
    pub timer_frequency: Hz,
    /// Rate at which changed frames are printed.
    pub render_frequency: Hz,
    /// Number of instructions to execute before stopping.
    pub steps: Option<u64>,
    /// Print the display when it changes.
    pub render: bool,
    /// Scripted keyboard input.
    pub input: Vec<ScriptedKey>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            vm: Chip8Conf::default(),
            timer_frequency: Hz(DELAY_FREQUENCY),
            render_frequency: Hz(DEFAULT_RENDER_FREQUENCY),
            steps: None,
            render: true,
            input: Vec::new(),
        }
    }
}

/// Key event applied before the given step is executed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScriptedKey {
    pub step: u64,
    pub key: KeyCode,
    #[serde(default = "pressed_default")]
    pub pressed: bool,
}

fn pressed_default() -> bool {
    true
}

impl CliConfig {
    pub fn from_yaml(source: &str) -> Result<Self, AppError> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let source = fs::read_to_string(path)?;
        Self::from_yaml(&source)
    }

    /// Number of instructions between rendered frames.
    ///
    /// An unthrottled clock is paced as if running at the default rate.
    pub fn steps_per_frame(&self) -> Option<u64> {
        if self.render_frequency.0 == 0 {
            return None;
        }

        let cps = match self.vm.clock_frequency() {
            Hz(0) => DEFAULT_CLOCK_FREQUENCY,
            Hz(n) => n,
        };

        Some((cps / self.render_frequency.0).max(1))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_defaults() {
        let conf = CliConfig::from_yaml("{}").unwrap();
        assert_eq!(conf.vm.clock_frequency(), Hz(500));
        assert_eq!(conf.vm.stack_depth, STACK_SIZE);
        assert_eq!(conf.timer_frequency, Hz(60));
        assert_eq!(conf.render_frequency, Hz(30));
        assert_eq!(conf.steps, None);
        assert!(conf.render);
        assert!(conf.input.is_empty());
        assert_eq!(conf.steps_per_frame(), Some(16));
    }

    #[test]
    fn test_full_config() {
        let conf = CliConfig::from_yaml(
            r#"
vm:
  clock_frequency: 700
  stack_depth: 32
  seed: 7
timer_frequency: 50
render_frequency: 10
steps: 1000
render: false
input:
  - { step: 10, key: 5, pressed: true }
  - { step: 20, key: 15, pressed: false }
  - { step: 30, key: 0 }
"#,
        )
        .unwrap();

        assert_eq!(conf.vm.clock_frequency(), Hz(700));
        assert_eq!(conf.vm.stack_depth, 32);
        assert_eq!(conf.vm.seed, Some(7));
        assert_eq!(conf.timer_frequency, Hz(50));
        assert_eq!(conf.steps, Some(1000));
        assert!(!conf.render);
        assert_eq!(conf.steps_per_frame(), Some(70));
        assert_eq!(
            conf.input,
            vec![
                ScriptedKey { step: 10, key: KeyCode::Key5, pressed: true },
                ScriptedKey { step: 20, key: KeyCode::KeyF, pressed: false },
                ScriptedKey { step: 30, key: KeyCode::Key0, pressed: true },
            ]
        );
    }

    #[test]
    fn test_invalid_key() {
        let err = CliConfig::from_yaml("input: [{ step: 0, key: 16 }]").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Config(_)));
    }

    #[test]
    fn test_no_frames() {
        let conf = CliConfig::from_yaml("render_frequency: 0").unwrap();
        assert_eq!(conf.steps_per_frame(), None);

        let conf = CliConfig::from_yaml("{ vm: { clock_frequency: 0 }, render_frequency: 1000 }")
            .unwrap();
        assert_eq!(conf.steps_per_frame(), Some(1));
    }
}
