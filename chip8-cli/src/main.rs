//! Entrypoint for CLI
mod clock;
mod config;
mod error;
mod runner;

use std::{env, fs, io, process};

use chip8::{prelude::*, IMPL_VERSION};
use log::{debug, error, info};

use self::{config::CliConfig, error::AppError, runner::Runner};

static USAGE: &str = r#"
usage: chip8 CMD [OPTIONS] FILE

commands:
    run     Run the target ROM file
    dis     Disassemble the target ROM into readable assembly

options (run):
    --config FILE   YAML run configuration
    --steps N       Stop after N instructions
    --cps N         Instructions per second, 0 for unthrottled
    --fps N         Frames per second printed to stdout
    --quiet         Don't print frames

examples:
    chip8 run maze.ch8 --steps 2000
    chip8 dis maze.ch8
"#;

fn main() {
    if let Err(err) = simple_logger::SimpleLogger::new().env().init() {
        eprintln!("failed to install logger: {err}");
    }

    let cmd = match parse_args(env::args().skip(1)) {
        Ok(cmd) => cmd,
        Err(err) => {
            eprintln!("{err}");
            print_usage();
            // FreeBSD EX_USAGE (64)
            process::exit(64)
        }
    };

    let result = match cmd {
        Cmd::Run { filepath, opts } => run_bytecode(filepath, opts),
        Cmd::Dis { filepath } => run_disassembler(filepath),
    };

    if let Err(err) = result {
        error!("{err}");
        process::exit(1)
    }
}

fn run_bytecode(filepath: String, opts: RunOpts) -> Result<(), AppError> {
    let conf = opts.into_config()?;
    let bytecode = fs::read(&filepath)?;

    info!("loading {filepath}");

    let mut runner = Runner::new(conf, io::stdout());
    runner.load_bytecode(&bytecode)?;

    if let Err(err) = runner.run() {
        error!("execution stopped after {} steps", runner.steps());
        match runner.vm().dump_state() {
            Ok(dump) => println!("{dump}"),
            Err(fmt_err) => error!("failed to dump machine state: {fmt_err}"),
        }
        match runner.vm().dump_ram(bytecode.len()) {
            Ok(ram) => debug!("program memory:\n{ram}"),
            Err(fmt_err) => error!("failed to dump program memory: {fmt_err}"),
        }
        return Err(err);
    }

    info!("printed {} frames", runner.frames());

    Ok(())
}

fn run_disassembler(filepath: String) -> Result<(), AppError> {
    let bytecode = fs::read(&filepath)?;
    let listing = Disassembler::new(&bytecode)
        .listing()
        .map_err(Chip8Error::from)?;
    print!("{listing}");

    Ok(())
}

fn print_usage() {
    println!("Chip8 v{IMPL_VERSION}");
    println!("{USAGE}");
}

#[derive(Debug, PartialEq, Eq)]
enum Cmd {
    /// Run file
    Run { filepath: String, opts: RunOpts },
    /// Disassemble
    Dis { filepath: String },
}

/// Command line overrides for the run configuration.
#[derive(Debug, Default, PartialEq, Eq)]
struct RunOpts {
    config: Option<String>,
    steps: Option<u64>,
    cps: Option<u64>,
    fps: Option<u64>,
    quiet: bool,
}

impl RunOpts {
    fn into_config(self) -> Result<CliConfig, AppError> {
        let mut conf = match self.config {
            Some(path) => CliConfig::from_file(path)?,
            None => CliConfig::default(),
        };

        if let Some(steps) = self.steps {
            conf.steps = Some(steps);
        }
        if let Some(cps) = self.cps {
            conf.vm.clock_frequency = Some(Hz(cps));
        }
        if let Some(fps) = self.fps {
            conf.render_frequency = Hz(fps);
        }
        if self.quiet {
            conf.render = false;
        }

        Ok(conf)
    }
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Cmd, AppError> {
    let cmd = args
        .next()
        .ok_or_else(|| AppError::usage("missing command"))?;

    match cmd.as_str() {
        "run" => {
            let mut filepath = None;
            let mut opts = RunOpts::default();

            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--config" => opts.config = Some(consume_arg(&mut args, &arg)?),
                    "--steps" => opts.steps = Some(consume_number(&mut args, &arg)?),
                    "--cps" => opts.cps = Some(consume_number(&mut args, &arg)?),
                    "--fps" => opts.fps = Some(consume_number(&mut args, &arg)?),
                    "--quiet" => opts.quiet = true,
                    flag if flag.starts_with("--") => {
                        return Err(AppError::usage(format!("unknown option {flag}")))
                    }
                    _ if filepath.is_none() => filepath = Some(arg),
                    _ => return Err(AppError::usage(format!("unexpected argument {arg}"))),
                }
            }

            Ok(Cmd::Run {
                filepath: filepath.ok_or_else(|| AppError::usage("missing ROM file"))?,
                opts,
            })
        }
        "dis" => Ok(Cmd::Dis {
            filepath: consume_arg(&mut args, &cmd)?,
        }),
        _ => Err(AppError::usage(format!("unknown command {cmd}"))),
    }
}

/// Consumes the value following a command or option.
fn consume_arg(args: &mut impl Iterator<Item = String>, name: &str) -> Result<String, AppError> {
    args.next()
        .ok_or_else(|| AppError::usage(format!("{name} expects a value")))
}

fn consume_number(args: &mut impl Iterator<Item = String>, name: &str) -> Result<u64, AppError> {
    let value = consume_arg(args, name)?;
    value
        .parse()
        .map_err(|_| AppError::usage(format!("{name} expects a number, got {value}")))
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(line: &str) -> Result<Cmd, AppError> {
        parse_args(line.split_whitespace().map(String::from))
    }

    #[test]
    fn test_parse_run() {
        assert_eq!(
            parse("run maze.ch8").unwrap(),
            Cmd::Run {
                filepath: "maze.ch8".to_string(),
                opts: RunOpts::default(),
            }
        );

        assert_eq!(
            parse("run --steps 200 maze.ch8 --cps 0 --fps 10 --quiet --config run.yaml").unwrap(),
            Cmd::Run {
                filepath: "maze.ch8".to_string(),
                opts: RunOpts {
                    config: Some("run.yaml".to_string()),
                    steps: Some(200),
                    cps: Some(0),
                    fps: Some(10),
                    quiet: true,
                },
            }
        );
    }

    #[test]
    fn test_parse_dis() {
        assert_eq!(
            parse("dis maze.ch8").unwrap(),
            Cmd::Dis {
                filepath: "maze.ch8".to_string()
            }
        );
    }

    #[test]
    fn test_usage_errors() {
        for line in [
            "",
            "asm maze.asm",
            "dis",
            "run",
            "run --steps",
            "run --steps many maze.ch8",
            "run --turbo maze.ch8",
            "run a.ch8 b.ch8",
        ] {
            let err = parse(line).unwrap_err();
            assert!(
                matches!(err.kind, crate::error::ErrorKind::Usage(_)),
                "{line:?} gave {err}"
            );
        }
    }

    #[test]
    fn test_flags_override_defaults() {
        let conf = RunOpts {
            steps: Some(5),
            cps: Some(1000),
            fps: Some(60),
            quiet: true,
            ..RunOpts::default()
        }
        .into_config()
        .unwrap();

        assert_eq!(conf.steps, Some(5));
        assert_eq!(conf.vm.clock_frequency(), Hz(1000));
        assert_eq!(conf.render_frequency, Hz(60));
        assert!(!conf.render);
        assert_eq!(conf.timer_frequency, Hz(60));
    }
}
