use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use ls8::region::{Chunk, LoadError};
use ls8::vm::Vm;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "ls8")]
#[command(about = "Run an LS8 program image", long_about = None)]
struct Args {
  /// Path to the `.ls8` program image
  program: PathBuf,

  /// Raise the log level (warn, info, debug, trace); logs go to stderr
  #[arg(short, long, action = ArgAction::Count)]
  verbose: u8,
}

fn level(verbose: u8) -> LevelFilter {
  match verbose {
    0 => LevelFilter::WARN,
    1 => LevelFilter::INFO,
    2 => LevelFilter::DEBUG,
    _ => LevelFilter::TRACE,
  }
}

fn run(args: &Args) -> Result<()> {
  tracing::info!("loading LS8 program {}", args.program.display());
  let chunk = Chunk::from_path(&args.program)?;
  let mut vm = Vm::new();
  vm.load(&chunk)?;

  let stdout = io::stdout();
  let mut out = stdout.lock();
  vm.run(&mut out).context("execution stopped")?;
  out.flush().context("failed to flush program output")?;
  tracing::info!("halted at {:#04x}", vm.pc());
  Ok(())
}

fn main() -> ExitCode {
  let args = Args::parse();

  let stderr_format = tracing_subscriber::fmt::layer()
    .with_writer(io::stderr)
    .with_filter(level(args.verbose));
  tracing_subscriber::registry().with(stderr_format).init();

  match run(&args) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      eprintln!("{err:#}");
      if err.downcast_ref::<LoadError>().is_some() {
        ExitCode::from(2)
      } else {
        ExitCode::from(3)
      }
    }
  }
}
