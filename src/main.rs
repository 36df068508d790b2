use clap::{Parser, Subcommand};
use threadlab::config::Config;
use threadlab::output::Output;
use threadlab::runner::{Action, Runner};
use threadlab::shell::Shell;
use threadlab::utils::panic::log_panics;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(version, about = "Run small demonstrations of threads, locks, barriers and worker pools")]
struct Cli {
  /// Settings file, created with defaults when missing.
  #[arg(long, default_value = "config.json")]
  config: PathBuf,

  /// Print without colours for this session.
  #[arg(long)]
  no_color: bool,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
  /// List the available simulations.
  List,
  /// Run a simulation.
  Run { demo: String },
  /// Print the source of a simulation.
  Show { demo: String },
}

fn main() -> ExitCode {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
  log_panics();
  let cli = Cli::parse();

  let config = match Config::load(&cli.config) {
    Ok(config) => config,
    Err(error) => {
      log::error!("{}, continuing with in-memory defaults", error);
      Config::in_memory()
    }
  };
  let output = if cli.no_color {
    Output::stdout().without_colors()
  } else {
    Output::stdout()
  };
  let runner = Runner::new(config, Arc::new(output));

  let result = match cli.command {
    None => Shell::new(&runner)
      .interactive()
      .run(std::io::stdin().lock())
      .map_err(|error| error.to_string()),
    Some(Command::List) => {
      for kind in runner.demos() {
        println!("{:<24}{}", kind.name(), kind.summary());
      }
      Ok(())
    }
    Some(Command::Run { demo }) => runner
      .invoke(&demo, Action::Execute)
      .map_err(|error| error.to_string()),
    Some(Command::Show { demo }) => runner
      .invoke(&demo, Action::Describe)
      .map_err(|error| error.to_string()),
  };
  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(error) => {
      eprintln!("{}", error);
      ExitCode::FAILURE
    }
  }
}
