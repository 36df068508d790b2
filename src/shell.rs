use crate::config::{kind_of, Kind};
use crate::demo::DemoKind;
use crate::output::Tone;
use crate::runner::{Action, Runner};

use std::io::{self, BufRead, Write};

pub const CONFIG_USAGE: &str = "Usage: config [key] [value] or config to view all configs";

/// Line-oriented command loop over a [`Runner`].
pub struct Shell<'a> {
  runner: &'a Runner,
  prompt: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
  Continue,
  Exit,
}

impl<'a> Shell<'a> {
  pub fn new(runner: &'a Runner) -> Self {
    Shell {
      runner,
      prompt: false,
    }
  }

  /// Prints a prompt before reading each command.
  pub fn interactive(mut self) -> Self {
    self.prompt = true;
    self
  }

  pub fn run<R: BufRead>(&self, input: R) -> io::Result<()> {
    let output = self.runner.output();
    if self.prompt {
      output.line(
        Tone::Narration,
        "Welcome to the Thread Simulation Menu. Type help or ? to list commands.",
      );
    }
    let mut lines = input.lines();
    loop {
      if self.prompt {
        let mut stdout = io::stdout();
        write!(stdout, "(thread_sim) ")?;
        stdout.flush()?;
      }
      let line = match lines.next() {
        Some(line) => line?,
        None => break,
      };
      if self.execute(&line) == Flow::Exit {
        return Ok(());
      }
    }
    output.line(Tone::Info, "Exiting...");
    Ok(())
  }

  fn execute(&self, line: &str) -> Flow {
    let output = self.runner.output();
    let mut words = line.split_whitespace();
    let command = match words.next() {
      Some(command) => command,
      None => return Flow::Continue,
    };
    let args: Vec<&str> = words.collect();
    match command {
      "exit" | "quit" => {
        output.line(Tone::Info, "Exiting...");
        return Flow::Exit;
      }
      "help" | "?" => self.help(),
      "list" => self.list(),
      "config" => self.config(&args),
      name => self.demo(name, &args),
    }
    Flow::Continue
  }

  fn help(&self) {
    let mut lines = vec![(Tone::Plain, "Commands:".to_owned())];
    for kind in self.runner.demos() {
      lines.push((
        Tone::Plain,
        format!("  {} [run/show]  {}", kind.name(), kind.summary()),
      ));
    }
    lines.push((
      Tone::Plain,
      "  config [key] [value]  view or change settings".to_owned(),
    ));
    lines.push((Tone::Plain, "  list  list simulations".to_owned()));
    lines.push((Tone::Plain, "  exit  leave the menu".to_owned()));
    self.runner.output().block(&lines);
  }

  fn list(&self) {
    let lines: Vec<(Tone, String)> = self
      .runner
      .demos()
      .enumerate()
      .map(|(i, kind)| (Tone::Plain, format!("{}. {}", i + 1, kind.name())))
      .collect();
    self.runner.output().block(&lines);
  }

  fn config(&self, args: &[&str]) {
    let output = self.runner.output();
    let config = self.runner.config();
    match args {
      [] => {
        let lines: Vec<(Tone, String)> = config
          .entries()
          .into_iter()
          .map(|(key, value)| (Tone::Plain, format!("{}: {}", key, value)))
          .collect();
        output.block(&lines);
      }
      [key] => match config.lookup(key) {
        Some(value) => output.line(Tone::Plain, format!("{}: {}", key, value)),
        None => output.line(
          Tone::Plain,
          format!("Configuration key '{}' not found.", key),
        ),
      },
      [key, raw] => self.update(key, raw),
      // "python, rust" arrives split on whitespace.
      [key, rest @ ..] if kind_of(key) == Some(Kind::Words) => {
        self.update(key, &rest.join(" "))
      }
      _ => output.line(Tone::Plain, CONFIG_USAGE),
    }
  }

  fn update(&self, key: &str, raw: &str) {
    let output = self.runner.output();
    match self.runner.update_config(key, raw) {
      Ok(value) => output.line(Tone::Info, format!("Updated {}: {}", key, value)),
      Err(error) => output.line(Tone::Alert, error.to_string()),
    }
  }

  fn demo(&self, name: &str, args: &[&str]) {
    let output = self.runner.output();
    let action = match args {
      [arg] if arg.eq_ignore_ascii_case("run") => Action::Execute,
      [arg] if arg.eq_ignore_ascii_case("show") => Action::Describe,
      _ => {
        if name.parse::<DemoKind>().is_ok() {
          output.line(Tone::Alert, "Invalid command. Use 'run' or 'show'.");
        } else {
          output.line(Tone::Alert, format!("Unknown command '{}'. Type help.", name));
        }
        return;
      }
    };
    if let Err(error) = self.runner.invoke(name, action) {
      output.line(Tone::Alert, error.to_string());
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::config::{keys, Config, Value};
  use crate::output::Output;

  use std::sync::Arc;

  fn session(script: &str) -> (Runner, Vec<String>) {
    let runner = Runner::new(Config::in_memory(), Arc::new(Output::capture()));
    Shell::new(&runner).run(script.as_bytes()).unwrap();
    let lines = runner.output().captured();
    (runner, lines)
  }

  #[test]
  fn config_set_and_get_test() {
    let (runner, lines) = session("config message_count 10\nconfig message_count\n");
    assert_eq!(runner.config().lookup(keys::MESSAGE_COUNT), Some(Value::Int(10)));
    assert!(lines.contains(&"message_count: 10".to_owned()));
  }

  #[test]
  fn config_usage_test() {
    let (_, lines) = session("config invalid input extra\n");
    assert!(lines.contains(&CONFIG_USAGE.to_owned()));
  }

  #[test]
  fn config_view_all_test() {
    let (_, lines) = session("config\n");
    for expected in [
      "message_count: 5",
      "delay_between_messages: 2",
      "max_threads: 10",
      "use_colors: true",
    ] {
      assert!(lines.contains(&expected.to_owned()), "missing '{}'", expected);
    }
  }

  #[test]
  fn word_list_with_spaces_test() {
    let (runner, lines) = session("config words_to_count python, rust,  thread\n");
    assert_eq!(
      runner.config().words(keys::WORDS_TO_COUNT),
      ["python", "rust", "thread"]
    );
    assert!(lines.contains(&"Updated words_to_count: [python, rust, thread]".to_owned()));
    assert!(!lines.contains(&CONFIG_USAGE.to_owned()));
  }

  #[test]
  fn config_missing_key_test() {
    let (_, lines) = session("config nonexistent_key\n");
    assert!(lines.contains(&"Configuration key 'nonexistent_key' not found.".to_owned()));
  }

  #[test]
  fn rejected_value_is_reported_test() {
    let (runner, lines) = session("config max_threads lots\n");
    assert_eq!(runner.config().count(keys::MAX_THREADS), 10);
    assert!(lines.iter().any(|line| line.starts_with("invalid value 'lots'")));
  }

  #[test]
  fn bad_subcommand_test() {
    let (_, lines) = session("messages jump\nnonexistent run\n");
    assert!(lines.contains(&"Invalid command. Use 'run' or 'show'.".to_owned()));
    assert!(lines.contains(&"Simulation 'nonexistent' not found.".to_owned()));
  }

  #[test]
  fn show_and_exit_test() {
    let (_, lines) = session("word_count SHOW\nexit\nmessages run\n");
    assert!(lines.iter().any(|line| line.contains("pub struct WordCountDemo")));
    assert_eq!(lines.last().unwrap(), "Exiting...");
    assert!(!lines.iter().any(|line| line.starts_with("Producer:")));
  }
}
