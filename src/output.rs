use console::Style;

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Colour of a narration line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
  Plain,
  /// Progress of a worker, green.
  Info,
  /// Explanations of what the demo illustrates, blue.
  Narration,
  /// Failures and final results, red.
  Alert,
  /// Warnings and barrier releases, yellow.
  Notice,
}

impl Tone {
  fn style(&self) -> Style {
    let style = Style::new().force_styling(true);
    match self {
      Tone::Plain => style,
      Tone::Info => style.green().bright(),
      Tone::Narration => style.blue().bright(),
      Tone::Alert => style.red().bright(),
      Tone::Notice => style.yellow().bright(),
    }
  }
}

enum Sink {
  Stdout,
  Capture(Vec<String>),
}

/// Console narration shared by concurrently running workers.
///
/// Holds the print lock: every call writes whole lines inside one critical
/// section, so lines from different threads never interleave mid-sentence.
pub struct Output {
  sink: Mutex<Sink>,
  colors: AtomicBool,
  plain: bool,
}

impl Output {
  pub fn stdout() -> Self {
    Output {
      sink: Mutex::new(Sink::Stdout),
      colors: AtomicBool::new(true),
      plain: false,
    }
  }

  /// Records uncoloured lines in memory instead of printing them.
  pub fn capture() -> Self {
    Output {
      sink: Mutex::new(Sink::Capture(Vec::new())),
      colors: AtomicBool::new(false),
      plain: true,
    }
  }

  /// Never colours, whatever [`Output::set_colors`] is later told.
  pub fn without_colors(mut self) -> Self {
    self.plain = true;
    self
  }

  pub fn set_colors(&self, enabled: bool) {
    self.colors.store(enabled, Ordering::Relaxed);
  }

  pub fn colors(&self) -> bool {
    !self.plain && self.colors.load(Ordering::Relaxed)
  }

  fn sink(&self) -> MutexGuard<'_, Sink> {
    self.sink.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn emit(&self, sink: &mut Sink, tone: Tone, text: &str) {
    match sink {
      Sink::Stdout => {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        let written = if self.colors() && tone != Tone::Plain {
          writeln!(handle, "{}", tone.style().apply_to(text))
        } else {
          writeln!(handle, "{}", text)
        };
        if let Err(error) = written {
          log::debug!("failed to write to stdout: {}", error);
        }
      }
      Sink::Capture(lines) => lines.extend(text.lines().map(str::to_owned)),
    }
  }

  pub fn line(&self, tone: Tone, text: impl AsRef<str>) {
    let mut sink = self.sink();
    self.emit(&mut sink, tone, text.as_ref());
  }

  /// Writes several lines without letting another thread in between.
  pub fn block<S: AsRef<str>>(&self, lines: &[(Tone, S)]) {
    let mut sink = self.sink();
    for (tone, text) in lines {
      self.emit(&mut sink, *tone, text.as_ref());
    }
  }

  /// Lines recorded so far by a capturing output, empty for stdout.
  pub fn captured(&self) -> Vec<String> {
    match &*self.sink() {
      Sink::Stdout => Vec::new(),
      Sink::Capture(lines) => lines.clone(),
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  use std::sync::Arc;

  #[test]
  fn capture_records_lines_test() {
    let output = Output::capture();
    output.line(Tone::Info, "one");
    output.block(&[(Tone::Narration, "two"), (Tone::Plain, "three\nfour")]);
    assert_eq!(output.captured(), ["one", "two", "three", "four"]);
  }

  #[test]
  fn blocks_stay_together_test() {
    let output = Arc::new(Output::capture());
    let handles: Vec<_> = (0..4)
      .map(|id| {
        let output = output.clone();
        std::thread::spawn(move || {
          for _ in 0..50 {
            output.block(&[
              (Tone::Info, format!("{} first", id)),
              (Tone::Info, format!("{} second", id)),
            ]);
          }
        })
      })
      .collect();
    for handle in handles {
      handle.join().unwrap();
    }
    let lines = output.captured();
    assert_eq!(lines.len(), 400);
    for pair in lines.chunks(2) {
      let id = pair[0].split(' ').next().unwrap();
      assert_eq!(pair[1], format!("{} second", id));
    }
  }
}
