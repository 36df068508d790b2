use super::{join_worker, spawn_worker, Demo, DemoKind};
use crate::config::{keys, Config};
use crate::output::{Output, Tone};
use crate::sync::barrier::{Barrier, BarrierError};

use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub const STAGES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
  Completed,
  /// Released from a broken barrier while waiting at the end of `stage`.
  Abandoned { stage: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageReport {
  pub workers: usize,
  pub completed: usize,
  /// Workers that exited early, through a broken barrier or a panic.
  pub abandoned: usize,
}

/// Workers running stages in lock-step, meeting at one reusable barrier
/// between stages.
pub struct StageBarrierDemo {
  config: Config,
  output: Arc<Output>,
  dropout: Option<(usize, usize)>,
}

impl StageBarrierDemo {
  pub fn new(config: Config, output: Arc<Output>) -> Self {
    StageBarrierDemo {
      config,
      output,
      dropout: None,
    }
  }

  /// Makes worker `id` walk away instead of starting `stage`. The barrier
  /// breaks and everyone still waiting on it exits.
  pub fn with_dropout(mut self, id: usize, stage: usize) -> Self {
    self.dropout = Some((id, stage));
    self
  }

  fn worker(&self, id: usize, barrier: &Barrier, delay: Duration) -> StageOutcome {
    let participant = barrier.participant();
    for stage in 1..=STAGES {
      if self.dropout == Some((id, stage)) {
        self.output.line(
          Tone::Alert,
          format!("Thread-{}: Leaving before stage {}", id, stage),
        );
        participant.abandon();
        return StageOutcome::Abandoned { stage };
      }
      self
        .output
        .line(Tone::Info, format!("Thread-{}: Starting stage {}", id, stage));
      thread::sleep(delay);
      self.output.line(
        Tone::Narration,
        format!("Thread-{}: Waiting at barrier for stage {}", id, stage),
      );
      match participant.wait() {
        Ok(_) => self.output.line(
          Tone::Notice,
          format!("Thread-{}: Passed barrier for stage {}", id, stage),
        ),
        Err(BarrierError::Broken) => {
          self
            .output
            .line(Tone::Alert, format!("Thread-{}: Barrier broken. Exiting.", id));
          return StageOutcome::Abandoned { stage };
        }
      }
    }
    StageOutcome::Completed
  }

  pub fn run(&self) -> StageReport {
    let workers = self.config.count(keys::NUM_THREADS);
    let delay = self.config.seconds(keys::DELAY_BETWEEN_STAGES);
    let barrier = Barrier::new(workers);
    self.output.line(
      Tone::Narration,
      "Blueprint: Threads will perform tasks in stages, synchronizing at barriers before moving to the next stage.",
    );

    let completed = thread::scope(|s| {
      let mut handles = Vec::new();
      for id in 0..workers {
        let barrier = &barrier;
        match spawn_worker(s, &self.output, format!("Thread-{}", id), move || {
          self.worker(id, barrier, delay)
        }) {
          Some(handle) => handles.push(handle),
          // The missing party would never arrive.
          None => {
            barrier.abort();
            break;
          }
        }
      }
      // Workers that failed to spawn or panicked count as abandoned.
      handles
        .into_iter()
        .filter_map(|handle| join_worker(&self.output, handle))
        .filter(|outcome| *outcome == StageOutcome::Completed)
        .count()
    });

    let report = StageReport {
      workers,
      completed,
      abandoned: workers - completed,
    };
    if report.abandoned == 0 {
      self
        .output
        .line(Tone::Info, "All threads completed their tasks.");
    } else {
      self.output.line(
        Tone::Alert,
        format!(
          "{} of {} threads exited before finishing all stages.",
          report.abandoned, report.workers
        ),
      );
    }
    report
  }
}

impl Demo for StageBarrierDemo {
  fn kind(&self) -> DemoKind {
    DemoKind::ThreadSynchronization
  }

  fn execute(&self) {
    let report = self.run();
    log::info!(
      "thread synchronization: {}/{} workers completed",
      report.completed,
      report.workers
    );
  }

  fn describe(&self) -> &'static str {
    include_str!("stage_barrier.rs")
  }
}
