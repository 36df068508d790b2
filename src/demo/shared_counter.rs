use super::{join_worker, spawn_worker, Demo, DemoKind};
use crate::config::{keys, Config};
use crate::output::{Output, Tone};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

pub const INCREMENTS_PER_WORKER: usize = 100_000;

/// Each worker reports the counter every this many of its own iterations.
pub const REPORT_EVERY: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterReport {
  pub workers: usize,
  pub total: u64,
  pub expected: u64,
}

impl CounterReport {
  pub fn is_exact(&self) -> bool {
    self.total == self.expected
  }
}

/// Many threads incrementing one integer, each increment inside the lock.
pub struct SharedCounterDemo {
  config: Config,
  output: Arc<Output>,
}

fn lock(counter: &Mutex<u64>) -> MutexGuard<'_, u64> {
  counter.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SharedCounterDemo {
  pub fn new(config: Config, output: Arc<Output>) -> Self {
    SharedCounterDemo { config, output }
  }

  fn increment(&self, counter: &Mutex<u64>, name: &str, delay: Duration) {
    for i in 0..INCREMENTS_PER_WORKER {
      *lock(counter) += 1;
      if i % REPORT_EVERY == 0 {
        thread::sleep(delay);
        // Read after the lock was released: other workers keep going, so
        // the value is only a snapshot.
        let snapshot = *lock(counter);
        self.output.block(&[
          (Tone::Info, format!("{}: Counter is now {}", name, snapshot)),
          (
            Tone::Narration,
            "Blueprint: All threads are trying to add to the same bank account, but only one can do it at a time."
              .to_owned(),
          ),
        ]);
      }
    }
  }

  pub fn run(&self) -> CounterReport {
    let workers = self.config.count(keys::MAX_THREADS);
    let delay = self.config.seconds(keys::DELAY_BETWEEN_MESSAGES);
    let counter = Mutex::new(0u64);
    self.output.line(
      Tone::Narration,
      "Blueprint: Here, we're showing how threads can safely share and modify memory using locks to avoid race conditions.",
    );

    thread::scope(|s| {
      let handles: Vec<_> = (1..=workers)
        .filter_map(|id| {
          let name = format!("Thread-{}", id);
          let counter = &counter;
          spawn_worker(s, &self.output, name.clone(), move || {
            self.increment(counter, &name, delay)
          })
        })
        .collect();
      for handle in handles {
        join_worker(&self.output, handle);
      }
    });

    let report = CounterReport {
      workers,
      total: *lock(&counter),
      expected: (workers * INCREMENTS_PER_WORKER) as u64,
    };
    self.output.block(&[
      (Tone::Alert, format!("Final counter value: {}", report.total)),
      (
        Tone::Plain,
        format!("Expected count if no race condition: {}", report.expected),
      ),
    ]);
    report
  }
}

impl Demo for SharedCounterDemo {
  fn kind(&self) -> DemoKind {
    DemoKind::SharedMemory
  }

  fn execute(&self) {
    let report = self.run();
    if !report.is_exact() {
      log::error!(
        "shared counter lost updates: {} != {}",
        report.total,
        report.expected
      );
    }
  }

  fn describe(&self) -> &'static str {
    include_str!("shared_counter.rs")
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::utils::testing::deadline;

  fn demo(max_threads: &str) -> (SharedCounterDemo, Arc<Output>) {
    let config = Config::in_memory();
    config.update(keys::MAX_THREADS, max_threads).unwrap();
    config.update(keys::DELAY_BETWEEN_MESSAGES, "0").unwrap();
    let output = Arc::new(Output::capture());
    (SharedCounterDemo::new(config, output.clone()), output)
  }

  #[test]
  fn counter_is_exact_test() {
    deadline(Duration::from_secs(30), || {
      for workers in ["1", "2", "5"] {
        let (demo, _) = demo(workers);
        let report = demo.run();
        assert!(report.is_exact(), "{:?}", report);
        assert_eq!(report.total, report.workers as u64 * 100_000);
      }
    });
  }

  #[test]
  fn progress_is_reported_test() {
    deadline(Duration::from_secs(30), || {
      let (demo, output) = demo("2");
      demo.run();
      let lines = output.captured();
      for name in ["Thread-1", "Thread-2"] {
        let reports = lines
          .iter()
          .filter(|line| line.starts_with(&format!("{}: Counter is now", name)))
          .count();
        assert_eq!(reports, INCREMENTS_PER_WORKER / REPORT_EVERY);
      }
      assert!(lines.contains(&"Final counter value: 200000".to_owned()));
      assert!(lines.contains(&"Expected count if no race condition: 200000".to_owned()));
    });
  }

  #[test]
  fn second_run_resets_counter_test() {
    deadline(Duration::from_secs(30), || {
      let (demo, _) = demo("3");
      assert_eq!(demo.run().total, 300_000);
      assert_eq!(demo.run().total, 300_000);
    });
  }
}
