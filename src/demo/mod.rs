//! The demonstrations. Each one is self-contained, narrates what it does while
//! it runs and can print its own source instead of running.
//!
//! Two concurrency models are kept apart on purpose:
//! * `messages`, `shared_counter` and `stage_barrier` run scoped threads that
//!   share memory and synchronise through a queue, a mutex or a barrier.
//! * `array_sum`, `prime_search` and `word_count` hand owned work units to a
//!   [`WorkerPool`](crate::sync::pool::WorkerPool) and merge the results only
//!   after every worker has reported back.
pub mod array_sum;
pub mod messages;
pub mod partition;
pub mod prime_search;
pub mod shared_counter;
pub mod stage_barrier;
pub mod word_count;

use crate::config::Config;
use crate::error::RunnerError;
use crate::output::{Output, Tone};

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;
use std::thread::{Scope, ScopedJoinHandle};

pub trait Demo: Send + Sync {
  fn kind(&self) -> DemoKind;

  /// Runs the demonstration to completion. Every run starts from fresh state.
  fn execute(&self);

  /// Source of the demonstration, for display. Never runs anything.
  fn describe(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DemoKind {
  Messages,
  SharedMemory,
  ThreadSynchronization,
  Multiprocessing,
  PrimeNumbers,
  WordCount,
}

impl DemoKind {
  pub const ALL: [DemoKind; 6] = [
    DemoKind::Messages,
    DemoKind::SharedMemory,
    DemoKind::ThreadSynchronization,
    DemoKind::Multiprocessing,
    DemoKind::PrimeNumbers,
    DemoKind::WordCount,
  ];

  pub fn name(&self) -> &'static str {
    match self {
      DemoKind::Messages => "messages",
      DemoKind::SharedMemory => "shared_memory",
      DemoKind::ThreadSynchronization => "thread_synchronization",
      DemoKind::Multiprocessing => "multiprocessing",
      DemoKind::PrimeNumbers => "prime_numbers",
      DemoKind::WordCount => "word_count",
    }
  }

  pub fn summary(&self) -> &'static str {
    match self {
      DemoKind::Messages => "producer and consumer passing messages through a queue",
      DemoKind::SharedMemory => "threads incrementing one counter under a lock",
      DemoKind::ThreadSynchronization => "threads meeting at a barrier between stages",
      DemoKind::Multiprocessing => "worker pool summing random arrays",
      DemoKind::PrimeNumbers => "worker pool searching a partitioned range for primes",
      DemoKind::WordCount => "worker pool counting words across files",
    }
  }
}

impl Display for DemoKind {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.name())
  }
}

impl FromStr for DemoKind {
  type Err = RunnerError;

  fn from_str(name: &str) -> Result<Self, Self::Err> {
    DemoKind::ALL
      .iter()
      .copied()
      .find(|kind| kind.name() == name)
      .ok_or_else(|| RunnerError::UnknownDemo(name.to_owned()))
  }
}

/// Builds the demo for `kind`. Every demo reads `config` on each run.
pub fn make_demo(kind: DemoKind, config: Config, output: Arc<Output>) -> Box<dyn Demo> {
  match kind {
    DemoKind::Messages => Box::new(messages::MessagesDemo::new(config, output)),
    DemoKind::SharedMemory => Box::new(shared_counter::SharedCounterDemo::new(config, output)),
    DemoKind::ThreadSynchronization => {
      Box::new(stage_barrier::StageBarrierDemo::new(config, output))
    }
    DemoKind::Multiprocessing => Box::new(array_sum::ArraySumDemo::new(config, output)),
    DemoKind::PrimeNumbers => Box::new(prime_search::PrimeSearchDemo::new(config, output)),
    DemoKind::WordCount => Box::new(word_count::WordCountDemo::new(config, output)),
  }
}

/// Spawns a named scoped thread, reporting a failed spawn instead of
/// panicking.
pub(crate) fn spawn_worker<'scope, 'env, T, F>(
  scope: &'scope Scope<'scope, 'env>,
  output: &Output,
  name: String,
  work: F,
) -> Option<ScopedJoinHandle<'scope, T>>
where
  T: Send + 'scope,
  F: FnOnce() -> T + Send + 'scope,
{
  log::debug!("spawning {}", name);
  match std::thread::Builder::new()
    .name(name.clone())
    .spawn_scoped(scope, work)
  {
    Ok(handle) => Some(handle),
    Err(error) => {
      output.line(Tone::Alert, format!("{}: failed to start ({})", name, error));
      None
    }
  }
}

/// Joins a scoped thread. A panic is reported and yields `None`, so the caller
/// can go on joining the others.
pub(crate) fn join_worker<T>(output: &Output, handle: ScopedJoinHandle<'_, T>) -> Option<T> {
  let name = handle
    .thread()
    .name()
    .unwrap_or("worker")
    .to_owned();
  match handle.join() {
    Ok(value) => Some(value),
    Err(_) => {
      output.line(Tone::Alert, format!("{}: stopped by a panic", name));
      None
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn names_round_trip_test() {
    for kind in DemoKind::ALL {
      assert_eq!(kind.name().parse::<DemoKind>().unwrap(), kind);
    }
    assert!(matches!(
      "nonexistent".parse::<DemoKind>(),
      Err(RunnerError::UnknownDemo(name)) if name == "nonexistent"
    ));
  }

  #[test]
  fn factory_matches_kind_test() {
    let config = Config::in_memory();
    let output = Arc::new(Output::capture());
    for kind in DemoKind::ALL {
      let demo = make_demo(kind, config.clone(), output.clone());
      assert_eq!(demo.kind(), kind);
      assert!(!demo.describe().is_empty());
    }
    assert!(output.captured().is_empty());
  }
}
