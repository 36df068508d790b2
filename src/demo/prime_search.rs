use super::partition::partition_range;
use super::{Demo, DemoKind};
use crate::config::{keys, Config};
use crate::output::{Output, Tone};
use crate::sync::pool::{TaskError, WorkerPool, WorkerPoolBuilder};

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Trial division up to the integer square root.
pub fn is_prime(n: i64) -> bool {
  if n < 2 {
    return false;
  }
  let mut i = 2;
  while i <= n / i {
    if n % i == 0 {
      return false;
    }
    i += 1;
  }
  true
}

pub fn primes_in(range: RangeInclusive<i64>) -> Vec<i64> {
  range.filter(|n| is_prime(*n)).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimeReport {
  pub workers: usize,
  pub partitions: Vec<RangeInclusive<i64>>,
  /// Ascending, partitions concatenated in order.
  pub primes: Vec<i64>,
  pub failures: Vec<TaskError>,
  pub elapsed: Duration,
}

/// Searches every partition on the pool and concatenates the results in
/// partition order.
pub fn search(
  pool: &WorkerPool,
  partitions: Vec<RangeInclusive<i64>>,
) -> (Vec<i64>, Vec<TaskError>) {
  let mut primes = Vec::new();
  let mut failures = Vec::new();
  for result in pool.map(partitions, primes_in) {
    match result {
      Ok(found) => primes.extend(found),
      Err(error) => failures.push(error),
    }
  }
  (primes, failures)
}

pub struct PrimeSearchDemo {
  config: Config,
  output: Arc<Output>,
}

impl PrimeSearchDemo {
  pub fn new(config: Config, output: Arc<Output>) -> Self {
    PrimeSearchDemo { config, output }
  }

  pub fn run(&self) -> PrimeReport {
    let start = self.config.int(keys::START_NUMBER);
    let end = self.config.int(keys::END_NUMBER);
    let pool = WorkerPoolBuilder::named("primes")
      .size(self.config.count(keys::NUM_PROCESSES))
      .build();
    let partitions = partition_range(start, end, pool.size());

    let started = Instant::now();
    let (primes, failures) = search(&pool, partitions.clone());
    let elapsed = started.elapsed();
    let report = PrimeReport {
      workers: pool.size(),
      partitions,
      primes,
      failures,
      elapsed,
    };
    drop(pool);

    let first: Vec<String> = report.primes.iter().take(10).map(i64::to_string).collect();
    let mut lines = vec![
      (
        Tone::Narration,
        "Blueprint: This simulation demonstrates how a worker pool can distribute CPU-intensive tasks like prime number computation."
          .to_owned(),
      ),
      (Tone::Info, "Prime Number Calculation Results:".to_owned()),
      (Tone::Info, format!("- Number of workers used: {}", report.workers)),
      (Tone::Info, format!("- Range checked: {} to {}", start, end)),
      (Tone::Info, format!("- Number of primes found: {}", report.primes.len())),
      (
        Tone::Info,
        format!("- Time taken: {:.4} seconds", report.elapsed.as_secs_f64()),
      ),
      (Tone::Plain, format!("First 10 primes: [{}]", first.join(", "))),
    ];
    for failure in &report.failures {
      lines.push((Tone::Alert, format!("A partition was lost: {}", failure)));
    }
    self.output.block(&lines);
    report
  }
}

impl Demo for PrimeSearchDemo {
  fn kind(&self) -> DemoKind {
    DemoKind::PrimeNumbers
  }

  fn execute(&self) {
    let report = self.run();
    log::info!(
      "prime numbers: {} found over {} partitions",
      report.primes.len(),
      report.partitions.len()
    );
  }

  fn describe(&self) -> &'static str {
    include_str!("prime_search.rs")
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::utils::testing::deadline;

  fn demo(start: &str, end: &str, processes: &str) -> (PrimeSearchDemo, Arc<Output>) {
    let config = Config::in_memory();
    config.update(keys::START_NUMBER, start).unwrap();
    config.update(keys::END_NUMBER, end).unwrap();
    config.update(keys::NUM_PROCESSES, processes).unwrap();
    let output = Arc::new(Output::capture());
    (PrimeSearchDemo::new(config, output.clone()), output)
  }

  #[test]
  fn is_prime_test() {
    let primes: Vec<i64> = (-5..30).filter(|n| is_prime(*n)).collect();
    assert_eq!(primes, [2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
    assert!(is_prime(7919));
    assert!(!is_prime(7917));
  }

  #[test]
  fn small_range_test() {
    deadline(Duration::from_secs(10), || {
      for processes in ["1", "2", "3", "8"] {
        let (demo, _) = demo("2", "10", processes);
        let report = demo.run();
        assert_eq!(report.primes, [2, 3, 5, 7]);
        assert!(report.failures.is_empty());
      }
    });
  }

  #[test]
  fn independent_of_pool_size_test() {
    deadline(Duration::from_secs(20), || {
      let expected = primes_in(2..=5_000);
      for processes in ["1", "4", "7"] {
        let (demo, _) = demo("2", "5000", processes);
        assert_eq!(demo.run().primes, expected);
      }
      assert_eq!(expected.len(), 669);
    });
  }

  #[test]
  fn no_primes_found_test() {
    deadline(Duration::from_secs(10), || {
      let (demo, output) = demo("24", "28", "2");
      let report = demo.run();
      assert!(report.primes.is_empty());
      let lines = output.captured();
      assert!(lines.contains(&"- Number of primes found: 0".to_owned()));
      assert!(lines.contains(&"First 10 primes: []".to_owned()));
    });
  }
}
