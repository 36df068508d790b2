use super::{Demo, DemoKind};
use crate::config::{keys, Config};
use crate::output::{Output, Tone};
use crate::sync::pool::{TaskError, WorkerPool, WorkerPoolBuilder};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use std::sync::Arc;
use std::time::{Duration, Instant};

/// One array handed to a worker.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayUnit {
  Values(Vec<f64>),
  /// `len` values uniformly drawn from `[0, 1)`, generated by the worker from
  /// `seed` so the parent never holds them.
  Seeded { seed: u64, len: usize },
}

impl ArrayUnit {
  pub fn sum(&self) -> f64 {
    match self {
      ArrayUnit::Values(values) => values.iter().sum(),
      ArrayUnit::Seeded { seed, len } => {
        let mut rng = StdRng::seed_from_u64(*seed);
        (0..*len).map(|_| rng.gen::<f64>()).sum()
      }
    }
  }
}

/// Sums every unit on the pool, then adds the partial sums in unit order.
pub fn reduce(pool: &WorkerPool, units: Vec<ArrayUnit>) -> (f64, Vec<TaskError>) {
  let mut total = 0.0;
  let mut failures = Vec::new();
  for result in pool.map(units, |unit| unit.sum()) {
    match result {
      Ok(partial) => total += partial,
      Err(error) => failures.push(error),
    }
  }
  (total, failures)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SumReport {
  pub arrays: usize,
  pub array_size: usize,
  pub workers: usize,
  pub total: f64,
  pub failures: Vec<TaskError>,
  pub elapsed: Duration,
}

/// Sums random arrays in parallel on a worker pool.
pub struct ArraySumDemo {
  config: Config,
  output: Arc<Output>,
}

impl ArraySumDemo {
  pub fn new(config: Config, output: Arc<Output>) -> Self {
    ArraySumDemo { config, output }
  }

  pub fn run(&self) -> SumReport {
    let array_size = self.config.count(keys::ARRAY_SIZE);
    let arrays = self.config.count(keys::NUM_ARRAYS);
    let mut rng = rand::thread_rng();
    // Grown one unit at a time, never reserved up front from the config.
    let mut units = Vec::new();
    for _ in 0..arrays {
      units.push(ArrayUnit::Seeded {
        seed: rng.gen(),
        len: array_size,
      });
    }
    let pool = WorkerPoolBuilder::named("multiprocessing")
      .size(self.config.count(keys::NUM_PROCESSES))
      .build();

    let started = Instant::now();
    let (total, failures) = reduce(&pool, units);
    let report = SumReport {
      arrays,
      array_size,
      workers: pool.size(),
      total,
      failures,
      elapsed: started.elapsed(),
    };
    drop(pool);

    let mut lines = vec![
      (
        Tone::Narration,
        "Blueprint: This simulation demonstrates how a worker pool can parallelize CPU-intensive tasks across multiple cores."
          .to_owned(),
      ),
      (Tone::Info, "Worker Pool Results:".to_owned()),
      (Tone::Info, format!("- Number of workers used: {}", report.workers)),
      (Tone::Info, format!("- Array size per task: {}", report.array_size)),
      (Tone::Info, format!("- Number of arrays: {}", report.arrays)),
      (Tone::Info, format!("- Total sum of arrays: {}", report.total)),
      (
        Tone::Info,
        format!("- Time taken: {:.4} seconds", report.elapsed.as_secs_f64()),
      ),
    ];
    for failure in &report.failures {
      lines.push((Tone::Alert, format!("An array was lost: {}", failure)));
    }
    self.output.block(&lines);
    report
  }
}

impl Demo for ArraySumDemo {
  fn kind(&self) -> DemoKind {
    DemoKind::Multiprocessing
  }

  fn execute(&self) {
    let report = self.run();
    log::info!(
      "multiprocessing: {} arrays summed to {}",
      report.arrays,
      report.total
    );
  }

  fn describe(&self) -> &'static str {
    include_str!("array_sum.rs")
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::utils::testing::deadline;

  #[test]
  fn worker_sums_values_test() {
    assert_eq!(ArrayUnit::Values(vec![1.0, 2.0, 3.0, 4.0, 5.0]).sum(), 15.0);
    assert_eq!(ArrayUnit::Values(Vec::new()).sum(), 0.0);
  }

  #[test]
  fn seeded_units_are_reproducible_test() {
    let unit = ArrayUnit::Seeded { seed: 42, len: 1000 };
    let sum = unit.sum();
    assert_eq!(sum, unit.sum());
    assert!(sum > 0.0 && sum < 1000.0);
  }

  #[test]
  fn parallel_matches_sequential_test() {
    deadline(Duration::from_secs(10), || {
      let units: Vec<ArrayUnit> = (0..16)
        .map(|i| ArrayUnit::Values((0..1000).map(|x| (x * i) as f64).collect()))
        .collect();
      let sequential: f64 = units.iter().map(ArrayUnit::sum).sum();
      let pool = WorkerPool::new(4);
      let (total, failures) = reduce(&pool, units);
      assert!(failures.is_empty());
      assert_eq!(total, sequential);
    });
  }

  #[test]
  fn seeded_parallel_matches_sequential_test() {
    deadline(Duration::from_secs(10), || {
      let units: Vec<ArrayUnit> = (0..8)
        .map(|seed| ArrayUnit::Seeded { seed, len: 10_000 })
        .collect();
      let sequential: f64 = units.iter().map(ArrayUnit::sum).sum();
      let pool = WorkerPool::new(3);
      let (total, _) = reduce(&pool, units);
      assert!((total - sequential).abs() < 1e-9);
    });
  }

  #[test]
  fn run_reports_parameters_test() {
    deadline(Duration::from_secs(10), || {
      let config = Config::in_memory();
      config.update(keys::ARRAY_SIZE, "1000").unwrap();
      config.update(keys::NUM_ARRAYS, "4").unwrap();
      config.update(keys::NUM_PROCESSES, "2").unwrap();
      let output = Arc::new(Output::capture());
      let report = ArraySumDemo::new(config, output.clone()).run();
      assert_eq!(report.arrays, 4);
      assert_eq!(report.workers, 2);
      assert!(report.total > 0.0 && report.total < 4000.0);
      let lines = output.captured();
      assert!(lines.contains(&"- Number of arrays: 4".to_owned()));
      assert!(lines.contains(&"- Array size per task: 1000".to_owned()));
    });
  }
}
