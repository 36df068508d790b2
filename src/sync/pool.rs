use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use thiserror::Error;

pub type WorkerResult<T> = Result<T, TaskError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskError {
  #[error("worker panicked: {0}")]
  Panicked(String),
  #[error("worker pool shut down before the task completed")]
  Disconnected,
}

type Job = Box<dyn FnOnce() + Send + 'static>;

enum WorkerSignal {
  Run(Job),
  Close,
}

/// Handle to the eventual result of a submitted task.
pub struct TaskHandle<T> {
  receiver: Receiver<WorkerResult<T>>,
}

impl<T> TaskHandle<T> {
  /// Blocks until the task has finished on its worker.
  pub fn wait(self) -> WorkerResult<T> {
    self
      .receiver
      .recv()
      .unwrap_or(Err(TaskError::Disconnected))
  }
}

pub struct WorkerPoolBuilder {
  name: String,
  size: usize,
}

impl WorkerPoolBuilder {
  pub fn named(name: impl Into<String>) -> Self {
    WorkerPoolBuilder {
      name: name.into(),
      size: 0,
    }
  }

  /// Number of worker threads. Zero means one worker per logical CPU.
  pub fn size(mut self, size: usize) -> Self {
    self.size = size;
    self
  }

  pub fn build(self) -> WorkerPool {
    let size = if self.size == 0 {
      num_cpus::get()
    } else {
      self.size
    };
    WorkerPool::spawn(self.name, size)
  }
}

/// Fixed-size pool of worker threads.
///
/// Workers share nothing with the submitter: every job owns its input and
/// hands its output back over a channel. A job that panics yields
/// [`TaskError::Panicked`] for that job only, the worker stays alive.
///
/// Dropping the pool lets queued jobs finish and joins every worker.
pub struct WorkerPool {
  sender: Mutex<Sender<WorkerSignal>>,
  workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
  pub fn new(size: usize) -> Self {
    WorkerPoolBuilder::named("pool").size(size).build()
  }

  fn spawn(name: String, size: usize) -> Self {
    let (tx, rx) = mpsc::channel();
    let receiver = Arc::new(Mutex::new(rx));
    let mut workers = Vec::new();
    for id in 0..size {
      let receiver = receiver.clone();
      let spawned = std::thread::Builder::new()
        .name(format!("{}-worker{}", name, id))
        .spawn(move || Self::run(receiver));
      match spawned {
        Ok(handle) => workers.push(handle),
        Err(error) => {
          log::error!("failed to spawn {}-worker{}: {}", name, id, error);
          break;
        }
      }
    }
    log::debug!("started pool '{}' with {} workers", name, workers.len());
    WorkerPool {
      sender: Mutex::new(tx),
      workers,
    }
  }

  fn run(receiver: Arc<Mutex<Receiver<WorkerSignal>>>) {
    loop {
      let signal = receiver
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .recv();
      match signal {
        Ok(WorkerSignal::Run(job)) => job(),
        Ok(WorkerSignal::Close) | Err(_) => break,
      }
    }
  }

  pub fn size(&self) -> usize {
    self.workers.len()
  }

  /// Queues `job` on the next free worker.
  pub fn submit<T, F>(&self, job: F) -> TaskHandle<T>
  where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
  {
    let (tx, rx) = mpsc::channel();
    let job: Job = Box::new(move || {
      let result = panic::catch_unwind(AssertUnwindSafe(job)).map_err(|payload| {
        let message = panic_message(payload.as_ref());
        log::error!("task panicked on worker: {}", message);
        TaskError::Panicked(message)
      });
      let _ = tx.send(result);
    });
    let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
    if sender.send(WorkerSignal::Run(job)).is_err() {
      log::warn!("task submitted to a pool with no running workers");
    }
    TaskHandle { receiver: rx }
  }

  /// Runs `func` once per input and returns the results in input order, after
  /// every task has finished.
  pub fn map<I, T, F>(&self, inputs: Vec<I>, func: F) -> Vec<WorkerResult<T>>
  where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> T + Send + Sync + 'static,
  {
    let func = Arc::new(func);
    let tasks: Vec<TaskHandle<T>> = inputs
      .into_iter()
      .map(|input| {
        let func = func.clone();
        self.submit(move || func(input))
      })
      .collect();
    tasks.into_iter().map(TaskHandle::wait).collect()
  }
}

impl Drop for WorkerPool {
  fn drop(&mut self) {
    {
      let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
      for _ in 0..self.workers.len() {
        let _ = sender.send(WorkerSignal::Close);
      }
    }
    for handle in self.workers.drain(..) {
      if handle.join().is_err() {
        log::error!("worker thread exited with a panic");
      }
    }
  }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(message) = payload.downcast_ref::<&str>() {
    (*message).to_owned()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "unknown panic payload".to_owned()
  }
}
