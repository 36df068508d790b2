use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueueError {
  #[error("no message arrived within {0:?}")]
  Timeout(Duration),
}

/// First-in-first-out queue shared between threads.
///
/// Producers never block. Consumers block in [`MessageQueue::get_timeout`]
/// until an item arrives or the timeout elapses, in which case they get a
/// [`QueueError::Timeout`] and decide for themselves whether to retry.
pub struct MessageQueue<T> {
  items: Mutex<VecDeque<T>>,
  not_empty: Condvar,
}

impl<T> Default for MessageQueue<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> MessageQueue<T> {
  pub fn new() -> Self {
    MessageQueue {
      items: Mutex::new(VecDeque::new()),
      not_empty: Condvar::new(),
    }
  }

  fn items(&self) -> MutexGuard<'_, VecDeque<T>> {
    self.items.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn put(&self, item: T) {
    self.items().push_back(item);
    self.not_empty.notify_one();
  }

  pub fn get_timeout(&self, timeout: Duration) -> Result<T, QueueError> {
    let guard = self.items();
    let (mut guard, _) = self
      .not_empty
      .wait_timeout_while(guard, timeout, |items| items.is_empty())
      .unwrap_or_else(PoisonError::into_inner);
    guard.pop_front().ok_or(QueueError::Timeout(timeout))
  }

  pub fn len(&self) -> usize {
    self.items().len()
  }

  pub fn is_empty(&self) -> bool {
    self.items().is_empty()
  }
}
