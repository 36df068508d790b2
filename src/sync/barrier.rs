use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BarrierError {
  #[error("barrier is broken")]
  Broken,
}

/// Returned to every thread released from a barrier. Exactly one thread per
/// generation is the leader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarrierWaitResult {
  leader: bool,
  generation: u64,
}

impl BarrierWaitResult {
  pub fn is_leader(&self) -> bool {
    self.leader
  }

  pub fn generation(&self) -> u64 {
    self.generation
  }
}

struct BarrierState {
  arrived: usize,
  generation: u64,
  broken: bool,
}

/// Reusable rendezvous point for a fixed number of parties.
///
/// Unlike [`std::sync::Barrier`] this barrier can be broken: once
/// [`Barrier::abort`] is called, every thread currently blocked in
/// [`Barrier::wait`] and every later caller gets [`BarrierError::Broken`].
/// A broken barrier stays broken.
pub struct Barrier {
  parties: usize,
  state: Mutex<BarrierState>,
  released: Condvar,
}

impl Barrier {
  /// A barrier needs at least one party, smaller counts are raised to one.
  pub fn new(parties: usize) -> Self {
    Barrier {
      parties: parties.max(1),
      state: Mutex::new(BarrierState {
        arrived: 0,
        generation: 0,
        broken: false,
      }),
      released: Condvar::new(),
    }
  }

  fn state(&self) -> MutexGuard<'_, BarrierState> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn parties(&self) -> usize {
    self.parties
  }

  pub fn waiting(&self) -> usize {
    self.state().arrived
  }

  pub fn is_broken(&self) -> bool {
    self.state().broken
  }

  /// Blocks until `parties` threads are waiting, then releases all of them and
  /// resets for the next generation.
  pub fn wait(&self) -> Result<BarrierWaitResult, BarrierError> {
    let mut state = self.state();
    if state.broken {
      return Err(BarrierError::Broken);
    }
    let generation = state.generation;
    state.arrived += 1;
    if state.arrived == self.parties {
      state.arrived = 0;
      state.generation += 1;
      self.released.notify_all();
      return Ok(BarrierWaitResult {
        leader: true,
        generation,
      });
    }
    loop {
      state = self
        .released
        .wait(state)
        .unwrap_or_else(PoisonError::into_inner);
      // A release that happened before the break still counts.
      if state.generation != generation {
        return Ok(BarrierWaitResult {
          leader: false,
          generation,
        });
      }
      if state.broken {
        return Err(BarrierError::Broken);
      }
    }
  }

  /// Puts the barrier into the broken state and wakes every waiter.
  pub fn abort(&self) {
    let mut state = self.state();
    if !state.broken {
      log::debug!(
        "barrier broken with {}/{} parties waiting",
        state.arrived,
        self.parties
      );
    }
    state.broken = true;
    state.arrived = 0;
    self.released.notify_all();
  }

  /// Registers the calling thread as a participant whose unwinding breaks the
  /// barrier.
  pub fn participant(&self) -> Participant<'_> {
    Participant { barrier: self }
  }
}

/// Breaks the barrier when dropped during a panic, so a participant that dies
/// before arriving cannot leave the others blocked forever.
pub struct Participant<'a> {
  barrier: &'a Barrier,
}

impl Participant<'_> {
  pub fn wait(&self) -> Result<BarrierWaitResult, BarrierError> {
    self.barrier.wait()
  }

  /// Leaves without finishing. The remaining parties are released as broken.
  pub fn abandon(self) {
    self.barrier.abort();
  }
}

impl Drop for Participant<'_> {
  fn drop(&mut self) {
    if std::thread::panicking() {
      self.barrier.abort();
    }
  }
}
