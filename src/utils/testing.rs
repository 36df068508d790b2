use std::{sync::mpsc, thread, time::Duration};

/// Generous upper bound for a whole demo run in tests.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

/// Runs `f` on its own thread and panics if it does not finish within `d`.
///
/// Concurrency tests wrap their body in this so a deadlock fails the test
/// instead of hanging the suite. Panics inside `f` are passed through.
pub fn deadline<T, F>(d: Duration, f: F) -> T
where
  T: Send + 'static,
  F: FnOnce() -> T + Send + 'static,
{
  let (done_tx, done_rx) = mpsc::channel();
  let handle = thread::Builder::new()
    .name("deadline-guarded".to_owned())
    .spawn(move || {
      let value = f();
      let _ = done_tx.send(());
      value
    })
    .expect("failed to spawn test thread");
  match done_rx.recv_timeout(d) {
    Ok(()) => handle.join().expect("test thread panicked"),
    Err(mpsc::RecvTimeoutError::Timeout) => panic!("test exceeded its {:?} deadline", d),
    Err(mpsc::RecvTimeoutError::Disconnected) => match handle.join() {
      Ok(value) => value,
      Err(payload) => std::panic::resume_unwind(payload),
    },
  }
}

/// [`deadline`] with [`DEFAULT_DEADLINE`].
pub fn within_deadline<T, F>(f: F) -> T
where
  T: Send + 'static,
  F: FnOnce() -> T + Send + 'static,
{
  deadline(DEFAULT_DEADLINE, f)
}
