//! In-process synchronization primitives used by the demos.
//!
//! * `queue` is a first-in-first-out queue with a timed, blocking receive.
//! * `barrier` is a reusable barrier that can be broken, releasing every
//!   waiter with an error instead of leaving it blocked.
//! * `pool` is a fixed-size worker pool whose jobs share no memory with the
//!   submitter and report back over channels.
//!
//! The standard barrier cannot be broken, and an `mpsc` channel splits its
//! buffer between two ends, while the message demo inspects one shared queue
//! after a run.
pub mod barrier;
pub mod pool;
pub mod queue;
