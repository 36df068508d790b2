//! Threadlab is:
//! * a set of small, self-narrating demonstrations of concurrency: message
//!   passing through a queue, a counter shared under a lock, threads meeting
//!   at a barrier and CPU-bound work fanned out over a worker pool.
//! * the synchronization pieces those demonstrations are built on, and a
//!   runner that selects a demo by name and either runs it or shows its
//!   source.
#[macro_use]
extern crate lazy_static;

pub mod config;
pub mod demo;
pub mod error;
pub mod output;
pub mod runner;
pub mod shell;
pub mod sync;
pub mod utils;
