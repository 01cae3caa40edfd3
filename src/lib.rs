#![deny(missing_docs, clippy::all, clippy::pedantic)]
#![doc = include_str!("../README.md")]

pub mod barrier;
pub use barrier::{Barrier, DynamicBarrier};

pub mod config;
pub use config::{Config, DefaultConfig};

mod error;
pub use error::Error;

pub mod limiter;
pub use limiter::Limiter;

pub mod mutex;
pub use mutex::Mutex;

pub mod rwlock;
pub use rwlock::RwLock;

pub mod semaphore;
pub use semaphore::{CondvarSemaphore, Semaphore};

mod slot;

#[cfg(test)]
mod tests;
