//! Independent, indefinitely repeating background jobs.
//!
//! Each job gets its own supervised loop: run, then wait for the job's delay,
//! then run again. A failing or panicking run is logged and the loop carries
//! on; one job never affects another.

mod runner;
mod types;

pub use runner::TaskScheduler;
pub use types::*;
