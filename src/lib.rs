//! Measure download throughput against fast.com's provider-issued probe
//! URLs: resolve targets, download them concurrently while sampling the
//! byte rate on a fixed cadence, and reduce the samples into one speed.

pub mod cli;
pub mod engine;

pub use engine::config::SpeedTestConfig;
pub use engine::error::SpeedTestError;
pub use engine::runner::{measure, measure_with};
pub use engine::units;
