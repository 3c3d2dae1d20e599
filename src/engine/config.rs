use std::time::Duration;

use super::error::SpeedTestError;
use super::units::{self, UnitConverter};

/// Configuration for a speed measurement run.
///
/// Built once, never mutated afterwards. [`validate`](Self::validate) is run
/// by the facade before any network I/O.
#[derive(Debug, Clone)]
pub struct SpeedTestConfig {
    /// API token issued by the provider. Required, non-empty.
    pub token: String,
    /// Log the running average on every sampling tick.
    pub verbose: bool,
    /// Time budget for the whole measurement.
    pub timeout: Duration,
    /// Query the provider and download over https.
    pub https: bool,
    /// Number of download URLs requested from the provider.
    pub url_count: usize,
    /// Number of slots in the sampling ring buffer.
    pub buffer_size: usize,
    /// Conversion applied to the final raw bytes-per-second figure.
    pub unit: UnitConverter,
    /// Optional proxy URL (http, https or socks5).
    pub proxy: Option<String>,
}

impl SpeedTestConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), SpeedTestError> {
        if self.token.is_empty() {
            return Err(SpeedTestError::Config("token must not be empty".into()));
        }
        if self.timeout.is_zero() {
            return Err(SpeedTestError::Config("timeout must be positive".into()));
        }
        if self.url_count == 0 {
            return Err(SpeedTestError::Config("url_count must be positive".into()));
        }
        if self.buffer_size == 0 {
            return Err(SpeedTestError::Config(
                "buffer_size must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for SpeedTestConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            verbose: false,
            timeout: Duration::from_millis(5000),
            https: true,
            url_count: 5,
            buffer_size: 8,
            unit: units::bytes_per_second,
            proxy: None,
        }
    }
}
