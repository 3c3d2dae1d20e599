use clap::Parser;
use std::time::Duration;

use crate::engine::config::SpeedTestConfig;
use crate::engine::units;

/// Unofficial CLI for fast.com
#[derive(Parser, Debug)]
#[command(name = "fastspeedtest", version, about)]
pub struct Cli {
    /// API token for the provider's speedtest endpoint
    #[arg(short, long, required_unless_present = "list_units")]
    pub token: Option<String>,

    /// Unit the measured speed is reported in
    #[arg(short, long, default_value = "B/s", value_parser = parse_unit_name)]
    pub unit: String,

    /// Measurement time budget in milliseconds
    #[arg(long, default_value_t = 5000, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Number of download URLs to request from the provider
    #[arg(long = "url-count", default_value_t = 5, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    pub url_count: usize,

    /// Number of slots in the sampling ring buffer
    #[arg(long = "buffer-size", default_value_t = 8, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    pub buffer_size: usize,

    /// Query the provider and download over plain http
    #[arg(long = "no-https")]
    pub no_https: bool,

    /// Proxy URL (http, https or socks5)
    #[arg(long)]
    pub proxy: Option<String>,

    /// Log the running average while sampling
    #[arg(short, long)]
    pub verbose: bool,

    /// List the resolvable unit names and exit
    #[arg(long = "list-units")]
    pub list_units: bool,
}

impl Cli {
    pub fn to_config(&self) -> SpeedTestConfig {
        let mut config = SpeedTestConfig::new(self.token.clone().unwrap_or_default());
        config.verbose = self.verbose;
        config.timeout = Duration::from_millis(self.timeout);
        config.https = !self.no_https;
        config.url_count = self.url_count;
        config.buffer_size = self.buffer_size;
        config.unit = units::lookup(&self.unit).unwrap_or(units::bytes_per_second);
        config.proxy = self.proxy.clone();
        config
    }
}

fn parse_unit_name(input: &str) -> Result<String, String> {
    match units::lookup(input) {
        Some(_) => Ok(input.to_string()),
        None => Err(format!("unknown unit '{input}', see --list-units")),
    }
}
