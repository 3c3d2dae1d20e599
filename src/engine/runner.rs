use reqwest::Client;
use tracing::{debug, info};

use super::client::build_client;
use super::config::SpeedTestConfig;
use super::error::SpeedTestError;
use super::sampler::sample_speed;
use super::targets::resolve_targets;

/// Run one complete measurement with a freshly built client.
///
/// Returns the measured speed converted through `config.unit`.
pub async fn measure(config: &SpeedTestConfig) -> Result<f64, SpeedTestError> {
    config.validate()?;
    let client = build_client(config)?;
    measure_with(&client, config).await
}

/// Run one complete measurement reusing an existing client.
pub async fn measure_with(
    client: &Client,
    config: &SpeedTestConfig,
) -> Result<f64, SpeedTestError> {
    config.validate()?;

    info!("resolving {} download targets...", config.url_count);
    let targets = resolve_targets(client, config).await?;
    debug!("resolved targets: {targets:?}");

    info!("sampling download speed for up to {:?}...", config.timeout);
    let raw = sample_speed(client, targets, config).await?;

    Ok((config.unit)(raw))
}
