use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::config::SpeedTestConfig;
use super::error::SpeedTestError;

const API_HOST: &str = "api.fast.com";
const API_PATH: &str = "netflix/speedtest";

/// One entry of the provider's target list.
#[derive(Debug, Deserialize)]
struct TargetDescriptor {
    url: String,
}

/// Collect `config.url_count` download URLs from the provider.
///
/// The provider may return fewer targets than requested per call, so the
/// query is repeated with the remaining count until enough are collected.
pub async fn resolve_targets(
    client: &Client,
    config: &SpeedTestConfig,
) -> Result<Vec<String>, SpeedTestError> {
    let scheme = if config.https { "https" } else { "http" };
    resolve_from(client, config, &format!("{scheme}://{API_HOST}/{API_PATH}")).await
}

async fn resolve_from(
    client: &Client,
    config: &SpeedTestConfig,
    endpoint: &str,
) -> Result<Vec<String>, SpeedTestError> {
    let mut targets: Vec<String> = Vec::with_capacity(config.url_count);

    while targets.len() < config.url_count {
        let remaining = config.url_count - targets.len();
        let url = format!(
            "{endpoint}?https={}&token={}&urlCount={remaining}",
            config.https, config.token
        );

        let response = match client.get(&url).send().await {
            Ok(response) => response,
            Err(e) if e.is_connect() => {
                return Err(if config.https {
                    SpeedTestError::UnreachableSecureApi
                } else {
                    SpeedTestError::UnreachablePlainApi
                });
            }
            Err(e) => return Err(e.into()),
        };

        match response.status() {
            StatusCode::OK => {}
            StatusCode::FORBIDDEN => return Err(SpeedTestError::BadToken),
            StatusCode::PROXY_AUTHENTICATION_REQUIRED => {
                return Err(SpeedTestError::ProxyAuthRequired)
            }
            status => return Err(SpeedTestError::UnknownProviderError(status.as_u16())),
        }

        let body = response.text().await?;
        let descriptors: Vec<TargetDescriptor> = serde_json::from_str(&body)
            .map_err(|_| SpeedTestError::UnknownProviderError(StatusCode::OK.as_u16()))?;

        // A 200 that makes no forward progress would loop forever; treat it
        // as a protocol violation instead.
        if descriptors.is_empty() {
            return Err(SpeedTestError::UnknownProviderError(
                StatusCode::OK.as_u16(),
            ));
        }

        debug!(
            "provider returned {} of {remaining} requested targets",
            descriptors.len()
        );
        targets.extend(descriptors.into_iter().map(|d| d.url));
    }

    Ok(targets)
}
