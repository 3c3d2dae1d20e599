use reqwest::{Client, Proxy};
use std::time::Duration;

use super::config::SpeedTestConfig;
use super::error::SpeedTestError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the async client shared by the provider query and the downloads.
///
/// The measurement deadline is enforced by the sampler's timer, not here;
/// the client only bounds connection establishment.
pub fn build_client(config: &SpeedTestConfig) -> Result<Client, SpeedTestError> {
    let mut builder = Client::builder().connect_timeout(CONNECT_TIMEOUT);

    if let Some(proxy) = &config.proxy {
        builder = builder.proxy(Proxy::all(proxy)?);
    }

    Ok(builder.build()?)
}
