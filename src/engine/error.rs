use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpeedTestError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("the provider rejected the API token")]
    BadToken,

    #[error("the configured proxy requires authentication")]
    ProxyAuthRequired,

    #[error("could not reach the provider API over https")]
    UnreachableSecureApi,

    #[error("could not reach the provider API over http")]
    UnreachablePlainApi,

    #[error("unexpected provider response: HTTP {0}")]
    UnknownProviderError(u16),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}
