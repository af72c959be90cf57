//! Merging the published configuration into the local one

use tracing::info;

use crate::config::{Configuration, deep_merge};
use crate::error::PisError;
use crate::index::client::HttpClient;

/// Downloads the configuration published at `url`
pub async fn fetch_latest_config(
    http: &dyn HttpClient,
    url: &str,
) -> Result<Configuration, PisError> {
    let response = http.get(url).await?;
    if response.status != 200 {
        return Err(PisError::UnexpectedStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    serde_json::from_slice(&response.body).map_err(|source| PisError::InvalidRemoteConfig {
        url: url.to_string(),
        source,
    })
}

/// `config` overlaid with the configuration published at `url`
pub async fn with_latest_config(
    config: Configuration,
    http: &dyn HttpClient,
    url: &str,
) -> Result<Configuration, PisError> {
    let latest = fetch_latest_config(http, url).await?;
    info!("Merged latest configuration from {}", url);
    Ok(deep_merge(config, latest))
}
