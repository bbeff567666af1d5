//! HTTP plumbing shared by the network-backed providers.

use std::time::Duration;

use log::debug;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::errors::RateError;

/// Build a client with a request timeout and an optional HTTP(S) proxy.
pub(crate) fn build_client(timeout: Duration, proxy: Option<&str>) -> Result<Client, RateError> {
    let mut builder = Client::builder().timeout(timeout);

    if let Some(url) = proxy {
        let proxy = reqwest::Proxy::all(url)
            .map_err(|e| RateError::Config(format!("invalid proxy url '{}': {}", url, e)))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| RateError::Config(format!("failed to build HTTP client: {}", e)))
}

/// GET `url` and decode the JSON body.
///
/// The request is abandoned as soon as `cancel` fires.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &Client,
    provider: &str,
    cancel: &CancellationToken,
    url: &str,
    query: &[(&str, &str)],
) -> Result<T, RateError> {
    debug!("{} request: {} {:?}", provider, url, query);

    let request = async {
        let response = client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| RateError::from_reqwest(provider, e))?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(RateError::RateLimited {
                provider: provider.to_string(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RateError::provider(
                provider,
                format!("HTTP {} - {}", status, body.trim()),
            ));
        }

        let text = response
            .text()
            .await
            .map_err(|e| RateError::from_reqwest(provider, e))?;

        serde_json::from_str::<T>(&text)
            .map_err(|e| RateError::provider(provider, format!("Failed to parse response: {}", e)))
    };

    tokio::select! {
        _ = cancel.cancelled() => Err(RateError::Cancelled),
        result = request => result,
    }
}

/// Parse a numeric field that upstream APIs send as a string.
pub(crate) fn parse_number(value: Option<&str>) -> Option<f64> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}
