//! Reading source extracts from disk or over HTTP.

mod client;

pub use client::{BasicClient, HttpClient};

use anyhow::{Context, Result};
use bytes::Bytes;
use tracing::{debug, info};

/// Downloads `url` and returns the response body.
///
/// # Errors
///
/// Fails on transport errors and on non-success HTTP status codes.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Bytes> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?.error_for_status()?;
    Ok(resp.bytes().await?)
}

pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Loads an extract from a local file path or fetches it over HTTP.
#[tracing::instrument(skip_all, fields(source = %source))]
pub async fn read_source(source: &str) -> Result<Bytes> {
    let bytes = if is_remote(source) {
        let client = BasicClient::new()?;
        let bytes = fetch_bytes(&client, source)
            .await
            .with_context(|| format!("failed to download {source}"))?;
        info!(bytes = bytes.len(), "Extract downloaded");
        bytes
    } else {
        let bytes = tokio::fs::read(source)
            .await
            .with_context(|| format!("failed to read {source}"))?;
        debug!(bytes = bytes.len(), "Extract read from disk");
        Bytes::from(bytes)
    };
    Ok(bytes)
}
