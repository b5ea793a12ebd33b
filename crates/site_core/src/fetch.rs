use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use shared::{domain::ResourceKey, error::FetchError};
use tracing::info;
use url::Url;

use crate::config::Settings;

/// Transport behind the resource cache. Implementations return the decoded
/// JSON body of one remote collection.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch(&self, resource: &ResourceKey) -> Result<Value, FetchError>;
}

pub struct MissingFetcher;

#[async_trait]
impl ResourceFetcher for MissingFetcher {
    async fn fetch(&self, resource: &ResourceKey) -> Result<Value, FetchError> {
        Err(FetchError::Unconfigured {
            resource: resource.clone(),
        })
    }
}

pub struct HttpFetcher {
    http: Client,
    base_url: Url,
    settings: Settings,
}

impl HttpFetcher {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::from_settings(&Settings {
            content_base_url: base_url.to_string(),
            ..Settings::default()
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            base_url: parse_base_url(&settings.content_base_url)?,
            settings: settings.clone(),
        })
    }

    fn resource_url(&self, resource: &ResourceKey) -> Result<Url, FetchError> {
        let path = self.settings.resource_path(resource);
        self.base_url
            .join(&path)
            .map_err(|err| FetchError::Transport {
                resource: resource.clone(),
                message: format!("invalid resource url '{path}': {err}"),
            })
    }
}

/// Base urls are treated as directories so `join` appends instead of
/// replacing the last segment.
fn parse_base_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalized).with_context(|| format!("invalid content base url '{raw}'"))
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch(&self, resource: &ResourceKey) -> Result<Value, FetchError> {
        let url = self.resource_url(resource)?;
        info!(resource = %resource, url = %url, "fetch: requesting resource");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| FetchError::Transport {
                resource: resource.clone(),
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                resource: resource.clone(),
                code: status.as_u16(),
            });
        }

        response.json::<Value>().await.map_err(|err| {
            if err.is_decode() {
                FetchError::Decode {
                    resource: resource.clone(),
                    message: err.to_string(),
                }
            } else {
                FetchError::Transport {
                    resource: resource.clone(),
                    message: err.to_string(),
                }
            }
        })
    }
}

#[cfg(test)]
#[path = "tests/fetch_tests.rs"]
mod tests;
