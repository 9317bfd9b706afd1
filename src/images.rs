use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::types::{AppConfig, IMAGE_REQUEST_ATTEMPTS, IMAGE_RETRY_BACKOFF_MS, PLACEHOLDER_IMAGE_BASE};

/// Resolves a display image for an entrant. `context` is the match-up title.
pub trait ImageResolver: Send + Sync + 'static {
    fn resolve_image(
        &self,
        name: &str,
        context: &str,
    ) -> impl Future<Output = Result<String, String>> + Send;
}

#[derive(Debug, Deserialize)]
struct ImageServiceResponse {
    url: Option<String>,
    error: Option<String>,
}

/// Calls the image proxy: `GET {base}?query=<name>&context=<title>`.
#[derive(Clone)]
pub struct HttpImageResolver {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpImageResolver {
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        HttpImageResolver {
            client: reqwest::Client::new(),
            base_url: base_url.trim().to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }

    async fn send_once(&self, name: &str, context: &str) -> Result<reqwest::Response, reqwest::Error> {
        let mut request = self
            .client
            .get(&self.base_url)
            .query(&[("query", name), ("context", context)])
            .header("User-Agent", "versus-matchup");
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }
        request.send().await
    }
}

impl ImageResolver for HttpImageResolver {
    async fn resolve_image(&self, name: &str, context: &str) -> Result<String, String> {
        let mut last_send_err = String::new();
        let mut resp = None;
        for attempt in 0..IMAGE_REQUEST_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(IMAGE_RETRY_BACKOFF_MS * u64::from(attempt))).await;
            }
            match self.send_once(name, context).await {
                Ok(r) => {
                    resp = Some(r);
                    break;
                }
                Err(e) => {
                    last_send_err = format!("image request failed (attempt {}): {e}", attempt + 1);
                    warn!("{last_send_err}");
                }
            }
        }
        let resp = resp.ok_or(last_send_err)?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| format!("image read failed: {e}"))?;
        debug!("image service status {status} for {name:?}");
        if !status.is_success() {
            return Err(format!("image service error {status}: {body}"));
        }
        let parsed: ImageServiceResponse =
            serde_json::from_str(&body).map_err(|e| format!("image parse failed: {e}"))?;
        if let Some(error) = parsed.error.filter(|e| !e.trim().is_empty()) {
            return Err(format!("image service error: {error}"));
        }
        parsed
            .url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| "image response missing url.".to_string())
    }
}

/// Offline fallback: a deterministic labelled placeholder per name.
#[derive(Clone, Default)]
pub struct PlaceholderImageResolver;

impl ImageResolver for PlaceholderImageResolver {
    async fn resolve_image(&self, name: &str, _context: &str) -> Result<String, String> {
        Ok(placeholder_image_url(name))
    }
}

pub fn placeholder_image_url(name: &str) -> String {
    let text: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '+' })
        .collect();
    format!("{PLACEHOLDER_IMAGE_BASE}?text={text}")
}

/// Picks the resolver the config asks for.
#[derive(Clone)]
pub enum ConfiguredResolver {
    Http(HttpImageResolver),
    Placeholder(PlaceholderImageResolver),
}

impl ConfiguredResolver {
    pub fn from_config(config: &AppConfig) -> Self {
        if config.image_service_url.trim().is_empty() {
            ConfiguredResolver::Placeholder(PlaceholderImageResolver)
        } else {
            let key = Some(config.image_service_key.clone());
            ConfiguredResolver::Http(HttpImageResolver::new(&config.image_service_url, key))
        }
    }
}

impl ImageResolver for ConfiguredResolver {
    async fn resolve_image(&self, name: &str, context: &str) -> Result<String, String> {
        match self {
            ConfiguredResolver::Http(resolver) => resolver.resolve_image(name, context).await,
            ConfiguredResolver::Placeholder(resolver) => resolver.resolve_image(name, context).await,
        }
    }
}
