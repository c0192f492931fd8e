//! Remote synthesis over HTTP.
//!
//! Sends `GET <endpoint>?ie=UTF-8&q=<text>&tl=<lang>&client=tw-ob` with the
//! variant substituted into the endpoint host. The body is the audio
//! payload (typically MP3), which the adapter normalizes.

use std::time::Duration;

use tracing::debug;

use crate::config::{BackendKind, RemoteBackendConfig};
use crate::error::{ErrorCode, FailureKind, PipelineError, RenderFailure, Result};
use crate::types::Language;

use super::RenderBackend;

/// HTTP fetch backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpBackend {
    /// Creates a backend with the configured timeout and user agent.
    pub fn new(config: &RemoteBackendConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                PipelineError::with_source(
                    ErrorCode::BackendUnavailable,
                    format!("failed to create HTTP client: {}", e),
                    e,
                )
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    /// Returns the request URL for a variant.
    pub fn url_for(&self, variant: &str) -> String {
        self.endpoint.replace("{variant}", variant)
    }
}

impl RenderBackend for HttpBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    fn check_available(&self, variants: &[String]) -> Result<()> {
        for variant in variants {
            let url = self.url_for(variant);
            reqwest::Url::parse(&url).map_err(|e| {
                PipelineError::config_invalid(format!(
                    "remote endpoint {} is not a valid URL: {}",
                    url, e
                ))
            })?;
        }
        Ok(())
    }

    fn render(
        &self,
        text: &str,
        language: Language,
        variant: &str,
    ) -> std::result::Result<Vec<u8>, RenderFailure> {
        let url = self.url_for(variant);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("ie", "UTF-8"),
                ("q", text),
                ("tl", language.as_str()),
                ("client", "tw-ob"),
            ])
            .send()
            .map_err(request_failure)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderFailure::new(
                FailureKind::Http,
                format!("HTTP {} from {}", status, url),
            ));
        }

        let is_text = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/"));

        let body = response.bytes().map_err(request_failure)?;
        if body.is_empty() || is_text {
            return Err(RenderFailure::new(
                FailureKind::MalformedPayload,
                format!("no audio in response from {} ({} bytes)", url, body.len()),
            ));
        }

        debug!("fetched {} bytes from {}", body.len(), url);
        Ok(body.to_vec())
    }
}

fn request_failure(e: reqwest::Error) -> RenderFailure {
    if e.is_timeout() {
        RenderFailure::new(FailureKind::Timeout, e.to_string())
    } else {
        RenderFailure::new(FailureKind::Http, e.to_string())
    }
}
