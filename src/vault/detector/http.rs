//! HTTP client for a Presidio-compatible analyzer service
//!
//! The service takes `POST {endpoint}/analyze` with `{"text", "language"}`
//! and answers with an array of `{entity_type, start, end, score}` where the
//! offsets count Unicode scalar values. They are converted to byte offsets
//! before leaving this module.

use super::{AnalyzerFinding, PhiAnalyzer};
use crate::config::DetectorConfig;
use crate::domain::{DetectorError, PhiVaultError, Result};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    text: &'a str,
    language: &'a str,
}

#[derive(Deserialize)]
struct AnalyzeResult {
    entity_type: String,
    start: usize,
    end: usize,
    score: f32,
}

/// Analyzer reached over HTTP
pub struct HttpAnalyzer {
    analyze_url: String,
    language: String,
    auth_header: Option<String>,
    timeout_ms: u64,
    client: Client,
}

impl HttpAnalyzer {
    /// Builds the HTTP client for the configured endpoint
    ///
    /// # Errors
    ///
    /// Returns [`PhiVaultError::Configuration`] if the client cannot be built.
    pub fn new(config: &DetectorConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_millis(config.timeout_ms))
            .connect_timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| {
                PhiVaultError::Configuration(format!("Failed to build analyzer HTTP client: {e}"))
            })?;

        let auth_header = config
            .api_key
            .as_ref()
            .filter(|key| !key.expose_secret().is_empty())
            .map(|key| format!("Bearer {}", key.expose_secret().as_ref()));

        Ok(Self {
            analyze_url: format!("{}/analyze", config.endpoint.trim_end_matches('/')),
            language: config.language.clone(),
            auth_header,
            timeout_ms: config.timeout_ms,
            client,
        })
    }

    fn map_send_error(&self, err: reqwest::Error) -> DetectorError {
        if err.is_timeout() {
            DetectorError::Timeout(self.timeout_ms)
        } else {
            DetectorError::ConnectionFailed(err.to_string())
        }
    }
}

#[async_trait]
impl PhiAnalyzer for HttpAnalyzer {
    async fn analyze_text(
        &self,
        text: &str,
    ) -> std::result::Result<Vec<AnalyzerFinding>, DetectorError> {
        let mut request = self.client.post(&self.analyze_url).json(&AnalyzeRequest {
            text,
            language: &self.language,
        });
        if let Some(auth) = &self.auth_header {
            request = request.header("Authorization", auth);
        }

        let response = request.send().await.map_err(|e| self.map_send_error(e))?;
        let status = response.status();

        if !status.is_success() {
            // Error bodies may echo the request text, so only the status is kept.
            return Err(status_error(status));
        }

        let results: Vec<AnalyzeResult> = response.json().await.map_err(|e| {
            if e.is_timeout() {
                DetectorError::Timeout(self.timeout_ms)
            } else {
                DetectorError::InvalidResponse(format!("Failed to decode analyzer results: {e}"))
            }
        })?;

        let offsets = char_byte_offsets(text);
        results
            .into_iter()
            .map(|r| {
                let to_byte = |idx: usize| {
                    offsets.get(idx).copied().ok_or(DetectorError::InvalidSpan {
                        start: r.start,
                        end: r.end,
                        len: offsets.len() - 1,
                    })
                };
                Ok::<_, DetectorError>(AnalyzerFinding {
                    start: to_byte(r.start)?,
                    end: to_byte(r.end)?,
                    entity_type: r.entity_type,
                    score: r.score,
                })
            })
            .collect()
    }

    fn name(&self) -> &str {
        "http"
    }
}

fn status_error(status: StatusCode) -> DetectorError {
    let message = status
        .canonical_reason()
        .unwrap_or("unexpected status")
        .to_string();
    let transient = status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS;
    if transient {
        DetectorError::ServerError {
            status: status.as_u16(),
            message,
        }
    } else {
        DetectorError::ClientError {
            status: status.as_u16(),
            message,
        }
    }
}

/// Byte offset of every char index, plus one entry for the end of the text
fn char_byte_offsets(text: &str) -> Vec<usize> {
    text.char_indices()
        .map(|(byte, _)| byte)
        .chain(std::iter::once(text.len()))
        .collect()
}
