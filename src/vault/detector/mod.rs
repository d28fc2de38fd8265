//! PHI detection
//!
//! [`PhiAnalyzer`] is the pluggable boundary to the out-of-process
//! text-analysis service. [`Detector`] wraps an analyzer with the guards a
//! write path needs: a per-call timeout, bounded retry with backoff, a
//! circuit breaker, span validation and the minimum-score cut. There is no
//! local fallback: when the analyzer cannot be used, detection fails and the
//! enclosing write is aborted.

pub mod breaker;
pub mod http;

#[cfg(test)]
pub(crate) mod testing;

use crate::config::{DetectorConfig, RetryConfig};
use crate::domain::DetectorError;
use crate::log_retry_attempt;
use crate::vault::models::{EntityType, Span};
use async_trait::async_trait;
use breaker::CircuitBreaker;
use std::sync::Arc;
use std::time::Duration;

pub use http::HttpAnalyzer;

/// One raw finding from an analyzer, in byte offsets
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerFinding {
    pub entity_type: String,
    pub start: usize,
    pub end: usize,
    pub score: f32,
}

/// External PHI analyzer
#[async_trait]
pub trait PhiAnalyzer: Send + Sync {
    /// Returns every PHI-like substring found in `text`
    async fn analyze_text(&self, text: &str) -> Result<Vec<AnalyzerFinding>, DetectorError>;

    /// Short name used in logs
    fn name(&self) -> &str;
}

/// Guarded detector used by the write path
pub struct Detector {
    analyzer: Arc<dyn PhiAnalyzer>,
    min_score: f32,
    timeout: Duration,
    retry: RetryConfig,
    breaker: CircuitBreaker,
}

impl Detector {
    /// Creates a detector around `analyzer` with the guards from `config`
    pub fn new(analyzer: Arc<dyn PhiAnalyzer>, config: &DetectorConfig) -> Self {
        Self {
            analyzer,
            min_score: config.min_score,
            timeout: Duration::from_millis(config.timeout_ms),
            retry: config.retry.clone(),
            breaker: CircuitBreaker::new(&config.circuit_breaker),
        }
    }

    /// Minimum score a span needs to be kept
    pub fn min_score(&self) -> f32 {
        self.min_score
    }

    /// Whether the circuit breaker is currently rejecting calls
    pub fn is_circuit_open(&self) -> bool {
        self.breaker.is_open()
    }

    /// Detects PHI spans in `text`
    ///
    /// # Errors
    ///
    /// Any [`DetectorError`]; callers must treat it as fatal for the write.
    pub async fn detect(&self, text: &str) -> Result<Vec<Span>, DetectorError> {
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let findings = self.analyze_with_retry(text).await?;
        let total = findings.len();

        let mut spans = Vec::with_capacity(total);
        for finding in findings {
            let span = to_span(text, finding)?;
            if span.score >= self.min_score {
                spans.push(span);
            }
        }

        tracing::debug!(
            analyzer = self.analyzer.name(),
            findings = total,
            kept = spans.len(),
            min_score = self.min_score,
            "PHI detection complete"
        );

        Ok(spans)
    }

    async fn analyze_with_retry(&self, text: &str) -> Result<Vec<AnalyzerFinding>, DetectorError> {
        let max_attempts = self.retry.max_retries + 1;
        let mut attempt = 0;

        loop {
            let permit = self.breaker.acquire().await?;
            attempt += 1;

            let outcome = match tokio::time::timeout(self.timeout, self.analyzer.analyze_text(text))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(DetectorError::Timeout(self.timeout.as_millis() as u64)),
            };

            let err = match outcome {
                Ok(findings) => {
                    permit.succeeded();
                    return Ok(findings);
                }
                Err(e) => e,
            };

            permit.failed();
            if !err.is_retryable() || attempt >= max_attempts {
                tracing::error!(
                    analyzer = self.analyzer.name(),
                    attempt = attempt,
                    error = %err,
                    "PHI analyzer call failed"
                );
                return Err(err);
            }

            let delay_ms = self.retry.delay_ms(attempt);
            let reason = err.to_string();
            log_retry_attempt!(attempt, max_attempts, reason.as_str());
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
    }
}

/// Validates a finding against the text it came from
fn to_span(text: &str, finding: AnalyzerFinding) -> Result<Span, DetectorError> {
    let AnalyzerFinding {
        entity_type,
        start,
        end,
        score,
    } = finding;

    let in_bounds = start < end
        && end <= text.len()
        && text.is_char_boundary(start)
        && text.is_char_boundary(end);
    if !in_bounds {
        return Err(DetectorError::InvalidSpan {
            start,
            end,
            len: text.len(),
        });
    }

    let entity_type = EntityType::new(&entity_type).map_err(DetectorError::InvalidResponse)?;

    Ok(Span {
        start,
        end,
        score,
        entity_type,
        text: text[start..end].to_string(),
    })
}
