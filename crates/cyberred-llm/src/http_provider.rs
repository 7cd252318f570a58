//! A `Provider` backed by a generic JSON-over-HTTP model endpoint.
//! Response-body parsing is intentionally minimal (provider response
//! schemas are an explicit non-goal): `generate` expects `{"text": "..."}`
//! and `generate_structured` returns the parsed body's `"output"` field
//! verbatim rather than validating it against the caller's schema.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use crate::circuit_breaker::CircuitBreaker;
use crate::error::LlmError;
use crate::provider::{Provider, TokenUsage};

pub struct HttpProvider {
    model_name: String,
    endpoint: String,
    rate_limit_rpm: u32,
    client: Client,
    breaker: CircuitBreaker,
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
}

impl HttpProvider {
    pub fn new(model_name: impl Into<String>, endpoint: impl Into<String>, rate_limit_rpm: u32) -> Self {
        Self {
            model_name: model_name.into(),
            endpoint: endpoint.into(),
            rate_limit_rpm,
            client: Client::new(),
            breaker: CircuitBreaker::new(),
            prompt_tokens: AtomicU64::new(0),
            completion_tokens: AtomicU64::new(0),
        }
    }

    async fn post(&self, body: Value) -> Result<Value, LlmError> {
        let response = self.client.post(&self.endpoint).json(&body).send().await;
        match response {
            Ok(resp) if resp.status() == StatusCode::TOO_MANY_REQUESTS => {
                self.breaker.record_failure();
                let retry_after_ms = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.parse::<u64>().ok())
                    .map(|secs| secs * 1000)
                    .unwrap_or(1_000);
                Err(LlmError::RateLimited { retry_after_ms })
            }
            Ok(resp) => match resp.error_for_status() {
                Ok(resp) => {
                    self.breaker.record_success();
                    let value = resp.json::<Value>().await?;
                    self.prompt_tokens.fetch_add(
                        value.get("usage").and_then(|u| u.get("prompt_tokens")).and_then(Value::as_u64).unwrap_or(0),
                        Ordering::Relaxed,
                    );
                    self.completion_tokens.fetch_add(
                        value
                            .get("usage")
                            .and_then(|u| u.get("completion_tokens"))
                            .and_then(Value::as_u64)
                            .unwrap_or(0),
                        Ordering::Relaxed,
                    );
                    Ok(value)
                }
                Err(err) => {
                    self.breaker.record_failure();
                    Err(err.into())
                }
            },
            Err(err) => {
                self.breaker.record_failure();
                Err(err.into())
            }
        }
    }
}

#[async_trait]
impl Provider for HttpProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn rate_limit_rpm(&self) -> u32 {
        self.rate_limit_rpm
    }

    fn token_usage(&self) -> TokenUsage {
        TokenUsage {
            prompt_tokens: self.prompt_tokens.load(Ordering::Relaxed),
            completion_tokens: self.completion_tokens.load(Ordering::Relaxed),
        }
    }

    fn is_available(&self) -> bool {
        self.breaker.is_available()
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let body = self.post(json!({ "model": self.model_name, "prompt": prompt })).await?;
        Ok(body
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    async fn generate_structured(&self, prompt: &str, schema: &Value) -> Result<Value, LlmError> {
        let body = self
            .post(json!({ "model": self.model_name, "prompt": prompt, "schema": schema }))
            .await?;
        Ok(body.get("output").cloned().unwrap_or(Value::Null))
    }

    async fn health_check(&self) -> bool {
        let timeout = Duration::from_secs(5);
        tokio::time::timeout(timeout, self.client.get(&self.endpoint).send())
            .await
            .ok()
            .and_then(|res| res.ok())
            .map(|resp| resp.status().is_success())
            .unwrap_or(false)
    }
}
