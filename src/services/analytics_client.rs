//! Gateway-side client of the analytics worker.
//!
//! Every call resolves to an [`AnalyticsOutcome`]; transport errors, error
//! replies and undecodable bodies are folded into the tag instead of being
//! raised, because analysis never decides whether an upload succeeds.

use crate::{
    errors::error_chain,
    models::{gateway::AnalyticsOutcome, statistics::StatisticsRecord},
};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;

#[async_trait]
pub trait AnalyticsClient: Send + Sync {
    /// Ask the worker for statistics of `data`. Never fails; see the outcome tag.
    async fn analyze(&self, filename: &str, content_type: &str, data: Bytes) -> AnalyticsOutcome;
}

#[derive(Debug, Clone)]
pub struct HttpAnalyticsClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

/// `{"error": "..."}` as sent by the worker (and by `AppError`).
#[derive(Debug, Deserialize)]
struct ErrorReply {
    error: String,
}

impl HttpAnalyticsClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder().connect_timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn file_part(filename: &str, content_type: &str, data: Bytes) -> Part {
        let len = data.len() as u64;
        let part = Part::stream_with_length(data.clone(), len).file_name(filename.to_string());
        part.mime_str(content_type)
            .unwrap_or_else(|_| Part::stream_with_length(data, len).file_name(filename.to_string()))
    }
}

#[async_trait]
impl AnalyticsClient for HttpAnalyticsClient {
    async fn analyze(&self, filename: &str, content_type: &str, data: Bytes) -> AnalyticsOutcome {
        let form = Form::new().part("file", Self::file_part(filename, content_type, data));

        let response = match self
            .http
            .post(format!("{}/analyze", self.base_url))
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => return AnalyticsOutcome::Unreachable(error_chain(&err)),
        };

        let status = response.status();
        if status.is_success() {
            return match response.json::<StatisticsRecord>().await {
                Ok(record) => AnalyticsOutcome::Completed(record),
                Err(err) if err.is_timeout() => AnalyticsOutcome::Unreachable(error_chain(&err)),
                Err(err) => {
                    AnalyticsOutcome::ServiceError(format!("invalid response: {}", error_chain(&err)))
                }
            };
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => return AnalyticsOutcome::Unreachable(error_chain(&err)),
        };
        let message = serde_json::from_str::<ErrorReply>(&body)
            .map(|reply| reply.error)
            .unwrap_or_else(|_| if body.is_empty() { status.to_string() } else { body });
        AnalyticsOutcome::ServiceError(message)
    }
}
