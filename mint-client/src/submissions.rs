//! Client for the wallet-submission API.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{Error, Result};

pub const SUBMISSION_FALLBACK_MESSAGE: &str =
    "Unable to submit wallet address right now. Please try again shortly.";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub ok: bool,
    pub address: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub address: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct SubmissionList {
    submissions: Vec<Submission>,
}

/// Turn a failed response body into something worth showing.
///
/// JSON `error` field first, then plain text, never an HTML error page.
pub fn failure_message(content_type: &str, body: &str) -> String {
    if content_type.contains("application/json") {
        if let Ok(value) = serde_json::from_str::<Value>(body) {
            if let Some(error) = value.get("error").and_then(Value::as_str) {
                if !error.trim().is_empty() {
                    return error.to_string();
                }
            }
        }
        return SUBMISSION_FALLBACK_MESSAGE.to_string();
    }

    let text = body.trim();
    if text.is_empty() || text.starts_with('<') {
        SUBMISSION_FALLBACK_MESSAGE.to_string()
    } else {
        text.to_string()
    }
}

pub struct SubmissionClient {
    client: Client,
    endpoint: String,
}

impl SubmissionClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Config(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/wallet-submissions", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn failure(response: reqwest::Response) -> Error {
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.text().await.unwrap_or_default();
        let message = failure_message(&content_type, &body);
        tracing::warn!("Wallet submission API returned {}: {}", status, message);
        Error::Submission(message)
    }

    /// Send the address as typed; the service does the validation.
    pub async fn submit(&self, address: &str) -> Result<SubmissionReceipt> {
        let body = json!({
            "address": address.trim(),
            "source": "mint-cli",
            "submittedAt": Utc::now().to_rfc3339(),
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to reach wallet submission API: {}", e);
                Error::Submission(SUBMISSION_FALLBACK_MESSAGE.to_string())
            })?;

        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }

        response.json().await.map_err(|e| {
            tracing::error!("Unexpected wallet submission response: {}", e);
            Error::Submission(SUBMISSION_FALLBACK_MESSAGE.to_string())
        })
    }

    pub async fn list(&self) -> Result<Vec<Submission>> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| Error::Submission(format!("Failed to reach {}: {e}", self.endpoint)))?;

        if !response.status().is_success() {
            return Err(Self::failure(response).await);
        }

        let list: SubmissionList = response
            .json()
            .await
            .map_err(|e| Error::Submission(format!("Unexpected response: {e}")))?;
        Ok(list.submissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_error_field_is_preferred() {
        assert_eq!(
            failure_message(
                "application/json; charset=utf-8",
                r#"{"error":"A valid wallet address is required"}"#
            ),
            "A valid wallet address is required"
        );
    }

    #[test]
    fn json_without_error_falls_back() {
        assert_eq!(
            failure_message("application/json", r#"{"status":"nope"}"#),
            SUBMISSION_FALLBACK_MESSAGE
        );
        assert_eq!(failure_message("application/json", "{"), SUBMISSION_FALLBACK_MESSAGE);
    }

    #[test]
    fn plain_text_is_used_but_html_is_not() {
        assert_eq!(failure_message("text/plain", "  Service paused \n"), "Service paused");
        assert_eq!(
            failure_message("text/html", "<!DOCTYPE html><h1>502</h1>"),
            SUBMISSION_FALLBACK_MESSAGE
        );
        assert_eq!(failure_message("", ""), SUBMISSION_FALLBACK_MESSAGE);
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let client = SubmissionClient::new("http://localhost:3001/").unwrap();
        assert_eq!(client.endpoint(), "http://localhost:3001/api/wallet-submissions");
    }

    #[test]
    fn receipt_parses_service_response() {
        let receipt: SubmissionReceipt = serde_json::from_str(
            r#"{"ok":true,"address":"0xabcdef0123456789abcdef0123456789abcdef01","submittedAt":"2026-03-01T12:00:00Z"}"#,
        )
        .unwrap();
        assert!(receipt.ok);
        assert_eq!(receipt.submitted_at.to_rfc3339(), "2026-03-01T12:00:00+00:00");
    }
}
