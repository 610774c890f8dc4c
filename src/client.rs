use crate::config::Settings;
use crate::provider::{ApiProvider, VerificationStatus};
use anyhow::Result;
use chrono::{DateTime, Utc};
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::Value;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result of one validation call. Appended to the verification log and, for
/// Valid outcomes, to the valid-address index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub address: String,
    pub is_valid: bool,
    pub status: VerificationStatus,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
}

impl VerificationOutcome {
    pub fn error(address: &str, detail: String) -> Self {
        VerificationOutcome {
            address: address.to_string(),
            is_valid: false,
            status: VerificationStatus::Unknown,
            detail,
            timestamp: Utc::now(),
        }
    }
}

/// Issues single-address validation calls against the configured provider.
/// Transport, HTTP and parse failures come back as Unknown outcomes rather
/// than errors so one bad call never aborts a batch.
#[derive(Debug, Clone)]
pub struct VerificationClient {
    http: Client,
    provider: ApiProvider,
    endpoint: String,
    api_key: String,
}

impl VerificationClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .user_agent(concat!("leadspark/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            provider: settings.api_provider,
            endpoint: settings.endpoint().to_string(),
            api_key: settings.api_key.clone(),
        })
    }

    pub async fn verify(&self, address: &str) -> Result<VerificationOutcome> {
        let (outcome, _) = self.verify_detailed(address).await?;
        Ok(outcome)
    }

    /// Like `verify`, but also returns the raw response payload when one was
    /// received. Used by the API probe command.
    ///
    /// The only `Err` here is a request that could not even be built (bad
    /// base URL); everything after dispatch maps to an outcome.
    pub async fn verify_detailed(
        &self,
        address: &str,
    ) -> Result<(VerificationOutcome, Option<Value>)> {
        let request = self
            .provider
            .build_request(&self.endpoint, &self.api_key, address)?;

        let mut req = self.http.get(&request.url).header(ACCEPT, "application/json");
        if let Some(token) = &request.bearer_token {
            req = req.bearer_auth(token);
        }

        let response = match req.send().await {
            Ok(response) => response,
            Err(e) => {
                log::warn!("Network error validating {address}: {e}");
                return Ok((
                    VerificationOutcome::error(address, format!("API call failed: {e}")),
                    None,
                ));
            }
        };

        let http_status = response.status();
        if !http_status.is_success() {
            // Prefer the API's own message when the error body parses.
            let payload = response.json::<Value>().await.ok();
            let message = payload
                .as_ref()
                .and_then(|v| v.get("message"))
                .and_then(Value::as_str)
                .map(String::from)
                .unwrap_or_else(|| format!("HTTP error {}", http_status.as_u16()));
            log::warn!("API error for {address}: {http_status}");
            return Ok((
                VerificationOutcome::error(address, format!("API call failed: {message}")),
                payload,
            ));
        }

        let payload = match response.json::<Value>().await {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!("Malformed API response for {address}: {e}");
                return Ok((
                    VerificationOutcome::error(
                        address,
                        format!("API call failed: malformed response: {e}"),
                    ),
                    None,
                ));
            }
        };

        let mapped = self.provider.parse_response(&payload);
        log::debug!("{address} -> {} ({})", mapped.status, mapped.detail);
        let outcome = VerificationOutcome {
            address: address.to_string(),
            is_valid: mapped.is_valid(),
            status: mapped.status,
            detail: mapped.detail,
            timestamp: Utc::now(),
        };
        Ok((outcome, Some(payload)))
    }
}
