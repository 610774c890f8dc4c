use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use url::Url;

/// Outcome tier for a verified address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationStatus {
    Valid,
    Invalid,
    Risky,
    Unknown,
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VerificationStatus::Valid => "Valid",
            VerificationStatus::Invalid => "Invalid",
            VerificationStatus::Risky => "Risky",
            VerificationStatus::Unknown => "Unknown",
        };
        f.pad(s)
    }
}

impl std::str::FromStr for VerificationStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "valid" => Ok(VerificationStatus::Valid),
            "invalid" => Ok(VerificationStatus::Invalid),
            "risky" => Ok(VerificationStatus::Risky),
            "unknown" => Ok(VerificationStatus::Unknown),
            other => Err(anyhow::anyhow!("unknown verification status: {other}")),
        }
    }
}

/// Mapped status plus a human-readable explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusDetail {
    pub status: VerificationStatus,
    pub detail: String,
}

impl StatusDetail {
    fn new(status: VerificationStatus, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == VerificationStatus::Valid
    }
}

/// A prepared single-address validation request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub url: String,
    pub bearer_token: Option<String>,
}

/// Supported validation APIs. Each variant knows how to place the API key
/// and how to read its own response schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApiProvider {
    /// Plain boolean `res` field, no risk tiering, no API key.
    Bazzigate,
    /// Nested `result` object with reachability plus syntax, disposable,
    /// catch-all, SPF, domain-age and risk-score sub-fields.
    ValidateEmail,
    /// Boolean `valid` plus a free-text `message`.
    Supersend,
}

impl ApiProvider {
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            ApiProvider::Bazzigate => {
                "https://emailverifiers-backend.bazzigate.com/single-email-varification"
            }
            ApiProvider::ValidateEmail => "https://api.validate.email/validate",
            ApiProvider::Supersend => "https://api.supersend.io/v1/verify-email",
        }
    }

    /// Build the request URL with the provider's API key placement: query
    /// parameter `api_key` for validate.email, query parameter `key` plus a
    /// bearer header for SuperSend, nothing for Bazzigate.
    pub fn build_request(&self, base_url: &str, api_key: &str, email: &str) -> Result<ApiRequest> {
        let mut url = Url::parse(base_url)
            .with_context(|| format!("Invalid API base URL: {base_url}"))?;
        url.query_pairs_mut().append_pair("email", email);

        let mut bearer_token = None;
        if !api_key.is_empty() {
            match self {
                ApiProvider::Bazzigate => {}
                ApiProvider::ValidateEmail => {
                    url.query_pairs_mut().append_pair("api_key", api_key);
                }
                ApiProvider::Supersend => {
                    url.query_pairs_mut().append_pair("key", api_key);
                    bearer_token = Some(api_key.to_string());
                }
            }
        }

        Ok(ApiRequest {
            url: url.into(),
            bearer_token,
        })
    }

    /// Map a raw JSON response body into a status and detail string.
    pub fn parse_response(&self, payload: &Value) -> StatusDetail {
        match self {
            ApiProvider::Bazzigate => parse_bazzigate(payload),
            ApiProvider::ValidateEmail => parse_validate_email(payload),
            ApiProvider::Supersend => parse_supersend(payload),
        }
    }
}

fn parse_bazzigate(payload: &Value) -> StatusDetail {
    if payload.get("res").and_then(Value::as_bool) == Some(true) {
        StatusDetail::new(
            VerificationStatus::Valid,
            "Email address is valid and deliverable.",
        )
    } else {
        StatusDetail::new(
            VerificationStatus::Invalid,
            "Email address is invalid or undeliverable.",
        )
    }
}

fn parse_supersend(payload: &Value) -> StatusDetail {
    let message = payload.get("message").and_then(Value::as_str);
    if payload.get("valid").and_then(Value::as_bool) == Some(true) {
        StatusDetail::new(
            VerificationStatus::Valid,
            message.unwrap_or("Email address is valid and deliverable."),
        )
    } else if message.is_some_and(|m| m.contains("Uncertain")) {
        // SuperSend reports uncertain results as valid=false with an
        // explanatory message; those are risky, not invalid.
        StatusDetail::new(
            VerificationStatus::Risky,
            message.unwrap_or("Email validation is uncertain."),
        )
    } else {
        StatusDetail::new(
            VerificationStatus::Invalid,
            message.unwrap_or("Email address is invalid or undeliverable."),
        )
    }
}

fn parse_validate_email(payload: &Value) -> StatusDetail {
    let Some(res) = payload.get("result") else {
        return StatusDetail::new(
            VerificationStatus::Unknown,
            "API error or no result received.",
        );
    };

    let mut status = VerificationStatus::Unknown;
    let mut parts: Vec<String> = Vec::new();
    fn add(parts: &mut Vec<String>, part: String) {
        if !part.trim().is_empty() && !parts.contains(&part) {
            parts.push(part);
        }
    }

    let disposable = res.get("disposable").and_then(Value::as_bool) == Some(true);
    let risk_score = res
        .get("riskScore")
        .and_then(|r| r.get("score"))
        .and_then(Value::as_i64);

    match res.get("reachable").and_then(Value::as_str) {
        Some("safe") => {
            status = VerificationStatus::Valid;
            // Informational flags only; they do not demote a safe result.
            if disposable {
                add(&mut parts, "Disposable email address.".to_string());
            }
            if res
                .get("smtp")
                .and_then(|s| s.get("is_catch_all"))
                .and_then(Value::as_bool)
                == Some(true)
            {
                add(&mut parts, "Domain is catch-all.".to_string());
            }
            if let Some(domain) = res.get("domain") {
                if domain.get("spf").and_then(Value::as_bool) != Some(true) {
                    add(&mut parts, "Domain does not have an SPF record.".to_string());
                }
                if domain
                    .get("age")
                    .and_then(Value::as_i64)
                    .is_some_and(|age| age < 180)
                {
                    add(&mut parts, "Domain age is less than 180 days.".to_string());
                }
            }
            if let Some(score) = risk_score {
                if score >= 70 {
                    add(&mut parts, format!("High risk score: {score}."));
                }
            }
        }
        Some("invalid") => {
            status = VerificationStatus::Invalid;
            let smtp = res.get("smtp");
            if smtp.and_then(|s| s.get("is_disabled")).and_then(Value::as_bool) == Some(true) {
                add(&mut parts, "Account disabled or does not exist.".to_string());
            } else if smtp
                .and_then(|s| s.get("is_deliverable"))
                .and_then(Value::as_bool)
                == Some(false)
            {
                add(&mut parts, "Email address not deliverable by SMTP.".to_string());
            } else {
                add(&mut parts, "Email address is invalid.".to_string());
            }
        }
        Some("risky") => {
            status = VerificationStatus::Risky;
            if disposable {
                add(&mut parts, "Disposable email address.".to_string());
            }
            if let Some(reasons) = res
                .get("riskScore")
                .and_then(|r| r.get("reasons"))
                .and_then(Value::as_array)
            {
                for reason in reasons {
                    if let Some(reason) = reason.as_str() {
                        add(&mut parts, reason.to_string());
                    }
                }
            }
        }
        Some("unknown") => {
            add(&mut parts, "Email reachability is unknown.".to_string());
        }
        _ => {}
    }

    // Syntax failure overrides reachability, whatever it said.
    if res
        .get("syntax")
        .and_then(|s| s.get("valid"))
        .and_then(Value::as_bool)
        != Some(true)
    {
        status = VerificationStatus::Invalid;
        parts = vec!["Invalid email syntax.".to_string()];
    }

    let detail = if parts.is_empty() {
        match status {
            VerificationStatus::Valid => "Mailbox appears valid and deliverable.",
            VerificationStatus::Risky => "Email has risk factors identified.",
            VerificationStatus::Unknown => "Could not conclusively determine status.",
            VerificationStatus::Invalid => "Email is invalid or undeliverable.",
        }
        .to_string()
    } else {
        parts.join("; ")
    };

    StatusDetail::new(status, detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bazzigate_mapping() {
        let detail = ApiProvider::Bazzigate.parse_response(&json!({"res": true, "email": "a@b.co"}));
        assert_eq!(detail.status, VerificationStatus::Valid);
        assert!(detail.is_valid());

        let detail = ApiProvider::Bazzigate.parse_response(&json!({"res": false}));
        assert_eq!(detail.status, VerificationStatus::Invalid);

        // Missing field reads as invalid, not as an error.
        let detail = ApiProvider::Bazzigate.parse_response(&json!({}));
        assert_eq!(detail.status, VerificationStatus::Invalid);
    }

    #[test]
    fn test_supersend_mapping() {
        let detail =
            ApiProvider::Supersend.parse_response(&json!({"valid": true, "message": "Deliverable"}));
        assert_eq!(detail.status, VerificationStatus::Valid);
        assert_eq!(detail.detail, "Deliverable");

        let detail = ApiProvider::Supersend
            .parse_response(&json!({"valid": false, "message": "Uncertain: greylisted"}));
        assert_eq!(detail.status, VerificationStatus::Risky);

        let detail = ApiProvider::Supersend.parse_response(&json!({"valid": false}));
        assert_eq!(detail.status, VerificationStatus::Invalid);
        assert_eq!(detail.detail, "Email address is invalid or undeliverable.");
    }

    #[test]
    fn test_validate_email_safe_with_flags() {
        let payload = json!({
            "result": {
                "reachable": "safe",
                "syntax": {"valid": true},
                "disposable": true,
                "smtp": {"is_catch_all": true},
                "domain": {"spf": false, "age": 90},
                "riskScore": {"score": 85}
            }
        });
        let detail = ApiProvider::ValidateEmail.parse_response(&payload);
        assert_eq!(detail.status, VerificationStatus::Valid);
        assert!(detail.detail.contains("Disposable email address."));
        assert!(detail.detail.contains("Domain is catch-all."));
        assert!(detail.detail.contains("Domain does not have an SPF record."));
        assert!(detail.detail.contains("Domain age is less than 180 days."));
        assert!(detail.detail.contains("High risk score: 85."));
    }

    #[test]
    fn test_validate_email_safe_clean() {
        let payload = json!({
            "result": {
                "reachable": "safe",
                "syntax": {"valid": true},
                "domain": {"spf": true, "age": 5000}
            }
        });
        let detail = ApiProvider::ValidateEmail.parse_response(&payload);
        assert_eq!(detail.status, VerificationStatus::Valid);
        assert_eq!(detail.detail, "Mailbox appears valid and deliverable.");
    }

    #[test]
    fn test_validate_email_invalid_reasons() {
        let payload = json!({
            "result": {
                "reachable": "invalid",
                "syntax": {"valid": true},
                "smtp": {"is_disabled": true}
            }
        });
        let detail = ApiProvider::ValidateEmail.parse_response(&payload);
        assert_eq!(detail.status, VerificationStatus::Invalid);
        assert_eq!(detail.detail, "Account disabled or does not exist.");

        let payload = json!({
            "result": {
                "reachable": "invalid",
                "syntax": {"valid": true},
                "smtp": {"is_deliverable": false}
            }
        });
        let detail = ApiProvider::ValidateEmail.parse_response(&payload);
        assert_eq!(detail.detail, "Email address not deliverable by SMTP.");
    }

    #[test]
    fn test_validate_email_risky_reasons() {
        let payload = json!({
            "result": {
                "reachable": "risky",
                "syntax": {"valid": true},
                "riskScore": {"reasons": ["Recently registered domain", "Low reputation"]}
            }
        });
        let detail = ApiProvider::ValidateEmail.parse_response(&payload);
        assert_eq!(detail.status, VerificationStatus::Risky);
        assert_eq!(
            detail.detail,
            "Recently registered domain; Low reputation"
        );
    }

    #[test]
    fn test_validate_email_syntax_overrides_reachable() {
        for reachable in ["safe", "invalid", "risky", "unknown"] {
            let payload = json!({
                "result": {
                    "reachable": reachable,
                    "syntax": {"valid": false},
                    "disposable": true
                }
            });
            let detail = ApiProvider::ValidateEmail.parse_response(&payload);
            assert_eq!(detail.status, VerificationStatus::Invalid);
            assert_eq!(detail.detail, "Invalid email syntax.");
        }
    }

    #[test]
    fn test_validate_email_missing_result() {
        let detail = ApiProvider::ValidateEmail.parse_response(&json!({"error": "quota"}));
        assert_eq!(detail.status, VerificationStatus::Unknown);
        assert_eq!(detail.detail, "API error or no result received.");
    }

    #[test]
    fn test_build_request_key_placement() {
        let req = ApiProvider::Bazzigate
            .build_request(
                ApiProvider::Bazzigate.default_endpoint(),
                "secret",
                "a+b@example.com",
            )
            .unwrap();
        assert!(req.url.contains("email=a%2Bb%40example.com"));
        assert!(!req.url.contains("secret"));
        assert!(req.bearer_token.is_none());

        let req = ApiProvider::ValidateEmail
            .build_request("https://api.validate.email/validate", "secret", "a@b.co")
            .unwrap();
        assert!(req.url.contains("api_key=secret"));
        assert!(req.bearer_token.is_none());

        let req = ApiProvider::Supersend
            .build_request("https://api.supersend.io/v1/verify-email", "secret", "a@b.co")
            .unwrap();
        assert!(req.url.contains("key=secret"));
        assert_eq!(req.bearer_token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_build_request_rejects_bad_url() {
        assert!(ApiProvider::Bazzigate
            .build_request("not a url", "", "a@b.co")
            .is_err());
    }

    #[test]
    fn test_provider_serde_names() {
        assert_eq!(
            serde_yaml::to_string(&ApiProvider::ValidateEmail).unwrap().trim(),
            "validate-email"
        );
        let p: ApiProvider = serde_yaml::from_str("bazzigate").unwrap();
        assert_eq!(p, ApiProvider::Bazzigate);
        let p: ApiProvider = serde_yaml::from_str("supersend").unwrap();
        assert_eq!(p, ApiProvider::Supersend);
    }
}
