// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client for the platform ledger service's escrow-release RPC.
//!
//! The ledger holds agent-application deposits as freezes. `release`
//! unwinds a freeze, and is idempotent on the remote side by transaction
//! id: re-sending the same `tx_id` yields an "idempotent hit" response,
//! which callers must treat as success. The `tx_id` for an application is
//! derived from its id, so retries of the same review are recognized as
//! the same logical release.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Remote status code for "this release was already performed".
const CODE_IDEMPOTENT_HIT: i64 = 409_001;

/// Why a freeze is being released; recorded in the ledger journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReleaseReason {
    /// Agent approved to revert to member; deposit refunded.
    ApplyToMemberRefund,
    /// Application to become an agent rejected; deposit refunded.
    ApplyToAgentReject,
}

/// Escrow release request.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseRequest {
    pub freeze_id: i64,
    /// Amount to release; zero means "everything still held".
    pub delta: Decimal,
    pub reason: ReleaseReason,
    /// Deterministic per-application id; duplicate detection key.
    pub tx_id: String,
    pub desc: String,
}

/// Successful outcomes of a release call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The ledger performed the release now.
    Released,
    /// The ledger had already performed this exact release.
    IdempotentHit,
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger configuration missing: {0}")]
    MissingConfig(String),

    #[error("ledger request failed: {0}")]
    Request(String),

    #[error("ledger response was invalid: {0}")]
    InvalidResponse(String),

    #[error("ledger rejected release (code {code}): {message}")]
    Remote { code: i64, message: String },
}

/// Escrow-release capability of the ledger service.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn release(&self, request: &ReleaseRequest) -> Result<ReleaseOutcome, LedgerError>;
}

/// HTTP implementation talking to the internal ledger service.
#[derive(Debug, Clone)]
pub struct HttpLedgerClient {
    base_url: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct ReleaseResponse {
    code: i64,
    #[serde(default)]
    message: String,
}

impl HttpLedgerClient {
    /// Build the client from `LEDGER_BASE_URL`.
    pub fn from_env() -> Result<Self, LedgerError> {
        Self::from_base_url(std::env::var("LEDGER_BASE_URL").ok())
    }

    fn from_base_url(base_url: Option<String>) -> Result<Self, LedgerError> {
        let base_url =
            base_url.ok_or_else(|| LedgerError::MissingConfig("LEDGER_BASE_URL".to_string()))?;
        Self::new(base_url)
    }

    pub fn new(base_url: impl Into<String>) -> Result<Self, LedgerError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| LedgerError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn release(&self, request: &ReleaseRequest) -> Result<ReleaseOutcome, LedgerError> {
        let url = format!("{}/internal/escrow/release", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| LedgerError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LedgerError::Request(format!(
                "ledger returned HTTP {status}"
            )));
        }

        let body: ReleaseResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;

        match body.code {
            0 => Ok(ReleaseOutcome::Released),
            CODE_IDEMPOTENT_HIT => Ok(ReleaseOutcome::IdempotentHit),
            code => Err(LedgerError::Remote {
                code,
                message: body.message,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_request_serializes_wire_format() {
        let request = ReleaseRequest {
            freeze_id: 99,
            delta: Decimal::ZERO,
            reason: ReleaseReason::ApplyToAgentReject,
            tx_id: "42".to_string(),
            desc: "agent application rejected, deposit refunded".to_string(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["freeze_id"], 99);
        assert_eq!(json["delta"], "0");
        assert_eq!(json["reason"], "apply-to-agent-reject");
        assert_eq!(json["tx_id"], "42");
    }

    #[test]
    fn response_codes_map_to_outcomes() {
        let ok: ReleaseResponse = serde_json::from_str(r#"{"code":0}"#).unwrap();
        assert_eq!(ok.code, 0);

        let hit: ReleaseResponse =
            serde_json::from_str(r#"{"code":409001,"message":"duplicate tx"}"#).unwrap();
        assert_eq!(hit.code, CODE_IDEMPOTENT_HIT);
    }

    #[test]
    fn missing_base_url_is_a_config_error() {
        assert!(matches!(
            HttpLedgerClient::from_base_url(None),
            Err(LedgerError::MissingConfig(_))
        ));
        assert!(HttpLedgerClient::from_base_url(Some("http://ledger.internal".to_string())).is_ok());
    }

    #[test]
    fn base_url_is_normalized() {
        let client = HttpLedgerClient::new("http://ledger.internal/").unwrap();
        assert_eq!(client.base_url, "http://ledger.internal");
    }
}
