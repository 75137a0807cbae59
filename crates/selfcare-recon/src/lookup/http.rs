//! HTTP Status Lookup
//!
//! Implementation of `StatusLookup` against the self-care billing API.

use async_trait::async_trait;
use serde_json::{Value, json};

use selfcare_core::{ClientConfig, ReconError, Result};

use super::{LookupRequest, StatusLookup};

const REFERER: &str = "L2S-System/User-App-Requests";

/// Status lookup over the self-care HTTP API
pub struct HttpStatusLookup {
    client: reqwest::Client,
    config: ClientConfig,
    auth_token: String,
}

impl HttpStatusLookup {
    /// Create a new client for the configured API base
    pub fn new(config: ClientConfig, auth_token: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ReconError::Config(e.to_string()))?;

        Ok(Self {
            client,
            config,
            auth_token: auth_token.into(),
        })
    }

    async fn post(&self, endpoint: &str, body: Value) -> Result<Value> {
        let url = format!("{}/{}", self.config.api_base.trim_end_matches('/'), endpoint);
        tracing::debug!(%url, "status API request");

        let response = self
            .client
            .post(&url)
            .header("Authentication", &self.auth_token)
            .header("cache-control", "no-cache")
            .header("referer", REFERER)
            .json(&body)
            .send()
            .await
            .map_err(|e| ReconError::Lookup(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ReconError::Api(format!(
                "status API returned HTTP {}",
                response.status()
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ReconError::Lookup(e.to_string()))
    }

    fn request_body(request: &LookupRequest) -> Value {
        json!({
            "username": request.username,
            "merchant_txn_id": request.txn_ref,
            "realm": request.realm,
            "request_source": "app",
        })
    }
}

#[async_trait]
impl StatusLookup for HttpStatusLookup {
    async fn fetch_status(&self, request: &LookupRequest) -> Result<Value> {
        // The whole body is handed to the parser untouched; even the
        // "status: error" envelope sometimes carries usable row data.
        self.post("selfcareGetPaymentStatus", Self::request_body(request))
            .await
    }

    async fn verify_status(&self, request: &LookupRequest) -> Result<String> {
        let body = self
            .post("selfcareVerifyPayment", Self::request_body(request))
            .await?;

        // The verification endpoint answers with a simplified status,
        // either at the top level or under data.
        let status = body
            .get("data")
            .and_then(Value::as_str)
            .or_else(|| body.get("status").and_then(Value::as_str))
            .or_else(|| body.as_str())
            .unwrap_or_default();

        if status.is_empty() {
            return Err(ReconError::Api("empty verification response".into()));
        }
        Ok(status.to_string())
    }

    fn name(&self) -> &str {
        "selfcare-http"
    }
}
