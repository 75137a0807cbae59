//! Status Lookup
//!
//! Abstraction over the merchant's transaction status API.

mod http;
mod mock;

pub use http::HttpStatusLookup;
pub use mock::MockStatusLookup;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use selfcare_core::Result;

/// Key identifying a transaction on the status API
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LookupRequest {
    /// Subscriber username
    pub username: String,

    /// Merchant transaction reference
    pub txn_ref: String,

    /// Billing realm / client identifier
    pub realm: String,
}

impl LookupRequest {
    pub fn new(
        username: impl Into<String>,
        txn_ref: impl Into<String>,
        realm: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            txn_ref: txn_ref.into(),
            realm: realm.into(),
        }
    }
}

/// Status lookup client trait
///
/// Implement this per backend; the engine only ever talks to this seam.
#[async_trait]
pub trait StatusLookup: Send + Sync {
    /// Fetch the raw transaction status payload.
    ///
    /// The returned value is untrusted: its shape has changed over time
    /// and is normalized downstream by the response parser.
    async fn fetch_status(&self, request: &LookupRequest) -> Result<Value>;

    /// Extra verification lookup used under the pre-success-verification
    /// policy. Returns a simplified status string.
    async fn verify_status(&self, request: &LookupRequest) -> Result<String>;

    /// Backend name
    fn name(&self) -> &str;
}
