//! Status Normalization
//!
//! Maps the raw, free-form status strings returned by the merchant status
//! API onto a fixed four-value classification. Raw strings are kept
//! alongside the category so policy decisions (e.g. the gateway-pending
//! verification path) can still see the original value.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The ambiguous "gateway pending" status some gateways report while the
/// payment has already settled on their side.
pub const GATEWAY_PENDING: &str = "pg_pending";

/// Normalized payment status category
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusCategory {
    Success,
    Pending,
    Failure,
    Unknown,
}

impl StatusCategory {
    /// Normalize a raw gateway status string.
    ///
    /// Anything not explicitly listed maps to `Unknown`, which the engine
    /// treats the same as `Pending` — an unrecognized status must never be
    /// reported as a failure.
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "success" | "completed" | "succeeded" => StatusCategory::Success,
            "in_progress" | "pending" | "processing" | "new" | GATEWAY_PENDING => {
                StatusCategory::Pending
            }
            "fail" | "failed" | "error" | "cancelled" | "canceled" => StatusCategory::Failure,
            _ => StatusCategory::Unknown,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            StatusCategory::Success => "success",
            StatusCategory::Pending => "pending",
            StatusCategory::Failure => "failure",
            StatusCategory::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Check whether a raw status names a user cancellation rather than a
/// plain failure.
pub fn is_cancellation(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "cancelled" | "canceled" | "cancel" | "abort" | "aborted"
    )
}

/// Normalized status record produced on every lookup
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusRecord {
    /// Merchant transaction reference
    pub txn_ref: String,

    /// Transaction amount
    pub amount: Decimal,

    /// Gateway name (e.g. "EASEBUZZ", "ATOM")
    pub gateway: String,

    /// Raw status string as reported by the API
    pub raw_status: String,

    /// Normalized category
    pub category: StatusCategory,

    /// When this record was produced
    pub checked_at: DateTime<Utc>,
}

impl StatusRecord {
    /// Raw status lowercased and trimmed, for policy comparisons
    pub fn normalized_raw(&self) -> String {
        self.raw_status.trim().to_lowercase()
    }
}
