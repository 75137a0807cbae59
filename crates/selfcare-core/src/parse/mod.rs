//! Response Parsing
//!
//! Runs the shape adapters in priority order and normalizes the first
//! successful extraction into a `StatusRecord`. Never fails: when no
//! adapter matches, the caller-supplied default category is used and the
//! identifying fields fall back to the payment intent.

pub mod shapes;

pub use shapes::{ShapeAdapter, ShapeHit};

use chrono::Utc;
use serde_json::Value;

use crate::intent::PaymentIntent;
use crate::status::{StatusCategory, StatusRecord};

/// Tolerant parser over the untrusted status API response
pub struct ResponseParser {
    adapters: Vec<ShapeAdapter>,
    default_category: StatusCategory,
}

impl ResponseParser {
    /// Create with the default adapter chain
    pub fn new(default_category: StatusCategory) -> Self {
        Self {
            adapters: shapes::default_adapters(),
            default_category,
        }
    }

    /// Create with a custom adapter chain (order is priority)
    pub fn with_adapters(adapters: Vec<ShapeAdapter>, default_category: StatusCategory) -> Self {
        Self {
            adapters,
            default_category,
        }
    }

    /// Parse a raw payload into a normalized record.
    ///
    /// First adapter yielding a non-empty transaction reference or status
    /// wins; missing fields fall back to the intent.
    pub fn parse(&self, payload: &Value, intent: &PaymentIntent) -> StatusRecord {
        for adapter in &self.adapters {
            if let Some(hit) = (adapter.extract)(payload) {
                if hit.is_useful() {
                    tracing::debug!(shape = adapter.name, "response shape matched");
                    return self.record_from_hit(hit, intent);
                }
            }
        }

        tracing::debug!(
            default = %self.default_category,
            "no response shape matched, using default category"
        );
        StatusRecord {
            txn_ref: intent.txn_ref.clone(),
            amount: intent.amount,
            gateway: intent.gateway.clone(),
            raw_status: String::new(),
            category: self.default_category,
            checked_at: Utc::now(),
        }
    }

    fn record_from_hit(&self, hit: ShapeHit, intent: &PaymentIntent) -> StatusRecord {
        let raw_status = hit.status.unwrap_or_default();
        let category = if raw_status.is_empty() {
            self.default_category
        } else {
            StatusCategory::from_raw(&raw_status)
        };

        StatusRecord {
            txn_ref: hit
                .txn_ref
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| intent.txn_ref.clone()),
            amount: hit.amount.unwrap_or(intent.amount),
            gateway: intent.gateway.clone(),
            raw_status,
            category,
            checked_at: Utc::now(),
        }
    }
}
