//! Payment Intent & Outcome
//!
//! The immutable identity of one checkout attempt, the reconciliation
//! state machine value, and the terminal outcome handed off to the
//! presentation layer.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A payment flow initiated through the hosted checkout page.
///
/// Created when the checkout screen mounts and owned exclusively by the
/// reconciliation flow for that screen instance. Immutable thereafter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Merchant transaction reference
    pub txn_ref: String,

    /// Gateway name (e.g. "EASEBUZZ", "ATOM")
    pub gateway: String,

    /// Amount being paid
    pub amount: Decimal,

    /// The checkout page source URL the webview was launched with
    pub checkout_source: String,
}

impl PaymentIntent {
    pub fn new(
        txn_ref: impl Into<String>,
        gateway: impl Into<String>,
        amount: Decimal,
        checkout_source: impl Into<String>,
    ) -> Self {
        Self {
            txn_ref: txn_ref.into(),
            gateway: gateway.into(),
            amount,
            checkout_source: checkout_source.into(),
        }
    }
}

/// Terminal reconciliation result
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalStatus {
    Success,
    Failure,
    Cancelled,
}

impl TerminalStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TerminalStatus::Success => "success",
            TerminalStatus::Failure => "failure",
            TerminalStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reconciliation state machine.
///
/// Once `Terminal` is reached no further transitions occur for the
/// intent; the engine enforces this with a single-use guard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconciliationState {
    Idle,
    Polling,
    Terminal(TerminalStatus),
}

impl ReconciliationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReconciliationState::Terminal(_))
    }
}

/// Terminal outcome handed off to the presentation/navigation layer
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentOutcome {
    /// Merchant transaction reference (possibly refined by the parser)
    pub txn_ref: String,

    /// Checkout page source the flow was launched with
    pub checkout_source: String,

    /// Gateway name
    pub gateway: String,

    /// Amount (possibly refined by the parser)
    pub amount: Decimal,

    /// Terminal status
    pub status: TerminalStatus,

    /// Raw status string behind the terminal decision
    pub raw_status: String,
}
