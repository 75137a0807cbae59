//! # selfcare-core
//!
//! Domain model and response parsing for the self-care payment
//! reconciliation engine.
//!
//! The self-care client embeds an externally hosted checkout page it does
//! not control. Once that page signals that a transaction may have
//! finished, the outcome is confirmed against the merchant's own status
//! API — whose response shape has changed over time and is never trusted.
//! This crate holds the pure pieces of that flow:
//!
//! - the payment intent and terminal outcome types,
//! - the four-value status normalization,
//! - the per-platform reconciliation policy,
//! - the tolerant response parser and its shape adapters.
//!
//! The asynchronous engine, detector and presenter live in
//! `selfcare-recon`.

pub mod config;
pub mod error;
pub mod intent;
pub mod parse;
pub mod policy;
pub mod status;

pub use config::ClientConfig;
pub use error::{ReconError, Result};
pub use intent::{PaymentIntent, PaymentOutcome, ReconciliationState, TerminalStatus};
pub use parse::{ResponseParser, ShapeAdapter, ShapeHit};
pub use policy::{Platform, StatusPolicy};
pub use status::{GATEWAY_PENDING, StatusCategory, StatusRecord, is_cancellation};
