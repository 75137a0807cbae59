//! # selfcare-recon
//!
//! Payment-completion detection and reconciliation for the self-care
//! client.
//!
//! The checkout itself runs on an externally hosted, untrusted page. This
//! crate watches that page's navigation and message events for plausible
//! completion signals (`CompletionDetector`), then authoritatively
//! confirms the outcome through repeated asynchronous lookups against the
//! merchant's own transaction API (`ReconciliationEngine` over a
//! `StatusLookup` backend), and guarantees the user is shown exactly one
//! terminal result (`StatusPresenter`).
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use selfcare_core::{PaymentIntent, Platform, StatusPolicy};
//! use selfcare_recon::{
//!     CompletionDetector, HostEvent, HttpStatusLookup, ReconciliationEngine,
//!     FALLBACK_TIMEOUT,
//! };
//!
//! let lookup = Arc::new(HttpStatusLookup::new(config, token)?);
//! let engine = ReconciliationEngine::new(
//!     intent,
//!     StatusPolicy::for_platform(Platform::detect()),
//!     lookup,
//!     username,
//!     realm,
//! );
//!
//! let detector = CompletionDetector::new(engine.clone(), success_hosts);
//! let fallback = detector.arm_fallback(FALLBACK_TIMEOUT);
//!
//! // Feed webview events:
//! detector.on_host_event(&HostEvent::Navigation { url });
//!
//! // Await the terminal outcome:
//! let mut outcomes = engine.subscribe();
//!
//! // On unmount:
//! fallback.abort();
//! engine.shutdown();
//! ```

pub mod detector;
pub mod engine;
pub mod lookup;
pub mod presenter;

pub use detector::{
    CompletionDetector, DetectionRule, FALLBACK_TIMEOUT, HostEvent, Signal,
};
pub use engine::ReconciliationEngine;
pub use lookup::{HttpStatusLookup, LookupRequest, MockStatusLookup, StatusLookup};
pub use presenter::{PresentationClass, RecheckResult, StatusPresentation, StatusPresenter};
