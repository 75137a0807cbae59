//! Status Presentation
//!
//! Maps the reconciliation result onto the four presentation classes the
//! result screen renders, and backs the manual "check status" action.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use selfcare_core::{
    PaymentOutcome, ReconError, StatusCategory, TerminalStatus, is_cancellation,
};

use crate::engine::ReconciliationEngine;

/// Presentation class for the result screen
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresentationClass {
    Success,
    Failure,
    Cancelled,
    Pending,
}

/// Renderable terminal (or pending) result
#[derive(Clone, Debug, Serialize)]
pub struct StatusPresentation {
    pub class: PresentationClass,
    pub title: String,
    pub message: String,
    pub icon: &'static str,
}

impl StatusPresentation {
    fn success() -> Self {
        Self {
            class: PresentationClass::Success,
            title: "Payment Successful".into(),
            message: "Your payment was processed successfully.".into(),
            icon: "check-circle",
        }
    }

    fn failure() -> Self {
        Self {
            class: PresentationClass::Failure,
            title: "Payment Failed".into(),
            message: "There was a problem processing your payment.".into(),
            icon: "alert-circle",
        }
    }

    fn cancelled() -> Self {
        Self {
            class: PresentationClass::Cancelled,
            title: "Payment Cancelled".into(),
            message: "Your payment was cancelled.".into(),
            icon: "close-circle",
        }
    }

    fn pending() -> Self {
        Self {
            class: PresentationClass::Pending,
            title: "Payment Pending".into(),
            message: "Your payment is still being processed. Please check again in a moment."
                .into(),
            icon: "progress-clock",
        }
    }
}

/// Result of the manual one-shot recheck
#[derive(Clone, Debug)]
pub enum RecheckResult {
    /// Fresh presentation to render
    Updated(StatusPresentation),

    /// Transient, recoverable alert; the terminal display stays intact
    Alert(String),
}

/// Renders terminal outcomes and drives the manual recheck
pub struct StatusPresenter {
    engine: Arc<ReconciliationEngine>,
}

impl StatusPresenter {
    pub fn new(engine: Arc<ReconciliationEngine>) -> Self {
        Self { engine }
    }

    /// Presentation for a terminal outcome
    pub fn present(outcome: &PaymentOutcome) -> StatusPresentation {
        match outcome.status {
            TerminalStatus::Success => StatusPresentation::success(),
            TerminalStatus::Failure => StatusPresentation::failure(),
            TerminalStatus::Cancelled => StatusPresentation::cancelled(),
        }
    }

    /// Presentation for a freshly looked-up category, e.g. the recheck
    /// result
    pub fn present_category(category: StatusCategory, raw_status: &str) -> StatusPresentation {
        match category {
            StatusCategory::Success => StatusPresentation::success(),
            StatusCategory::Failure if is_cancellation(raw_status) => {
                StatusPresentation::cancelled()
            }
            StatusCategory::Failure => StatusPresentation::failure(),
            StatusCategory::Pending | StatusCategory::Unknown => StatusPresentation::pending(),
        }
    }

    /// Whether a class offers the manual "check status" action
    pub fn offers_recheck(class: PresentationClass) -> bool {
        matches!(
            class,
            PresentationClass::Failure | PresentationClass::Cancelled | PresentationClass::Pending
        )
    }

    /// One-shot manual recheck.
    ///
    /// Failures of the single lookup surface as a transient alert; a
    /// missing transaction reference is an explicit alert rather than a
    /// silent no-op.
    pub async fn recheck(&self) -> RecheckResult {
        match self.engine.check_once().await {
            Ok(record) => {
                RecheckResult::Updated(Self::present_category(record.category, &record.raw_status))
            }
            Err(e @ ReconError::MissingTransactionRef) => {
                tracing::warn!("recheck without transaction reference");
                RecheckResult::Alert(e.user_message().to_string())
            }
            Err(e) => {
                tracing::warn!(error = %e, "manual recheck failed");
                RecheckResult::Alert(e.user_message().to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use selfcare_core::{PaymentIntent, StatusPolicy};

    use crate::lookup::MockStatusLookup;

    fn presenter_with(mock: Arc<MockStatusLookup>) -> StatusPresenter {
        let intent = PaymentIntent::new("T1", "EASEBUZZ", dec!(500), "https://pg.example/pay");
        let engine =
            ReconciliationEngine::new(intent, StatusPolicy::android(), mock, "user1", "realm1");
        StatusPresenter::new(engine)
    }

    #[test]
    fn test_terminal_presentation() {
        let outcome = PaymentOutcome {
            txn_ref: "T1".into(),
            checkout_source: "https://pg.example/pay".into(),
            gateway: "EASEBUZZ".into(),
            amount: dec!(500),
            status: TerminalStatus::Success,
            raw_status: "success".into(),
        };
        let presentation = StatusPresenter::present(&outcome);
        assert_eq!(presentation.class, PresentationClass::Success);
        assert_eq!(presentation.icon, "check-circle");
    }

    #[test]
    fn test_category_presentation() {
        let p = StatusPresenter::present_category(StatusCategory::Failure, "cancelled");
        assert_eq!(p.class, PresentationClass::Cancelled);

        let p = StatusPresenter::present_category(StatusCategory::Failure, "failed");
        assert_eq!(p.class, PresentationClass::Failure);

        let p = StatusPresenter::present_category(StatusCategory::Unknown, "odd");
        assert_eq!(p.class, PresentationClass::Pending);
    }

    #[test]
    fn test_recheck_offer() {
        assert!(!StatusPresenter::offers_recheck(PresentationClass::Success));
        assert!(StatusPresenter::offers_recheck(PresentationClass::Failure));
        assert!(StatusPresenter::offers_recheck(PresentationClass::Pending));
        assert!(StatusPresenter::offers_recheck(PresentationClass::Cancelled));
    }

    #[tokio::test]
    async fn test_recheck_updates_presentation() {
        let mock = Arc::new(MockStatusLookup::new());
        mock.push_statuses(&["success"]);
        let presenter = presenter_with(mock);

        match presenter.recheck().await {
            RecheckResult::Updated(p) => assert_eq!(p.class, PresentationClass::Success),
            RecheckResult::Alert(msg) => panic!("unexpected alert: {msg}"),
        }
    }

    #[tokio::test]
    async fn test_recheck_failure_is_transient_alert() {
        let mock = Arc::new(MockStatusLookup::new());
        mock.push_response(Err(ReconError::Lookup("connection reset".into())));
        let presenter = presenter_with(mock);

        match presenter.recheck().await {
            RecheckResult::Alert(msg) => {
                assert_eq!(msg, "Failed to check payment status. Please try again later.");
            }
            RecheckResult::Updated(_) => panic!("expected alert"),
        }
    }

    #[tokio::test]
    async fn test_recheck_without_txn_ref_alerts() {
        let mock = Arc::new(MockStatusLookup::new());
        let intent = PaymentIntent::new("", "EASEBUZZ", dec!(500), "https://pg.example/pay");
        let engine =
            ReconciliationEngine::new(intent, StatusPolicy::android(), mock, "user1", "realm1");
        let presenter = StatusPresenter::new(engine);

        match presenter.recheck().await {
            RecheckResult::Alert(msg) => assert_eq!(msg, "Transaction reference not found"),
            RecheckResult::Updated(_) => panic!("expected alert"),
        }
    }
}
