//! Self-care client shell
//!
//! Wires the payment reconciliation flow together: status lookup backend,
//! reconciliation engine, completion detector and presenter. With
//! `SELFCARE_API_BASE` configured it talks to the live self-care API;
//! otherwise it runs a scripted demo of the full detect → reconcile →
//! present flow against the mock lookup.

use std::sync::Arc;

use rust_decimal_macros::dec;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use selfcare_core::{ClientConfig, PaymentIntent, Platform, StatusPolicy};
use selfcare_recon::{
    CompletionDetector, FALLBACK_TIMEOUT, HostEvent, HttpStatusLookup, MockStatusLookup,
    ReconciliationEngine, StatusLookup, StatusPresenter,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let (lookup, realm): (Arc<dyn StatusLookup>, String) = match ClientConfig::from_env() {
        Ok(config) => {
            tracing::info!(api_base = %config.api_base, realm = %config.realm, "✓ live status API configured");
            let token = std::env::var("SELFCARE_AUTH_TOKEN").unwrap_or_default();
            let realm = config.realm.clone();
            (Arc::new(HttpStatusLookup::new(config, token)?), realm)
        }
        Err(_) => {
            tracing::warn!("⚠ SELFCARE_API_BASE not set - running scripted demo against mock lookup");
            (Arc::new(demo_lookup()), "demo-realm".into())
        }
    };

    let username = std::env::var("SELFCARE_USERNAME").unwrap_or_else(|_| "demo-user".into());
    let txn_ref = std::env::var("SELFCARE_TXN_REF")
        .unwrap_or_else(|_| uuid::Uuid::new_v4().simple().to_string());

    let intent = PaymentIntent::new(
        txn_ref,
        "EASEBUZZ",
        dec!(500),
        "https://pay.easebuzz.in/pay/demo",
    );

    let platform = Platform::detect();
    tracing::info!(?platform, txn_ref = %intent.txn_ref, "starting checkout reconciliation");

    let engine = ReconciliationEngine::new(
        intent,
        StatusPolicy::for_platform(platform),
        lookup,
        username,
        realm,
    );

    let detector = CompletionDetector::new(engine.clone(), vec!["selfcare.example.in".into()]);
    let fallback = detector.arm_fallback(FALLBACK_TIMEOUT);

    // Replay the event sequence a typical checkout produces. With a live
    // API these would come from the hosting webview instead.
    for event in demo_events() {
        detector.on_host_event(&event);
    }

    // Await the terminal outcome
    let mut outcomes = engine.subscribe();
    let outcome = loop {
        if let Some(outcome) = outcomes.borrow().clone() {
            break outcome;
        }
        outcomes.changed().await?;
    };

    fallback.abort();
    engine.shutdown();

    let presentation = StatusPresenter::present(&outcome);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("  {}", presentation.title);
    tracing::info!("  {}", presentation.message);
    tracing::info!("  Gateway: {}", outcome.gateway);
    tracing::info!("  Txn Ref: {}", outcome.txn_ref);
    tracing::info!("  Amount:  ₹{}", outcome.amount);
    tracing::info!("══════════════════════════════════════════════════");

    Ok(())
}

/// Mock lookup scripted with the response sequence a slow gateway
/// typically produces: two in-flight polls, then a success row.
fn demo_lookup() -> MockStatusLookup {
    let mock = MockStatusLookup::new();
    mock.push_statuses(&["in_progress", "in_progress"]);
    mock.push_response(Ok(json!({
        "program": "Get Transaction Detail",
        "data": [{"txn_id": "demo-txn", "amount": 500, "txn_status": "success"}]
    })));
    mock
}

/// The navigation trace of a typical hosted checkout: payment form, 3-D
/// Secure hop, then the response endpoint.
fn demo_events() -> Vec<HostEvent> {
    vec![
        HostEvent::Navigation {
            url: "https://pay.easebuzz.in/pay/demo".into(),
        },
        HostEvent::Navigation {
            url: "https://acs.bank.example/3dsecure/challenge".into(),
        },
        HostEvent::Navigation {
            url: "https://crm.example.com/tp/pg/response.php?txn=demo-txn".into(),
        },
    ]
}
