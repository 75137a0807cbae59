//! Completion Detection
//!
//! Watches navigation and message events from the hosted checkout page
//! and decides whether they plausibly indicate that the transaction has
//! finished. Detection never decides the outcome itself: a qualifying
//! signal only starts reconciliation against the merchant status API.
//!
//! Rules are an ordered, pluggable list so new gateways can register
//! their URL patterns without touching the state machine.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::engine::ReconciliationEngine;

/// Default hard fallback: if no signal arrived this long after checkout
/// start, assume pending and go check anyway.
pub const FALLBACK_TIMEOUT: Duration = Duration::from_secs(30);

/// Event surfaced by the hosting webview
#[derive(Clone, Debug)]
pub enum HostEvent {
    /// Navigation / page state change
    Navigation { url: String },

    /// Out-of-band message posted by page content
    Message { body: String },
}

/// What a detection rule concluded about a URL
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    /// Plausible completion: start reconciliation
    Completion,

    /// The gateway page reports a user cancellation
    Cancellation,

    /// Known mid-flow page (3-D Secure, OTP, redirect hop): explicitly
    /// not a completion signal, stop evaluating further rules
    Intermediate,
}

/// One pluggable URL classification rule
pub trait DetectionRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn evaluate(&self, url: &Url) -> Option<Signal>;
}

fn query_status(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| matches!(key.as_ref(), "status" | "payment_status" | "txn_status"))
        .map(|(_, value)| value.to_lowercase())
}

/// Cancel/decline/abort markers in the path or a status-like query
/// parameter naming cancellation or failure.
pub struct CancellationRule;

impl DetectionRule for CancellationRule {
    fn name(&self) -> &'static str {
        "cancellation"
    }

    fn evaluate(&self, url: &Url) -> Option<Signal> {
        let path = url.path().to_lowercase();
        const MARKERS: &[&str] = &["cancel", "decline", "reject", "abort"];
        if MARKERS.iter().any(|m| path.contains(m)) {
            return Some(Signal::Cancellation);
        }
        // An explicit failed/failure query value still reconciles through
        // the status API; only cancellation markers short-circuit.
        if let Some(status) = query_status(url) {
            if matches!(status.as_str(), "cancelled" | "canceled") {
                return Some(Signal::Cancellation);
            }
        }
        None
    }
}

/// Mid-flow pages that must never trigger reconciliation: 3-D Secure /
/// ACS authentication, OTP entry, and the billing system's own redirect
/// hops.
pub struct IntermediatePageRule {
    markers: Vec<String>,
}

impl Default for IntermediatePageRule {
    fn default() -> Self {
        Self {
            markers: [
                "3dsecure",
                "acs.",
                "-acs",
                "vbv",
                "otp",
                "authenticate",
                "verification",
                "ebsredirect.php",
                "pgredirect.php",
            ]
            .iter()
            .map(|m| (*m).to_string())
            .collect(),
        }
    }
}

impl DetectionRule for IntermediatePageRule {
    fn name(&self) -> &'static str {
        "intermediate_page"
    }

    fn evaluate(&self, url: &Url) -> Option<Signal> {
        let haystack = format!("{}{}", url.host_str().unwrap_or_default(), url.path()).to_lowercase();
        self.markers
            .iter()
            .any(|m| haystack.contains(m))
            .then_some(Signal::Intermediate)
    }
}

/// Known response/callback endpoint paths
pub struct ResponseEndpointRule {
    patterns: Vec<String>,
}

impl Default for ResponseEndpointRule {
    fn default() -> Self {
        Self {
            patterns: ["/tp/pg/response.php", "/response/", "/webservice/", "/callback"]
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
        }
    }
}

impl ResponseEndpointRule {
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }
}

impl DetectionRule for ResponseEndpointRule {
    fn name(&self) -> &'static str {
        "response_endpoint"
    }

    fn evaluate(&self, url: &Url) -> Option<Signal> {
        let path = url.path().to_lowercase();
        self.patterns
            .iter()
            .any(|p| path.contains(p.as_str()))
            .then_some(Signal::Completion)
    }
}

/// Configured success-redirect hosts, excluding intermediate redirect
/// paths that pass through the same host mid-flow.
pub struct SuccessHostRule {
    hosts: Vec<String>,
    intermediate_paths: Vec<String>,
}

impl SuccessHostRule {
    pub fn new(hosts: Vec<String>) -> Self {
        Self {
            hosts,
            intermediate_paths: vec!["ebsredirect.php".into(), "pgredirect.php".into()],
        }
    }
}

impl DetectionRule for SuccessHostRule {
    fn name(&self) -> &'static str {
        "success_host"
    }

    fn evaluate(&self, url: &Url) -> Option<Signal> {
        let host = url.host_str()?.to_lowercase();
        if !self.hosts.iter().any(|h| host == h.to_lowercase()) {
            return None;
        }
        let path = url.path().to_lowercase();
        if self.intermediate_paths.iter().any(|p| path.contains(p.as_str())) {
            return None;
        }
        Some(Signal::Completion)
    }
}

/// JSON-formatted payloads, by extension or a format query parameter
pub struct JsonPayloadRule;

impl DetectionRule for JsonPayloadRule {
    fn name(&self) -> &'static str {
        "json_payload"
    }

    fn evaluate(&self, url: &Url) -> Option<Signal> {
        if url.path().to_lowercase().ends_with(".json") {
            return Some(Signal::Completion);
        }
        url.query_pairs()
            .any(|(key, value)| {
                matches!(key.as_ref(), "format" | "response_format") && value == "json"
            })
            .then_some(Signal::Completion)
    }
}

/// A status-like query key anywhere in the URL
pub struct StatusParamRule;

impl DetectionRule for StatusParamRule {
    fn name(&self) -> &'static str {
        "status_param"
    }

    fn evaluate(&self, url: &Url) -> Option<Signal> {
        query_status(url).map(|_| Signal::Completion)
    }
}

/// Watches hosted-page events and starts reconciliation on a plausible
/// completion signal. Exactly one sequence starts no matter how many
/// signals or timers fire; the engine's guard enforces it.
pub struct CompletionDetector {
    rules: Vec<Box<dyn DetectionRule>>,
    engine: Arc<ReconciliationEngine>,
}

impl CompletionDetector {
    /// Create with the default rule set and the given success hosts
    pub fn new(engine: Arc<ReconciliationEngine>, success_hosts: Vec<String>) -> Self {
        let rules: Vec<Box<dyn DetectionRule>> = vec![
            Box::new(CancellationRule),
            Box::new(IntermediatePageRule::default()),
            Box::new(ResponseEndpointRule::default()),
            Box::new(SuccessHostRule::new(success_hosts)),
            Box::new(JsonPayloadRule),
            Box::new(StatusParamRule),
        ];
        Self { rules, engine }
    }

    /// Create with a custom rule list (order is priority)
    pub fn with_rules(engine: Arc<ReconciliationEngine>, rules: Vec<Box<dyn DetectionRule>>) -> Self {
        Self { rules, engine }
    }

    /// Register an additional gateway-specific rule, evaluated last
    pub fn register_rule(&mut self, rule: Box<dyn DetectionRule>) {
        self.rules.push(rule);
    }

    /// Inspect one hosted-page event
    pub fn on_host_event(&self, event: &HostEvent) {
        match event {
            HostEvent::Navigation { url } => self.on_navigation(url),
            HostEvent::Message { body } => self.on_message(body),
        }
    }

    /// Arm the hard fallback timer: if no signal arrived and the engine
    /// is still idle when it fires, assume pending and go check. The
    /// returned handle must be aborted when the screen unmounts.
    pub fn arm_fallback(&self, after: Duration) -> tokio::task::JoinHandle<()> {
        let engine = Arc::clone(&self.engine);
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if !engine.is_terminal() {
                tracing::info!("no completion signal before fallback timeout, checking status");
                engine.trigger();
            }
        })
    }

    fn on_navigation(&self, raw_url: &str) {
        let Ok(url) = Url::parse(raw_url) else {
            tracing::debug!(url = raw_url, "unparseable navigation url ignored");
            return;
        };

        for rule in &self.rules {
            match rule.evaluate(&url) {
                Some(Signal::Intermediate) => {
                    tracing::debug!(rule = rule.name(), %url, "mid-flow page, waiting");
                    return;
                }
                Some(Signal::Cancellation) => {
                    tracing::info!(rule = rule.name(), %url, "cancellation detected");
                    self.engine.resolve_cancelled(rule.name());
                    return;
                }
                Some(Signal::Completion) => {
                    tracing::info!(rule = rule.name(), %url, "possible completion signal");
                    self.engine.trigger();
                    return;
                }
                None => {}
            }
        }
    }

    fn on_message(&self, body: &str) {
        if message_carries_status(body) {
            tracing::info!("status payload in page message, starting reconciliation");
            self.engine.trigger();
        } else {
            tracing::debug!("page message without status fields ignored");
        }
    }
}

/// Whether an out-of-band page message carries payment status fields.
/// The payload itself is never trusted for the outcome; it only counts
/// as a completion signal.
fn message_carries_status(body: &str) -> bool {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return false;
    };

    if let Some(program) = value.get("program").and_then(Value::as_str) {
        if matches!(program, "Admin Payment Response" | "Get Transaction Detail") {
            return true;
        }
    }

    value.get("status").is_some()
        || value.get("payment_status").is_some()
        || value
            .get("data")
            .and_then(|d| d.get("txn_status"))
            .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use selfcare_core::{PaymentIntent, StatusPolicy, TerminalStatus};

    use crate::lookup::MockStatusLookup;

    fn test_engine(mock: Arc<MockStatusLookup>) -> Arc<ReconciliationEngine> {
        let intent = PaymentIntent::new("T1", "EASEBUZZ", dec!(500), "https://pg.example/pay");
        ReconciliationEngine::new(intent, StatusPolicy::android(), mock, "user1", "realm1")
    }

    fn detector(engine: Arc<ReconciliationEngine>) -> CompletionDetector {
        CompletionDetector::new(engine, vec!["selfcare.example.in".into()])
    }

    fn eval(rule: &dyn DetectionRule, url: &str) -> Option<Signal> {
        rule.evaluate(&Url::parse(url).unwrap())
    }

    #[test]
    fn test_response_endpoint_rule() {
        let rule = ResponseEndpointRule::default();
        assert_eq!(
            eval(&rule, "https://crm.example.com/tp/pg/response.php?x=1"),
            Some(Signal::Completion)
        );
        assert_eq!(
            eval(&rule, "https://pay.gateway.in/response/abc123"),
            Some(Signal::Completion)
        );
        assert_eq!(eval(&rule, "https://pay.gateway.in/checkout"), None);
    }

    #[test]
    fn test_success_host_excludes_intermediate_paths() {
        let rule = SuccessHostRule::new(vec!["selfcare.example.in".into()]);
        assert_eq!(
            eval(&rule, "http://selfcare.example.in/paid"),
            Some(Signal::Completion)
        );
        assert_eq!(eval(&rule, "http://selfcare.example.in/EBSRedirect.php"), None);
        assert_eq!(eval(&rule, "http://selfcare.example.in/pgRedirect.php"), None);
        assert_eq!(eval(&rule, "http://other.example.in/paid"), None);
    }

    #[test]
    fn test_json_payload_rule() {
        let rule = JsonPayloadRule;
        assert_eq!(
            eval(&rule, "https://pg.example/result.json"),
            Some(Signal::Completion)
        );
        assert_eq!(
            eval(&rule, "https://pg.example/result?format=json"),
            Some(Signal::Completion)
        );
        assert_eq!(eval(&rule, "https://pg.example/result?format=html"), None);
    }

    #[test]
    fn test_status_param_rule() {
        let rule = StatusParamRule;
        assert_eq!(
            eval(&rule, "https://pg.example/back?txn_status=success"),
            Some(Signal::Completion)
        );
        assert_eq!(eval(&rule, "https://pg.example/back?foo=bar"), None);
    }

    #[test]
    fn test_cancellation_rule() {
        let rule = CancellationRule;
        assert_eq!(
            eval(&rule, "https://pg.example/cancel"),
            Some(Signal::Cancellation)
        );
        assert_eq!(
            eval(&rule, "https://pg.example/back?status=cancelled"),
            Some(Signal::Cancellation)
        );
        assert_eq!(eval(&rule, "https://pg.example/back?status=success"), None);
    }

    #[test]
    fn test_intermediate_page_rule() {
        let rule = IntermediatePageRule::default();
        assert_eq!(
            eval(&rule, "https://acs.bank.example/3dsecure/challenge"),
            Some(Signal::Intermediate)
        );
        assert_eq!(
            eval(&rule, "https://pg.example/otp/enter"),
            Some(Signal::Intermediate)
        );
        assert_eq!(eval(&rule, "https://pg.example/done"), None);
    }

    #[tokio::test]
    async fn test_completion_signal_triggers_engine() {
        let mock = Arc::new(MockStatusLookup::new());
        mock.push_statuses(&["success"]);
        let engine = test_engine(mock.clone());
        let detector = detector(engine.clone());

        detector.on_host_event(&HostEvent::Navigation {
            url: "https://crm.example.com/tp/pg/response.php".into(),
        });

        let mut rx = engine.subscribe();
        while rx.borrow().is_none() {
            rx.changed().await.unwrap();
        }
        assert_eq!(mock.fetch_calls(), 1);
    }

    /// A 3-D Secure hop must not start reconciliation even though its
    /// URL would satisfy later rules.
    #[tokio::test]
    async fn test_intermediate_page_suppresses_later_rules() {
        let mock = Arc::new(MockStatusLookup::new());
        let engine = test_engine(mock.clone());
        let detector = detector(engine.clone());

        detector.on_host_event(&HostEvent::Navigation {
            url: "https://acs.bank.example/3dsecure/return?status=pending".into(),
        });

        assert!(!engine.is_terminal());
        assert_eq!(mock.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn test_cancellation_url_settles_cancelled() {
        let mock = Arc::new(MockStatusLookup::new());
        let engine = test_engine(mock.clone());
        let detector = detector(engine.clone());

        detector.on_host_event(&HostEvent::Navigation {
            url: "https://pg.example/cancel?txn=T1".into(),
        });

        let mut rx = engine.subscribe();
        while rx.borrow().is_none() {
            rx.changed().await.unwrap();
        }
        let outcome = rx.borrow().clone().unwrap();
        assert_eq!(outcome.status, TerminalStatus::Cancelled);
        assert_eq!(mock.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn test_message_with_status_fields_triggers() {
        let mock = Arc::new(MockStatusLookup::new());
        mock.push_statuses(&["success"]);
        let engine = test_engine(mock.clone());
        let detector = detector(engine.clone());

        detector.on_host_event(&HostEvent::Message {
            body: r#"{"program":"Admin Payment Response","data":{"txn_status":"success"}}"#.into(),
        });

        let mut rx = engine.subscribe();
        while rx.borrow().is_none() {
            rx.changed().await.unwrap();
        }
        assert_eq!(mock.fetch_calls(), 1);
    }

    #[tokio::test]
    async fn test_non_status_message_ignored() {
        let mock = Arc::new(MockStatusLookup::new());
        let engine = test_engine(mock.clone());
        let detector = detector(engine.clone());

        detector.on_host_event(&HostEvent::Message { body: "not json".into() });
        detector.on_host_event(&HostEvent::Message { body: r#"{"page":"loaded"}"#.into() });
        assert_eq!(mock.fetch_calls(), 0);
    }

    /// Scenario D across trigger sources: a navigation signal and the
    /// fallback timer both fire, one sequence runs.
    #[tokio::test(start_paused = true)]
    async fn test_fallback_and_signal_start_one_sequence() {
        let mock = Arc::new(MockStatusLookup::new());
        mock.push_statuses(&["in_progress", "success"]);
        let engine = test_engine(mock.clone());
        let detector = detector(engine.clone());

        let fallback = detector.arm_fallback(Duration::from_secs(30));
        detector.on_host_event(&HostEvent::Navigation {
            url: "https://crm.example.com/tp/pg/response.php".into(),
        });

        let mut rx = engine.subscribe();
        while rx.borrow().is_none() {
            rx.changed().await.unwrap();
        }
        fallback.await.unwrap();

        // One lookup sequence: the pending response plus its retry
        assert_eq!(mock.fetch_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_fires_when_idle() {
        let mock = Arc::new(MockStatusLookup::new());
        mock.push_statuses(&["success"]);
        let engine = test_engine(mock.clone());
        let detector = detector(engine.clone());

        let fallback = detector.arm_fallback(FALLBACK_TIMEOUT);
        fallback.await.unwrap();

        let mut rx = engine.subscribe();
        while rx.borrow().is_none() {
            rx.changed().await.unwrap();
        }
        assert_eq!(mock.fetch_calls(), 1);
    }
}
