//! Reconciliation Engine
//!
//! The state machine that authoritatively confirms a payment outcome via
//! the merchant's status API, independent of whatever the gateway's page
//! appeared to show.
//!
//! States: `Idle -> Polling -> Terminal(Success | Failure | Cancelled)`.
//! The transition into `Terminal` happens at most once per intent: a
//! single-use atomic guard is set synchronously before any side effect
//! runs, so late signals, timers or duplicate lookups are no-ops. At most
//! one lookup is in flight at any time; the next retry is scheduled only
//! after the previous lookup resolves.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use selfcare_core::{
    GATEWAY_PENDING, PaymentIntent, PaymentOutcome, ReconError, ReconciliationState,
    ResponseParser, Result, StatusCategory, StatusPolicy, StatusRecord, TerminalStatus,
    is_cancellation,
};

use crate::lookup::{LookupRequest, StatusLookup};

/// Outcome of one lookup + parse + policy pass
enum Step {
    Terminal(TerminalStatus, StatusRecord),
    Retry(Option<StatusRecord>),
}

/// Per-screen reconciliation state machine
pub struct ReconciliationEngine {
    intent: PaymentIntent,
    policy: StatusPolicy,
    lookup: Arc<dyn StatusLookup>,
    parser: ResponseParser,
    request: LookupRequest,

    /// Set once by the first qualifying trigger
    started: AtomicBool,

    /// Single-use terminal guard; set before any terminal side effect
    settled: AtomicBool,

    state: Mutex<ReconciliationState>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
    outcome_tx: watch::Sender<Option<PaymentOutcome>>,

    /// Back-reference for spawning the polling task from `trigger`
    self_ref: Weak<Self>,
}

impl ReconciliationEngine {
    /// Create an engine for one payment intent.
    ///
    /// Total parse failures default to `Pending` so an unreadable
    /// response is retried rather than misreported.
    pub fn new(
        intent: PaymentIntent,
        policy: StatusPolicy,
        lookup: Arc<dyn StatusLookup>,
        username: impl Into<String>,
        realm: impl Into<String>,
    ) -> Arc<Self> {
        let parser = ResponseParser::new(StatusCategory::Pending);
        Self::with_parser(intent, policy, lookup, username, realm, parser)
    }

    /// Create with a custom response parser
    pub fn with_parser(
        intent: PaymentIntent,
        policy: StatusPolicy,
        lookup: Arc<dyn StatusLookup>,
        username: impl Into<String>,
        realm: impl Into<String>,
        parser: ResponseParser,
    ) -> Arc<Self> {
        let request = LookupRequest::new(username, intent.txn_ref.clone(), realm);
        let (outcome_tx, _) = watch::channel(None);

        Arc::new_cyclic(|me| Self {
            intent,
            policy,
            lookup,
            parser,
            request,
            started: AtomicBool::new(false),
            settled: AtomicBool::new(false),
            state: Mutex::new(ReconciliationState::Idle),
            poll_task: Mutex::new(None),
            outcome_tx,
            self_ref: me.clone(),
        })
    }

    /// Current state snapshot
    pub fn state(&self) -> ReconciliationState {
        *self.state.lock().unwrap()
    }

    pub fn is_terminal(&self) -> bool {
        self.settled.load(Ordering::SeqCst)
    }

    pub fn intent(&self) -> &PaymentIntent {
        &self.intent
    }

    /// Subscribe to the terminal outcome
    pub fn subscribe(&self) -> watch::Receiver<Option<PaymentOutcome>> {
        self.outcome_tx.subscribe()
    }

    /// Start reconciliation.
    ///
    /// Idempotent: the first call spawns the polling task, every later
    /// call (another navigation signal, the fallback timer) is a no-op.
    /// Returns whether this call actually started the sequence.
    pub fn trigger(&self) -> bool {
        if self.settled.load(Ordering::SeqCst) || self.started.swap(true, Ordering::SeqCst) {
            tracing::debug!(txn_ref = %self.intent.txn_ref, "duplicate trigger ignored");
            return false;
        }

        *self.state.lock().unwrap() = ReconciliationState::Polling;
        tracing::info!(
            txn_ref = %self.intent.txn_ref,
            gateway = %self.intent.gateway,
            "starting payment reconciliation"
        );

        let Some(engine) = self.self_ref.upgrade() else {
            return false;
        };
        let handle = tokio::spawn(engine.run());
        *self.poll_task.lock().unwrap() = Some(handle);
        true
    }

    /// Resolve the intent as cancelled without polling.
    ///
    /// Used when the gateway page itself signals cancellation. Goes
    /// through the same single-use guard as every other terminal path.
    pub fn resolve_cancelled(&self, reason: &str) -> bool {
        tracing::info!(txn_ref = %self.intent.txn_ref, %reason, "gateway cancellation signal");
        let record = StatusRecord {
            txn_ref: self.intent.txn_ref.clone(),
            amount: self.intent.amount,
            gateway: self.intent.gateway.clone(),
            raw_status: "cancelled".into(),
            category: StatusCategory::Failure,
            checked_at: chrono::Utc::now(),
        };
        self.settle(TerminalStatus::Cancelled, &record)
    }

    /// One status lookup without retry scheduling, for the manual
    /// "check status" action. Includes the verification path; errors
    /// propagate to the caller.
    pub async fn check_once(&self) -> Result<StatusRecord> {
        if self.intent.txn_ref.is_empty() {
            return Err(ReconError::MissingTransactionRef);
        }

        let payload = self.lookup.fetch_status(&self.request).await?;
        let mut record = self.parser.parse(&payload, &self.intent);

        if self.policy.requires_pre_success_verification
            && record.normalized_raw() == GATEWAY_PENDING
        {
            let verified = self.lookup.verify_status(&self.request).await?;
            if is_verified_success(&verified) {
                record.raw_status = verified;
                record.category = StatusCategory::Success;
            }
        }

        Ok(record)
    }

    /// Abort the polling task. Called when the hosting screen unmounts so
    /// no orphaned retry fires against a disposed intent.
    pub fn shutdown(&self) {
        if let Some(handle) = self.poll_task.lock().unwrap().take() {
            handle.abort();
            tracing::debug!(txn_ref = %self.intent.txn_ref, "polling task aborted");
        }
    }

    async fn run(self: Arc<Self>) {
        let mut attempts = 0usize;
        let mut last_record: Option<StatusRecord> = None;

        loop {
            if self.settled.load(Ordering::SeqCst) {
                return;
            }

            attempts += 1;
            match self.step().await {
                Step::Terminal(status, record) => {
                    self.settle(status, &record);
                    return;
                }
                Step::Retry(record) => {
                    if record.is_some() {
                        last_record = record;
                    }
                }
            }

            if let Some(max) = self.policy.max_attempts {
                if attempts >= max {
                    tracing::warn!(
                        txn_ref = %self.intent.txn_ref,
                        attempts,
                        "lookup attempts exhausted, settling as failure"
                    );
                    let record = last_record.unwrap_or_else(|| StatusRecord {
                        txn_ref: self.intent.txn_ref.clone(),
                        amount: self.intent.amount,
                        gateway: self.intent.gateway.clone(),
                        raw_status: String::new(),
                        category: StatusCategory::Unknown,
                        checked_at: chrono::Utc::now(),
                    });
                    self.settle(TerminalStatus::Failure, &record);
                    return;
                }
            }

            tokio::time::sleep(self.policy.poll_interval).await;
        }
    }

    async fn step(&self) -> Step {
        let payload = match self.lookup.fetch_status(&self.request).await {
            Ok(payload) => payload,
            Err(e) => {
                // Lookup failures are never terminal on their own
                tracing::warn!(
                    txn_ref = %self.intent.txn_ref,
                    error = %e,
                    "status lookup failed, will retry"
                );
                return Step::Retry(None);
            }
        };

        let record = self.parser.parse(&payload, &self.intent);
        tracing::debug!(
            txn_ref = %record.txn_ref,
            raw = %record.raw_status,
            category = %record.category,
            "status lookup result"
        );
        self.apply_policy(record).await
    }

    async fn apply_policy(&self, record: StatusRecord) -> Step {
        let raw = record.normalized_raw();

        // The ambiguous gateway-pending value: on platforms that require
        // it, one verification call may confirm success early.
        if self.policy.requires_pre_success_verification && raw == GATEWAY_PENDING {
            return match self.lookup.verify_status(&self.request).await {
                Ok(verified) if is_verified_success(&verified) => {
                    let mut record = record;
                    record.raw_status = verified;
                    record.category = StatusCategory::Success;
                    Step::Terminal(TerminalStatus::Success, record)
                }
                Ok(verified) => {
                    tracing::debug!(%verified, "verification inconclusive, will retry");
                    Step::Retry(Some(record))
                }
                Err(e) => {
                    tracing::warn!(error = %e, "verification lookup failed, will retry");
                    Step::Retry(Some(record))
                }
            };
        }

        if self.policy.is_pending(&raw) {
            return Step::Retry(Some(record));
        }

        match record.category {
            StatusCategory::Success => Step::Terminal(TerminalStatus::Success, record),
            StatusCategory::Failure => {
                let status = if is_cancellation(&raw) {
                    TerminalStatus::Cancelled
                } else {
                    TerminalStatus::Failure
                };
                Step::Terminal(status, record)
            }
            // Unknown statuses are treated as pending, never as failure
            StatusCategory::Pending | StatusCategory::Unknown => Step::Retry(Some(record)),
        }
    }

    /// Transition into `Terminal`. The guard is set before the outcome is
    /// published, so a concurrent settle attempt loses cleanly.
    fn settle(&self, status: TerminalStatus, record: &StatusRecord) -> bool {
        if self.settled.swap(true, Ordering::SeqCst) {
            tracing::debug!(txn_ref = %self.intent.txn_ref, "already terminal, settle ignored");
            return false;
        }

        *self.state.lock().unwrap() = ReconciliationState::Terminal(status);

        let outcome = PaymentOutcome {
            txn_ref: record.txn_ref.clone(),
            checkout_source: self.intent.checkout_source.clone(),
            gateway: record.gateway.clone(),
            amount: record.amount,
            status,
            raw_status: record.raw_status.clone(),
        };

        tracing::info!(
            txn_ref = %outcome.txn_ref,
            status = %status,
            raw = %outcome.raw_status,
            "payment reconciliation terminal"
        );
        let _ = self.outcome_tx.send(Some(outcome));
        true
    }
}

fn is_verified_success(verified: &str) -> bool {
    matches!(verified.trim().to_lowercase().as_str(), "success" | "completed")
}
