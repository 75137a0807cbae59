//! Status Policy
//!
//! Per-platform reconciliation behavior, selected once at engine
//! construction. The state machine itself stays platform-agnostic; every
//! platform conditional lives here.

use std::time::Duration;

use crate::status::GATEWAY_PENDING;

/// Host platform the client is running on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    Ios,
    Android,
}

impl Platform {
    /// Detect the platform from the build target, defaulting to Android.
    pub fn detect() -> Self {
        if cfg!(target_os = "ios") {
            Platform::Ios
        } else {
            Platform::Android
        }
    }
}

/// Platform-dependent reconciliation policy.
///
/// Immutable after construction.
#[derive(Clone, Debug)]
pub struct StatusPolicy {
    /// Delay between consecutive status lookups
    pub poll_interval: Duration,

    /// Raw statuses that always schedule a retry
    pub pending_statuses: &'static [&'static str],

    /// Whether the ambiguous gateway-pending status requires an extra
    /// verification call before success may be declared
    pub requires_pre_success_verification: bool,

    /// Optional cap on lookup attempts. `None` polls until the screen is
    /// torn down, matching the historical behavior.
    pub max_attempts: Option<usize>,
}

const IOS_PENDING: &[&str] = &["in_progress", "pending", "processing", "new"];
const ANDROID_PENDING: &[&str] = &["in_progress", "pending", "processing", "new", GATEWAY_PENDING];

impl StatusPolicy {
    /// iOS: tight 2 s retry interval; `pg_pending` goes through the
    /// verification lookup instead of the plain pending set.
    pub fn ios() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            pending_statuses: IOS_PENDING,
            requires_pre_success_verification: true,
            max_attempts: None,
        }
    }

    /// Android: 5 s retry interval; `pg_pending` is treated as ordinary
    /// pending and retried under the policy interval.
    pub fn android() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            pending_statuses: ANDROID_PENDING,
            requires_pre_success_verification: false,
            max_attempts: None,
        }
    }

    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Ios => Self::ios(),
            Platform::Android => Self::android(),
        }
    }

    /// Cap the number of lookup attempts
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Whether a (normalized) raw status is in this platform's pending set
    pub fn is_pending(&self, raw: &str) -> bool {
        self.pending_statuses.contains(&raw)
    }
}
