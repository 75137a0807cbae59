//! Client Configuration
//!
//! Per-deployment settings for the self-care API: the realm (client id
//! on the billing system), the API base URL, and the request timeout.

use std::time::Duration;

use crate::error::{ReconError, Result};

/// Self-care client configuration
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Billing realm / client identifier
    pub realm: String,

    /// Base URL of the self-care API
    pub api_base: String,

    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            realm: "selfcare".into(),
            api_base: "https://crm.example.com/l2s/api".into(),
            timeout: Duration::from_secs(6),
        }
    }
}

impl ClientConfig {
    /// Create from environment variables.
    ///
    /// `SELFCARE_REALM` and `SELFCARE_API_BASE` are required;
    /// `SELFCARE_TIMEOUT_SECS` is optional.
    pub fn from_env() -> Result<Self> {
        let realm = std::env::var("SELFCARE_REALM")
            .map_err(|_| ReconError::Config("SELFCARE_REALM not set".into()))?;
        let api_base = std::env::var("SELFCARE_API_BASE")
            .map_err(|_| ReconError::Config("SELFCARE_API_BASE not set".into()))?;
        let timeout_secs = std::env::var("SELFCARE_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(6);

        Ok(Self {
            realm,
            api_base,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(6));
        assert!(!config.realm.is_empty());
    }
}
