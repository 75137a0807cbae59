//! Mock Status Lookup
//!
//! For testing and demo purposes. Plays back scripted response sequences
//! and counts calls so tests can assert on retry behavior.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use selfcare_core::{ReconError, Result};

use super::{LookupRequest, StatusLookup};

/// Scripted status lookup for tests
#[derive(Default)]
pub struct MockStatusLookup {
    responses: Mutex<VecDeque<Result<Value>>>,
    verifications: Mutex<VecDeque<Result<String>>>,
    fetch_calls: AtomicUsize,
    verify_calls: AtomicUsize,
}

impl MockStatusLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a status response
    pub fn push_response(&self, response: Result<Value>) {
        self.responses.lock().unwrap().push_back(response);
    }

    /// Queue a sequence of raw status strings as bare-string payloads
    pub fn push_statuses(&self, statuses: &[&str]) {
        let mut queue = self.responses.lock().unwrap();
        for status in statuses {
            queue.push_back(Ok(Value::String((*status).to_string())));
        }
    }

    /// Queue a verification response
    pub fn push_verification(&self, response: Result<String>) {
        self.verifications.lock().unwrap().push_back(response);
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusLookup for MockStatusLookup {
    async fn fetch_status(&self, _request: &LookupRequest) -> Result<Value> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ReconError::Lookup("mock response queue empty".into())))
    }

    async fn verify_status(&self, _request: &LookupRequest) -> Result<String> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.verifications
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ReconError::Lookup("mock verification queue empty".into())))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_plays_back_in_order() {
        let mock = MockStatusLookup::new();
        mock.push_response(Ok(json!({"data": {"txn_status": "pending"}})));
        mock.push_statuses(&["success"]);

        let request = LookupRequest::new("user1", "T1", "realm1");
        let first = mock.fetch_status(&request).await.unwrap();
        assert_eq!(first["data"]["txn_status"], "pending");

        let second = mock.fetch_status(&request).await.unwrap();
        assert_eq!(second, Value::String("success".into()));

        assert_eq!(mock.fetch_calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_queue_errors() {
        let mock = MockStatusLookup::new();
        let request = LookupRequest::new("user1", "T1", "realm1");
        assert!(mock.fetch_status(&request).await.is_err());
    }
}
