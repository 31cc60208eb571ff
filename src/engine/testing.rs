//! In-memory test doubles for the engine's two I/O seams.

use crate::engine::ChatState;
use crate::gateway::{AnalysisGateway, GatewayError, Submission, SubmissionStatus};
use crate::store::{SessionStore, StoreError, StoreResult};
use crate::text::Locator;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Session store backed by hash maps, with a switch to simulate outages.
#[derive(Default)]
pub struct MemorySessionStore {
    states: Mutex<HashMap<String, ChatState>>,
    attrs: Mutex<HashMap<(String, String), String>>,
    failing: AtomicBool,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every operation fails as if the store were unreachable.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("simulated outage".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get_state(&self, user: &str) -> StoreResult<ChatState> {
        self.check()?;
        Ok(self
            .states
            .lock()
            .unwrap()
            .get(user)
            .copied()
            .unwrap_or_default())
    }

    async fn set_state(&self, user: &str, state: ChatState) -> StoreResult<()> {
        self.check()?;
        self.states.lock().unwrap().insert(user.to_string(), state);
        Ok(())
    }

    async fn delete_state(&self, user: &str) -> StoreResult<()> {
        self.check()?;
        self.states.lock().unwrap().remove(user);
        Ok(())
    }

    async fn get_attr(&self, user: &str, key: &str) -> StoreResult<Option<String>> {
        self.check()?;
        Ok(self
            .attrs
            .lock()
            .unwrap()
            .get(&(user.to_string(), key.to_string()))
            .cloned())
    }

    async fn set_attr(&self, user: &str, key: &str, value: &str) -> StoreResult<()> {
        self.check()?;
        self.attrs
            .lock()
            .unwrap()
            .insert((user.to_string(), key.to_string()), value.to_string());
        Ok(())
    }

    async fn delete_attr(&self, user: &str, key: &str) -> StoreResult<()> {
        self.check()?;
        self.attrs
            .lock()
            .unwrap()
            .remove(&(user.to_string(), key.to_string()));
        Ok(())
    }
}

pub fn accepted_submission(id: &str, user: &str, locator: &str) -> Submission {
    Submission {
        id: id.to_string(),
        user: user.to_string(),
        locator: locator.to_string(),
        status: SubmissionStatus::Queued,
        report: None,
        created_at: None,
        updated_at: None,
    }
}

/// Scripted gateway: records calls, plays back queued responses.
#[derive(Default)]
pub struct StubGateway {
    /// (user, locator) per fixed submit
    pub fixed_calls: Mutex<Vec<(String, String)>>,
    /// user per auto submit
    pub auto_calls: Mutex<Vec<String>>,
    /// queued submit outcomes; empty queue answers with a fresh submission
    pub submit_results: Mutex<VecDeque<Result<Submission, GatewayError>>>,
    pub get_result: Mutex<Option<Result<Submission, GatewayError>>>,
    pub list_result: Mutex<Option<Result<Vec<Submission>, GatewayError>>>,
    /// artificial latency before every submit answers
    pub submit_delay: Option<Duration>,
}

impl StubGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_submit(&self, result: Result<Submission, GatewayError>) {
        self.submit_results.lock().unwrap().push_back(result);
    }

    fn next_submit(&self, user: &str, locator: &str) -> Result<Submission, GatewayError> {
        self.submit_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(accepted_submission("sub-1", user, locator)))
    }
}

#[async_trait]
impl AnalysisGateway for StubGateway {
    async fn submit_fixed(
        &self,
        user: &str,
        locator: Locator,
        _media: Vec<u8>,
    ) -> Result<Submission, GatewayError> {
        if let Some(delay) = self.submit_delay {
            tokio::time::sleep(delay).await;
        }
        self.fixed_calls
            .lock()
            .unwrap()
            .push((user.to_string(), locator.to_string()));
        self.next_submit(user, &locator.to_string())
    }

    async fn submit_auto(
        &self,
        user: &str,
        _media: Vec<u8>,
        _hint: Option<Locator>,
        _min_similarity: Option<f64>,
    ) -> Result<Submission, GatewayError> {
        if let Some(delay) = self.submit_delay {
            tokio::time::sleep(delay).await;
        }
        self.auto_calls.lock().unwrap().push(user.to_string());
        self.next_submit(user, "")
    }

    async fn get(&self, user: &str, submission_id: &str) -> Result<Submission, GatewayError> {
        self.get_result
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok(accepted_submission(submission_id, user, "001001")))
    }

    async fn list(&self, user: &str, _limit: usize) -> Result<Vec<Submission>, GatewayError> {
        self.list_result
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok(vec![accepted_submission("sub-1", user, "001001")]))
    }
}
