#![allow(dead_code)]

use async_trait::async_trait;
use edge_bouncer_application::ports::{Backend, DecisionFeed};
use edge_bouncer_domain::{Action, BanList, BouncerError, Decision, Scope};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

pub fn make_decision(value: &str) -> Decision {
    Decision {
        value: value.to_string(),
        scope: Scope::Ip,
        origin: "crowdsec".to_string(),
        scenario: "crowdsecurity/http-probing".to_string(),
        action: Action::Ban,
        id: "42".to_string(),
        duration: "4h".to_string(),
    }
}

// ============================================================================
// Mock DecisionFeed
// ============================================================================

pub struct MockDecisionFeed {
    added: Arc<Mutex<Vec<Decision>>>,
    deleted: Arc<Mutex<Vec<Decision>>>,
    running: AtomicBool,
    precheck_calls: AtomicU64,
    fail_precheck: AtomicBool,
}

impl MockDecisionFeed {
    pub fn new() -> Self {
        Self {
            added: Arc::new(Mutex::new(Vec::new())),
            deleted: Arc::new(Mutex::new(Vec::new())),
            running: AtomicBool::new(false),
            precheck_calls: AtomicU64::new(0),
            fail_precheck: AtomicBool::new(false),
        }
    }

    pub async fn queue_added(&self, values: &[&str]) {
        let mut added = self.added.lock().await;
        added.extend(values.iter().map(|v| make_decision(v)));
    }

    pub async fn queue_deleted(&self, values: &[&str]) {
        let mut deleted = self.deleted.lock().await;
        deleted.extend(values.iter().map(|v| make_decision(v)));
    }

    pub fn precheck_calls(&self) -> u64 {
        self.precheck_calls.load(Ordering::Relaxed)
    }

    pub fn set_fail_precheck(&self, fail: bool) {
        self.fail_precheck.store(fail, Ordering::Relaxed);
    }
}

#[async_trait]
impl DecisionFeed for MockDecisionFeed {
    async fn precheck(&self) -> Result<(), BouncerError> {
        self.precheck_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_precheck.load(Ordering::Relaxed) {
            return Err(BouncerError::Feed("api key rejected".to_string()));
        }
        Ok(())
    }

    async fn run(&self) {
        self.running.store(true, Ordering::Relaxed);
    }

    async fn drain_added(&self) -> Vec<Decision> {
        std::mem::take(&mut *self.added.lock().await)
    }

    async fn drain_deleted(&self) -> Vec<Decision> {
        std::mem::take(&mut *self.deleted.lock().await)
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

// ============================================================================
// Mock Backend
// ============================================================================

pub struct MockBackend {
    name: String,
    applied: Arc<Mutex<Vec<BanList>>>,
    precheck_calls: AtomicU64,
    fail_apply: AtomicBool,
    fail_precheck: AtomicBool,
}

impl MockBackend {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            applied: Arc::new(Mutex::new(Vec::new())),
            precheck_calls: AtomicU64::new(0),
            fail_apply: AtomicBool::new(false),
            fail_precheck: AtomicBool::new(false),
        }
    }

    pub async fn applied(&self) -> Vec<BanList> {
        self.applied.lock().await.clone()
    }

    pub async fn apply_count(&self) -> usize {
        self.applied.lock().await.len()
    }

    pub fn precheck_calls(&self) -> u64 {
        self.precheck_calls.load(Ordering::Relaxed)
    }

    pub fn set_fail_apply(&self, fail: bool) {
        self.fail_apply.store(fail, Ordering::Relaxed);
    }

    pub fn set_fail_precheck(&self, fail: bool) {
        self.fail_precheck.store(fail, Ordering::Relaxed);
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn precheck(&self) -> Result<(), BouncerError> {
        self.precheck_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_precheck.load(Ordering::Relaxed) {
            return Err(BouncerError::Preflight(format!(
                "{}: target not found",
                self.name
            )));
        }
        Ok(())
    }

    async fn apply(&self, ban_list: &BanList) -> Result<bool, BouncerError> {
        if self.fail_apply.load(Ordering::Relaxed) {
            return Err(BouncerError::TransientRemote(
                "HTTP 503 from remote".to_string(),
            ));
        }
        self.applied.lock().await.push(ban_list.clone());
        Ok(true)
    }
}
