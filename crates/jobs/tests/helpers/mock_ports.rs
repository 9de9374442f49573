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
        scenario: "crowdsecurity/ssh-bf".to_string(),
        action: Action::Ban,
        id: "7".to_string(),
        duration: "1h".to_string(),
    }
}

pub struct MockDecisionFeed {
    added: Arc<Mutex<Vec<Decision>>>,
    deleted: Arc<Mutex<Vec<Decision>>>,
    running: Arc<AtomicBool>,
    run_calls: Arc<AtomicU64>,
}

impl MockDecisionFeed {
    pub fn new() -> Self {
        Self {
            added: Arc::new(Mutex::new(Vec::new())),
            deleted: Arc::new(Mutex::new(Vec::new())),
            running: Arc::new(AtomicBool::new(false)),
            run_calls: Arc::new(AtomicU64::new(0)),
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

    pub fn run_calls(&self) -> u64 {
        self.run_calls.load(Ordering::Relaxed)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

#[async_trait]
impl DecisionFeed for MockDecisionFeed {
    async fn precheck(&self) -> Result<(), BouncerError> {
        Ok(())
    }

    async fn run(&self) {
        self.run_calls.fetch_add(1, Ordering::Relaxed);
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

pub struct MockBackend {
    name: String,
    applied: Arc<Mutex<Vec<BanList>>>,
    fail_apply: AtomicBool,
}

impl MockBackend {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            applied: Arc::new(Mutex::new(Vec::new())),
            fail_apply: AtomicBool::new(false),
        }
    }

    pub async fn apply_count(&self) -> usize {
        self.applied.lock().await.len()
    }

    pub async fn last_applied(&self) -> Option<BanList> {
        self.applied.lock().await.last().cloned()
    }

    pub fn set_fail_apply(&self, fail: bool) {
        self.fail_apply.store(fail, Ordering::Relaxed);
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn precheck(&self) -> Result<(), BouncerError> {
        Ok(())
    }

    async fn apply(&self, ban_list: &BanList) -> Result<bool, BouncerError> {
        if self.fail_apply.load(Ordering::Relaxed) {
            return Err(BouncerError::TransientRemote("HTTP 502".to_string()));
        }
        self.applied.lock().await.push(ban_list.clone());
        Ok(true)
    }
}
