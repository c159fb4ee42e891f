//! Fake collaborators shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use themer_common::{ModeClassifier, ProfileMap, ProfileName, ThemerError, ThemerResult};
use themerd::applicator::{DefaultProfileStore, ProfileApplicator};
use themerd::appearance::{AppearanceSource, ModeResolver};
use themerd::konsole::TerminalBus;
use themerd::reconcile::Reconciler;

/// Per-call budget used by the tests
pub const BUDGET: Duration = Duration::from_millis(200);

fn failed(program: &str) -> ThemerError {
    ThemerError::CommandFailed {
        program: program.to_string(),
        status: "status 1".to_string(),
        stderr: "simulated failure".to_string(),
    }
}

/// In-memory Konsole: instances, their sessions, and scripted failures
#[derive(Default)]
pub struct FakeBus {
    pub instances: Vec<u32>,
    pub sessions: HashMap<u32, Vec<String>>,
    /// Instances whose session listing errors
    pub unresponsive: HashSet<u32>,
    /// Instances whose session listing never returns
    pub hanging: HashSet<u32>,
    /// `pid:/Sessions/n` keys that reject setProfile
    pub rejecting: HashSet<String>,
    /// `pid:/Sessions/n` keys whose setProfile never returns
    pub stalling: HashSet<String>,
    pub enumeration_fails: bool,
    calls: Mutex<Vec<(u32, String, String)>>,
}

impl FakeBus {
    /// `count` instances with pids 100, 101, .. and `per_instance` sessions each
    pub fn with_instances(count: u32, per_instance: u32) -> Self {
        let mut bus = FakeBus::default();
        for i in 0..count {
            let pid = 100 + i;
            bus.instances.push(pid);
            bus.sessions.insert(
                pid,
                (1..=per_instance).map(|n| format!("/Sessions/{}", n)).collect(),
            );
        }
        bus
    }

    pub fn calls(&self) -> Vec<(u32, String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

pub fn key(pid: u32, session: &str) -> String {
    format!("{}:{}", pid, session)
}

#[async_trait]
impl TerminalBus for FakeBus {
    async fn list_instances(&self) -> ThemerResult<Vec<u32>> {
        if self.enumeration_fails {
            return Err(failed("pgrep"));
        }
        Ok(self.instances.clone())
    }

    async fn list_sessions(&self, pid: u32) -> ThemerResult<Vec<String>> {
        if self.hanging.contains(&pid) {
            std::future::pending::<()>().await;
        }
        if self.unresponsive.contains(&pid) {
            return Err(failed("qdbus-qt6"));
        }
        Ok(self.sessions.get(&pid).cloned().unwrap_or_default())
    }

    async fn set_profile(&self, pid: u32, session: &str, profile: &ProfileName) -> ThemerResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push((pid, session.to_string(), profile.to_string()));

        let key = key(pid, session);
        if self.stalling.contains(&key) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if self.rejecting.contains(&key) {
            return Err(failed("qdbus-qt6"));
        }
        Ok(())
    }
}

/// Records every persisted default
#[derive(Default)]
pub struct FakeStore {
    pub fails: bool,
    writes: Mutex<Vec<String>>,
}

impl FakeStore {
    pub fn failing() -> Self {
        Self {
            fails: true,
            ..Self::default()
        }
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl DefaultProfileStore for FakeStore {
    async fn set_default(&self, profile: &ProfileName) -> ThemerResult<()> {
        self.writes.lock().unwrap().push(profile.to_string());
        if self.fails {
            return Err(failed("kwriteconfig6"));
        }
        Ok(())
    }
}

/// Colour scheme that answers from a script, then keeps its last answer
pub struct ScriptedScheme {
    script: Mutex<(VecDeque<String>, String)>,
    reads: AtomicUsize,
}

impl ScriptedScheme {
    pub fn fixed(scheme: &str) -> Self {
        Self::script(&[scheme])
    }

    pub fn script(answers: &[&str]) -> Self {
        let queue: VecDeque<String> = answers.iter().map(|s| s.to_string()).collect();
        Self {
            script: Mutex::new((queue, String::new())),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, scheme: &str) {
        let mut script = self.script.lock().unwrap();
        script.0.clear();
        script.1 = scheme.to_string();
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AppearanceSource for ScriptedScheme {
    async fn color_scheme(&self) -> ThemerResult<String> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        if let Some(next) = script.0.pop_front() {
            script.1 = next;
        }
        Ok(script.1.clone())
    }
}

pub fn reconciler(bus: Arc<FakeBus>, store: Arc<FakeStore>) -> Reconciler {
    Reconciler::new(Arc::new(ProfileApplicator::new(bus, store, BUDGET)))
}

pub fn resolver(scheme: Arc<ScriptedScheme>) -> ModeResolver {
    ModeResolver::new(scheme, ModeClassifier::default(), ProfileMap::default())
}
