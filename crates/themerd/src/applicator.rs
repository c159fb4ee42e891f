//! Profile Applicator - one session at a time, plus the persisted default

use crate::command;
use crate::discovery::SessionTarget;
use crate::konsole::TerminalBus;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use themer_common::{DefaultProfileConfig, ProfileName, ThemerResult};
use tracing::{debug, info, warn};

/// Persists the profile new terminal windows start with
#[async_trait]
pub trait DefaultProfileStore: Send + Sync {
    async fn set_default(&self, profile: &ProfileName) -> ThemerResult<()>;
}

/// Writes `DefaultProfile=<name>.profile` into konsolerc via kwriteconfig
pub struct KwriteconfigStore {
    writer: String,
    file: PathBuf,
    group: String,
    key: String,
    suffix: String,
    timeout: Duration,
}

impl KwriteconfigStore {
    pub fn new(config: &DefaultProfileConfig, timeout: Duration) -> Self {
        Self {
            writer: config.writer.clone(),
            file: config.file.clone(),
            group: config.group.clone(),
            key: config.key.clone(),
            suffix: config.suffix.clone(),
            timeout,
        }
    }

    /// Value in the format Konsole expects, e.g. `Dark.profile`
    pub fn entry_value(&self, profile: &ProfileName) -> String {
        format!("{}{}", profile, self.suffix)
    }
}

#[async_trait]
impl DefaultProfileStore for KwriteconfigStore {
    async fn set_default(&self, profile: &ProfileName) -> ThemerResult<()> {
        let file = self.file.to_string_lossy().into_owned();
        let value = self.entry_value(profile);
        command::run_checked(
            &self.writer,
            &["--file", &file, "--group", &self.group, "--key", &self.key, &value],
            self.timeout,
        )
        .await?;
        Ok(())
    }
}

/// Applies profiles to sessions. No retries at this layer.
pub struct ProfileApplicator {
    bus: Arc<dyn TerminalBus>,
    store: Arc<dyn DefaultProfileStore>,
    budget: Duration,
}

impl ProfileApplicator {
    pub fn new(bus: Arc<dyn TerminalBus>, store: Arc<dyn DefaultProfileStore>, budget: Duration) -> Self {
        Self { bus, store, budget }
    }

    pub fn bus(&self) -> &dyn TerminalBus {
        self.bus.as_ref()
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// True only on a confirmed success. Errors and timeouts are false.
    pub async fn apply(&self, target: &SessionTarget, profile: &ProfileName) -> bool {
        let call = self.bus.set_profile(target.instance_id, &target.session, profile);
        match tokio::time::timeout(self.budget, call).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                debug!("Session {} rejected '{}': {}", target, profile, e);
                false
            }
            Err(_) => {
                debug!("Session {} did not answer within {:?}", target, self.budget);
                false
            }
        }
    }

    /// Best effort: a failure is logged and otherwise ignored
    pub async fn persist_default(&self, profile: &ProfileName) {
        match tokio::time::timeout(self.budget, self.store.set_default(profile)).await {
            Ok(Ok(())) => info!("Default profile for new sessions set to '{}'", profile),
            Ok(Err(e)) => warn!("Failed to persist default profile '{}': {}", profile, e),
            Err(_) => warn!("Persisting default profile '{}' timed out", profile),
        }
    }
}
