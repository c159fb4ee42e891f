//! Reconciliation - bring every live session and the default in line with
//! one profile
//!
//! One pass = discover targets once, apply to all of them concurrently, wait
//! for every apply, then persist the default exactly once. Sessions are
//! independent: a failure is a count, never an abort.

use crate::applicator::ProfileApplicator;
use crate::discovery;
use std::fmt;
use std::sync::Arc;
use themer_common::ProfileName;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Result of one reconciliation pass, for reporting only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationOutcome {
    pub profile: ProfileName,
    pub targets_attempted: usize,
    pub targets_succeeded: usize,
}

impl ReconciliationOutcome {
    pub fn targets_failed(&self) -> usize {
        self.targets_attempted - self.targets_succeeded
    }

    pub fn is_complete(&self) -> bool {
        self.targets_succeeded == self.targets_attempted
    }
}

impl fmt::Display for ReconciliationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Switched {}/{} Konsole session(s) to '{}' profile",
            self.targets_succeeded, self.targets_attempted, self.profile
        )
    }
}

pub struct Reconciler {
    applicator: Arc<ProfileApplicator>,
}

impl Reconciler {
    pub fn new(applicator: Arc<ProfileApplicator>) -> Self {
        Self { applicator }
    }

    pub fn applicator(&self) -> &ProfileApplicator {
        &self.applicator
    }

    /// Apply `profile` everywhere. Partial failure is a normal outcome.
    pub async fn reconcile(&self, profile: &ProfileName) -> ReconciliationOutcome {
        let targets = discovery::list_targets(self.applicator.bus(), self.applicator.budget()).await;
        let targets_attempted = targets.len();

        let mut tasks = JoinSet::new();
        for target in targets {
            let applicator = Arc::clone(&self.applicator);
            let profile = profile.clone();
            tasks.spawn(async move { applicator.apply(&target, &profile).await });
        }

        let mut targets_succeeded = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(true) => targets_succeeded += 1,
                Ok(false) => {}
                Err(e) => warn!("Profile task failed: {}", e),
            }
        }

        self.applicator.persist_default(profile).await;

        let outcome = ReconciliationOutcome {
            profile: profile.clone(),
            targets_attempted,
            targets_succeeded,
        };
        info!("{}", outcome);
        outcome
    }
}
