//! Target Discovery - which sessions are alive right now

use crate::konsole::TerminalBus;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// One addressable session at the time of discovery
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionTarget {
    pub instance_id: u32,
    pub session: String,
}

impl fmt::Display for SessionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.instance_id, self.session)
    }
}

/// Enumerate every session of every running instance.
///
/// An instance that errors or does not answer within `budget` contributes no
/// sessions; the others are unaffected. Nothing here is fatal.
pub async fn list_targets(bus: &dyn TerminalBus, budget: Duration) -> Vec<SessionTarget> {
    let pids = match tokio::time::timeout(budget, bus.list_instances()).await {
        Ok(Ok(pids)) => pids,
        Ok(Err(e)) => {
            warn!("Could not enumerate terminal instances: {}", e);
            return Vec::new();
        }
        Err(_) => {
            warn!("Enumerating terminal instances timed out");
            return Vec::new();
        }
    };

    let mut targets = Vec::new();
    for pid in pids {
        match tokio::time::timeout(budget, bus.list_sessions(pid)).await {
            Ok(Ok(sessions)) => {
                debug!("Instance {} has {} session(s)", pid, sessions.len());
                targets.extend(sessions.into_iter().map(|session| SessionTarget {
                    instance_id: pid,
                    session,
                }));
            }
            Ok(Err(e)) => debug!("Instance {} skipped: {}", pid, e),
            Err(_) => debug!("Instance {} skipped: no answer within {:?}", pid, budget),
        }
    }

    targets
}
