//! Konsole IPC - process enumeration and per-session DBus calls
//!
//! Every running Konsole registers `org.kde.konsole-<pid>` on the session
//! bus and exposes its sessions as `/Sessions/<n>`.

use crate::command;
use async_trait::async_trait;
use std::time::Duration;
use themer_common::{ProfileName, TerminalConfig, ThemerResult};

/// IPC surface of a terminal application family
#[async_trait]
pub trait TerminalBus: Send + Sync {
    /// Pids of running instances. No instances is an empty list.
    async fn list_instances(&self) -> ThemerResult<Vec<u32>>;

    /// Session object paths of one instance
    async fn list_sessions(&self, pid: u32) -> ThemerResult<Vec<String>>;

    /// Set `profile` on one session
    async fn set_profile(&self, pid: u32, session: &str, profile: &ProfileName) -> ThemerResult<()>;
}

/// Talks to Konsole through `pgrep` and `qdbus`
pub struct QdbusKonsoleBus {
    process_name: String,
    qdbus: String,
    service_prefix: String,
    sessions_path: String,
    timeout: Duration,
}

impl QdbusKonsoleBus {
    pub fn new(config: &TerminalConfig) -> Self {
        Self {
            process_name: config.process_name.clone(),
            qdbus: config.qdbus.clone(),
            service_prefix: config.service_prefix.clone(),
            sessions_path: config.sessions_path.clone(),
            timeout: Duration::from_secs(config.ipc_timeout_secs),
        }
    }

    pub fn service_name(&self, pid: u32) -> String {
        format!("{}{}", self.service_prefix, pid)
    }
}

#[async_trait]
impl TerminalBus for QdbusKonsoleBus {
    async fn list_instances(&self) -> ThemerResult<Vec<u32>> {
        let output = command::run("pgrep", &["-x", &self.process_name], self.timeout).await?;
        // pgrep exits 1 when nothing matched
        if !output.success {
            return Ok(Vec::new());
        }
        Ok(parse_pids(&output.stdout))
    }

    async fn list_sessions(&self, pid: u32) -> ThemerResult<Vec<String>> {
        let service = self.service_name(pid);
        let out = command::run_checked(&self.qdbus, &[&service, &self.sessions_path], self.timeout).await?;
        Ok(parse_sessions(&out, &self.sessions_path))
    }

    async fn set_profile(&self, pid: u32, session: &str, profile: &ProfileName) -> ThemerResult<()> {
        let service = self.service_name(pid);
        command::run_checked(
            &self.qdbus,
            &[&service, session, "setProfile", profile.as_str()],
            self.timeout,
        )
        .await?;
        Ok(())
    }
}

fn parse_pids(stdout: &str) -> Vec<u32> {
    stdout
        .lines()
        .filter_map(|line| line.trim().parse::<u32>().ok())
        .collect()
}

/// Keep only `<sessions_path>/<n>` lines from a qdbus object listing
fn parse_sessions(stdout: &str, sessions_path: &str) -> Vec<String> {
    let prefix = format!("{}/", sessions_path.trim_end_matches('/'));
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with(&prefix) && line.len() > prefix.len())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pids() {
        assert_eq!(parse_pids("1234\n5678\n"), vec![1234, 5678]);
        assert_eq!(parse_pids(""), Vec::<u32>::new());
        assert_eq!(parse_pids("12\ngarbage\n\n34"), vec![12, 34]);
    }

    #[test]
    fn test_parse_sessions_keeps_session_paths() {
        let listing = "/\n/Sessions\n/Sessions/1\n/Sessions/2\n/Windows/1\n";
        assert_eq!(
            parse_sessions(listing, "/Sessions"),
            vec!["/Sessions/1".to_string(), "/Sessions/2".to_string()]
        );
    }

    #[test]
    fn test_parse_sessions_tolerates_trailing_slash() {
        assert_eq!(parse_sessions("/Sessions/7\n", "/Sessions/"), vec!["/Sessions/7".to_string()]);
    }

    #[test]
    fn test_service_name() {
        let bus = QdbusKonsoleBus::new(&TerminalConfig::default());
        assert_eq!(bus.service_name(4242), "org.kde.konsole-4242");
    }

    #[tokio::test]
    async fn test_unknown_process_has_no_instances() {
        let config = TerminalConfig {
            process_name: "no-such-terminal-xyz".to_string(),
            ..TerminalConfig::default()
        };
        let bus = QdbusKonsoleBus::new(&config);
        // pgrep may be absent in minimal environments; then it is a spawn error
        if let Ok(pids) = bus.list_instances().await {
            assert!(pids.is_empty());
        }
    }
}
