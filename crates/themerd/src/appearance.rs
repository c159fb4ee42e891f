//! Mode Resolver - maps the desktop colour scheme to a terminal profile
//!
//! The scheme identifier comes from an [`AppearanceSource`]; production code
//! reads it with `kreadconfig6`, tests use a fixed string.

use crate::command;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use themer_common::{AppearanceConfig, AppearanceMode, ModeClassifier, ProfileMap, ProfileName, ThemerResult};
use tracing::{debug, warn};

/// Reads the desktop's current colour-scheme identifier
#[async_trait]
pub trait AppearanceSource: Send + Sync {
    async fn color_scheme(&self) -> ThemerResult<String>;
}

/// Reads `[General] ColorScheme` from kdeglobals through kreadconfig
pub struct KreadconfigSource {
    reader: String,
    group: String,
    key: String,
    timeout: Duration,
}

impl KreadconfigSource {
    pub fn new(config: &AppearanceConfig, timeout: Duration) -> Self {
        Self {
            reader: config.reader.clone(),
            group: config.group.clone(),
            key: config.key.clone(),
            timeout,
        }
    }
}

#[async_trait]
impl AppearanceSource for KreadconfigSource {
    async fn color_scheme(&self) -> ThemerResult<String> {
        let out = command::run_checked(
            &self.reader,
            &["--group", &self.group, "--key", &self.key],
            self.timeout,
        )
        .await?;
        Ok(out.trim().to_string())
    }
}

/// What the resolver saw and decided
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Empty when the source failed
    pub scheme: String,
    pub mode: AppearanceMode,
    pub profile: ProfileName,
}

pub struct ModeResolver {
    source: Arc<dyn AppearanceSource>,
    classifier: ModeClassifier,
    profiles: ProfileMap,
}

impl ModeResolver {
    pub fn new(source: Arc<dyn AppearanceSource>, classifier: ModeClassifier, profiles: ProfileMap) -> Self {
        Self {
            source,
            classifier,
            profiles,
        }
    }

    /// Target profile for the current appearance. Never fails: an unreadable
    /// scheme counts as unknown, which is light.
    pub async fn resolve(&self) -> ProfileName {
        self.resolve_detailed().await.profile
    }

    pub async fn resolve_detailed(&self) -> Resolution {
        let scheme = match self.source.color_scheme().await {
            Ok(scheme) => scheme,
            Err(e) => {
                warn!("Could not read colour scheme, assuming light: {}", e);
                String::new()
            }
        };
        let mode = self.classifier.classify(&scheme);
        let profile = self.profiles.profile_for(mode).clone();
        debug!("Colour scheme '{}' is {} -> profile '{}'", scheme, mode, profile);

        Resolution { scheme, mode, profile }
    }
}
