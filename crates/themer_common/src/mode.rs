//! Appearance modes and the profiles they map to
//!
//! The desktop reports a colour-scheme identifier such as `BreezeDark`.
//! [`ModeClassifier`] turns that identifier into an [`AppearanceMode`] and
//! [`ProfileMap`] turns the mode into the terminal profile to apply.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Desktop-wide light/dark setting. Always derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppearanceMode {
    Light,
    Dark,
}

impl fmt::Display for AppearanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppearanceMode::Light => write!(f, "light"),
            AppearanceMode::Dark => write!(f, "dark"),
        }
    }
}

/// Name of a terminal profile, e.g. `Dark`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileName(String);

impl ProfileName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ProfileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProfileName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Keyword heuristic deciding whether a colour scheme is dark.
///
/// Matching is a case-insensitive substring test, so `BreezeDark`,
/// `Nordic` and `MidnightBlack` are all dark with the default keywords.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeClassifier {
    dark_keywords: Vec<String>,
}

impl ModeClassifier {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let dark_keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { dark_keywords }
    }

    /// Classify a colour-scheme identifier. Empty or unrecognised is light.
    pub fn classify(&self, scheme: &str) -> AppearanceMode {
        let scheme = scheme.to_lowercase();
        if self.dark_keywords.iter().any(|k| scheme.contains(k.as_str())) {
            AppearanceMode::Dark
        } else {
            AppearanceMode::Light
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.dark_keywords
    }
}

impl Default for ModeClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_DARK_KEYWORDS)
    }
}

/// Scheme-name fragments that denote a dark theme
pub const DEFAULT_DARK_KEYWORDS: [&str; 6] = ["dark", "night", "black", "monokai", "dracula", "nord"];

/// Mode → profile mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileMap {
    pub light: ProfileName,
    pub dark: ProfileName,
}

impl ProfileMap {
    pub fn new(light: impl Into<String>, dark: impl Into<String>) -> Self {
        Self {
            light: ProfileName::new(light),
            dark: ProfileName::new(dark),
        }
    }

    pub fn profile_for(&self, mode: AppearanceMode) -> &ProfileName {
        match mode {
            AppearanceMode::Light => &self.light,
            AppearanceMode::Dark => &self.dark,
        }
    }
}

impl Default for ProfileMap {
    fn default() -> Self {
        Self::new("Light", "Dark")
    }
}
