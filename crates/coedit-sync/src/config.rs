//! Engine configuration

use serde::{Deserialize, Serialize};

/// How history applied while bootstrapping is raised before `Ready`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryReplay {
    /// One `Operation` carrying the composed history, if there is any
    #[default]
    Composed,
    /// One `Operation` per applied revision
    PerRevision,
    /// Nothing; the history is only visible through `document()`
    Silent,
}

impl HistoryReplay {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "composed" => Some(Self::Composed),
            "per_revision" | "per-revision" => Some(Self::PerRevision),
            "silent" => Some(Self::Silent),
            _ => None,
        }
    }
}

/// Tunables for a [`SyncEngine`](crate::SyncEngine)
///
/// The defaults reproduce the plain event contract: `ready`, `cursor`,
/// `operation`, `ack`, `retry`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Raise `RevisionSkipped` for slots consumed by a malformed revision
    pub report_skipped_revisions: bool,

    /// How the history found at bootstrap is raised
    pub history: HistoryReplay,

    /// Relay cursor broadcasts that carry this participant's own id
    pub relay_own_cursor: bool,
}

impl SyncConfig {
    /// Defaults overridden by `COEDIT_REPORT_SKIPPED`, `COEDIT_HISTORY_REPLAY`
    /// (`composed`, `per_revision` or `silent`) and `COEDIT_RELAY_OWN_CURSOR`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            report_skipped_revisions: env_flag("COEDIT_REPORT_SKIPPED")
                .unwrap_or(defaults.report_skipped_revisions),
            history: std::env::var("COEDIT_HISTORY_REPLAY")
                .ok()
                .and_then(|value| HistoryReplay::parse(&value))
                .unwrap_or(defaults.history),
            relay_own_cursor: env_flag("COEDIT_RELAY_OWN_CURSOR")
                .unwrap_or(defaults.relay_own_cursor),
        }
    }

    pub fn with_report_skipped_revisions(mut self, enabled: bool) -> Self {
        self.report_skipped_revisions = enabled;
        self
    }

    pub fn with_history(mut self, history: HistoryReplay) -> Self {
        self.history = history;
        self
    }

    pub fn with_relay_own_cursor(mut self, enabled: bool) -> Self {
        self.relay_own_cursor = enabled;
        self
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|value| parse_flag(&value))
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
