//! Engine configuration
//!
//! Every timing constant is server-authoritative. Defaults come from the
//! reference values in the crate root.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use crate::{
    CONVERSATION_SESSION_MS, FOCUS_WINDOW_DURATION_MS, HEARTBEAT_INTERVAL_MS,
    MAX_PRESS_DURATION_MS, MIN_HOLD_MS, RETENTION_MS, STALE_AFTER_MS,
    SUCCESS_INTRO_MS, TICK_INTERVAL_MS,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Timing configuration for the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub min_hold_ms: u64,
    pub focus_window_duration_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub stale_after_ms: u64,
    pub conversation_session_ms: u64,
    pub success_intro_ms: u64,
    pub max_press_duration_ms: u64,
    pub tick_interval_ms: u64,
    pub retention_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_hold_ms: MIN_HOLD_MS,
            focus_window_duration_ms: FOCUS_WINDOW_DURATION_MS,
            heartbeat_interval_ms: HEARTBEAT_INTERVAL_MS,
            stale_after_ms: STALE_AFTER_MS,
            conversation_session_ms: CONVERSATION_SESSION_MS,
            success_intro_ms: SUCCESS_INTRO_MS,
            max_press_duration_ms: MAX_PRESS_DURATION_MS,
            tick_interval_ms: TICK_INTERVAL_MS,
            retention_ms: RETENTION_MS,
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file; missing fields keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("minHoldMs", self.min_hold_ms),
            ("focusWindowDurationMs", self.focus_window_duration_ms),
            ("heartbeatIntervalMs", self.heartbeat_interval_ms),
            ("staleAfterMs", self.stale_after_ms),
            ("conversationSessionMs", self.conversation_session_ms),
            ("maxPressDurationMs", self.max_press_duration_ms),
            ("tickIntervalMs", self.tick_interval_ms),
            ("retentionMs", self.retention_ms),
        ];
        if let Some((name, _)) = durations.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::Invalid(format!("{} must be greater than zero", name)));
        }
        if self.stale_after_ms <= self.heartbeat_interval_ms {
            return Err(ConfigError::Invalid(
                "staleAfterMs must exceed heartbeatIntervalMs".to_string(),
            ));
        }
        if self.min_hold_ms >= self.focus_window_duration_ms {
            return Err(ConfigError::Invalid(
                "minHoldMs must be shorter than focusWindowDurationMs".to_string(),
            ));
        }
        Ok(())
    }
}
