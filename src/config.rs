use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main drill configuration
///
/// Every tunable constant of the matching pipeline lives here so deployments
/// can adjust acceptance behavior without a rebuild. Defaults are the
/// production-calibrated values.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DrillConfig {
    #[serde(default)]
    pub matching: MatchConfig,
    #[serde(default)]
    pub live: LiveConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Static comparison tunables (final-utterance grading)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Acceptance bar for holistic comparison
    pub static_threshold: f32,
    /// Acceptance bar when the match came from the progressive path
    pub progressive_threshold: f32,
    /// Required match ratio for progressive windows over long targets (>5 words)
    pub progressive_ratio_long: f32,
    /// Required match ratio for progressive windows over short targets
    pub progressive_ratio_short: f32,
    /// Word score at or above which a token counts as matched in a window
    pub window_word_threshold: f32,
    /// Bonus added when spoken/expected word counts are close
    pub word_count_bonus: f32,
    /// Word-count ratio that qualifies for the bonus
    pub word_count_bonus_ratio: f32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            static_threshold: 0.75,
            progressive_threshold: 0.70,
            progressive_ratio_long: 0.9,
            progressive_ratio_short: 0.85,
            window_word_threshold: 0.8,
            word_count_bonus: 0.03,
            word_count_bonus_ratio: 0.85,
        }
    }
}

/// Live-recognition tunables (continuous interim grading)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveConfig {
    /// Baseline acceptance bar for interim text (noisier than final utterances)
    pub base_threshold: f32,
    /// Floor the adaptive bar can never go below
    pub min_threshold: f32,
    /// Word count above which the bar starts dropping
    pub word_count_pivot: usize,
    /// Bar reduction per expected word past the pivot
    pub reduction_per_word: f32,
    /// Bar reduction per second of recording
    pub decay_per_second: f32,
    /// Cap on the time-based reduction
    pub max_time_decay: f32,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            base_threshold: 0.70,
            min_threshold: 0.5,
            word_count_pivot: 4,
            reduction_per_word: 0.022,
            decay_per_second: 0.008,
            max_time_decay: 0.1,
        }
    }
}

/// Pauses and watchdog windows, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Delay between consecutive messages
    pub message_transition_ms: u64,
    /// Pause after a success message before the next step
    pub success_pause_ms: u64,
    /// Pause after a skip reveal before the next step
    pub skip_pause_ms: u64,
    /// Hard cap on a single audio playback
    pub audio_timeout_ms: u64,
    /// Watchdog forcing progression if a speaking phase hangs
    pub speaking_timeout_ms: u64,
    /// Recording window before a timeout is reported
    pub recording_timeout_ms: u64,
    /// Live auto-accept: interim text must hold above the bar this long
    pub confirm_hold_ms: u64,
    /// Live auto-accept: pause between confirmation and submission
    pub pre_submit_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            message_transition_ms: 200,
            success_pause_ms: 200,
            skip_pause_ms: 200,
            audio_timeout_ms: 10_000,
            speaking_timeout_ms: 15_000,
            recording_timeout_ms: 45_000,
            confirm_hold_ms: 1_000,
            pre_submit_ms: 750,
        }
    }
}

/// Progress persistence tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Target storage budget in bytes
    pub max_bytes: usize,
    /// In-progress records expire after this many days
    pub progress_ttl_days: i64,
    /// Completion records expire after this many days
    pub completed_ttl_days: i64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            max_bytes: 4 * 1024 * 1024,
            progress_ttl_days: 30,
            completed_ttl_days: 90,
        }
    }
}

impl DrillConfig {
    /// Load config from file or create default
    pub fn load() -> Result<Self> {
        let config_path = config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            match serde_json::from_str(&content) {
                Ok(config) => Ok(config),
                Err(e) => {
                    // Graceful degradation: log warning and use defaults
                    tracing::warn!("⚠️ Config file corrupted or invalid, using defaults: {}", e);
                    // Backup corrupt file for debugging
                    let backup_path = config_path.with_extension("json.corrupt");
                    let _ = std::fs::rename(&config_path, &backup_path);
                    Ok(Self::default())
                }
            }
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let config_path = config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lingodrill")
        .join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DrillConfig::default();
        assert_eq!(config.matching.static_threshold, 0.75);
        assert_eq!(config.matching.progressive_threshold, 0.70);
        assert_eq!(config.live.base_threshold, 0.70);
        assert_eq!(config.live.min_threshold, 0.5);
        assert_eq!(config.timing.recording_timeout_ms, 45_000);
        assert_eq!(config.storage.progress_ttl_days, 30);
    }

    #[test]
    fn test_config_serialization() {
        let config = DrillConfig::default();
        let json = serde_json::to_string(&config).expect("Failed to serialize");
        let restored: DrillConfig = serde_json::from_str(&json).expect("Failed to deserialize");
        assert_eq!(
            config.matching.static_threshold,
            restored.matching.static_threshold
        );
        assert_eq!(config.live.reduction_per_word, restored.live.reduction_per_word);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        // A config file that only overrides one section still parses
        let json = r#"{ "matching": { "static_threshold": 0.8, "progressive_threshold": 0.7,
            "progressive_ratio_long": 0.9, "progressive_ratio_short": 0.85,
            "window_word_threshold": 0.8, "word_count_bonus": 0.03,
            "word_count_bonus_ratio": 0.85 } }"#;
        let config: DrillConfig = serde_json::from_str(json).expect("Failed to parse");
        assert_eq!(config.matching.static_threshold, 0.8);
        assert_eq!(config.live.base_threshold, 0.70);
    }
}
