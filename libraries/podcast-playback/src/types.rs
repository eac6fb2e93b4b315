//! Core types for playback coordination

use serde::{Deserialize, Serialize};

/// What to do when the device reports end-of-track while looping is on
///
/// Device-level looping normally swallows the end event. Some devices still
/// emit it, in which case the controller either restarts the episode itself
/// or leaves the device alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopEndBehavior {
    /// Reissue `seek(0)` and `play()` for the same episode
    #[default]
    Restart,

    /// Do nothing; rely on the device's native loop
    Ignore,
}

/// Controller phase for the current episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerPhase {
    /// No episode selected
    Idle,

    /// Episode handed to the device, waiting for readiness
    Loading,

    /// Device reported readiness; playing or paused per the state flag
    Ready,

    /// The device could not load or play the episode
    Unavailable,
}

/// Configuration for a playback session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Initial shuffle flag (default: false)
    #[serde(default)]
    pub shuffle: bool,

    /// Initial loop flag (default: false)
    #[serde(default)]
    pub looping: bool,

    /// Seed for shuffle picks; entropy-seeded when absent
    #[serde(default)]
    pub shuffle_seed: Option<u64>,

    /// End-of-track handling while looping (default: Restart)
    #[serde(default)]
    pub loop_end: LoopEndBehavior,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            shuffle: false,
            looping: false,
            shuffle_seed: None,
            loop_end: LoopEndBehavior::Restart,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = PlayerConfig::default();
        assert!(!config.shuffle);
        assert!(!config.looping);
        assert_eq!(config.shuffle_seed, None);
        assert_eq!(config.loop_end, LoopEndBehavior::Restart);
    }

    #[test]
    fn config_fields_default_when_missing() {
        let config: PlayerConfig = serde_json::from_str(r#"{ "looping": true }"#).unwrap();
        assert!(config.looping);
        assert!(!config.shuffle);
        assert_eq!(config.loop_end, LoopEndBehavior::Restart);
    }

    #[test]
    fn loop_end_uses_snake_case() {
        let config: PlayerConfig = serde_json::from_str(r#"{ "loop_end": "ignore" }"#).unwrap();
        assert_eq!(config.loop_end, LoopEndBehavior::Ignore);
    }
}
