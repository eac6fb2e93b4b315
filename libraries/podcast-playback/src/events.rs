//! Playback Events
//!
//! Event-based communication for UI synchronization. The controller queues
//! events as it reconciles; hosts drain them after each command or device
//! event.

use crate::types::PlayerPhase;
use podcast_core::EpisodeId;
use serde::{Deserialize, Serialize};

/// Events emitted by the playback core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlayerEvent {
    /// Controller phase changed (idle, loading, ready, unavailable)
    PhaseChanged { phase: PlayerPhase },

    /// A new episode was handed to the device
    EpisodeChanged {
        index: usize,
        episode_id: EpisodeId,
        title: String,
    },

    /// Device play/pause state changed
    PlayingChanged { is_playing: bool },

    /// Loop setting applied to the device
    LoopingChanged { is_looping: bool },

    /// Shuffle flag changed
    ShufflingChanged { is_shuffling: bool },

    /// Device reported the episode duration (seconds)
    DurationKnown { duration: f64 },

    /// Progress moved (seconds elapsed)
    ProgressChanged { position: f64 },

    /// Episode reached its natural end
    EpisodeFinished { episode_id: EpisodeId },

    /// Playlist emptied; nothing selected
    PlaylistCleared,

    /// The device cannot play the current episode
    EpisodeUnavailable {
        episode_id: Option<EpisodeId>,
        url: String,
        reason: String,
    },

    /// Non-fatal device error outside of loading
    Error { message: String },
}
