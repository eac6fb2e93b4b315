//! Playback state - the single source of truth for what should be playing
//!
//! Holds the playlist, the current index and the intent flags. Every
//! operation is synchronous and total: navigation on an empty playlist is a
//! no-op, never an error.

use crate::shuffle::ShufflePicker;
use crate::types::PlayerConfig;
use podcast_core::Episode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Playlist, current index and intent flags
///
/// `is_playing` is the *intended* device state. The controller converges the
/// device towards it and feeds device-initiated changes back through
/// [`PlaybackState::set_playing_state`].
#[derive(Debug)]
pub struct PlaybackState {
    playlist: Vec<Episode>,
    current_index: usize,
    is_playing: bool,
    is_looping: bool,
    is_shuffling: bool,

    // Bumped whenever the current episode is (re)selected or cleared
    selection_id: u64,

    shuffle: ShufflePicker,
}

/// Read-only copy of the state for UIs and tests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub playlist: Vec<Episode>,
    pub current_index: usize,
    pub current_episode: Option<Episode>,
    pub is_playing: bool,
    pub is_looping: bool,
    pub is_shuffling: bool,
    pub has_next: bool,
    pub has_previous: bool,
}

impl PlaybackState {
    /// Create an empty state with the configured initial flags
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            playlist: Vec::new(),
            current_index: 0,
            is_playing: false,
            is_looping: config.looping,
            is_shuffling: config.shuffle,
            selection_id: 0,
            shuffle: ShufflePicker::new(config.shuffle_seed),
        }
    }

    /// Create an empty state whose shuffle picks follow a fixed seed
    pub fn with_seed(seed: u64) -> Self {
        Self::new(&PlayerConfig {
            shuffle_seed: Some(seed),
            ..PlayerConfig::default()
        })
    }

    // ===== Commands =====

    /// Play a single episode, replacing the playlist
    pub fn play(&mut self, episode: Episode) {
        debug!("Playing single episode {}", episode.id);
        self.playlist = vec![episode];
        self.select(0);
        self.is_playing = true;
    }

    /// Replace the playlist and start at `index`
    ///
    /// An out-of-range index is clamped to the last episode. An empty list
    /// leaves nothing selected and nothing playing.
    pub fn play_list(&mut self, list: Vec<Episode>, index: usize) {
        if list.is_empty() {
            debug!("play_list called with an empty list, clearing");
            self.clear_player_state();
            return;
        }

        let last = list.len() - 1;
        let index = if index > last {
            warn!(
                "play_list index {} out of range for {} episodes, clamping to {}",
                index,
                list.len(),
                last
            );
            last
        } else {
            index
        };

        self.playlist = list;
        self.select(index);
        self.is_playing = true;
    }

    /// Advance to the next episode
    ///
    /// Shuffling draws a random index (possibly the current one). Otherwise
    /// moves forward by one when there is a next episode.
    pub fn play_next(&mut self) {
        if self.is_shuffling {
            self.play_random();
        } else if self.has_next() {
            self.select(self.current_index + 1);
        }
    }

    /// Go back to the previous episode
    ///
    /// Shuffling draws a random index, same as [`PlaybackState::play_next`].
    pub fn play_previous(&mut self) {
        if self.is_shuffling {
            self.play_random();
        } else if self.has_previous() {
            self.select(self.current_index - 1);
        }
    }

    /// Jump to a uniformly random episode in the playlist
    pub fn play_random(&mut self) {
        if let Some(index) = self.shuffle.pick(self.playlist.len()) {
            self.select(index);
        }
    }

    pub fn toggle_play(&mut self) {
        self.is_playing = !self.is_playing;
    }

    pub fn toggle_loop(&mut self) {
        self.is_looping = !self.is_looping;
    }

    pub fn toggle_shuffle(&mut self) {
        self.is_shuffling = !self.is_shuffling;
    }

    /// Overwrite the playing flag, used when the device reports its own state
    pub fn set_playing_state(&mut self, is_playing: bool) {
        self.is_playing = is_playing;
    }

    /// Empty the playlist and stop; loop and shuffle flags are kept
    pub fn clear_player_state(&mut self) {
        self.playlist.clear();
        self.current_index = 0;
        self.is_playing = false;
        self.selection_id += 1;
    }

    fn select(&mut self, index: usize) {
        self.current_index = index;
        self.selection_id += 1;
    }

    // ===== Queries =====

    pub fn playlist(&self) -> &[Episode] {
        &self.playlist
    }

    /// Current index (0 when the playlist is empty)
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_episode(&self) -> Option<&Episode> {
        self.playlist.get(self.current_index)
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_looping(&self) -> bool {
        self.is_looping
    }

    pub fn is_shuffling(&self) -> bool {
        self.is_shuffling
    }

    pub fn is_empty(&self) -> bool {
        self.playlist.is_empty()
    }

    /// Whether a next episode is available
    ///
    /// Always true while shuffling a non-empty playlist, since a random pick
    /// is always possible.
    pub fn has_next(&self) -> bool {
        if self.playlist.is_empty() {
            return false;
        }
        self.is_shuffling || self.current_index + 1 < self.playlist.len()
    }

    pub fn has_previous(&self) -> bool {
        self.current_index > 0
    }

    /// Identifier of the current selection
    ///
    /// Changes every time an episode is selected (even the same index again)
    /// or the state is cleared. The controller uses it to detect when the
    /// device must load something new.
    pub fn selection_id(&self) -> u64 {
        self.selection_id
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            playlist: self.playlist.clone(),
            current_index: self.current_index,
            current_episode: self.current_episode().cloned(),
            is_playing: self.is_playing,
            is_looping: self.is_looping,
            is_shuffling: self.is_shuffling,
            has_next: self.has_next(),
            has_previous: self.has_previous(),
        }
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new(&PlayerConfig::default())
    }
}
