/// Episode domain type
use crate::types::EpisodeId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One playable podcast episode
///
/// Created from catalog records and never mutated by playback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    /// Catalog identifier
    pub id: EpisodeId,

    /// Episode title
    pub title: String,

    /// Participants, as a single display string
    pub members: String,

    /// Cover image reference
    pub thumbnail: String,

    /// Episode length
    pub duration: Duration,

    /// Audio source reference handed to the output device
    pub url: String,
}

impl Episode {
    /// Create an episode with the fields playback needs
    pub fn new(
        id: impl Into<EpisodeId>,
        title: impl Into<String>,
        url: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            members: String::new(),
            thumbnail: String::new(),
            duration,
            url: url.into(),
        }
    }

    /// Set the participants display string
    #[must_use]
    pub fn with_members(mut self, members: impl Into<String>) -> Self {
        self.members = members.into();
        self
    }

    /// Set the cover image reference
    #[must_use]
    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = thumbnail.into();
        self
    }

    /// Duration in whole seconds
    pub fn duration_secs(&self) -> u64 {
        self.duration.as_secs()
    }
}
