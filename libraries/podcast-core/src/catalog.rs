//! Catalog Service access
//!
//! The catalog supplies episode records in bulk. Playback never talks to the
//! catalog directly; hosts fetch episodes here and hand them to a playlist.

use crate::error::{CoreError, Result};
use crate::types::{Episode, EpisodeId};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::time::Duration;

/// Number of episodes fetched when the caller does not ask for a limit
pub const DEFAULT_CATALOG_LIMIT: usize = 12;

/// Number of newest episodes highlighted as "latest" in a listing
pub const LATEST_EPISODE_COUNT: usize = 2;

/// Upstream episode record as served by the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub members: String,
    #[serde(deserialize_with = "deserialize_published_at")]
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub description: String,
    pub file: CatalogFile,
}

/// Audio file section of a catalog record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogFile {
    pub url: String,

    /// MIME type of the audio file
    #[serde(rename = "type", default)]
    pub mime_type: String,

    /// Length in whole seconds (upstream sends either a number or a numeric string)
    #[serde(deserialize_with = "deserialize_duration_secs")]
    pub duration: u64,
}

impl CatalogRecord {
    /// Convert the record into the immutable playback value
    pub fn into_episode(self) -> Episode {
        Episode {
            id: EpisodeId::new(self.id),
            title: self.title,
            members: self.members,
            thumbnail: self.thumbnail,
            duration: Duration::from_secs(self.file.duration),
            url: self.file.url,
        }
    }
}

/// Ordering by publish date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    NewestFirst,
    OldestFirst,
}

/// Bulk episode query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogQuery {
    /// Maximum number of episodes (None = everything)
    pub limit: Option<usize>,

    /// Publish date ordering
    pub order: SortOrder,
}

impl Default for CatalogQuery {
    fn default() -> Self {
        Self {
            limit: Some(DEFAULT_CATALOG_LIMIT),
            order: SortOrder::NewestFirst,
        }
    }
}

/// Catalog Service seam
///
/// Implementations may be remote; the query is answered in one round trip.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Fetch episodes matching the query, already ordered
    async fn episodes(&self, query: &CatalogQuery) -> Result<Vec<Episode>>;

    /// Fetch a single episode by id
    async fn episode(&self, id: &EpisodeId) -> Result<Episode> {
        let all = self
            .episodes(&CatalogQuery {
                limit: None,
                order: SortOrder::NewestFirst,
            })
            .await?;

        all.into_iter()
            .find(|episode| &episode.id == id)
            .ok_or_else(|| CoreError::not_found("Episode", id.as_str()))
    }
}

/// Catalog backed by records held in memory
///
/// Accepts either a bare JSON array of records or a document with an
/// `episodes` array (the shape of a json-server database file).
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    records: Vec<CatalogRecord>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogDocument {
    Records(Vec<CatalogRecord>),
    Database { episodes: Vec<CatalogRecord> },
}

impl StaticCatalog {
    pub fn new(records: Vec<CatalogRecord>) -> Self {
        Self { records }
    }

    /// Parse a catalog document
    pub fn from_json(json: &str) -> Result<Self> {
        let document: CatalogDocument = serde_json::from_str(json)?;
        let records = match document {
            CatalogDocument::Records(records) | CatalogDocument::Database { episodes: records } => {
                records
            }
        };
        tracing::debug!("Loaded {} catalog records", records.len());
        Ok(Self { records })
    }

    /// Read and parse a catalog document from disk
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl Catalog for StaticCatalog {
    async fn episodes(&self, query: &CatalogQuery) -> Result<Vec<Episode>> {
        let mut records = self.records.clone();
        match query.order {
            SortOrder::NewestFirst => records.sort_by(|a, b| b.published_at.cmp(&a.published_at)),
            SortOrder::OldestFirst => records.sort_by(|a, b| a.published_at.cmp(&b.published_at)),
        }

        let limit = query.limit.unwrap_or(records.len());
        Ok(records
            .into_iter()
            .take(limit)
            .map(CatalogRecord::into_episode)
            .collect())
    }
}

/// Home listing: a few newest episodes highlighted, the remainder in a table
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EpisodeListing {
    pub latest: Vec<Episode>,
    pub all: Vec<Episode>,
}

impl EpisodeListing {
    /// Split newest-first episodes into the highlighted head and the rest
    pub fn split(mut episodes: Vec<Episode>, latest_count: usize) -> Self {
        let rest = episodes.split_off(latest_count.min(episodes.len()));
        Self {
            latest: episodes,
            all: rest,
        }
    }

    /// Every episode in listing order, the sequence a "play all" starts from
    pub fn playlist(&self) -> Vec<Episode> {
        self.latest.iter().chain(self.all.iter()).cloned().collect()
    }
}

fn parse_published_at(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| CoreError::invalid_input(format!("invalid published_at {raw:?}: {e}")))
}

fn deserialize_published_at<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_published_at(&raw).map_err(serde::de::Error::custom)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Seconds(u64),
    Text(String),
}

fn deserialize_duration_secs<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match RawDuration::deserialize(deserializer)? {
        RawDuration::Seconds(secs) => Ok(secs),
        RawDuration::Text(text) => text
            .trim()
            .parse::<u64>()
            .map_err(|e| serde::de::Error::custom(format!("invalid duration {text:?}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATABASE: &str = r#"{
        "episodes": [
            {
                "id": "a-importancia-da-contribuicao-em-open-source",
                "title": "Faladev #30 | A importância da contribuição em Open Source",
                "members": "Diego Fernandes, João Pedro, Diego Schell e Bruna Cavalheiro",
                "published_at": "2021-01-22 15:00:00",
                "thumbnail": "https://storage.test/opensource.jpg",
                "description": "<p>Neste episódio...</p>",
                "file": {
                    "url": "https://storage.test/opensource.m4a",
                    "type": "audio/x-m4a",
                    "duration": 3981
                }
            },
            {
                "id": "uma-conversa-sobre-programacao-funcional-e-orientacao-a-objetos",
                "title": "Faladev #29 | Programação funcional e orientação a objetos",
                "members": "Diego Fernandes e Richard Nascimento",
                "published_at": "2021-01-15 16:00:00",
                "thumbnail": "https://storage.test/funcional.jpg",
                "file": {
                    "url": "https://storage.test/funcional.m4a",
                    "type": "audio/x-m4a",
                    "duration": "3527"
                }
            },
            {
                "id": "barreiras-na-programacao",
                "title": "Faladev #31 | Barreiras na programação",
                "members": "Diego Fernandes e Mayk Brito",
                "published_at": "2021-01-29T15:00:00Z",
                "thumbnail": "https://storage.test/barreiras.jpg",
                "file": {
                    "url": "https://storage.test/barreiras.m4a",
                    "type": "audio/x-m4a",
                    "duration": 2834
                }
            }
        ]
    }"#;

    #[test]
    fn parses_database_document() {
        let catalog = StaticCatalog::from_json(DATABASE).unwrap();
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn parses_bare_record_array() {
        let json = r#"[{
            "id": "ep1",
            "title": "Episode 1",
            "published_at": "2021-02-01 10:00:00",
            "file": { "url": "https://storage.test/ep1.mp3", "duration": 60 }
        }]"#;
        let catalog = StaticCatalog::from_json(json).unwrap();
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn string_duration_is_accepted() {
        let catalog = StaticCatalog::from_json(DATABASE).unwrap();
        let funcional = catalog
            .records
            .iter()
            .find(|r| r.id.starts_with("uma-conversa"))
            .unwrap();
        assert_eq!(funcional.file.duration, 3527);
    }

    #[test]
    fn invalid_duration_is_rejected() {
        let json = r#"[{
            "id": "ep1",
            "title": "Episode 1",
            "published_at": "2021-02-01 10:00:00",
            "file": { "url": "https://storage.test/ep1.mp3", "duration": "an hour" }
        }]"#;
        assert!(StaticCatalog::from_json(json).is_err());
    }

    #[test]
    fn invalid_published_at_is_rejected() {
        let json = r#"[{
            "id": "ep1",
            "title": "Episode 1",
            "published_at": "yesterday",
            "file": { "url": "https://storage.test/ep1.mp3", "duration": 60 }
        }]"#;
        assert!(StaticCatalog::from_json(json).is_err());
    }

    #[test]
    fn record_maps_onto_episode() {
        let catalog = StaticCatalog::from_json(DATABASE).unwrap();
        let episode = catalog.records[0].clone().into_episode();

        assert_eq!(episode.id.as_str(), "a-importancia-da-contribuicao-em-open-source");
        assert_eq!(episode.url, "https://storage.test/opensource.m4a");
        assert_eq!(episode.duration, Duration::from_secs(3981));
        assert_eq!(
            episode.members,
            "Diego Fernandes, João Pedro, Diego Schell e Bruna Cavalheiro"
        );
    }

    #[tokio::test]
    async fn episodes_are_newest_first_by_default() {
        let catalog = StaticCatalog::from_json(DATABASE).unwrap();
        let episodes = catalog.episodes(&CatalogQuery::default()).await.unwrap();

        let ids: Vec<&str> = episodes.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "barreiras-na-programacao",
                "a-importancia-da-contribuicao-em-open-source",
                "uma-conversa-sobre-programacao-funcional-e-orientacao-a-objetos",
            ]
        );
    }

    #[tokio::test]
    async fn limit_and_order_are_respected() {
        let catalog = StaticCatalog::from_json(DATABASE).unwrap();
        let query = CatalogQuery {
            limit: Some(1),
            order: SortOrder::OldestFirst,
        };
        let episodes = catalog.episodes(&query).await.unwrap();

        assert_eq!(episodes.len(), 1);
        assert_eq!(
            episodes[0].id.as_str(),
            "uma-conversa-sobre-programacao-funcional-e-orientacao-a-objetos"
        );
    }

    #[tokio::test]
    async fn episode_lookup_by_id() {
        let catalog = StaticCatalog::from_json(DATABASE).unwrap();

        let found = catalog
            .episode(&EpisodeId::new("barreiras-na-programacao"))
            .await
            .unwrap();
        assert_eq!(found.duration_secs(), 2834);

        let missing = catalog.episode(&EpisodeId::new("nope")).await;
        assert!(matches!(missing, Err(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn listing_splits_latest_from_rest() {
        let catalog = StaticCatalog::from_json(DATABASE).unwrap();
        let episodes = catalog.episodes(&CatalogQuery::default()).await.unwrap();

        let listing = EpisodeListing::split(episodes.clone(), LATEST_EPISODE_COUNT);
        assert_eq!(listing.latest.len(), 2);
        assert_eq!(listing.all.len(), 1);
        assert_eq!(listing.playlist(), episodes);
    }

    #[test]
    fn listing_split_with_fewer_episodes_than_latest_count() {
        let episodes = vec![Episode::new(
            "ep1",
            "One",
            "https://storage.test/1.mp3",
            Duration::from_secs(1),
        )];
        let listing = EpisodeListing::split(episodes, LATEST_EPISODE_COUNT);

        assert_eq!(listing.latest.len(), 1);
        assert!(listing.all.is_empty());
    }
}
