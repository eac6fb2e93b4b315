//! Podcast Player Core
//!
//! Platform-agnostic domain types and the catalog seam for Podcast Player.
//!
//! The core crate defines:
//! - **Domain Types**: `Episode`, `EpisodeId`
//! - **Catalog**: the upstream episode record format and the `Catalog` trait
//! - **Error Handling**: unified `CoreError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use podcast_core::{Episode, EpisodeId};
//! use std::time::Duration;
//!
//! let episode = Episode::new(
//!     EpisodeId::new("a-importancia-da-contribuicao-em-open-source"),
//!     "A importância da contribuição em Open Source",
//!     "https://storage.example.com/episodes/opensource.m4a",
//!     Duration::from_secs(3981),
//! )
//! .with_members("Diego Fernandes, João Pedro, Diego Schell e Bruna Cavalheiro");
//!
//! assert_eq!(episode.duration_secs(), 3981);
//! ```

#![forbid(unsafe_code)]

pub mod catalog;
pub mod error;
pub mod types;

pub use catalog::{
    Catalog, CatalogFile, CatalogQuery, CatalogRecord, EpisodeListing, SortOrder, StaticCatalog,
    DEFAULT_CATALOG_LIMIT, LATEST_EPISODE_COUNT,
};
pub use error::{CoreError, Result};
pub use types::{Episode, EpisodeId};
