//! Podcast Player - Playback Coordination
//!
//! Platform-agnostic playback coordination for Podcast Player.
//!
//! This crate provides:
//! - Playlist state with next/previous, shuffle and loop flags
//! - A controller that keeps one audio output device aligned with that state
//! - Stale device event rejection via per-load tokens
//! - A single-threaded session loop fed by command and device channels
//!
//! # Architecture
//!
//! `podcast-playback` never decodes or outputs audio. The device is reached
//! through the [`AudioDevice`] trait and reports back with [`DeviceEvent`]s.
//! [`PlaybackState`] holds intent; [`PlaybackController`] turns intent into
//! device commands and device events into state commands.
//!
//! # Example: Driving a session directly
//!
//! ```rust
//! use podcast_core::Episode;
//! use podcast_playback::{
//!     AudioDevice, DeviceError, DeviceEvent, LoadToken, PlayerConfig, PlayerEvent,
//!     PlayerSession,
//! };
//! use std::time::Duration;
//!
//! #[derive(Default)]
//! struct SilentDevice {
//!     loaded: Option<LoadToken>,
//! }
//!
//! impl AudioDevice for SilentDevice {
//!     fn load(&mut self, token: LoadToken, _url: &str) -> Result<(), DeviceError> {
//!         self.loaded = Some(token);
//!         Ok(())
//!     }
//!     fn play(&mut self) -> Result<(), DeviceError> { Ok(()) }
//!     fn pause(&mut self) -> Result<(), DeviceError> { Ok(()) }
//!     fn seek(&mut self, _seconds: f64) -> Result<(), DeviceError> { Ok(()) }
//!     fn set_loop(&mut self, _looping: bool) -> Result<(), DeviceError> { Ok(()) }
//! }
//!
//! let mut session = PlayerSession::new(SilentDevice::default(), &PlayerConfig::default());
//!
//! let episodes = vec![
//!     Episode::new("e0", "Episode 0", "https://cdn.example.com/e0.mp3", Duration::from_secs(100)),
//!     Episode::new("e1", "Episode 1", "https://cdn.example.com/e1.mp3", Duration::from_secs(200)),
//! ];
//! session.play_list(episodes, 0);
//!
//! // The device reports readiness and progress for the load it was given
//! let token = session.device().loaded.unwrap();
//! session.handle_device_event(DeviceEvent::ready(token, 100.0));
//! session.handle_device_event(DeviceEvent::time_update(token, 12.5));
//! assert_eq!(session.progress(), 12.5);
//!
//! // End of track moves on to the next episode
//! session.handle_device_event(DeviceEvent::ended(token));
//! assert_eq!(session.state().current_index(), 1);
//! assert_eq!(session.progress(), 0.0);
//!
//! // Hosts without a session thread drain events after each step
//! let events = session.drain_events();
//! assert!(events.contains(&PlayerEvent::EpisodeFinished { episode_id: "e0".into() }));
//! ```

mod controller;
mod device;
mod error;
mod events;
mod session;
mod shuffle;
mod state;
pub mod types;

// Public exports
pub use controller::PlaybackController;
pub use device::{AudioDevice, DeviceEvent, DeviceEventKind, LoadToken};
pub use error::{DeviceError, PlaybackError, Result};
pub use events::PlayerEvent;
pub use session::{
    spawn, DeviceEventSink, PlayerCommand, PlayerHandle, PlayerSession, PlayerStatus,
    SessionMessage,
};
pub use shuffle::ShufflePicker;
pub use state::{PlaybackSnapshot, PlaybackState};
pub use types::{LoopEndBehavior, PlayerConfig, PlayerPhase};
