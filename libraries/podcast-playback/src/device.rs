//! Audio output device seam
//!
//! The device is an external collaborator. The controller issues the five
//! commands below and receives [`DeviceEvent`]s back through the session
//! loop. Each load gets a fresh [`LoadToken`]; events carry the token of the
//! load they belong to so that events from a superseded episode can be
//! recognized and dropped.

use crate::error::DeviceError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one `load` issued to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadToken(u64);

impl LoadToken {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }

    pub(crate) fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for LoadToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "load#{}", self.0)
    }
}

/// Commands understood by an audio output device
///
/// Implementations must not block waiting for the media: readiness, progress
/// and completion are reported later as [`DeviceEvent`]s.
#[cfg_attr(test, mockall::automock)]
pub trait AudioDevice {
    /// Open a new source; replaces whatever was loaded before
    fn load(&mut self, token: LoadToken, url: &str) -> Result<(), DeviceError>;

    /// Start or resume output
    fn play(&mut self) -> Result<(), DeviceError>;

    /// Pause output, keeping the position
    fn pause(&mut self) -> Result<(), DeviceError>;

    /// Move the read position (seconds from start)
    fn seek(&mut self, seconds: f64) -> Result<(), DeviceError>;

    /// Persistent same-track repeat setting
    fn set_loop(&mut self, looping: bool) -> Result<(), DeviceError>;
}

impl<D: AudioDevice + ?Sized> AudioDevice for Box<D> {
    fn load(&mut self, token: LoadToken, url: &str) -> Result<(), DeviceError> {
        (**self).load(token, url)
    }

    fn play(&mut self) -> Result<(), DeviceError> {
        (**self).play()
    }

    fn pause(&mut self) -> Result<(), DeviceError> {
        (**self).pause()
    }

    fn seek(&mut self, seconds: f64) -> Result<(), DeviceError> {
        (**self).seek(seconds)
    }

    fn set_loop(&mut self, looping: bool) -> Result<(), DeviceError> {
        (**self).set_loop(looping)
    }
}

/// Something the device reports about a load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeviceEventKind {
    /// Metadata is available; time updates follow
    Ready { duration: f64 },

    /// Current read position in seconds
    TimeUpdate { position: f64 },

    /// Natural end of the source
    Ended,

    /// Output started on the device's own initiative (or as an acknowledgement)
    Started,

    /// Output paused on the device's own initiative (or as an acknowledgement)
    Paused,

    /// The source failed after `load` returned
    Failed { reason: String },
}

/// Device event tagged with the load it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceEvent {
    pub token: LoadToken,
    pub kind: DeviceEventKind,
}

impl DeviceEvent {
    pub fn new(token: LoadToken, kind: DeviceEventKind) -> Self {
        Self { token, kind }
    }

    pub fn ready(token: LoadToken, duration: f64) -> Self {
        Self::new(token, DeviceEventKind::Ready { duration })
    }

    pub fn time_update(token: LoadToken, position: f64) -> Self {
        Self::new(token, DeviceEventKind::TimeUpdate { position })
    }

    pub fn ended(token: LoadToken) -> Self {
        Self::new(token, DeviceEventKind::Ended)
    }

    pub fn started(token: LoadToken) -> Self {
        Self::new(token, DeviceEventKind::Started)
    }

    pub fn paused(token: LoadToken) -> Self {
        Self::new(token, DeviceEventKind::Paused)
    }

    pub fn failed(token: LoadToken, reason: impl Into<String>) -> Self {
        Self::new(
            token,
            DeviceEventKind::Failed {
                reason: reason.into(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_increase() {
        let first = LoadToken::new(1);
        let second = first.next();
        assert!(second > first);
        assert_eq!(second.value(), 2);
        assert_eq!(second.to_string(), "load#2");
    }

    #[test]
    fn boxed_device_forwards_commands() {
        let mut mock = MockAudioDevice::new();
        mock.expect_seek()
            .withf(|seconds| *seconds == 12.5)
            .times(1)
            .returning(|_| Ok(()));

        let mut boxed: Box<dyn AudioDevice> = Box::new(mock);
        assert!(boxed.seek(12.5).is_ok());
    }
}
