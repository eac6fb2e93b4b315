//! Simulated audio output device
//!
//! Plays nothing; a clock thread advances the position of the loaded episode
//! and reports progress and end-of-track like a media element would.

use crate::config::SimulationSettings;
use podcast_playback::{AudioDevice, DeviceError, DeviceEvent, DeviceEventSink, LoadToken};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct SimState {
    token: Option<LoadToken>,
    position: f64,
    duration: f64,
    playing: bool,
    looping: bool,
    stopped: bool,
}

impl SimState {
    /// Move the clock forward and report what a media element would
    fn advance(&mut self, elapsed: f64) -> Option<DeviceEvent> {
        let token = self.token?;
        if !self.playing {
            return None;
        }

        self.position += elapsed;
        if self.position < self.duration {
            return Some(DeviceEvent::time_update(token, self.position));
        }

        if self.looping {
            // Native loop: wrap around without an end event
            self.position = 0.0;
            Some(DeviceEvent::time_update(token, 0.0))
        } else {
            self.position = self.duration;
            self.playing = false;
            Some(DeviceEvent::ended(token))
        }
    }
}

pub struct SimulatedDevice {
    sink: DeviceEventSink,
    state: Arc<Mutex<SimState>>,
    durations: HashMap<String, f64>,
}

impl SimulatedDevice {
    /// Create a device that knows the duration of every playable url
    pub fn new(
        sink: DeviceEventSink,
        durations: HashMap<String, f64>,
        settings: &SimulationSettings,
    ) -> Self {
        let state = Arc::new(Mutex::new(SimState::default()));

        let tick = Duration::from_millis(settings.tick_ms);
        let step = tick.as_secs_f64() * settings.speed;
        let clock_state = Arc::clone(&state);
        let clock_sink = sink.clone();

        // Detached; exits at the next tick once the device is dropped
        if let Err(e) = thread::Builder::new()
            .name("simulated-device-clock".to_string())
            .spawn(move || run_clock(&clock_state, &clock_sink, tick, step))
        {
            warn!("Failed to start device clock, progress will not advance: {}", e);
        }

        Self {
            sink,
            state,
            durations,
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut SimState) -> T) -> Result<T, DeviceError> {
        let mut state = self.state.lock().map_err(|_| DeviceError::Disconnected)?;
        Ok(f(&mut state))
    }
}

fn run_clock(state: &Mutex<SimState>, sink: &DeviceEventSink, tick: Duration, step: f64) {
    loop {
        thread::sleep(tick);

        let event = {
            let Ok(mut state) = state.lock() else {
                break;
            };
            if state.stopped {
                break;
            }
            state.advance(step)
        };

        if let Some(event) = event {
            if !sink.emit(event) {
                break;
            }
        }
    }
    debug!("Device clock stopped");
}

impl AudioDevice for SimulatedDevice {
    fn load(&mut self, token: LoadToken, url: &str) -> Result<(), DeviceError> {
        let Some(&duration) = self.durations.get(url) else {
            return Err(DeviceError::SourceUnavailable(format!("no media at {}", url)));
        };

        self.with_state(|state| {
            state.token = Some(token);
            state.position = 0.0;
            state.duration = duration;
            state.playing = false;
        })?;

        debug!("Simulated device loaded {} as {}", url, token);
        self.sink.emit(DeviceEvent::ready(token, duration));
        Ok(())
    }

    fn play(&mut self) -> Result<(), DeviceError> {
        self.with_state(|state| {
            if state.token.is_none() {
                return Err(DeviceError::CommandRejected("nothing loaded".to_string()));
            }
            state.playing = true;
            Ok(())
        })?
    }

    fn pause(&mut self) -> Result<(), DeviceError> {
        self.with_state(|state| state.playing = false)
    }

    fn seek(&mut self, seconds: f64) -> Result<(), DeviceError> {
        self.with_state(|state| state.position = seconds.clamp(0.0, state.duration))
    }

    fn set_loop(&mut self, looping: bool) -> Result<(), DeviceError> {
        self.with_state(|state| state.looping = looping)
    }
}

impl Drop for SimulatedDevice {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.stopped = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use podcast_playback::DeviceEventKind;

    fn loaded_state(duration: f64) -> SimState {
        SimState {
            token: Some(LoadToken::new(1)),
            duration,
            playing: true,
            ..SimState::default()
        }
    }

    fn slow_settings() -> SimulationSettings {
        SimulationSettings {
            tick_ms: 60_000,
            speed: 1.0,
        }
    }

    #[test]
    fn clock_reports_progress() {
        let mut state = loaded_state(10.0);

        let event = state.advance(2.5).unwrap();

        assert_eq!(event.kind, DeviceEventKind::TimeUpdate { position: 2.5 });
        assert_eq!(state.position, 2.5);
    }

    #[test]
    fn clock_is_silent_while_paused() {
        let mut state = loaded_state(10.0);
        state.playing = false;

        assert!(state.advance(1.0).is_none());
        assert_eq!(state.position, 0.0);
    }

    #[test]
    fn clock_ends_track_and_stops() {
        let mut state = loaded_state(3.0);
        state.position = 2.0;

        let event = state.advance(1.5).unwrap();

        assert_eq!(event.kind, DeviceEventKind::Ended);
        assert!(!state.playing);
        assert_eq!(state.position, 3.0);
        assert!(state.advance(1.0).is_none());
    }

    #[test]
    fn clock_wraps_around_while_looping() {
        let mut state = loaded_state(3.0);
        state.looping = true;
        state.position = 2.5;

        let event = state.advance(1.0).unwrap();

        assert_eq!(event.kind, DeviceEventKind::TimeUpdate { position: 0.0 });
        assert!(state.playing);
    }

    #[test]
    fn load_reports_ready_with_known_duration() {
        let (tx, rx) = unbounded();
        let durations = HashMap::from([("https://cdn.test/a.mp3".to_string(), 42.0)]);
        let mut device =
            SimulatedDevice::new(DeviceEventSink::new(tx), durations, &slow_settings());

        device
            .load(LoadToken::new(7), "https://cdn.test/a.mp3")
            .unwrap();

        let event = rx.try_recv().unwrap();
        assert_eq!(event.token, LoadToken::new(7));
        assert_eq!(event.kind, DeviceEventKind::Ready { duration: 42.0 });
    }

    #[test]
    fn unknown_url_is_unavailable() {
        let (tx, _rx) = unbounded();
        let mut device =
            SimulatedDevice::new(DeviceEventSink::new(tx), HashMap::new(), &slow_settings());

        let result = device.load(LoadToken::new(1), "https://cdn.test/missing.mp3");

        assert!(matches!(result, Err(DeviceError::SourceUnavailable(_))));
        assert!(matches!(
            device.play(),
            Err(DeviceError::CommandRejected(_))
        ));
    }

    #[test]
    fn seek_is_clamped_to_duration() {
        let (tx, _rx) = unbounded();
        let durations = HashMap::from([("https://cdn.test/a.mp3".to_string(), 20.0)]);
        let mut device =
            SimulatedDevice::new(DeviceEventSink::new(tx), durations, &slow_settings());
        device
            .load(LoadToken::new(1), "https://cdn.test/a.mp3")
            .unwrap();

        device.seek(99.0).unwrap();

        assert_eq!(device.state.lock().unwrap().position, 20.0);
    }

    #[test]
    fn session_plays_simulated_episode_to_the_end() {
        use podcast_core::Episode;
        use podcast_playback::{PlayerCommand, PlayerConfig, PlayerEvent};

        let episode = Episode::new(
            "short",
            "Short episode",
            "https://cdn.test/short.mp3",
            Duration::from_secs(3),
        );
        let durations = HashMap::from([(episode.url.clone(), 3.0)]);
        let settings = SimulationSettings {
            tick_ms: 5,
            speed: 200.0,
        };

        let (handle, events, thread) =
            podcast_playback::spawn(PlayerConfig::default(), move |sink| {
                SimulatedDevice::new(sink, durations, &settings)
            })
            .unwrap();

        handle.send(PlayerCommand::Play(episode)).unwrap();

        let mut received = Vec::new();
        loop {
            let event = events
                .recv_timeout(Duration::from_secs(5))
                .expect("episode never finished");
            let done = event == PlayerEvent::PlaylistCleared;
            received.push(event);
            if done {
                break;
            }
        }

        assert!(received.contains(&PlayerEvent::DurationKnown { duration: 3.0 }));
        assert!(received.iter().any(|e| matches!(
            e,
            PlayerEvent::EpisodeFinished { episode_id } if episode_id.as_str() == "short"
        )));

        let status = handle.status().unwrap();
        assert!(status.state.playlist.is_empty());
        assert!(!status.state.is_playing);
        assert_eq!(status.progress, 0.0);

        handle.shutdown().unwrap();
        thread.join().unwrap();
    }
}
