//! Playback controller - the bridge between playback state and the device
//!
//! The controller is the only component that talks to the [`AudioDevice`].
//! It never owns the [`PlaybackState`]; the session passes it in by `&mut`
//! for every step.
//!
//! Intent and effect are kept apart: the state flags say what *should*
//! happen, and [`PlaybackController::reconcile`] compares them against what
//! was last applied to the device, issuing only the missing commands. A flag
//! transition therefore produces exactly one device command, no matter how
//! often reconcile runs.

use crate::{
    device::{AudioDevice, DeviceEvent, DeviceEventKind, LoadToken},
    error::{DeviceError, PlaybackError},
    events::PlayerEvent,
    state::PlaybackState,
    types::{LoopEndBehavior, PlayerConfig, PlayerPhase},
};
use podcast_core::Episode;
use tracing::{debug, info, warn};

/// A looping device restarts near zero; larger backward jumps are reordering
const LOOP_RESTART_WINDOW: f64 = 1.0;

/// Keeps one audio device aligned with a [`PlaybackState`]
pub struct PlaybackController<D: AudioDevice> {
    device: D,
    loop_end: LoopEndBehavior,

    // Per-episode lifecycle
    phase: PlayerPhase,
    current_token: Option<LoadToken>,
    last_token: LoadToken,

    // What has been applied to the device so far
    applied_selection: Option<u64>,
    applied_playing: Option<bool>,
    applied_looping: Option<bool>,
    observed_shuffling: Option<bool>,

    // Progress in seconds, reset on every episode change
    progress: f64,
    duration: Option<f64>,

    last_error: Option<PlaybackError>,
    pending_events: Vec<PlayerEvent>,
}

impl<D: AudioDevice> PlaybackController<D> {
    /// Create a controller that owns `device`
    pub fn new(device: D, config: &PlayerConfig) -> Self {
        Self {
            device,
            loop_end: config.loop_end,
            phase: PlayerPhase::Idle,
            current_token: None,
            last_token: LoadToken::new(0),
            applied_selection: None,
            applied_playing: None,
            applied_looping: None,
            observed_shuffling: None,
            progress: 0.0,
            duration: None,
            last_error: None,
            pending_events: Vec::new(),
        }
    }

    // ===== Reconciliation =====

    /// Bring the device in line with the state
    ///
    /// Safe to call any number of times; commands are only issued for
    /// differences from what was last applied.
    pub fn reconcile(&mut self, state: &mut PlaybackState) {
        if self.applied_selection != Some(state.selection_id()) {
            self.applied_selection = Some(state.selection_id());
            match state.current_episode().cloned() {
                Some(episode) => self.begin_loading(state, &episode),
                None => self.enter_idle(),
            }
        }

        // A play request after a failed load is the user's explicit retry
        if self.phase == PlayerPhase::Unavailable && state.is_playing() {
            if let Some(episode) = state.current_episode().cloned() {
                info!("Retrying unavailable episode {}", episode.id);
                self.begin_loading(state, &episode);
            }
        }

        self.sync_looping(state);
        self.sync_shuffling(state);
        self.sync_playing(state);
    }

    fn begin_loading(&mut self, state: &mut PlaybackState, episode: &Episode) {
        let token = self.last_token.next();
        self.last_token = token;
        self.current_token = Some(token);

        self.set_phase(PlayerPhase::Loading);
        self.duration = None;
        self.last_error = None;
        self.applied_playing = None;
        self.reset_progress();

        info!(
            "Loading episode {} ({}) as {}",
            episode.id, episode.title, token
        );
        self.emit(PlayerEvent::EpisodeChanged {
            index: state.current_index(),
            episode_id: episode.id.clone(),
            title: episode.title.clone(),
        });

        if let Err(e) = self.device.load(token, &episode.url) {
            self.mark_unavailable(state, e.to_string());
            return;
        }

        // Rewind even if the device kept a position for this source
        if let Err(e) = self.device.seek(0.0) {
            warn!("Device refused to rewind {}: {}", token, e);
        }
    }

    fn enter_idle(&mut self) {
        let was_active = self.phase != PlayerPhase::Idle;

        if self.applied_playing == Some(true) {
            if let Err(e) = self.device.pause() {
                warn!("Failed to pause device while clearing: {}", e);
            }
        }

        self.current_token = None;
        self.applied_playing = None;
        self.duration = None;

        if was_active {
            info!("Playlist cleared, controller idle");
            self.set_phase(PlayerPhase::Idle);
            self.emit(PlayerEvent::PlaylistCleared);
            self.reset_progress();
        }
    }

    fn sync_looping(&mut self, state: &PlaybackState) {
        let looping = state.is_looping();
        if self.applied_looping == Some(looping) {
            return;
        }

        // Applied either way; a refused setting is not retried
        self.applied_looping = Some(looping);
        match self.device.set_loop(looping) {
            Ok(()) => self.emit(PlayerEvent::LoopingChanged {
                is_looping: looping,
            }),
            Err(e) => self.report_device_error("set loop", &e),
        }
    }

    fn sync_shuffling(&mut self, state: &PlaybackState) {
        let shuffling = state.is_shuffling();
        if self.observed_shuffling != Some(shuffling) {
            self.observed_shuffling = Some(shuffling);
            self.emit(PlayerEvent::ShufflingChanged {
                is_shuffling: shuffling,
            });
        }
    }

    fn sync_playing(&mut self, state: &mut PlaybackState) {
        let wanted = state.is_playing();
        if self.applied_playing == Some(wanted) {
            return;
        }

        match self.phase {
            PlayerPhase::Loading | PlayerPhase::Ready => {}
            PlayerPhase::Idle | PlayerPhase::Unavailable => return,
        }

        let result = if wanted {
            self.device.play()
        } else {
            self.device.pause()
        };

        match result {
            Ok(()) => {
                debug!("Device {}", if wanted { "playing" } else { "paused" });
                self.applied_playing = Some(wanted);
                self.emit(PlayerEvent::PlayingChanged { is_playing: wanted });
            }
            Err(e) if wanted => self.mark_unavailable(state, e.to_string()),
            Err(e) => {
                self.applied_playing = Some(false);
                self.report_device_error("pause", &e);
            }
        }
    }

    // ===== Device events =====

    /// Apply an event reported by the device
    ///
    /// Events tagged with a token other than the current load are stale and
    /// dropped without touching progress or state.
    pub fn handle_device_event(&mut self, state: &mut PlaybackState, event: DeviceEvent) {
        if self.current_token != Some(event.token) {
            debug!("Discarding stale {:?} for {}", event.kind, event.token);
            return;
        }

        match event.kind {
            DeviceEventKind::Ready { duration } => {
                self.set_phase(PlayerPhase::Ready);
                // Streams report an infinite or NaN length until it is known
                if duration.is_finite() {
                    let duration = duration.max(0.0);
                    debug!("{} ready, duration {:.1}s", event.token, duration);
                    self.duration = Some(duration);
                    self.emit(PlayerEvent::DurationKnown { duration });
                } else {
                    debug!("{} ready, duration unknown", event.token);
                    self.duration = None;
                }
            }
            DeviceEventKind::TimeUpdate { position } => self.sample_time(state, position),
            DeviceEventKind::Started => self.device_reported_playing(state, true),
            DeviceEventKind::Paused => self.device_reported_playing(state, false),
            DeviceEventKind::Ended => self.handle_ended(state),
            DeviceEventKind::Failed { reason } => self.mark_unavailable(state, reason),
        }

        self.reconcile(state);
    }

    fn sample_time(&mut self, state: &PlaybackState, position: f64) {
        if !position.is_finite() || position < 0.0 {
            debug!("Ignoring invalid time update {}", position);
            return;
        }

        // Progress only moves forward within a track, except when the
        // device wraps around to the start on its own loop
        let wrapped = state.is_looping() && position <= LOOP_RESTART_WINDOW;
        if position < self.progress && !wrapped {
            debug!(
                "Ignoring out-of-order time update {:.2}s (progress {:.2}s)",
                position, self.progress
            );
            return;
        }

        self.progress = position;
        self.emit(PlayerEvent::ProgressChanged { position });
    }

    fn device_reported_playing(&mut self, state: &mut PlaybackState, playing: bool) {
        // The device is the authority on what is actually happening
        self.applied_playing = Some(playing);
        if state.is_playing() != playing {
            debug!("Device reports playing={}, realigning state", playing);
            state.set_playing_state(playing);
            self.emit(PlayerEvent::PlayingChanged {
                is_playing: playing,
            });
        }
    }

    fn handle_ended(&mut self, state: &mut PlaybackState) {
        if state.is_looping() {
            match self.loop_end {
                LoopEndBehavior::Restart => self.restart_current(state),
                LoopEndBehavior::Ignore => debug!("Ignoring end-of-track while looping"),
            }
            return;
        }

        if let Some(episode) = state.current_episode() {
            info!("Episode {} finished", episode.id);
            let episode_id = episode.id.clone();
            self.emit(PlayerEvent::EpisodeFinished { episode_id });
        }

        // The device stopped by itself; nothing to pause
        self.applied_playing = Some(false);

        // Clearing resets progress when reconcile enters idle
        if state.has_next() {
            state.play_next();
        } else {
            state.clear_player_state();
        }
    }

    fn restart_current(&mut self, state: &mut PlaybackState) {
        debug!("End-of-track while looping, restarting episode");
        self.reset_progress();

        if let Err(e) = self.device.seek(0.0) {
            self.report_device_error("rewind", &e);
        }

        if state.is_playing() {
            match self.device.play() {
                Ok(()) => self.applied_playing = Some(true),
                Err(e) => self.mark_unavailable(state, e.to_string()),
            }
        }
    }

    fn mark_unavailable(&mut self, state: &mut PlaybackState, reason: String) {
        let episode = state.current_episode();
        let episode_id = episode.map(|e| e.id.clone());
        let url = episode.map(|e| e.url.clone()).unwrap_or_default();

        warn!("Episode unavailable ({}): {}", url, reason);

        // Later events from this load are stale
        self.current_token = None;
        self.duration = None;
        self.set_phase(PlayerPhase::Unavailable);

        self.applied_playing = Some(false);
        if state.is_playing() {
            state.set_playing_state(false);
            self.emit(PlayerEvent::PlayingChanged { is_playing: false });
        }

        self.emit(PlayerEvent::EpisodeUnavailable {
            episode_id,
            url: url.clone(),
            reason: reason.clone(),
        });
        self.last_error = Some(PlaybackError::EpisodeUnavailable { url, reason });
    }

    // ===== User commands =====

    /// Move the device to `seconds` and update progress right away
    ///
    /// Clamped to `[0, duration]` once the duration is known. Inert when no
    /// episode is loaded.
    pub fn seek(&mut self, seconds: f64) {
        if !matches!(self.phase, PlayerPhase::Loading | PlayerPhase::Ready) {
            debug!("Seek ignored in {:?}", self.phase);
            return;
        }
        if !seconds.is_finite() {
            debug!("Seek ignored, invalid position {}", seconds);
            return;
        }

        let mut target = seconds.max(0.0);
        if let Some(duration) = self.duration {
            target = target.min(duration);
        }

        match self.device.seek(target) {
            Ok(()) => {
                self.progress = target;
                self.emit(PlayerEvent::ProgressChanged { position: target });
            }
            Err(e) => self.report_device_error("seek", &e),
        }
    }

    // ===== Queries =====

    pub fn phase(&self) -> PlayerPhase {
        self.phase
    }

    /// Seconds elapsed in the current episode
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Duration reported by the device, once ready
    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// Token of the load events are currently accepted for
    pub fn current_token(&self) -> Option<LoadToken> {
        self.current_token
    }

    /// Why the current episode could not be played, if it could not
    pub fn last_error(&self) -> Option<&PlaybackError> {
        self.last_error.as_ref()
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    // ===== Events =====

    /// Take all events queued since the last drain
    ///
    /// Hosts driving the controller or a session directly must drain after
    /// each step. Consecutive progress updates are coalesced, so an undrained
    /// queue only grows with discrete changes.
    pub fn drain_events(&mut self) -> Vec<PlayerEvent> {
        std::mem::take(&mut self.pending_events)
    }

    pub fn has_pending_events(&self) -> bool {
        !self.pending_events.is_empty()
    }

    fn emit(&mut self, event: PlayerEvent) {
        if let (
            PlayerEvent::ProgressChanged { .. },
            Some(PlayerEvent::ProgressChanged { .. }),
        ) = (&event, self.pending_events.last())
        {
            self.pending_events.pop();
        }
        self.pending_events.push(event);
    }

    fn set_phase(&mut self, phase: PlayerPhase) {
        if self.phase != phase {
            self.phase = phase;
            self.emit(PlayerEvent::PhaseChanged { phase });
        }
    }

    fn reset_progress(&mut self) {
        self.progress = 0.0;
        self.emit(PlayerEvent::ProgressChanged { position: 0.0 });
    }

    fn report_device_error(&mut self, action: &str, error: &DeviceError) {
        warn!("Device failed to {}: {}", action, error);
        self.emit(PlayerEvent::Error {
            message: format!("Failed to {}: {}", action, error),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MockAudioDevice;
    use std::time::Duration;

    fn create_test_episode(id: &str) -> Episode {
        Episode::new(
            id,
            format!("Episode {}", id),
            format!("https://cdn.test/{}.mp3", id),
            Duration::from_secs(120),
        )
    }

    fn permissive_device() -> MockAudioDevice {
        let mut device = MockAudioDevice::new();
        device.expect_load().returning(|_, _| Ok(()));
        device.expect_seek().returning(|_| Ok(()));
        device.expect_set_loop().returning(|_| Ok(()));
        device
    }

    #[test]
    fn empty_state_issues_only_loop_setting() {
        let mut device = MockAudioDevice::new();
        device.expect_set_loop().times(1).returning(|_| Ok(()));

        let mut state = PlaybackState::default();
        let mut controller = PlaybackController::new(device, &PlayerConfig::default());

        controller.reconcile(&mut state);
        controller.reconcile(&mut state);

        assert_eq!(controller.phase(), PlayerPhase::Idle);
        assert_eq!(controller.current_token(), None);
    }

    #[test]
    fn play_is_issued_once_per_transition() {
        let mut device = permissive_device();
        device.expect_play().times(1).returning(|| Ok(()));

        let mut state = PlaybackState::default();
        let mut controller = PlaybackController::new(device, &PlayerConfig::default());

        state.play(create_test_episode("a"));
        controller.reconcile(&mut state);
        controller.reconcile(&mut state);
        controller.reconcile(&mut state);

        assert_eq!(controller.phase(), PlayerPhase::Loading);
    }

    #[test]
    fn toggle_play_pauses_once() {
        let mut device = permissive_device();
        device.expect_play().times(1).returning(|| Ok(()));
        device.expect_pause().times(1).returning(|| Ok(()));

        let mut state = PlaybackState::default();
        let mut controller = PlaybackController::new(device, &PlayerConfig::default());

        state.play(create_test_episode("a"));
        controller.reconcile(&mut state);

        state.toggle_play();
        controller.reconcile(&mut state);
        controller.reconcile(&mut state);

        assert!(!state.is_playing());
    }

    #[test]
    fn loading_rewinds_the_device() {
        let mut device = MockAudioDevice::new();
        device.expect_set_loop().returning(|_| Ok(()));
        device
            .expect_load()
            .withf(|token, url| token.value() == 1 && url.to_string() == "https://cdn.test/a.mp3")
            .times(1)
            .returning(|_, _| Ok(()));
        device
            .expect_seek()
            .withf(|seconds| *seconds == 0.0)
            .times(1)
            .returning(|_| Ok(()));
        device.expect_play().returning(|| Ok(()));

        let mut state = PlaybackState::default();
        let mut controller = PlaybackController::new(device, &PlayerConfig::default());

        state.play(create_test_episode("a"));
        controller.reconcile(&mut state);

        assert_eq!(controller.current_token(), Some(LoadToken::new(1)));
        assert_eq!(controller.progress(), 0.0);
    }

    #[test]
    fn loop_flag_is_forwarded_once_per_change() {
        let mut device = MockAudioDevice::new();
        device
            .expect_set_loop()
            .withf(|looping| !*looping)
            .times(1)
            .returning(|_| Ok(()));
        device
            .expect_set_loop()
            .withf(|looping| *looping)
            .times(1)
            .returning(|_| Ok(()));

        let mut state = PlaybackState::default();
        let mut controller = PlaybackController::new(device, &PlayerConfig::default());

        controller.reconcile(&mut state);
        state.toggle_loop();
        controller.reconcile(&mut state);
        controller.reconcile(&mut state);

        let events = controller.drain_events();
        assert!(events.contains(&PlayerEvent::LoopingChanged { is_looping: true }));
    }

    #[test]
    fn load_failure_marks_episode_unavailable() {
        let mut device = MockAudioDevice::new();
        device.expect_set_loop().returning(|_| Ok(()));
        device
            .expect_load()
            .times(1)
            .returning(|_, _| Err(DeviceError::SourceUnavailable("404".to_string())));
        device.expect_play().never();

        let mut state = PlaybackState::default();
        let mut controller = PlaybackController::new(device, &PlayerConfig::default());

        state.play(create_test_episode("broken"));
        controller.reconcile(&mut state);

        assert_eq!(controller.phase(), PlayerPhase::Unavailable);
        assert!(!state.is_playing());
        assert!(matches!(
            controller.last_error(),
            Some(PlaybackError::EpisodeUnavailable { .. })
        ));

        let events = controller.drain_events();
        assert!(events.iter().any(|e| matches!(
            e,
            PlayerEvent::EpisodeUnavailable { url, .. } if url == "https://cdn.test/broken.mp3"
        )));
    }

    #[test]
    fn device_started_does_not_echo_a_play_command() {
        let mut device = permissive_device();
        device.expect_pause().times(1).returning(|| Ok(()));
        device.expect_play().never();

        let mut state = PlaybackState::default();
        let mut controller = PlaybackController::new(device, &PlayerConfig::default());

        state.play(create_test_episode("a"));
        state.set_playing_state(false);
        controller.reconcile(&mut state);

        let token = controller.current_token().unwrap();
        controller.handle_device_event(&mut state, DeviceEvent::started(token));

        assert!(state.is_playing());
    }

    #[test]
    fn seek_before_load_is_inert() {
        let mut device = MockAudioDevice::new();
        device.expect_set_loop().returning(|_| Ok(()));
        device.expect_seek().never();

        let mut state = PlaybackState::default();
        let mut controller = PlaybackController::new(device, &PlayerConfig::default());
        controller.reconcile(&mut state);

        controller.seek(30.0);
        assert_eq!(controller.progress(), 0.0);
    }
}
