//! Playback session - single owner of state and controller
//!
//! A [`PlayerSession`] owns the [`PlaybackState`] and the
//! [`PlaybackController`] for one listening session. Every user command and
//! every device event goes through it, one at a time, so the state is never
//! mutated concurrently.
//!
//! Hosts either drive a session directly (tests, embedded UIs with their own
//! loop) or [`spawn`] it on a dedicated thread and talk to it through a
//! [`PlayerHandle`].

use crate::{
    controller::PlaybackController,
    device::{AudioDevice, DeviceEvent},
    error::{PlaybackError, Result},
    events::PlayerEvent,
    state::{PlaybackSnapshot, PlaybackState},
    types::{PlayerConfig, PlayerPhase},
};
use crossbeam_channel::{bounded, never, select, unbounded, Receiver, Sender};
use podcast_core::Episode;
use serde::{Deserialize, Serialize};
use std::thread::JoinHandle;
use tracing::{debug, info};

/// Commands a UI can issue
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    /// Play a single episode
    Play(Episode),

    /// Replace the playlist and start at an index
    PlayList { episodes: Vec<Episode>, index: usize },

    /// Next episode (random while shuffling)
    Next,

    /// Previous episode (random while shuffling)
    Previous,

    /// Random episode from the playlist
    Random,

    TogglePlay,
    ToggleLoop,
    ToggleShuffle,

    /// Overwrite the playing flag
    SetPlaying(bool),

    /// Empty the playlist and stop
    Clear,

    /// Seek within the current episode (seconds)
    Seek(f64),
}

/// Messages processed by the session loop
#[derive(Debug)]
pub enum SessionMessage {
    Command(PlayerCommand),
    Device(DeviceEvent),
    Status(Sender<PlayerStatus>),
    Shutdown,
}

/// Everything a UI needs to render the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStatus {
    pub state: PlaybackSnapshot,
    pub phase: PlayerPhase,
    pub progress: f64,
    pub duration: Option<f64>,
    pub last_error: Option<String>,
}

/// Owns the playback state and the device bridge for one session
pub struct PlayerSession<D: AudioDevice> {
    state: PlaybackState,
    controller: PlaybackController<D>,
}

impl<D: AudioDevice> PlayerSession<D> {
    /// Create a session and apply the initial configuration to the device
    pub fn new(device: D, config: &PlayerConfig) -> Self {
        let mut session = Self {
            state: PlaybackState::new(config),
            controller: PlaybackController::new(device, config),
        };
        session.controller.reconcile(&mut session.state);
        session
    }

    /// Apply a user command, then reconcile the device
    pub fn execute(&mut self, command: PlayerCommand) {
        debug!("Executing {:?}", command);
        match command {
            PlayerCommand::Play(episode) => self.state.play(episode),
            PlayerCommand::PlayList { episodes, index } => self.state.play_list(episodes, index),
            PlayerCommand::Next => self.state.play_next(),
            PlayerCommand::Previous => self.state.play_previous(),
            PlayerCommand::Random => self.state.play_random(),
            PlayerCommand::TogglePlay => self.state.toggle_play(),
            PlayerCommand::ToggleLoop => self.state.toggle_loop(),
            PlayerCommand::ToggleShuffle => self.state.toggle_shuffle(),
            PlayerCommand::SetPlaying(playing) => self.state.set_playing_state(playing),
            PlayerCommand::Clear => self.state.clear_player_state(),
            PlayerCommand::Seek(seconds) => self.controller.seek(seconds),
        }
        self.controller.reconcile(&mut self.state);
    }

    /// Apply an event reported by the device
    pub fn handle_device_event(&mut self, event: DeviceEvent) {
        self.controller.handle_device_event(&mut self.state, event);
    }

    /// Process one loop message; returns false once the session should stop
    pub fn handle_message(&mut self, message: SessionMessage) -> bool {
        match message {
            SessionMessage::Command(command) => self.execute(command),
            SessionMessage::Device(event) => self.handle_device_event(event),
            SessionMessage::Status(reply) => {
                // Requester may have given up waiting
                reply.send(self.status()).ok();
            }
            SessionMessage::Shutdown => return false,
        }
        true
    }

    /// Run the event loop until shutdown or until every command sender is gone
    ///
    /// Device events arrive on their own channel, so a device holding its
    /// sink does not keep the loop alive. Events produced by each message are
    /// forwarded to `events` before the next message is taken.
    pub fn run(
        mut self,
        inbox: Receiver<SessionMessage>,
        mut device_events: Receiver<DeviceEvent>,
        events: Sender<PlayerEvent>,
    ) -> Self {
        info!("Playback session started");
        self.forward_events(&events);

        loop {
            let mut sinks_gone = false;
            let keep_running = select! {
                recv(inbox) -> message => match message {
                    Ok(message) => self.handle_message(message),
                    Err(_) => {
                        debug!("All command handles dropped");
                        false
                    }
                },
                recv(device_events) -> event => {
                    match event {
                        Ok(event) => self.handle_device_event(event),
                        Err(_) => sinks_gone = true,
                    }
                    true
                },
            };
            // Every sink is gone; keep serving commands
            if sinks_gone {
                device_events = never();
            }
            self.forward_events(&events);
            if !keep_running {
                break;
            }
        }

        info!("Playback session stopped");
        self
    }

    fn forward_events(&mut self, events: &Sender<PlayerEvent>) {
        for event in self.controller.drain_events() {
            // Nobody listening is not an error for playback
            if events.send(event).is_err() {
                break;
            }
        }
    }

    // ===== Command surface =====

    pub fn play(&mut self, episode: Episode) {
        self.execute(PlayerCommand::Play(episode));
    }

    pub fn play_list(&mut self, episodes: Vec<Episode>, index: usize) {
        self.execute(PlayerCommand::PlayList { episodes, index });
    }

    pub fn play_next(&mut self) {
        self.execute(PlayerCommand::Next);
    }

    pub fn play_previous(&mut self) {
        self.execute(PlayerCommand::Previous);
    }

    pub fn play_random(&mut self) {
        self.execute(PlayerCommand::Random);
    }

    pub fn toggle_play(&mut self) {
        self.execute(PlayerCommand::TogglePlay);
    }

    pub fn toggle_loop(&mut self) {
        self.execute(PlayerCommand::ToggleLoop);
    }

    pub fn toggle_shuffle(&mut self) {
        self.execute(PlayerCommand::ToggleShuffle);
    }

    pub fn set_playing_state(&mut self, playing: bool) {
        self.execute(PlayerCommand::SetPlaying(playing));
    }

    pub fn clear_player_state(&mut self) {
        self.execute(PlayerCommand::Clear);
    }

    pub fn seek(&mut self, seconds: f64) {
        self.execute(PlayerCommand::Seek(seconds));
    }

    // ===== Queries =====

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn controller(&self) -> &PlaybackController<D> {
        &self.controller
    }

    pub fn device(&self) -> &D {
        self.controller.device()
    }

    pub fn device_mut(&mut self) -> &mut D {
        self.controller.device_mut()
    }

    pub fn progress(&self) -> f64 {
        self.controller.progress()
    }

    pub fn has_next(&self) -> bool {
        self.state.has_next()
    }

    pub fn has_previous(&self) -> bool {
        self.state.has_previous()
    }

    pub fn status(&self) -> PlayerStatus {
        PlayerStatus {
            state: self.state.snapshot(),
            phase: self.controller.phase(),
            progress: self.controller.progress(),
            duration: self.controller.duration(),
            last_error: self.controller.last_error().map(ToString::to_string),
        }
    }

    pub fn drain_events(&mut self) -> Vec<PlayerEvent> {
        self.controller.drain_events()
    }
}

/// Posts device events into a running session
#[derive(Debug, Clone)]
pub struct DeviceEventSink {
    tx: Sender<DeviceEvent>,
}

impl DeviceEventSink {
    /// Sink feeding a channel the host drains itself
    pub fn new(tx: Sender<DeviceEvent>) -> Self {
        Self { tx }
    }

    /// Queue an event; returns false once the session has stopped
    pub fn emit(&self, event: DeviceEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Sends commands to a spawned session
///
/// The session stops once every handle is dropped.
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    tx: Sender<SessionMessage>,
    device_tx: Sender<DeviceEvent>,
}

impl PlayerHandle {
    pub fn send(&self, command: PlayerCommand) -> Result<()> {
        self.tx
            .send(SessionMessage::Command(command))
            .map_err(|_| PlaybackError::SessionClosed)
    }

    /// Ask the session for a status snapshot and wait for the reply
    pub fn status(&self) -> Result<PlayerStatus> {
        let (reply_tx, reply_rx) = bounded(1);
        self.tx
            .send(SessionMessage::Status(reply_tx))
            .map_err(|_| PlaybackError::SessionClosed)?;
        reply_rx.recv().map_err(|_| PlaybackError::SessionClosed)
    }

    /// Sink a device can use to report events into this session
    pub fn device_sink(&self) -> DeviceEventSink {
        DeviceEventSink::new(self.device_tx.clone())
    }

    pub fn shutdown(&self) -> Result<()> {
        self.tx
            .send(SessionMessage::Shutdown)
            .map_err(|_| PlaybackError::SessionClosed)
    }
}

/// Start a session on its own thread
///
/// The device is built on the session thread from `make_device`, which gets
/// a sink for reporting events back. Returns the command handle, the UI
/// event stream, and the thread handle.
///
/// Both channels are unbounded: devices post events from inside the session
/// thread and must never block on it.
pub fn spawn<D, F>(
    config: PlayerConfig,
    make_device: F,
) -> Result<(PlayerHandle, Receiver<PlayerEvent>, JoinHandle<()>)>
where
    D: AudioDevice + 'static,
    F: FnOnce(DeviceEventSink) -> D + Send + 'static,
{
    let (command_tx, command_rx) = unbounded();
    let (device_tx, device_rx) = unbounded();
    let (event_tx, event_rx) = unbounded();

    let sink = DeviceEventSink::new(device_tx.clone());

    let thread = std::thread::Builder::new()
        .name("podcast-session".to_string())
        .spawn(move || {
            let device = make_device(sink);
            let session = PlayerSession::new(device, &config);
            session.run(command_rx, device_rx, event_tx);
        })?;

    let handle = PlayerHandle {
        tx: command_tx,
        device_tx,
    };
    Ok((handle, event_rx, thread))
}
