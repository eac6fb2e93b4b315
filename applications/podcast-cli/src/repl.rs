//! Interactive command loop

use crate::config::AppConfig;
use crate::device::SimulatedDevice;
use anyhow::{anyhow, Context};
use podcast_core::{Episode, EpisodeListing};
use podcast_playback::{PlayerCommand, PlayerEvent, PlayerHandle, PlayerPhase, PlayerStatus};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

/// One line typed by the user
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    /// Play a single episode by listing position
    Play(usize),
    /// Play the whole listing starting at a position
    List(usize),
    Next,
    Previous,
    Random,
    Toggle,
    Loop,
    Shuffle,
    Seek(f64),
    Clear,
    Status,
    Episodes,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseCommandError {
    #[error("Unknown command: {0} (type 'help')")]
    Unknown(String),

    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),

    #[error("Invalid argument for '{command}': {value}")]
    InvalidArgument { command: &'static str, value: String },
}

impl FromStr for ReplCommand {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Err(ParseCommandError::Unknown(String::new()));
        };
        let argument = words.next();

        let command = match name.to_ascii_lowercase().as_str() {
            "play" | "p" => Self::Play(parse_argument("play", argument)?),
            "list" | "l" => Self::List(parse_argument("list", argument)?),
            "seek" | "s" => Self::Seek(parse_argument("seek", argument)?),
            "next" | "n" => Self::Next,
            "prev" | "previous" => Self::Previous,
            "random" | "r" => Self::Random,
            "toggle" | "t" | "pause" => Self::Toggle,
            "loop" => Self::Loop,
            "shuffle" => Self::Shuffle,
            "clear" => Self::Clear,
            "status" | "st" => Self::Status,
            "episodes" | "ls" => Self::Episodes,
            "help" | "?" => Self::Help,
            "quit" | "q" | "exit" => Self::Quit,
            _ => return Err(ParseCommandError::Unknown(name.to_string())),
        };
        Ok(command)
    }
}

fn parse_argument<T: FromStr>(
    command: &'static str,
    argument: Option<&str>,
) -> Result<T, ParseCommandError> {
    let value = argument.ok_or(ParseCommandError::MissingArgument(command))?;
    value
        .parse()
        .map_err(|_| ParseCommandError::InvalidArgument {
            command,
            value: value.to_string(),
        })
}

/// Translate a user command into a session command
///
/// Returns `None` for commands handled by the REPL itself and for positions
/// outside the listing.
pub fn to_player_command(command: &ReplCommand, episodes: &[Episode]) -> Option<PlayerCommand> {
    let command = match command {
        ReplCommand::Play(index) => PlayerCommand::Play(episodes.get(*index)?.clone()),
        ReplCommand::List(index) => {
            if *index >= episodes.len() {
                return None;
            }
            PlayerCommand::PlayList {
                episodes: episodes.to_vec(),
                index: *index,
            }
        }
        ReplCommand::Next => PlayerCommand::Next,
        ReplCommand::Previous => PlayerCommand::Previous,
        ReplCommand::Random => PlayerCommand::Random,
        ReplCommand::Toggle => PlayerCommand::TogglePlay,
        ReplCommand::Loop => PlayerCommand::ToggleLoop,
        ReplCommand::Shuffle => PlayerCommand::ToggleShuffle,
        ReplCommand::Seek(seconds) => PlayerCommand::Seek(*seconds),
        ReplCommand::Clear => PlayerCommand::Clear,
        ReplCommand::Status | ReplCommand::Episodes | ReplCommand::Help | ReplCommand::Quit => {
            return None
        }
    };
    Some(command)
}

/// Run the player until the user quits or stdin closes
pub async fn run(
    config: &AppConfig,
    listing: EpisodeListing,
    start: Option<usize>,
) -> anyhow::Result<()> {
    let episodes = listing.playlist();
    let durations: HashMap<String, f64> = episodes
        .iter()
        .map(|episode| (episode.url.clone(), episode.duration.as_secs_f64()))
        .collect();

    let simulation = config.simulation.clone();
    let (handle, events, session_thread) =
        podcast_playback::spawn(config.player.clone(), move |sink| {
            SimulatedDevice::new(sink, durations, &simulation)
        })
        .context("Failed to start playback session")?;

    let printer = tokio::task::spawn_blocking(move || {
        for event in events.iter() {
            if let Some(line) = describe_event(&event) {
                println!("{}", line);
            }
        }
    });

    if let Some(index) = start {
        dispatch(&handle, &ReplCommand::List(index), &episodes)?;
    }

    print_help();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let command = match line.parse::<ReplCommand>() {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };
        debug!("REPL command {:?}", command);

        match command {
            ReplCommand::Quit => break,
            ReplCommand::Help => print_help(),
            ReplCommand::Episodes => print_listing(&listing),
            ReplCommand::Status => {
                let status = request_status(&handle).await?;
                println!("{}", describe_status(&status));
            }
            other => dispatch(&handle, &other, &episodes)?,
        }
    }

    info!("Shutting down player");
    handle.shutdown()?;
    tokio::task::spawn_blocking(move || session_thread.join())
        .await?
        .map_err(|_| anyhow!("Playback session thread panicked"))?;
    printer.await?;

    Ok(())
}

/// Wait for a status reply on the blocking pool, keeping stdin responsive
async fn request_status(handle: &PlayerHandle) -> anyhow::Result<PlayerStatus> {
    let handle = handle.clone();
    let status = tokio::task::spawn_blocking(move || handle.status()).await??;
    Ok(status)
}

fn dispatch(
    handle: &PlayerHandle,
    command: &ReplCommand,
    episodes: &[Episode],
) -> anyhow::Result<()> {
    match to_player_command(command, episodes) {
        Some(command) => handle.send(command)?,
        None => println!(
            "No episode at that position (0-{})",
            episodes.len().saturating_sub(1)
        ),
    }
    Ok(())
}

/// Print the home listing: latest episodes first, then the rest
pub fn print_listing(listing: &EpisodeListing) {
    if listing.latest.is_empty() {
        println!("The catalog has no episodes.");
        return;
    }

    println!("Latest episodes");
    for (index, episode) in listing.latest.iter().enumerate() {
        println!("{}", describe_episode(index, episode));
    }

    if !listing.all.is_empty() {
        println!();
        println!("All episodes");
        let offset = listing.latest.len();
        for (index, episode) in listing.all.iter().enumerate() {
            println!("{}", describe_episode(offset + index, episode));
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  play N     play episode N on its own");
    println!("  list N     play the listing starting at episode N");
    println!("  next, prev, random");
    println!("  toggle     play/pause");
    println!("  loop, shuffle");
    println!("  seek S     jump to S seconds");
    println!("  clear, status, episodes, help, quit");
}

fn describe_episode(index: usize, episode: &Episode) -> String {
    let mut line = format!(
        "  [{:>2}] {} ({})",
        index,
        episode.title,
        format_clock(episode.duration.as_secs_f64())
    );
    if !episode.members.is_empty() {
        line.push_str(" - ");
        line.push_str(&episode.members);
    }
    line
}

/// One line per event worth showing; progress ticks are left to `status`
pub fn describe_event(event: &PlayerEvent) -> Option<String> {
    let line = match event {
        PlayerEvent::EpisodeChanged { index, title, .. } => {
            format!("> Now playing [{}] {}", index, title)
        }
        PlayerEvent::PlayingChanged { is_playing: true } => "> Playing".to_string(),
        PlayerEvent::PlayingChanged { is_playing: false } => "> Paused".to_string(),
        PlayerEvent::LoopingChanged { is_looping } => format!("> Loop {}", on_off(*is_looping)),
        PlayerEvent::ShufflingChanged { is_shuffling } => {
            format!("> Shuffle {}", on_off(*is_shuffling))
        }
        PlayerEvent::DurationKnown { duration } => {
            format!("> Duration {}", format_clock(*duration))
        }
        PlayerEvent::EpisodeFinished { episode_id } => format!("> Finished {}", episode_id),
        PlayerEvent::PlaylistCleared => "> Playlist cleared".to_string(),
        PlayerEvent::EpisodeUnavailable { url, reason, .. } => {
            format!("! Cannot play {}: {}", url, reason)
        }
        PlayerEvent::Error { message } => format!("! {}", message),
        PlayerEvent::PhaseChanged { .. } | PlayerEvent::ProgressChanged { .. } => return None,
    };
    Some(line)
}

pub fn describe_status(status: &PlayerStatus) -> String {
    let state = &status.state;
    let Some(episode) = &state.current_episode else {
        return format!(
            "Nothing playing (loop {}, shuffle {})",
            on_off(state.is_looping),
            on_off(state.is_shuffling)
        );
    };

    let position = match status.duration {
        Some(duration) => format!(
            "{} / {}",
            format_clock(status.progress),
            format_clock(duration)
        ),
        None => format_clock(status.progress),
    };
    let phase = match status.phase {
        PlayerPhase::Loading => "loading",
        PlayerPhase::Unavailable => "unavailable",
        PlayerPhase::Ready if state.is_playing => "playing",
        PlayerPhase::Ready | PlayerPhase::Idle => "paused",
    };

    let mut line = format!(
        "[{}/{}] {} - {} ({}) loop {}, shuffle {}",
        state.current_index,
        state.playlist.len(),
        episode.title,
        position,
        phase,
        on_off(state.is_looping),
        on_off(state.is_shuffling)
    );
    if let Some(error) = &status.last_error {
        line.push_str(&format!("\n  last error: {}", error));
    }
    line
}

/// Format seconds as `m:ss`, or `h:mm:ss` past the hour
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}
