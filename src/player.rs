//! Playback engine interface and the external-process player

use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::{oneshot, watch, Mutex};
use tracing::{debug, info, warn};

use crate::error::{CatalogError, Result};

/// Player state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
    Buffering,
    Error(String),
}

/// What kind of content a playback session carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Live,
    Vod,
    Series,
}

#[async_trait]
pub trait PlaybackEngine: Send + Sync {
    /// Start `url`. With `force_prepare` the source is re-opened even when
    /// it is already the one playing.
    async fn play_media(&self, url: &str, kind: SessionKind, force_prepare: bool) -> Result<()>;

    async fn stop_playback(&self) -> Result<()>;

    fn subscribe(&self) -> watch::Receiver<PlaybackState>;
}

struct RunningPlayer {
    url: String,
    kill: oneshot::Sender<()>,
}

/// Plays through an external player process (ffplay, mpv, vlc, ...)
pub struct ExternalPlayer {
    command: String,
    user_agent: String,
    state: Arc<watch::Sender<PlaybackState>>,
    running: Mutex<Option<RunningPlayer>>,
    generation: Arc<AtomicU64>,
}

impl ExternalPlayer {
    pub fn new(command: &str, user_agent: &str) -> Self {
        let command = if command.is_empty() {
            "ffplay".to_string()
        } else {
            command.to_string()
        };
        let (state, _) = watch::channel(PlaybackState::Idle);

        Self {
            command,
            user_agent: user_agent.to_string(),
            state: Arc::new(state),
            running: Mutex::new(None),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Player-specific arguments
    pub fn build_args(&self, url: &str, kind: SessionKind) -> Vec<String> {
        let player_lower = self.command.to_lowercase();
        let is_live = kind == SessionKind::Live;
        let mut args = vec![url.to_string()];

        if player_lower.contains("ffplay") {
            args.push("-autoexit".to_string());
            if is_live && url.starts_with("http") {
                args.extend([
                    "-reconnect".to_string(), "1".to_string(),
                    "-reconnect_streamed".to_string(), "1".to_string(),
                ]);
            }
            if !self.user_agent.is_empty() {
                args.extend(["-user_agent".to_string(), self.user_agent.clone()]);
            }
        } else if player_lower.contains("mpv") {
            args.push("--force-window=yes".to_string());
            if is_live {
                args.push("--cache=yes".to_string());
                args.push("--stream-lavf-o=reconnect=1".to_string());
            }
            if !self.user_agent.is_empty() {
                args.push(format!("--user-agent={}", self.user_agent));
            }
        } else if player_lower.contains("vlc") {
            args.push("--play-and-exit".to_string());
            if !self.user_agent.is_empty() {
                args.push(format!("--http-user-agent={}", self.user_agent));
            }
        }

        args
    }

    fn kill_running(&self, running: &mut Option<RunningPlayer>) {
        if let Some(player) = running.take() {
            debug!("Closing previous player for {}", player.url);
            let _ = player.kill.send(());
        }
    }
}

#[async_trait]
impl PlaybackEngine for ExternalPlayer {
    async fn play_media(&self, url: &str, kind: SessionKind, force_prepare: bool) -> Result<()> {
        let mut running = self.running.lock().await;

        if !force_prepare {
            if let Some(current) = running.as_ref() {
                if current.url == url && *self.state.borrow() == PlaybackState::Playing {
                    return Ok(());
                }
            }
        }

        self.kill_running(&mut running);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_replace(PlaybackState::Buffering);

        let mut child = match Command::new(&self.command)
            .args(self.build_args(url, kind))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                let message = format!("Failed to launch {}: {}", self.command, e);
                warn!("{}", message);
                self.state.send_replace(PlaybackState::Error(message.clone()));
                return Err(CatalogError::Player(message));
            }
        };

        info!(player = %self.command, "Playing {}", url);
        self.state.send_replace(PlaybackState::Playing);

        let (kill_tx, kill_rx) = oneshot::channel();
        let state = Arc::clone(&self.state);
        let current_generation = Arc::clone(&self.generation);

        tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => {
                    // A newer session owns the state now
                    if current_generation.load(Ordering::SeqCst) != generation {
                        return;
                    }
                    match status {
                        Ok(status) if status.success() => {
                            state.send_replace(PlaybackState::Idle);
                        }
                        Ok(status) => {
                            state.send_replace(PlaybackState::Error(format!("Player exited with {}", status)));
                        }
                        Err(e) => {
                            state.send_replace(PlaybackState::Error(e.to_string()));
                        }
                    }
                }
                _ = kill_rx => {
                    let _ = child.kill().await;
                }
            }
        });

        *running = Some(RunningPlayer {
            url: url.to_string(),
            kill: kill_tx,
        });
        Ok(())
    }

    async fn stop_playback(&self) -> Result<()> {
        let mut running = self.running.lock().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.kill_running(&mut running);
        self.state.send_replace(PlaybackState::Idle);
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state.subscribe()
    }
}
