//! # Playback State Machine
//!
//! Owns the single [`PlayerState`] of a session and reconciles user intents
//! with notifications from the media backend.
//!
//! ```text
//!   select ─► Loading ──playing──► Playing ◄──toggle──► Paused
//!                                     │  ▲
//!                                   ended │ toggle (seek 0)
//!                                     ▼  │
//!                                     Done
//!
//!   any ──abort/error──► Idle
//! ```
//!
//! Every `select_song` starts a new [`LoadGeneration`]. Backend events
//! stamped with an older generation are discarded, so a slow load that is
//! superseded by a newer selection can never touch the state again.
//!
//! Transitions are serialized: intents and backend events are applied one at
//! a time, each against the state left by the previous one. The state is
//! published through a `watch` channel; subscribers only ever read it.

use std::sync::Arc;

use bridge_traits::error::BridgeError;
use bridge_traits::playback::{LoadGeneration, MediaBackend, MediaEvent, MediaEventEnvelope};
use core_library::Song;
use futures::{pin_mut, Stream, StreamExt};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::error::{PlaybackError, Result};
use crate::resolver::SongUrlResolver;
use crate::state::{PlayerState, PlayerStatus};

pub struct PlaybackStateMachine {
    backend: Arc<dyn MediaBackend>,
    resolver: Arc<dyn SongUrlResolver>,
    state: watch::Sender<PlayerState>,
    transitions: Mutex<()>,
}

impl PlaybackStateMachine {
    pub fn new(backend: Arc<dyn MediaBackend>, resolver: Arc<dyn SongUrlResolver>) -> Self {
        let (state, _) = watch::channel(PlayerState::default());
        Self {
            backend,
            resolver,
            state,
            transitions: Mutex::new(()),
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> PlayerState {
        self.state.borrow().clone()
    }

    /// Read-only receiver that observes every published state.
    pub fn subscribe(&self) -> watch::Receiver<PlayerState> {
        self.state.subscribe()
    }

    /// Load `song` and start playing it, superseding whatever was loaded.
    ///
    /// The transition lock is held across the backend `load` and `play`
    /// calls. This relies on [`MediaBackend`] commands returning once they
    /// are accepted; a backend that waits for buffering inside `load` would
    /// hold back the next selection until it returns.
    ///
    /// Returns the generation assigned to the new load.
    pub async fn select_song(&self, song: Song) -> Result<LoadGeneration> {
        let _guard = self.transitions.lock().await;
        let generation = self.state.borrow().generation.next();

        let url = match self.resolver.resolve(&song) {
            Ok(url) => url,
            Err(err) => {
                warn!(song_id = %song.id, error = %err, "Cannot resolve song URL");
                self.state.send_modify(|state| {
                    reset_to_idle(state, generation);
                    state.last_error = Some(err.to_string());
                });
                return Err(err);
            }
        };

        info!(song_id = %song.id, %generation, url = %url, "Loading song");
        self.state.send_modify(|state| {
            state.status = PlayerStatus::Loading;
            state.song = Some(song);
            state.url = Some(url.clone());
            state.position_secs = 0.0;
            state.generation = generation;
            state.last_error = None;
        });

        if let Err(err) = self.backend.load(&url, generation).await {
            return Err(self.fail(err));
        }
        if let Err(err) = self.backend.play().await {
            return Err(self.fail(err));
        }

        Ok(generation)
    }

    /// Flip between playing and paused; from `Done`, restart at zero.
    ///
    /// While a song is still loading the intent is ignored.
    pub async fn toggle_play_pause(&self) -> Result<PlayerStatus> {
        let _guard = self.transitions.lock().await;
        let status = self.state.borrow().status;

        match status {
            PlayerStatus::Playing => {
                if let Err(err) = self.backend.pause().await {
                    return Err(self.fail(err));
                }
                self.set_status(PlayerStatus::Paused);
                Ok(PlayerStatus::Paused)
            }
            PlayerStatus::Paused => {
                if let Err(err) = self.backend.play().await {
                    return Err(self.fail(err));
                }
                self.set_status(PlayerStatus::Playing);
                Ok(PlayerStatus::Playing)
            }
            PlayerStatus::Done => {
                debug!("Restarting finished song from the beginning");
                if let Err(err) = self.backend.seek(0.0).await {
                    return Err(self.fail(err));
                }
                if let Err(err) = self.backend.play().await {
                    return Err(self.fail(err));
                }
                self.state.send_modify(|state| {
                    state.status = PlayerStatus::Playing;
                    state.position_secs = 0.0;
                });
                Ok(PlayerStatus::Playing)
            }
            PlayerStatus::Loading => Ok(PlayerStatus::Loading),
            PlayerStatus::Idle => Err(PlaybackError::NoSongLoaded),
        }
    }

    /// Apply one backend notification.
    ///
    /// Returns `false` when the event was discarded, either because it
    /// belongs to a superseded load or because it does not apply to the
    /// current status.
    pub async fn handle_event(&self, envelope: MediaEventEnvelope) -> bool {
        let _guard = self.transitions.lock().await;
        let current = self.state.borrow().generation;

        if envelope.generation != current {
            debug!(
                event_generation = %envelope.generation,
                current_generation = %current,
                "Discarding event from superseded load"
            );
            return false;
        }

        let mut applied = true;
        self.state.send_if_modified(|state| {
            use PlayerStatus::*;
            match (&envelope.event, state.status) {
                (MediaEvent::Playing, Loading | Paused | Done) => {
                    state.status = Playing;
                }
                (MediaEvent::Paused, Playing) => {
                    state.status = Paused;
                }
                (MediaEvent::TimeUpdate { position_secs }, Playing | Paused) => {
                    state.position_secs = *position_secs;
                }
                (MediaEvent::Ended, Playing | Paused) => {
                    state.status = Done;
                }
                (MediaEvent::Aborted, _) => {
                    reset_to_idle(state, current);
                }
                (MediaEvent::Error { message }, _) => {
                    warn!(generation = %current, error = %message, "Media backend reported an error");
                    reset_to_idle(state, current);
                    state.last_error = Some(message.clone());
                }
                _ => {
                    applied = false;
                }
            }
            applied
        });

        if applied {
            debug!(event = ?envelope.event, status = ?self.state.borrow().status, "Applied media event");
        }
        applied
    }

    /// Jump to an absolute position, clamped to the song's duration.
    pub async fn seek(&self, seconds: f64) -> Result<f64> {
        let _guard = self.transitions.lock().await;
        self.seek_locked(seconds).await
    }

    /// Seek to the point of a seek bar that was clicked.
    ///
    /// `pointer_x` is measured from the left edge of a bar `bar_width` wide.
    /// Returns the target time, or `None` when nothing is loaded, the
    /// duration is unknown, or the bar has no width.
    pub async fn seek_to_pointer(&self, pointer_x: f64, bar_width: f64) -> Result<Option<f64>> {
        let _guard = self.transitions.lock().await;
        let duration = match self.state.borrow().duration() {
            Some(duration) => duration,
            None => return Ok(None),
        };
        if !bar_width.is_finite() || bar_width <= 0.0 || !pointer_x.is_finite() {
            return Ok(None);
        }

        let ratio = (pointer_x / bar_width).clamp(0.0, 1.0);
        self.seek_locked(ratio * duration).await.map(Some)
    }

    /// Abandon the current song and return to idle.
    pub async fn stop(&self) -> Result<()> {
        let _guard = self.transitions.lock().await;
        let (status, generation) = {
            let state = self.state.borrow();
            (state.status, state.generation)
        };

        if matches!(status, PlayerStatus::Loading | PlayerStatus::Playing) {
            if let Err(err) = self.backend.pause().await {
                return Err(self.fail(err));
            }
        }

        info!(%generation, "Playback stopped");
        self.state
            .send_modify(|state| reset_to_idle(state, generation.next()));
        Ok(())
    }

    /// Clear the last reported failure.
    pub fn dismiss_error(&self) {
        self.state.send_if_modified(|state| state.last_error.take().is_some());
    }

    /// Feed backend events into the machine until the stream ends.
    ///
    /// Returns how many events were applied.
    pub async fn run_event_loop<S>(&self, events: S) -> usize
    where
        S: Stream<Item = MediaEventEnvelope>,
    {
        pin_mut!(events);
        let mut applied = 0;
        while let Some(envelope) = events.next().await {
            if self.handle_event(envelope).await {
                applied += 1;
            }
        }
        debug!(applied, "Media event stream ended");
        applied
    }

    async fn seek_locked(&self, seconds: f64) -> Result<f64> {
        let duration = {
            let state = self.state.borrow();
            if state.song.is_none() {
                return Err(PlaybackError::NoSongLoaded);
            }
            state.duration()
        };
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(PlaybackError::InvalidSeek(seconds));
        }

        let target = duration.map_or(seconds, |duration| seconds.min(duration));
        if let Err(err) = self.backend.seek(target).await {
            return Err(self.fail(err));
        }
        self.state.send_modify(|state| state.position_secs = target);
        Ok(target)
    }

    fn set_status(&self, status: PlayerStatus) {
        self.state.send_modify(|state| state.status = status);
    }

    /// Backend command failures drop the player back to idle.
    fn fail(&self, err: BridgeError) -> PlaybackError {
        let err = PlaybackError::from(err);
        warn!(error = %err, "Media backend command failed");
        self.state.send_modify(|state| {
            let generation = state.generation.next();
            reset_to_idle(state, generation);
            state.last_error = Some(err.to_string());
        });
        err
    }
}

fn reset_to_idle(state: &mut PlayerState, generation: LoadGeneration) {
    state.status = PlayerStatus::Idle;
    state.song = None;
    state.url = None;
    state.position_secs = 0.0;
    state.generation = generation;
    state.last_error = None;
}
