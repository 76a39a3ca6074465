//! Player controller: current track, context, queue and transport state.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::mpsc;

use super::context::PlaybackContext;
use super::{PlaybackError, Pipeline};
use crate::action::{PlayerState, RepeatMode};
use crate::client::models::Track;

/// Seeks closer than this to the last known position are ignored; slider
/// drags and position updates would otherwise feed back into each other.
pub const SEEK_THRESHOLD_SECS: f64 = 6.0;

/// A track counts as finished this close to its end.
pub const END_OF_TRACK_MARGIN_SECS: f64 = 0.2;

/// Notifications emitted by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerNotification {
    TrackChanged(Track),
    PlayStateChanged(bool),
    PositionUpdated { position: f64, duration: f64 },
    PlaybackFailed(String),
}

/// Result of a position poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Keep polling.
    Continue,
    /// Playback is not running; stop polling until it starts again.
    Cancel,
}

/// Drives a [`Pipeline`] through the current context and queue.
pub struct PlayerController<P: Pipeline> {
    pipeline: P,
    notify_tx: mpsc::UnboundedSender<PlayerNotification>,
    state: PlayerState,
    current: Option<Track>,
    context: PlaybackContext,
    queue: VecDeque<Track>,
    shuffle: bool,
    repeat: RepeatMode,
    /// Last known position in seconds
    last_position: f64,
    volume: f32,
}

impl<P: Pipeline> PlayerController<P> {
    pub fn new(pipeline: P, notify_tx: mpsc::UnboundedSender<PlayerNotification>) -> Self {
        Self {
            pipeline,
            notify_tx,
            state: PlayerState::Stopped,
            current: None,
            context: PlaybackContext::default(),
            queue: VecDeque::new(),
            shuffle: false,
            repeat: RepeatMode::Off,
            last_position: 0.0,
            volume: 1.0,
        }
    }

    fn notify(&self, notification: PlayerNotification) {
        // The receiver only goes away on shutdown.
        let _ = self.notify_tx.send(notification);
    }

    fn set_state(&mut self, state: PlayerState) {
        self.state = state;
        self.notify(PlayerNotification::PlayStateChanged(
            state == PlayerState::Playing,
        ));
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlayerState::Playing
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn context(&self) -> &PlaybackContext {
        &self.context
    }

    pub fn queue(&self) -> &VecDeque<Track> {
        &self.queue
    }

    pub fn is_shuffle(&self) -> bool {
        self.shuffle
    }

    pub fn repeat(&self) -> RepeatMode {
        self.repeat
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn last_position(&self) -> f64 {
        self.last_position
    }

    /// Stop whatever is playing and start `track` from the beginning.
    pub fn play_track(&mut self, track: Track) -> Result<(), PlaybackError> {
        tracing::info!("Playing track {} ({})", track.title, track.id);

        self.pipeline.stop()?;
        self.last_position = 0.0;
        self.current = Some(track.clone());
        self.notify(PlayerNotification::TrackChanged(track.clone()));

        if let Err(e) = self.pipeline.load(&track).and_then(|_| self.pipeline.play()) {
            self.fail(&e);
            return Err(e);
        }

        self.set_state(PlayerState::Playing);
        Ok(())
    }

    /// Replace the active context and play its current track.
    pub fn play_context(&mut self, context: PlaybackContext) -> Result<(), PlaybackError> {
        self.context = context;
        match self.context.current().cloned() {
            Some(track) => self.play_track(track),
            None => Ok(()),
        }
    }

    /// Replace the active context without starting playback.
    pub fn set_context(&mut self, context: PlaybackContext) {
        self.context = context;
    }

    /// Make `track` the current track without playing it (session restore).
    pub fn cue(&mut self, track: Track) {
        self.current = Some(track.clone());
        self.notify(PlayerNotification::TrackChanged(track));
    }

    /// Resume playback. From `Stopped`, restarts the current track if any.
    pub fn play(&mut self) -> Result<(), PlaybackError> {
        match self.state {
            PlayerState::Playing => Ok(()),
            PlayerState::Paused => {
                self.pipeline.play()?;
                self.set_state(PlayerState::Playing);
                Ok(())
            }
            PlayerState::Stopped => match self.current.clone() {
                Some(track) => self.play_track(track),
                None => Ok(()),
            },
        }
    }

    pub fn pause(&mut self) -> Result<(), PlaybackError> {
        if self.state != PlayerState::Playing {
            return Ok(());
        }
        self.pipeline.pause()?;
        self.set_state(PlayerState::Paused);
        Ok(())
    }

    pub fn toggle_play_pause(&mut self) -> Result<(), PlaybackError> {
        if self.is_playing() {
            self.pause()
        } else {
            self.play()
        }
    }

    /// Stop playback, keeping the current track.
    pub fn stop(&mut self) -> Result<(), PlaybackError> {
        self.pipeline.stop()?;
        self.last_position = 0.0;
        self.set_state(PlayerState::Stopped);
        Ok(())
    }

    /// Play the queue head, or advance the context.
    ///
    /// Returns `false` when nothing was left to play and playback stopped.
    pub fn play_next(&mut self) -> Result<bool, PlaybackError> {
        if let Some(track) = self.queue.pop_front() {
            self.play_track(track)?;
            return Ok(true);
        }

        let next = if self.shuffle && self.context.len() > 1 {
            let current_id = self.current.as_ref().map(|t| t.id.clone());
            let mut rng = rand::thread_rng();
            self.context
                .random_index(current_id.as_deref(), &mut rng)
                .and_then(|i| self.context.jump(i).cloned())
        } else {
            self.context
                .advance(self.repeat == RepeatMode::All)
                .cloned()
        };

        match next {
            Some(track) => {
                self.play_track(track)?;
                Ok(true)
            }
            None => {
                tracing::debug!("End of context reached");
                self.stop()?;
                Ok(false)
            }
        }
    }

    /// Play the previous context track (clamped at the first one).
    pub fn play_previous(&mut self) -> Result<(), PlaybackError> {
        match self.context.retreat().cloned() {
            Some(track) => self.play_track(track),
            None => Ok(()),
        }
    }

    /// Turn shuffle on and jump to a random track other than the current one.
    pub fn play_shuffle(&mut self) -> Result<(), PlaybackError> {
        let current_id = self.current.as_ref().map(|t| t.id.clone());
        let mut rng = rand::thread_rng();
        let Some(index) = self.context.random_index(current_id.as_deref(), &mut rng) else {
            return Ok(());
        };

        self.shuffle = true;
        match self.context.jump(index).cloned() {
            Some(track) => self.play_track(track),
            None => Ok(()),
        }
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        self.shuffle = !self.shuffle;
        self.shuffle
    }

    pub fn cycle_repeat(&mut self) -> RepeatMode {
        self.repeat = self.repeat.next();
        self.repeat
    }

    /// Seek to an absolute position in seconds.
    ///
    /// Returns whether the request reached the pipeline. Nothing is loaded
    /// while stopped, so seeks are dropped then.
    pub fn seek(&mut self, position_secs: f64) -> Result<bool, PlaybackError> {
        if self.state == PlayerState::Stopped {
            return Ok(false);
        }
        if (position_secs - self.last_position).abs() <= SEEK_THRESHOLD_SECS {
            return Ok(false);
        }
        let position = position_secs.max(0.0);
        self.pipeline.seek(Duration::from_secs_f64(position))?;
        self.last_position = position;
        Ok(true)
    }

    /// Set the output gain (linear, clamped to 0.0-1.0).
    pub fn change_volume(&mut self, volume: f32) -> Result<(), PlaybackError> {
        let volume = volume.clamp(0.0, 1.0);
        self.pipeline.set_volume(volume)?;
        self.volume = volume;
        Ok(())
    }

    /// Append a track to the queue.
    pub fn add_to_queue(&mut self, track: Track) {
        self.queue.push_back(track);
    }

    /// Put a track at the head of the queue so it plays next.
    pub fn queue_next(&mut self, track: Track) {
        self.queue.push_front(track);
    }

    pub fn remove_from_queue(&mut self, index: usize) -> Option<Track> {
        self.queue.remove(index)
    }

    pub fn clear_queue(&mut self) {
        self.queue.clear();
    }

    /// Query the pipeline position, publish it and advance at the end of the track.
    pub fn poll_position(&mut self) -> Result<PollOutcome, PlaybackError> {
        if self.state != PlayerState::Playing {
            return Ok(PollOutcome::Cancel);
        }

        let duration = self
            .pipeline
            .duration()
            .map(|d| d.as_secs_f64())
            .or_else(|| self.current.as_ref().map(|t| t.duration as f64))
            .filter(|d| *d > 0.0);

        let Some(position) = self.pipeline.position().map(|p| p.as_secs_f64()) else {
            return Ok(PollOutcome::Continue);
        };

        self.last_position = position;
        self.notify(PlayerNotification::PositionUpdated {
            position,
            duration: duration.unwrap_or(0.0),
        });

        if let Some(duration) = duration {
            if position >= duration - END_OF_TRACK_MARGIN_SECS {
                self.finish_track()?;
            }
        }

        Ok(if self.state == PlayerState::Playing {
            PollOutcome::Continue
        } else {
            PollOutcome::Cancel
        })
    }

    fn finish_track(&mut self) -> Result<(), PlaybackError> {
        tracing::debug!("Track finished");
        match (self.repeat, self.current.clone()) {
            (RepeatMode::One, Some(track)) => self.play_track(track),
            _ => self.play_next().map(|_| ()),
        }
    }

    /// Record a failure reported asynchronously by the pipeline.
    ///
    /// Failures of a track other than the current one arrive late from a
    /// load that was already replaced and are dropped. Returns whether
    /// playback was stopped.
    pub fn handle_pipeline_failure(&mut self, track_id: Option<&str>, reason: &str) -> bool {
        if let Some(id) = track_id {
            if self.current.as_ref().map(|t| t.id.as_str()) != Some(id) {
                tracing::debug!("Ignoring stale failure of track {}: {}", id, reason);
                return false;
            }
        }
        self.fail(&PlaybackError::Unavailable(reason.to_string()));
        true
    }

    fn fail(&mut self, error: &PlaybackError) {
        tracing::error!("{}", error);
        let _ = self.pipeline.stop();
        self.last_position = 0.0;
        self.notify(PlayerNotification::PlaybackFailed(error.to_string()));
        self.set_state(PlayerState::Stopped);
    }
}
