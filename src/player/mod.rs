//! Playback: the media pipeline and the controller driving it.

pub mod backend;
pub mod context;
pub mod controller;

use std::time::Duration;

use thiserror::Error;

use crate::client::models::Track;

pub use backend::{CatalogResolver, PipelineEvent, Player, StreamResolver};
pub use context::{ContextSource, PlaybackContext};
pub use controller::{PlayerController, PlayerNotification, PollOutcome};

/// Playback errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlaybackError {
    /// The track's media could not be resolved, fetched or decoded.
    #[error("Playback unavailable: {0}")]
    Unavailable(String),

    /// The audio thread is gone.
    #[error("Audio output is not running")]
    Disconnected,
}

/// The media pipeline the controller drives.
///
/// Positions and durations are reported in the pipeline's own clock and
/// converted to seconds by the controller.
pub trait Pipeline {
    /// Load a track, replacing whatever was loaded before.
    fn load(&self, track: &Track) -> Result<(), PlaybackError>;
    fn play(&self) -> Result<(), PlaybackError>;
    fn pause(&self) -> Result<(), PlaybackError>;
    fn stop(&self) -> Result<(), PlaybackError>;
    /// Jump to an absolute position.
    fn seek(&self, position: Duration) -> Result<(), PlaybackError>;
    /// Linear gain, 0.0 to 1.0.
    fn set_volume(&self, volume: f32) -> Result<(), PlaybackError>;
    fn position(&self) -> Option<Duration>;
    fn duration(&self) -> Option<Duration>;
}
