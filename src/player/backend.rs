//! Audio playback backend using rodio.

use std::io::{BufReader, Cursor};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::eyre;
use color_eyre::Result;
use rodio::{Decoder, OutputStream, Sink, Source};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use super::{PlaybackError, Pipeline};
use crate::client::models::Track;
use crate::client::Catalog;

/// Resolves a track id to a fetchable stream URL.
///
/// Called from the audio thread, so implementations block.
pub trait StreamResolver: Send + Sync {
    fn resolve(&self, track_id: &str) -> Result<String>;
}

/// Resolves stream URLs through the catalog on the tokio runtime.
pub struct CatalogResolver {
    catalog: Arc<dyn Catalog>,
    handle: Handle,
}

impl CatalogResolver {
    pub fn new(catalog: Arc<dyn Catalog>, handle: Handle) -> Self {
        Self { catalog, handle }
    }
}

impl StreamResolver for CatalogResolver {
    fn resolve(&self, track_id: &str) -> Result<String> {
        let url = self.handle.block_on(self.catalog.stream_url(track_id))?;
        Ok(url)
    }
}

/// Messages sent to the player thread.
#[derive(Debug)]
enum PlayerCommand {
    Load { track_id: String, duration: Duration },
    Play,
    Pause,
    Stop,
    SetVolume(f32),
    Seek(Duration),
}

/// Failures reported asynchronously by the player thread.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// `track_id` names the track that failed; `None` when the audio
    /// output itself went away.
    Error {
        track_id: Option<String>,
        message: String,
    },
}

/// Shared player state accessible from multiple threads.
struct PlayerStateShared {
    is_playing: AtomicBool,
    position_ms: AtomicU64,
    duration_ms: AtomicU64,
}

/// Audio player that runs in a separate thread.
pub struct Player {
    command_tx: mpsc::UnboundedSender<PlayerCommand>,
    state: Arc<PlayerStateShared>,
}

impl Player {
    /// Spawn the audio thread. Load failures arrive on the returned receiver.
    pub fn new(
        resolver: Arc<dyn StreamResolver>,
    ) -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let state = Arc::new(PlayerStateShared {
            is_playing: AtomicBool::new(false),
            position_ms: AtomicU64::new(0),
            duration_ms: AtomicU64::new(0),
        });

        let state_clone = Arc::clone(&state);
        std::thread::spawn(move || {
            if let Err(e) = run_player_thread(command_rx, event_tx.clone(), state_clone, resolver)
            {
                tracing::error!("Player thread error: {}", e);
                let _ = event_tx.send(PipelineEvent::Error {
                    track_id: None,
                    message: e.to_string(),
                });
            }
        });

        (Self { command_tx, state }, event_rx)
    }

    fn send(&self, command: PlayerCommand) -> Result<(), PlaybackError> {
        self.command_tx
            .send(command)
            .map_err(|_| PlaybackError::Disconnected)
    }
}

impl Pipeline for Player {
    fn load(&self, track: &Track) -> Result<(), PlaybackError> {
        self.state.position_ms.store(0, Ordering::SeqCst);
        self.state
            .duration_ms
            .store(track.duration as u64 * 1000, Ordering::SeqCst);
        self.send(PlayerCommand::Load {
            track_id: track.id.clone(),
            duration: Duration::from_secs(track.duration as u64),
        })
    }

    fn play(&self) -> Result<(), PlaybackError> {
        self.send(PlayerCommand::Play)
    }

    fn pause(&self) -> Result<(), PlaybackError> {
        self.send(PlayerCommand::Pause)
    }

    fn stop(&self) -> Result<(), PlaybackError> {
        self.state.is_playing.store(false, Ordering::SeqCst);
        self.state.position_ms.store(0, Ordering::SeqCst);
        self.send(PlayerCommand::Stop)
    }

    fn seek(&self, position: Duration) -> Result<(), PlaybackError> {
        self.send(PlayerCommand::Seek(position))
    }

    fn set_volume(&self, volume: f32) -> Result<(), PlaybackError> {
        self.send(PlayerCommand::SetVolume(volume))
    }

    fn position(&self) -> Option<Duration> {
        Some(Duration::from_millis(
            self.state.position_ms.load(Ordering::SeqCst),
        ))
    }

    fn duration(&self) -> Option<Duration> {
        match self.state.duration_ms.load(Ordering::SeqCst) {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

/// Run the player thread.
fn run_player_thread(
    mut command_rx: mpsc::UnboundedReceiver<PlayerCommand>,
    event_tx: mpsc::UnboundedSender<PipelineEvent>,
    state: Arc<PlayerStateShared>,
    resolver: Arc<dyn StreamResolver>,
) -> Result<()> {
    let (_stream, stream_handle) = OutputStream::try_default()?;
    let mut sink = Sink::try_new(&stream_handle)?;

    let mut current_audio_data: Option<Arc<[u8]>> = None;
    let mut current_track_id: Option<String> = None;
    let mut current_volume: f32 = 1.0;

    loop {
        match command_rx.try_recv() {
            Ok(cmd) => match cmd {
                PlayerCommand::Load { track_id, duration } => {
                    sink.stop();
                    sink = Sink::try_new(&stream_handle)?;
                    current_audio_data = None;
                    current_track_id = Some(track_id.clone());
                    state.is_playing.store(false, Ordering::SeqCst);

                    let loaded = resolver
                        .resolve(&track_id)
                        .and_then(|url| fetch_audio_data(&url))
                        .and_then(|data| {
                            queue_audio_data(&data, &sink, current_volume, Duration::ZERO)
                                .map(|decoded| (data, decoded))
                        });

                    match loaded {
                        Ok((data, decoded)) => {
                            let duration = decoded.filter(|d| !d.is_zero()).unwrap_or(duration);
                            if !duration.is_zero() {
                                state
                                    .duration_ms
                                    .store(duration.as_millis() as u64, Ordering::SeqCst);
                            }
                            current_audio_data = Some(data);
                        }
                        Err(e) => {
                            tracing::warn!("Could not load track {}: {}", track_id, e);
                            let _ = event_tx.send(PipelineEvent::Error {
                                track_id: Some(track_id),
                                message: e.to_string(),
                            });
                        }
                    }
                }
                PlayerCommand::Play => {
                    if current_audio_data.is_some() {
                        sink.play();
                        state.is_playing.store(true, Ordering::SeqCst);
                    }
                }
                PlayerCommand::Pause => {
                    sink.pause();
                    state.is_playing.store(false, Ordering::SeqCst);
                }
                PlayerCommand::Stop => {
                    sink.stop();
                    sink = Sink::try_new(&stream_handle)?;
                    current_audio_data = None;
                    current_track_id = None;
                    state.is_playing.store(false, Ordering::SeqCst);
                    state.position_ms.store(0, Ordering::SeqCst);
                }
                PlayerCommand::SetVolume(vol) => {
                    current_volume = vol;
                    sink.set_volume(vol);
                }
                PlayerCommand::Seek(position) => {
                    // Seek by recreating the source with skip_duration
                    if let Some(ref audio_data) = current_audio_data {
                        let was_paused = sink.is_paused();
                        sink.stop();
                        sink = Sink::try_new(&stream_handle)?;

                        match queue_audio_data(audio_data, &sink, current_volume, position) {
                            Ok(_) => {
                                state
                                    .position_ms
                                    .store(position.as_millis() as u64, Ordering::SeqCst);
                                if !was_paused {
                                    sink.play();
                                }
                            }
                            Err(e) => {
                                let _ = event_tx.send(PipelineEvent::Error {
                                    track_id: current_track_id.clone(),
                                    message: format!("Seek failed: {}", e),
                                });
                            }
                        }
                    }
                }
            },
            Err(mpsc::error::TryRecvError::Empty) => {}
            Err(mpsc::error::TryRecvError::Disconnected) => break,
        }

        // The controller notices the end through the position reaching the duration
        if sink.empty() && state.is_playing.load(Ordering::SeqCst) {
            state.is_playing.store(false, Ordering::SeqCst);
            let duration = state.duration_ms.load(Ordering::SeqCst);
            state.position_ms.store(duration, Ordering::SeqCst);
        }

        // Update progress (approximate based on time elapsed)
        if state.is_playing.load(Ordering::SeqCst) {
            state.position_ms.fetch_add(100, Ordering::SeqCst);
        }

        std::thread::sleep(Duration::from_millis(100));
    }

    Ok(())
}

/// Fetch audio data from URL.
fn fetch_audio_data(url: &str) -> Result<Arc<[u8]>> {
    let response = reqwest::blocking::get(url)?;
    if !response.status().is_success() {
        return Err(eyre!("stream request failed with {}", response.status()));
    }
    let bytes = response.bytes()?;
    Ok(Arc::from(bytes.as_ref()))
}

/// Decode audio data into the paused sink, skipping to `skip`.
///
/// Returns the decoder's total duration when it knows it.
fn queue_audio_data(
    audio_data: &Arc<[u8]>,
    sink: &Sink,
    volume: f32,
    skip: Duration,
) -> Result<Option<Duration>> {
    let cursor = Cursor::new(SharedBytes(Arc::clone(audio_data)));
    let source = Decoder::new(BufReader::new(cursor))?;
    let total = source.total_duration();

    sink.pause();
    if skip > Duration::ZERO {
        sink.append(source.skip_duration(skip));
    } else {
        sink.append(source);
    }
    sink.set_volume(volume);

    Ok(total)
}

/// Lets a decoder read shared bytes without copying them per seek.
struct SharedBytes(Arc<[u8]>);

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoStreams;

    impl StreamResolver for NoStreams {
        fn resolve(&self, track_id: &str) -> Result<String> {
            Err(eyre!("no stream for {track_id}"))
        }
    }

    #[test]
    fn test_shared_bytes_reads_through_cursor() {
        use std::io::Read;
        let mut cursor = Cursor::new(SharedBytes(Arc::from(&b"flac"[..])));
        let mut out = String::new();
        cursor.read_to_string(&mut out).unwrap();
        assert_eq!(out, "flac");
    }

    #[test]
    fn test_load_failure_names_the_track() {
        let (player, mut events) = Player::new(Arc::new(NoStreams));
        let track = crate::player::context::tests::track("9");
        if player.load(&track).is_err() {
            // No output device; the thread died before reading commands.
            return;
        }

        // Load errors arrive within a few thread iterations.
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        let event = loop {
            match events.try_recv() {
                Ok(event) => break Some(event),
                Err(mpsc::error::TryRecvError::Disconnected) => break None,
                Err(mpsc::error::TryRecvError::Empty) if std::time::Instant::now() < deadline => {
                    std::thread::sleep(Duration::from_millis(20));
                }
                Err(mpsc::error::TryRecvError::Empty) => break None,
            }
        };

        match event {
            Some(PipelineEvent::Error { track_id: Some(id), message }) => {
                assert_eq!(id, "9");
                assert!(message.contains("no stream for 9"));
            }
            // Without an audio device the thread reports itself instead.
            Some(PipelineEvent::Error { track_id: None, .. }) | None => {}
        }
    }

    #[test]
    fn test_load_records_metadata_duration() {
        let (player, _events) = Player::new(Arc::new(NoStreams));
        let track = crate::player::context::tests::track("1");
        // The audio thread may already be gone without an output device.
        let _ = player.load(&track);
        assert_eq!(player.duration(), Some(Duration::from_secs(180)));
        assert_eq!(player.position(), Some(Duration::ZERO));
    }
}
