use super::backend::AudioFrame;
use super::clip::AudioClip;
use crate::error::PlaybackError;
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Speaker-side sink for decoded audio frames.
///
/// The playback path writes paced frames into this seam; tests substitute a
/// capturing fake, production uses [`CpalOutput`].
#[async_trait]
pub trait AudioOutput: Send + Sync {
    async fn write(&self, frame: AudioFrame) -> Result<(), PlaybackError>;

    fn name(&self) -> &str;
}

enum OutputCommand {
    Ensure {
        sample_rate: u32,
        reply: oneshot::Sender<Result<(), PlaybackError>>,
    },
    Shutdown,
}

/// Default speaker output over cpal.
///
/// Same ownership shape as the capture side: a worker thread owns the
/// non-`Send` output stream, whose callback drains a shared sample queue and
/// zero-fills when the queue runs dry.
pub struct CpalOutput {
    command_tx: std::sync::mpsc::Sender<OutputCommand>,
    worker: Option<std::thread::JoinHandle<()>>,
    queue: Arc<Mutex<VecDeque<i16>>>,
    device_channels: Arc<AtomicU16>,
}

impl CpalOutput {
    pub fn new() -> Self {
        let (command_tx, command_rx) = std::sync::mpsc::channel::<OutputCommand>();
        let queue: Arc<Mutex<VecDeque<i16>>> = Arc::new(Mutex::new(VecDeque::new()));
        let device_channels = Arc::new(AtomicU16::new(0));

        let worker_queue = Arc::clone(&queue);
        let worker_channels = Arc::clone(&device_channels);
        let worker = std::thread::spawn(move || {
            let mut stream: Option<cpal::Stream> = None;

            loop {
                match command_rx.recv() {
                    Ok(OutputCommand::Ensure { sample_rate, reply }) => {
                        if stream.is_some() {
                            let _ = reply.send(Ok(()));
                            continue;
                        }
                        match build_output_stream(sample_rate, Arc::clone(&worker_queue)) {
                            Ok((s, channels)) => {
                                if let Err(e) = s.play() {
                                    let _ =
                                        reply.send(Err(PlaybackError::Device(e.to_string())));
                                    continue;
                                }
                                stream = Some(s);
                                worker_channels.store(channels, Ordering::SeqCst);
                                let _ = reply.send(Ok(()));
                            }
                            Err(e) => {
                                let _ = reply.send(Err(e));
                            }
                        }
                    }
                    Ok(OutputCommand::Shutdown) | Err(_) => {
                        drop(stream.take());
                        break;
                    }
                }
            }
        });

        Self {
            command_tx,
            worker: Some(worker),
            queue,
            device_channels,
        }
    }

    async fn ensure_stream(&self, sample_rate: u32) -> Result<u16, PlaybackError> {
        let known = self.device_channels.load(Ordering::SeqCst);
        if known != 0 {
            return Ok(known);
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(OutputCommand::Ensure {
                sample_rate,
                reply: reply_tx,
            })
            .map_err(|_| PlaybackError::Device("output worker gone".into()))?;

        reply_rx
            .await
            .map_err(|_| PlaybackError::Device("output worker gone".into()))??;
        Ok(self.device_channels.load(Ordering::SeqCst))
    }
}

impl Default for CpalOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioOutput for CpalOutput {
    async fn write(&self, frame: AudioFrame) -> Result<(), PlaybackError> {
        let device_channels = self.ensure_stream(frame.sample_rate).await?;

        let mut queue = self.queue.lock().unwrap();
        if frame.channels == 1 && device_channels > 1 {
            // Fan a mono clip out across the device channels
            for &s in &frame.samples {
                for _ in 0..device_channels {
                    queue.push_back(s);
                }
            }
        } else {
            queue.extend(frame.samples.iter().copied());
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "cpal-output"
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        let _ = self.command_tx.send(OutputCommand::Shutdown);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

fn build_output_stream(
    sample_rate: u32,
    queue: Arc<Mutex<VecDeque<i16>>>,
) -> Result<(cpal::Stream, u16), PlaybackError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| PlaybackError::Device("no output device".into()))?;

    let supported = device
        .default_output_config()
        .map_err(|e| PlaybackError::Device(e.to_string()))?;
    let channels = supported.channels();

    if supported.sample_rate().0 != sample_rate {
        warn!(
            "Clip rate {}Hz differs from device rate {}Hz; playing unresampled",
            sample_rate,
            supported.sample_rate().0
        );
    }

    let stream_config = cpal::StreamConfig {
        channels,
        sample_rate: supported.sample_rate(),
        buffer_size: cpal::BufferSize::Default,
    };

    let data_cb = move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
        let mut q = queue.lock().unwrap();
        for out in data.iter_mut() {
            *out = q
                .pop_front()
                .map(|s| s as f32 / 32768.0)
                .unwrap_or(0.0);
        }
    };

    let err_cb = |err: cpal::StreamError| {
        warn!("Output stream error: {}", err);
    };

    let stream = device
        .build_output_stream(&stream_config, data_cb, err_cb, None)
        .map_err(|e| PlaybackError::Device(e.to_string()))?;

    Ok((stream, channels))
}

/// Transport state of a [`Player`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Playing,
    Paused,
    Ended,
}

struct PlayerShared {
    position_ms: AtomicU64,
    playing: AtomicBool,
    ended: AtomicBool,
}

/// Plays a remote audio URL with transport controls.
///
/// Fetches the clip, then paces frames into the injected [`AudioOutput`].
/// Pause stops the feeder at the next frame boundary; seek takes effect on
/// the next frame; reaching the end rewinds to the start.
pub struct Player {
    output: Arc<dyn AudioOutput>,
    http: reqwest::Client,
    clip: Option<Arc<AudioClip>>,
    shared: Arc<PlayerShared>,
    feeder: Option<JoinHandle<()>>,
}

const FEED_CHUNK_MS: u64 = 100;

impl Player {
    pub fn new(output: Arc<dyn AudioOutput>) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            output,
            http,
            clip: None,
            shared: Arc::new(PlayerShared {
                position_ms: AtomicU64::new(0),
                playing: AtomicBool::new(false),
                ended: AtomicBool::new(false),
            }),
            feeder: None,
        }
    }

    /// Fetch a remote audio URL and prepare it for playback.
    pub async fn load(&mut self, url: &str) -> Result<(), PlaybackError> {
        info!("Loading audio: {}", url);

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| PlaybackError::Load(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PlaybackError::Load(format!(
                "unexpected status {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PlaybackError::Load(e.to_string()))?;

        let clip =
            AudioClip::from_wav_bytes(&bytes).map_err(|e| PlaybackError::Load(e.to_string()))?;
        self.set_clip(clip);
        Ok(())
    }

    /// Prepare an already-decoded clip for playback.
    pub fn set_clip(&mut self, clip: AudioClip) {
        self.halt_feeder();
        self.clip = Some(Arc::new(clip));
        self.shared.position_ms.store(0, Ordering::SeqCst);
        self.shared.ended.store(false, Ordering::SeqCst);
        self.shared.playing.store(false, Ordering::SeqCst);
    }

    pub fn duration_seconds(&self) -> f64 {
        self.clip.as_ref().map_or(0.0, |c| c.duration_seconds())
    }

    pub fn position_seconds(&self) -> f64 {
        self.shared.position_ms.load(Ordering::SeqCst) as f64 / 1000.0
    }

    pub fn state(&self) -> PlayerState {
        if self.clip.is_none() {
            PlayerState::Idle
        } else if self.shared.playing.load(Ordering::SeqCst) {
            PlayerState::Playing
        } else if self.shared.ended.load(Ordering::SeqCst) {
            PlayerState::Ended
        } else {
            PlayerState::Paused
        }
    }

    pub fn play(&mut self) -> Result<(), PlaybackError> {
        let Some(clip) = self.clip.clone() else {
            return Err(PlaybackError::Load("no audio loaded".into()));
        };

        if self.shared.playing.load(Ordering::SeqCst) {
            return Ok(());
        }

        if self.shared.ended.swap(false, Ordering::SeqCst) {
            self.shared.position_ms.store(0, Ordering::SeqCst);
        }

        self.halt_feeder();
        self.shared.playing.store(true, Ordering::SeqCst);

        let shared = Arc::clone(&self.shared);
        let output = Arc::clone(&self.output);
        let duration_ms = (clip.duration_seconds() * 1000.0) as u64;

        self.feeder = Some(tokio::spawn(async move {
            loop {
                if !shared.playing.load(Ordering::SeqCst) {
                    break;
                }

                let pos = shared.position_ms.load(Ordering::SeqCst);
                if pos >= duration_ms {
                    shared.playing.store(false, Ordering::SeqCst);
                    shared.ended.store(true, Ordering::SeqCst);
                    shared.position_ms.store(0, Ordering::SeqCst);
                    break;
                }

                let frame = slice_frame(&clip, pos, FEED_CHUNK_MS);
                if let Err(e) = output.write(frame).await {
                    warn!("Playback halted: {}", e);
                    shared.playing.store(false, Ordering::SeqCst);
                    break;
                }

                shared
                    .position_ms
                    .store((pos + FEED_CHUNK_MS).min(duration_ms.max(1)), Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(FEED_CHUNK_MS)).await;
            }
        }));

        Ok(())
    }

    pub fn pause(&mut self) {
        self.shared.playing.store(false, Ordering::SeqCst);
        self.halt_feeder();
    }

    pub fn toggle(&mut self) -> Result<(), PlaybackError> {
        if self.state() == PlayerState::Playing {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    /// Jump to a position; takes effect on the next frame.
    pub fn seek(&mut self, seconds: f64) {
        let duration_ms = (self.duration_seconds() * 1000.0) as u64;
        let target = ((seconds.max(0.0) * 1000.0) as u64).min(duration_ms);
        self.shared.position_ms.store(target, Ordering::SeqCst);
        self.shared.ended.store(false, Ordering::SeqCst);
    }

    fn halt_feeder(&mut self) {
        if let Some(task) = self.feeder.take() {
            task.abort();
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.halt_feeder();
    }
}

/// Cut one paced frame out of the clip, aligned to channel boundaries.
fn slice_frame(clip: &AudioClip, position_ms: u64, chunk_ms: u64) -> AudioFrame {
    let per_ms = clip.sample_rate as u64 * clip.channels as u64 / 1000;
    let start = (position_ms * per_ms) as usize;
    let end = ((position_ms + chunk_ms) * per_ms) as usize;

    let start = start.min(clip.samples.len());
    let end = end.min(clip.samples.len());

    AudioFrame {
        samples: clip.samples[start..end].to_vec(),
        sample_rate: clip.sample_rate,
        channels: clip.channels,
        timestamp_ms: position_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip_1s_16k() -> AudioClip {
        AudioClip::new((0..16000).map(|i| (i % 100) as i16).collect(), 16000, 1)
    }

    #[test]
    fn slice_frame_respects_bounds() {
        let clip = clip_1s_16k();

        let frame = slice_frame(&clip, 0, 100);
        assert_eq!(frame.samples.len(), 1600);
        assert_eq!(frame.timestamp_ms, 0);

        // Final partial frame clamps to the clip length
        let tail = slice_frame(&clip, 950, 100);
        assert_eq!(tail.samples.len(), 800);

        // Past the end yields an empty frame
        let past = slice_frame(&clip, 2000, 100);
        assert!(past.samples.is_empty());
    }

    #[test]
    fn seek_clamps_to_duration() {
        let output: Arc<dyn AudioOutput> = Arc::new(NullOutput);
        let mut player = Player::new(output);
        player.set_clip(clip_1s_16k());

        player.seek(0.5);
        assert!((player.position_seconds() - 0.5).abs() < 1e-9);

        player.seek(10.0);
        assert!((player.position_seconds() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn state_tracks_clip_lifecycle() {
        let output: Arc<dyn AudioOutput> = Arc::new(NullOutput);
        let mut player = Player::new(output);
        assert_eq!(player.state(), PlayerState::Idle);

        player.set_clip(clip_1s_16k());
        assert_eq!(player.state(), PlayerState::Paused);
    }

    struct NullOutput;

    #[async_trait]
    impl AudioOutput for NullOutput {
        async fn write(&self, _frame: AudioFrame) -> Result<(), PlaybackError> {
            Ok(())
        }

        fn name(&self) -> &str {
            "null"
        }
    }
}
