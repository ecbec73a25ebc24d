use super::backend::{AudioFrame, CaptureBackend, CaptureConfig};
use crate::error::CaptureError;
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

/// Commands sent to the audio worker thread
enum WorkerCommand {
    Start {
        frames: mpsc::Sender<AudioFrame>,
        reply: oneshot::Sender<Result<(), CaptureError>>,
    },
    Stop,
    Shutdown,
}

/// Microphone capture backend over the default cpal input device.
///
/// cpal streams are not `Send`, so a dedicated worker thread owns the device
/// and the stream; the async side talks to it over a command channel. Frames
/// are emitted at the device's native rate (decimated to the requested rate
/// when the ratio is integral) and carry their actual format.
pub struct CpalBackend {
    config: CaptureConfig,
    command_tx: std::sync::mpsc::Sender<WorkerCommand>,
    worker: Option<std::thread::JoinHandle<()>>,
    is_capturing: Arc<AtomicBool>,
}

impl CpalBackend {
    pub fn new(config: CaptureConfig) -> Self {
        let (command_tx, command_rx) = std::sync::mpsc::channel::<WorkerCommand>();
        let is_capturing = Arc::new(AtomicBool::new(false));

        let worker_config = config.clone();
        let worker_flag = Arc::clone(&is_capturing);
        let worker = std::thread::spawn(move || {
            worker_loop(worker_config, command_rx, worker_flag);
        });

        Self {
            config,
            command_tx,
            worker: Some(worker),
            is_capturing,
        }
    }
}

#[async_trait]
impl CaptureBackend for CpalBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        if self.config.echo_cancellation || self.config.noise_suppression {
            // cpal exposes no voice-processing switches; the platform's own
            // input DSP is all we get here.
            warn!("echo cancellation / noise suppression not controllable on this backend");
        }

        let (frame_tx, frame_rx) = mpsc::channel(64);
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(WorkerCommand::Start {
                frames: frame_tx,
                reply: reply_tx,
            })
            .map_err(|_| CaptureError::Worker)?;

        reply_rx.await.map_err(|_| CaptureError::Worker)??;
        Ok(frame_rx)
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        self.command_tx
            .send(WorkerCommand::Stop)
            .map_err(|_| CaptureError::Worker)
    }

    fn is_capturing(&self) -> bool {
        self.is_capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "cpal"
    }
}

impl Drop for CpalBackend {
    fn drop(&mut self) {
        let _ = self.command_tx.send(WorkerCommand::Shutdown);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

/// Worker thread: owns the device and the live stream.
fn worker_loop(
    config: CaptureConfig,
    command_rx: std::sync::mpsc::Receiver<WorkerCommand>,
    is_capturing: Arc<AtomicBool>,
) {
    let mut stream: Option<cpal::Stream> = None;

    loop {
        match command_rx.recv() {
            Ok(WorkerCommand::Start { frames, reply }) => {
                // Idempotent restart: release any previous stream first
                if stream.take().is_some() {
                    info!("Releasing previous capture stream before restart");
                }

                match build_stream(&config, frames) {
                    Ok(s) => {
                        if let Err(e) = s.play() {
                            let _ = reply.send(Err(CaptureError::Stream(e.to_string())));
                            is_capturing.store(false, Ordering::SeqCst);
                            continue;
                        }
                        stream = Some(s);
                        is_capturing.store(true, Ordering::SeqCst);
                        info!("Audio capture started");
                        let _ = reply.send(Ok(()));
                    }
                    Err(e) => {
                        is_capturing.store(false, Ordering::SeqCst);
                        let _ = reply.send(Err(e));
                    }
                }
            }
            Ok(WorkerCommand::Stop) => {
                // Dropping the stream releases the device and closes the
                // frame channel held by its callback
                stream = None;
                is_capturing.store(false, Ordering::SeqCst);
                info!("Audio capture stopped");
            }
            Ok(WorkerCommand::Shutdown) | Err(_) => {
                drop(stream.take());
                is_capturing.store(false, Ordering::SeqCst);
                break;
            }
        }
    }
}

fn build_stream(
    config: &CaptureConfig,
    frames: mpsc::Sender<AudioFrame>,
) -> Result<cpal::Stream, CaptureError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(CaptureError::DeviceUnavailable)?;

    let supported = device
        .default_input_config()
        .map_err(|e| classify_device_error(&e.to_string()))?;

    let device_rate = supported.sample_rate().0;
    let device_channels = supported.channels();
    let stream_config = cpal::StreamConfig {
        channels: device_channels,
        sample_rate: supported.sample_rate(),
        buffer_size: cpal::BufferSize::Default,
    };

    info!(
        "Capture device: {}Hz, {} channels (requested {}Hz, {} channels)",
        device_rate, device_channels, config.sample_rate, config.channels
    );

    // Decimate to the requested rate when the ratio is integral, otherwise
    // deliver at the device rate and let frames carry their own format
    let decimation = if config.sample_rate > 0
        && device_rate > config.sample_rate
        && device_rate % config.sample_rate == 0
    {
        (device_rate / config.sample_rate) as usize
    } else {
        1
    };
    let out_rate = device_rate / decimation as u32;
    let out_channels: u16 = if config.channels == 1 { 1 } else { device_channels };

    let frame_samples =
        (out_rate as u64 * config.buffer_duration_ms / 1000) as usize * out_channels as usize;
    let frame_samples = frame_samples.max(1);

    let mut carry: Vec<i16> = Vec::with_capacity(frame_samples * 2);
    let mut emitted_samples: u64 = 0;
    let mut decim_phase: usize = 0;

    let data_cb = move |data: &[f32], _: &cpal::InputCallbackInfo| {
        for chunk in data.chunks_exact(device_channels as usize) {
            // Downmix to mono by averaging when mono was requested
            if out_channels == 1 {
                if decim_phase == 0 {
                    let sum: f32 = chunk.iter().sum();
                    let avg = sum / device_channels as f32;
                    carry.push((avg * 32767.0).clamp(-32768.0, 32767.0) as i16);
                }
            } else if decim_phase == 0 {
                for &s in chunk {
                    carry.push((s * 32767.0).clamp(-32768.0, 32767.0) as i16);
                }
            }
            decim_phase = (decim_phase + 1) % decimation;
        }

        while carry.len() >= frame_samples {
            let rest = carry.split_off(frame_samples);
            let samples = std::mem::replace(&mut carry, rest);
            let timestamp_ms =
                emitted_samples * 1000 / (out_rate as u64 * out_channels as u64).max(1);
            emitted_samples += samples.len() as u64;

            let frame = AudioFrame {
                samples,
                sample_rate: out_rate,
                channels: out_channels,
                timestamp_ms,
            };
            // Realtime callback: never block; a full channel drops the frame
            if frames.try_send(frame).is_err() {
                warn!("Frame channel full, dropping capture frame");
            }
        }
    };

    let err_cb = |err: cpal::StreamError| {
        error!("Capture stream error: {}", err);
    };

    device
        .build_input_stream(&stream_config, data_cb, err_cb, None)
        .map_err(|e| match e {
            cpal::BuildStreamError::DeviceNotAvailable => CaptureError::DeviceUnavailable,
            other => classify_device_error(&other.to_string()),
        })
}

fn classify_device_error(message: &str) -> CaptureError {
    let lowered = message.to_lowercase();
    if lowered.contains("permission") || lowered.contains("denied") || lowered.contains("access") {
        CaptureError::PermissionDenied
    } else if lowered.contains("device") || lowered.contains("unavailable") {
        CaptureError::DeviceUnavailable
    } else {
        CaptureError::Stream(message.to_string())
    }
}
