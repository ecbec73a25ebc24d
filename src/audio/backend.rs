use crate::error::CaptureError;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

impl AudioFrame {
    /// Frame duration derived from its own format.
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0;
        }
        let per_channel = self.samples.len() as u64 / self.channels as u64;
        per_channel * 1000 / self.sample_rate as u64
    }
}

/// Configuration for a capture backend
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Requested sample rate (the device may deliver a different one;
    /// emitted frames carry the actual rate)
    pub sample_rate: u32,
    /// Requested channel count (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Frame size in milliseconds (affects latency)
    pub buffer_duration_ms: u64,
    /// Ask the platform to cancel speaker echo where it can
    pub echo_cancellation: bool,
    /// Ask the platform to suppress background noise where it can
    pub noise_suppression: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 1,
            buffer_duration_ms: 100,
            echo_cancellation: true,
            noise_suppression: true,
        }
    }
}

/// Microphone capture backend trait
///
/// The capture stream is singly owned: starting a new cycle must tear down
/// any previous stream before acquiring the device again.
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Acquire the device and start capturing
    ///
    /// Returns a channel receiver that will receive audio frames. The channel
    /// closes when the stream is released.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError>;

    /// Release the device and stop capturing
    async fn stop(&mut self) -> Result<(), CaptureError>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_duration_follows_format() {
        let frame = AudioFrame {
            samples: vec![0i16; 4410],
            sample_rate: 44100,
            channels: 1,
            timestamp_ms: 0,
        };
        assert_eq!(frame.duration_ms(), 100);

        let stereo = AudioFrame {
            samples: vec![0i16; 8820],
            sample_rate: 44100,
            channels: 2,
            timestamp_ms: 0,
        };
        assert_eq!(stereo.duration_ms(), 100);
    }

    #[test]
    fn zero_rate_frame_has_zero_duration() {
        let frame = AudioFrame {
            samples: vec![0i16; 100],
            sample_rate: 0,
            channels: 1,
            timestamp_ms: 0,
        };
        assert_eq!(frame.duration_ms(), 0);
    }
}
