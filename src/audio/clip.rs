use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::Cursor;

/// A finalized audio capture, ready for upload or playback.
///
/// Assembled from the chunk buffer when a recording stops; in-progress
/// captures never exist as a clip. A zero-length clip is valid and means
/// "nothing was captured".
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
}

impl AudioClip {
    pub fn new(samples: Vec<i16>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    pub fn empty(sample_rate: u32, channels: u16) -> Self {
        Self::new(Vec::new(), sample_rate, channels)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / (self.sample_rate as f64 * self.channels as f64)
    }

    /// Encode the clip as a WAV byte buffer (16-bit PCM).
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>> {
        let spec = WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer =
                WavWriter::new(&mut buffer, spec).context("Failed to create WAV writer")?;
            for &sample in &self.samples {
                writer
                    .write_sample(sample)
                    .context("Failed to write sample to WAV")?;
            }
            writer.finalize().context("Failed to finalize WAV")?;
        }

        Ok(buffer.into_inner())
    }

    /// Parse a WAV byte buffer into a clip.
    pub fn from_wav_bytes(bytes: &[u8]) -> Result<Self> {
        let reader = WavReader::new(Cursor::new(bytes)).context("Failed to parse WAV data")?;
        let spec = reader.spec();

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        Ok(Self {
            samples,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_accounts_for_channels() {
        let mono = AudioClip::new(vec![0i16; 16000], 16000, 1);
        assert!((mono.duration_seconds() - 1.0).abs() < f64::EPSILON);

        let stereo = AudioClip::new(vec![0i16; 16000], 16000, 2);
        assert!((stereo.duration_seconds() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_clip_reports_empty() {
        let clip = AudioClip::empty(44100, 1);
        assert!(clip.is_empty());
        assert_eq!(clip.duration_seconds(), 0.0);
    }

    #[test]
    fn wav_roundtrip_preserves_samples() {
        let clip = AudioClip::new(vec![100, -200, 300, -400, 0, i16::MAX, i16::MIN], 16000, 1);

        let bytes = clip.to_wav_bytes().unwrap();
        let parsed = AudioClip::from_wav_bytes(&bytes).unwrap();

        assert_eq!(parsed, clip);
    }

    #[test]
    fn malformed_wav_is_an_error() {
        assert!(AudioClip::from_wav_bytes(b"not a wav file").is_err());
    }
}
