use super::engine::SpeechEngineFactory;
use crate::audio::playback::AudioOutput;
use crate::audio::{AudioClip, AudioFrame};
use crate::error::RecognitionError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

const FEED_CHUNK_MS: u64 = 100;

/// Transcribe a pre-recorded clip by replaying it while a fresh engine
/// listens.
///
/// Plays the clip through the output sink (when one is given) at capture
/// pace, concatenates all final-marked results, and auto-stops one second
/// after the clip's playback duration elapses. Fails when the engine faults.
/// This is a fallback path; the live-record flow never uses it.
pub async fn transcribe_clip(
    clip: &AudioClip,
    factory: &dyn SpeechEngineFactory,
    output: Option<Arc<dyn AudioOutput>>,
) -> Result<String, RecognitionError> {
    let Some(mut engine) = factory.create() else {
        // Capability gap: no engine, no transcript
        return Ok(String::new());
    };

    let (frame_tx, frame_rx) = mpsc::channel(64);
    let mut events = engine.start(frame_rx).await?;

    info!(
        "Transcribing {:.1}s clip through {}",
        clip.duration_seconds(),
        engine.name()
    );

    let feed_clip = clip.clone();
    let feeder = tokio::spawn(async move {
        let duration_ms = (feed_clip.duration_seconds() * 1000.0) as u64;
        let mut position_ms = 0u64;

        while position_ms < duration_ms {
            let frame = slice_frame(&feed_clip, position_ms, FEED_CHUNK_MS);
            if let Some(out) = &output {
                let _ = out.write(frame.clone()).await;
            }
            if frame_tx.send(frame).await.is_err() {
                break;
            }
            position_ms += FEED_CHUNK_MS;
            tokio::time::sleep(Duration::from_millis(FEED_CHUNK_MS)).await;
        }
        // Dropping the sender signals end-of-audio to the engine
    });

    // One extra second after the clip has fully played
    let deadline = Duration::from_secs_f64(clip.duration_seconds()) + Duration::from_secs(1);
    let timeout = tokio::time::sleep(deadline);
    tokio::pin!(timeout);

    let mut transcript = String::new();
    loop {
        tokio::select! {
            _ = &mut timeout => break,
            event = events.recv() => match event {
                Some(e) if e.is_final => transcript.push_str(&e.text),
                Some(_) => {}
                None => break,
            },
        }
    }

    feeder.abort();
    engine.stop().await;

    if let Some(error) = engine.take_error() {
        return Err(error);
    }

    Ok(transcript)
}

fn slice_frame(clip: &AudioClip, position_ms: u64, chunk_ms: u64) -> AudioFrame {
    let per_ms = clip.sample_rate as u64 * clip.channels as u64 / 1000;
    let start = ((position_ms * per_ms) as usize).min(clip.samples.len());
    let end = (((position_ms + chunk_ms) * per_ms) as usize).min(clip.samples.len());

    AudioFrame {
        samples: clip.samples[start..end].to_vec(),
        sample_rate: clip.sample_rate,
        channels: clip.channels,
        timestamp_ms: position_ms,
    }
}
