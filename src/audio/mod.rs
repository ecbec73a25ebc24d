pub mod backend;
pub mod clip;
pub mod cpal_backend;
pub mod playback;
pub mod recorder;

pub use backend::{AudioFrame, CaptureBackend, CaptureConfig};
pub use clip::AudioClip;
pub use cpal_backend::CpalBackend;
pub use playback::{AudioOutput, CpalOutput, Player, PlayerState};
pub use recorder::Recorder;
