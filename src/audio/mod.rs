pub mod capture;
pub mod frame;
pub mod playback;
pub mod probe;

pub use capture::{CaptureAdapter, RecordingArtifact};
pub use frame::{AudioFrame, FrameSource, SilenceSource};
pub use playback::{ClockedPlayer, PlaybackEvent, PromptPlayer};
pub use probe::PromptAudio;
