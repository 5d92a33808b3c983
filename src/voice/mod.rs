//! Voice output: speech synthesis, decoding and playback

mod decode;
mod playback;
mod tts;

use async_trait::async_trait;

pub use decode::{AudioBuffer, AudioFormat, decode};
pub use playback::AudioPlayback;
pub use tts::TextToSpeech;

use crate::Result;

/// Turns text into compressed audio
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text`, returning the encoded audio bytes
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// Plays compressed audio, returning once playback has finished
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Decode and play `audio`
    async fn play(&self, audio: &[u8]) -> Result<()>;
}
