//! Text-to-speech (TTS) processing

use async_trait::async_trait;

use super::{AudioFormat, SpeechSynthesizer};
use crate::api::HttpClient;
use crate::config::VoiceConfig;
use crate::Result;

/// Synthesizes speech through the `OpenAI` speech endpoint
pub struct TextToSpeech {
    http: HttpClient,
    model: String,
    voice: String,
    speed: f64,
    format: AudioFormat,
}

impl TextToSpeech {
    /// Create a TTS client sharing the assistant's HTTP client
    #[must_use]
    pub fn new(http: HttpClient, config: &VoiceConfig) -> Self {
        Self {
            http,
            model: config.tts_model.clone(),
            voice: config.tts_voice.clone(),
            speed: config.tts_speed,
            format: config.format,
        }
    }

    /// Format of the bytes [`SpeechSynthesizer::synthesize`] returns
    #[must_use]
    pub const fn format(&self) -> AudioFormat {
        self.format
    }
}

#[async_trait]
impl SpeechSynthesizer for TextToSpeech {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f64,
            response_format: &'a str,
        }

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            speed: self.speed,
            response_format: self.format.as_str(),
        };

        let audio = self.http.post_bytes("audio/speech", &request).await?;
        tracing::debug!(
            bytes = audio.len(),
            voice = %self.voice,
            format = %self.format,
            "speech synthesized"
        );

        Ok(audio)
    }
}
