//! Configuration management for the Beacon assistant client
//!
//! Values resolve env > TOML file > default. The resolved [`Config`] is
//! built once at startup and handed to every client constructor.

pub mod file;

use std::time::Duration;

use secrecy::SecretString;

use crate::run::PollPolicy;
use crate::voice::AudioFormat;
use crate::{Error, Result};

use file::AssistantConfigFile;

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default `OpenAI-Beta` header value
pub const DEFAULT_BETA: &str = "assistants=v2";

/// Default assistant model
pub const DEFAULT_MODEL: &str = "gpt-4-1106-preview";

/// Default assistant instructions
pub const DEFAULT_INSTRUCTIONS: &str = "You are a helpful assistant.";

/// Default per-request timeout for remote calls
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable holding the bearer credential
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Beacon assistant configuration
#[derive(Debug)]
pub struct Config {
    /// Remote API connection settings
    pub api: ApiConfig,

    /// Assistant persona
    pub assistant: AssistantConfig,

    /// Speech synthesis
    pub voice: VoiceConfig,

    /// Run polling budget
    pub poll: PollPolicy,
}

/// Remote API connection settings
#[derive(Debug)]
pub struct ApiConfig {
    /// Bearer credential
    pub api_key: SecretString,

    /// Base URL without trailing slash
    pub base_url: String,

    /// `OpenAI-Beta` header value
    pub beta: String,

    /// Upper bound on one request, connect to last body byte
    pub request_timeout: Duration,
}

/// Assistant persona settings
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Chat model identifier
    pub model: String,

    /// System instructions
    pub instructions: String,
}

/// Speech synthesis settings
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// TTS model (e.g. "tts-1")
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier (0.25 to 4.0)
    pub tts_speed: f64,

    /// Compressed audio format requested from the service
    pub format: AudioFormat,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            tts_speed: 1.0,
            format: AudioFormat::Mp3,
        }
    }
}

impl Config {
    /// Load configuration from the process environment and the config file
    ///
    /// # Errors
    ///
    /// Returns error if `OPENAI_API_KEY` is missing or a setting is invalid
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        Self::resolve(fc, |key| std::env::var(key).ok())
    }

    /// Resolve configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if no credential is available or a setting is invalid
    pub fn resolve<F>(fc: AssistantConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = env(API_KEY_ENV)
            .filter(|k| !k.trim().is_empty())
            .or_else(|| fc.api.key.filter(|k| !k.trim().is_empty()))
            .ok_or_else(|| Error::Config(format!("{API_KEY_ENV} is not set")))?;

        let base_url = env("BEACON_ASSISTANT_BASE_URL")
            .or(fc.api.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let request_timeout = match env("BEACON_REQUEST_TIMEOUT_SECS") {
            Some(s) => Duration::from_secs(parse_setting("BEACON_REQUEST_TIMEOUT_SECS", &s)?),
            None => fc
                .api
                .timeout_secs
                .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_secs),
        };
        if request_timeout.is_zero() {
            return Err(Error::Config(
                "request timeout must be at least 1 second".to_string(),
            ));
        }

        let api = ApiConfig {
            api_key: SecretString::from(api_key),
            base_url,
            beta: env("BEACON_ASSISTANT_BETA")
                .or(fc.api.beta)
                .unwrap_or_else(|| DEFAULT_BETA.to_string()),
            request_timeout,
        };

        let assistant = AssistantConfig {
            model: env("BEACON_ASSISTANT_MODEL")
                .or(fc.assistant.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            instructions: env("BEACON_ASSISTANT_INSTRUCTIONS")
                .or(fc.assistant.instructions)
                .unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string()),
        };

        let defaults = VoiceConfig::default();
        let tts_speed = match env("BEACON_TTS_SPEED") {
            Some(s) => parse_setting::<f64>("BEACON_TTS_SPEED", &s)?,
            None => fc.voice.tts_speed.unwrap_or(defaults.tts_speed),
        };
        if !(0.25..=4.0).contains(&tts_speed) {
            return Err(Error::Config(format!(
                "TTS speed must be between 0.25 and 4.0, got {tts_speed}"
            )));
        }
        let format = match env("BEACON_TTS_FORMAT").or(fc.voice.format) {
            Some(s) => s.parse()?,
            None => defaults.format,
        };
        let voice = VoiceConfig {
            tts_model: env("BEACON_TTS_MODEL")
                .or(fc.voice.tts_model)
                .unwrap_or(defaults.tts_model),
            tts_voice: env("BEACON_TTS_VOICE")
                .or(fc.voice.tts_voice)
                .unwrap_or(defaults.tts_voice),
            tts_speed,
            format,
        };

        let default_poll = PollPolicy::default();
        let interval = match env("BEACON_POLL_INTERVAL_MS") {
            Some(s) => Duration::from_millis(parse_setting("BEACON_POLL_INTERVAL_MS", &s)?),
            None => fc
                .poll
                .interval_ms
                .map_or(default_poll.interval, Duration::from_millis),
        };
        let max_attempts = match env("BEACON_POLL_MAX_ATTEMPTS") {
            Some(s) => parse_setting("BEACON_POLL_MAX_ATTEMPTS", &s)?,
            None => fc.poll.max_attempts.unwrap_or(default_poll.max_attempts),
        };
        if max_attempts == 0 {
            return Err(Error::Config(
                "poll max attempts must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            api,
            assistant,
            voice,
            poll: PollPolicy {
                interval,
                max_attempts,
            },
        })
    }
}

fn parse_setting<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("invalid value for {name}: {value:?}")))
}
