//! TOML configuration file loading
//!
//! Supports `~/.config/omni/beacon-assistant/config.toml` as a persistent
//! config source. All fields are optional; the file is a partial overlay on
//! top of defaults and is overridden by environment variables.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct AssistantConfigFile {
    /// Remote API settings
    #[serde(default)]
    pub api: ApiFileConfig,

    /// Assistant persona settings
    #[serde(default)]
    pub assistant: AssistantFileConfig,

    /// Speech synthesis settings
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Run polling settings
    #[serde(default)]
    pub poll: PollFileConfig,
}

/// Remote API configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiFileConfig {
    /// Bearer credential (prefer `OPENAI_API_KEY`)
    pub key: Option<String>,

    /// Base URL (e.g. "https://api.openai.com/v1")
    pub base_url: Option<String>,

    /// Value of the `OpenAI-Beta` header
    pub beta: Option<String>,

    /// Per-request timeout, in seconds
    pub timeout_secs: Option<u64>,
}

/// Assistant persona configuration
#[derive(Debug, Default, Deserialize)]
pub struct AssistantFileConfig {
    /// Chat model identifier
    pub model: Option<String>,

    /// System instructions
    pub instructions: Option<String>,
}

/// Voice configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// TTS voice identifier (e.g. "alloy")
    pub tts_voice: Option<String>,

    /// TTS speed multiplier
    pub tts_speed: Option<f64>,

    /// Response format ("mp3" or "wav")
    pub format: Option<String>,
}

/// Polling configuration
#[derive(Debug, Default, Deserialize)]
pub struct PollFileConfig {
    /// Delay between run status checks, in milliseconds
    pub interval_ms: Option<u64>,

    /// Status checks before giving up
    pub max_attempts: Option<u32>,
}

/// Load the TOML config file from the standard path
///
/// Returns `AssistantConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> AssistantConfigFile {
    config_file_path().map_or_else(AssistantConfigFile::default, |path| load_from(&path))
}

/// Load a TOML config file from an explicit path
///
/// Missing or unparsable files yield defaults.
pub fn load_from(path: &Path) -> AssistantConfigFile {
    if !path.exists() {
        return AssistantConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                AssistantConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            AssistantConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/omni/beacon-assistant/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| {
        d.config_dir()
            .join("omni")
            .join("beacon-assistant")
            .join("config.toml")
    })
}
