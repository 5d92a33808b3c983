//! Decoding compressed speech into PCM

use std::io::Cursor;
use std::str::FromStr;
use std::time::Duration;

use crate::{Error, Result};

/// Compressed audio format requested from the speech service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioFormat {
    /// MPEG-1/2 Layer III
    #[default]
    Mp3,
    /// RIFF WAVE with PCM or float samples
    Wav,
}

impl AudioFormat {
    /// Name used on the wire (`response_format`)
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp3" => Ok(Self::Mp3),
            "wav" => Ok(Self::Wav),
            other => Err(Error::Config(format!(
                "unsupported audio format {other:?} (expected mp3 or wav)"
            ))),
        }
    }
}

/// Decoded PCM audio
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBuffer {
    /// Interleaved signed 16-bit samples
    pub samples: Vec<i16>,
    /// Channel count
    pub channels: u16,
    /// Bytes per sample
    pub sample_width: u16,
    /// Frames per second
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Number of frames (samples per channel)
    #[must_use]
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }

    /// Playback length
    #[must_use]
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        #[allow(clippy::cast_precision_loss)]
        let frames = self.frames() as f64;
        Duration::from_secs_f64(frames / f64::from(self.sample_rate))
    }

    /// Samples scaled to `[-1.0, 1.0)`
    #[must_use]
    pub fn to_f32(&self) -> Vec<f32> {
        self.samples.iter().map(|&s| f32::from(s) / 32768.0).collect()
    }
}

/// Decode a compressed byte stream
///
/// # Errors
///
/// Returns `AudioDecode` for empty or malformed payloads
pub fn decode(data: &[u8], format: AudioFormat) -> Result<AudioBuffer> {
    if data.is_empty() {
        return Err(Error::AudioDecode("empty audio payload".to_string()));
    }

    let buffer = match format {
        AudioFormat::Mp3 => decode_mp3(data)?,
        AudioFormat::Wav => decode_wav(data)?,
    };

    tracing::debug!(
        %format,
        channels = buffer.channels,
        sample_rate = buffer.sample_rate,
        frames = buffer.frames(),
        "audio decoded"
    );

    Ok(buffer)
}

/// Decode MP3 bytes to interleaved i16 samples
fn decode_mp3(mp3_data: &[u8]) -> Result<AudioBuffer> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();
    let mut layout: Option<(u16, u32)> = None;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                let channels = u16::try_from(frame.channels)
                    .map_err(|_| Error::AudioDecode("bad channel count".to_string()))?;
                let sample_rate = u32::try_from(frame.sample_rate)
                    .map_err(|_| Error::AudioDecode("bad sample rate".to_string()))?;

                match layout {
                    None => layout = Some((channels, sample_rate)),
                    Some(l) if l != (channels, sample_rate) => {
                        return Err(Error::AudioDecode(
                            "MP3 frames change channel layout or rate".to_string(),
                        ));
                    }
                    Some(_) => {}
                }

                samples.extend_from_slice(&frame.data);
            }
            Err(minimp3::Error::Eof) => break,
            Err(minimp3::Error::SkippedData) => {}
            Err(e) => return Err(Error::AudioDecode(format!("MP3 decode error: {e}"))),
        }
    }

    let (channels, sample_rate) =
        layout.ok_or_else(|| Error::AudioDecode("no MP3 frames found".to_string()))?;

    Ok(AudioBuffer {
        samples,
        channels,
        sample_width: 2,
        sample_rate,
    })
}

/// Decode WAV bytes, converting any sample format to i16
fn decode_wav(wav_data: &[u8]) -> Result<AudioBuffer> {
    let mut reader = hound::WavReader::new(Cursor::new(wav_data))
        .map_err(|e| Error::AudioDecode(format!("WAV decode error: {e}")))?;
    let spec = reader.spec();

    let samples: std::result::Result<Vec<i16>, hound::Error> =
        match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Int, 8) => reader
                .samples::<i8>()
                .map(|s| s.map(|v| i16::from(v) << 8))
                .collect(),
            (hound::SampleFormat::Int, 16) => reader.samples::<i16>().collect(),
            (hound::SampleFormat::Int, bits) if (17..=32).contains(&bits) => {
                let shift = bits - 16;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| clamp_i16(v >> shift)))
                    .collect()
            }
            #[allow(clippy::cast_possible_truncation)]
            (hound::SampleFormat::Float, _) => reader
                .samples::<f32>()
                .map(|s| s.map(|v| clamp_i16((v.clamp(-1.0, 1.0) * 32767.0) as i32)))
                .collect(),
            (_, bits) => {
                return Err(Error::AudioDecode(format!(
                    "unsupported WAV sample width: {bits} bits"
                )));
            }
        };

    let samples = samples.map_err(|e| Error::AudioDecode(format!("WAV decode error: {e}")))?;
    if spec.channels == 0 {
        return Err(Error::AudioDecode("WAV has no channels".to_string()));
    }

    Ok(AudioBuffer {
        samples,
        channels: spec.channels,
        sample_width: 2,
        sample_rate: spec.sample_rate,
    })
}

fn clamp_i16(v: i32) -> i16 {
    i16::try_from(v.clamp(i32::from(i16::MIN), i32::from(i16::MAX))).unwrap_or_default()
}
