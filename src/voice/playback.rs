//! Audio playback to speakers

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SampleRate, StreamConfig, SupportedStreamConfigRange};
use tokio_util::sync::CancellationToken;

use super::{AudioBuffer, AudioFormat, AudioSink, decode};
use crate::{Error, Result};

/// Grace period past the expected duration before giving up on the device
const DRAIN_SLACK: Duration = Duration::from_millis(500);

/// Plays audio to the default output device
pub struct AudioPlayback {
    format: AudioFormat,
    cancel: Option<CancellationToken>,
}

impl AudioPlayback {
    /// Create a playback sink for payloads of the given format
    ///
    /// # Errors
    ///
    /// Returns error if no output device is available
    pub fn new(format: AudioFormat) -> Result<Self> {
        let device = default_device()?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            %format,
            "audio playback initialized"
        );

        Ok(Self {
            format,
            cancel: None,
        })
    }

    /// Stop waiting on playback once `cancel` fires
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Play already-decoded audio, returning once it has finished
    ///
    /// # Errors
    ///
    /// Returns error if the device rejects the stream, or `Cancelled` if
    /// playback was cut short
    pub async fn play_buffer(&self, buffer: AudioBuffer) -> Result<()> {
        let cancel = self.cancel.clone();
        tokio::task::spawn_blocking(move || play_blocking(&buffer, cancel.as_ref()))
            .await
            .map_err(|e| Error::Audio(format!("playback task failed: {e}")))?
    }
}

#[async_trait]
impl AudioSink for AudioPlayback {
    async fn play(&self, audio: &[u8]) -> Result<()> {
        let buffer = decode(audio, self.format)?;
        self.play_buffer(buffer).await
    }
}

fn default_device() -> Result<Device> {
    cpal::default_host()
        .default_output_device()
        .ok_or_else(|| Error::Audio("no output device available".to_string()))
}

/// Pick an f32 output config at the buffer's rate, preferring its channel count
fn output_config(device: &Device, channels: u16, sample_rate: u32) -> Result<StreamConfig> {
    let rate = SampleRate(sample_rate);
    let supports_rate = |c: &SupportedStreamConfigRange| {
        c.sample_format() == SampleFormat::F32
            && c.min_sample_rate() <= rate
            && c.max_sample_rate() >= rate
    };

    let candidates: Vec<SupportedStreamConfigRange> = device
        .supported_output_configs()
        .map_err(|e| Error::Audio(e.to_string()))?
        .filter(supports_rate)
        .collect();

    let chosen = candidates
        .iter()
        .find(|c| c.channels() == channels)
        .or_else(|| candidates.first())
        .cloned()
        .ok_or_else(|| {
            Error::Audio(format!("no output config supports {sample_rate} Hz playback"))
        })?;

    Ok(chosen.with_sample_rate(rate).config())
}

/// Fill one output frame from one input frame
fn map_frame(src: &[f32], dst: &mut [f32]) {
    if src.len() == dst.len() {
        dst.copy_from_slice(src);
    } else if dst.len() == 1 {
        #[allow(clippy::cast_precision_loss)]
        let mixed = src.iter().sum::<f32>() / src.len() as f32;
        dst[0] = mixed;
    } else {
        for (i, out) in dst.iter_mut().enumerate() {
            *out = src[i % src.len()];
        }
    }
}

/// Play samples in a blocking manner
fn play_blocking(buffer: &AudioBuffer, cancel: Option<&CancellationToken>) -> Result<()> {
    if cancel.is_some_and(CancellationToken::is_cancelled) {
        return Err(Error::Cancelled);
    }
    if buffer.samples.is_empty() || buffer.channels == 0 {
        return Ok(());
    }

    let device = default_device()?;
    let config = output_config(&device, buffer.channels, buffer.sample_rate)?;

    let in_channels = usize::from(buffer.channels);
    let out_channels = usize::from(config.channels);
    let total_frames = buffer.frames();
    let samples = buffer.to_f32();

    let finished = Arc::new(AtomicBool::new(false));
    let finished_cb = Arc::clone(&finished);
    let mut position = 0usize;

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(out_channels) {
                    if position < total_frames {
                        let start = position * in_channels;
                        map_frame(&samples[start..start + in_channels], frame);
                        position += 1;
                    } else {
                        frame.fill(0.0);
                        finished_cb.store(true, Ordering::Release);
                    }
                }
            },
            |err| {
                tracing::error!(error = %err, "audio playback error");
            },
            None,
        )
        .map_err(|e| Error::Audio(e.to_string()))?;

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;

    let start = Instant::now();
    let timeout = buffer.duration() + DRAIN_SLACK;

    while !finished.load(Ordering::Acquire) {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            drop(stream);
            tracing::debug!("playback interrupted");
            return Err(Error::Cancelled);
        }
        if start.elapsed() > timeout {
            tracing::warn!(?timeout, "playback did not drain in time");
            break;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    // Let the device flush its last period
    std::thread::sleep(Duration::from_millis(100));

    drop(stream);
    tracing::debug!(
        frames = total_frames,
        channels = in_channels,
        device_channels = out_channels,
        rate = buffer.sample_rate,
        "playback complete"
    );

    Ok(())
}
