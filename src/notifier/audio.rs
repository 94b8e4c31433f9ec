//! Sinks for synthesized alert sounds. Every sink is best-effort: the
//! notification handler logs playback errors and carries on.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::notifier::sound::{LayerRole, SoundCue};

pub const SAMPLE_RATE: u32 = 44_100;

pub trait AudioOutput: Send + Sync + 'static {
    fn play(&self, cue: &SoundCue) -> Result<()>;
}

/// Audio is unavailable; cues are discarded.
pub struct NoAudio;

impl AudioOutput for NoAudio {
    fn play(&self, _cue: &SoundCue) -> Result<()> {
        Ok(())
    }
}

/// Approximates a cue with the terminal bell: one ring per sweep and ping,
/// a single ring for a plain chime.
pub struct TerminalBell;

impl TerminalBell {
    pub fn rings(cue: &SoundCue) -> usize {
        (cue.count(LayerRole::Sweep) + cue.count(LayerRole::Ping)).max(1)
    }
}

impl AudioOutput for TerminalBell {
    fn play(&self, cue: &SoundCue) -> Result<()> {
        let bells = vec![0x07u8; Self::rings(cue)];
        let mut out = std::io::stdout().lock();
        out.write_all(&bells)?;
        out.flush()?;
        Ok(())
    }
}

/// Plays rendered cues on the default output device.
///
/// Each cue is rendered and played on its own thread, which also owns the
/// output stream (rodio streams are not `Send`).
#[cfg(feature = "sound")]
pub struct RodioOutput {
    sample_rate: u32,
}

#[cfg(feature = "sound")]
impl RodioOutput {
    /// `None` when no output device can be opened.
    pub fn try_default() -> Option<Self> {
        match rodio::OutputStream::try_default() {
            Ok(_) => Some(Self {
                sample_rate: SAMPLE_RATE,
            }),
            Err(e) => {
                tracing::info!("No audio device available: {}", e);
                None
            }
        }
    }
}

#[cfg(feature = "sound")]
impl AudioOutput for RodioOutput {
    fn play(&self, cue: &SoundCue) -> Result<()> {
        let sample_rate = self.sample_rate;
        let cue = cue.clone();
        std::thread::Builder::new()
            .name("alert-sound".to_string())
            .spawn(move || {
                if let Err(e) = play_samples(sample_rate, cue.render(sample_rate)) {
                    tracing::warn!("Alert sound playback failed: {}", e);
                }
            })
            .context("spawn playback thread")?;
        Ok(())
    }
}

/// Blocks until the samples have finished playing.
#[cfg(feature = "sound")]
fn play_samples(sample_rate: u32, samples: Vec<f32>) -> Result<()> {
    let (_stream, handle) = rodio::OutputStream::try_default()?;
    let sink = rodio::Sink::try_new(&handle)?;
    sink.append(rodio::buffer::SamplesBuffer::new(1, sample_rate, samples));
    sink.sleep_until_end();
    Ok(())
}

/// Speaker playback when built with the `sound` feature and a device is
/// present, otherwise the terminal bell.
pub fn default_output() -> Arc<dyn AudioOutput> {
    #[cfg(feature = "sound")]
    {
        if let Some(out) = RodioOutput::try_default() {
            return Arc::new(out);
        }
    }
    Arc::new(TerminalBell)
}

/// Renders each cue and writes it to a 16-bit mono WAV file, replacing the
/// previous one.
pub struct WavFileOutput {
    path: PathBuf,
    sample_rate: u32,
}

impl WavFileOutput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sample_rate: SAMPLE_RATE,
        }
    }

    /// Renders and writes on the calling thread.
    pub fn write_cue(&self, cue: &SoundCue) -> Result<()> {
        write_wav(&self.path, &cue.render(self.sample_rate), self.sample_rate)
    }
}

fn write_wav(path: &std::path::Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    std::fs::write(path, encode_wav(samples, sample_rate))
        .with_context(|| format!("write {}", path.display()))
}

impl AudioOutput for WavFileOutput {
    /// Inside a tokio runtime the render and write run on the blocking pool
    /// and failures are logged there.
    fn play(&self, cue: &SoundCue) -> Result<()> {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return self.write_cue(cue);
        };

        let cue = cue.clone();
        let path = self.path.clone();
        let sample_rate = self.sample_rate;
        runtime.spawn_blocking(move || {
            if let Err(e) = write_wav(&path, &cue.render(sample_rate), sample_rate) {
                tracing::warn!("Alert sound not written: {:#}", e);
            }
        });
        Ok(())
    }
}

/// Canonical 44-byte RIFF header followed by little-endian i16 PCM.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let mut buf = Vec::with_capacity(44 + data_len as usize);

    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(36 + data_len).to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&1u16.to_le_bytes()); // mono
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    buf.extend_from_slice(&2u16.to_le_bytes());
    buf.extend_from_slice(&16u16.to_le_bytes());

    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_len.to_le_bytes());
    for s in samples {
        let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        buf.extend_from_slice(&v.to_le_bytes());
    }

    buf
}
