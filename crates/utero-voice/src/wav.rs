//! WAV file audio devices
//!
//! The microphone plays a WAV file into the session in real time; the output
//! endpoint renders scheduled chunks onto a wall-clock timeline and writes a
//! mono 16-bit WAV when it is closed. Audio that had not played by the time
//! a chunk is stopped, or the endpoint closed, is cut.

use crate::audio::{AudioDevices, CaptureFeed, InputEndpoint, Microphone, OutputEndpoint, ResamplingInput, SourceId};
use crate::error::{VoiceError, VoiceResult};
use crate::pcm::{f32_to_i16, to_mono, AudioChunk};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Capture block length.
const BLOCK_MILLIS: u64 = 20;

pub struct WavDevices {
    input_path: PathBuf,
    output_path: Option<PathBuf>,
    realtime: bool,
}

impl WavDevices {
    pub fn new(input_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: None,
            realtime: true,
        }
    }

    /// Write the assistant's audio to this file when the session closes.
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Deliver capture as fast as it is consumed instead of in real time.
    pub fn unpaced(mut self) -> Self {
        self.realtime = false;
        self
    }
}

/// Read a WAV file as mono f32 samples plus its sample rate.
pub fn read_wav_mono(path: &Path) -> VoiceResult<(Vec<f32>, u32)> {
    let mut reader = hound::WavReader::open(path)
        .map_err(|e| VoiceError::Microphone(format!("{}: {}", path.display(), e)))?;
    let spec = reader.spec();
    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| VoiceError::Microphone(e.to_string()))?,
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|e| VoiceError::Microphone(e.to_string()))?
        }
    };
    Ok((to_mono(&interleaved, usize::from(spec.channels)), spec.sample_rate))
}

#[async_trait::async_trait]
impl AudioDevices for WavDevices {
    async fn open_microphone(&self) -> VoiceResult<Box<dyn Microphone>> {
        let path = self.input_path.clone();
        let (samples, sample_rate) = tokio::task::spawn_blocking(move || read_wav_mono(&path))
            .await
            .map_err(|e| VoiceError::Microphone(e.to_string()))??;
        info!(
            "Microphone: {} ({} Hz, {:.1}s)",
            self.input_path.display(),
            sample_rate,
            samples.len() as f64 / f64::from(sample_rate.max(1))
        );
        Ok(Box::new(WavMicrophone {
            label: self.input_path.display().to_string(),
            samples: Some(samples),
            sample_rate,
            realtime: self.realtime,
            cancel: CancellationToken::new(),
        }))
    }

    fn open_input(&self, sample_rate: u32) -> VoiceResult<Box<dyn InputEndpoint>> {
        Ok(Box::new(ResamplingInput::new(sample_rate)))
    }

    fn open_output(&self, sample_rate: u32) -> VoiceResult<Box<dyn OutputEndpoint>> {
        Ok(Box::new(WavOutput::new(sample_rate, self.output_path.clone())))
    }
}

pub struct WavMicrophone {
    label: String,
    samples: Option<Vec<f32>>,
    sample_rate: u32,
    realtime: bool,
    cancel: CancellationToken,
}

impl Microphone for WavMicrophone {
    fn label(&self) -> &str {
        &self.label
    }

    fn take_feed(&mut self) -> Option<CaptureFeed> {
        let samples = self.samples.take()?;
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = self.cancel.clone();
        let block_len = ((u64::from(self.sample_rate) * BLOCK_MILLIS) / 1000).max(1) as usize;
        let realtime = self.realtime;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(BLOCK_MILLIS));
            for block in samples.chunks(block_len) {
                if realtime {
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        _ = ticker.tick() => {}
                    }
                } else if cancel.is_cancelled() {
                    return;
                }
                if tx.send(block.to_vec()).is_err() {
                    return;
                }
            }
        });

        Some(CaptureFeed {
            sample_rate: self.sample_rate,
            blocks: rx,
        })
    }

    fn release(&mut self) {
        self.cancel.cancel();
        self.samples = None;
    }
}

struct PlacedChunk {
    start_sample: usize,
    samples: Vec<f32>,
    /// Sample offset (absolute) after which this chunk is silent.
    cut_at: Option<usize>,
}

pub struct WavOutput {
    sample_rate: u32,
    opened: Instant,
    path: Option<PathBuf>,
    chunks: BTreeMap<SourceId, PlacedChunk>,
    next_id: SourceId,
    closed: bool,
}

impl WavOutput {
    pub fn new(sample_rate: u32, path: Option<PathBuf>) -> Self {
        Self {
            sample_rate,
            opened: Instant::now(),
            path,
            chunks: BTreeMap::new(),
            next_id: 1,
            closed: false,
        }
    }

    fn now_sample(&self) -> usize {
        (self.now() * f64::from(self.sample_rate)) as usize
    }

    /// Mix every chunk, honouring cuts, into one timeline.
    fn render(&self) -> Vec<f32> {
        let len = self
            .chunks
            .values()
            .map(|c| {
                let end = c.start_sample + c.samples.len();
                c.cut_at.map_or(end, |cut| end.min(cut))
            })
            .max()
            .unwrap_or(0);
        let mut timeline = vec![0.0_f32; len];
        for chunk in self.chunks.values() {
            for (i, s) in chunk.samples.iter().enumerate() {
                let at = chunk.start_sample + i;
                if chunk.cut_at.is_some_and(|cut| at >= cut) {
                    break;
                }
                timeline[at] += *s;
            }
        }
        timeline
    }

    fn write(&self, path: &Path) -> Result<(), hound::Error> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for s in self.render() {
            writer.write_sample(f32_to_i16(s))?;
        }
        writer.finalize()
    }
}

impl OutputEndpoint for WavOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn now(&self) -> f64 {
        self.opened.elapsed().as_secs_f64()
    }

    fn play_at(&mut self, chunk: &AudioChunk, start: f64) -> VoiceResult<SourceId> {
        if self.closed {
            return Err(VoiceError::Device("output endpoint is closed".into()));
        }
        let samples = if chunk.sample_rate == self.sample_rate {
            chunk.samples.clone()
        } else {
            crate::pcm::resample_linear(&chunk.samples, chunk.sample_rate, self.sample_rate)
        };
        let id = self.next_id;
        self.next_id += 1;
        self.chunks.insert(
            id,
            PlacedChunk {
                start_sample: (start.max(0.0) * f64::from(self.sample_rate)) as usize,
                samples,
                cut_at: None,
            },
        );
        Ok(id)
    }

    fn stop(&mut self, id: SourceId) {
        if self.closed {
            return;
        }
        let now = self.now_sample();
        if let Some(chunk) = self.chunks.get_mut(&id) {
            chunk.cut_at = Some(chunk.cut_at.map_or(now, |c| c.min(now)));
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        let now = self.now_sample();
        for chunk in self.chunks.values_mut() {
            chunk.cut_at = Some(chunk.cut_at.map_or(now, |c| c.min(now)));
        }
        self.closed = true;

        let Some(path) = self.path.clone() else {
            return;
        };
        if self.chunks.is_empty() {
            warn!("No assistant audio received; not writing {}", path.display());
            return;
        }
        match self.write(&path) {
            Ok(()) => info!("Assistant audio written to {}", path.display()),
            Err(e) => error!("Failed to write {}: {}", path.display(), e),
        }
    }
}
