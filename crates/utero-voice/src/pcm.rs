//! 16-bit PCM codec, mixdown and resampling
//!
//! Samples are mono `f32` in `[-1.0, 1.0]`. The wire form is little-endian
//! signed 16-bit integers, base64 encoded.

use crate::error::{VoiceError, VoiceResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Decoded mono audio at a known sample rate
#[derive(Clone, Debug, PartialEq)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioChunk {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }
}

pub fn f32_to_i16(sample: f32) -> i16 {
    // clamp instead of wrapping on overdriven input
    (sample.clamp(-1.0, 1.0) * 32768.0).clamp(-32768.0, 32767.0) as i16
}

pub fn i16_to_f32(sample: i16) -> f32 {
    f32::from(sample) / 32768.0
}

/// Encode float samples as base64 PCM16 LE.
pub fn encode_pcm16(samples: &[f32]) -> String {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for s in samples {
        bytes.extend_from_slice(&f32_to_i16(*s).to_le_bytes());
    }
    STANDARD.encode(bytes)
}

/// Decode base64 PCM16 LE into a chunk. A trailing odd byte is dropped.
pub fn decode_pcm16(data: &str, sample_rate: u32) -> VoiceResult<AudioChunk> {
    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|e| VoiceError::Audio(e.to_string()))?;
    let samples = bytes
        .chunks_exact(2)
        .map(|b| i16_to_f32(i16::from_le_bytes([b[0], b[1]])))
        .collect();
    Ok(AudioChunk::new(samples, sample_rate))
}

/// Average interleaved channels down to mono.
pub fn to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels)
        .map(|c| c.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// One-shot linear resampling.
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    let mut r = StreamResampler::new(from_rate, to_rate);
    let mut out = r.process(samples);
    out.extend(r.flush());
    out
}

/// Incremental linear-interpolation resampler. Keeps its fractional read
/// position across blocks so block boundaries do not click.
#[derive(Debug)]
pub struct StreamResampler {
    step: f64,
    pos: f64,
    pending: Vec<f32>,
}

impl StreamResampler {
    pub fn new(from_rate: u32, to_rate: u32) -> Self {
        let step = if from_rate == 0 || to_rate == 0 {
            1.0
        } else {
            f64::from(from_rate) / f64::from(to_rate)
        };
        Self {
            step,
            pos: 0.0,
            pending: Vec::new(),
        }
    }

    pub fn is_passthrough(&self) -> bool {
        (self.step - 1.0).abs() < f64::EPSILON
    }

    pub fn process(&mut self, input: &[f32]) -> Vec<f32> {
        if self.is_passthrough() {
            return input.to_vec();
        }
        self.pending.extend_from_slice(input);
        let mut out = Vec::with_capacity((input.len() as f64 / self.step) as usize + 1);
        loop {
            let i = self.pos as usize;
            if i + 1 >= self.pending.len() {
                break;
            }
            let frac = (self.pos - i as f64) as f32;
            out.push(self.pending[i] + (self.pending[i + 1] - self.pending[i]) * frac);
            self.pos += self.step;
        }
        let consumed = (self.pos as usize).min(self.pending.len());
        self.pending.drain(..consumed);
        self.pos -= consumed as f64;
        out
    }

    /// Emit whatever remains once the input has ended.
    pub fn flush(&mut self) -> Vec<f32> {
        let mut out = Vec::new();
        while (self.pos as usize) < self.pending.len() {
            out.push(self.pending[self.pos as usize]);
            self.pos += self.step;
        }
        self.pending.clear();
        self.pos = 0.0;
        out
    }
}

/// Cuts a sample stream into fixed-size frames.
#[derive(Debug)]
pub struct Framer {
    frame_size: usize,
    buffer: Vec<f32>,
}

impl Framer {
    pub fn new(frame_size: usize) -> Self {
        let frame_size = frame_size.max(1);
        Self {
            frame_size,
            buffer: Vec::with_capacity(frame_size),
        }
    }

    pub fn push(&mut self, samples: &[f32]) -> Vec<Vec<f32>> {
        self.buffer.extend_from_slice(samples);
        let mut frames = Vec::new();
        while self.buffer.len() >= self.frame_size {
            let rest = self.buffer.split_off(self.frame_size);
            frames.push(std::mem::replace(&mut self.buffer, rest));
        }
        frames
    }

    /// Remaining partial frame, if any.
    pub fn finish(&mut self) -> Option<Vec<f32>> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buffer))
        }
    }
}
