//! Audio device seams
//!
//! A session acquires a `Microphone` (the permission step), an input endpoint
//! that converts the microphone feed into fixed-size frames at the session
//! input rate, and an output endpoint with its own clock that plays decoded
//! chunks at scheduled times.

use crate::error::VoiceResult;
use crate::pcm::{AudioChunk, Framer, StreamResampler};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Handle for one scheduled output chunk.
pub type SourceId = u64;

/// Raw mono capture at the device's native rate.
pub struct CaptureFeed {
    pub sample_rate: u32,
    pub blocks: mpsc::UnboundedReceiver<Vec<f32>>,
}

pub trait Microphone: Send {
    fn label(&self) -> &str;

    /// Start capture. Yields the feed once; later calls return `None`.
    fn take_feed(&mut self) -> Option<CaptureFeed>;

    /// Stop capture and give the device back.
    fn release(&mut self);
}

pub trait InputEndpoint: Send {
    fn sample_rate(&self) -> u32;

    /// Route `feed` into `frames` as blocks of exactly `frame_size` samples.
    fn connect(
        &mut self,
        feed: CaptureFeed,
        frame_size: usize,
        frames: mpsc::UnboundedSender<Vec<f32>>,
    ) -> VoiceResult<()>;

    /// Stop forwarding frames.
    fn disconnect(&mut self);

    fn close(&mut self);
}

pub trait OutputEndpoint: Send {
    fn sample_rate(&self) -> u32;

    /// Output clock in seconds since the endpoint opened.
    fn now(&self) -> f64;

    fn play_at(&mut self, chunk: &AudioChunk, start: f64) -> VoiceResult<SourceId>;

    fn stop(&mut self, id: SourceId);

    fn close(&mut self);
}

#[async_trait::async_trait]
pub trait AudioDevices: Send + Sync {
    async fn open_microphone(&self) -> VoiceResult<Box<dyn Microphone>>;

    fn open_input(&self, sample_rate: u32) -> VoiceResult<Box<dyn InputEndpoint>>;

    fn open_output(&self, sample_rate: u32) -> VoiceResult<Box<dyn OutputEndpoint>>;
}

/// Input endpoint that resamples a capture feed to its own rate and cuts it
/// into frames on a background task.
pub struct ResamplingInput {
    sample_rate: u32,
    cancel: CancellationToken,
}

impl ResamplingInput {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            cancel: CancellationToken::new(),
        }
    }
}

impl InputEndpoint for ResamplingInput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn connect(
        &mut self,
        mut feed: CaptureFeed,
        frame_size: usize,
        frames: mpsc::UnboundedSender<Vec<f32>>,
    ) -> VoiceResult<()> {
        let cancel = self.cancel.clone();
        let mut resampler = StreamResampler::new(feed.sample_rate, self.sample_rate);
        let mut framer = Framer::new(frame_size);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    block = feed.blocks.recv() => match block {
                        Some(block) => {
                            for frame in framer.push(&resampler.process(&block)) {
                                if frames.send(frame).is_err() {
                                    return;
                                }
                            }
                        }
                        None => break,
                    },
                }
            }
            // capture ended on its own: flush the tail, padded with silence
            let mut tail = framer.push(&resampler.flush());
            if let Some(mut last) = framer.finish() {
                last.resize(frame_size, 0.0);
                tail.push(last);
            }
            for frame in tail {
                let _ = frames.send(frame);
            }
            debug!("capture feed ended");
        });
        Ok(())
    }

    fn disconnect(&mut self) {
        self.cancel.cancel();
    }

    fn close(&mut self) {
        self.cancel.cancel();
    }
}
