//! Utero Voice - Realtime voice sessions with the cycle assistant
//!
//! Captures microphone audio, streams it to a live generative session,
//! plays the assistant's audio back gaplessly, keeps a running transcript,
//! and dispatches the assistant's tool calls to the cycle journal.

pub mod audio;
pub mod controller;
pub mod error;
pub mod pcm;
pub mod playback;
pub mod protocol;
pub mod transcript;
pub mod transport;
pub mod wav;

pub use audio::{AudioDevices, CaptureFeed, InputEndpoint, Microphone, OutputEndpoint, ResamplingInput, SourceId};
pub use controller::{VoiceConfig, VoiceEvent, VoiceSessionController, VoiceState, DEFAULT_LIVE_MODEL};
pub use error::{VoiceError, VoiceResult};
pub use pcm::AudioChunk;
pub use playback::{PlaybackScheduler, ScheduledChunk};
pub use transcript::Transcript;
pub use transport::{
    is_secure_endpoint, GeminiLiveTransport, LiveSink, LiveStream, LiveTransport, SessionHandle, GEMINI_LIVE_URL,
};
pub use wav::{read_wav_mono, WavDevices};
