//! Voice session controller
//!
//! State machine:
//!
//! ```text
//! Idle -> Connecting -> Streaming <-> ToolDispatch
//!                           |
//!                        Closing -> Idle
//! Connecting | Streaming -> Error -> Idle
//! ```
//!
//! A session runs two tasks. The sender drains captured frames, encodes them
//! and pushes them to the remote session without waiting for replies. The
//! receiver dispatches server messages: transcript fragments, tool calls, and
//! audio to schedule. Teardown never waits on either task; it cancels them
//! and releases every resource in a fixed order.

use crate::audio::{AudioDevices, InputEndpoint, Microphone, OutputEndpoint};
use crate::error::{VoiceError, VoiceResult};
use crate::pcm::{decode_pcm16, encode_pcm16};
use crate::playback::PlaybackScheduler;
use crate::protocol::{
    mime_sample_rate, pcm_mime, Blob, ClientMessage, FunctionCall, FunctionResponse, RealtimeInput,
    ServerContent, ServerMessage, SetupConfig, ToolResponse,
};
use crate::transcript::Transcript;
use crate::transport::{is_secure_endpoint, LiveStream, LiveTransport, SessionHandle};
use futures::StreamExt;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use utero_core::{TranscriptEntry, TranscriptSource};
use utero_tools::ToolRegistry;

pub const DEFAULT_LIVE_MODEL: &str = "gemini-2.5-flash-native-audio-preview-09-2025";

/// Upper bound on closing the remote session during teardown.
const SESSION_CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

const INSECURE_CONTEXT_MESSAGE: &str = "Microphone access requires a secure context (HTTPS) or localhost. \
     Connect to the live endpoint over wss:// or run the endpoint on localhost.";

#[derive(Clone, Debug)]
pub struct VoiceConfig {
    pub model: String,
    /// Samples per outbound frame.
    pub frame_size: usize,
    pub input_sample_rate: u32,
    pub output_sample_rate: u32,
    pub system_instruction: Option<String>,
    pub voice_name: Option<String>,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_LIVE_MODEL.to_string(),
            frame_size: 4096,
            input_sample_rate: 16000,
            output_sample_rate: 24000,
            system_instruction: None,
            voice_name: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VoiceState {
    Idle,
    Connecting,
    Streaming,
    ToolDispatch,
    Closing,
    Error(String),
}

impl VoiceState {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Streaming | Self::ToolDispatch)
    }
}

#[derive(Clone, Debug)]
pub enum VoiceEvent {
    State(VoiceState),
    /// Entry at `index` was created or extended.
    Transcript { index: usize, entry: TranscriptEntry },
    ToolCall { name: String, args: Value, is_error: bool },
    TurnComplete,
    Error(String),
}

// ---------------------------------------------------------------------------
// Session resources
// ---------------------------------------------------------------------------

/// Output endpoint plus the schedule of chunks queued on it.
struct Playback {
    output: Option<Box<dyn OutputEndpoint>>,
    scheduler: PlaybackScheduler,
}

/// Every hardware and network handle owned by one session. Filled in as
/// `start` acquires them. Released explicitly by teardown; `Drop` covers
/// paths that never reach it.
#[derive(Default)]
struct SessionResources {
    microphone: Option<Box<dyn Microphone>>,
    input: Option<Box<dyn InputEndpoint>>,
    playback: Option<Arc<Mutex<Playback>>>,
    session: Option<SessionHandle>,
}

impl SessionResources {
    fn release_sync(&mut self) {
        if let Some(input) = self.input.as_mut() {
            input.disconnect();
        }
        if let Some(mut mic) = self.microphone.take() {
            mic.release();
        }
        if let Some(mut input) = self.input.take() {
            input.close();
        }
        if let Some(playback) = self.playback.take() {
            close_output(&playback);
        }
    }
}

impl Drop for SessionResources {
    fn drop(&mut self) {
        // the remote session handle is dropped with us, closing its socket
        self.release_sync();
    }
}

struct ActiveSession {
    generation: u64,
    cancel: CancellationToken,
    resources: SessionResources,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(g) => g,
        Err(poisoned) => poisoned.into_inner(),
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

struct Inner {
    config: VoiceConfig,
    transport: Arc<dyn LiveTransport>,
    devices: Arc<dyn AudioDevices>,
    tools: Arc<ToolRegistry>,
    state: watch::Sender<VoiceState>,
    events: broadcast::Sender<VoiceEvent>,
    transcript: Mutex<Transcript>,
    active: Mutex<Option<ActiveSession>>,
    playback: Mutex<Option<Arc<Mutex<Playback>>>>,
    last_error: Mutex<Option<String>>,
    generation: Mutex<u64>,
}

pub struct VoiceSessionController {
    inner: Arc<Inner>,
}

impl VoiceSessionController {
    pub fn new(
        config: VoiceConfig,
        transport: Arc<dyn LiveTransport>,
        devices: Arc<dyn AudioDevices>,
        tools: ToolRegistry,
    ) -> Self {
        let (state, _) = watch::channel(VoiceState::Idle);
        let (events, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(Inner {
                config,
                transport,
                devices,
                tools: Arc::new(tools),
                state,
                events,
                transcript: Mutex::new(Transcript::new()),
                active: Mutex::new(None),
                playback: Mutex::new(None),
                last_error: Mutex::new(None),
                generation: Mutex::new(0),
            }),
        }
    }

    pub fn config(&self) -> &VoiceConfig {
        &self.inner.config
    }

    pub fn state(&self) -> VoiceState {
        self.inner.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<VoiceState> {
        self.inner.state.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<VoiceEvent> {
        self.inner.events.subscribe()
    }

    /// Transcript of the current or most recent session.
    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        lock(&self.inner.transcript).entries().to_vec()
    }

    pub fn last_error(&self) -> Option<String> {
        lock(&self.inner.last_error).clone()
    }

    /// Output time at which the next chunk would start.
    pub fn playback_cursor(&self) -> f64 {
        self.inner
            .current_playback()
            .map(|p| lock(&p).scheduler.cursor())
            .unwrap_or(0.0)
    }

    /// Seconds of scheduled audio still ahead of the output clock.
    pub fn playback_remaining(&self) -> f64 {
        self.inner
            .current_playback()
            .and_then(|p| {
                let p = lock(&p);
                let now = p.output.as_ref()?.now();
                Some((p.scheduler.cursor() - now).max(0.0))
            })
            .unwrap_or(0.0)
    }

    /// Open a session. Errors are also reported through the state channel
    /// and events; the controller is back in `Idle` when this returns `Err`.
    pub async fn start(&self) -> VoiceResult<()> {
        self.inner.clone().start().await
    }

    /// End the session. Safe to call in any state, any number of times.
    pub async fn stop(&self) {
        self.inner.stop().await;
    }
}

impl Drop for VoiceSessionController {
    fn drop(&mut self) {
        let active = lock(&self.inner.active).take();
        if let Some(active) = active {
            active.cancel.cancel();
            drop(active);
            self.inner.set_state(VoiceState::Idle);
        }
    }
}

impl Inner {
    fn set_state(&self, state: VoiceState) {
        debug!("voice state -> {:?}", state);
        self.state.send_replace(state.clone());
        let _ = self.events.send(VoiceEvent::State(state));
    }

    fn emit(&self, event: VoiceEvent) {
        let _ = self.events.send(event);
    }

    fn current_playback(&self) -> Option<Arc<Mutex<Playback>>> {
        lock(&self.playback).clone()
    }

    fn next_generation(&self) -> u64 {
        let mut g = lock(&self.generation);
        *g += 1;
        *g
    }

    /// Take the active session if it is `generation` (or any, for `None`).
    fn take_active(&self, generation: Option<u64>) -> Option<ActiveSession> {
        let mut active = lock(&self.active);
        let matches = match (active.as_ref(), generation) {
            (Some(a), Some(g)) => a.generation == g,
            _ => true,
        };
        if matches {
            active.take()
        } else {
            None
        }
    }

    /// Report a failure to the user and return to Idle.
    fn report_failure(&self, err: &VoiceError) {
        let message = err.to_string();
        error!("Voice session failed: {}", message);
        *lock(&self.last_error) = Some(message.clone());
        self.emit(VoiceEvent::Error(message.clone()));
        self.set_state(VoiceState::Error(message));
    }

    async fn fail(&self, generation: u64, err: &VoiceError) {
        if let Some(active) = self.take_active(Some(generation)) {
            self.report_failure(err);
            teardown(active).await;
            self.set_state(VoiceState::Idle);
        }
    }

    /// Hand acquired resources to the session if `generation` is still the
    /// registered session and has not been stopped.
    fn attach(
        &self,
        generation: u64,
        cancel: &CancellationToken,
        f: impl FnOnce(&mut SessionResources),
    ) -> bool {
        let mut active = lock(&self.active);
        match active.as_mut() {
            Some(a) if a.generation == generation && !cancel.is_cancelled() => {
                f(&mut a.resources);
                true
            }
            _ => false,
        }
    }

    async fn start(self: Arc<Self>) -> VoiceResult<()> {
        if lock(&self.active).is_some() {
            return Err(VoiceError::AlreadyActive);
        }

        // fail before touching any hardware
        let endpoint = self.transport.endpoint().to_string();
        if !is_secure_endpoint(&endpoint) {
            let err = VoiceError::InsecureContext(INSECURE_CONTEXT_MESSAGE.to_string());
            warn!("Refusing insecure live endpoint {}", endpoint);
            self.report_failure(&err);
            self.set_state(VoiceState::Idle);
            return Err(err);
        }

        // registered before the first await so stop() can always find it
        let generation = self.next_generation();
        let cancel = CancellationToken::new();
        {
            let mut active = lock(&self.active);
            if active.is_some() {
                return Err(VoiceError::AlreadyActive);
            }
            *active = Some(ActiveSession {
                generation,
                cancel: cancel.clone(),
                resources: SessionResources::default(),
            });
            *lock(&self.last_error) = None;
            lock(&self.transcript).clear();
            self.set_state(VoiceState::Connecting);
        }

        let mut microphone = match self.devices.open_microphone().await {
            Ok(m) => m,
            Err(e) => {
                let err = match e {
                    VoiceError::Microphone(_) => e,
                    other => VoiceError::Microphone(other.to_string()),
                };
                self.fail(generation, &err).await;
                return Err(err);
            }
        };
        let feed = microphone.take_feed();
        let mut pending = Some(microphone);
        if !self.attach(generation, &cancel, |res| res.microphone = pending.take()) {
            if let Some(mut mic) = pending {
                mic.release();
            }
            info!("Voice session stopped while opening the microphone");
            return Ok(());
        }

        let endpoints = self
            .devices
            .open_input(self.config.input_sample_rate)
            .and_then(|input| {
                self.devices
                    .open_output(self.config.output_sample_rate)
                    .map(|output| (input, output))
            });
        let (mut input, output) = match endpoints {
            Ok(pair) => pair,
            Err(e) => {
                self.fail(generation, &e).await;
                return Err(e);
            }
        };

        // capture -> sender channel
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let connected = match feed {
            Some(feed) => input.connect(feed, self.config.frame_size, frames_tx),
            None => Err(VoiceError::Microphone("capture feed unavailable".into())),
        };

        let playback = Arc::new(Mutex::new(Playback {
            output: Some(output),
            scheduler: PlaybackScheduler::new(),
        }));
        let mut pending = Some(input);
        let attached = self.attach(generation, &cancel, |res| {
            res.input = pending.take();
            res.playback = Some(playback.clone());
        });
        if !attached {
            if let Some(mut input) = pending {
                input.disconnect();
                input.close();
            }
            close_output(&playback);
            info!("Voice session stopped while opening audio endpoints");
            return Ok(());
        }
        if let Err(e) = connected {
            self.fail(generation, &e).await;
            return Err(e);
        }
        *lock(&self.playback) = Some(playback.clone());

        // sender starts now and waits for the session handle
        let (session_tx, session_rx) = watch::channel::<Option<SessionHandle>>(None);
        tokio::spawn(self.clone().run_sender(generation, cancel.clone(), frames_rx, session_rx));

        let mut setup = SetupConfig::audio(&self.config.model, self.tools.get_definitions());
        if let Some(instruction) = &self.config.system_instruction {
            setup = setup.with_system_instruction(instruction.clone());
        }
        if let Some(voice) = &self.config.voice_name {
            setup = setup.with_voice(voice.clone());
        }

        let connected = tokio::select! {
            _ = cancel.cancelled() => {
                info!("Voice session stopped while connecting");
                return Ok(());
            }
            res = self.transport.connect(setup) => res,
        };
        let (sink, stream) = match connected {
            Ok(pair) => pair,
            Err(e) => {
                let err = match e {
                    VoiceError::Connect(_) => e,
                    other => VoiceError::Connect(other.to_string()),
                };
                self.fail(generation, &err).await;
                return Err(err);
            }
        };
        let handle: SessionHandle = Arc::new(tokio::sync::Mutex::new(sink));

        // Streaming is published under the session lock so a racing stop()
        // always lands after it
        let attached = self.attach(generation, &cancel, |res| {
            res.session = Some(handle.clone());
            self.set_state(VoiceState::Streaming);
        });
        if !attached {
            close_session(handle).await;
            info!("Voice session stopped while connecting");
            return Ok(());
        }
        let _ = session_tx.send(Some(handle.clone()));

        info!("Voice session streaming ({})", self.config.model);
        tokio::spawn(self.clone().run_receiver(generation, cancel, stream, handle, playback));
        Ok(())
    }

    async fn stop(&self) {
        let Some(active) = self.take_active(None) else {
            return;
        };
        self.set_state(VoiceState::Closing);
        teardown(active).await;
        self.set_state(VoiceState::Idle);
        info!("Voice session closed");
    }

    // -----------------------------------------------------------------------
    // Sender
    // -----------------------------------------------------------------------

    async fn run_sender(
        self: Arc<Self>,
        generation: u64,
        cancel: CancellationToken,
        mut frames: mpsc::UnboundedReceiver<Vec<f32>>,
        mut session: watch::Receiver<Option<SessionHandle>>,
    ) {
        let handle = tokio::select! {
            _ = cancel.cancelled() => return,
            ready = session.wait_for(|s| s.is_some()) => ready.ok().and_then(|h| h.clone()),
        };
        let Some(handle) = handle else {
            return;
        };

        let mime = pcm_mime(self.config.input_sample_rate);
        let mut sent: u64 = 0;
        loop {
            let frame = tokio::select! {
                _ = cancel.cancelled() => break,
                frame = frames.recv() => match frame {
                    Some(f) => f,
                    None => {
                        debug!("capture ended after {} frames", sent);
                        break;
                    }
                },
            };
            let message = ClientMessage::RealtimeInput(RealtimeInput {
                media_chunks: vec![Blob {
                    mime_type: mime.clone(),
                    data: encode_pcm16(&frame),
                }],
            });
            // a stalled send must not hold the session past stop()
            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                r = async { handle.lock().await.send(message).await } => r,
            };
            if let Err(e) = result {
                if !cancel.is_cancelled() {
                    self.fail(generation, &e).await;
                }
                break;
            }
            sent += 1;
        }
    }

    // -----------------------------------------------------------------------
    // Receiver
    // -----------------------------------------------------------------------

    async fn run_receiver(
        self: Arc<Self>,
        generation: u64,
        cancel: CancellationToken,
        mut stream: LiveStream,
        handle: SessionHandle,
        playback: Arc<Mutex<Playback>>,
    ) {
        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => return,
                next = stream.next() => next,
            };
            let result = match next {
                Some(Ok(message)) => tokio::select! {
                    _ = cancel.cancelled() => return,
                    r = self.handle_message(message, &handle, &playback) => r,
                },
                Some(Err(e)) => Err(e),
                None => Err(VoiceError::Closed("the assistant ended the session".into())),
            };
            if let Err(e) = result {
                if !cancel.is_cancelled() {
                    self.fail(generation, &e).await;
                }
                return;
            }
        }
    }

    async fn handle_message(
        &self,
        message: ServerMessage,
        handle: &SessionHandle,
        playback: &Arc<Mutex<Playback>>,
    ) -> VoiceResult<()> {
        if message.setup_complete.is_some() {
            debug!("live setup complete");
        }
        if let Some(content) = &message.server_content {
            self.handle_transcripts(content);
        }
        if let Some(tool_call) = message.tool_call {
            self.set_state(VoiceState::ToolDispatch);
            for call in tool_call.function_calls {
                self.dispatch_tool(call, handle).await?;
            }
            self.set_state(VoiceState::Streaming);
        }
        if let Some(content) = &message.server_content {
            self.schedule_audio(content, playback)?;
            if content.interrupted {
                debug!("model output interrupted");
            }
            if content.turn_complete {
                self.emit(VoiceEvent::TurnComplete);
            }
        }
        if let Some(cancelled) = message.tool_call_cancellation {
            debug!("tool calls cancelled: {:?}", cancelled.ids);
        }
        if let Some(go_away) = message.go_away {
            warn!("Live session ending soon (time left: {:?})", go_away.time_left);
        }
        Ok(())
    }

    fn handle_transcripts(&self, content: &ServerContent) {
        let fragments = [
            (TranscriptSource::User, content.input_transcription.as_ref()),
            (TranscriptSource::Model, content.output_transcription.as_ref()),
        ];
        for (source, fragment) in fragments {
            let Some(fragment) = fragment else { continue };
            let updated = {
                let mut transcript = lock(&self.transcript);
                transcript
                    .push_fragment(source, &fragment.text)
                    .and_then(|i| transcript.get(i).cloned().map(|e| (i, e)))
            };
            if let Some((index, entry)) = updated {
                self.emit(VoiceEvent::Transcript { index, entry });
            }
        }
    }

    /// Run one tool call and send exactly one acknowledgment for it.
    async fn dispatch_tool(&self, call: FunctionCall, handle: &SessionHandle) -> VoiceResult<()> {
        let result = self.tools.execute(&call.name, call.args.clone()).await;
        if result.is_error() {
            warn!("Tool {} failed: {:?}", call.name, result);
        } else {
            info!("Tool {} handled", call.name);
        }
        self.emit(VoiceEvent::ToolCall {
            name: call.name.clone(),
            args: call.args,
            is_error: result.is_error(),
        });
        let ack = ClientMessage::ToolResponse(ToolResponse {
            function_responses: vec![FunctionResponse {
                id: call.id,
                name: call.name,
                response: result.to_response(),
            }],
        });
        handle.lock().await.send(ack).await
    }

    fn schedule_audio(&self, content: &ServerContent, playback: &Arc<Mutex<Playback>>) -> VoiceResult<()> {
        for blob in content.audio_parts() {
            let rate = mime_sample_rate(&blob.mime_type).unwrap_or(self.config.output_sample_rate);
            let chunk = match decode_pcm16(&blob.data, rate) {
                Ok(c) => c,
                Err(e) => {
                    warn!("Dropping undecodable audio chunk: {}", e);
                    continue;
                }
            };
            if chunk.samples.is_empty() {
                continue;
            }
            let mut guard = lock(playback);
            let Playback { output, scheduler } = &mut *guard;
            let Some(output) = output.as_mut() else {
                return Ok(());
            };
            let now = output.now();
            scheduler.prune(now);
            let duration = chunk.duration_secs();
            let start = scheduler.schedule(now, duration);
            let id = output.play_at(&chunk, start)?;
            scheduler.track(id, start, duration);
        }
        Ok(())
    }
}

/// Close the remote session without letting a stalled connection hold up
/// the caller. The handle is dropped either way.
async fn close_session(session: SessionHandle) {
    let close = async { session.lock().await.close().await };
    match tokio::time::timeout(SESSION_CLOSE_TIMEOUT, close).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("closing live session: {}", e),
        Err(_) => warn!("Live session did not close within {:?}; dropping it", SESSION_CLOSE_TIMEOUT),
    }
}

/// Close the output endpoint, then stop every chunk still queued on it.
fn close_output(playback: &Arc<Mutex<Playback>>) {
    let mut playback = lock(playback);
    let Some(mut output) = playback.output.take() else {
        return;
    };
    output.close();
    let stopped = playback.scheduler.drain();
    for id in &stopped {
        output.stop(*id);
    }
    if !stopped.is_empty() {
        debug!("stopped {} queued output chunks", stopped.len());
    }
}

/// Release a session's resources in order: stop input, close the remote
/// session, release the microphone, close both endpoints, stop queued output.
async fn teardown(mut active: ActiveSession) {
    active.cancel.cancel();
    let res = &mut active.resources;

    if let Some(input) = res.input.as_mut() {
        input.disconnect();
    }

    if let Some(session) = res.session.take() {
        close_session(session).await;
    }

    if let Some(mut mic) = res.microphone.take() {
        mic.release();
    }

    if let Some(mut input) = res.input.take() {
        input.close();
    }
    if let Some(playback) = res.playback.take() {
        close_output(&playback);
    }
}
