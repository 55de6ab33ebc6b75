//! Recognition worker and the callback that feeds its events back to the client
//!
//! ```text
//! transcoder stdout ──read_chunk──▶ worker thread ──send_audio_frame──▶ engine
//!                                                                        │
//!        connection writer task ◀── outbound channel ◀── SessionCallback ◀┘
//!                                          ▲
//!                     translation task ────┘
//! ```

use anyhow::{Context, Result};
use std::io::Read;
use std::thread::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::engine::{RecognitionCallback, RecognitionEngine, RecognitionError};
use super::result::RecognitionResult;
use super::sentence::classify;
use crate::protocol::{OutboundMessage, OutboundSender};
use crate::transcoder::PcmReader;
use crate::translation::TranslationDispatcher;

/// Why the recognition loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerExit {
    /// The session's cancellation token fired
    Cancelled,
    /// The transcoder's output ended
    EndOfStream,
    /// Starting the engine, reading PCM or pushing a frame failed
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerOutcome {
    pub exit: WorkerExit,
    pub frames_sent: usize,
}

/// Drive `engine` with PCM chunks until cancelled, end of stream, or failure.
///
/// Blocks the calling thread. The engine is always stopped before returning, and any
/// error from stopping it is discarded.
pub fn run<R: Read>(
    engine: &mut dyn RecognitionEngine,
    pcm: &mut PcmReader<R>,
    chunk_size: usize,
    cancel: &CancellationToken,
) -> WorkerOutcome {
    let mut frames_sent = 0;

    let exit = match pump(engine, pcm, chunk_size.max(1), cancel, &mut frames_sent) {
        Ok(exit) => exit,
        Err(e) => {
            error!("Recognition worker error: {:#}", e);
            WorkerExit::Failed(format!("{:#}", e))
        }
    };

    if let Err(e) = engine.stop() {
        debug!("Ignoring error while stopping {}: {}", engine.name(), e);
    }

    WorkerOutcome { exit, frames_sent }
}

fn pump<R: Read>(
    engine: &mut dyn RecognitionEngine,
    pcm: &mut PcmReader<R>,
    chunk_size: usize,
    cancel: &CancellationToken,
    frames_sent: &mut usize,
) -> Result<WorkerExit> {
    engine
        .start()
        .with_context(|| format!("Failed to start {}", engine.name()))?;
    info!("{} started", engine.name());

    let mut chunk = vec![0u8; chunk_size];

    loop {
        if cancel.is_cancelled() {
            return Ok(WorkerExit::Cancelled);
        }

        let n = pcm
            .read_chunk(&mut chunk)
            .context("Failed to read transcoder output")?;

        if n == 0 {
            info!("Transcoder output ended");
            return Ok(WorkerExit::EndOfStream);
        }

        // The read may have blocked for a while
        if cancel.is_cancelled() {
            return Ok(WorkerExit::Cancelled);
        }

        engine
            .send_audio_frame(&chunk[..n])
            .context("Failed to send audio frame")?;
        *frames_sent += 1;
    }
}

/// Run the recognition loop on a dedicated OS thread
pub fn spawn_worker<R>(
    session_id: String,
    mut engine: Box<dyn RecognitionEngine>,
    mut pcm: PcmReader<R>,
    chunk_size: usize,
    cancel: CancellationToken,
) -> std::io::Result<JoinHandle<WorkerOutcome>>
where
    R: Read + Send + 'static,
{
    let short_id: String = session_id.chars().take(8).collect();

    std::thread::Builder::new()
        .name(format!("recognition-{}", short_id))
        .spawn(move || {
            info!(session_id = %session_id, "Recognition worker started");
            let outcome = run(engine.as_mut(), &mut pcm, chunk_size, &cancel);
            info!(
                session_id = %session_id,
                "Recognition worker stopped ({:?}, {} frames)",
                outcome.exit,
                outcome.frames_sent
            );
            outcome
        })
}

/// Engine callback for one session.
///
/// Everything it produces goes through the outbound channel, so it can be invoked from
/// any thread the engine likes.
pub struct SessionCallback {
    session_id: String,
    outbound: OutboundSender,
    translations: Option<TranslationDispatcher>,
}

impl SessionCallback {
    pub fn new(
        session_id: String,
        outbound: OutboundSender,
        translations: Option<TranslationDispatcher>,
    ) -> Self {
        Self {
            session_id,
            outbound,
            translations,
        }
    }

    fn submit(&self, message: OutboundMessage) {
        if self.outbound.send(message).is_err() {
            debug!(session_id = %self.session_id, "Dropping message for closed session");
        }
    }
}

impl RecognitionCallback for SessionCallback {
    fn on_open(&self) {
        info!(session_id = %self.session_id, "Recognition session opened");
    }

    fn on_complete(&self) {
        info!(session_id = %self.session_id, "Recognition session completed");
    }

    fn on_close(&self) {
        info!(session_id = %self.session_id, "Recognition session closed");
    }

    fn on_event(&self, result: &dyn RecognitionResult) {
        let Some(classified) = classify(result) else {
            return;
        };

        info!(
            session_id = %self.session_id,
            "Recognized: {} | end={}",
            classified.text,
            classified.is_final
        );

        self.submit(classified.to_message());

        if classified.wants_translation() {
            if let Some(translations) = &self.translations {
                translations.dispatch(&classified.text);
            }
        }
    }

    fn on_error(&self, error: &RecognitionError) {
        warn!(
            session_id = %self.session_id,
            "Recognition error ({}): {}",
            error.code.as_deref().unwrap_or("-"),
            error.message
        );
        self.submit(OutboundMessage::error(error.to_string()));
    }
}
