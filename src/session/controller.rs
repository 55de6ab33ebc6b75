use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::stats::{SessionState, SessionStats};
use crate::protocol::OutboundSender;
use crate::recognition::bridge::spawn_worker;
use crate::recognition::{RecognizerFactory, SessionCallback, WorkerOutcome};
use crate::transcoder::Transcoder;
use crate::translation::{TranslationDispatcher, Translator};

/// Runs client sessions: one transcoder and one recognition worker per connection
pub struct SessionController {
    config: SessionConfig,
    recognizers: Arc<dyn RecognizerFactory>,
    translator: Option<Arc<dyn Translator>>,
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        recognizers: Arc<dyn RecognizerFactory>,
        translator: Option<Arc<dyn Translator>>,
    ) -> Self {
        Self {
            config,
            recognizers,
            translator,
        }
    }

    /// Drive one session to completion.
    ///
    /// `inbound` yields client audio frames; the stream ending means the client
    /// disconnected. Transcription, translation and error messages go to `outbound`.
    /// Every exit path releases the transcoder and joins the worker before returning.
    pub async fn run<S, E>(&self, inbound: S, outbound: OutboundSender) -> Result<SessionStats>
    where
        S: Stream<Item = std::result::Result<Bytes, E>>,
        E: Display,
    {
        let mut session = Session::new(uuid::Uuid::new_v4().to_string());
        info!(session_id = %session.id, "Session connecting");

        if let Err(e) = self.connect(&mut session, outbound).await {
            error!(session_id = %session.id, "Session failed to start: {:#}", e);
            session.close().await;
            return Err(e);
        }

        let inbound = std::pin::pin!(inbound);
        session.forward_audio(inbound).await;
        session.close().await;

        let stats = session.stats();
        info!(
            session_id = %stats.session_id,
            "Session closed after {:.1}s ({} frames, {} bytes)",
            stats.duration_secs,
            stats.frames_received,
            stats.bytes_forwarded
        );

        Ok(stats)
    }

    /// Connecting → Active: launch the transcoder, then the recognition worker
    async fn connect(&self, session: &mut Session, outbound: OutboundSender) -> Result<()> {
        let transcoder = session
            .transcoder
            .insert(Transcoder::start(&self.config.transcoder)?);

        let pcm = transcoder
            .take_output()
            .ok_or_else(|| anyhow!("Transcoder output unavailable"))??;

        let translations = self.translator.as_ref().map(|translator| {
            TranslationDispatcher::new(
                Arc::clone(translator),
                outbound.clone(),
                Handle::current(),
                self.config.max_translations_in_flight,
            )
        });

        let callback = Arc::new(SessionCallback::new(
            session.id.clone(),
            outbound,
            translations,
        ));

        let engine = self
            .recognizers
            .create(callback)
            .context("Failed to create recognition engine")?;

        let worker = spawn_worker(
            session.id.clone(),
            engine,
            pcm,
            self.config.chunk_size,
            session.cancel.clone(),
        )
        .context("Failed to spawn recognition worker")?;

        session.worker = Some(worker);
        session.transition(SessionState::Active);

        Ok(())
    }
}

/// Resources owned by one connection
struct Session {
    id: String,
    state: SessionState,
    started_at: DateTime<Utc>,
    transcoder: Option<Transcoder>,
    cancel: CancellationToken,
    worker: Option<JoinHandle<WorkerOutcome>>,
    frames_received: usize,
    bytes_forwarded: usize,
    frames_recognized: Option<usize>,
}

impl Session {
    fn new(id: String) -> Self {
        Self {
            id,
            state: SessionState::Connecting,
            started_at: Utc::now(),
            transcoder: None,
            cancel: CancellationToken::new(),
            worker: None,
            frames_received: 0,
            bytes_forwarded: 0,
            frames_recognized: None,
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!(session_id = %self.id, "Session {} -> {}", self.state, next);
        self.state = next;
    }

    /// Active: forward frames in receipt order until the client stops sending or a
    /// read or write fails.
    ///
    /// Once the worker is gone the transcoder is released and further frames are
    /// discarded; the session stays open until the client ends it.
    async fn forward_audio<S, E>(&mut self, mut inbound: std::pin::Pin<&mut S>)
    where
        S: Stream<Item = std::result::Result<Bytes, E>>,
        E: Display,
    {
        loop {
            let frame = match inbound.next().await {
                None => {
                    info!(session_id = %self.id, "Client disconnected");
                    return;
                }
                Some(Err(e)) => {
                    warn!(session_id = %self.id, "Error receiving audio: {}", e);
                    return;
                }
                Some(Ok(frame)) if frame.is_empty() => {
                    info!(session_id = %self.id, "Client ended the audio stream");
                    return;
                }
                Some(Ok(frame)) => frame,
            };

            self.frames_received += 1;

            if self.frames_received % 10 == 0 {
                debug!(
                    session_id = %self.id,
                    "Received {} audio frames (last size: {})",
                    self.frames_received,
                    frame.len()
                );
            }

            // Nothing drains the transcoder once the worker is gone
            if self.worker_exited() {
                self.release_transcoder().await;
            }

            let Some(transcoder) = self.transcoder.as_mut() else {
                continue;
            };

            if let Err(e) = transcoder.write(&frame).await {
                // The worker closing the transcoder's output breaks its input too
                if self.worker_exited() {
                    self.release_transcoder().await;
                    continue;
                }
                warn!(session_id = %self.id, "{:#}", e);
                return;
            }

            self.bytes_forwarded += frame.len();
        }
    }

    fn worker_exited(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| w.is_finished())
    }

    /// Terminate the transcoder early; later frames are dropped until the client ends
    async fn release_transcoder(&mut self) {
        if let Some(mut transcoder) = self.transcoder.take() {
            info!(
                session_id = %self.id,
                "Recognition worker exited; discarding further audio"
            );
            transcoder.terminate().await;
        }
    }

    /// Draining → Closed. Idempotent; never fails.
    async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }

        self.transition(SessionState::Draining);
        self.cancel.cancel();

        // Killing the transcoder also unblocks a worker waiting on its output
        if let Some(mut transcoder) = self.transcoder.take() {
            transcoder.terminate().await;
        }

        if let Some(worker) = self.worker.take() {
            match tokio::task::spawn_blocking(move || worker.join()).await {
                Ok(Ok(outcome)) => self.frames_recognized = Some(outcome.frames_sent),
                Ok(Err(_)) => error!(session_id = %self.id, "Recognition worker panicked"),
                Err(e) => error!(session_id = %self.id, "Failed to join recognition worker: {}", e),
            }
        }

        self.transition(SessionState::Closed);
    }

    fn stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.started_at);

        SessionStats {
            session_id: self.id.clone(),
            state: self.state,
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            frames_received: self.frames_received,
            bytes_forwarded: self.bytes_forwarded,
            frames_recognized: self.frames_recognized,
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Reached without `close` only if the session future was dropped mid-flight.
        // The transcoder is killed on drop; the detached worker sees cancellation or EOF.
        if self.state != SessionState::Closed {
            self.cancel.cancel();
        }
    }
}
