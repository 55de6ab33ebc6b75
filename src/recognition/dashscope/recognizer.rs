use anyhow::{anyhow, bail, Context, Result};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, error, info, warn};

use super::messages::{finish_task, run_task, DashScopeEvent};
use crate::config::RecognitionConfig;
use crate::recognition::engine::{
    RecognitionCallback, RecognitionEngine, RecognitionError, RecognizerFactory,
};

/// Audio frames buffered between the worker and the socket task
const AUDIO_CHANNEL_SIZE: usize = 64;

enum Outgoing {
    Audio(Bytes),
    Finish,
}

/// DashScope realtime recognizer.
///
/// Presents a blocking interface to the recognition worker while the WebSocket itself
/// runs as a task on the tokio runtime. Callbacks fire from that task.
pub struct DashScopeRecognizer {
    config: RecognitionConfig,
    api_key: Option<String>,
    callback: Arc<dyn RecognitionCallback>,
    runtime: Handle,
    task_id: String,
    outgoing: Option<mpsc::Sender<Outgoing>>,
    finished: Option<oneshot::Receiver<()>>,
    connection: Option<JoinHandle<()>>,
}

impl DashScopeRecognizer {
    pub fn new(
        config: RecognitionConfig,
        callback: Arc<dyn RecognitionCallback>,
        runtime: Handle,
    ) -> Self {
        let api_key = config.api_key();

        Self {
            config,
            api_key,
            callback,
            runtime,
            task_id: uuid::Uuid::new_v4().simple().to_string(),
            outgoing: None,
            finished: None,
            connection: None,
        }
    }

    fn build_request(&self) -> Result<Request> {
        let mut request = self
            .config
            .url
            .as_str()
            .into_client_request()
            .context("Invalid recognition URL")?;

        let headers = request.headers_mut();
        if let Some(key) = &self.api_key {
            headers.insert(
                "Authorization",
                HeaderValue::from_str(&format!("bearer {}", key))
                    .context("Invalid API key header")?,
            );
        }
        headers.insert(
            "X-DashScope-DataInspection",
            HeaderValue::from_static("enable"),
        );

        Ok(request)
    }
}

impl RecognitionEngine for DashScopeRecognizer {
    fn start(&mut self) -> Result<()> {
        if self.outgoing.is_some() {
            bail!("Recognition already started");
        }

        let request = self.build_request()?;
        let run_task = run_task(&self.task_id, &self.config).to_string();
        let finish_task = finish_task(&self.task_id).to_string();

        let (outgoing_tx, outgoing_rx) = mpsc::channel(AUDIO_CHANNEL_SIZE);
        let (started_tx, started_rx) = oneshot::channel();
        let (finished_tx, finished_rx) = oneshot::channel();

        let connection = self.runtime.spawn(run_connection(
            request,
            run_task,
            finish_task,
            outgoing_rx,
            Arc::clone(&self.callback),
            started_tx,
            finished_tx,
        ));

        self.outgoing = Some(outgoing_tx);
        self.finished = Some(finished_rx);
        self.connection = Some(connection);

        let handshake = self.config.handshake_timeout();
        match self.runtime.block_on(timeout(handshake, started_rx)) {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(message))) => Err(anyhow!(message)),
            Ok(Err(_)) => Err(anyhow!("Recognition connection closed before task started")),
            Err(_) => Err(anyhow!("Recognition task not started within {:?}", handshake)),
        }
    }

    fn send_audio_frame(&mut self, frame: &[u8]) -> Result<()> {
        let outgoing = self.outgoing.as_ref().context("Recognition not started")?;

        outgoing
            .blocking_send(Outgoing::Audio(Bytes::copy_from_slice(frame)))
            .map_err(|_| anyhow!("Recognition connection closed"))
    }

    fn stop(&mut self) -> Result<()> {
        let Some(outgoing) = self.outgoing.take() else {
            return Ok(());
        };

        // Fails only if the connection task already ended
        let _ = outgoing.blocking_send(Outgoing::Finish);
        drop(outgoing);

        let grace = self.config.handshake_timeout();

        if let Some(finished) = self.finished.take() {
            if self.runtime.block_on(timeout(grace, finished)).is_err() {
                warn!("Recognition task not finished within {:?}", grace);
            }
        }

        if let Some(connection) = self.connection.take() {
            let abort = connection.abort_handle();
            if self
                .runtime
                .block_on(timeout(Duration::from_secs(1), connection))
                .is_err()
            {
                abort.abort();
            }
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "DashScope recognition"
    }
}

impl Drop for DashScopeRecognizer {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.abort();
        }
    }
}

async fn run_connection(
    request: Request,
    run_task: String,
    finish_task: String,
    mut outgoing: mpsc::Receiver<Outgoing>,
    callback: Arc<dyn RecognitionCallback>,
    started_tx: oneshot::Sender<std::result::Result<(), String>>,
    finished_tx: oneshot::Sender<()>,
) {
    let ws_stream = match connect_async(request).await {
        Ok((ws_stream, _response)) => ws_stream,
        Err(e) => {
            error!("Failed to connect to recognition service: {}", e);
            let _ = started_tx.send(Err(format!("Failed to connect to recognition service: {e}")));
            return;
        }
    };

    info!("Connected to recognition service");

    let (mut ws_sink, mut ws_stream) = ws_stream.split();

    if let Err(e) = ws_sink.send(Message::Text(run_task.into())).await {
        let _ = started_tx.send(Err(format!("Failed to send run-task: {e}")));
        return;
    }

    let mut started_tx = Some(started_tx);
    let mut finished_tx = Some(finished_tx);
    let mut finishing = false;

    loop {
        tokio::select! {
            command = outgoing.recv(), if !finishing => match command {
                Some(Outgoing::Audio(frame)) => {
                    if let Err(e) = ws_sink.send(Message::Binary(frame)).await {
                        callback.on_error(&RecognitionError::new(format!(
                            "Failed to send audio to recognition service: {e}"
                        )));
                        break;
                    }
                }
                Some(Outgoing::Finish) | None => {
                    finishing = true;
                    if let Err(e) = ws_sink.send(Message::Text(finish_task.clone().into())).await {
                        warn!("Failed to send finish-task: {}", e);
                        break;
                    }
                }
            },

            message = ws_stream.next() => match message {
                Some(Ok(Message::Text(text))) => match DashScopeEvent::parse(text.as_str()) {
                    Ok(DashScopeEvent::TaskStarted) => {
                        callback.on_open();
                        if let Some(tx) = started_tx.take() {
                            let _ = tx.send(Ok(()));
                        }
                    }
                    Ok(DashScopeEvent::ResultGenerated(result)) => {
                        callback.on_event(&result);
                    }
                    Ok(DashScopeEvent::TaskFinished) => {
                        callback.on_complete();
                        if let Some(tx) = finished_tx.take() {
                            let _ = tx.send(());
                        }
                        break;
                    }
                    Ok(DashScopeEvent::TaskFailed(err)) => {
                        error!("Recognition task failed: {}", err);
                        callback.on_error(&err);
                        if let Some(tx) = started_tx.take() {
                            let _ = tx.send(Err(err.to_string()));
                        }
                        break;
                    }
                    Ok(DashScopeEvent::Unknown(event)) => {
                        debug!("Ignoring recognition event: {}", event);
                    }
                    Err(e) => {
                        warn!("Failed to parse recognition message: {}", e);
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    info!("Recognition WebSocket closed: {:?}", frame);
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    callback.on_error(&RecognitionError::new(format!(
                        "Recognition connection error: {e}"
                    )));
                    break;
                }
                None => break,
            },
        }
    }

    let _ = ws_sink.close().await;
    callback.on_close();
}

/// Builds one `DashScopeRecognizer` per session
pub struct DashScopeRecognizerFactory {
    config: RecognitionConfig,
    runtime: Handle,
}

impl DashScopeRecognizerFactory {
    pub fn new(config: RecognitionConfig, runtime: Handle) -> Self {
        if config.api_key().is_none() {
            warn!("No recognition API key configured; sessions will fail to authenticate");
        }

        Self { config, runtime }
    }
}

impl RecognizerFactory for DashScopeRecognizerFactory {
    fn create(&self, callback: Arc<dyn RecognitionCallback>) -> Result<Box<dyn RecognitionEngine>> {
        Ok(Box::new(DashScopeRecognizer::new(
            self.config.clone(),
            callback,
            self.runtime.clone(),
        )))
    }
}
