// Shared test doubles: scripted recognition engine, fake translator, `cat` transcoder.
#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use live_interpreter::config::TranscoderConfig;
use live_interpreter::{
    OutboundMessage, RecognitionCallback, RecognitionEngine, RecognitionError,
    RecognizerFactory, SentenceEvent, TranslationError, TranslationRequest, Translator,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

/// One scripted engine callback
#[derive(Debug, Clone)]
pub enum Step {
    Event(SentenceEvent),
    Error(RecognitionError),
}

/// Observations shared between a test and the engines it scripts
#[derive(Default)]
pub struct EngineLog {
    pub created: AtomicUsize,
    pub started: AtomicUsize,
    pub stopped: AtomicUsize,
    pub audio: Mutex<Vec<u8>>,
    pub frames: AtomicUsize,
}

impl EngineLog {
    pub fn audio_len(&self) -> usize {
        self.audio.lock().unwrap().len()
    }
}

#[derive(Clone, Default)]
pub struct ScriptedFactory {
    pub log: Arc<EngineLog>,
    pub script: Vec<Step>,
    pub fail_start: bool,
    pub fail_send: bool,
}

impl ScriptedFactory {
    pub fn with_script(script: Vec<Step>) -> Self {
        Self {
            script,
            ..Default::default()
        }
    }
}

impl RecognizerFactory for ScriptedFactory {
    fn create(&self, callback: Arc<dyn RecognitionCallback>) -> Result<Box<dyn RecognitionEngine>> {
        self.log.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedEngine::new(self.clone(), callback)))
    }
}

/// Engine that replays its script from its own thread once started
pub struct ScriptedEngine {
    factory: ScriptedFactory,
    callback: Arc<dyn RecognitionCallback>,
    emitter: Option<std::thread::JoinHandle<()>>,
    running: bool,
}

impl ScriptedEngine {
    pub fn new(factory: ScriptedFactory, callback: Arc<dyn RecognitionCallback>) -> Self {
        Self {
            factory,
            callback,
            emitter: None,
            running: false,
        }
    }
}

impl RecognitionEngine for ScriptedEngine {
    fn start(&mut self) -> Result<()> {
        self.factory.log.started.fetch_add(1, Ordering::SeqCst);
        if self.factory.fail_start {
            bail!("engine refused to start");
        }
        self.running = true;

        let callback = Arc::clone(&self.callback);
        let script = self.factory.script.clone();
        self.emitter = Some(std::thread::spawn(move || {
            callback.on_open();
            for step in script {
                match step {
                    Step::Event(event) => callback.on_event(&event),
                    Step::Error(err) => callback.on_error(&err),
                }
            }
        }));

        Ok(())
    }

    fn send_audio_frame(&mut self, frame: &[u8]) -> Result<()> {
        if self.factory.fail_send {
            bail!("engine connection lost");
        }
        self.factory.log.audio.lock().unwrap().extend_from_slice(frame);
        self.factory.log.frames.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.factory.log.stopped.fetch_add(1, Ordering::SeqCst);
        if let Some(emitter) = self.emitter.take() {
            let _ = emitter.join();
        }
        if self.running {
            self.running = false;
            self.callback.on_complete();
            self.callback.on_close();
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted engine"
    }
}

/// Translator that echoes a tagged result, or fails on demand
#[derive(Default)]
pub struct FakeTranslator {
    pub requests: Mutex<Vec<TranslationRequest>>,
    pub fail: bool,
    pub delay: Option<Duration>,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeTranslator {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Translator for FakeTranslator {
    async fn translate(&self, request: &TranslationRequest) -> Result<String, TranslationError> {
        self.requests.lock().unwrap().push(request.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail {
            return Err(TranslationError::Status {
                status: 401,
                code: "InvalidApiKey".to_string(),
                message: "Invalid API-key provided.".to_string(),
            });
        }

        Ok(format!("[{}] {}", request.target, request.text))
    }
}

/// `cat` passes bytes straight through, standing in for the transcoder
pub fn cat_transcoder() -> TranscoderConfig {
    TranscoderConfig {
        program: "cat".to_string(),
        args: Vec::new(),
        terminate_timeout_ms: 1000,
    }
}

pub fn missing_transcoder() -> TranscoderConfig {
    TranscoderConfig {
        program: "definitely-not-an-installed-transcoder".to_string(),
        args: Vec::new(),
        terminate_timeout_ms: 1000,
    }
}

/// Receive the next outbound message or fail after a few seconds
pub async fn next_message(rx: &mut UnboundedReceiver<OutboundMessage>) -> OutboundMessage {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for outbound message")
        .expect("outbound channel closed")
}

/// Poll `condition` until it holds or a few seconds pass
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..250 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}
