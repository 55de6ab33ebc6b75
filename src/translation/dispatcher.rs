use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::client::Translator;
use super::language::TranslationRequest;
use crate::protocol::{OutboundMessage, OutboundSender};

/// Fires translation calls for finalized sentences without blocking the caller.
///
/// Each call is an independent task on the runtime; completions reach the client in
/// whatever order they finish. Failures are logged and never surface to the client.
#[derive(Clone)]
pub struct TranslationDispatcher {
    translator: Arc<dyn Translator>,
    outbound: OutboundSender,
    runtime: Handle,
    permits: Option<Arc<Semaphore>>,
}

impl TranslationDispatcher {
    /// `max_in_flight == 0` leaves concurrent calls uncapped
    pub fn new(
        translator: Arc<dyn Translator>,
        outbound: OutboundSender,
        runtime: Handle,
        max_in_flight: usize,
    ) -> Self {
        let permits = (max_in_flight > 0).then(|| Arc::new(Semaphore::new(max_in_flight)));

        Self {
            translator,
            outbound,
            runtime,
            permits,
        }
    }

    /// Spawn a translation of `text`. Blank text is ignored.
    ///
    /// Safe to call from any thread.
    pub fn dispatch(&self, text: &str) -> Option<JoinHandle<()>> {
        if text.trim().is_empty() {
            return None;
        }

        let request = TranslationRequest::for_text(text);
        let translator = Arc::clone(&self.translator);
        let outbound = self.outbound.clone();
        let permits = self.permits.clone();

        Some(self.runtime.spawn(async move {
            // Queued behind in-flight calls when capped; the caller never waits
            let _permit = match permits {
                Some(permits) => match permits.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => return,
                },
                None => None,
            };

            match translator.translate(&request).await {
                Ok(translated) => {
                    info!("Translation ({}): {}", request.target, translated);
                    if outbound.send(OutboundMessage::translation(translated)).is_err() {
                        debug!("Session closed before translation arrived");
                    }
                }
                Err(e) => {
                    error!("Translation failed: {}", e);
                }
            }
        }))
    }
}
