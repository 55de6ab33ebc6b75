//! Sentence boundary detection over recognition results

use tracing::debug;

use super::result::{RecognitionResult, Sentence};
use crate::protocol::OutboundMessage;

/// Text of one recognition result and whether it closes a sentence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub text: String,
    pub is_final: bool,
}

impl Classified {
    pub fn to_message(&self) -> OutboundMessage {
        OutboundMessage::transcription(self.text.clone(), self.is_final)
    }

    /// Final sentences with visible text are the only ones worth translating
    pub fn wants_translation(&self) -> bool {
        self.is_final && !self.text.trim().is_empty()
    }
}

/// Classify a recognition result as interim or final.
///
/// Returns `None` for results with no sentence payload or empty text.
pub fn classify(result: &dyn RecognitionResult) -> Option<Classified> {
    let Some(sentence) = result.sentence().filter(|s| !s.is_empty()) else {
        debug!("Recognition result without sentence: {:?}", result);
        return None;
    };

    let text = sentence.text();
    if text.is_empty() {
        debug!("Recognition sentence without text: {:?}", sentence);
        return None;
    }

    Some(Classified {
        text: text.to_string(),
        is_final: sentence_end(result, sentence),
    })
}

/// End-of-sentence resolution, first match wins:
/// 1. the engine's own predicate (a failing predicate counts as `false`)
/// 2. the payload's `is_sentence_end` field
/// 3. `false`
pub fn sentence_end(result: &dyn RecognitionResult, sentence: &Sentence) -> bool {
    if let Some(verdict) = result.is_sentence_end(sentence) {
        return verdict.unwrap_or_else(|e| {
            debug!("End-of-sentence predicate failed: {}", e);
            false
        });
    }

    sentence.end_flag().unwrap_or(false)
}
