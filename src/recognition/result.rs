use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Sentence payload attached to a recognition result.
///
/// Engines put more than text in here (timings, word lists); the pipeline only relies
/// on `text` and, as a fallback, `is_sentence_end`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sentence(Map<String, Value>);

impl Sentence {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("text".to_string(), Value::String(text.into()));
        Self(fields)
    }

    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// Recognized text, empty if absent or not a string
    pub fn text(&self) -> &str {
        self.0.get("text").and_then(Value::as_str).unwrap_or("")
    }

    /// Explicit end-of-sentence marker carried in the payload itself
    pub fn end_flag(&self) -> Option<bool> {
        self.0.get("is_sentence_end").and_then(Value::as_bool)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One per-result event delivered by a recognition engine
pub trait RecognitionResult: Send + Sync + std::fmt::Debug {
    /// The sentence payload, if the event carries one
    fn sentence(&self) -> Option<&Sentence>;

    /// Engine-specific end-of-sentence predicate.
    ///
    /// `None` means the engine does not expose one.
    fn is_sentence_end(&self, _sentence: &Sentence) -> Option<Result<bool>> {
        None
    }
}

/// Plain result carrying only a payload; end-of-sentence comes from the payload flag
#[derive(Debug, Clone, Default)]
pub struct SentenceEvent {
    pub sentence: Option<Sentence>,
}

impl SentenceEvent {
    pub fn new(sentence: Sentence) -> Self {
        Self {
            sentence: Some(sentence),
        }
    }

    pub fn empty() -> Self {
        Self { sentence: None }
    }
}

impl RecognitionResult for SentenceEvent {
    fn sentence(&self) -> Option<&Sentence> {
        self.sentence.as_ref()
    }
}
