//! Streaming speech recognition
//!
//! This module bridges a blocking, callback-driven recognition engine into the
//! asynchronous client connection:
//! - `engine`: engine, callback and factory contracts
//! - `result` / `sentence`: recognition results and sentence boundary detection
//! - `bridge`: the per-session worker thread and its callback
//! - `dashscope`: the DashScope realtime engine

pub mod bridge;
pub mod dashscope;
mod engine;
mod result;
mod sentence;

pub use bridge::{SessionCallback, WorkerExit, WorkerOutcome};
pub use engine::{RecognitionCallback, RecognitionEngine, RecognitionError, RecognizerFactory};
pub use result::{RecognitionResult, Sentence, SentenceEvent};
pub use sentence::{classify, sentence_end, Classified};
