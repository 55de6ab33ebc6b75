//! Translation of finalized sentences
//!
//! - Direction: CJK text is translated to English, everything else to Chinese
//! - Dispatch: fire-and-forget tasks, results sent as `translation` messages

mod client;
mod dispatcher;
mod language;

pub use client::{DashScopeTranslator, TranslationError, Translator};
pub use dispatcher::TranslationDispatcher;
pub use language::{contains_chinese, Language, TranslationRequest};
