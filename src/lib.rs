pub mod config;
pub mod http;
pub mod protocol;
pub mod recognition;
pub mod session;
pub mod transcoder;
pub mod translation;

pub use config::Config;
pub use http::{create_router, AppState};
pub use protocol::{outbound_channel, OutboundMessage, OutboundSender};
pub use recognition::{
    RecognitionCallback, RecognitionEngine, RecognitionError, RecognitionResult,
    RecognizerFactory, Sentence, SentenceEvent,
};
pub use session::{SessionConfig, SessionController, SessionState, SessionStats};
pub use transcoder::{PcmReader, Transcoder};
pub use translation::{
    DashScopeTranslator, TranslationDispatcher, TranslationError, TranslationRequest, Translator,
};
