use crate::config::{Config, TranscoderConfig};

/// Per-session settings shared by every connection
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Transcoder launched for each session
    pub transcoder: TranscoderConfig,

    /// PCM bytes per engine call (640 = 20ms at 16kHz/16-bit/mono)
    pub chunk_size: usize,

    /// Translation calls in flight per session (0 = uncapped)
    pub max_translations_in_flight: usize,
}

impl SessionConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            transcoder: config.transcoder.clone(),
            chunk_size: config.recognition.chunk_size,
            max_translations_in_flight: config.translation.max_in_flight,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
