use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

/// Environment variable consulted when no API key is configured explicitly.
pub const API_KEY_ENV: &str = "DASHSCOPE_API_KEY";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub transcoder: TranscoderConfig,
    pub recognition: RecognitionConfig,
    pub translation: TranslationConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "live-interpreter".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// External transcoder invocation
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranscoderConfig {
    /// Executable to launch
    pub program: String,

    /// Arguments: read any container from stdin, write s16le mono 16kHz PCM to stdout
    pub args: Vec<String>,

    /// How long `terminate` waits for the killed process to be reaped
    pub terminate_timeout_ms: u64,
}

impl TranscoderConfig {
    pub fn terminate_timeout(&self) -> Duration {
        Duration::from_millis(self.terminate_timeout_ms)
    }
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        let args = [
            "-i", "pipe:0", // Read from stdin
            "-f", "s16le", // Signed 16-bit little-endian PCM
            "-ac", "1", // Mono
            "-ar", "16000", // 16kHz
            "-vn", // No video
            "pipe:1", // Write to stdout
        ];

        Self {
            program: "ffmpeg".to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            terminate_timeout_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub format: String,
    pub sample_rate: u32,
    pub punctuation_prediction_enabled: bool,

    /// PCM bytes pushed to the engine per call (640 = 20ms at 16kHz/16-bit/mono)
    pub chunk_size: usize,

    /// Upper bound on waiting for the engine to acknowledge start and finish
    pub handshake_timeout_secs: u64,
}

impl RecognitionConfig {
    pub fn api_key(&self) -> Option<String> {
        resolve_api_key(self.api_key.as_deref())
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            url: "wss://dashscope.aliyuncs.com/api-ws/v1/inference".to_string(),
            api_key: None,
            model: "paraformer-realtime-v2".to_string(),
            format: "pcm".to_string(),
            sample_rate: 16000,
            punctuation_prediction_enabled: true,
            chunk_size: 640,
            handshake_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,

    /// Translation calls allowed in flight per session (0 = uncapped)
    pub max_in_flight: usize,
}

impl TranslationConfig {
    pub fn api_key(&self) -> Option<String> {
        resolve_api_key(self.api_key.as_deref())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            url: "https://dashscope.aliyuncs.com/api/v1/services/aigc/text-generation/generation"
                .to_string(),
            api_key: None,
            model: "qwen-turbo".to_string(),
            timeout_secs: 30,
            max_in_flight: 4,
        }
    }
}

fn resolve_api_key(configured: Option<&str>) -> Option<String> {
    configured
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|key| !key.is_empty()))
}

impl Config {
    /// Load from an optional config file, then `LIVE_INTERPRETER_*` environment overrides
    /// (e.g. `LIVE_INTERPRETER_SERVICE__HTTP__PORT=9000`).
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("LIVE_INTERPRETER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
