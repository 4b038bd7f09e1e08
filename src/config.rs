use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::pipeline::FailurePolicy;
use crate::segment::SegmentPolicy;

/// Runtime settings: optional `quizgen.toml`, then `QUIZGEN_*` env vars.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub db_path: PathBuf,
    pub max_retries: u32,
    pub backoff_ms: u64,
    pub request_timeout_secs: u64,
    pub failure_policy: FailurePolicy,
    pub max_segment_chars: Option<usize>,
    pub difficulty: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            db_path: PathBuf::from("data/quiz.sqlite"),
            max_retries: 0,
            backoff_ms: 2000,
            request_timeout_secs: 120,
            failure_policy: FailurePolicy::FailFast,
            max_segment_chars: None,
            difficulty: "medium".to_string(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings: Settings = Config::builder()
            .add_source(File::with_name("quizgen").required(false))
            .add_source(Environment::with_prefix("QUIZGEN").try_parsing(true))
            .build()?
            .try_deserialize()?;
        if settings.api_key.is_none() {
            settings.api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());
        }
        Ok(settings)
    }

    pub fn segment_policy(&self) -> SegmentPolicy {
        match self.max_segment_chars {
            Some(n) if n > 0 => SegmentPolicy::MaxChars(n),
            _ => SegmentPolicy::Whole,
        }
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
