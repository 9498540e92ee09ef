use anyhow::Context;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::quiz::ArbiterConfig;
use crate::speech::SpeechConfig;

/// Options handed to the transcription engine when it is configured.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RecognitionOptions {
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default = "default_true")]
    pub continuous: bool,
    #[serde(default = "default_true")]
    pub interim_results: bool,
    #[serde(default = "default_max_alternatives")]
    pub max_alternatives: u32,
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self {
            lang: default_lang(),
            continuous: true,
            interim_results: true,
            max_alternatives: default_max_alternatives(),
        }
    }
}

/* every field has a serde default so partial JSON files are accepted ------ */
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QuizSettings {
    #[serde(default = "default_levenshtein_threshold")]
    pub levenshtein_threshold: usize,
    #[serde(default = "default_words_per_tier")]
    pub words_per_tier: usize,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    #[serde(default = "default_restart_delay_ms")]
    pub restart_delay_ms: u64,
    #[serde(default = "default_max_restart_attempts")]
    pub max_restart_attempts: u32,
    #[serde(default = "default_protection_delay_ms")]
    pub protection_delay_ms: u64,
    #[serde(default = "default_warmup_delay_ms")]
    pub warmup_delay_ms: u64,
    #[serde(default)]
    pub recognition: RecognitionOptions,
}

impl Default for QuizSettings {
    fn default() -> Self {
        get_default_settings()
    }
}

impl QuizSettings {
    pub fn normalize(&mut self) {
        if self.words_per_tier == 0 {
            warn!("words_per_tier must be at least 1, using 1");
            self.words_per_tier = 1;
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    pub fn protection_delay(&self) -> Duration {
        Duration::from_millis(self.protection_delay_ms)
    }

    pub fn warmup_delay(&self) -> Duration {
        Duration::from_millis(self.warmup_delay_ms)
    }

    pub fn speech_config(&self) -> SpeechConfig {
        SpeechConfig {
            restart_delay: self.restart_delay(),
            max_restart_attempts: self.max_restart_attempts,
            recognition: self.recognition.clone(),
        }
    }

    pub fn arbiter_config(&self) -> ArbiterConfig {
        ArbiterConfig {
            debounce: self.debounce(),
            cooldown: self.cooldown(),
        }
    }
}

fn default_lang() -> String {
    "en-US".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_alternatives() -> u32 {
    1
}

fn default_levenshtein_threshold() -> usize {
    2
}

fn default_words_per_tier() -> usize {
    2
}

fn default_debounce_ms() -> u64 {
    400
}

fn default_cooldown_ms() -> u64 {
    400
}

fn default_restart_delay_ms() -> u64 {
    100
}

fn default_max_restart_attempts() -> u32 {
    3
}

fn default_protection_delay_ms() -> u64 {
    100
}

fn default_warmup_delay_ms() -> u64 {
    500
}

pub fn get_default_settings() -> QuizSettings {
    QuizSettings {
        levenshtein_threshold: default_levenshtein_threshold(),
        words_per_tier: default_words_per_tier(),
        debounce_ms: default_debounce_ms(),
        cooldown_ms: default_cooldown_ms(),
        restart_delay_ms: default_restart_delay_ms(),
        max_restart_attempts: default_max_restart_attempts(),
        protection_delay_ms: default_protection_delay_ms(),
        warmup_delay_ms: default_warmup_delay_ms(),
        recognition: RecognitionOptions::default(),
    }
}

/// Reads settings from a JSON file, failing on unreadable or malformed input.
pub fn read_settings(path: &Path) -> anyhow::Result<QuizSettings> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read settings from {}", path.display()))?;
    let mut settings: QuizSettings = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse settings in {}", path.display()))?;
    settings.normalize();
    Ok(settings)
}

/// Settings from `path` if given and valid, otherwise the defaults.
pub fn load_settings(path: Option<&Path>) -> QuizSettings {
    let Some(path) = path else {
        return get_default_settings();
    };

    match read_settings(path) {
        Ok(settings) => {
            debug!("Loaded settings: {:?}", settings);
            settings
        }
        Err(e) => {
            warn!("{:#}, falling back to default settings", e);
            get_default_settings()
        }
    }
}
