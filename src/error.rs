//! Error types shared across the quiz core.

use crate::corpus::ProficiencyTier;
use thiserror::Error;

/// Failures reported by (or about) the transcription engine.
///
/// The `Display` text is the user-facing message shown by the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpeechError {
    #[error("No speech detected. Please try again.")]
    NoSpeech,
    #[error("Microphone not accessible.")]
    AudioCapture,
    #[error("Microphone permission denied.")]
    NotAllowed,
    #[error("Network error. Please check your connection.")]
    Network,
    #[error("Speech recognition error: {0}")]
    Engine(String),
    #[error("Speech recognition is not supported on this platform.")]
    Unsupported,
    #[error("Speech recognition stopped after {attempts} restart attempts.")]
    RestartExhausted { attempts: u32 },
}

impl SpeechError {
    /// Errors after which no further input can arrive until the host intervenes.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SpeechError::AudioCapture
                | SpeechError::NotAllowed
                | SpeechError::Unsupported
                | SpeechError::RestartExhausted { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("tier {tier} has {available} words, at least {required} required")]
    TierTooSmall {
        tier: ProficiencyTier,
        available: usize,
        required: usize,
    },
    #[error("unknown proficiency tier '{0}'")]
    UnknownTier(String),
    #[error("tier {0} cannot be assigned to words")]
    ReservedTier(ProficiencyTier),
    #[error("word '{0}' has no accepted answers")]
    NoAnswers(String),
    #[error("invalid corpus file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read corpus: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum QuizError {
    #[error(transparent)]
    Corpus(#[from] CorpusError),
    #[error("no game is running")]
    NoActiveSession,
    #[error("the session is not complete yet ({answered} of {total} words played)")]
    SessionIncomplete { answered: usize, total: usize },
}
