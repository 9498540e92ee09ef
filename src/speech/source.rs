//! The streaming transcription engine as seen from the quiz core.

use crate::error::SpeechError;
use crate::settings::RecognitionOptions;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// A streaming speech-to-text engine.
///
/// Implementations only start and stop the engine; everything it reports comes
/// back asynchronously as [`SourceEvent`]s delivered by the host.
pub trait TranscriptionSource {
    /// Whether the platform can run this engine at all.
    fn is_supported(&self) -> bool {
        true
    }

    fn configure(&mut self, _options: &RecognitionOptions) {}

    fn start(&mut self) -> Result<(), SpeechError>;

    /// Stops listening, letting the engine finish the current utterance.
    fn stop(&mut self);

    /// Stops immediately. The engine answers with an `aborted` error.
    fn abort(&mut self);
}

/// One recognition hypothesis inside a results event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub transcript: String,
    pub is_final: bool,
    #[serde(default)]
    pub confidence: f32,
}

impl RecognitionResult {
    pub fn interim(transcript: &str) -> Self {
        Self {
            transcript: transcript.to_string(),
            is_final: false,
            confidence: 0.0,
        }
    }

    pub fn final_result(transcript: &str) -> Self {
        Self {
            transcript: transcript.to_string(),
            is_final: true,
            confidence: 1.0,
        }
    }
}

/// Engine error codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    /// Caused by our own `abort()`; never reported to the player.
    Aborted,
    NoSpeech,
    AudioCapture,
    NotAllowed,
    Network,
    #[serde(untagged)]
    Other(String),
}

impl FromStr for ErrorCode {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "aborted" => ErrorCode::Aborted,
            "no-speech" => ErrorCode::NoSpeech,
            "audio-capture" => ErrorCode::AudioCapture,
            "not-allowed" => ErrorCode::NotAllowed,
            "network" => ErrorCode::Network,
            other => ErrorCode::Other(other.to_string()),
        })
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Aborted => f.write_str("aborted"),
            ErrorCode::NoSpeech => f.write_str("no-speech"),
            ErrorCode::AudioCapture => f.write_str("audio-capture"),
            ErrorCode::NotAllowed => f.write_str("not-allowed"),
            ErrorCode::Network => f.write_str("network"),
            ErrorCode::Other(code) => f.write_str(code),
        }
    }
}

impl ErrorCode {
    /// The player-facing error, or `None` for a silent abort.
    pub fn into_speech_error(self) -> Option<SpeechError> {
        match self {
            ErrorCode::Aborted => None,
            ErrorCode::NoSpeech => Some(SpeechError::NoSpeech),
            ErrorCode::AudioCapture => Some(SpeechError::AudioCapture),
            ErrorCode::NotAllowed => Some(SpeechError::NotAllowed),
            ErrorCode::Network => Some(SpeechError::Network),
            ErrorCode::Other(code) => Some(SpeechError::Engine(code)),
        }
    }
}

/// Everything the engine can report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SourceEvent {
    Started,
    /// Results from `result_index` onwards are new since the previous event.
    Results {
        results: Vec<RecognitionResult>,
        result_index: usize,
    },
    Error(ErrorCode),
    Ended,
}

impl SourceEvent {
    pub fn interim(transcript: &str) -> Self {
        SourceEvent::Results {
            results: vec![RecognitionResult::interim(transcript)],
            result_index: 0,
        }
    }

    pub fn final_result(transcript: &str) -> Self {
        SourceEvent::Results {
            results: vec![RecognitionResult::final_result(transcript)],
            result_index: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Finality {
    Interim,
    Final,
}

/// A chunk of transcribed text surfaced to answer arbitration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptFragment {
    pub text: String,
    pub finality: Finality,
}

impl TranscriptFragment {
    pub fn interim(text: &str) -> Self {
        Self {
            text: text.to_string(),
            finality: Finality::Interim,
        }
    }

    pub fn final_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            finality: Finality::Final,
        }
    }

    pub fn is_final(&self) -> bool {
        self.finality == Finality::Final
    }
}
