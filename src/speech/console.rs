//! Typed input standing in for a speech engine.

use super::source::{SourceEvent, TranscriptionSource};
use crate::error::SpeechError;
use crate::runtime::QuizInput;
use crate::settings::RecognitionOptions;
use log::{debug, trace};
use tokio::sync::mpsc::UnboundedSender;

/// A transcription source fed by the terminal.
///
/// Lines are read elsewhere and arrive as final results; this type only
/// reports the stream lifecycle back into the quiz input channel.
#[derive(Debug)]
pub struct ConsoleSource {
    events: UnboundedSender<QuizInput>,
    listening: bool,
    lang: String,
}

impl ConsoleSource {
    pub fn new(events: UnboundedSender<QuizInput>) -> Self {
        Self {
            events,
            listening: false,
            lang: String::new(),
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    fn emit(&self, event: SourceEvent) {
        if self.events.send(QuizInput::Source(event)).is_err() {
            trace!("Quiz input channel closed");
        }
    }
}

impl TranscriptionSource for ConsoleSource {
    fn configure(&mut self, options: &RecognitionOptions) {
        self.lang = options.lang.clone();
    }

    fn start(&mut self) -> Result<(), SpeechError> {
        if !self.listening {
            debug!("Console source listening ({})", self.lang);
            self.listening = true;
            self.emit(SourceEvent::Started);
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.listening = false;
    }

    fn abort(&mut self) {
        self.listening = false;
    }
}
