mod console;
mod controller;
mod source;

pub use console::ConsoleSource;
pub use controller::{SpeechConfig, SpeechEvent, SpeechSessionController, SpeechState};
pub use source::{
    ErrorCode, Finality, RecognitionResult, SourceEvent, TranscriptFragment, TranscriptionSource,
};

#[cfg(test)]
pub(crate) use controller::tests::MockSource;
