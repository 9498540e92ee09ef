//! Speech session controller.
//!
//! Wraps an auto-terminating transcription engine in a session with two
//! independent switches: whether the stream should be running at all, and
//! whether the fragments it produces are passed on.

use super::source::{SourceEvent, TranscriptFragment, TranscriptionSource};
use crate::error::SpeechError;
use crate::settings::RecognitionOptions;
use crate::timer::Timer;
use log::{debug, info, trace, warn};
use std::time::{Duration, Instant};

/// Events surfaced to the answer layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechEvent {
    Fragment(TranscriptFragment),
    Error(SpeechError),
}

/// Summary of the controller for display and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechState {
    /// The engine cannot run on this platform
    Unsupported,
    /// No session
    Inactive,
    /// Session active, fragments are passed on
    Listening,
    /// Session active, fragments are dropped
    Paused,
    /// Stream ended unexpectedly, restart pending
    Recovering,
    /// Restart budget used up, waiting for the host
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// Delay before restarting a stream that ended on its own
    pub restart_delay: Duration,
    /// Consecutive restarts allowed before giving up
    pub max_restart_attempts: u32,
    pub recognition: RecognitionOptions,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            restart_delay: Duration::from_millis(100),
            max_restart_attempts: 3,
            recognition: RecognitionOptions::default(),
        }
    }
}

pub struct SpeechSessionController<S: TranscriptionSource> {
    source: S,
    config: SpeechConfig,

    /// Result of the capability check done at construction
    supported: bool,

    /// Intent: the stream should be running
    session_active: bool,

    /// Whether fragments are forwarded
    accepting_input: bool,

    /// Engine state as last observed; may lag intent
    stream_running: bool,

    /// Last final text and in-progress interim text
    transcript: String,
    interim_transcript: String,

    /// Consecutive restarts since the engine last delivered results
    restart_attempts: u32,
    restart_timer: Timer,
    restarts_exhausted: bool,

    last_error: Option<SpeechError>,
}

impl<S: TranscriptionSource> SpeechSessionController<S> {
    pub fn new(mut source: S, config: SpeechConfig) -> Self {
        let supported = source.is_supported();
        if supported {
            source.configure(&config.recognition);
        } else {
            warn!("Speech recognition is not supported by this transcription source");
        }

        Self {
            source,
            config,
            supported,
            session_active: false,
            accepting_input: false,
            stream_running: false,
            transcript: String::new(),
            interim_transcript: String::new(),
            restart_attempts: 0,
            restart_timer: Timer::new(),
            restarts_exhausted: false,
            last_error: if supported {
                None
            } else {
                Some(SpeechError::Unsupported)
            },
        }
    }

    /// Start a session. Input stays paused until [`resume_input`](Self::resume_input).
    pub fn start_session(&mut self, now: Instant) -> Result<(), SpeechError> {
        if !self.supported {
            return Err(SpeechError::Unsupported);
        }
        if self.session_active {
            debug!("Speech session already active");
            return Ok(());
        }

        self.session_active = true;
        self.accepting_input = false;
        self.restart_attempts = 0;
        self.restarts_exhausted = false;
        self.last_error = None;
        self.reset_transcript();

        info!("Speech session started");
        match self.start_stream(now) {
            Some(SpeechEvent::Error(e)) => Err(e),
            _ => Ok(()),
        }
    }

    /// End the session and stop the stream. No restart happens afterwards.
    pub fn end_session(&mut self) {
        self.deactivate();
        if self.stream_running {
            self.source.stop();
        }
        self.stream_running = false;
        info!("Speech session ended");
    }

    /// Like [`end_session`](Self::end_session) but aborts the stream instead of
    /// letting the engine finish the current utterance.
    pub fn cancel_session(&mut self) {
        self.deactivate();
        if self.stream_running {
            self.source.abort();
        }
        self.stream_running = false;
        info!("Speech session cancelled");
    }

    fn deactivate(&mut self) {
        self.session_active = false;
        self.accepting_input = false;
        self.restart_timer.cancel();
    }

    /// Drop incoming fragments while keeping the stream alive.
    pub fn pause_input(&mut self) {
        if self.accepting_input {
            debug!("Speech input paused");
        }
        self.accepting_input = false;
    }

    pub fn resume_input(&mut self) {
        self.reset_transcript();
        self.accepting_input = true;
        debug!("Speech input resumed");
    }

    pub fn reset_transcript(&mut self) {
        self.transcript.clear();
        self.interim_transcript.clear();
    }

    /// Feed one engine event through the controller.
    pub fn handle_source_event(&mut self, event: SourceEvent, now: Instant) -> Option<SpeechEvent> {
        match event {
            SourceEvent::Started => {
                self.stream_running = true;
                self.last_error = None;
                trace!("Transcription stream started");
                None
            }
            SourceEvent::Results {
                results,
                result_index,
            } => {
                // the engine is evidently healthy
                self.restart_attempts = 0;
                self.restarts_exhausted = false;

                let mut final_text = String::new();
                let mut interim_text = String::new();
                for result in results.iter().skip(result_index) {
                    if result.is_final {
                        final_text.push_str(&result.transcript);
                    } else {
                        interim_text.push_str(&result.transcript);
                    }
                }

                let fragment = if !final_text.is_empty() {
                    self.transcript = final_text;
                    self.interim_transcript.clear();
                    TranscriptFragment::final_text(&self.transcript)
                } else {
                    self.interim_transcript = interim_text;
                    TranscriptFragment::interim(&self.interim_transcript)
                };

                if !self.session_active || !self.accepting_input {
                    trace!("Dropping fragment '{}' while paused", fragment.text);
                    return None;
                }
                if fragment.text.trim().is_empty() {
                    return None;
                }
                Some(SpeechEvent::Fragment(fragment))
            }
            SourceEvent::Error(code) => match code.into_speech_error() {
                None => {
                    debug!("Transcription stream aborted");
                    None
                }
                Some(error) => {
                    warn!("Transcription error: {}", error);
                    self.stream_running = false;
                    self.last_error = Some(error.clone());
                    Some(SpeechEvent::Error(error))
                }
            },
            SourceEvent::Ended => {
                self.stream_running = false;
                self.on_stream_ended(now)
            }
        }
    }

    /// Fire the restart timer if it is due.
    pub fn poll(&mut self, now: Instant) -> Option<SpeechEvent> {
        if !self.restart_timer.fire(now) {
            return None;
        }
        if !self.session_active || self.stream_running {
            return None;
        }

        debug!(
            "Restarting transcription stream (attempt {}/{})",
            self.restart_attempts, self.config.max_restart_attempts
        );
        self.start_stream(now)
    }

    fn start_stream(&mut self, now: Instant) -> Option<SpeechEvent> {
        match self.source.start() {
            Ok(()) => {
                self.stream_running = true;
                None
            }
            Err(e) => {
                warn!("Failed to start transcription stream: {}", e);
                self.on_stream_ended(now)
            }
        }
    }

    fn on_stream_ended(&mut self, now: Instant) -> Option<SpeechEvent> {
        if !self.session_active {
            trace!("Transcription stream ended after session end");
            return None;
        }

        if self.restart_attempts >= self.config.max_restart_attempts {
            if self.restarts_exhausted {
                return None;
            }
            self.restarts_exhausted = true;
            let error = SpeechError::RestartExhausted {
                attempts: self.restart_attempts,
            };
            warn!("{}", error);
            self.last_error = Some(error.clone());
            return Some(SpeechEvent::Error(error));
        }

        self.restart_attempts += 1;
        self.restart_timer.schedule(now, self.config.restart_delay);
        debug!(
            "Transcription stream ended, restart {} scheduled in {}ms",
            self.restart_attempts,
            self.config.restart_delay.as_millis()
        );
        None
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.restart_timer.deadline()
    }

    pub fn state(&self) -> SpeechState {
        if !self.supported {
            SpeechState::Unsupported
        } else if !self.session_active {
            SpeechState::Inactive
        } else if self.restarts_exhausted {
            SpeechState::Exhausted
        } else if self.restart_timer.is_armed() {
            SpeechState::Recovering
        } else if self.accepting_input {
            SpeechState::Listening
        } else {
            SpeechState::Paused
        }
    }

    pub fn is_supported(&self) -> bool {
        self.supported
    }

    pub fn is_session_active(&self) -> bool {
        self.session_active
    }

    pub fn is_accepting_input(&self) -> bool {
        self.accepting_input
    }

    pub fn is_stream_running(&self) -> bool {
        self.stream_running
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn interim_transcript(&self) -> &str {
        &self.interim_transcript
    }

    pub fn restart_attempts(&self) -> u32 {
        self.restart_attempts
    }

    pub fn last_error(&self) -> Option<&SpeechError> {
        self.last_error.as_ref()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::speech::source::{ErrorCode, RecognitionResult};

    /// Records calls; optionally unsupported or failing to start.
    #[derive(Debug, Default)]
    pub(crate) struct MockSource {
        pub unsupported: bool,
        pub fail_start: bool,
        pub starts: usize,
        pub stops: usize,
        pub aborts: usize,
        pub options: Option<RecognitionOptions>,
    }

    impl TranscriptionSource for MockSource {
        fn is_supported(&self) -> bool {
            !self.unsupported
        }

        fn configure(&mut self, options: &RecognitionOptions) {
            self.options = Some(options.clone());
        }

        fn start(&mut self) -> Result<(), SpeechError> {
            self.starts += 1;
            if self.fail_start {
                Err(SpeechError::Engine("already-started".into()))
            } else {
                Ok(())
            }
        }

        fn stop(&mut self) {
            self.stops += 1;
        }

        fn abort(&mut self) {
            self.aborts += 1;
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn controller() -> SpeechSessionController<MockSource> {
        SpeechSessionController::new(MockSource::default(), SpeechConfig::default())
    }

    #[test]
    fn start_session_does_not_accept_input() {
        let t0 = Instant::now();
        let mut c = controller();
        c.start_session(t0).unwrap();

        assert!(c.is_session_active());
        assert!(!c.is_accepting_input());
        assert_eq!(c.source().starts, 1);
        assert_eq!(c.state(), SpeechState::Paused);
        assert_eq!(c.source().options.as_ref().unwrap().lang, "en-US");

        c.start_session(t0).unwrap();
        assert_eq!(c.source().starts, 1, "second start is a no-op");
    }

    #[test]
    fn fragments_only_surface_while_accepting() {
        let t0 = Instant::now();
        let mut c = controller();
        c.start_session(t0).unwrap();

        assert_eq!(c.handle_source_event(SourceEvent::interim("ca"), t0), None);
        assert_eq!(c.interim_transcript(), "ca");

        c.resume_input();
        assert_eq!(c.interim_transcript(), "");
        assert_eq!(
            c.handle_source_event(SourceEvent::interim("cat"), t0),
            Some(SpeechEvent::Fragment(TranscriptFragment::interim("cat")))
        );

        c.pause_input();
        assert_eq!(c.handle_source_event(SourceEvent::final_result("cat"), t0), None);
        assert!(c.is_session_active(), "pausing keeps the stream alive");
        assert_eq!(c.source().stops, 0);
    }

    #[test]
    fn final_results_replace_interim() {
        let t0 = Instant::now();
        let mut c = controller();
        c.start_session(t0).unwrap();
        c.resume_input();

        c.handle_source_event(SourceEvent::interim("hou"), t0);
        let event = SourceEvent::Results {
            results: vec![
                RecognitionResult::final_result("stale "),
                RecognitionResult::final_result("house"),
                RecognitionResult::interim(" and"),
            ],
            result_index: 1,
        };

        assert_eq!(
            c.handle_source_event(event, t0),
            Some(SpeechEvent::Fragment(TranscriptFragment::final_text("house")))
        );
        assert_eq!(c.transcript(), "house");
        assert_eq!(c.interim_transcript(), "");

        c.reset_transcript();
        assert_eq!(c.transcript(), "");
        assert!(c.is_accepting_input());
    }

    #[test]
    fn restarts_after_unexpected_end() {
        let t0 = Instant::now();
        let mut c = controller();
        c.start_session(t0).unwrap();

        assert_eq!(c.handle_source_event(SourceEvent::Ended, t0), None);
        assert_eq!(c.state(), SpeechState::Recovering);
        assert_eq!(c.next_deadline(), Some(t0 + ms(100)));

        c.poll(t0 + ms(99));
        assert_eq!(c.source().starts, 1);
        c.poll(t0 + ms(100));
        assert_eq!(c.source().starts, 2);
        assert!(c.is_stream_running());
    }

    #[test]
    fn restart_cap_stops_retrying() {
        let t0 = Instant::now();
        let mut c = controller();
        c.start_session(t0).unwrap();

        let mut now = t0;
        let mut errors = Vec::new();
        for _ in 0..10 {
            if let Some(event) = c.handle_source_event(SourceEvent::Ended, now) {
                errors.push(event);
            }
            now += ms(100);
            c.poll(now);
        }

        assert_eq!(c.source().starts, 4, "initial start plus three restarts");
        assert_eq!(
            errors,
            vec![SpeechEvent::Error(SpeechError::RestartExhausted { attempts: 3 })]
        );
        assert!(c.is_session_active(), "the host decides when to end");
        assert_eq!(c.state(), SpeechState::Exhausted);

        c.end_session();
        c.start_session(now).unwrap();
        assert_eq!(c.restart_attempts(), 0);
        assert_eq!(c.source().starts, 5);
    }

    #[test]
    fn results_reset_restart_budget() {
        let t0 = Instant::now();
        let mut c = controller();
        c.start_session(t0).unwrap();

        c.handle_source_event(SourceEvent::Ended, t0);
        c.poll(t0 + ms(100));
        c.handle_source_event(SourceEvent::Ended, t0 + ms(100));
        assert_eq!(c.restart_attempts(), 2);

        c.poll(t0 + ms(200));
        c.handle_source_event(SourceEvent::interim("hello"), t0 + ms(250));
        assert_eq!(c.restart_attempts(), 0);
    }

    #[test]
    fn failing_start_counts_as_termination() {
        let t0 = Instant::now();
        let source = MockSource {
            fail_start: true,
            ..Default::default()
        };
        let mut c = SpeechSessionController::new(source, SpeechConfig::default());
        c.start_session(t0).unwrap();

        let mut now = t0;
        let mut exhausted = false;
        for _ in 0..5 {
            now += ms(100);
            if let Some(SpeechEvent::Error(SpeechError::RestartExhausted { .. })) = c.poll(now) {
                exhausted = true;
            }
        }
        assert!(exhausted);
        assert_eq!(c.source().starts, 4);
    }

    #[test]
    fn no_restart_after_end_session() {
        let t0 = Instant::now();
        let mut c = controller();
        c.start_session(t0).unwrap();
        c.resume_input();

        c.end_session();
        assert_eq!(c.source().stops, 1);
        assert!(!c.is_accepting_input());

        assert_eq!(c.handle_source_event(SourceEvent::Ended, t0), None);
        assert_eq!(c.next_deadline(), None);
        c.poll(t0 + ms(1000));
        assert_eq!(c.source().starts, 1);
    }

    #[test]
    fn cancel_aborts_and_abort_error_is_silent() {
        let t0 = Instant::now();
        let mut c = controller();
        c.start_session(t0).unwrap();
        c.cancel_session();

        assert_eq!(c.source().aborts, 1);
        assert_eq!(
            c.handle_source_event(SourceEvent::Error(ErrorCode::Aborted), t0),
            None
        );
        assert!(c.last_error().is_none());
    }

    #[test]
    fn engine_errors_surface_without_ending_session() {
        let t0 = Instant::now();
        let mut c = controller();
        c.start_session(t0).unwrap();

        assert_eq!(
            c.handle_source_event(SourceEvent::Error(ErrorCode::NotAllowed), t0),
            Some(SpeechEvent::Error(SpeechError::NotAllowed))
        );
        assert!(c.is_session_active());
        assert_eq!(c.last_error(), Some(&SpeechError::NotAllowed));

        c.handle_source_event(SourceEvent::Started, t0);
        assert!(c.last_error().is_none());
    }

    #[test]
    fn unsupported_source_is_detected_up_front() {
        let source = MockSource {
            unsupported: true,
            ..Default::default()
        };
        let mut c = SpeechSessionController::new(source, SpeechConfig::default());

        assert_eq!(c.state(), SpeechState::Unsupported);
        assert_eq!(c.start_session(Instant::now()), Err(SpeechError::Unsupported));
        assert_eq!(c.source().starts, 0);
    }
}
