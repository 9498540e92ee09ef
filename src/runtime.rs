//! Drives a [`QuizGame`] on a tokio task.
//!
//! The loop waits for either the next input or the game's next deadline,
//! whichever comes first. The time handed to the game is read from tokio's
//! clock so a paused test runtime controls it.

use crate::quiz::{GameEvent, QuizGame};
use crate::speech::{SourceEvent, TranscriptionSource};
use log::{debug, error, info};
use std::time::Instant as StdInstant;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::{self, Instant};

#[derive(Debug, Clone, PartialEq)]
pub enum QuizInput {
    /// Something the transcription engine reported
    Source(SourceEvent),
    Start,
    Skip,
    /// The progress animation finished; show the next word
    AdvanceFinished,
    /// A typed answer, checked without debounce
    Submit(String),
    Shutdown,
}

fn now() -> StdInstant {
    Instant::now().into_std()
}

async fn sleep_until(deadline: Option<StdInstant>) {
    match deadline {
        Some(deadline) => time::sleep_until(Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

/// Runs until `Shutdown` arrives or every input sender is gone, then hands the
/// game back.
pub async fn run_quiz<S: TranscriptionSource>(
    mut game: QuizGame<S>,
    mut inputs: UnboundedReceiver<QuizInput>,
    events: UnboundedSender<GameEvent>,
) -> QuizGame<S> {
    info!("Quiz runtime started");
    loop {
        let deadline = game.next_deadline();
        tokio::select! {
            input = inputs.recv() => {
                let Some(input) = input else {
                    debug!("Quiz input channel closed");
                    break;
                };
                if !apply_input(&mut game, input) {
                    break;
                }
            }
            _ = sleep_until(deadline) => game.tick(now()),
        }

        for event in game.drain_events() {
            if events.send(event).is_err() {
                debug!("No one is listening for game events");
            }
        }
    }

    game.end_game();
    info!("Quiz runtime stopped");
    game
}

/// Returns `false` when the loop should stop.
fn apply_input<S: TranscriptionSource>(game: &mut QuizGame<S>, input: QuizInput) -> bool {
    let now = now();
    // due timers go first so inputs never overtake an expired deadline
    game.tick(now);

    match input {
        QuizInput::Source(event) => game.handle_source_event(event, now),
        QuizInput::Start => {
            if let Err(e) = game.start_game(now) {
                error!("Failed to start quiz: {}", e);
            }
        }
        QuizInput::Skip => {
            game.skip_word();
        }
        QuizInput::AdvanceFinished => {
            game.next_word(now);
        }
        QuizInput::Submit(answer) => {
            game.submit_answer(&answer);
        }
        QuizInput::Shutdown => return false,
    }
    true
}
