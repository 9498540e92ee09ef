use anyhow::Context;
use clap::Parser;
use dino_lingo_lib::cli::CliArgs;
use dino_lingo_lib::quiz::GameEvent;
use dino_lingo_lib::runtime::{run_quiz, QuizInput};
use dino_lingo_lib::settings::load_settings;
use dino_lingo_lib::speech::{ConsoleSource, SourceEvent};
use dino_lingo_lib::{logging, Corpus, QuizGame};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedSender};

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    logging::init(args.debug);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    let result = runtime.block_on(play(args));
    // the stdin reader may be parked in a blocking read
    runtime.shutdown_background();
    result
}

async fn play(args: CliArgs) -> anyhow::Result<()> {
    let mut settings = load_settings(args.config.as_deref());
    if let Some(threshold) = args.threshold {
        settings.levenshtein_threshold = threshold;
    }

    let corpus = match &args.corpus {
        Some(path) => Corpus::load(path)
            .with_context(|| format!("failed to load corpus from {}", path.display()))?,
        None => Corpus::builtin().clone(),
    };
    corpus
        .validate(settings.words_per_tier.max(1))
        .context("corpus cannot fill a game")?;

    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    let source = ConsoleSource::new(input_tx.clone());
    let game = QuizGame::with_rng(settings, corpus, source, rng);
    let quiz = tokio::spawn(run_quiz(game, input_rx, event_tx));
    tokio::spawn(read_console(input_tx.clone()));

    if !args.json {
        println!("Say (type) the English word for each prompt. /skip to skip, /quit to leave.");
    }
    input_tx.send(QuizInput::Start)?;

    while let Some(event) = event_rx.recv().await {
        if args.json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            print_event(&event);
        }

        match event {
            GameEvent::AdvanceRequested { .. } => {
                // no animation to wait for in a terminal
                let _ = input_tx.send(QuizInput::AdvanceFinished);
            }
            GameEvent::Completed { .. } => {
                let _ = input_tx.send(QuizInput::Shutdown);
            }
            _ => {}
        }
    }

    let game = quiz.await.context("quiz task panicked")?;
    info!("Final score: {}", game.score());
    Ok(())
}

async fn read_console(inputs: UnboundedSender<QuizInput>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let input = match lines.next_line().await {
            Ok(Some(line)) => match line.trim() {
                "" => continue,
                "/skip" => QuizInput::Skip,
                "/quit" => QuizInput::Shutdown,
                text => QuizInput::Source(SourceEvent::final_result(text)),
            },
            Ok(None) => QuizInput::Shutdown,
            Err(e) => {
                debug!("Failed to read stdin: {}", e);
                QuizInput::Shutdown
            }
        };
        let done = input == QuizInput::Shutdown;
        if inputs.send(input).is_err() || done {
            break;
        }
    }
}

fn print_event(event: &GameEvent) {
    match event {
        GameEvent::Started { total_words } => println!("{} words, easiest first.", total_words),
        GameEvent::WordShown { index, prompt, tier } => {
            println!("\n#{} [{}]  {}", index + 1, tier, prompt)
        }
        GameEvent::Correct { spoken, matched, .. } if spoken.eq_ignore_ascii_case(matched) => {
            println!("  correct!")
        }
        GameEvent::Correct { matched, .. } => println!("  correct! ({})", matched),
        GameEvent::Wrong { spoken, .. } => println!("  '{}' is not it, try again", spoken),
        GameEvent::Skipped { answer, .. } => println!("  skipped, it was: {}", answer),
        GameEvent::AdvanceRequested { .. } => {}
        GameEvent::Completed { result } => {
            println!(
                "\nLevel {}: {} correct, {} missed{}",
                result.achieved_tier,
                result.total_points,
                result.total_missed,
                if result.is_perfect { " (perfect!)" } else { "" }
            );
            for level in &result.level_results {
                println!("  {}  {}/{}", level.tier, level.correct_count, level.total_count);
            }
        }
        GameEvent::SpeechError { message, .. } => eprintln!("  {}", message),
    }
}
