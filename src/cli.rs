use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "dino-lingo", about = "Dino Lingo - spoken vocabulary quiz")]
pub struct CliArgs {
    /// Settings file (JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Word list to play instead of the built-in one (JSON, keyed by tier)
    #[arg(long)]
    pub corpus: Option<PathBuf>,

    /// Seed for the word draw, for reproducible games
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override the accepted edit distance
    #[arg(long)]
    pub threshold: Option<usize>,

    /// Print game events as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Enable debug mode with verbose logging
    #[arg(long)]
    pub debug: bool,
}
