//! Console logging.
//!
//! `RUST_LOG` decides what is printed, falling back to info. `--debug` raises
//! the floor to debug regardless. Output goes to stderr; stdout carries game
//! output.

use chrono::Local;
use log::LevelFilter;
use std::io::Write;

fn console_builder(debug: bool) -> env_logger::Builder {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder
        .target(env_logger::Target::Stderr)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}][{}][{}] {}",
                Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        });

    if debug {
        builder.filter_level(LevelFilter::Debug);
    }
    builder
}

/// Install the console logger. Calling it twice keeps the first logger.
pub fn init(debug: bool) {
    if console_builder(debug).try_init().is_err() {
        log::debug!("Console logger already installed");
    }
}
