//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `storybuilder_core` linkage and
//!   the configured storage.
//! - Keep output deterministic for quick local sanity checks.

use std::process::ExitCode;
use storybuilder_core::db::open_db;
use storybuilder_core::{init_logging, CoreConfig, SqliteKeyValueStore, StoryRepository};

fn main() -> ExitCode {
    println!("storybuilder_core version={}", storybuilder_core::core_version());

    match run() {
        Ok(count) => {
            println!("storybuilder_core stories={count}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("storybuilder_cli error={err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<usize, Box<dyn std::error::Error>> {
    let config = CoreConfig::from_env()?;
    if let Some(log_dir) = config.log_dir.as_deref() {
        init_logging(config.log_level, log_dir)?;
    }

    let conn = open_db(&config.db_path)?;
    let store = SqliteKeyValueStore::try_new(&conn)?;
    let mut repo = StoryRepository::with_storage_key(store, config.storage_key.as_str());
    let count = repo.load().len();
    log::info!("event=cli_probe module=cli status=ok count={count}");
    Ok(count)
}
