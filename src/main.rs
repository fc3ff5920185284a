mod categorize;
mod cli;
mod config;
mod db;
mod error;
mod format;
mod functions;
mod models;
mod receipt;
mod service;
mod validate;

use anyhow::Result;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let (config, notes) = config::Config::load()?;

    env_logger::Builder::new()
        .parse_filters(&config.log_filter)
        .init();
    for note in &notes {
        log::info!("{note}");
    }

    let mut db = db::Database::open(&config.db_path)?;
    log::debug!("Using database {}", config.db_path.display());

    if args.len() < 2 {
        cli::print_usage();
        return Ok(());
    }
    cli::as_cli(&args, &mut db)
}
