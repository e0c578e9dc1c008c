mod cli;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use rusqlite::Connection;

use cli::args::{Cli, Commands, QazaCommands};
use cli::handlers;
use qaza::calendar::SystemCalendar;
use qaza::config::AppConfig;
use qaza::db::migrations::run_migrations;

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("Loading config")?;
    let calendar = SystemCalendar::new(config.calendar.week_start);

    // Ensure data directory exists and open DB
    AppConfig::ensure_data_dir()?;
    let db_path = AppConfig::db_path()?;
    let mut conn = Connection::open(&db_path)
        .with_context(|| format!("Opening database at {:?}", db_path))?;

    conn.execute_batch("PRAGMA journal_mode=WAL;")?;

    // Run migrations on every startup
    run_migrations(&conn)?;

    match cli.command {
        Some(Commands::Mark {
            prayer,
            missed,
            date,
        }) => {
            handlers::handle_mark(
                &mut conn,
                &config,
                &calendar,
                &prayer,
                missed,
                date.as_deref(),
            )?;
        }
        Some(Commands::Reason {
            prayer,
            reason,
            text,
            date,
        }) => {
            handlers::handle_reason(
                &mut conn,
                &config,
                &calendar,
                &prayer,
                &reason,
                text.as_deref(),
                date.as_deref(),
            )?;
        }
        Some(Commands::Voice { action }) => {
            handlers::handle_voice(&mut conn, &config, &calendar, &action)?;
        }
        Some(Commands::Day { date }) => {
            handlers::handle_day(&conn, &calendar, date.as_deref())?;
        }
        Some(Commands::Qaza { action }) => {
            handlers::handle_qaza(&mut conn, &calendar, &action)?;
        }
        Some(Commands::Month { month, offset }) => {
            handlers::handle_month(&conn, &calendar, month.as_deref(), offset)?;
        }
        Some(Commands::Stats { week }) => {
            handlers::handle_stats(&conn, &config, &calendar, week)?;
        }
        Some(Commands::Goal { count }) => {
            handlers::handle_goal(&config, count)?;
        }
        Some(Commands::Export) => {
            handlers::handle_export(&conn)?;
        }
        Some(Commands::Import { file }) => {
            handlers::handle_import(&mut conn, &file)?;
        }

        // No subcommand → today's prayers and the backlog
        None => {
            handlers::handle_day(&conn, &calendar, None)?;
            handlers::handle_qaza(&mut conn, &calendar, &QazaCommands::List)?;
        }
    }

    Ok(())
}
