use anyhow::Result;
use log::info;
use rusqlite::Connection;

use crate::db::repository::MetaRepo;

pub const SCHEMA_VERSION: &str = "1";

pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch("
        CREATE TABLE IF NOT EXISTS ada_entries (
            date           TEXT NOT NULL,
            prayer         TEXT NOT NULL CHECK(prayer IN ('fajr','dhuhr','asr','maghrib','isha')),
            status         TEXT NOT NULL DEFAULT 'pending'
                           CHECK(status IN ('pending','completed','missed')),
            reason         TEXT,
            other_text     TEXT,
            attachment_id  TEXT,
            PRIMARY KEY (date, prayer)
        );

        CREATE TABLE IF NOT EXISTS qaza_counters (
            prayer  TEXT PRIMARY KEY,
            count   INTEGER NOT NULL DEFAULT 0 CHECK(count >= 0)
        );

        CREATE TABLE IF NOT EXISTS qaza_events (
            id       INTEGER PRIMARY KEY AUTOINCREMENT,
            date     TEXT NOT NULL,
            prayer   TEXT NOT NULL,
            applied  INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS voice_notes (
            id           TEXT PRIMARY KEY,
            date         TEXT NOT NULL,
            prayer       TEXT NOT NULL,
            audio        BLOB NOT NULL,
            captured_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS app_meta (
            key   TEXT PRIMARY KEY,
            value TEXT
        );
    ")?;

    seed_counters(conn)?;

    let previous = MetaRepo::get(conn, "schema_version")?;
    if previous.as_deref() != Some(SCHEMA_VERSION) {
        info!(
            "database schema {} -> {}",
            previous.as_deref().unwrap_or("none"),
            SCHEMA_VERSION
        );
        MetaRepo::set(conn, "schema_version", SCHEMA_VERSION)?;
    }
    Ok(())
}

fn seed_counters(conn: &Connection) -> Result<()> {
    for prayer in ["fajr", "dhuhr", "asr", "maghrib", "isha"] {
        conn.execute(
            "INSERT OR IGNORE INTO qaza_counters (prayer, count) VALUES (?1, 0)",
            rusqlite::params![prayer],
        )?;
    }
    Ok(())
}
