use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::models::{
    AdaEntry, AttachmentId, PrayerName, PrayerStatus, QazaEvent, ReasonCode, VoiceAttachment,
};
use crate::store::Snapshot;

const DATE_FMT: &str = "%Y-%m-%d";

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FMT).map_err(|e| anyhow!("Bad date '{}': {}", s, e))
}

fn format_date(d: NaiveDate) -> String {
    d.format(DATE_FMT).to_string()
}

// ─── Ada entries ─────────────────────────────────────────────────────────────

pub struct EntryRepo;

impl EntryRepo {
    pub fn get_all(conn: &Connection) -> Result<Vec<AdaEntry>> {
        let mut stmt = conn.prepare(
            "SELECT date, prayer, status, reason, other_text, attachment_id
             FROM ada_entries
             ORDER BY date, CASE prayer
               WHEN 'fajr' THEN 1 WHEN 'dhuhr' THEN 2 WHEN 'asr' THEN 3
               WHEN 'maghrib' THEN 4 WHEN 'isha' THEN 5 END",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?;

        let mut result = Vec::new();
        for r in rows {
            let (date, prayer, status, reason, other_text, attachment) = r?;
            result.push(AdaEntry {
                date: parse_date(&date)?,
                prayer: PrayerName::from_str(&prayer)?,
                status: PrayerStatus::from_str(&status)?,
                reason: reason.as_deref().map(ReasonCode::from_str).transpose()?,
                other_text,
                attachment: attachment
                    .as_deref()
                    .map(AttachmentId::from_str)
                    .transpose()
                    .context("Bad attachment id")?,
            });
        }
        Ok(result)
    }

    pub fn upsert(conn: &Connection, entry: &AdaEntry) -> Result<()> {
        conn.execute(
            "INSERT INTO ada_entries (date, prayer, status, reason, other_text, attachment_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(date, prayer) DO UPDATE SET
               status = ?3, reason = ?4, other_text = ?5, attachment_id = ?6",
            params![
                format_date(entry.date),
                entry.prayer.as_str(),
                entry.status.as_str(),
                entry.reason.map(|r| r.as_str()),
                entry.other_text,
                entry.attachment.map(|a| a.to_string()),
            ],
        )?;
        Ok(())
    }
}

// ─── Qaza ledger ─────────────────────────────────────────────────────────────

pub struct QazaRepo;

impl QazaRepo {
    pub fn get_counts(conn: &Connection) -> Result<BTreeMap<PrayerName, u64>> {
        let mut stmt = conn.prepare("SELECT prayer, count FROM qaza_counters")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut result = BTreeMap::new();
        for r in rows {
            let (prayer, count) = r?;
            result.insert(PrayerName::from_str(&prayer)?, count.max(0) as u64);
        }
        Ok(result)
    }

    pub fn set_count(conn: &Connection, prayer: PrayerName, count: u64) -> Result<()> {
        conn.execute(
            "INSERT INTO qaza_counters (prayer, count) VALUES (?1, ?2)
             ON CONFLICT(prayer) DO UPDATE SET count = ?2",
            params![
                prayer.as_str(),
                i64::try_from(count)
                    .with_context(|| format!("{} backlog {} does not fit the database", prayer, count))?,
            ],
        )?;
        Ok(())
    }

    pub fn get_events(conn: &Connection) -> Result<Vec<QazaEvent>> {
        let mut stmt =
            conn.prepare("SELECT date, prayer, applied FROM qaza_events ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let mut result = Vec::new();
        for r in rows {
            let (date, prayer, applied) = r?;
            result.push(QazaEvent {
                date: parse_date(&date)?,
                prayer: PrayerName::from_str(&prayer)?,
                applied,
            });
        }
        Ok(result)
    }

    pub fn add_event(conn: &Connection, event: &QazaEvent) -> Result<()> {
        conn.execute(
            "INSERT INTO qaza_events (date, prayer, applied) VALUES (?1, ?2, ?3)",
            params![format_date(event.date), event.prayer.as_str(), event.applied],
        )?;
        Ok(())
    }
}

// ─── Voice notes ─────────────────────────────────────────────────────────────

/// Voice note audio as stored on disk, before a manager hands out playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredNote {
    pub id: AttachmentId,
    pub date: NaiveDate,
    pub prayer: PrayerName,
    pub audio: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

pub struct VoiceNoteRepo;

impl VoiceNoteRepo {
    pub fn insert(conn: &Connection, note: &VoiceAttachment) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO voice_notes (id, date, prayer, audio, captured_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                note.id.to_string(),
                format_date(note.date),
                note.prayer.as_str(),
                note.audio,
                note.captured_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_all(conn: &Connection) -> Result<Vec<StoredNote>> {
        Self::query(conn, "", params![])
    }

    pub fn get(conn: &Connection, id: AttachmentId) -> Result<Option<StoredNote>> {
        let mut notes = Self::query(conn, "WHERE id = ?1", params![id.to_string()])?;
        Ok(notes.pop())
    }

    /// Ids of every stored note, without loading the audio.
    pub fn ids(conn: &Connection) -> Result<Vec<AttachmentId>> {
        let mut stmt = conn.prepare("SELECT id FROM voice_notes ORDER BY captured_at")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut result = Vec::new();
        for r in rows {
            result.push(AttachmentId::from_str(&r?).context("Bad voice note id")?);
        }
        Ok(result)
    }

    fn query<P: rusqlite::Params>(
        conn: &Connection,
        filter: &str,
        params: P,
    ) -> Result<Vec<StoredNote>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT id, date, prayer, audio, captured_at FROM voice_notes {} ORDER BY captured_at",
            filter
        ))?;
        let rows = stmt.query_map(params, |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Vec<u8>>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut result = Vec::new();
        for r in rows {
            let (id, date, prayer, audio, captured_at) = r?;
            result.push(StoredNote {
                id: AttachmentId::from_str(&id).context("Bad voice note id")?,
                date: parse_date(&date)?,
                prayer: PrayerName::from_str(&prayer)?,
                audio,
                captured_at: DateTime::parse_from_rfc3339(&captured_at)
                    .with_context(|| format!("Bad timestamp '{}'", captured_at))?
                    .with_timezone(&Utc),
            });
        }
        Ok(result)
    }

    pub fn delete(conn: &Connection, id: AttachmentId) -> Result<bool> {
        let n = conn.execute("DELETE FROM voice_notes WHERE id = ?1", params![id.to_string()])?;
        Ok(n > 0)
    }
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

pub struct SnapshotRepo;

impl SnapshotRepo {
    pub fn load(conn: &Connection) -> Result<Snapshot> {
        Ok(Snapshot {
            entries: EntryRepo::get_all(conn)?,
            qaza: QazaRepo::get_counts(conn)?,
            qaza_events: QazaRepo::get_events(conn)?,
        })
    }

    /// Replace the stored log and ledger with `snapshot` in one transaction.
    pub fn save(conn: &mut Connection, snapshot: &Snapshot) -> Result<()> {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM ada_entries", [])?;
        for entry in &snapshot.entries {
            EntryRepo::upsert(&tx, entry)?;
        }
        for (&prayer, &count) in &snapshot.qaza {
            QazaRepo::set_count(&tx, prayer, count)?;
        }
        tx.execute("DELETE FROM qaza_events", [])?;
        for event in &snapshot.qaza_events {
            QazaRepo::add_event(&tx, event)?;
        }
        tx.commit().context("Committing snapshot")?;
        debug!(
            "saved {} entries, {} qaza events",
            snapshot.entries.len(),
            snapshot.qaza_events.len()
        );
        Ok(())
    }
}

// ─── App meta ────────────────────────────────────────────────────────────────

pub struct MetaRepo;

impl MetaRepo {
    pub fn get(conn: &Connection, key: &str) -> Result<Option<String>> {
        conn.query_row(
            "SELECT value FROM app_meta WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(anyhow::Error::from)
    }

    pub fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
        conn.execute(
            "INSERT INTO app_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::{run_migrations, SCHEMA_VERSION};
    use crate::store::Tracker;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, day).unwrap()
    }

    #[test]
    fn migrations_are_idempotent_and_seed_counters() {
        let conn = conn();
        run_migrations(&conn).unwrap();
        let counts = QazaRepo::get_counts(&conn).unwrap();
        assert_eq!(counts.len(), 5);
        assert!(counts.values().all(|&c| c == 0));
        assert_eq!(
            MetaRepo::get(&conn, "schema_version").unwrap().as_deref(),
            Some(SCHEMA_VERSION)
        );
    }

    #[test]
    fn snapshot_round_trips_through_sqlite() {
        let mut conn = conn();
        let mut t = Tracker::new();
        t.log.mark_completed(d(1), PrayerName::Fajr);
        t.log.mark_missed(d(1), PrayerName::Dhuhr);
        t.log.set_reason(d(1), PrayerName::Dhuhr, ReasonCode::WorkStudy).unwrap();
        t.log.mark_missed(d(2), PrayerName::Isha);
        t.log.set_reason(d(2), PrayerName::Isha, ReasonCode::Other).unwrap();
        t.log.set_other_text(d(2), PrayerName::Isha, "family visit").unwrap();
        t.log.mark_missed(d(3), PrayerName::Asr);
        t.log.set_reason(d(3), PrayerName::Asr, ReasonCode::VoiceNote).unwrap();
        t.log.attach_voice_note(d(3), PrayerName::Asr, AttachmentId::new()).unwrap();
        t.ledger.add_owed(PrayerName::Fajr, 12, d(1)).unwrap();
        t.ledger.pay_down(PrayerName::Fajr, 3, d(2)).unwrap();

        let snap = t.snapshot();
        SnapshotRepo::save(&mut conn, &snap).unwrap();
        assert_eq!(SnapshotRepo::load(&conn).unwrap(), snap);

        // saving again replaces rather than appends
        SnapshotRepo::save(&mut conn, &snap).unwrap();
        assert_eq!(SnapshotRepo::load(&conn).unwrap(), snap);
    }

    #[test]
    fn oversized_counter_is_refused_by_the_repo() {
        let conn = conn();
        assert!(QazaRepo::set_count(&conn, PrayerName::Fajr, u64::MAX).is_err());
        assert_eq!(QazaRepo::get_counts(&conn).unwrap()[&PrayerName::Fajr], 0);
    }

    #[test]
    fn voice_notes_store_and_delete() {
        let conn = conn();
        let note = VoiceAttachment {
            id: AttachmentId::new(),
            date: d(4),
            prayer: PrayerName::Maghrib,
            audio: vec![0x52, 0x49, 0x46, 0x46],
            captured_at: DateTime::parse_from_rfc3339("2024-12-04T18:30:00Z")
                .unwrap()
                .with_timezone(&Utc),
            playback: crate::models::PlaybackHandle(1),
        };
        VoiceNoteRepo::insert(&conn, &note).unwrap();

        let stored = VoiceNoteRepo::get_all(&conn).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, note.id);
        assert_eq!(stored[0].audio, note.audio);
        assert_eq!(stored[0].captured_at, note.captured_at);

        assert_eq!(VoiceNoteRepo::ids(&conn).unwrap(), vec![note.id]);
        let one = VoiceNoteRepo::get(&conn, note.id).unwrap().unwrap();
        assert_eq!(one.prayer, PrayerName::Maghrib);
        assert!(VoiceNoteRepo::get(&conn, AttachmentId::new()).unwrap().is_none());

        assert!(VoiceNoteRepo::delete(&conn, note.id).unwrap());
        assert!(!VoiceNoteRepo::delete(&conn, note.id).unwrap());
        assert!(VoiceNoteRepo::get_all(&conn).unwrap().is_empty());
    }
}
