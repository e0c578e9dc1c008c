use anyhow::{anyhow, bail, Context, Result};
use chrono::{Days, NaiveDate};
use log::{info, warn};
use rusqlite::Connection;
use std::collections::HashSet;
use std::str::FromStr;

use qaza::aggregate::Aggregator;
use qaza::attachments::{AttachmentManager, AudioCaptureProvider, FileCapture, NoCapture};
use qaza::calendar::Calendar;
use qaza::config::AppConfig;
use qaza::db::repository::{SnapshotRepo, VoiceNoteRepo};
use qaza::models::{PrayerName, PrayerStatus, ReasonCode, YearMonth};
use qaza::store::{Snapshot, Tracker};

use crate::cli::args::{QazaCommands, VoiceCommands};
use crate::utils::format::{day_dot, format_bytes, progress_bar, status_icon};

// ─── ANSI helpers ────────────────────────────────────────────────────────────

macro_rules! println_colored {
    ($color:expr, $($arg:tt)*) => {{
        print!("{}", $color);
        print!($($arg)*);
        println!("\x1b[0m");
    }};
}

const GREEN: &str = "\x1b[32m";
const AMBER: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const GOLD: &str = "\x1b[38;2;196;160;68m";

// ─── Loading and saving ──────────────────────────────────────────────────────

fn load_tracker(conn: &Connection) -> Result<Tracker> {
    let snapshot = SnapshotRepo::load(conn).context("Loading prayer log")?;
    Tracker::restore(snapshot).context("Stored prayer log is inconsistent")
}

fn save_tracker(conn: &mut Connection, tracker: &Tracker) -> Result<()> {
    SnapshotRepo::save(conn, &tracker.snapshot()).context("Saving prayer log")
}

/// Manager holding the voice note attached to one entry, if there is one.
fn notes_for_entry<P: AudioCaptureProvider>(
    conn: &Connection,
    provider: P,
    config: &AppConfig,
    tracker: &Tracker,
    date: NaiveDate,
    prayer: PrayerName,
) -> Result<AttachmentManager<P>> {
    let mut manager = AttachmentManager::new(provider, config.voice.max_bytes);
    if let Some(id) = tracker.log.get_entry(date, prayer).attachment {
        match VoiceNoteRepo::get(conn, id)? {
            Some(note) => {
                manager.adopt(note.id, note.date, note.prayer, note.audio, note.captured_at);
            }
            None => warn!("voice note {} of {} on {} has no stored audio", id, prayer, date),
        }
    }
    Ok(manager)
}

fn parse_prayer(s: &str) -> Result<PrayerName> {
    PrayerName::from_str(s)
        .map_err(|_| anyhow!("Unknown prayer '{}'. Use: fajr, dhuhr, asr, maghrib, isha", s))
}

fn parse_date(arg: Option<&str>, calendar: &dyn Calendar) -> Result<NaiveDate> {
    match arg {
        None => Ok(calendar.today()),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("Bad date '{}', expected YYYY-MM-DD", s)),
    }
}

// ─── Mark prayer ─────────────────────────────────────────────────────────────

pub fn handle_mark(
    conn: &mut Connection,
    config: &AppConfig,
    calendar: &dyn Calendar,
    prayer_str: &str,
    missed: bool,
    date: Option<&str>,
) -> Result<()> {
    let prayer = parse_prayer(prayer_str)?;
    let date = parse_date(date, calendar)?;
    let mut tracker = load_tracker(conn)?;

    if missed {
        tracker.log.mark_missed(date, prayer);
        save_tracker(conn, &tracker)?;
        println_colored!(RED, "  ✗ {} marked as missed", prayer);
        println_colored!(DIM, "  Add a reason with: qaza reason {} <reason>", prayer.as_str());
    } else {
        let mut notes = notes_for_entry(conn, NoCapture, config, &tracker, date, prayer)?;
        let dropped = tracker.mark_completed(&mut notes, date, prayer);
        save_tracker(conn, &tracker)?;
        println_colored!(GREEN, "  ✓ {} marked as done", prayer);
        if dropped.is_some() {
            println_colored!(DIM, "  Voice note detached; `qaza voice prune` deletes it");
        }
    }
    Ok(())
}

// ─── Reason ──────────────────────────────────────────────────────────────────

pub fn handle_reason(
    conn: &mut Connection,
    config: &AppConfig,
    calendar: &dyn Calendar,
    prayer_str: &str,
    reason_str: &str,
    text: Option<&str>,
    date: Option<&str>,
) -> Result<()> {
    let prayer = parse_prayer(prayer_str)?;
    let reason = ReasonCode::from_str(reason_str).map_err(|_| {
        anyhow!(
            "Unknown reason '{}'. Use: sleep, work, travel, health, forgot, voice, other",
            reason_str
        )
    })?;
    if text.is_some() && reason != ReasonCode::Other {
        bail!("--text only applies to reason 'other'");
    }
    let date = parse_date(date, calendar)?;
    let mut tracker = load_tracker(conn)?;

    let mut notes = notes_for_entry(conn, NoCapture, config, &tracker, date, prayer)?;
    let detached = tracker.set_reason(&mut notes, date, prayer, reason)?;
    if let Some(text) = text {
        tracker.log.set_other_text(date, prayer, text)?;
    }
    save_tracker(conn, &tracker)?;

    println_colored!(AMBER, "  {} — reason: {}", prayer, reason);
    if detached.is_some() {
        println_colored!(DIM, "  Voice note detached; `qaza voice prune` deletes it");
    }
    if reason == ReasonCode::VoiceNote {
        println_colored!(
            DIM,
            "  Attach a recording with: qaza voice attach {} <file>",
            prayer.as_str()
        );
    }
    Ok(())
}

// ─── Voice notes ─────────────────────────────────────────────────────────────

pub fn handle_voice(
    conn: &mut Connection,
    config: &AppConfig,
    calendar: &dyn Calendar,
    action: &VoiceCommands,
) -> Result<()> {
    match action {
        VoiceCommands::Attach { prayer, file, date } => {
            let prayer = parse_prayer(prayer)?;
            let date = parse_date(date.as_deref(), calendar)?;
            let mut tracker = load_tracker(conn)?;

            let mut notes =
                notes_for_entry(conn, FileCapture::new(file), config, &tracker, date, prayer)?;
            if tracker.log.get_entry(date, prayer).reason != Some(ReasonCode::VoiceNote) {
                tracker.set_reason(&mut notes, date, prayer, ReasonCode::VoiceNote)?;
            }

            notes.begin_capture(prayer, date)?;
            let note = notes.end_capture()?;
            let replaced = tracker.attach_voice_note(&mut notes, date, prayer, note.id)?;
            VoiceNoteRepo::insert(conn, &note)?;
            if let Some(old) = replaced {
                VoiceNoteRepo::delete(conn, old)?;
                println_colored!(DIM, "  Previous voice note deleted");
            }
            save_tracker(conn, &tracker)?;

            println_colored!(
                GREEN,
                "  ✓ Voice note attached to {} ({})",
                prayer,
                format_bytes(note.len())
            );
        }
        VoiceCommands::Remove { prayer, date } => {
            let prayer = parse_prayer(prayer)?;
            let date = parse_date(date.as_deref(), calendar)?;
            let mut tracker = load_tracker(conn)?;

            let mut notes = notes_for_entry(conn, NoCapture, config, &tracker, date, prayer)?;
            match tracker.remove_voice_note(&mut notes, date, prayer) {
                Some(id) => {
                    VoiceNoteRepo::delete(conn, id)?;
                    save_tracker(conn, &tracker)?;
                    println_colored!(GREEN, "  ✓ Voice note removed from {}", prayer);
                }
                None => println_colored!(DIM, "  {} has no voice note", prayer),
            }
        }
        VoiceCommands::List => {
            let tracker = load_tracker(conn)?;
            let attached: HashSet<_> = tracker.log.entries().filter_map(|e| e.attachment).collect();

            let mut notes = VoiceNoteRepo::get_all(conn)?;
            notes.sort_by_key(|n| (n.date, n.prayer));
            println!();
            if notes.is_empty() {
                println_colored!(DIM, "  No voice notes stored");
            }
            for note in notes {
                let state = if attached.contains(&note.id) { "" } else { "  (detached)" };
                println!(
                    "  {}  {:<8} {:>9}{}",
                    note.date,
                    note.prayer.display_name(),
                    format_bytes(note.audio.len()),
                    state
                );
            }
            println!();
        }
        VoiceCommands::Prune => {
            let tracker = load_tracker(conn)?;
            let attached: HashSet<_> = tracker.log.entries().filter_map(|e| e.attachment).collect();

            let orphans: Vec<_> = VoiceNoteRepo::ids(conn)?
                .into_iter()
                .filter(|id| !attached.contains(id))
                .collect();
            for id in &orphans {
                VoiceNoteRepo::delete(conn, *id)?;
            }
            info!("pruned {} voice notes", orphans.len());
            println_colored!(GREEN, "  ✓ Deleted {} detached voice note(s)", orphans.len());
        }
    }
    Ok(())
}

// ─── Day ─────────────────────────────────────────────────────────────────────

pub fn handle_day(conn: &Connection, calendar: &dyn Calendar, date: Option<&str>) -> Result<()> {
    let date = parse_date(date, calendar)?;
    let tracker = load_tracker(conn)?;
    let notes = VoiceNoteRepo::get_all(conn)?;
    let agg = Aggregator::new(&tracker, calendar);

    println!();
    println_colored!(GOLD, "  {}", date.format("%A, %d %B %Y"));
    println!();
    for entry in tracker.log.get_day(date) {
        let line = format!("  {} {:<8}", status_icon(entry.status), entry.prayer.display_name());
        match entry.status {
            PrayerStatus::Completed => println_colored!(GREEN, "{}", line),
            PrayerStatus::Pending => println_colored!(DIM, "{}", line),
            PrayerStatus::Missed => {
                let mut detail = match entry.reason {
                    Some(ReasonCode::Other) => match &entry.other_text {
                        Some(text) => format!("Other: {}", text),
                        None => "Other".to_string(),
                    },
                    Some(reason) => reason.display_name().to_string(),
                    None => "no reason given".to_string(),
                };
                if let Some(id) = entry.attachment {
                    match notes.iter().find(|n| n.id == id) {
                        Some(n) => detail.push_str(&format!(" ({})", format_bytes(n.audio.len()))),
                        None => detail.push_str(" (audio missing)"),
                    }
                }
                println_colored!(RED, "{}  {}", line, detail);
            }
        }
    }

    let summary = agg.day_summary(date);
    println!();
    println_colored!(
        DIM,
        "  {} done · {} missed · {} pending  ({:.0}%)",
        summary.completed,
        summary.missed,
        summary.pending,
        summary.completion_ratio() * 100.0
    );
    println!();
    Ok(())
}

// ─── Qaza ────────────────────────────────────────────────────────────────────

pub fn handle_qaza(
    conn: &mut Connection,
    calendar: &dyn Calendar,
    action: &QazaCommands,
) -> Result<()> {
    let mut tracker = load_tracker(conn)?;
    let today = calendar.today();

    match action {
        QazaCommands::List => {
            let backlog = Aggregator::new(&tracker, calendar).backlog();
            println!();
            if backlog.total == 0 {
                println_colored!(GREEN, "  ✓ No qaza prayers owed");
            } else {
                println_colored!(AMBER, "  Qaza Backlog ({} prayers)", backlog.total);
                println!();
                for share in &backlog.per_prayer {
                    println!(
                        "  {:<8} {:>5}  {}",
                        share.prayer.display_name(),
                        share.count,
                        progress_bar(share.count, backlog.max, 20)
                    );
                }
                println!();
                println_colored!(DIM, "  Average per prayer: {}", backlog.average);
            }
            println!();
        }
        QazaCommands::Add { prayer, count } => {
            let prayer = parse_prayer(prayer)?;
            let now = tracker.ledger.add_owed(prayer, *count, today)?;
            save_tracker(conn, &tracker)?;
            println_colored!(AMBER, "  Added {} {} to qaza — {} owed", count, prayer, now);
        }
        QazaCommands::Pay { prayer, count } => {
            let prayer = parse_prayer(prayer)?;
            let before = tracker.ledger.get(prayer);
            let now = tracker.ledger.pay_down(prayer, *count, today)?;
            save_tracker(conn, &tracker)?;
            if before == 0 {
                println_colored!(GREEN, "  ✓ No {} qaza owed", prayer);
            } else {
                println_colored!(
                    GREEN,
                    "  ✓ {} {} qaza prayed — {} left",
                    before - now,
                    prayer,
                    now
                );
            }
        }
    }
    Ok(())
}

// ─── Month ───────────────────────────────────────────────────────────────────

pub fn handle_month(
    conn: &Connection,
    calendar: &dyn Calendar,
    month: Option<&str>,
    offset: i32,
) -> Result<()> {
    let base = match month {
        Some(s) => YearMonth::from_str(s)?,
        None => YearMonth::of(calendar.today()),
    };
    let month = calendar.add_months(base, offset);
    let tracker = load_tracker(conn)?;
    let agg = Aggregator::new(&tracker, calendar);
    let summary = agg.month_summary(month);
    let grid = agg.month_calendar(month);

    println!();
    println_colored!(GOLD, "  {}", month.name());
    println!();

    let header = match calendar.week_start() {
        qaza::calendar::WeekStart::Sunday => "  Su Mo Tu We Th Fr Sa",
        qaza::calendar::WeekStart::Monday => "  Mo Tu We Th Fr Sa Su",
    };
    println_colored!(DIM, "{}", header);
    let mut line = String::from("  ");
    for _ in 0..grid.leading_blanks {
        line.push_str("   ");
    }
    let mut column = grid.leading_blanks;
    for day in &grid.days {
        let color = if day.missed {
            RED
        } else if day.ada {
            GREEN
        } else {
            DIM
        };
        let mark = if day.qaza { "*" } else { " " };
        line.push_str(&format!("{}{:>2}\x1b[0m{}", color, day.day, mark));
        column += 1;
        if column % 7 == 0 {
            println!("{}", line);
            line = String::from("  ");
        }
    }
    if !line.trim().is_empty() {
        println!("{}", line);
    }
    println!();
    println_colored!(DIM, "  * = qaza prayed that day");
    println!();

    println_colored!(BOLD, "  Ada prayers:   {}", summary.ada_completed);
    println_colored!(BOLD, "  Missed:        {}", summary.missed);
    println_colored!(BOLD, "  Qaza done:     {}", summary.qaza_cleared);
    println!(
        "  Most missed:   {}",
        summary
            .most_missed_prayer
            .map(|p| p.display_name())
            .unwrap_or("—")
    );
    println!(
        "  Common reason: {}",
        summary
            .most_common_reason
            .map(|r| r.display_name())
            .unwrap_or("—")
    );
    println!();
    Ok(())
}

// ─── Stats ───────────────────────────────────────────────────────────────────

pub fn handle_stats(
    conn: &Connection,
    config: &AppConfig,
    calendar: &dyn Calendar,
    week: bool,
) -> Result<()> {
    let tracker = load_tracker(conn)?;
    let agg = Aggregator::new(&tracker, calendar);
    let today = calendar.today();

    let streak = agg.streaks(today);
    let backlog = agg.backlog();
    let trend = agg.backlog_trend(today, config.stats.trend_weeks);

    println!();
    println_colored!(GOLD, "  Statistics");
    println!();
    println_colored!(
        BOLD,
        "  Streak:      {} days current  |  {} days best",
        streak.current,
        streak.best
    );
    if backlog.total == 0 {
        println_colored!(GREEN, "  Qaza owed:   0 prayers ✓");
    } else {
        println_colored!(
            AMBER,
            "  Qaza owed:   {} prayers (avg {} per prayer)",
            backlog.total,
            backlog.average
        );
    }
    let week_ago = today.checked_sub_days(Days::new(6)).unwrap_or(NaiveDate::MIN);
    println!("  Cleared (7d): {}", tracker.ledger.cleared_between(week_ago, today));

    let progress = agg.progress(today, config.goals.daily_goal, config.goals.milestone_step);
    println!();
    println_colored!(
        BOLD,
        "  Today:       {}/{}  {}",
        progress.completed_today,
        progress.daily_goal,
        progress_bar(progress.completed_today as u64, progress.daily_goal as u64, 10)
    );
    if progress.remaining_today() == 0 {
        println_colored!(GREEN, "  Daily goal reached ✓");
    } else {
        println_colored!(DIM, "  {} prayers remaining today", progress.remaining_today());
    }
    println!(
        "  Prayed:      {} total, {} more to {}",
        progress.total_prayed,
        progress.to_milestone(),
        progress.next_milestone
    );
    println!("  Per day:     {:.1}", progress.average_per_day);
    println!("  This week:   {}", progress.this_week);
    println!("  This month:  {}", progress.this_month);

    if !trend.points.is_empty() {
        println!();
        println_colored!(
            DIM,
            "  Backlog trend  (max {}, mid {}, min {})",
            trend.max,
            trend.midpoint(),
            trend.min
        );
        for point in &trend.points {
            let width = (point.y * 20.0).round() as u64;
            println!(
                "  {:<7} {:>5}  {}",
                point.label,
                point.count,
                progress_bar(width, 20, 20)
            );
        }
    }

    if week {
        let days = config.stats.activity_days;
        println!();
        println_colored!(
            DIM,
            "  Last {} days  (● = 5/5, ◑ = some, ✗ = missed, ○ = none)",
            days
        );
        println!();
        let activity = agg.weekly_activity(today, days);
        print!("  ");
        for a in &activity {
            print!("{:<4}", a.weekday);
        }
        println!();
        print!("  ");
        for a in &activity {
            let summary = agg.day_summary(a.date);
            let color = if !a.active {
                DIM
            } else if summary.missed > 0 {
                RED
            } else {
                GREEN
            };
            print!("{}{:<4}\x1b[0m", color, day_dot(&summary));
        }
        println!();
    }
    println!();
    Ok(())
}

// ─── Export / import ─────────────────────────────────────────────────────────

pub fn handle_export(conn: &Connection) -> Result<()> {
    let snapshot = SnapshotRepo::load(conn)?;
    println!("{}", snapshot.to_json()?);
    Ok(())
}

pub fn handle_import(conn: &mut Connection, path: &str) -> Result<()> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Reading {:?}", path))?;
    let snapshot = Snapshot::from_json(&content)?;
    let tracker = Tracker::restore(snapshot)
        .with_context(|| format!("{:?} is not a consistent snapshot", path))?;
    save_tracker(conn, &tracker)?;
    println_colored!(
        GREEN,
        "  ✓ Imported {} entries, {} qaza owed",
        tracker.log.len(),
        tracker.ledger.total()
    );
    Ok(())
}

// ─── Goal ────────────────────────────────────────────────────────────────────

pub fn handle_goal(config: &AppConfig, count: u8) -> Result<()> {
    if !(1..=5).contains(&count) {
        bail!("Daily goal must be between 1 and 5, got {}", count);
    }
    let mut config = config.clone();
    config.goals.daily_goal = count;
    config.save()?;
    info!("daily goal set to {}", count);
    println_colored!(GREEN, "  ✓ Daily goal set to {} prayers", count);
    Ok(())
}
