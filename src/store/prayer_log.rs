use chrono::NaiveDate;
use log::{debug, info};
use std::collections::BTreeMap;

use crate::error::{Result, TrackerError};
use crate::models::{AdaEntry, AttachmentId, PrayerName, PrayerStatus, ReasonCode};

/// Sparse per-day prayer log. A (date, prayer) pair with no stored entry is
/// Pending; entries are only written on first mutation and never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrayerLog {
    entries: BTreeMap<(NaiveDate, PrayerName), AdaEntry>,
}

impl PrayerLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from stored entries. A later entry for the same key wins.
    /// Fails on the first entry whose reason data does not fit its status.
    pub fn from_entries(entries: impl IntoIterator<Item = AdaEntry>) -> Result<Self> {
        let mut log = Self::new();
        for entry in entries {
            if let Some(detail) = entry.inconsistency() {
                return Err(invalid("restore", &entry, detail));
            }
            log.entries.insert((entry.date, entry.prayer), entry);
        }
        Ok(log)
    }

    pub fn get_entry(&self, date: NaiveDate, prayer: PrayerName) -> AdaEntry {
        self.entries
            .get(&(date, prayer))
            .cloned()
            .unwrap_or_else(|| AdaEntry::pending(date, prayer))
    }

    /// The five entries of a day in canonical prayer order.
    pub fn get_day(&self, date: NaiveDate) -> Vec<AdaEntry> {
        PrayerName::ALL
            .iter()
            .map(|&p| self.get_entry(date, p))
            .collect()
    }

    /// Stored entries in (date, prayer) order.
    pub fn entries(&self) -> impl Iterator<Item = &AdaEntry> {
        self.entries.values()
    }

    /// Stored entries with `start <= date <= end`.
    pub fn range(&self, start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = &AdaEntry> {
        // BTreeMap::range panics on an inverted range
        let upper = end.max(start);
        self.entries
            .range((start, PrayerName::Fajr)..=(upper, PrayerName::Isha))
            .map(|(_, e)| e)
            .filter(move |e| e.date <= end)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mark as prayed on time. Wipes any reason data and returns the
    /// attachment reference that was dropped, if any.
    pub fn mark_completed(&mut self, date: NaiveDate, prayer: PrayerName) -> Option<AttachmentId> {
        let entry = self.entry_mut(date, prayer);
        entry.status = PrayerStatus::Completed;
        entry.reason = None;
        entry.other_text = None;
        let detached = entry.attachment.take();
        info!("{} on {} marked completed", prayer, date);
        detached
    }

    /// Mark as missed. Reason data already on a Missed entry is kept.
    pub fn mark_missed(&mut self, date: NaiveDate, prayer: PrayerName) {
        let entry = self.entry_mut(date, prayer);
        entry.status = PrayerStatus::Missed;
        info!("{} on {} marked missed", prayer, date);
    }

    /// Set the reason on a Missed entry. Switching away from `Other` clears
    /// the free text; switching away from `VoiceNote` detaches the note,
    /// whose id is returned so the caller can decide what to do with it.
    pub fn set_reason(
        &mut self,
        date: NaiveDate,
        prayer: PrayerName,
        reason: ReasonCode,
    ) -> Result<Option<AttachmentId>> {
        let current = self.get_entry(date, prayer);
        if current.status != PrayerStatus::Missed {
            return Err(invalid("set reason for", &current, "prayer is not marked missed"));
        }

        let entry = self.entry_mut(date, prayer);
        entry.reason = Some(reason);
        if reason != ReasonCode::Other {
            entry.other_text = None;
        }
        let detached = if reason != ReasonCode::VoiceNote {
            entry.attachment.take()
        } else {
            None
        };
        debug!("{} on {}: reason set to {}", prayer, date, reason.as_str());
        Ok(detached)
    }

    pub fn set_other_text(
        &mut self,
        date: NaiveDate,
        prayer: PrayerName,
        text: impl Into<String>,
    ) -> Result<()> {
        let current = self.get_entry(date, prayer);
        if current.reason != Some(ReasonCode::Other) {
            return Err(invalid("describe reason for", &current, "reason is not Other"));
        }
        self.entry_mut(date, prayer).other_text = Some(text.into());
        Ok(())
    }

    /// Bind a voice note; replaces (and returns) any previous one.
    pub fn attach_voice_note(
        &mut self,
        date: NaiveDate,
        prayer: PrayerName,
        attachment: AttachmentId,
    ) -> Result<Option<AttachmentId>> {
        let current = self.get_entry(date, prayer);
        if current.reason != Some(ReasonCode::VoiceNote) {
            return Err(invalid("attach voice note to", &current, "reason is not VoiceNote"));
        }
        let replaced = self.entry_mut(date, prayer).attachment.replace(attachment);
        debug!("{} on {}: voice note {} attached", prayer, date, attachment);
        Ok(replaced)
    }

    /// Drop the attachment reference. The audio itself is not touched.
    pub fn detach_voice_note(&mut self, date: NaiveDate, prayer: PrayerName) -> Option<AttachmentId> {
        let detached = self
            .entries
            .get_mut(&(date, prayer))
            .and_then(|e| e.attachment.take());
        if let Some(id) = detached {
            debug!("{} on {}: voice note {} detached", prayer, date, id);
        }
        detached
    }

    fn entry_mut(&mut self, date: NaiveDate, prayer: PrayerName) -> &mut AdaEntry {
        self.entries
            .entry((date, prayer))
            .or_insert_with(|| AdaEntry::pending(date, prayer))
    }
}

fn invalid(op: &'static str, entry: &AdaEntry, detail: &str) -> TrackerError {
    TrackerError::InvalidTransition {
        op,
        date: entry.date,
        prayer: entry.prayer,
        detail: detail.to_string(),
    }
}
