pub mod prayer_log;
pub mod qaza_ledger;
pub mod snapshot;

pub use prayer_log::PrayerLog;
pub use qaza_ledger::QazaLedger;
pub use snapshot::Snapshot;

use chrono::NaiveDate;
use log::debug;

use crate::attachments::{AttachmentManager, AudioCaptureProvider};
use crate::error::Result;
use crate::models::{AttachmentId, PrayerName, ReasonCode};

/// The session's single owner of prayer and backlog state. Views read from
/// it and mutate it through the log and ledger operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tracker {
    pub log: PrayerLog,
    pub ledger: QazaLedger,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            entries: self.log.entries().cloned().collect(),
            qaza: self.ledger.get_all(),
            qaza_events: self.ledger.events().to_vec(),
        }
    }

    /// Rebuild from a snapshot. Fails, without partial state, when an entry
    /// breaks the status/reason coupling or a counter is out of range.
    pub fn restore(snapshot: Snapshot) -> Result<Self> {
        debug!(
            "restoring {} entries and {} qaza events",
            snapshot.entries.len(),
            snapshot.qaza_events.len()
        );
        Ok(Self {
            log: PrayerLog::from_entries(snapshot.entries)?,
            ledger: QazaLedger::from_parts(snapshot.qaza, snapshot.qaza_events)?,
        })
    }

    // Entry changes that drop a voice note reference also settle the note
    // with the attachment manager. A detached note keeps its audio but loses
    // its playback handles; a replaced or removed note is discarded.

    /// [`PrayerLog::mark_completed`], releasing the dropped note's playback.
    pub fn mark_completed<P: AudioCaptureProvider>(
        &mut self,
        notes: &mut AttachmentManager<P>,
        date: NaiveDate,
        prayer: PrayerName,
    ) -> Option<AttachmentId> {
        let detached = self.log.mark_completed(date, prayer);
        if let Some(id) = detached {
            notes.release_note(id);
        }
        detached
    }

    /// [`PrayerLog::set_reason`], releasing the detached note's playback.
    pub fn set_reason<P: AudioCaptureProvider>(
        &mut self,
        notes: &mut AttachmentManager<P>,
        date: NaiveDate,
        prayer: PrayerName,
        reason: ReasonCode,
    ) -> Result<Option<AttachmentId>> {
        let detached = self.log.set_reason(date, prayer, reason)?;
        if let Some(id) = detached {
            notes.release_note(id);
        }
        Ok(detached)
    }

    /// [`PrayerLog::attach_voice_note`]. The note it replaces is discarded
    /// and its id returned so stored audio can be deleted too.
    pub fn attach_voice_note<P: AudioCaptureProvider>(
        &mut self,
        notes: &mut AttachmentManager<P>,
        date: NaiveDate,
        prayer: PrayerName,
        attachment: AttachmentId,
    ) -> Result<Option<AttachmentId>> {
        let replaced = self.log.attach_voice_note(date, prayer, attachment)?;
        if let Some(old) = replaced.filter(|&old| old != attachment) {
            notes.discard(old);
        }
        Ok(replaced)
    }

    /// Detach an entry's voice note and discard it.
    pub fn remove_voice_note<P: AudioCaptureProvider>(
        &mut self,
        notes: &mut AttachmentManager<P>,
        date: NaiveDate,
        prayer: PrayerName,
    ) -> Option<AttachmentId> {
        let removed = self.log.detach_voice_note(date, prayer);
        if let Some(id) = removed {
            notes.discard(id);
        }
        removed
    }
}
