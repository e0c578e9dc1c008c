use anyhow::anyhow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::models::AttachmentId;

/// The five daily prayers. Declaration order is the canonical order used for
/// iteration, display and tie-breaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrayerName {
    Fajr,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl PrayerName {
    pub const ALL: [PrayerName; 5] = [
        PrayerName::Fajr,
        PrayerName::Dhuhr,
        PrayerName::Asr,
        PrayerName::Maghrib,
        PrayerName::Isha,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrayerName::Fajr => "fajr",
            PrayerName::Dhuhr => "dhuhr",
            PrayerName::Asr => "asr",
            PrayerName::Maghrib => "maghrib",
            PrayerName::Isha => "isha",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PrayerName::Fajr => "Fajr",
            PrayerName::Dhuhr => "Dhuhr",
            PrayerName::Asr => "Asr",
            PrayerName::Maghrib => "Maghrib",
            PrayerName::Isha => "Isha",
        }
    }
}

impl std::fmt::Display for PrayerName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for PrayerName {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fajr" => Ok(PrayerName::Fajr),
            "dhuhr" | "zuhr" | "dhuhur" => Ok(PrayerName::Dhuhr),
            "asr" => Ok(PrayerName::Asr),
            "maghrib" => Ok(PrayerName::Maghrib),
            "isha" => Ok(PrayerName::Isha),
            _ => Err(anyhow!("Unknown prayer: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrayerStatus {
    #[default]
    Pending,
    Completed,
    Missed,
}

impl PrayerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrayerStatus::Pending => "pending",
            PrayerStatus::Completed => "completed",
            PrayerStatus::Missed => "missed",
        }
    }
}

impl std::fmt::Display for PrayerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrayerStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PrayerStatus::Pending),
            "completed" => Ok(PrayerStatus::Completed),
            "missed" => Ok(PrayerStatus::Missed),
            _ => Err(anyhow!("Unknown prayer status: {}", s)),
        }
    }
}

/// Why a prayer was missed. Declaration order doubles as the tie-break order
/// for "most common reason".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    Sleep,
    WorkStudy,
    Travel,
    Health,
    Forgot,
    VoiceNote,
    Other,
}

impl ReasonCode {
    pub const ALL: [ReasonCode; 7] = [
        ReasonCode::Sleep,
        ReasonCode::WorkStudy,
        ReasonCode::Travel,
        ReasonCode::Health,
        ReasonCode::Forgot,
        ReasonCode::VoiceNote,
        ReasonCode::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::Sleep => "sleep",
            ReasonCode::WorkStudy => "work_study",
            ReasonCode::Travel => "travel",
            ReasonCode::Health => "health",
            ReasonCode::Forgot => "forgot",
            ReasonCode::VoiceNote => "voice_note",
            ReasonCode::Other => "other",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ReasonCode::Sleep => "Sleep",
            ReasonCode::WorkStudy => "Work/Study",
            ReasonCode::Travel => "Travel",
            ReasonCode::Health => "Health",
            ReasonCode::Forgot => "Forgot",
            ReasonCode::VoiceNote => "Voice Message",
            ReasonCode::Other => "Other",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for ReasonCode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sleep" => Ok(ReasonCode::Sleep),
            "work" | "study" | "work/study" | "work_study" | "work-study" => {
                Ok(ReasonCode::WorkStudy)
            }
            "travel" => Ok(ReasonCode::Travel),
            "health" => Ok(ReasonCode::Health),
            "forgot" => Ok(ReasonCode::Forgot),
            "voice" | "voice_note" | "voice-note" | "voice message" => Ok(ReasonCode::VoiceNote),
            "other" => Ok(ReasonCode::Other),
            _ => Err(anyhow!("Unknown reason: {}", s)),
        }
    }
}

/// Current status of one prayer on one date. This is a current-state record;
/// no history of earlier transitions is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdaEntry {
    pub date: NaiveDate,
    pub prayer: PrayerName,
    pub status: PrayerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<ReasonCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<AttachmentId>,
}

impl AdaEntry {
    /// The implicit entry for a (date, prayer) pair nobody has touched yet.
    pub fn pending(date: NaiveDate, prayer: PrayerName) -> Self {
        Self {
            date,
            prayer,
            status: PrayerStatus::Pending,
            reason: None,
            other_text: None,
            attachment: None,
        }
    }

    /// Completed or Missed; a Pending entry counts as not logged.
    pub fn is_logged(&self) -> bool {
        self.status != PrayerStatus::Pending
    }

    /// The first way this entry breaks the status/reason coupling, if any.
    /// Only a Missed entry carries reason data, free text needs reason
    /// `Other`, and an attachment needs reason `VoiceNote`.
    pub fn inconsistency(&self) -> Option<&'static str> {
        let has_reason_data =
            self.reason.is_some() || self.other_text.is_some() || self.attachment.is_some();
        if self.status != PrayerStatus::Missed && has_reason_data {
            return Some("only a missed prayer can carry reason data");
        }
        if self.other_text.is_some() && self.reason != Some(ReasonCode::Other) {
            return Some("free text requires reason Other");
        }
        if self.attachment.is_some() && self.reason != Some(ReasonCode::VoiceNote) {
            return Some("voice note requires reason VoiceNote");
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prayer_names_parse_common_spellings() {
        assert_eq!("Zuhr".parse::<PrayerName>().unwrap(), PrayerName::Dhuhr);
        assert_eq!("DHUHR".parse::<PrayerName>().unwrap(), PrayerName::Dhuhr);
        assert_eq!("isha".parse::<PrayerName>().unwrap(), PrayerName::Isha);
        assert!("tahajjud".parse::<PrayerName>().is_err());
    }

    #[test]
    fn canonical_order_matches_declaration() {
        let mut shuffled = vec![PrayerName::Isha, PrayerName::Fajr, PrayerName::Asr];
        shuffled.sort();
        assert_eq!(shuffled, vec![PrayerName::Fajr, PrayerName::Asr, PrayerName::Isha]);
        assert!(ReasonCode::Sleep < ReasonCode::Other);
    }

    #[test]
    fn reasons_parse_labels_from_the_picker() {
        assert_eq!("Work/Study".parse::<ReasonCode>().unwrap(), ReasonCode::WorkStudy);
        assert_eq!("voice".parse::<ReasonCode>().unwrap(), ReasonCode::VoiceNote);
        assert!("lazy".parse::<ReasonCode>().is_err());
    }

    #[test]
    fn pending_entry_has_no_reason_data() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 4).unwrap();
        let entry = AdaEntry::pending(date, PrayerName::Asr);
        assert_eq!(entry.status, PrayerStatus::Pending);
        assert!(!entry.is_logged());
        assert!(entry.reason.is_none() && entry.other_text.is_none() && entry.attachment.is_none());
        assert_eq!(entry.inconsistency(), None);
    }

    #[test]
    fn reason_data_must_match_status_and_reason() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 4).unwrap();
        let mut entry = AdaEntry::pending(date, PrayerName::Fajr);
        entry.status = PrayerStatus::Completed;
        entry.reason = Some(ReasonCode::Sleep);
        assert!(entry.inconsistency().is_some());

        entry.status = PrayerStatus::Missed;
        assert_eq!(entry.inconsistency(), None);

        entry.other_text = Some("hi".into());
        assert!(entry.inconsistency().is_some());
        entry.reason = Some(ReasonCode::Other);
        assert_eq!(entry.inconsistency(), None);

        entry.attachment = Some(AttachmentId::new());
        assert!(entry.inconsistency().is_some());
    }
}
