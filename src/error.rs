use chrono::NaiveDate;
use thiserror::Error;

use crate::models::PrayerName;

pub type Result<T> = std::result::Result<T, TrackerError>;

/// Failures raised by the prayer log, the qaza ledger and the attachment
/// manager. None of them are fatal: a failed operation leaves prior state
/// untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    #[error("cannot {op} {prayer} on {date}: {detail}")]
    InvalidTransition {
        op: &'static str,
        date: NaiveDate,
        prayer: PrayerName,
        detail: String,
    },

    #[error("count must be a positive integer, got {0}")]
    InvalidDelta(i64),

    #[error("{prayer} backlog of {count} is out of range")]
    CountOutOfRange { prayer: PrayerName, count: u64 },

    #[error("microphone unavailable: {0}")]
    CaptureUnavailable(String),

    #[error("a voice note is already being recorded")]
    CaptureBusy,

    #[error("recording failed: {0}")]
    CaptureFailed(String),

    #[error("recording produced no audio")]
    EmptyCapture,

    #[error("no recording in progress")]
    NoActiveCapture,
}
