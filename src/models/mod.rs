pub mod attachment;
pub mod month;
pub mod prayer;
pub mod qaza;
pub mod stats;

pub use attachment::{AttachmentId, PlaybackHandle, VoiceAttachment};
pub use month::YearMonth;
pub use prayer::{AdaEntry, PrayerName, PrayerStatus, ReasonCode};
pub use qaza::QazaEvent;
pub use stats::{
    BacklogShare, BacklogSummary, CalendarDay, DayActivity, DaySummary, MonthGrid, MonthSummary,
    Progress, Streak, Trend, TrendPoint,
};
