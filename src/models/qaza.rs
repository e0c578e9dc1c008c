use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::PrayerName;

/// One dated change to a qaza counter. `applied` is the change that actually
/// landed after clamping: positive when prayers were added to the backlog,
/// negative when they were paid down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QazaEvent {
    pub date: NaiveDate,
    pub prayer: PrayerName,
    pub applied: i64,
}

impl QazaEvent {
    /// Prayers made up by this event, zero for additions.
    pub fn cleared(&self) -> u64 {
        if self.applied < 0 {
            self.applied.unsigned_abs()
        } else {
            0
        }
    }
}
