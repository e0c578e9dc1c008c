use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{PrayerName, ReasonCode, YearMonth};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySummary {
    pub completed: u8,
    pub missed: u8,
    pub pending: u8,
}

impl DaySummary {
    pub fn logged(&self) -> u8 {
        self.completed + self.missed
    }

    pub fn completion_ratio(&self) -> f64 {
        let total = self.completed + self.missed + self.pending;
        if total == 0 {
            0.0
        } else {
            self.completed as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthSummary {
    pub month: YearMonth,
    pub ada_completed: u32,
    pub missed: u32,
    pub qaza_cleared: u64,
    pub most_missed_prayer: Option<PrayerName>,
    pub most_common_reason: Option<ReasonCode>,
}

/// Whether anything was logged on one day of the trailing activity strip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayActivity {
    pub date: NaiveDate,
    pub weekday: String,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    pub current: u32,
    pub best: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub label: String,
    pub count: u64,
    /// Horizontal position in [0, 1], oldest on the left.
    pub x: f64,
    /// Vertical position in [0, 1], 1.0 at the series maximum.
    pub y: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub min: u64,
    pub max: u64,
    pub points: Vec<TrendPoint>,
}

impl Trend {
    pub fn midpoint(&self) -> u64 {
        self.min + (self.max - self.min).div_ceil(2)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklogShare {
    pub prayer: PrayerName,
    pub count: u64,
    /// Bar length relative to the largest counter, 0–100.
    pub percent_of_max: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklogSummary {
    pub total: u64,
    pub average: u64,
    pub max: u64,
    pub per_prayer: Vec<BacklogShare>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub day: u32,
    pub ada: bool,
    pub missed: bool,
    pub qaza: bool,
}

/// Month laid out for a calendar grid: `leading_blanks` empty cells before
/// day 1, counted from the configured week start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthGrid {
    pub month: YearMonth,
    pub leading_blanks: u32,
    pub days: Vec<CalendarDay>,
}

/// Goal and milestone progress plus recent pace. "Prayed" counts Ada
/// prayers marked completed and qaza prayers paid down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub completed_today: u8,
    pub daily_goal: u8,
    pub total_prayed: u64,
    pub next_milestone: u64,
    /// Prayed per day since the first prayed day, 0 before anything is logged.
    pub average_per_day: f64,
    pub this_week: u64,
    pub this_month: u64,
}

impl Progress {
    /// Share of today's goal reached, capped at 1. A goal of zero is met.
    pub fn goal_ratio(&self) -> f64 {
        if self.daily_goal == 0 {
            1.0
        } else {
            (self.completed_today as f64 / self.daily_goal as f64).min(1.0)
        }
    }

    pub fn remaining_today(&self) -> u8 {
        self.daily_goal.saturating_sub(self.completed_today)
    }

    pub fn to_milestone(&self) -> u64 {
        self.next_milestone.saturating_sub(self.total_prayed)
    }
}
