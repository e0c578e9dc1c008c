use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::YearMonth;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

/// Date source and month arithmetic the aggregates rely on.
pub trait Calendar {
    fn today(&self) -> NaiveDate;

    fn week_start(&self) -> WeekStart;

    fn days_in_month(&self, month: YearMonth) -> u32 {
        match (month.first_day(), month.offset(1).first_day()) {
            (Some(first), Some(next)) => (next - first).num_days() as u32,
            _ => 0,
        }
    }

    /// Column (0–6) of day 1, counted from the week start.
    fn first_weekday_of_month(&self, month: YearMonth) -> u32 {
        let Some(first) = month.first_day() else {
            return 0;
        };
        match self.week_start() {
            WeekStart::Sunday => first.weekday().num_days_from_sunday(),
            WeekStart::Monday => first.weekday().num_days_from_monday(),
        }
    }

    fn add_months(&self, month: YearMonth, delta: i32) -> YearMonth {
        month.offset(delta)
    }

    /// Every date of the month in order.
    fn dates_in_month(&self, month: YearMonth) -> Vec<NaiveDate> {
        (1..=self.days_in_month(month))
            .filter_map(|day| NaiveDate::from_ymd_opt(month.year, month.month, day))
            .collect()
    }
}

/// Local wall-clock calendar.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCalendar {
    pub week_start: WeekStart,
}

impl SystemCalendar {
    pub fn new(week_start: WeekStart) -> Self {
        Self { week_start }
    }
}

impl Calendar for SystemCalendar {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn week_start(&self) -> WeekStart {
        self.week_start
    }
}

/// Calendar pinned to one date, for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedCalendar {
    pub today: NaiveDate,
    pub week_start: WeekStart,
}

impl FixedCalendar {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            week_start: WeekStart::Sunday,
        }
    }
}

impl Calendar for FixedCalendar {
    fn today(&self) -> NaiveDate {
        self.today
    }

    fn week_start(&self) -> WeekStart {
        self.week_start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cal() -> FixedCalendar {
        FixedCalendar::new(NaiveDate::from_ymd_opt(2024, 12, 15).unwrap())
    }

    #[test]
    fn days_in_month_handles_leap_years() {
        let c = cal();
        assert_eq!(c.days_in_month(YearMonth::new(2024, 2).unwrap()), 29);
        assert_eq!(c.days_in_month(YearMonth::new(2023, 2).unwrap()), 28);
        assert_eq!(c.days_in_month(YearMonth::new(2024, 12).unwrap()), 31);
        assert_eq!(c.days_in_month(YearMonth::new(1900, 2).unwrap()), 28);
    }

    #[test]
    fn first_weekday_depends_on_week_start() {
        // 1 December 2024 was a Sunday.
        let dec = YearMonth::new(2024, 12).unwrap();
        let mut c = cal();
        assert_eq!(c.first_weekday_of_month(dec), 0);
        c.week_start = WeekStart::Monday;
        assert_eq!(c.first_weekday_of_month(dec), 6);
    }

    #[test]
    fn dates_in_month_are_ordered() {
        let dates = cal().dates_in_month(YearMonth::new(2024, 4).unwrap());
        assert_eq!(dates.len(), 30);
        assert_eq!(dates[0], NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
        assert_eq!(dates[29], NaiveDate::from_ymd_opt(2024, 4, 30).unwrap());
    }
}
