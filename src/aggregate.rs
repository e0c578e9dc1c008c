//! Read-only views derived from the prayer log and the qaza ledger.

use chrono::{Datelike, Days, NaiveDate};
use std::collections::BTreeMap;

use crate::calendar::Calendar;
use crate::models::{
    BacklogShare, BacklogSummary, CalendarDay, DayActivity, DaySummary, MonthGrid, MonthSummary,
    PrayerName, PrayerStatus, Progress, Streak, Trend, TrendPoint, YearMonth,
};
use crate::store::{PrayerLog, QazaLedger, Tracker};

pub struct Aggregator<'a> {
    log: &'a PrayerLog,
    ledger: &'a QazaLedger,
    calendar: &'a dyn Calendar,
}

impl<'a> Aggregator<'a> {
    pub fn new(tracker: &'a Tracker, calendar: &'a dyn Calendar) -> Self {
        Self {
            log: &tracker.log,
            ledger: &tracker.ledger,
            calendar,
        }
    }

    pub fn day_summary(&self, date: NaiveDate) -> DaySummary {
        let mut summary = DaySummary::default();
        for entry in self.log.get_day(date) {
            match entry.status {
                PrayerStatus::Completed => summary.completed += 1,
                PrayerStatus::Missed => summary.missed += 1,
                PrayerStatus::Pending => summary.pending += 1,
            }
        }
        summary
    }

    /// Totals for a month. A month with nothing logged yields zero counts
    /// and no "most" fields.
    pub fn month_summary(&self, month: YearMonth) -> MonthSummary {
        let mut summary = MonthSummary {
            month,
            ada_completed: 0,
            missed: 0,
            qaza_cleared: 0,
            most_missed_prayer: None,
            most_common_reason: None,
        };
        let dates = self.calendar.dates_in_month(month);
        let (Some(&first), Some(&last)) = (dates.first(), dates.last()) else {
            return summary;
        };

        let mut missed_by_prayer = BTreeMap::new();
        let mut by_reason = BTreeMap::new();
        for entry in self.log.range(first, last) {
            match entry.status {
                PrayerStatus::Completed => summary.ada_completed += 1,
                PrayerStatus::Missed => {
                    summary.missed += 1;
                    *missed_by_prayer.entry(entry.prayer).or_insert(0u32) += 1;
                    if let Some(reason) = entry.reason {
                        *by_reason.entry(reason).or_insert(0u32) += 1;
                    }
                }
                PrayerStatus::Pending => {}
            }
        }

        summary.qaza_cleared = self.ledger.cleared_between(first, last);
        summary.most_missed_prayer = most_frequent(&missed_by_prayer);
        summary.most_common_reason = most_frequent(&by_reason);
        summary
    }

    /// The trailing `days` days ending at `end`, oldest first. A day is
    /// active when at least one prayer was marked completed or missed. Days
    /// before the first representable date are left out.
    pub fn weekly_activity(&self, end: NaiveDate, days: u32) -> Vec<DayActivity> {
        (0..days)
            .rev()
            .filter_map(|back| end.checked_sub_days(Days::new(u64::from(back))))
            .map(|date| DayActivity {
                date,
                weekday: date.format("%a").to_string(),
                active: self.day_summary(date).logged() > 0,
            })
            .collect()
    }

    /// Consecutive clean days ending at `as_of`. A clean day has something
    /// logged and nothing missed.
    pub fn streak(&self, as_of: NaiveDate) -> u32 {
        let mut count = 0;
        let mut date = as_of;
        while self.is_clean_day(date) {
            count += 1;
            match date.pred_opt() {
                Some(prev) => date = prev,
                None => break,
            }
        }
        count
    }

    /// Longest run of clean days anywhere in the log.
    pub fn best_streak(&self) -> u32 {
        let mut days: Vec<NaiveDate> = self.log.entries().map(|e| e.date).collect();
        days.dedup();
        days.retain(|&d| self.is_clean_day(d));

        let mut best = 0u32;
        let mut run = 0u32;
        let mut prev: Option<NaiveDate> = None;
        for day in days {
            run = match prev {
                Some(p) if p.succ_opt() == Some(day) => run + 1,
                _ => 1,
            };
            best = best.max(run);
            prev = Some(day);
        }
        best
    }

    pub fn streaks(&self, as_of: NaiveDate) -> Streak {
        Streak {
            current: self.streak(as_of),
            best: self.best_streak(),
        }
    }

    pub fn backlog(&self) -> BacklogSummary {
        let counts = self.ledger.get_all();
        let total = self.ledger.total();
        let max = counts.values().copied().max().unwrap_or(0);
        let per_prayer = counts
            .iter()
            .map(|(&prayer, &count)| BacklogShare {
                prayer,
                count,
                percent_of_max: if max == 0 {
                    0
                } else {
                    (count as f64 * 100.0 / max as f64).round() as u8
                },
            })
            .collect();
        BacklogSummary {
            total,
            average: (total as f64 / PrayerName::ALL.len() as f64).round() as u64,
            max,
            per_prayer,
        }
    }

    /// Backlog total at the end of each of the last `weeks` weeks, oldest
    /// first, the final week ending at `end`.
    pub fn backlog_series(&self, end: NaiveDate, weeks: u32) -> Vec<(String, u64)> {
        (0..weeks)
            .filter_map(|w| {
                let back = 7 * u64::from(weeks - 1 - w);
                let week_end = end.checked_sub_days(Days::new(back))?;
                Some((format!("Week {}", w + 1), self.ledger.total_as_of(week_end)))
            })
            .collect()
    }

    pub fn backlog_trend(&self, end: NaiveDate, weeks: u32) -> Trend {
        trend(&self.backlog_series(end, weeks))
    }

    pub fn month_calendar(&self, month: YearMonth) -> MonthGrid {
        let days = self
            .calendar
            .dates_in_month(month)
            .into_iter()
            .map(|date| {
                let entries = self.log.get_day(date);
                CalendarDay {
                    day: date.day(),
                    ada: entries.iter().any(|e| e.status == PrayerStatus::Completed),
                    missed: entries.iter().any(|e| e.status == PrayerStatus::Missed),
                    qaza: self.ledger.cleared_between(date, date) > 0,
                }
            })
            .collect();
        MonthGrid {
            month,
            leading_blanks: self.calendar.first_weekday_of_month(month),
            days,
        }
    }

    /// Daily goal and lifetime milestone progress with the recent pace, as of
    /// `as_of`. Milestones fall on multiples of `milestone_step`.
    pub fn progress(&self, as_of: NaiveDate, daily_goal: u8, milestone_step: u64) -> Progress {
        let total_prayed = self.prayed_between(NaiveDate::MIN, NaiveDate::MAX);
        let step = milestone_step.max(1);
        let next_milestone = (total_prayed / step).saturating_add(1).saturating_mul(step);

        let week_start = as_of.checked_sub_days(Days::new(6)).unwrap_or(NaiveDate::MIN);
        let month_start = YearMonth::of(as_of).first_day().unwrap_or(as_of);

        let average_per_day = match self.first_prayed_day() {
            Some(first) if first <= as_of => {
                let days = (as_of - first).num_days() + 1;
                self.prayed_between(first, as_of) as f64 / days as f64
            }
            _ => 0.0,
        };

        Progress {
            completed_today: self.day_summary(as_of).completed,
            daily_goal,
            total_prayed,
            next_milestone,
            average_per_day,
            this_week: self.prayed_between(week_start, as_of),
            this_month: self.prayed_between(month_start, as_of),
        }
    }

    /// Ada prayers completed plus qaza paid down, `start..=end`.
    fn prayed_between(&self, start: NaiveDate, end: NaiveDate) -> u64 {
        let ada = self
            .log
            .range(start, end)
            .filter(|e| e.status == PrayerStatus::Completed)
            .count() as u64;
        ada.saturating_add(self.ledger.cleared_between(start, end))
    }

    fn first_prayed_day(&self) -> Option<NaiveDate> {
        let ada = self
            .log
            .entries()
            .find(|e| e.status == PrayerStatus::Completed)
            .map(|e| e.date);
        let qaza = self
            .ledger
            .events()
            .iter()
            .filter(|e| e.cleared() > 0)
            .map(|e| e.date)
            .min();
        ada.into_iter().chain(qaza).min()
    }

    fn is_clean_day(&self, date: NaiveDate) -> bool {
        let summary = self.day_summary(date);
        summary.missed == 0 && summary.completed > 0
    }
}

/// Scale a series of (label, count) snapshots into [0, 1] plot coordinates.
/// The largest count sits at y = 1.0; a flat series sits at y = 0.5.
pub fn trend(series: &[(String, u64)]) -> Trend {
    let (Some(min), Some(max)) = (
        series.iter().map(|(_, c)| *c).min(),
        series.iter().map(|(_, c)| *c).max(),
    ) else {
        return Trend::default();
    };

    let n = series.len();
    let points = series
        .iter()
        .enumerate()
        .map(|(i, (label, count))| TrendPoint {
            label: label.clone(),
            count: *count,
            x: if n == 1 { 0.5 } else { i as f64 / (n - 1) as f64 },
            y: if max == min {
                0.5
            } else {
                (*count - min) as f64 / (max - min) as f64
            },
        })
        .collect();
    Trend { min, max, points }
}

/// Key with the highest non-zero count; ties go to the key that sorts first.
fn most_frequent<K: Copy + Ord>(counts: &BTreeMap<K, u32>) -> Option<K> {
    let mut best: Option<(K, u32)> = None;
    for (&key, &count) in counts {
        match best {
            Some((_, top)) if top >= count => {}
            _ if count > 0 => best = Some((key, count)),
            _ => {}
        }
    }
    best.map(|(key, _)| key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::FixedCalendar;
    use crate::models::ReasonCode;

    fn d(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    fn cal() -> FixedCalendar {
        FixedCalendar::new(d(12, 15))
    }

    fn series(counts: &[u64]) -> Vec<(String, u64)> {
        counts
            .iter()
            .enumerate()
            .map(|(i, &c)| (format!("Week {}", i + 1), c))
            .collect()
    }

    #[test]
    fn day_summary_counts_every_status() {
        let mut t = Tracker::new();
        t.log.mark_completed(d(12, 1), PrayerName::Fajr);
        t.log.mark_completed(d(12, 1), PrayerName::Dhuhr);
        t.log.mark_missed(d(12, 1), PrayerName::Asr);
        let c = cal();
        let agg = Aggregator::new(&t, &c);
        assert_eq!(
            agg.day_summary(d(12, 1)),
            DaySummary {
                completed: 2,
                missed: 1,
                pending: 2
            }
        );
        assert_eq!(agg.day_summary(d(12, 2)).pending, 5);
    }

    #[test]
    fn empty_month_has_zero_counts_and_no_most_fields() {
        let t = Tracker::new();
        let c = cal();
        let s = Aggregator::new(&t, &c).month_summary(YearMonth::new(2024, 12).unwrap());
        assert_eq!(s.ada_completed, 0);
        assert_eq!(s.missed, 0);
        assert_eq!(s.qaza_cleared, 0);
        assert_eq!(s.most_missed_prayer, None);
        assert_eq!(s.most_common_reason, None);
    }

    #[test]
    fn most_missed_ties_go_to_the_earlier_prayer() {
        let mut t = Tracker::new();
        for day in 1..=3 {
            t.log.mark_missed(d(12, day), PrayerName::Dhuhr);
            t.log.mark_missed(d(12, day + 10), PrayerName::Fajr);
        }
        let c = cal();
        let s = Aggregator::new(&t, &c).month_summary(YearMonth::new(2024, 12).unwrap());
        assert_eq!(s.missed, 6);
        assert_eq!(s.most_missed_prayer, Some(PrayerName::Fajr));
    }

    #[test]
    fn most_common_reason_ignores_entries_without_reason() {
        let mut t = Tracker::new();
        for (day, prayer, reason) in [
            (1, PrayerName::Fajr, Some(ReasonCode::Travel)),
            (2, PrayerName::Fajr, Some(ReasonCode::Sleep)),
            (3, PrayerName::Fajr, Some(ReasonCode::Travel)),
            (3, PrayerName::Isha, Some(ReasonCode::Sleep)),
            (4, PrayerName::Isha, None),
            (5, PrayerName::Isha, None),
            (6, PrayerName::Isha, None),
        ] {
            t.log.mark_missed(d(12, day), prayer);
            if let Some(r) = reason {
                t.log.set_reason(d(12, day), prayer, r).unwrap();
            }
        }
        t.log.mark_completed(d(12, 7), PrayerName::Asr);
        // outside the month
        t.log.mark_missed(d(11, 30), PrayerName::Asr);
        t.log.set_reason(d(11, 30), PrayerName::Asr, ReasonCode::Travel).unwrap();

        let c = cal();
        let s = Aggregator::new(&t, &c).month_summary(YearMonth::new(2024, 12).unwrap());
        assert_eq!(s.ada_completed, 1);
        assert_eq!(s.missed, 7);
        assert_eq!(s.most_missed_prayer, Some(PrayerName::Isha));
        // Sleep and Travel tie at 2; Sleep comes first
        assert_eq!(s.most_common_reason, Some(ReasonCode::Sleep));
    }

    #[test]
    fn month_summary_counts_qaza_paid_down_in_month() {
        let mut t = Tracker::new();
        t.ledger.add_owed(PrayerName::Asr, 10, d(11, 1)).unwrap();
        t.ledger.pay_down(PrayerName::Asr, 1, d(11, 30)).unwrap();
        t.ledger.pay_down(PrayerName::Asr, 2, d(12, 4)).unwrap();
        t.ledger.add_owed(PrayerName::Asr, 3, d(12, 5)).unwrap();
        let c = cal();
        let agg = Aggregator::new(&t, &c);
        assert_eq!(agg.month_summary(YearMonth::new(2024, 12).unwrap()).qaza_cleared, 2);
        assert_eq!(agg.month_summary(YearMonth::new(2024, 11).unwrap()).qaza_cleared, 1);
    }

    #[test]
    fn weekly_activity_ignores_pending_only_days() {
        let mut t = Tracker::new();
        t.log.mark_completed(d(12, 9), PrayerName::Fajr);
        t.log.mark_missed(d(12, 11), PrayerName::Isha);
        let c = cal();
        let week = Aggregator::new(&t, &c).weekly_activity(d(12, 15), 7);
        assert_eq!(week.len(), 7);
        assert_eq!(week[0].date, d(12, 9));
        assert_eq!(week[0].weekday, "Mon");
        let active: Vec<bool> = week.iter().map(|a| a.active).collect();
        assert_eq!(active, vec![true, false, true, false, false, false, false]);
    }

    #[test]
    fn trend_scales_between_min_and_max() {
        let t = trend(&series(&[180, 172, 165, 158]));
        assert_eq!(t.max, 180);
        assert_eq!(t.min, 158);
        assert_eq!(t.points[0].y, 1.0);
        assert_eq!(t.points[3].y, 0.0);
        assert_eq!(t.points[0].x, 0.0);
        assert_eq!(t.points[3].x, 1.0);
        assert!((t.points[1].y - 14.0 / 22.0).abs() < 1e-9);
    }

    #[test]
    fn flat_trend_sits_in_the_middle() {
        let t = trend(&series(&[40, 40, 40]));
        assert!(t.points.iter().all(|p| p.y == 0.5));
        let single = trend(&series(&[7]));
        assert_eq!(single.points[0].x, 0.5);
        assert_eq!(single.points[0].y, 0.5);
        assert_eq!(trend(&[]), Trend::default());
    }

    #[test]
    fn streak_stops_at_a_missed_day() {
        let mut t = Tracker::new();
        for day in 10..=15 {
            t.log.mark_completed(d(12, day), PrayerName::Fajr);
        }
        t.log.mark_missed(d(12, 12), PrayerName::Isha);
        let c = cal();
        let agg = Aggregator::new(&t, &c);
        assert_eq!(agg.streak(d(12, 15)), 3);
        assert_eq!(agg.streak(d(12, 12)), 0);
        assert_eq!(agg.streak(d(12, 16)), 0);
        assert_eq!(agg.best_streak(), 3);
    }

    #[test]
    fn best_streak_finds_older_runs() {
        let mut t = Tracker::new();
        for day in 1..=4 {
            t.log.mark_completed(d(11, day), PrayerName::Asr);
        }
        t.log.mark_completed(d(12, 14), PrayerName::Asr);
        t.log.mark_completed(d(12, 15), PrayerName::Asr);
        let c = cal();
        let s = Aggregator::new(&t, &c).streaks(d(12, 15));
        assert_eq!(s, Streak { current: 2, best: 4 });
    }

    #[test]
    fn backlog_breakdown_matches_counts() {
        let mut t = Tracker::new();
        for (p, n) in [
            (PrayerName::Fajr, 45),
            (PrayerName::Dhuhr, 28),
            (PrayerName::Asr, 32),
            (PrayerName::Maghrib, 15),
            (PrayerName::Isha, 38),
        ] {
            t.ledger.increment(p, n).unwrap();
        }
        let c = cal();
        let b = Aggregator::new(&t, &c).backlog();
        assert_eq!(b.total, 158);
        assert_eq!(b.average, 32);
        assert_eq!(b.max, 45);
        assert_eq!(b.per_prayer[0].percent_of_max, 100);
        assert_eq!(b.per_prayer[3].percent_of_max, 33);
    }

    #[test]
    fn backlog_series_rewinds_by_week() {
        let mut t = Tracker::new();
        t.ledger.add_owed(PrayerName::Fajr, 180, d(11, 20)).unwrap();
        t.ledger.pay_down(PrayerName::Fajr, 8, d(11, 28)).unwrap();
        t.ledger.pay_down(PrayerName::Fajr, 7, d(12, 5)).unwrap();
        t.ledger.pay_down(PrayerName::Fajr, 7, d(12, 12)).unwrap();
        let c = cal();
        let s = Aggregator::new(&t, &c).backlog_series(d(12, 15), 4);
        let counts: Vec<u64> = s.iter().map(|(_, c)| *c).collect();
        assert_eq!(counts, vec![180, 172, 165, 158]);
        assert_eq!(s[0].0, "Week 1");
    }

    #[test]
    fn windows_near_the_earliest_date_are_cut_short() {
        let t = Tracker::new();
        let c = cal();
        let agg = Aggregator::new(&t, &c);
        let near_start = NaiveDate::MIN.checked_add_days(Days::new(2)).unwrap();

        let days = agg.weekly_activity(near_start, 7);
        assert_eq!(days.len(), 3);
        assert_eq!(days[0].date, NaiveDate::MIN);
        assert_eq!(
            agg.backlog_series(NaiveDate::MIN, 4),
            vec![("Week 4".to_string(), 0)]
        );
    }

    #[test]
    fn progress_counts_ada_and_qaza_prayed() {
        let mut t = Tracker::new();
        t.log.mark_completed(d(12, 15), PrayerName::Fajr);
        t.log.mark_completed(d(12, 15), PrayerName::Dhuhr);
        t.log.mark_missed(d(12, 15), PrayerName::Asr);
        t.log.mark_completed(d(12, 10), PrayerName::Isha);
        t.log.mark_completed(d(11, 30), PrayerName::Fajr);
        t.ledger.add_owed(PrayerName::Fajr, 10, d(11, 1)).unwrap();
        t.ledger.pay_down(PrayerName::Fajr, 3, d(12, 14)).unwrap();

        let c = cal();
        let p = Aggregator::new(&t, &c).progress(d(12, 15), 4, 5);
        assert_eq!(p.completed_today, 2);
        assert_eq!(p.daily_goal, 4);
        assert_eq!(p.goal_ratio(), 0.5);
        assert_eq!(p.total_prayed, 7);
        assert_eq!(p.next_milestone, 10);
        assert_eq!(p.this_week, 6);
        assert_eq!(p.this_month, 6);
        assert!((p.average_per_day - 7.0 / 16.0).abs() < 1e-9);
    }

    #[test]
    fn progress_on_an_empty_log() {
        let t = Tracker::new();
        let c = cal();
        let p = Aggregator::new(&t, &c).progress(d(12, 15), 4, 500);
        assert_eq!(p.total_prayed, 0);
        assert_eq!(p.next_milestone, 500);
        assert_eq!(p.to_milestone(), 500);
        assert_eq!(p.average_per_day, 0.0);
        assert_eq!((p.this_week, p.this_month), (0, 0));
    }

    #[test]
    fn month_calendar_marks_each_day() {
        let mut t = Tracker::new();
        t.log.mark_completed(d(12, 1), PrayerName::Fajr);
        t.log.mark_completed(d(12, 4), PrayerName::Fajr);
        t.log.mark_missed(d(12, 4), PrayerName::Asr);
        t.ledger.increment(PrayerName::Asr, 1).unwrap();
        t.ledger.pay_down(PrayerName::Asr, 1, d(12, 4)).unwrap();
        let c = cal();
        let grid = Aggregator::new(&t, &c).month_calendar(YearMonth::new(2024, 12).unwrap());
        assert_eq!(grid.leading_blanks, 0);
        assert_eq!(grid.days.len(), 31);
        assert_eq!(
            grid.days[3],
            CalendarDay {
                day: 4,
                ada: true,
                missed: true,
                qaza: true
            }
        );
        assert!(grid.days[0].ada && !grid.days[0].missed);
        assert!(!grid.days[1].ada && !grid.days[1].qaza);
    }
}
