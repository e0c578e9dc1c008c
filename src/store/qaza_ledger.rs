use chrono::NaiveDate;
use log::{debug, info};
use std::collections::BTreeMap;

use crate::error::{Result, TrackerError};
use crate::models::{PrayerName, QazaEvent};

/// Backlog of prayers owed, one non-negative counter per prayer.
///
/// The ledger is driven by explicit calls only; marking an Ada entry missed
/// does not touch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QazaLedger {
    counts: BTreeMap<PrayerName, u64>,
    events: Vec<QazaEvent>,
}

impl Default for QazaLedger {
    fn default() -> Self {
        Self {
            counts: PrayerName::ALL.iter().map(|&p| (p, 0)).collect(),
            events: Vec::new(),
        }
    }
}

/// Largest backlog a counter may hold; it still fits a signed event delta
/// and a SQLite INTEGER.
pub const MAX_COUNT: u64 = i64::MAX as u64;

impl QazaLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from stored counters and history. Prayers missing from
    /// `counts` start at zero.
    pub fn from_parts(
        counts: impl IntoIterator<Item = (PrayerName, u64)>,
        events: Vec<QazaEvent>,
    ) -> Result<Self> {
        let mut ledger = Self {
            events,
            ..Self::default()
        };
        for (prayer, count) in counts {
            if count > MAX_COUNT {
                return Err(TrackerError::CountOutOfRange { prayer, count });
            }
            ledger.counts.insert(prayer, count);
        }
        Ok(ledger)
    }

    /// Add to a counter. A delta that would push it past [`MAX_COUNT`] is
    /// rejected and the counter is left as it was.
    pub fn increment(&mut self, prayer: PrayerName, delta: i64) -> Result<u64> {
        let delta = check_delta(delta)?;
        let current = self.get(prayer);
        let next = current
            .checked_add(delta)
            .filter(|&n| n <= MAX_COUNT)
            .ok_or(TrackerError::CountOutOfRange {
                prayer,
                count: current.saturating_add(delta),
            })?;
        self.counts.insert(prayer, next);
        debug!("qaza {} +{} -> {}", prayer, delta, next);
        Ok(next)
    }

    /// Subtract, stopping at zero. Returns the new count.
    pub fn decrement(&mut self, prayer: PrayerName, delta: i64) -> Result<u64> {
        let delta = check_delta(delta)?;
        let count = self.counts.entry(prayer).or_insert(0);
        *count = count.saturating_sub(delta);
        debug!("qaza {} -{} -> {}", prayer, delta, count);
        Ok(*count)
    }

    pub fn get(&self, prayer: PrayerName) -> u64 {
        self.counts.get(&prayer).copied().unwrap_or(0)
    }

    /// All five counters, zero-filled.
    pub fn get_all(&self) -> BTreeMap<PrayerName, u64> {
        self.counts.clone()
    }

    /// Sum of all counters, saturating at `u64::MAX`.
    pub fn total(&self) -> u64 {
        self.counts.values().fold(0u64, |acc, &c| acc.saturating_add(c))
    }

    /// Add prayers owed and record the change against `on`.
    pub fn add_owed(&mut self, prayer: PrayerName, delta: i64, on: NaiveDate) -> Result<u64> {
        let before = self.get(prayer);
        let after = self.increment(prayer, delta)?;
        self.record(on, prayer, before, after);
        Ok(after)
    }

    /// Record prayers made up on `on`. Only the amount actually cleared is
    /// recorded, so paying down an empty counter leaves no event.
    pub fn pay_down(&mut self, prayer: PrayerName, delta: i64, on: NaiveDate) -> Result<u64> {
        let before = self.get(prayer);
        let after = self.decrement(prayer, delta)?;
        self.record(on, prayer, before, after);
        info!("qaza {} paid down by {} on {}", prayer, before - after, on);
        Ok(after)
    }

    pub fn events(&self) -> &[QazaEvent] {
        &self.events
    }

    /// Prayers made up between `start` and `end`, inclusive.
    pub fn cleared_between(&self, start: NaiveDate, end: NaiveDate) -> u64 {
        self.events
            .iter()
            .filter(|e| e.date >= start && e.date <= end)
            .map(QazaEvent::cleared)
            .fold(0u64, u64::saturating_add)
    }

    /// Backlog total at the end of `date`, rewound from the current total.
    pub fn total_as_of(&self, date: NaiveDate) -> u64 {
        let later: i128 = self
            .events
            .iter()
            .filter(|e| e.date > date)
            .map(|e| i128::from(e.applied))
            .sum();
        (i128::from(self.total()) - later).clamp(0, i128::from(u64::MAX)) as u64
    }

    fn record(&mut self, date: NaiveDate, prayer: PrayerName, before: u64, after: u64) {
        // both sides are at most MAX_COUNT, so the difference fits an i64
        let applied = after as i64 - before as i64;
        if applied != 0 {
            self.events.push(QazaEvent {
                date,
                prayer,
                applied,
            });
        }
    }
}

fn check_delta(delta: i64) -> Result<u64> {
    if delta <= 0 {
        return Err(TrackerError::InvalidDelta(delta));
    }
    Ok(delta as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, d).unwrap()
    }

    #[test]
    fn decrement_clamps_at_zero() {
        let mut ledger = QazaLedger::new();
        ledger.increment(PrayerName::Fajr, 2).unwrap();
        assert_eq!(ledger.decrement(PrayerName::Fajr, 5).unwrap(), 0);
        assert_eq!(ledger.get(PrayerName::Fajr), 0);
        assert_eq!(ledger.decrement(PrayerName::Asr, 1).unwrap(), 0);
    }

    #[test]
    fn non_positive_delta_is_rejected_without_change() {
        let mut ledger = QazaLedger::new();
        ledger.increment(PrayerName::Isha, 3).unwrap();
        let before = ledger.clone();

        assert_eq!(ledger.increment(PrayerName::Isha, 0), Err(TrackerError::InvalidDelta(0)));
        assert_eq!(ledger.decrement(PrayerName::Isha, -2), Err(TrackerError::InvalidDelta(-2)));
        assert_eq!(ledger, before);
    }

    #[test]
    fn get_all_always_has_five_keys() {
        let mut ledger = QazaLedger::new();
        ledger.increment(PrayerName::Maghrib, 4).unwrap();
        let all = ledger.get_all();
        assert_eq!(all.len(), 5);
        assert_eq!(all[&PrayerName::Maghrib], 4);
        assert_eq!(all[&PrayerName::Fajr], 0);
        assert_eq!(ledger.total(), 4);
    }

    #[test]
    fn counters_never_go_negative_under_mixed_ops() {
        let mut ledger = QazaLedger::new();
        let ops: [(bool, i64); 8] = [
            (true, 3),
            (false, 1),
            (false, 7),
            (true, 1),
            (false, 1),
            (false, 1),
            (true, 10),
            (false, 4),
        ];
        for (inc, n) in ops {
            for p in PrayerName::ALL {
                if inc {
                    ledger.increment(p, n).unwrap();
                } else {
                    ledger.decrement(p, n).unwrap();
                }
            }
        }
        assert!(ledger.get_all().values().all(|&c| c == 6));
    }

    #[test]
    fn pay_down_records_only_what_was_cleared() {
        let mut ledger = QazaLedger::new();
        ledger.add_owed(PrayerName::Fajr, 2, day(1)).unwrap();
        ledger.pay_down(PrayerName::Fajr, 5, day(3)).unwrap();
        ledger.pay_down(PrayerName::Fajr, 1, day(4)).unwrap();

        assert_eq!(ledger.events().len(), 2);
        assert_eq!(ledger.events()[1].applied, -2);
        assert_eq!(ledger.cleared_between(day(1), day(31)), 2);
        assert_eq!(ledger.cleared_between(day(4), day(31)), 0);
    }

    #[test]
    fn total_as_of_rewinds_later_events() {
        let mut ledger = QazaLedger::new();
        ledger.increment(PrayerName::Asr, 10).unwrap();
        ledger.pay_down(PrayerName::Asr, 2, day(5)).unwrap();
        ledger.add_owed(PrayerName::Isha, 1, day(6)).unwrap();
        ledger.pay_down(PrayerName::Asr, 3, day(8)).unwrap();

        assert_eq!(ledger.total(), 6);
        assert_eq!(ledger.total_as_of(day(8)), 6);
        assert_eq!(ledger.total_as_of(day(7)), 9);
        assert_eq!(ledger.total_as_of(day(5)), 8);
        assert_eq!(ledger.total_as_of(day(4)), 10);
    }

    #[test]
    fn counters_stop_at_the_storable_maximum() {
        let mut ledger = QazaLedger::new();
        ledger.add_owed(PrayerName::Fajr, i64::MAX, day(1)).unwrap();
        assert_eq!(
            ledger.add_owed(PrayerName::Fajr, i64::MAX, day(2)),
            Err(TrackerError::CountOutOfRange {
                prayer: PrayerName::Fajr,
                count: u64::MAX - 1,
            })
        );
        assert_eq!(ledger.get(PrayerName::Fajr), MAX_COUNT);
        assert_eq!(ledger.events().len(), 1);

        for p in PrayerName::ALL {
            if p != PrayerName::Fajr {
                ledger.increment(p, i64::MAX).unwrap();
            }
        }
        assert_eq!(ledger.total(), u64::MAX);
        assert_eq!(ledger.total_as_of(day(1)), u64::MAX);
        assert_eq!(ledger.pay_down(PrayerName::Fajr, i64::MAX, day(3)).unwrap(), 0);
        assert_eq!(ledger.cleared_between(day(1), day(31)), MAX_COUNT);
    }

    #[test]
    fn restoring_rejects_counts_past_the_maximum() {
        let err = QazaLedger::from_parts([(PrayerName::Isha, u64::MAX)], Vec::new()).unwrap_err();
        assert!(matches!(err, TrackerError::CountOutOfRange { prayer: PrayerName::Isha, .. }));

        let ledger = QazaLedger::from_parts([(PrayerName::Isha, 3)], Vec::new()).unwrap();
        assert_eq!(ledger.get_all().len(), 5);
        assert_eq!(ledger.get(PrayerName::Isha), 3);
    }
}
