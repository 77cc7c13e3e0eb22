//! Cycle phase and date arithmetic
//!
//! All dates are calendar dates. Days before the recorded period start wrap
//! into the previous cycle, so every date maps to a cycle day in
//! `[0, cycle_length)`.

use crate::types::{CyclePhase, CycleProfile};
use chrono::{Duration, NaiveDate};
use serde::Serialize;

/// Days between ovulation and the next period.
pub const LUTEAL_DAYS: i64 = 14;
/// Days before ovulation that count as fertile.
pub const FERTILE_LEAD_DAYS: i64 = 5;

/// Progress through the cycle containing a given day
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleProgress {
    pub days_until_next_period: i64,
    pub percent_complete: f64,
    pub next_period_date: NaiveDate,
}

/// Calendar markers for one day
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DayFlags {
    pub is_period_day: bool,
    pub is_fertile_day: bool,
    pub is_ovulation_day: bool,
}

/// Read-only view of a profile that answers date questions.
#[derive(Clone, Copy, Debug)]
pub struct CycleClock<'a> {
    profile: &'a CycleProfile,
}

impl<'a> CycleClock<'a> {
    pub fn new(profile: &'a CycleProfile) -> Self {
        Self { profile }
    }

    fn cycle_length(&self) -> i64 {
        i64::from(self.profile.cycle_length())
    }

    fn period_length(&self) -> i64 {
        i64::from(self.profile.period_length())
    }

    fn ovulation_day(&self) -> i64 {
        self.cycle_length() - LUTEAL_DAYS
    }

    fn days_since_start(&self, date: NaiveDate) -> i64 {
        (date - self.profile.last_period_start()).num_days()
    }

    /// Zero-based day within the cycle, always in `[0, cycle_length)`.
    pub fn cycle_day_index(&self, date: NaiveDate) -> u32 {
        // rem_euclid keeps the result non-negative; cycle_length <= 45 fits u32
        self.days_since_start(date).rem_euclid(self.cycle_length()) as u32
    }

    pub fn phase_on(&self, date: NaiveDate) -> CyclePhase {
        let day = i64::from(self.cycle_day_index(date));
        let ovulation = self.ovulation_day();

        if day < self.period_length() {
            CyclePhase::Menstrual
        } else if day < ovulation - 1 {
            CyclePhase::Follicular
        } else if day <= ovulation + 1 {
            CyclePhase::Ovulatory
        } else if day < self.cycle_length() {
            CyclePhase::Luteal
        } else {
            CyclePhase::Unknown
        }
    }

    pub fn current_phase(&self, today: NaiveDate) -> CyclePhase {
        self.phase_on(today)
    }

    pub fn day_flags(&self, date: NaiveDate) -> DayFlags {
        let day = i64::from(self.cycle_day_index(date));
        let ovulation = self.ovulation_day();
        DayFlags {
            is_period_day: day < self.period_length(),
            is_fertile_day: (ovulation - FERTILE_LEAD_DAYS..=ovulation).contains(&day),
            is_ovulation_day: (ovulation - 1..=ovulation + 1).contains(&day),
        }
    }

    /// Start date of the cycle containing `date`.
    pub fn cycle_start_for(&self, date: NaiveDate) -> NaiveDate {
        let elapsed = self.days_since_start(date).div_euclid(self.cycle_length());
        self.profile.last_period_start() + Duration::days(elapsed * self.cycle_length())
    }

    pub fn progress(&self, today: NaiveDate) -> CycleProgress {
        let current_start = self.cycle_start_for(today);
        let next_period_date = current_start + Duration::days(self.cycle_length());
        let into_cycle = (today - current_start).num_days() as f64;
        let percent = (into_cycle / self.cycle_length() as f64 * 100.0).clamp(0.0, 100.0);

        CycleProgress {
            days_until_next_period: (next_period_date - today).num_days(),
            percent_complete: percent,
            next_period_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_index_wraps_far_before_start() {
        let p = CycleProfile::new(d(2024, 1, 1), 30, 5).unwrap();
        let clock = CycleClock::new(&p);
        assert_eq!(clock.cycle_day_index(d(2023, 12, 2)), 0);
        assert_eq!(clock.cycle_day_index(d(2023, 12, 1)), 29);
    }

    #[test]
    fn test_flags_around_ovulation() {
        let p = CycleProfile::new(d(2024, 1, 1), 28, 5).unwrap();
        let clock = CycleClock::new(&p);
        // ovulation day index 14 is 2024-01-15
        let f = clock.day_flags(d(2024, 1, 15));
        assert!(f.is_fertile_day && f.is_ovulation_day && !f.is_period_day);
        let f = clock.day_flags(d(2024, 1, 16));
        assert!(!f.is_fertile_day && f.is_ovulation_day);
        let f = clock.day_flags(d(2024, 1, 10));
        assert!(f.is_fertile_day && !f.is_ovulation_day);
    }

    #[test]
    fn test_cycle_start_for_negative_offset() {
        let p = CycleProfile::new(d(2024, 1, 1), 28, 5).unwrap();
        let clock = CycleClock::new(&p);
        assert_eq!(clock.cycle_start_for(d(2023, 12, 31)), d(2023, 12, 4));
    }
}
