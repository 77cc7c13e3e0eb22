//! Month grid generation
//!
//! Grids are Sunday-first and padded on both sides with days from the
//! neighbouring months so the cell count is always a multiple of 7.

use crate::cycle::CycleClock;
use crate::types::{date_key, CycleProfile, DayCell, MoodLog, SymptomLog};
use chrono::{Datelike, Duration, NaiveDate};

/// First day of the month at `year`/`month0`, with `month0` normalized into
/// neighbouring years when it falls outside `0..12`.
pub fn first_of_month(year: i32, month0: i32) -> Option<NaiveDate> {
    let y = year.checked_add(month0.div_euclid(12))?;
    let m = month0.rem_euclid(12) as u32 + 1;
    NaiveDate::from_ymd_opt(y, m, 1)
}

fn days_in_month(first: NaiveDate) -> i64 {
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };
    next.map(|n| (n - first).num_days()).unwrap_or(31)
}

/// Build the grid for one month. Returns an empty grid only when the month,
/// or its padding days, lie outside chrono's representable range.
pub fn build_month(
    year: i32,
    month0: i32,
    profile: &CycleProfile,
    symptoms: &SymptomLog,
    moods: &MoodLog,
    today: NaiveDate,
) -> Vec<DayCell> {
    let Some(first) = first_of_month(year, month0) else {
        return Vec::new();
    };
    let clock = CycleClock::new(profile);
    let leading = i64::from(first.weekday().num_days_from_sunday());
    let in_month = days_in_month(first);
    let trailing = (7 - (leading + in_month) % 7) % 7;
    let total = leading + in_month + trailing;
    let Some(grid_start) = first.checked_sub_signed(Duration::days(leading)) else {
        return Vec::new();
    };
    if grid_start.checked_add_signed(Duration::days(total - 1)).is_none() {
        return Vec::new();
    }

    (0..total)
        .zip(grid_start.iter_days())
        .map(|(i, date)| {
            let in_current_month = i >= leading && i < leading + in_month;
            let flags = clock.day_flags(date);

            let (logged_symptoms, logged_mood) = if in_current_month {
                let key = date_key(date);
                (
                    symptoms.get(&key).cloned().unwrap_or_default(),
                    moods.get(&key).copied(),
                )
            } else {
                (Vec::new(), None)
            };

            DayCell {
                date,
                in_current_month,
                is_today: date == today,
                is_period_day: flags.is_period_day,
                is_fertile_day: flags.is_fertile_day,
                is_ovulation_day: flags.is_ovulation_day,
                phase: clock.phase_on(date),
                logged_symptoms,
                logged_mood,
            }
        })
        .collect()
}
