//! Plain-text rendering of the month grid and cycle status

use chrono::Datelike;
use utero_core::{CycleProgress, CyclePhase, DayCell};

const CELL_WIDTH: usize = 7;
const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const BAR_WIDTH: usize = 28;

pub fn phase_letter(phase: CyclePhase) -> char {
    match phase {
        CyclePhase::Menstrual => 'M',
        CyclePhase::Follicular => 'F',
        CyclePhase::Ovulatory => 'O',
        CyclePhase::Luteal => 'L',
        CyclePhase::Unknown => '?',
    }
}

/// `[15O@.]`: brackets mark today, then day, phase letter, cycle marker
/// (`*` period, `+` fertile, `@` ovulation) and `.` when something is logged.
pub fn render_cell(cell: &DayCell) -> String {
    if !cell.in_current_month {
        return " ".repeat(CELL_WIDTH);
    }
    let (open, close) = if cell.is_today { ('[', ']') } else { (' ', ' ') };
    let marker = if cell.is_ovulation_day {
        '@'
    } else if cell.is_fertile_day {
        '+'
    } else if cell.is_period_day {
        '*'
    } else {
        ' '
    };
    let logged = if cell.logged_symptoms.is_empty() && cell.logged_mood.is_none() {
        ' '
    } else {
        '.'
    };
    format!(
        "{}{:>2}{}{}{}{}",
        open,
        cell.date.day(),
        phase_letter(cell.phase),
        marker,
        logged,
        close
    )
}

pub fn render_month(cells: &[DayCell]) -> String {
    let Some(first) = cells.iter().find(|c| c.in_current_month) else {
        return String::new();
    };
    let width = CELL_WIDTH * WEEKDAYS.len();
    let mut out = String::new();
    out.push_str(&format!("{:^width$}\n", first.date.format("%B %Y").to_string(), width = width));
    for day in WEEKDAYS {
        out.push_str(&format!("{:^width$}", day, width = CELL_WIDTH));
    }
    out.push('\n');
    for week in cells.chunks(WEEKDAYS.len()) {
        let line: String = week.iter().map(render_cell).collect();
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out.push_str("M menstrual  F follicular  O ovulatory  L luteal\n");
    out.push_str("* period  + fertile  @ ovulation  . logged  [ ] today\n");
    out
}

pub fn render_progress(progress: &CycleProgress, phase: CyclePhase) -> String {
    let filled = ((progress.percent_complete / 100.0) * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    let next = match progress.days_until_next_period {
        0 => "Next period expected today".to_string(),
        1 => "Next period in 1 day".to_string(),
        n => format!("Next period in {} days", n),
    };
    format!(
        "Phase: {}\n{} ({})\n[{}{}] {:.0}%\n",
        phase,
        next,
        progress.next_period_date.format("%Y-%m-%d"),
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        progress.percent_complete
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use utero_core::{build_month, CycleClock, CycleProfile, Mood, MoodLog, SymptomLog};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_render_january_2024() {
        let profile = CycleProfile::new(d(2024, 1, 1), 28, 5).unwrap();
        let mut moods = MoodLog::new();
        moods.insert("2024-01-03".into(), Mood::Happy);
        let cells = build_month(2024, 0, &profile, &SymptomLog::new(), &moods, d(2024, 1, 15));
        let text = render_month(&cells);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0].trim(), "January 2024");
        assert!(lines[1].contains("Sun"));
        // 2024-01-01 is a Monday: one blank cell, then a period day
        assert!(lines[2].starts_with(&format!("{}  1M* ", " ".repeat(CELL_WIDTH))));
        assert!(lines[2].contains(" 3M*."));
        assert!(text.contains("[15O@ ]"));
        assert_eq!(lines.len(), 2 + 5 + 2);
    }

    #[test]
    fn test_padding_cells_are_blank() {
        let profile = CycleProfile::new(d(2024, 1, 1), 28, 5).unwrap();
        let cells = build_month(2024, 0, &profile, &SymptomLog::new(), &MoodLog::new(), d(2024, 1, 15));
        assert_eq!(render_cell(&cells[0]), " ".repeat(CELL_WIDTH));
    }

    #[test]
    fn test_render_progress() {
        let profile = CycleProfile::new(d(2024, 1, 1), 28, 5).unwrap();
        let clock = CycleClock::new(&profile);
        let today = d(2024, 1, 15);
        let text = render_progress(&clock.progress(today), clock.phase_on(today));
        assert!(text.contains("Phase: Ovulatory"));
        assert!(text.contains("Next period in 14 days (2024-01-29)"));
        assert!(text.contains("50%"));
        assert!(text.contains(&format!("[{}{}]", "#".repeat(14), "-".repeat(14))));
    }
}
