//! Tests for the utero package: tracker, voice tool and calendar working together

use chrono::NaiveDate;
use serde_json::json;
use std::sync::Arc;
use utero::render::render_month;
use utero::UteroConfig;
use utero_core::{build_month, CycleClock, CycleProfile, Mood};
use utero_store::{JsonStore, Tracker};
use utero_tools::{LogSymptomsAndMoodTool, Today, ToolRegistry, ToolResult};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn open(dir: &std::path::Path) -> Arc<Tracker> {
    Arc::new(Tracker::open(JsonStore::open(dir).unwrap()))
}

// ===========================================================================
// Voice tool -> tracker -> calendar
// ===========================================================================

#[tokio::test]
async fn tool_logged_day_shows_on_calendar_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = open(dir.path());
    tracker.set_profile(CycleProfile::new(d(2024, 3, 1), 28, 5).unwrap());

    let today: Today = Arc::new(|| d(2024, 3, 12));
    let mut tools = ToolRegistry::new();
    tools.register(LogSymptomsAndMoodTool::with_today(tracker.clone(), today));
    let result = tools
        .execute(
            "logSymptomsAndMood",
            json!({"symptoms": ["Bloating"], "mood": "Very Sad"}),
        )
        .await;
    assert_eq!(result, ToolResult::text("OK, symptoms and mood logged successfully."));
    drop(tools);
    drop(tracker);

    let tracker = open(dir.path());
    assert_eq!(tracker.symptoms_on(d(2024, 3, 12)), vec!["Bloating"]);
    assert_eq!(tracker.mood_on(d(2024, 3, 12)), Some(Mood::VerySad));

    let profile = tracker.profile().unwrap();
    let cells = build_month(2024, 2, &profile, &tracker.symptom_log(), &tracker.mood_log(), d(2024, 3, 12));
    let cell = cells.iter().find(|c| c.date == d(2024, 3, 12)).unwrap();
    assert_eq!(cell.logged_symptoms, vec!["Bloating"]);
    assert_eq!(cell.logged_mood, Some(Mood::VerySad));

    // day 11 of the cycle: fertile, today, logged
    assert!(render_month(&cells).contains("[12F+.]"));
}

#[test]
fn clear_all_forgets_profile_and_logs() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = open(dir.path());
    tracker.set_profile(CycleProfile::new(d(2024, 3, 1), 30, 4).unwrap());
    tracker.set_mood(d(2024, 3, 2), Mood::Happy);
    tracker.clear_all();

    let tracker = open(dir.path());
    assert!(tracker.profile().is_none());
    assert!(tracker.mood_log().is_empty());
}

#[test]
fn status_uses_stored_profile() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = open(dir.path());
    tracker.set_profile(CycleProfile::new(d(2024, 1, 1), 28, 5).unwrap());

    let profile = open(dir.path()).profile().unwrap();
    let progress = CycleClock::new(&profile).progress(d(2024, 1, 29));
    assert_eq!(progress.next_period_date, d(2024, 2, 26));
    assert_eq!(progress.days_until_next_period, 28);
}

#[test]
fn config_file_sets_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("utero.toml");
    std::fs::write(&path, "[storage]\ndata_dir = \"/tmp/utero-data\"\n").unwrap();
    let config = UteroConfig::load(&path);
    assert_eq!(config.storage.data_dir, std::path::PathBuf::from("/tmp/utero-data"));
    assert_eq!(config.proxy.port, 5178);
}
