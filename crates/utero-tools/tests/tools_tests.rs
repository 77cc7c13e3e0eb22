//! Tests for utero-tools: registry dispatch and the logSymptomsAndMood tool

use chrono::NaiveDate;
use serde_json::json;
use std::sync::{Arc, Mutex};
use utero_core::{CycleJournal, Mood};
use utero_tools::*;

#[derive(Default)]
struct RecordingJournal {
    symptoms: Mutex<Vec<(String, Vec<String>)>>,
    moods: Mutex<Vec<(String, Mood)>>,
}

impl CycleJournal for RecordingJournal {
    fn log_symptoms(&self, date_key: &str, symptoms: Vec<String>) {
        self.symptoms.lock().unwrap().push((date_key.to_string(), symptoms));
    }

    fn log_mood(&self, date_key: &str, mood: Mood) {
        self.moods.lock().unwrap().push((date_key.to_string(), mood));
    }
}

fn fixed_tool(journal: &Arc<RecordingJournal>) -> LogSymptomsAndMoodTool {
    let today: Today = Arc::new(|| NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
    LogSymptomsAndMoodTool::with_today(journal.clone(), today)
}

// ===========================================================================
// ToolResult
// ===========================================================================

#[test]
fn tool_result_response_shapes() {
    assert_eq!(ToolResult::text("ok").to_response(), json!({"result": "ok"}));
    assert_eq!(ToolResult::error("bad").to_response(), json!({"error": "bad"}));
    assert!(ToolResult::error("x").is_error());
    assert!(!ToolResult::text("x").is_error());
}

// ===========================================================================
// Registry
// ===========================================================================

#[test]
fn default_registry_declares_log_tool() {
    let journal: Arc<RecordingJournal> = Arc::default();
    let registry = create_default_registry(journal);
    let defs = registry.get_definitions();
    assert_eq!(defs.len(), 1);
    assert_eq!(defs[0].name, LOG_SYMPTOMS_AND_MOOD);
    assert_eq!(defs[0].parameters["type"], "OBJECT");
    assert_eq!(defs[0].parameters["properties"]["symptoms"]["type"], "ARRAY");
    assert_eq!(defs[0].parameters["properties"]["mood"]["enum"][4], "Very Happy");
    assert_eq!(defs[0].parameters["properties"]["symptoms"]["items"]["enum"][0], "Cramps");
}

#[tokio::test]
async fn registry_unknown_tool_is_error_result() {
    let registry = ToolRegistry::new();
    let result = registry.execute("nope", json!({})).await;
    assert_eq!(result, ToolResult::Error("Tool not found: nope".into()));
}

// ===========================================================================
// logSymptomsAndMood
// ===========================================================================

#[tokio::test]
async fn log_tool_records_symptoms_and_mood_once() {
    let journal: Arc<RecordingJournal> = Arc::default();
    let tool = fixed_tool(&journal);
    let result = tool
        .execute(json!({"symptoms": ["Cramps", "Fatigue"], "mood": "Sad"}))
        .await;
    assert_eq!(
        result.to_response(),
        json!({"result": "OK, symptoms and mood logged successfully."})
    );
    let symptoms = journal.symptoms.lock().unwrap();
    assert_eq!(symptoms.len(), 1);
    assert_eq!(symptoms[0].0, "2024-03-15");
    assert_eq!(symptoms[0].1, vec!["Cramps", "Fatigue"]);
    let moods = journal.moods.lock().unwrap();
    assert_eq!(moods.as_slice(), &[("2024-03-15".to_string(), Mood::Sad)]);
}

#[tokio::test]
async fn log_tool_skips_empty_symptoms() {
    let journal: Arc<RecordingJournal> = Arc::default();
    let tool = fixed_tool(&journal);
    tool.execute(json!({"symptoms": [], "mood": "Very Happy"})).await;
    assert!(journal.symptoms.lock().unwrap().is_empty());
    assert_eq!(journal.moods.lock().unwrap()[0].1, Mood::VeryHappy);
}

#[tokio::test]
async fn log_tool_ignores_unknown_mood_but_acknowledges() {
    let journal: Arc<RecordingJournal> = Arc::default();
    let tool = fixed_tool(&journal);
    let result = tool.execute(json!({"mood": "Ecstatic"})).await;
    assert!(!result.is_error());
    assert!(journal.moods.lock().unwrap().is_empty());
    assert!(journal.symptoms.lock().unwrap().is_empty());
}

#[tokio::test]
async fn log_tool_requires_exact_mood_label() {
    let journal: Arc<RecordingJournal> = Arc::default();
    let tool = fixed_tool(&journal);
    let result = tool.execute(json!({"mood": "sad"})).await;
    assert!(!result.is_error());
    assert!(journal.moods.lock().unwrap().is_empty());

    tool.execute(json!({"mood": "Sad"})).await;
    assert_eq!(journal.moods.lock().unwrap()[0].1, Mood::Sad);
}

#[tokio::test]
async fn log_tool_tolerates_malformed_args() {
    let journal: Arc<RecordingJournal> = Arc::default();
    let tool = fixed_tool(&journal);
    let result = tool.execute(json!({"symptoms": "Cramps", "mood": 3})).await;
    assert!(!result.is_error());
    assert!(journal.symptoms.lock().unwrap().is_empty());
    assert!(journal.moods.lock().unwrap().is_empty());
}
