//! logSymptomsAndMood: record today's symptoms and mood from a voice request

use crate::registry::{Tool, ToolResult};
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};
use utero_core::{date_key, CycleJournal, Mood, COMMON_SYMPTOMS};

pub const LOG_SYMPTOMS_AND_MOOD: &str = "logSymptomsAndMood";

const ACK_TEXT: &str = "OK, symptoms and mood logged successfully.";

/// Source of "today" for dating journal entries.
pub type Today = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

pub struct LogSymptomsAndMoodTool {
    journal: Arc<dyn CycleJournal>,
    today: Today,
    description: String,
}

impl LogSymptomsAndMoodTool {
    pub fn new(journal: Arc<dyn CycleJournal>) -> Self {
        Self::with_today(journal, Arc::new(|| chrono::Local::now().date_naive()))
    }

    pub fn with_today(journal: Arc<dyn CycleJournal>, today: Today) -> Self {
        Self {
            journal,
            today,
            description: "Logs the user's menstrual cycle symptoms and mood for the current day. \
                Use this function when the user mentions how they are feeling physically or emotionally."
                .to_string(),
        }
    }
}

#[async_trait::async_trait]
impl Tool for LogSymptomsAndMoodTool {
    fn name(&self) -> &str {
        LOG_SYMPTOMS_AND_MOOD
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Value {
        let moods: Vec<&str> = Mood::ALL.iter().map(|m| m.as_str()).collect();
        json!({
            "type": "OBJECT",
            "properties": {
                "symptoms": {
                    "type": "ARRAY",
                    "description": format!(
                        "A list of symptoms the user is experiencing. Must be one or more of: {}",
                        COMMON_SYMPTOMS.join(", ")
                    ),
                    "items": { "type": "STRING", "enum": COMMON_SYMPTOMS }
                },
                "mood": {
                    "type": "STRING",
                    "description": format!("The user's current mood. Must be one of: {}", moods.join(", ")),
                    "enum": moods
                }
            }
        })
    }

    async fn execute(&self, args: Value) -> ToolResult {
        let key = date_key((self.today)());

        let symptoms: Vec<String> = args
            .get("symptoms")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|s| s.as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if !symptoms.is_empty() {
            debug!(date = %key, count = symptoms.len(), "logging symptoms");
            self.journal.log_symptoms(&key, symptoms);
        }

        if let Some(raw) = args.get("mood").and_then(|v| v.as_str()) {
            match Mood::from_label(raw) {
                Some(mood) => {
                    debug!(date = %key, %mood, "logging mood");
                    self.journal.log_mood(&key, mood);
                }
                None => warn!("Ignoring unknown mood from model: {}", raw),
            }
        }

        ToolResult::text(ACK_TEXT)
    }
}
