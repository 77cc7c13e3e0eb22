//! Logging collaborator used by tool dispatch

use crate::types::Mood;

/// Sink for daily symptom and mood entries. Writes overwrite by date key.
pub trait CycleJournal: Send + Sync {
    fn log_symptoms(&self, date_key: &str, symptoms: Vec<String>);

    fn log_mood(&self, date_key: &str, mood: Mood);
}
