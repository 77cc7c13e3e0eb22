//! In-memory tracker state mirrored to the JSON store
//!
//! Documents are read once at open. Every mutation rewrites the affected
//! document; write failures are logged and the in-memory state stays usable.

use crate::store::{JsonStore, CYCLE_DATA_KEY, MOODS_KEY, SYMPTOMS_KEY};
use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::RwLock;
use tracing::{error, info, warn};
use utero_core::{date_key, CycleJournal, CycleProfile, Mood, MoodLog, SymptomLog};

#[derive(Default)]
struct TrackerState {
    profile: Option<CycleProfile>,
    symptoms: SymptomLog,
    moods: MoodLog,
}

pub struct Tracker {
    store: JsonStore,
    state: RwLock<TrackerState>,
}

fn load_or_default<T: DeserializeOwned + Default>(store: &JsonStore, key: &str) -> T {
    match store.load(key) {
        Ok(Some(v)) => v,
        Ok(None) => T::default(),
        Err(e) => {
            warn!("Ignoring unreadable {} document: {}", key, e);
            T::default()
        }
    }
}

fn persist<T: Serialize>(store: &JsonStore, key: &str, value: &T) {
    if let Err(e) = store.save(key, value) {
        error!("Failed to persist {}: {}", key, e);
    }
}

impl Tracker {
    pub fn open(store: JsonStore) -> Self {
        let state = TrackerState {
            profile: load_or_default::<Option<CycleProfile>>(&store, CYCLE_DATA_KEY),
            symptoms: load_or_default(&store, SYMPTOMS_KEY),
            moods: load_or_default(&store, MOODS_KEY),
        };
        info!(
            "Tracker loaded from {} ({} symptom days, {} mood days, profile: {})",
            store.dir().display(),
            state.symptoms.len(),
            state.moods.len(),
            state.profile.is_some()
        );
        Self {
            store,
            state: RwLock::new(state),
        }
    }

    fn read<R>(&self, f: impl FnOnce(&TrackerState) -> R) -> R {
        match self.state.read() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    fn write<R>(&self, f: impl FnOnce(&mut TrackerState) -> R) -> R {
        match self.state.write() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    pub fn profile(&self) -> Option<CycleProfile> {
        self.read(|s| s.profile.clone())
    }

    pub fn set_profile(&self, profile: CycleProfile) {
        self.write(|s| {
            s.profile = Some(profile);
            persist(&self.store, CYCLE_DATA_KEY, &s.profile);
        });
    }

    pub fn symptoms_on(&self, date: NaiveDate) -> Vec<String> {
        let key = date_key(date);
        self.read(|s| s.symptoms.get(&key).cloned().unwrap_or_default())
    }

    pub fn mood_on(&self, date: NaiveDate) -> Option<Mood> {
        let key = date_key(date);
        self.read(|s| s.moods.get(&key).copied())
    }

    pub fn symptom_log(&self) -> SymptomLog {
        self.read(|s| s.symptoms.clone())
    }

    pub fn mood_log(&self) -> MoodLog {
        self.read(|s| s.moods.clone())
    }

    pub fn set_symptoms(&self, date: NaiveDate, symptoms: Vec<String>) {
        self.log_symptoms(&date_key(date), symptoms);
    }

    pub fn set_mood(&self, date: NaiveDate, mood: Mood) {
        self.log_mood(&date_key(date), mood);
    }

    /// Forget the profile and every logged day, on disk and in memory.
    pub fn clear_all(&self) {
        self.write(|s| *s = TrackerState::default());
        if let Err(e) = self.store.clear() {
            error!("Failed to clear store: {}", e);
        }
        info!("All tracker data cleared");
    }
}

impl CycleJournal for Tracker {
    fn log_symptoms(&self, date_key: &str, symptoms: Vec<String>) {
        self.write(|s| {
            s.symptoms.insert(date_key.to_string(), symptoms);
            persist(&self.store, SYMPTOMS_KEY, &s.symptoms);
        });
    }

    fn log_mood(&self, date_key: &str, mood: Mood) {
        self.write(|s| {
            s.moods.insert(date_key.to_string(), mood);
            persist(&self.store, MOODS_KEY, &s.moods);
        });
    }
}
