//! Utero Store - Local JSON documents and the in-memory tracker built on them

pub mod store;
pub mod tracker;

pub use store::{daily_image_key, JsonStore, CYCLE_DATA_KEY, MOODS_KEY, SYMPTOMS_KEY};
pub use tracker::Tracker;
