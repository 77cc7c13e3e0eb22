//! Utero Core - Types, cycle arithmetic, calendar grid, and error handling

pub mod calendar;
pub mod cycle;
pub mod error;
pub mod journal;
pub mod types;

pub use calendar::build_month;
pub use cycle::{CycleClock, CycleProgress, DayFlags};
pub use error::{Error, Result};
pub use journal::CycleJournal;
pub use types::*;
