//! Core types for Utero

use crate::error::Error;
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Inclusive bounds accepted for the average cycle length, in days.
pub const CYCLE_LENGTH_RANGE: (u32, u32) = (20, 45);
/// Inclusive bounds accepted for the average period length, in days.
pub const PERIOD_LENGTH_RANGE: (u32, u32) = (2, 10);

/// Symptom names offered to the user and to the voice assistant's tool schema.
pub const COMMON_SYMPTOMS: [&str; 12] = [
    "Cramps",
    "Headache",
    "Bloating",
    "Fatigue",
    "Cravings",
    "Mood Swings",
    "Acne",
    "Tender Breasts",
    "Nausea",
    "Backache",
    "Anxiety",
    "Insomnia",
];

/// ISO date key (`YYYY-MM-DD`) used by the symptom and mood logs.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse a date written either as `YYYY-MM-DD` or as a full RFC 3339 timestamp.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|d| d.date_naive()))
}

// ---------------------------------------------------------------------------
// Mood
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mood {
    #[serde(rename = "Very Sad")]
    VerySad,
    Sad,
    Neutral,
    Happy,
    #[serde(rename = "Very Happy")]
    VeryHappy,
}

impl Mood {
    pub const ALL: [Mood; 5] = [
        Mood::VerySad,
        Mood::Sad,
        Mood::Neutral,
        Mood::Happy,
        Mood::VeryHappy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::VerySad => "Very Sad",
            Mood::Sad => "Sad",
            Mood::Neutral => "Neutral",
            Mood::Happy => "Happy",
            Mood::VeryHappy => "Very Happy",
        }
    }

    /// Exact wire label match. `FromStr` is the lenient form for typed input.
    pub fn from_label(label: &str) -> Option<Mood> {
        Mood::ALL.iter().copied().find(|m| m.as_str() == label)
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mood::ALL
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::validation(format!("unknown mood: {}", s)))
    }
}

// ---------------------------------------------------------------------------
// CyclePhase
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CyclePhase {
    Menstrual,
    Follicular,
    Ovulatory,
    Luteal,
    Unknown,
}

impl CyclePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CyclePhase::Menstrual => "Menstrual",
            CyclePhase::Follicular => "Follicular",
            CyclePhase::Ovulatory => "Ovulatory",
            CyclePhase::Luteal => "Luteal",
            CyclePhase::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CycleProfile
// ---------------------------------------------------------------------------

/// Cycle parameters. Fields are private so every instance satisfies the range
/// invariants; edits replace the whole profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCycleProfile", into = "RawCycleProfile")]
pub struct CycleProfile {
    last_period_start: NaiveDate,
    cycle_length: u32,
    period_length: u32,
}

impl CycleProfile {
    /// Validating constructor. Rejects lengths outside the accepted ranges.
    pub fn new(last_period_start: NaiveDate, cycle_length: u32, period_length: u32) -> crate::Result<Self> {
        let (cmin, cmax) = CYCLE_LENGTH_RANGE;
        let (pmin, pmax) = PERIOD_LENGTH_RANGE;
        if !(cmin..=cmax).contains(&cycle_length) {
            return Err(Error::validation(format!(
                "cycle length {} outside {}..={} days",
                cycle_length, cmin, cmax
            )));
        }
        if !(pmin..=pmax).contains(&period_length) {
            return Err(Error::validation(format!(
                "period length {} outside {}..={} days",
                period_length, pmin, pmax
            )));
        }
        if period_length >= cycle_length {
            return Err(Error::validation("period length must be shorter than the cycle"));
        }
        Ok(Self {
            last_period_start,
            cycle_length,
            period_length,
        })
    }

    /// Clamping constructor, mirroring the stepper inputs of the setup form.
    pub fn clamped(last_period_start: NaiveDate, cycle_length: u32, period_length: u32) -> Self {
        Self {
            last_period_start,
            cycle_length: cycle_length.clamp(CYCLE_LENGTH_RANGE.0, CYCLE_LENGTH_RANGE.1),
            period_length: period_length.clamp(PERIOD_LENGTH_RANGE.0, PERIOD_LENGTH_RANGE.1),
        }
    }

    pub fn last_period_start(&self) -> NaiveDate {
        self.last_period_start
    }

    pub fn cycle_length(&self) -> u32 {
        self.cycle_length
    }

    pub fn period_length(&self) -> u32 {
        self.period_length
    }
}

/// On-disk shape of a profile. `lastPeriodStart` may be a plain date or a full
/// timestamp.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCycleProfile {
    last_period_start: String,
    cycle_length: u32,
    period_length: u32,
}

impl TryFrom<RawCycleProfile> for CycleProfile {
    type Error = Error;

    fn try_from(raw: RawCycleProfile) -> Result<Self, Self::Error> {
        let start = parse_date(&raw.last_period_start).ok_or_else(|| {
            Error::validation(format!("invalid lastPeriodStart: {}", raw.last_period_start))
        })?;
        CycleProfile::new(start, raw.cycle_length, raw.period_length)
    }
}

impl From<CycleProfile> for RawCycleProfile {
    fn from(p: CycleProfile) -> Self {
        Self {
            last_period_start: date_key(p.last_period_start),
            cycle_length: p.cycle_length,
            period_length: p.period_length,
        }
    }
}

// ---------------------------------------------------------------------------
// Logs and calendar cells
// ---------------------------------------------------------------------------

/// Symptom names keyed by ISO date.
pub type SymptomLog = BTreeMap<String, Vec<String>>;

/// Mood keyed by ISO date.
pub type MoodLog = BTreeMap<String, Mood>;

/// One cell of a rendered month grid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayCell {
    pub date: NaiveDate,
    pub in_current_month: bool,
    pub is_today: bool,
    pub is_period_day: bool,
    pub is_fertile_day: bool,
    pub is_ovulation_day: bool,
    pub phase: CyclePhase,
    pub logged_symptoms: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logged_mood: Option<Mood>,
}

// ---------------------------------------------------------------------------
// Transcript
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptSource {
    User,
    Model,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub source: TranscriptSource,
    pub text: String,
}

impl TranscriptEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            source: TranscriptSource::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            source: TranscriptSource::Model,
            text: text.into(),
        }
    }
}

/// Tool declaration registered with a remote model
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Proxy configuration
// ---------------------------------------------------------------------------

/// TTS proxy configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub port: u16,
    pub bind: BindMode,
    pub allowed_origins: Vec<String>,
    pub default_voice: String,
    pub default_format: String,
    /// Directory of prebuilt frontend files served for unmatched routes.
    pub static_dir: Option<PathBuf>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: 5178,
            bind: BindMode::default(),
            allowed_origins: vec!["http://localhost:5173".to_string()],
            default_voice: "alloy".to_string(),
            default_format: "wav".to_string(),
            static_dir: None,
        }
    }
}

/// Bind mode for the proxy
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BindMode {
    Loopback,
    #[default]
    Lan,
}

impl BindMode {
    pub fn to_addr(&self) -> &str {
        match self {
            BindMode::Loopback => "127.0.0.1",
            BindMode::Lan => "0.0.0.0",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "loopback" | "localhost" | "127.0.0.1" => BindMode::Loopback,
            _ => BindMode::Lan,
        }
    }
}
