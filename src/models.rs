use crate::errors::HabitError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

const LOCAL_ID_PREFIX: &str = "local-";

/// Opaque habit identifier.
///
/// Ids minted by this process carry the `local-` prefix until the record
/// store acknowledges the habit and hands back its own id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HabitId(String);

impl HabitId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn local(millis: i64, seq: u64) -> Self {
        Self(format!("{LOCAL_ID_PREFIX}{millis:x}-{seq}"))
    }

    pub fn is_local(&self) -> bool {
        self.0.starts_with(LOCAL_ID_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HabitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: HabitId,
    pub name: String,
    #[serde(default)]
    pub completed_dates: Vec<NaiveDate>,
}

impl Habit {
    pub fn new(id: HabitId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            completed_dates: Vec::new(),
        }
    }

    pub fn is_completed_on(&self, day: NaiveDate) -> bool {
        self.completed_dates.contains(&day)
    }

    /// Flips the marker for `day` and reports whether it is now present.
    pub fn toggle(&mut self, day: NaiveDate) -> bool {
        if let Some(pos) = self.completed_dates.iter().position(|d| *d == day) {
            self.completed_dates.remove(pos);
            false
        } else {
            self.completed_dates.push(day);
            true
        }
    }

    /// Drops repeated markers, keeping the first occurrence of each day.
    pub fn dedup_dates(&mut self) {
        let mut seen = HashSet::new();
        self.completed_dates.retain(|day| seen.insert(*day));
    }
}

/// Trims a user supplied habit name, rejecting blank input.
pub fn normalize_name(name: &str) -> Result<String, HabitError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(HabitError::invalid_input("habit name must not be blank"));
    }
    Ok(trimmed.to_string())
}

/// Reduces a date or timestamp string to its calendar day.
///
/// Accepts `YYYY-MM-DD`, a naive `YYYY-MM-DDTHH:MM:SS[.fff]` timestamp or an
/// RFC 3339 timestamp. The day is taken as written, the offset is not applied.
pub fn normalize_day(value: &str) -> Result<NaiveDate, HabitError> {
    let value = value.trim();
    if let Ok(day) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(day);
    }
    if let Ok(stamp) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(stamp.date());
    }
    if let Ok(stamp) = DateTime::parse_from_rfc3339(value) {
        return Ok(stamp.date_naive());
    }
    Err(HabitError::invalid_input(format!(
        "'{value}' is not a calendar date (expected YYYY-MM-DD)"
    )))
}

#[derive(Debug, Deserialize)]
pub struct CreateHabitRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameHabitRequest {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ToggleRequest {
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnchorQuery {
    #[serde(default)]
    pub today: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CalendarQuery {
    #[serde(default)]
    pub month: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub habit_count: usize,
    pub pushed: usize,
    pub failed: usize,
}
