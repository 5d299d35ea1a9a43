use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: u64,
    pub text: String,
    pub completed: bool,
    pub reminder_date_time: Option<NaiveDateTime>,
}

impl Task {
    pub fn validate(&self) -> Result<(), String> {
        if self.id == 0 {
            return Err("task.id must be > 0".to_string());
        }
        validate_non_empty(&self.text, "task.text")
    }

    /// The reminder the scheduler should consider; completed tasks never have one.
    pub fn active_reminder(&self) -> Option<NaiveDateTime> {
        if self.completed {
            return None;
        }
        self.reminder_date_time
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Morning,
    OneHour,
}

impl TriggerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::OneHour => "1hour",
        }
    }
}

/// Identifies one (task, trigger) pair in the fired-set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationKey {
    pub task_id: u64,
    pub kind: TriggerKind,
}

impl NotificationKey {
    pub fn new(task_id: u64, kind: TriggerKind) -> Self {
        Self { task_id, kind }
    }
}

impl fmt::Display for NotificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.task_id, self.kind.as_str())
    }
}

/// Combines the date and time inputs of the add form into one reminder.
///
/// Either part missing (or blank) means no reminder. Both present but
/// unparseable is reported as an error so the caller can log it.
pub fn combine_reminder(
    date: Option<&str>,
    time: Option<&str>,
) -> Result<Option<NaiveDateTime>, String> {
    let date = date.map(str::trim).filter(|value| !value.is_empty());
    let time = time.map(str::trim).filter(|value| !value.is_empty());
    let (Some(date), Some(time)) = (date, time) else {
        return Ok(None);
    };

    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| format!("reminder date '{date}' must be YYYY-MM-DD"))?;
    let time = parse_reminder_time(time)
        .ok_or_else(|| format!("reminder time '{time}' must be HH:MM"))?;
    Ok(Some(date.and_time(time)))
}

fn parse_reminder_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

/// Short label shown next to a task, e.g. `Oct 16, 9:00 AM`.
pub fn format_reminder_label(reminder: NaiveDateTime) -> String {
    reminder.format("%b %-d, %-I:%M %p").to_string()
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}
