use crate::domain::models::{NotificationKey, Task, TriggerKind};
use chrono::{Duration, NaiveDateTime, NaiveTime};
use std::collections::HashSet;

/// Period of the reminder check. Both trigger windows are exactly this wide,
/// so an uninterrupted ticker observes each window in exactly one tick.
pub const CHECK_INTERVAL_SECONDS: i64 = 60;
pub const MORNING_REMINDER_HOUR: u32 = 9;
pub const ONE_HOUR_MILLIS: i64 = 60 * 60 * 1000;

const WINDOW_MILLIS: i64 = CHECK_INTERVAL_SECONDS * 1000;

pub type FiredSet = HashSet<NotificationKey>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderNotification {
    pub key: NotificationKey,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReminderEvaluation {
    pub notifications: Vec<ReminderNotification>,
    pub fired: FiredSet,
}

pub fn morning_reminder_at(reminder: NaiveDateTime) -> NaiveDateTime {
    let nine_am =
        NaiveTime::from_hms_opt(MORNING_REMINDER_HOUR, 0, 0).expect("valid fixed time");
    reminder.date().and_time(nine_am)
}

/// `now` lies in `[09:00, 09:01)` on the reminder's calendar day.
pub fn morning_trigger_due(reminder: NaiveDateTime, now: NaiveDateTime) -> bool {
    let morning = morning_reminder_at(reminder);
    now >= morning && now < morning + Duration::milliseconds(WINDOW_MILLIS)
}

/// The time left until `reminder` is in `(59 min, 60 min]`, i.e. `now` lies
/// in `[R - 3600s, R - 3540s)`.
pub fn one_hour_trigger_due(reminder: NaiveDateTime, now: NaiveDateTime) -> bool {
    let remaining = (reminder - now).num_milliseconds();
    remaining > 0 && remaining <= ONE_HOUR_MILLIS && remaining > ONE_HOUR_MILLIS - WINDOW_MILLIS
}

/// One scheduler tick over `tasks`, without side effects.
///
/// The returned fired-set is a new set built from `fired` plus every key
/// notified in this tick; `fired` itself is left untouched. A task can yield
/// both notifications in one tick since the two triggers use distinct keys.
pub fn evaluate_reminders(
    tasks: &[Task],
    fired: &FiredSet,
    now: NaiveDateTime,
) -> ReminderEvaluation {
    let mut next_fired = fired.clone();
    let mut notifications = Vec::new();

    for task in tasks {
        let Some(reminder) = task.active_reminder() else {
            continue;
        };

        let morning_key = NotificationKey::new(task.id, TriggerKind::Morning);
        if morning_trigger_due(reminder, now) && !next_fired.contains(&morning_key) {
            notifications.push(ReminderNotification {
                key: morning_key,
                title: format!("Morning Reminder: {}", task.text),
                body: format!("Task scheduled for {}", format_scheduled_at(reminder)),
            });
            next_fired.insert(morning_key);
        }

        let one_hour_key = NotificationKey::new(task.id, TriggerKind::OneHour);
        if one_hour_trigger_due(reminder, now) && !next_fired.contains(&one_hour_key) {
            notifications.push(ReminderNotification {
                key: one_hour_key,
                title: format!("1 Hour Reminder: {}", task.text),
                body: format!("Task due at {}", format_due_time(reminder)),
            });
            next_fired.insert(one_hour_key);
        }
    }

    ReminderEvaluation {
        notifications,
        fired: next_fired,
    }
}

fn format_scheduled_at(reminder: NaiveDateTime) -> String {
    reminder.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

fn format_due_time(reminder: NaiveDateTime) -> String {
    reminder.format("%-I:%M:%S %p").to_string()
}
