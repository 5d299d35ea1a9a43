use crate::application::bootstrap::bootstrap_workspace;
use crate::domain::models::{Task, combine_reminder};
use crate::domain::reminders::{FiredSet, ReminderNotification, evaluate_reminders};
use crate::domain::task_store::TaskStore;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::error::InfraError;
use chrono::{NaiveDateTime, Utc};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const LOG_FILE: &str = "app.log";

pub struct AppState {
    workspace_root: PathBuf,
    config: AppConfig,
    logs_dir: PathBuf,
    runtime: Mutex<RuntimeState>,
    log_guard: Mutex<()>,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;

        Ok(Self {
            workspace_root: bootstrap.workspace_root,
            config: bootstrap.config,
            logs_dir: bootstrap.logs_dir,
            runtime: Mutex::new(RuntimeState::default()),
            log_guard: Mutex::new(()),
        })
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn log_path(&self) -> PathBuf {
        self.logs_dir.join(LOG_FILE)
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.append_log("info", command, message);
    }

    pub fn log_warn(&self, command: &str, message: &str) {
        self.append_log("warn", command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        self.append_log("error", command, message);
    }

    fn append_log(&self, level: &str, command: &str, message: &str) {
        let Ok(_guard) = self.log_guard.lock() else {
            return;
        };
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path())
        {
            let _ = writeln!(file, "{}", payload);
        }
    }
}

/// Everything the console and the reminder ticker share. The fired-set is
/// only ever replaced wholesale by `check_reminders_impl`.
#[derive(Debug, Default)]
struct RuntimeState {
    store: TaskStore,
    fired: FiredSet,
}

pub fn add_task_impl(
    state: &AppState,
    text: String,
    reminder_date: Option<String>,
    reminder_time: Option<String>,
) -> Result<Option<Task>, InfraError> {
    if text.trim().is_empty() {
        return Ok(None);
    }

    let reminder = match combine_reminder(reminder_date.as_deref(), reminder_time.as_deref()) {
        Ok(reminder) => reminder,
        Err(message) => {
            state.log_warn("add_task", &format!("ignoring reminder: {message}"));
            None
        }
    };

    let clock_millis = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
    let created = {
        let mut runtime = lock_runtime(state)?;
        runtime.store.add(&text, reminder, clock_millis)
    };

    if let Some(task) = &created {
        let reminder_label = task
            .reminder_date_time
            .map(|value| value.to_string())
            .unwrap_or_else(|| "none".to_string());
        state.log_info(
            "add_task",
            &format!("added task_id={} reminder={reminder_label}", task.id),
        );
    }
    Ok(created)
}

pub fn toggle_task_impl(state: &AppState, task_id: u64) -> Result<Option<Task>, InfraError> {
    let toggled = {
        let mut runtime = lock_runtime(state)?;
        runtime.store.toggle(task_id)
    };

    if let Some(task) = &toggled {
        state.log_info(
            "toggle_task",
            &format!("task_id={} completed={}", task.id, task.completed),
        );
    }
    Ok(toggled)
}

pub fn delete_task_impl(state: &AppState, task_id: u64) -> Result<bool, InfraError> {
    let removed = {
        let mut runtime = lock_runtime(state)?;
        runtime.store.delete(task_id)
    };
    let Some(removed) = removed else {
        return Ok(false);
    };

    state.log_info("delete_task", &format!("deleted task_id={}", removed.id));
    Ok(true)
}

pub fn list_tasks_impl(state: &AppState) -> Result<Vec<Task>, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(runtime.store.tasks().to_vec())
}

pub fn remaining_tasks_impl(state: &AppState) -> Result<usize, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(runtime.store.remaining())
}

/// Keys already notified, rendered as `{id}-morning` / `{id}-1hour` and sorted.
pub fn fired_keys_impl(state: &AppState) -> Result<Vec<String>, InfraError> {
    let runtime = lock_runtime(state)?;
    let mut keys = runtime.fired.iter().copied().collect::<Vec<_>>();
    keys.sort();
    Ok(keys.into_iter().map(|key| key.to_string()).collect())
}

/// Evaluates every reminder against `now` and swaps in the new fired-set.
///
/// Returns the notifications that became due in this check; dispatching them
/// is up to the caller, after the runtime lock has been released.
pub fn check_reminders_impl(
    state: &AppState,
    now: NaiveDateTime,
) -> Result<Vec<ReminderNotification>, InfraError> {
    let notifications = {
        let mut runtime = lock_runtime(state)?;
        let evaluation = evaluate_reminders(runtime.store.tasks(), &runtime.fired, now);
        runtime.fired = evaluation.fired;
        evaluation.notifications
    };

    for notification in &notifications {
        state.log_info(
            "check_reminders",
            &format!("fired {} at {now}", notification.key),
        );
    }
    Ok(notifications)
}

fn lock_runtime(state: &AppState) -> Result<MutexGuard<'_, RuntimeState>, InfraError> {
    state
        .runtime
        .lock()
        .map_err(|error| InfraError::StateLock(format!("runtime lock poisoned: {error}")))
}
