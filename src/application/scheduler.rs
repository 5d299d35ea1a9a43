use crate::application::commands::{AppState, check_reminders_impl};
use crate::domain::reminders::CHECK_INTERVAL_SECONDS;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::notification::NotificationSink;
use chrono::{Local, NaiveDateTime};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior, interval};

pub type NowProvider = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

pub const CHECK_INTERVAL: Duration = Duration::from_secs(CHECK_INTERVAL_SECONDS as u64);

pub struct ReminderScheduler {
    sink: Arc<dyn NotificationSink>,
    now_provider: NowProvider,
}

impl ReminderScheduler {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            sink,
            now_provider: Arc::new(|| Local::now().naive_local()),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    /// Runs one reminder check against the state as it is right now and
    /// dispatches whatever became due. Returns the number dispatched.
    pub fn tick(&self, state: &AppState) -> Result<usize, InfraError> {
        let now = (self.now_provider)();
        let notifications = check_reminders_impl(state, now)?;
        for notification in &notifications {
            self.sink.dispatch(&notification.title, &notification.body);
        }
        Ok(notifications.len())
    }
}

/// Owns the recurring reminder check. The first check runs immediately; the
/// task is aborted on `shutdown` or when the ticker is dropped.
pub struct ReminderTicker {
    handle: JoinHandle<()>,
}

impl ReminderTicker {
    pub fn spawn(state: Arc<AppState>, scheduler: ReminderScheduler, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticks = interval(period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticks.tick().await;
                if let Err(error) = scheduler.tick(&state) {
                    state.log_error("check_reminders", &error.to_string());
                }
            }
        });
        Self { handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn shutdown(self) {
        self.handle.abort();
    }
}

impl Drop for ReminderTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::{add_task_impl, fired_keys_impl, toggle_task_impl};
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_WORKSPACE: AtomicUsize = AtomicUsize::new(0);

    struct TempWorkspace {
        path: PathBuf,
    }

    impl TempWorkspace {
        fn new() -> Self {
            let sequence = NEXT_TEMP_WORKSPACE.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "todo-reminders-scheduler-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&path).expect("create temp workspace");
            Self { path }
        }

        fn app_state(&self) -> Arc<AppState> {
            Arc::new(AppState::new(self.path.clone()).expect("initialize app state"))
        }
    }

    impl Drop for TempWorkspace {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    #[derive(Debug, Default)]
    struct RecordingSink {
        dispatched: Mutex<Vec<(String, String)>>,
    }

    impl RecordingSink {
        fn titles(&self) -> Vec<String> {
            self.dispatched
                .lock()
                .expect("recording lock")
                .iter()
                .map(|(title, _)| title.clone())
                .collect()
        }
    }

    impl NotificationSink for RecordingSink {
        fn dispatch(&self, title: &str, body: &str) {
            self.dispatched
                .lock()
                .expect("recording lock")
                .push((title.to_string(), body.to_string()));
        }
    }

    struct FakeClock {
        now: Arc<Mutex<NaiveDateTime>>,
    }

    impl FakeClock {
        fn at(value: &str) -> Self {
            let now = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
                .expect("valid datetime");
            Self {
                now: Arc::new(Mutex::new(now)),
            }
        }

        fn set(&self, value: &str) {
            *self.now.lock().expect("clock lock") =
                NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").expect("valid datetime");
        }

        fn provider(&self) -> NowProvider {
            let now = Arc::clone(&self.now);
            Arc::new(move || *now.lock().expect("clock lock"))
        }
    }

    fn add(state: &AppState, text: &str, date: &str, time: &str) -> u64 {
        add_task_impl(
            state,
            text.to_string(),
            Some(date.to_string()),
            Some(time.to_string()),
        )
        .expect("add task")
        .expect("task created")
        .id
    }

    #[test]
    fn tick_dispatches_due_notifications_once() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let sink = Arc::new(RecordingSink::default());
        let clock = FakeClock::at("2026-02-16T09:00:00");
        let scheduler = ReminderScheduler::new(sink.clone()).with_now_provider(clock.provider());

        add(&state, "Buy milk", "2026-02-16", "08:59:30");
        assert_eq!(scheduler.tick(&state).expect("tick"), 1);
        assert_eq!(scheduler.tick(&state).expect("tick"), 0);

        clock.set("2026-02-16T09:01:00");
        assert_eq!(scheduler.tick(&state).expect("tick"), 0);
        assert_eq!(sink.titles(), vec!["Morning Reminder: Buy milk"]);
        let dispatched = sink.dispatched.lock().expect("lock");
        assert_eq!(dispatched[0].1, "Task scheduled for 2/16/2026, 8:59:30 AM");
    }

    #[test]
    fn one_hour_reminder_is_not_repeated_after_completion() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let sink = Arc::new(RecordingSink::default());
        let clock = FakeClock::at("2026-02-16T13:00:00");
        let scheduler = ReminderScheduler::new(sink.clone()).with_now_provider(clock.provider());

        let id = add(&state, "Call mom", "2026-02-16", "13:59:30");
        clock.set("2026-02-16T13:00:20");
        assert_eq!(scheduler.tick(&state).expect("tick"), 1);

        toggle_task_impl(&state, id).expect("toggle");
        clock.set("2026-02-16T13:00:00");
        assert_eq!(scheduler.tick(&state).expect("tick"), 0);
        clock.set("2026-02-16T13:00:29");
        assert_eq!(scheduler.tick(&state).expect("tick"), 0);

        assert_eq!(sink.titles(), vec!["1 Hour Reminder: Call mom"]);
        assert_eq!(
            fired_keys_impl(&state).expect("keys"),
            vec![format!("{id}-1hour")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_checks_immediately_and_reads_current_state() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let sink = Arc::new(RecordingSink::default());
        let clock = FakeClock::at("2026-02-16T09:00:10");
        let scheduler = ReminderScheduler::new(sink.clone()).with_now_provider(clock.provider());

        add(&state, "Before start", "2026-02-16", "12:00");
        let ticker = ReminderTicker::spawn(Arc::clone(&state), scheduler, CHECK_INTERVAL);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(sink.titles(), vec!["Morning Reminder: Before start"]);

        add(&state, "After start", "2026-02-16", "18:00");
        tokio::time::sleep(CHECK_INTERVAL).await;
        assert_eq!(
            sink.titles(),
            vec![
                "Morning Reminder: Before start",
                "Morning Reminder: After start"
            ]
        );

        tokio::time::sleep(CHECK_INTERVAL * 3).await;
        assert_eq!(sink.titles().len(), 2);
        assert!(ticker.is_running());
        ticker.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_further_checks() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let sink = Arc::new(RecordingSink::default());
        let clock = FakeClock::at("2026-02-16T08:00:00");
        let scheduler = ReminderScheduler::new(sink.clone()).with_now_provider(clock.provider());

        add(&state, "Later", "2026-02-16", "12:00");
        let ticker = ReminderTicker::spawn(Arc::clone(&state), scheduler, CHECK_INTERVAL);
        tokio::time::sleep(Duration::from_secs(1)).await;
        ticker.shutdown();

        clock.set("2026-02-16T09:00:00");
        tokio::time::sleep(CHECK_INTERVAL * 2).await;
        assert!(sink.titles().is_empty());
    }
}
