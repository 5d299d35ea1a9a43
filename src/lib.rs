pub mod application;
pub mod domain;
pub mod infrastructure;

use application::commands::AppState;
use application::console::run_console;
use application::scheduler::{CHECK_INTERVAL, ReminderScheduler, ReminderTicker};
use infrastructure::error::InfraError;
use infrastructure::notification::{
    BlockingAlertSink, CommandNotificationFacility, NotificationSink, select_notification_sink,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub workspace_root: PathBuf,
    pub native_notifications: bool,
}

/// Runs the console until `quit` or end of input, with the reminder check
/// ticking in the background for the whole session.
pub async fn run(options: RunOptions) -> Result<(), InfraError> {
    let state = Arc::new(AppState::new(options.workspace_root)?);
    let notification_config = state.config().notifications.clone();

    let facility = Arc::new(CommandNotificationFacility::new(
        options.native_notifications && notification_config.native_enabled,
        notification_config.program.clone(),
    ));
    let fallback: Arc<dyn NotificationSink> = Arc::new(BlockingAlertSink::stdout());
    let selection = select_notification_sink(
        Arc::clone(&facility),
        notification_config.icon.clone(),
        fallback,
    );
    let program = facility
        .program()
        .map(|program| program.path().display().to_string())
        .unwrap_or_else(|| "none".to_string());
    state.log_info(
        "startup",
        &format!(
            "workspace={} permission={} native={} program={program}",
            state.workspace_root().display(),
            selection.permission.as_str(),
            selection.native
        ),
    );

    let scheduler = ReminderScheduler::new(selection.sink);
    let ticker = ReminderTicker::spawn(Arc::clone(&state), scheduler, CHECK_INTERVAL);

    let mut stdout = std::io::stdout();
    let result = run_console(&state, BufReader::new(tokio::io::stdin()), &mut stdout).await;

    ticker.shutdown();
    state.log_info("shutdown", "reminder ticker stopped");
    result
}
