use crate::infrastructure::error::InfraError;
use std::io::{self, Stdout, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};

const NOTIFY_SEND: &str = "notify-send";
const OSASCRIPT: &str = "osascript";

/// Where reminder notifications end up. Dispatch is fire-and-forget.
pub trait NotificationSink: Send + Sync {
    fn dispatch(&self, title: &str, body: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationPermission {
    Granted,
    Denied,
    Default,
}

impl NotificationPermission {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Denied => "denied",
            Self::Default => "default",
        }
    }
}

/// Host desktop-notification facility with a permission gate.
pub trait NotificationFacility: Send + Sync {
    fn permission(&self) -> NotificationPermission;
    fn request_permission(&self) -> NotificationPermission;
    fn show(&self, title: &str, body: &str, icon: Option<&str>) -> Result<(), InfraError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierProgram {
    NotifySend(PathBuf),
    Osascript(PathBuf),
}

impl NotifierProgram {
    /// Resolves an explicitly configured program, or the platform default on `PATH`.
    pub fn locate(explicit: Option<&str>) -> Option<Self> {
        match explicit {
            Some(program) => which::which(program)
                .ok()
                .map(|path| Self::classify(&path)),
            None => {
                let default = if cfg!(target_os = "macos") {
                    OSASCRIPT
                } else {
                    NOTIFY_SEND
                };
                which::which(default).ok().map(|path| Self::classify(&path))
            }
        }
    }

    fn classify(path: &Path) -> Self {
        let is_osascript = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .is_some_and(|stem| stem == OSASCRIPT);
        if is_osascript {
            Self::Osascript(path.to_path_buf())
        } else {
            Self::NotifySend(path.to_path_buf())
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::NotifySend(path) | Self::Osascript(path) => path,
        }
    }

    pub fn arguments(&self, title: &str, body: &str, icon: Option<&str>) -> Vec<String> {
        match self {
            Self::NotifySend(_) => {
                let mut arguments = Vec::new();
                if let Some(icon) = icon {
                    arguments.push(format!("--icon={icon}"));
                }
                arguments.push(title.to_string());
                arguments.push(body.to_string());
                arguments
            }
            Self::Osascript(_) => vec![
                "-e".to_string(),
                format!(
                    "display notification \"{}\" with title \"{}\"",
                    escape_applescript(body),
                    escape_applescript(title)
                ),
            ],
        }
    }
}

fn escape_applescript(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Desktop notifications through `notify-send` or `osascript`.
///
/// Permission starts out `Default` and is settled by `request_permission`:
/// granted when a notifier program can be found, denied otherwise or when
/// native notifications are disabled.
#[derive(Debug)]
pub struct CommandNotificationFacility {
    enabled: bool,
    explicit_program: Option<String>,
    permission: Mutex<NotificationPermission>,
    program: Mutex<Option<NotifierProgram>>,
}

impl CommandNotificationFacility {
    pub fn new(enabled: bool, explicit_program: Option<String>) -> Self {
        let permission = if enabled {
            NotificationPermission::Default
        } else {
            NotificationPermission::Denied
        };
        Self {
            enabled,
            explicit_program,
            permission: Mutex::new(permission),
            program: Mutex::new(None),
        }
    }

    pub fn program(&self) -> Option<NotifierProgram> {
        self.program.lock().ok().and_then(|guard| guard.clone())
    }
}

impl NotificationFacility for CommandNotificationFacility {
    fn permission(&self) -> NotificationPermission {
        self.permission
            .lock()
            .map(|guard| *guard)
            .unwrap_or(NotificationPermission::Denied)
    }

    fn request_permission(&self) -> NotificationPermission {
        let located = if self.enabled {
            NotifierProgram::locate(self.explicit_program.as_deref())
        } else {
            None
        };
        let permission = if located.is_some() {
            NotificationPermission::Granted
        } else {
            NotificationPermission::Denied
        };

        if let Ok(mut guard) = self.program.lock() {
            *guard = located;
        }
        if let Ok(mut guard) = self.permission.lock() {
            *guard = permission;
        }
        permission
    }

    fn show(&self, title: &str, body: &str, icon: Option<&str>) -> Result<(), InfraError> {
        if self.permission() != NotificationPermission::Granted {
            return Err(InfraError::Notification(
                "desktop notifications are not permitted".to_string(),
            ));
        }
        let program = self.program().ok_or_else(|| {
            InfraError::Notification("no notifier program available".to_string())
        })?;

        let mut child = Command::new(program.path())
            .args(program.arguments(title, body, icon))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|error| {
                InfraError::Notification(format!(
                    "failed to spawn {}: {error}",
                    program.path().display()
                ))
            })?;

        // Reap the notifier without making the caller wait on delivery.
        std::thread::spawn(move || {
            let _ = child.wait();
        });
        Ok(())
    }
}

/// Writes `"{title}\n{body}"` to the terminal and flushes before returning.
#[derive(Debug)]
pub struct BlockingAlertSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl BlockingAlertSink<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> BlockingAlertSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn show(&self, title: &str, body: &str) -> Result<(), InfraError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|error| InfraError::StateLock(format!("alert writer lock poisoned: {error}")))?;
        writeln!(writer, "{title}\n{body}")?;
        writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W, InfraError> {
        self.writer
            .into_inner()
            .map_err(|error| InfraError::StateLock(format!("alert writer lock poisoned: {error}")))
    }
}

impl<W: Write + Send> NotificationSink for BlockingAlertSink<W> {
    fn dispatch(&self, title: &str, body: &str) {
        let _ = self.show(title, body);
    }
}

/// Shows reminders through the host facility, falling back to `fallback`
/// for any single notification the facility fails to show.
pub struct NativeNotificationSink<F: NotificationFacility> {
    facility: Arc<F>,
    icon: Option<String>,
    fallback: Arc<dyn NotificationSink>,
}

impl<F: NotificationFacility> NativeNotificationSink<F> {
    pub fn new(facility: Arc<F>, icon: Option<String>, fallback: Arc<dyn NotificationSink>) -> Self {
        Self {
            facility,
            icon,
            fallback,
        }
    }
}

impl<F: NotificationFacility> NotificationSink for NativeNotificationSink<F> {
    fn dispatch(&self, title: &str, body: &str) {
        if self
            .facility
            .show(title, body, self.icon.as_deref())
            .is_err()
        {
            self.fallback.dispatch(title, body);
        }
    }
}

pub struct SinkSelection {
    pub sink: Arc<dyn NotificationSink>,
    pub permission: NotificationPermission,
    pub native: bool,
}

/// Picks the sink once at startup, asking for permission only while it is
/// still undetermined.
pub fn select_notification_sink<F>(
    facility: Arc<F>,
    icon: Option<String>,
    fallback: Arc<dyn NotificationSink>,
) -> SinkSelection
where
    F: NotificationFacility + 'static,
{
    let permission = match facility.permission() {
        NotificationPermission::Default => facility.request_permission(),
        settled => settled,
    };

    if permission == NotificationPermission::Granted {
        SinkSelection {
            sink: Arc::new(NativeNotificationSink::new(facility, icon, fallback)),
            permission,
            native: true,
        }
    } else {
        SinkSelection {
            sink: fallback,
            permission,
            native: false,
        }
    }
}
