//! User-facing notifications.
//!
//! Orchestration code reports to a `Notifier` instead of touching any
//! display directly. `Alerts` is the terminal implementation: it prints
//! each alert and keeps it visible for `ALERT_TTL`.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// How long an alert stays visible before it is dismissed.
pub const ALERT_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

impl Level {
    pub fn label(&self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Success => "success",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }
}

/// Capability for showing transient messages to the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, level: Level);
}

#[derive(Debug, Clone)]
pub struct Alert {
    pub message: String,
    pub level: Level,
    shown_at: Instant,
}

/// Transient alert board that echoes alerts to stderr.
///
/// Expired alerts are hidden by `visible()` and pruned on the next `notify()`.
pub struct Alerts {
    entries: Mutex<Vec<Alert>>,
    ttl: Duration,
    echo: bool,
}

impl Alerts {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            ttl: ALERT_TTL,
            echo: true,
        }
    }

    /// Alert board that records only, without printing. Used in tests.
    pub fn silent(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            ttl,
            echo: false,
        }
    }

    /// Alerts still within their display window, oldest first.
    pub fn visible(&self) -> Vec<Alert> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .iter()
            .filter(|a| a.shown_at.elapsed() < self.ttl)
            .cloned()
            .collect()
    }
}

impl Default for Alerts {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for Alerts {
    fn notify(&self, message: &str, level: Level) {
        if self.echo {
            eprintln!("[{}] {}", level.label(), message);
        }
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|a| a.shown_at.elapsed() < self.ttl);
        entries.push(Alert {
            message: message.to_string(),
            level,
            shown_at: Instant::now(),
        });
    }
}
