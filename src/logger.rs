use std::fmt;

use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "BETTERDC_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Success,
    Warn,
    Fail,
    Fallback,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warn => "warn",
            Severity::Fail => "fail",
            Severity::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where components report what they did. `op` names the operation, the
/// way a call site would name itself.
pub trait LogSink: Send + Sync {
    fn emit(&self, op: &str, severity: Severity, detail: &str);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, op: &str, severity: Severity, detail: &str) {
        let status = severity.as_str();
        match severity {
            Severity::Info | Severity::Success => {
                tracing::info!(op, status, "{detail}")
            }
            Severity::Warn | Severity::Fallback => {
                tracing::warn!(op, status, "{detail}")
            }
            Severity::Fail => tracing::error!(op, status, "{detail}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub op: String,
    pub severity: Severity,
    pub detail: String,
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<LogEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.severity == severity)
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl LogSink for RecordingSink {
    fn emit(&self, op: &str, severity: Severity, detail: &str) {
        self.events.lock().push(LogEvent {
            op: op.to_string(),
            severity,
            detail: detail.to_string(),
        });
    }
}

/// Installs the stderr subscriber. Filter directives come from
/// `BETTERDC_LOG`, falling back to `warn`. Safe to call more than once.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
