// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Per-host timing reports and the final outcome in normal, quiet or JSON mode.

use crate::executor::OperationKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Human-friendly output with per-host timing
    #[default]
    Normal,
    /// Minimal output for CI (only the final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Timing and outcome of one host's operation.
#[derive(Debug, Clone, Serialize)]
pub struct HostReport {
    pub host: String,
    pub operation: OperationKind,
    pub subject: String,
    pub started_at: DateTime<Utc>,
    #[serde(rename = "elapsed_secs", serialize_with = "as_secs_f64")]
    pub elapsed: Duration,
    pub ok: bool,
}

fn as_secs_f64<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

impl HostReport {
    /// One-line human rendering.
    pub fn summary(&self) -> String {
        let preposition = match self.operation {
            OperationKind::Get => "from",
            OperationKind::Put => "to",
            OperationKind::Shell => "on",
        };
        let outcome = if self.ok { "took" } else { "failed after" };
        format!(
            "{} {} {} {} {} {:.2?}",
            self.operation, self.subject, preposition, self.host, outcome, self.elapsed
        )
    }

    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(&HostEvent {
            event: "host",
            report: self,
        })
    }
}

#[derive(Serialize)]
struct HostEvent<'a> {
    event: &'a str,
    #[serde(flatten)]
    report: &'a HostReport,
}

/// Handles CLI output based on the configured mode.
#[derive(Debug)]
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Default for Output {
    fn default() -> Self {
        Self::new(OutputMode::Normal)
    }
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing the whole invocation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Report one finished host (suppressed in quiet mode).
    pub fn host_report(&self, report: &HostReport) {
        match self.mode {
            OutputMode::Normal => eprintln!("{}", report.summary()),
            OutputMode::Quiet => {}
            OutputMode::Json => match report.to_json_line() {
                Ok(json) => eprintln!("{json}"),
                Err(e) => tracing::debug!("failed to encode host report: {}", e),
            },
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    eprintln!("{message} ({:.1}s)", elapsed);
                } else {
                    eprintln!("{message}");
                }
            }
            OutputMode::Quiet => {}
            OutputMode::Json => self.emit_event("success", message),
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => eprintln!("Error: {message}"),
            OutputMode::Json => self.emit_event("error", message),
        }
    }

    fn emit_event(&self, event: &str, message: &str) {
        let event = JsonEvent {
            event,
            message,
            duration_secs: self.start_time.map(|_| self.elapsed_secs()),
        };
        if let Ok(json) = serde_json::to_string(&event) {
            eprintln!("{json}");
        }
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(ok: bool) -> HostReport {
        HostReport {
            host: "web1:22".to_string(),
            operation: OperationKind::Get,
            subject: "/etc/hostname".to_string(),
            started_at: DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            elapsed: Duration::from_millis(1500),
            ok,
        }
    }

    #[test]
    fn summary_reads_naturally() {
        assert_eq!(
            report(true).summary(),
            "get /etc/hostname from web1:22 took 1.50s"
        );
        assert_eq!(
            report(false).summary(),
            "get /etc/hostname from web1:22 failed after 1.50s"
        );
    }

    #[test]
    fn json_line_carries_every_field() {
        let line = report(true).to_json_line().unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["event"], "host");
        assert_eq!(value["host"], "web1:22");
        assert_eq!(value["operation"], "get");
        assert_eq!(value["subject"], "/etc/hostname");
        assert_eq!(value["elapsed_secs"], 1.5);
        assert_eq!(value["ok"], true);
        assert_eq!(value["started_at"], "2026-03-01T12:00:00Z");
    }

    #[test]
    fn timer_starts_at_zero() {
        let output = Output::new(OutputMode::Quiet);
        assert_eq!(output.elapsed_secs(), 0.0);
        assert_eq!(output.mode(), OutputMode::Quiet);
    }
}
