//! Formatting functions for command output.
//!
//! Pure functions returning strings; the commands do the printing.

use chrono::{DateTime, Duration, Utc};
use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;

use crate::sandbox::{ContainerSummary, ExecutionResult, Instance};

/// Status of the named container as shown by `swea status`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub(crate) struct StatusReport {
    pub name: String,
    pub image: String,
    pub exists: bool,
    pub running: bool,
    pub id: Option<String>,
    pub status: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub volume: String,
}

impl StatusReport {
    pub fn new(
        name: &str,
        image: &str,
        volume: String,
        summary: Option<&ContainerSummary>,
    ) -> Self {
        Self {
            name: name.to_string(),
            image: image.to_string(),
            exists: summary.is_some(),
            running: summary.is_some_and(|s| s.status.is_running()),
            id: summary.map(|s| s.id.chars().take(12).collect()),
            status: summary.map(|s| s.status.to_string()),
            started_at: summary
                .and_then(|s| s.started_at.as_deref())
                .and_then(parse_docker_time),
            volume,
        }
    }
}

/// Docker reports never-started containers with the zero time.
fn parse_docker_time(raw: &str) -> Option<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(raw).ok()?.with_timezone(&Utc);
    (parsed.timestamp() > 0).then_some(parsed)
}

/// Formats a duration for display (e.g., "2h 5m 30s").
pub(crate) fn format_duration(duration: &Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// Formats the line printed once the sandbox is ready.
pub(crate) fn format_ready(instance: &Instance) -> String {
    let how = if instance.reused {
        "reused".green()
    } else {
        "created".yellow()
    };
    format!(
        "{} Sandbox {} ({}) {}",
        "▶".cyan(),
        instance.name.cyan().bold(),
        instance.short_id().dimmed(),
        how
    )
}

/// Formats the outcome of a command or agent run.
pub(crate) fn format_result(result: &ExecutionResult, show_stdout: bool) -> String {
    let mut out = String::new();

    if show_stdout && !result.stdout().is_empty() {
        write!(&mut out, "{}", result.stdout()).unwrap();
        if !result.stdout().ends_with('\n') {
            out.push('\n');
        }
    }

    if !result.stderr().is_empty() {
        writeln!(&mut out, "{}", result.stderr().trim_end().red()).unwrap();
    }

    let code = result.exit_code().to_string();
    if result.success() {
        writeln!(&mut out, "{} exit code {}", "✅".green(), code.green()).unwrap();
    } else {
        writeln!(&mut out, "{} exit code {}", "❌".red(), code.red().bold()).unwrap();
    }

    out
}

/// Formats the status block.
pub(crate) fn format_status(report: &StatusReport, now: DateTime<Utc>) -> String {
    let mut out = String::new();

    writeln!(&mut out, "\n{}", "━".repeat(50).dimmed()).unwrap();
    writeln!(&mut out, "{}", "   📦 Sandbox Status".yellow().bold()).unwrap();
    writeln!(&mut out, "{}", "━".repeat(50).dimmed()).unwrap();

    writeln!(&mut out, "  Name:       {}", report.name.cyan()).unwrap();
    writeln!(&mut out, "  Image:      {}", report.image.cyan()).unwrap();
    writeln!(&mut out, "  Volume:     {}", report.volume.cyan()).unwrap();

    match (&report.id, &report.status) {
        (Some(id), Some(status)) => {
            let status = if report.running {
                status.green().bold()
            } else {
                status.red()
            };
            writeln!(&mut out, "  Container:  {}", id.cyan()).unwrap();
            writeln!(&mut out, "  Status:     {status}").unwrap();
        }
        _ => {
            writeln!(&mut out, "  Status:     {}", "absent".red()).unwrap();
        }
    }

    if let Some(started) = report.started_at {
        writeln!(
            &mut out,
            "  Started:    {}",
            started.format("%Y-%m-%d %H:%M:%S UTC").to_string().cyan()
        )
        .unwrap();
        if report.running {
            let uptime = now.signed_duration_since(started);
            writeln!(&mut out, "  Uptime:     {}", format_duration(&uptime).cyan()).unwrap();
        }
    }

    writeln!(&mut out, "{}", "━".repeat(50).dimmed()).unwrap();

    if !report.exists {
        writeln!(
            &mut out,
            "  Run {} to create it.",
            "swea run \"<prompt>\"".green()
        )
        .unwrap();
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::ContainerStatus;
    use regex::Regex;

    fn strip_ansi_codes(s: &str) -> String {
        let ansi = Regex::new(r"\x1b\[[0-9;]*m").unwrap();
        ansi.replace_all(s, "").into_owned()
    }

    fn summary(status: ContainerStatus, started_at: Option<&str>) -> ContainerSummary {
        ContainerSummary {
            id: "0123456789abcdef0123".to_string(),
            status,
            started_at: started_at.map(String::from),
        }
    }

    fn instance(reused: bool) -> Instance {
        Instance {
            id: "0123456789abcdef".to_string(),
            name: "swea".to_string(),
            image: "ubuntu:24.04".to_string(),
            working_dir: "/root".to_string(),
            reused,
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(&Duration::seconds(45)), "45s");
        assert_eq!(format_duration(&Duration::seconds(125)), "2m 5s");
        assert_eq!(format_duration(&Duration::seconds(7530)), "2h 5m 30s");
        assert_eq!(format_duration(&Duration::seconds(-3)), "0s");
    }

    #[test]
    fn test_format_ready() {
        let fresh = strip_ansi_codes(&format_ready(&instance(false)));
        assert!(fresh.contains("Sandbox swea (0123456789ab) created"));

        let reused = strip_ansi_codes(&format_ready(&instance(true)));
        assert!(reused.ends_with("reused"));
    }

    #[test]
    fn test_format_result_success() {
        let result = ExecutionResult::success_with("hello world");
        let out = strip_ansi_codes(&format_result(&result, true));
        assert_eq!(out, "hello world\n✅ exit code 0\n");
    }

    #[test]
    fn test_format_result_hides_streamed_output() {
        let result = ExecutionResult::new(1, "already tailed", "Codex agent stuck.");
        let out = strip_ansi_codes(&format_result(&result, false));
        assert!(!out.contains("already tailed"));
        assert!(out.contains("Codex agent stuck."));
        assert!(out.contains("❌ exit code 1"));
    }

    #[test]
    fn test_status_report_running() {
        let summary = summary(ContainerStatus::Running, Some("2026-01-02T03:04:05.123456789Z"));
        let report = StatusReport::new("swea", "ubuntu:24.04", "swea-data".into(), Some(&summary));

        assert!(report.exists);
        assert!(report.running);
        assert_eq!(report.id.as_deref(), Some("0123456789ab"));
        assert_eq!(report.status.as_deref(), Some("running"));
        assert_eq!(
            report.started_at.map(|t| t.to_rfc3339()),
            Some("2026-01-02T03:04:05.123456789+00:00".to_string())
        );
    }

    #[test]
    fn test_status_report_ignores_zero_time() {
        let summary = summary(ContainerStatus::Created, Some("0001-01-01T00:00:00Z"));
        let report = StatusReport::new("swea", "ubuntu:24.04", "swea-data".into(), Some(&summary));
        assert!(!report.running);
        assert_eq!(report.started_at, None);
    }

    #[test]
    fn test_format_status_running() {
        let summary = summary(ContainerStatus::Running, Some("2026-01-02T03:00:00Z"));
        let report = StatusReport::new("swea", "ubuntu:24.04", "swea-data".into(), Some(&summary));
        let now = DateTime::parse_from_rfc3339("2026-01-02T04:05:30Z")
            .unwrap()
            .with_timezone(&Utc);

        let out = strip_ansi_codes(&format_status(&report, now));
        assert!(out.contains("Name:       swea"));
        assert!(out.contains("Container:  0123456789ab"));
        assert!(out.contains("Status:     running"));
        assert!(out.contains("Started:    2026-01-02 03:00:00 UTC"));
        assert!(out.contains("Uptime:     1h 5m 30s"));
        assert!(!out.contains("to create it"));
    }

    #[test]
    fn test_format_status_absent() {
        let report = StatusReport::new("swea", "ubuntu:24.04", "swea-data".into(), None);
        let out = strip_ansi_codes(&format_status(&report, Utc::now()));
        assert!(out.contains("Status:     absent"));
        assert!(out.contains("Volume:     swea-data"));
        assert!(out.contains("to create it"));
        assert!(!out.contains("Uptime"));
    }

    #[test]
    fn test_status_report_json() {
        let report = StatusReport::new("swea", "ubuntu:24.04", "swea-data".into(), None);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["name"], "swea");
        assert_eq!(json["exists"], false);
        assert!(json["id"].is_null());
    }
}
