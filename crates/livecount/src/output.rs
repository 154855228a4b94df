//! Output formatting: plain status lines or JSON lines.

use std::io::{self, IsTerminal, Write};

use chrono::{DateTime, Local, SecondsFormat};
use owo_colors::OwoColorize;
use serde::Serialize;

use livecount_core::ObservedState;

use crate::cli::{ColorMode, OutputFormat};

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// JSON shape of one observed state.
#[derive(Debug, Serialize)]
struct StateLine<'a> {
    timestamp: String,
    active_visitors: u64,
    is_loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resource: Option<&'a str>,
}

/// Render one observed state in the chosen format.
pub fn render_state(
    format: OutputFormat,
    state: &ObservedState,
    resource: Option<&str>,
    at: DateTime<Local>,
    color: bool,
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => serde_json::to_string(&StateLine {
            timestamp: at.to_rfc3339_opts(SecondsFormat::Secs, true),
            active_visitors: state.active_visitors,
            is_loading: state.is_loading,
            error: state.error.as_ref().map(ToString::to_string),
            resource,
        }),
        OutputFormat::Plain => Ok(render_plain(state, resource, at, color)),
    }
}

fn render_plain(
    state: &ObservedState,
    resource: Option<&str>,
    at: DateTime<Local>,
    color: bool,
) -> String {
    let time = at.format("%H:%M:%S").to_string();
    let scope = resource.map(|r| format!(" on {r}")).unwrap_or_default();

    let mut line = if state.is_loading {
        let text = "loading…";
        if color {
            format!("{time}  {}", text.dimmed())
        } else {
            format!("{time}  {text}")
        }
    } else {
        let noun = if state.active_visitors == 1 {
            "visitor"
        } else {
            "visitors"
        };
        let count = state.active_visitors.to_string();
        if color {
            format!("{time}  {} active {noun}{scope}", count.green().bold())
        } else {
            format!("{time}  {count} active {noun}{scope}")
        }
    };

    if let Some(ref err) = state.error {
        let note = format!("(refresh failed: {err})");
        if color {
            line.push_str(&format!("  {}", note.yellow()));
        } else {
            line.push_str("  ");
            line.push_str(&note);
        }
    }

    line
}

/// Print a rendered line to stdout, respecting quiet mode.
pub fn print_line(line: &str, quiet: bool) -> io::Result<()> {
    write_line(&mut io::stdout().lock(), line, quiet)
}

fn write_line(out: &mut impl Write, line: &str, quiet: bool) -> io::Result<()> {
    if quiet || line.is_empty() {
        return Ok(());
    }
    writeln!(out, "{line}")?;
    out.flush()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;
    use livecount_core::CoreError;

    use super::*;

    fn at() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2026, 10, 19, 14, 5, 9)
            .single()
            .unwrap()
    }

    fn state(active_visitors: u64, is_loading: bool) -> ObservedState {
        ObservedState {
            active_visitors,
            is_loading,
            error: None,
        }
    }

    #[test]
    fn plain_line_shows_count() {
        let line = render_state(OutputFormat::Plain, &state(42, false), None, at(), false).unwrap();
        assert_eq!(line, "14:05:09  42 active visitors");
    }

    #[test]
    fn plain_line_singular_and_scoped() {
        let line =
            render_state(OutputFormat::Plain, &state(1, false), Some("post-1"), at(), false)
                .unwrap();
        assert_eq!(line, "14:05:09  1 active visitor on post-1");
    }

    #[test]
    fn plain_line_shows_loading() {
        let line = render_state(OutputFormat::Plain, &state(0, true), None, at(), false).unwrap();
        assert_eq!(line, "14:05:09  loading…");
    }

    #[test]
    fn plain_line_appends_error_after_retained_count() {
        let observed = ObservedState {
            error: Some(Arc::new(CoreError::Timeout)),
            ..state(7, false)
        };
        let line = render_state(OutputFormat::Plain, &observed, None, at(), false).unwrap();
        assert_eq!(
            line,
            "14:05:09  7 active visitors  (refresh failed: Analytics query timed out)"
        );
    }

    #[test]
    fn json_line_omits_absent_fields() {
        let line = render_state(OutputFormat::Json, &state(3, false), None, at(), false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["active_visitors"], 3);
        assert_eq!(value["is_loading"], false);
        assert!(value.get("error").is_none());
        assert!(value.get("resource").is_none());
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_errors_reach_the_caller() {
        let err = write_line(&mut ClosedPipe, "1 active visitor", false).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn quiet_mode_writes_nothing() {
        let mut buf = Vec::new();
        write_line(&mut buf, "1 active visitor", true).unwrap();
        write_line(&mut ClosedPipe, "1 active visitor", true).unwrap();
        assert!(buf.is_empty());
    }
}
