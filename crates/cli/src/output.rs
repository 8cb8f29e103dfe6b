// Output format auto-detection for the CLI.
//
// TTY → human-readable text. Piped/redirected → structured JSON.
// `--json` flag forces JSON output regardless of terminal.

use crate::exit_code::ExitCode;

use serde::Serialize;
use std::io::{self, IsTerminal, Write};

const ANSI_RED: &str = "\x1b[31m";
const ANSI_YELLOW: &str = "\x1b[33m";
const ANSI_RESET: &str = "\x1b[0m";

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text (tables, colors, etc.).
    Human,
    /// Machine-readable JSON (one object per response).
    Json,
}

impl OutputFormat {
    /// Auto-detect format: JSON if `--json` was passed or stdout is not a TTY.
    pub fn detect(json_flag: bool) -> Self {
        if json_flag {
            return Self::Json;
        }
        Self::detect_from_terminal(io::stdout().is_terminal())
    }

    /// Testable variant that takes an explicit `is_tty` flag.
    pub fn detect_from_terminal(is_tty: bool) -> Self {
        if is_tty {
            Self::Human
        } else {
            Self::Json
        }
    }
}

/// Write a value to stdout in the selected format.
///
/// - `Human`: calls `human_fn` to produce a human-readable string.
/// - `Json`: serializes `value` as JSON.
pub fn print_output<T, F>(format: OutputFormat, value: &T, human_fn: F) -> io::Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    let mut out = io::stdout().lock();
    match format {
        OutputFormat::Human => {
            writeln!(out, "{}", human_fn(value))
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut out, value).map_err(io::Error::other)?;
            writeln!(out)
        }
    }
}

/// Write a value to a provided writer (useful for testing).
pub fn write_output<W, T, F>(
    writer: &mut W,
    format: OutputFormat,
    value: &T,
    human_fn: F,
) -> io::Result<()>
where
    W: Write,
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Human => {
            writeln!(writer, "{}", human_fn(value))
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *writer, value).map_err(io::Error::other)?;
            writeln!(writer)
        }
    }
}

/// Write an error to stderr in the selected format.
pub fn print_error(format: OutputFormat, code: &str, message: &str) {
    let mut err = io::stderr().lock();
    match format {
        OutputFormat::Human => {
            let line =
                render_human_stderr_line("error", message, io::stderr().is_terminal(), ANSI_RED);
            let _ = writeln!(err, "{line}");
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({
                "error": {
                    "code": code,
                    "message": message,
                }
            });
            let _ = serde_json::to_writer(&mut err, &obj);
            let _ = writeln!(err);
        }
    }
}

/// Write a warning to stderr in the selected format.
pub fn print_warning(format: OutputFormat, code: &str, message: &str) {
    let mut err = io::stderr().lock();
    match format {
        OutputFormat::Human => {
            let line = render_human_stderr_line(
                "warning",
                message,
                io::stderr().is_terminal(),
                ANSI_YELLOW,
            );
            let _ = writeln!(err, "{line}");
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({
                "warning": {
                    "code": code,
                    "message": message,
                }
            });
            let _ = serde_json::to_writer(&mut err, &obj);
            let _ = writeln!(err);
        }
    }
}

/// Print a mapped, actionable error for a command failure.
pub fn print_anyhow_error(format: OutputFormat, error: &anyhow::Error) {
    let (code, message) = actionable_error(error);
    print_error(format, code, &message);
}

fn actionable_error(error: &anyhow::Error) -> (&'static str, String) {
    let message = format!("{error:#}");

    match ExitCode::from_error(error) {
        ExitCode::NotFound => {
            let name = extract_quoted_path(&message).unwrap_or_else(|| "<path>".to_string());
            ("NOT_FOUND", format!("{name} does not exist. Check the path and try again."))
        }
        ExitCode::Denied => (
            "PERMISSION_DENIED",
            format!("{message}. Check the file's permissions or re-run: folio workspace <DIR>"),
        ),
        ExitCode::Malformed => ("FRONTMATTER_INVALID", message),
        _ if message.to_ascii_lowercase().contains("no workspace") => {
            ("WORKSPACE_NOT_GRANTED", format!("{message}. Run: folio workspace <DIR>"))
        }
        _ => ("ERROR", message),
    }
}

fn render_human_stderr_line(label: &str, message: &str, is_tty: bool, color: &str) -> String {
    if is_tty {
        format!("{color}{label}:{ANSI_RESET} {message}")
    } else {
        format!("{label}: {message}")
    }
}

fn extract_quoted_path(message: &str) -> Option<String> {
    let mut parts = message.split('`');
    let _before = parts.next()?;
    let candidate = parts.next()?.trim();
    if candidate.is_empty() {
        None
    } else {
        Some(candidate.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_session::error::SessionError;
    use std::path::PathBuf;

    #[derive(Serialize)]
    struct Saved {
        path: String,
        renamed: bool,
    }

    fn saved() -> Saved {
        Saved { path: "posts/2024-06-20-human-being.md".into(), renamed: true }
    }

    #[test]
    fn detect_tty_returns_human() {
        assert_eq!(OutputFormat::detect_from_terminal(true), OutputFormat::Human);
    }

    #[test]
    fn detect_pipe_returns_json() {
        assert_eq!(OutputFormat::detect_from_terminal(false), OutputFormat::Json);
    }

    #[test]
    fn detect_json_flag_overrides_tty() {
        assert_eq!(OutputFormat::detect(true), OutputFormat::Json);
    }

    #[test]
    fn write_output_human_format() {
        let mut buf = Vec::new();
        write_output(&mut buf, OutputFormat::Human, &saved(), |s| format!("saved {}", s.path))
            .unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "saved posts/2024-06-20-human-being.md\n");
    }

    #[test]
    fn write_output_json_format() {
        let mut buf = Vec::new();
        write_output(&mut buf, OutputFormat::Json, &saved(), |_| {
            unreachable!("human_fn should not be called in JSON mode")
        })
        .unwrap();
        let output = String::from_utf8(buf).unwrap();
        assert!(output.ends_with('\n'));
        let parsed: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(parsed["path"], "posts/2024-06-20-human-being.md");
        assert_eq!(parsed["renamed"], true);
    }

    #[test]
    fn print_error_does_not_panic() {
        print_error(OutputFormat::Human, "TEST_ERR", "something broke");
        print_error(OutputFormat::Json, "TEST_ERR", "something broke");
        print_warning(OutputFormat::Json, "WARN", "heads up");
    }

    #[test]
    fn render_human_error_uses_color_for_tty() {
        let line = render_human_stderr_line("error", "boom", true, ANSI_RED);
        assert!(line.contains(ANSI_RED));
        assert!(line.contains(ANSI_RESET));
        assert!(line.contains("boom"));
    }

    #[test]
    fn render_human_warning_without_tty_is_plain() {
        let line = render_human_stderr_line("warning", "careful", false, ANSI_YELLOW);
        assert_eq!(line, "warning: careful");
    }

    #[test]
    fn actionable_error_missing_document_names_path() {
        let err = anyhow::Error::new(SessionError::OpenFailed {
            path: PathBuf::from("posts/missing.md"),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        });
        let (code, message) = actionable_error(&err);
        assert_eq!(code, "NOT_FOUND");
        assert!(message.contains("posts/missing.md"));
    }

    #[test]
    fn actionable_error_permission_denied_suggests_regrant() {
        let err = anyhow::Error::new(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        let (code, message) = actionable_error(&err);
        assert_eq!(code, "PERMISSION_DENIED");
        assert!(message.contains("folio workspace"));
    }

    #[test]
    fn actionable_error_without_workspace() {
        let err = anyhow::anyhow!("no workspace has been granted");
        let (code, message) = actionable_error(&err);
        assert_eq!(code, "WORKSPACE_NOT_GRANTED");
        assert!(message.contains("Run: folio workspace"));
    }

    #[test]
    fn actionable_error_passes_other_messages_through() {
        let err = anyhow::anyhow!("something odd");
        assert_eq!(actionable_error(&err), ("ERROR", "something odd".to_string()));
    }
}
