//! Shared colored output utilities for CLI commands.
//!
//! Uses `termcolor` for cross-platform colored terminal output.
//! Respects `NO_COLOR` environment variable and `--color` flag.
//!
//! Status and diagnostics go to stderr so stdout can carry generated code.

use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Resolve `ColorChoice` from CLI flag and environment.
///
/// Priority: `NO_COLOR` env > `--color` flag > auto-detect TTY.
pub fn resolve_color_choice(flag: Option<&str>) -> ColorChoice {
    if std::env::var_os("NO_COLOR").is_some() {
        return ColorChoice::Never;
    }
    match flag {
        Some("always") => ColorChoice::Always,
        Some("never") => ColorChoice::Never,
        _ => ColorChoice::Auto,
    }
}

/// Styled output writer for terminal.
pub struct StyledOutput {
    stdout: StandardStream,
    stderr: StandardStream,
}

impl StyledOutput {
    /// Create a new styled output with the given color choice.
    pub fn new(choice: ColorChoice) -> Self {
        Self {
            stdout: StandardStream::stdout(choice),
            stderr: StandardStream::stderr(choice),
        }
    }

    fn write_styled(stream: &mut StandardStream, text: &str, color: Option<Color>, bold: bool) {
        let mut spec = ColorSpec::new();
        spec.set_fg(color).set_bold(bold);
        let _ = stream.set_color(&spec);
        let _ = write!(stream, "{}", text);
        let _ = stream.reset();
    }

    // ── stdout ───────────────────────────────────────────────────────

    /// Bold text.
    pub fn bold(&mut self, text: &str) {
        Self::write_styled(&mut self.stdout, text, None, true);
    }

    /// Cyan text.
    pub fn info(&mut self, text: &str) {
        Self::write_styled(&mut self.stdout, text, Some(Color::Cyan), false);
    }

    /// Dim/gray text.
    pub fn dim(&mut self, text: &str) {
        Self::write_styled(&mut self.stdout, text, Some(Color::White), false);
    }

    /// Plain text (no color).
    pub fn plain(&mut self, text: &str) {
        let _ = write!(self.stdout, "{}", text);
    }

    /// Newline.
    pub fn newline(&mut self) {
        let _ = writeln!(self.stdout);
    }

    /// Flush stdout.
    pub fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    // ── stderr ───────────────────────────────────────────────────────

    /// Green bold label followed by plain text, on its own line.
    pub fn status(&mut self, label: &str, text: &str) {
        Self::write_styled(&mut self.stderr, label, Some(Color::Green), true);
        let _ = writeln!(self.stderr, " {}", text);
    }

    /// Dim progress line.
    pub fn progress(&mut self, text: &str) {
        Self::write_styled(&mut self.stderr, text, Some(Color::White), false);
        let _ = writeln!(self.stderr);
    }

    /// Yellow bold label followed by plain text, on its own line.
    pub fn warning(&mut self, label: &str, text: &str) {
        Self::write_styled(&mut self.stderr, label, Some(Color::Yellow), true);
        let _ = writeln!(self.stderr, " {}", text);
    }

    /// Write error message to stderr.
    pub fn stderr_error(&mut self, text: &str) {
        Self::write_styled(&mut self.stderr, text, Some(Color::Red), true);
        let _ = writeln!(self.stderr);
    }
}
