//! # Reporters
//!
//! Renderings of a [`RunOutcome`] for the surrounding job:
//!
//! - [`TextReporter`]: `Passed validators`, or one violation per line.
//! - [`GithubReporter`]: the same text, with failures raised as a GitHub
//!   Actions `::error::` workflow command so the step is annotated.
//! - [`JsonReporter`]: a single JSON object for machine consumers.
//!
//! Reporters only write. The exit status comes from
//! [`RunOutcome::exit_code`].

use std::io::Write;

use clap::ValueEnum;
use serde::Serialize;

use lockgate_core::{Reporter, RunOutcome};

/// Output format selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text.
    Text,
    /// GitHub Actions workflow commands.
    Github,
    /// One JSON object.
    Json,
}

impl OutputFormat {
    /// `Github` when running inside GitHub Actions, `Text` otherwise.
    pub fn detect() -> Self {
        match std::env::var("GITHUB_ACTIONS") {
            Ok(v) if v == "true" => OutputFormat::Github,
            _ => OutputFormat::Text,
        }
    }
}

/// Box a reporter writing `format` to `out`.
pub fn reporter_for<'a, W: Write + 'a>(format: OutputFormat, out: W) -> Box<dyn Reporter + 'a> {
    match format {
        OutputFormat::Text => Box::new(TextReporter::new(out)),
        OutputFormat::Github => Box::new(GithubReporter::new(out)),
        OutputFormat::Json => Box::new(JsonReporter::new(out)),
    }
}

/// Plain-text reporter.
pub struct TextReporter<W> {
    out: W,
}

impl<W: Write> TextReporter<W> {
    /// Report to `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for TextReporter<W> {
    fn report(&mut self, outcome: &RunOutcome) -> std::io::Result<()> {
        writeln!(self.out, "{}", outcome.summary())?;
        self.out.flush()
    }
}

/// GitHub Actions reporter.
pub struct GithubReporter<W> {
    out: W,
}

impl<W: Write> GithubReporter<W> {
    /// Report to `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Escape workflow command data so multi-line text stays in one annotation.
fn escape_command_data(text: &str) -> String {
    text.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

impl<W: Write> Reporter for GithubReporter<W> {
    fn report(&mut self, outcome: &RunOutcome) -> std::io::Result<()> {
        let summary = outcome.summary();
        writeln!(self.out, "{summary}")?;
        if !outcome.is_success() {
            // One annotation carrying every line, for the job summary.
            writeln!(self.out, "::error::{}", escape_command_data(&summary))?;
        }
        self.out.flush()
    }
}

/// JSON reporter.
pub struct JsonReporter<W> {
    out: W,
}

impl<W: Write> JsonReporter<W> {
    /// Report to `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    passed: bool,
    exit_code: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    packages: Option<usize>,
    messages: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<W: Write> Reporter for JsonReporter<W> {
    fn report(&mut self, outcome: &RunOutcome) -> std::io::Result<()> {
        let none: &[String] = &[];
        let (packages, messages, error) = match outcome {
            RunOutcome::Passed { packages } => (Some(*packages), none, None),
            RunOutcome::Failed { messages } => (None, messages.as_slice(), None),
            other => (None, none, Some(other.summary())),
        };
        let report = JsonReport {
            passed: outcome.is_success(),
            exit_code: outcome.exit_code(),
            packages,
            messages,
            error,
        };
        serde_json::to_writer(&mut self.out, &report)?;
        writeln!(self.out)?;
        self.out.flush()
    }
}
