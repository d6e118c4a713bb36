//! Diagnostics (§6, §7): everything the Health Checker and Route Builder
//! report is both `tracing`-emitted as it's discovered and collected into a
//! [`DiagnosticsReport`] the Facade returns, mirroring the teacher's
//! dual logging/structured-response pattern.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// One finding from the Health Checker (or, rarely, the Route Builder).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Diagnostic {
    pub severity: Severity,
    /// Short machine-stable slug (`"duplicate-loco-address"`,
    /// `"block-not-routed"`, ...), not intended for display on its own.
    pub code: &'static str,
    pub message: String,
    /// The tile or loco id this finding is about, if any.
    pub subject: Option<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, code: &'static str, message: impl Into<String>) -> Self {
        Diagnostic {
            severity,
            code,
            message: message.into(),
            subject: None,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Emits this diagnostic through `tracing` at the level matching its
    /// severity, in addition to being retained in the report.
    pub fn emit(&self) {
        match self.severity {
            Severity::Info => {
                tracing::info!(code = self.code, subject = ?self.subject, "{}", self.message);
            }
            Severity::Warning => {
                tracing::warn!(code = self.code, subject = ?self.subject, "{}", self.message);
            }
            Severity::Error => {
                tracing::error!(code = self.code, subject = ?self.subject, "{}", self.message);
            }
        }
    }
}

/// Everything the Health Checker found, plus the single "most distant
/// tile" informational report (§4.5).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DiagnosticsReport {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticsReport {
    pub fn new() -> Self {
        DiagnosticsReport::default()
    }

    /// Emits `diagnostic` via `tracing` and appends it to the report.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        diagnostic.emit();
        self.diagnostics.push(diagnostic);
    }

    pub fn all(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn merge(&mut self, other: DiagnosticsReport) {
        self.diagnostics.extend(other.diagnostics);
    }
}
