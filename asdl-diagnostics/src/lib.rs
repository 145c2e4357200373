//! Diagnostic records and an append-only collector for the ASDL IR pipeline.
//!
//! Every pipeline stage reports failures as [`Diagnostic`] values rather than
//! raising: §7 of the pipeline specification requires that stages never
//! unwind, so a stage that cannot complete an entity still returns
//! diagnostics describing why and keeps going on the rest of its input.

use std::fmt;

pub mod code;

pub use code::Code;

/// Severity ordered so that `Fatal > Error > Warning > Info`.
///
/// Declared low-to-high so the derived [`Ord`] matches that ordering
/// directly; [`DiagnosticBag::has_error`] checks `severity >= Severity::Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        };
        f.write_str(s)
    }
}

/// A single position within a source file (1-based line/column, matching
/// how upstream parsers typically report locations).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourcePos {
    pub line: u32,
    pub column: u32,
}

impl SourcePos {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A source span, as supplied by the upstream AST (§6, "parsed AST with
/// per-node source spans"). The core never constructs these from raw text;
/// it only carries spans attached to AST nodes through to diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceSpan {
    pub file: String,
    pub start: SourcePos,
    pub end: SourcePos,
}

impl SourceSpan {
    pub fn new(file: impl Into<String>, start: SourcePos, end: SourcePos) -> Self {
        Self {
            file: file.into(),
            start,
            end,
        }
    }

    pub fn point(file: impl Into<String>, pos: SourcePos) -> Self {
        Self {
            file: file.into(),
            start: pos,
            end: pos,
        }
    }
}

/// Note attached when no span is available, per §4.1.
pub const NO_SPAN_NOTE: &str = "No source span available.";

/// A single diagnostic record (§4.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: Code,
    pub severity: Severity,
    pub message: String,
    pub primary_span: Option<SourceSpan>,
    pub notes: Vec<String>,
    pub help: Option<String>,
    /// Domain tag identifying which stage emitted this diagnostic, e.g.
    /// `"pattern"`, `"lowering"`, `"viewbind"`, `"emit"`.
    pub source: &'static str,
}

impl Diagnostic {
    /// Build a diagnostic, attaching [`NO_SPAN_NOTE`] automatically when no
    /// span is given and it isn't already present in `notes`.
    pub fn new(
        code: Code,
        severity: Severity,
        message: impl Into<String>,
        primary_span: Option<SourceSpan>,
        mut notes: Vec<String>,
        help: Option<String>,
        source: &'static str,
    ) -> Self {
        if primary_span.is_none() && !notes.iter().any(|n| n == NO_SPAN_NOTE) {
            notes.push(NO_SPAN_NOTE.to_string());
        }
        Self {
            code,
            severity,
            message: message.into(),
            primary_span,
            notes,
            help,
            source,
        }
    }

    pub fn error(
        code: Code,
        message: impl Into<String>,
        span: Option<SourceSpan>,
        source: &'static str,
    ) -> Self {
        Self::new(code, Severity::Error, message, span, Vec::new(), None, source)
    }

    pub fn warning(
        code: Code,
        message: impl Into<String>,
        span: Option<SourceSpan>,
        source: &'static str,
    ) -> Self {
        Self::new(code, Severity::Warning, message, span, Vec::new(), None, source)
    }

    pub fn with_notes(mut self, notes: impl IntoIterator<Item = String>) -> Self {
        self.notes.extend(notes);
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity >= Severity::Error
    }
}

/// Append-only, ordered diagnostic collector.
///
/// Diagnostics are never removed and severities are never mutated once
/// pushed (§5 "Diagnostics are append-only within a run; their severity is
/// never mutated" and P6 "Diagnostic monotonicity").
#[derive(Debug, Clone, Default)]
pub struct DiagnosticBag {
    records: Vec<Diagnostic>,
}

impl DiagnosticBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.records.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.records.extend(diagnostics);
    }

    pub fn append(&mut self, other: &mut DiagnosticBag) {
        self.records.append(&mut other.records);
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.records
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.records
    }

    /// True when any collected diagnostic has error or fatal severity.
    pub fn has_error(&self) -> bool {
        has_error(&self.records)
    }
}

impl IntoIterator for DiagnosticBag {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl FromIterator<Diagnostic> for DiagnosticBag {
    fn from_iter<T: IntoIterator<Item = Diagnostic>>(iter: T) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

/// Free function form used by stages that carry a plain `Vec<Diagnostic>`
/// rather than a [`DiagnosticBag`] (the public stage signatures in §7 return
/// `(artifact_or_null, diagnostics)` where diagnostics is a flat sequence).
pub fn has_error(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_span_gets_no_span_note() {
        let diag = Diagnostic::error(Code::new("IR", 1), "boom", None, "test");
        assert!(diag.notes.iter().any(|n| n == NO_SPAN_NOTE));
    }

    #[test]
    fn present_span_does_not_get_no_span_note() {
        let span = SourceSpan::point("a.yml", SourcePos::new(1, 1));
        let diag = Diagnostic::error(Code::new("IR", 1), "boom", Some(span), "test");
        assert!(!diag.notes.iter().any(|n| n == NO_SPAN_NOTE));
    }

    #[test]
    fn severity_ordering_matches_fatal_error_warning_info() {
        assert!(Severity::Fatal > Severity::Error);
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }

    #[test]
    fn bag_is_append_only_and_detects_errors() {
        let mut bag = DiagnosticBag::new();
        assert!(!bag.has_error());
        bag.push(Diagnostic::warning(Code::new("LINT", 1), "hmm", None, "test"));
        assert!(!bag.has_error());
        bag.push(Diagnostic::error(Code::new("IR", 2), "bad", None, "test"));
        assert!(bag.has_error());
        assert_eq!(bag.len(), 2);
    }
}
