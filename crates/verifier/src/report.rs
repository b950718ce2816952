use std::fmt;

use crate::diagnostic::{Diagnostic, ErrorKind};

/// Diagnostics gathered for a call site or one of its advices.
///
/// A report built with a non-zero limit keeps the first `limit` diagnostics and only counts
/// the rest, so a badly broken call site cannot flood the output.
#[derive(Debug, Clone, Default)]
pub struct VerificationReport {
    pub diagnostics: Vec<Diagnostic>,
    limit: usize,
    omitted: usize,
}

impl VerificationReport {
    /// An empty report capped at `limit` diagnostics; `0` keeps everything.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.diagnostics.is_empty() && self.omitted == 0
    }

    pub fn has_errors(&self) -> bool {
        !self.is_success()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn has_kind(&self, kind: ErrorKind) -> bool {
        self.errors().any(|diag| diag.kind() == kind)
    }

    /// Number of diagnostics dropped because the report was full.
    pub fn omitted(&self) -> usize {
        self.omitted
    }

    fn is_full(&self) -> bool {
        self.limit != 0 && self.diagnostics.len() >= self.limit
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        if self.is_full() {
            self.omitted += 1;
        } else {
            self.diagnostics.push(diagnostic);
        }
    }

    /// Moves the diagnostics of `other` into `self`, under `self`'s limit.
    pub fn absorb(&mut self, other: VerificationReport) {
        self.omitted += other.omitted;
        for diagnostic in other.diagnostics {
            self.push(diagnostic);
        }
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_success() {
            return f.write_str("verification succeeded");
        }

        for diagnostic in &self.diagnostics {
            write!(f, "{diagnostic}")?;
        }
        if self.omitted > 0 {
            write!(f, "{} more diagnostics omitted", self.omitted)?;
        }
        Ok(())
    }
}
