//! Typed diagnostics collected during a conversion run.
//!
//! Soft conditions (unsupported placement constraints, externally managed
//! secrets, dropped environment variables, ...) never abort a run. They are
//! recorded here so callers can inspect them, and mirrored to `tracing`.

use std::fmt;

use tracing::{error, warn};

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// A local fallback was applied; output is still produced.
    Warning,
    /// The affected service produced no output.
    Error,
}

/// A single diagnostic entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity level.
    pub severity: Severity,
    /// Service the diagnostic relates to, if any.
    pub service: Option<String>,
    /// Human-readable message.
    pub message: String,
}

/// Ordered collection of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates an empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Records a warning for a service.
    pub fn warn(&mut self, service: Option<&str>, message: impl Into<String>) {
        let message = message.into();
        match service {
            Some(name) => warn!(service = name, "{message}"),
            None => warn!("{message}"),
        }
        self.entries.push(Diagnostic {
            severity: Severity::Warning,
            service: service.map(str::to_string),
            message,
        });
    }

    /// Records an error for a service.
    pub fn error(&mut self, service: Option<&str>, message: impl Into<String>) {
        let message = message.into();
        match service {
            Some(name) => error!(service = name, "{message}"),
            None => error!("{message}"),
        }
        self.entries.push(Diagnostic {
            severity: Severity::Error,
            service: service.map(str::to_string),
            message,
        });
    }

    /// Appends all entries of another collection.
    pub fn extend(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    /// Returns all entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Returns the warnings only.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    /// Returns true if any entry is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Error)
    }

    /// Returns true if no diagnostics were recorded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.service {
            Some(service) => write!(f, "{} [{service}]: {}", self.severity, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warnings_are_recorded_in_order() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.warn(Some("web"), "first");
        diagnostics.warn(None, "second");

        let messages: Vec<_> = diagnostics.warnings().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
        assert!(!diagnostics.has_errors());
    }

    #[test]
    fn test_display_includes_service() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.error(Some("db"), "broken");
        assert_eq!(diagnostics.entries()[0].to_string(), "error [db]: broken");
        assert!(diagnostics.has_errors());
    }
}
