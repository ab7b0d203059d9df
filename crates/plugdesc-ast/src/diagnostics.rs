//! Compiler-style diagnostics collected by a backend

use serde::Serialize;
use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

use crate::backend::Declaration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Notice,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Notice => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{}", label)
    }
}

/// Where a diagnostic points
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub file: PathBuf,
    pub line: usize,
    pub declaration: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(location) = &self.location {
            write!(f, "{}:{}: ", location.file.display(), location.line)?;
        }
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// Messages of an error and every error in its source chain
pub fn cause_chain(cause: &(dyn Error + 'static)) -> Vec<String> {
    let mut chain = vec![cause.to_string()];
    let mut current = cause.source();
    while let Some(source) = current {
        chain.push(source.to_string());
        current = source.source();
    }
    chain
}

/// Append-only diagnostic sink shared by both backends
#[derive(Debug, Default)]
pub struct DiagnosticLog {
    entries: Vec<Diagnostic>,
}

impl DiagnosticLog {
    pub fn push(
        &mut self,
        severity: Severity,
        message: &str,
        declaration: Option<&Declaration>,
        causes: Vec<String>,
    ) {
        let location = declaration.map(|decl| Location {
            file: decl.source().to_path_buf(),
            line: decl.line(),
            declaration: decl.simple_name().to_string(),
        });
        let where_ = location
            .as_ref()
            .map(|l| format!("{}:{}", l.file.display(), l.line))
            .unwrap_or_default();
        debug!(%severity, location = %where_, "{}", message);
        self.entries.push(Diagnostic {
            severity,
            message: message.to_string(),
            location,
            causes,
        });
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.entries
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use crate::diagnostics::*;
    use std::io;

    #[derive(Debug)]
    struct Wrapped(io::Error);

    impl fmt::Display for Wrapped {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "could not write descriptor")
        }
    }

    impl Error for Wrapped {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_cause_chain_follows_sources() {
        let err = Wrapped(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        assert_eq!(
            cause_chain(&err),
            vec!["could not write descriptor", "denied"]
        );
    }

    #[test]
    fn test_log_counts_and_json_shape() {
        let mut log = DiagnosticLog::default();
        log.push(Severity::Warning, "first", None, Vec::new());
        log.push(Severity::Error, "second", None, vec!["io".to_string()]);
        assert_eq!(log.count(Severity::Error), 1);
        assert_eq!(log.count(Severity::Notice), 0);

        let json = serde_json::to_value(&log.entries()[1]).unwrap();
        assert_eq!(json["severity"], "error");
        assert_eq!(json["causes"][0], "io");
        assert!(json.get("location").is_none());
        assert_eq!(log.entries()[0].to_string(), "warning: first");
    }
}
