//! Recoverable schema diagnostics.

use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::util::{Error, Result};

/// A schema problem that was skipped during object-model construction.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Path of the node the problem was found on.
    pub path: String,
    /// Offending property, if the problem is property-level.
    pub property: Option<String>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.property {
            Some(p) => write!(f, "{} [{}]: {}", self.path, p, self.message),
            None => write!(f, "{}: {}", self.path, self.message),
        }
    }
}

/// A best-effort model together with the diagnostics raised while building it.
#[derive(Clone, Debug)]
pub struct Decoded<T> {
    pub value: T,
    pub warnings: Vec<Diagnostic>,
}

impl<T> Decoded<T> {
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Decoded<U> {
        Decoded { value: f(self.value), warnings: self.warnings }
    }
}

/// Collects diagnostics; in strict mode the first one becomes an error.
pub(crate) struct Diagnostics {
    strict: bool,
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new(strict: bool) -> Self {
        Self { strict, items: Vec::new() }
    }

    pub fn report(&mut self, path: impl Into<String>, property: Option<&str>, message: impl Into<String>) -> Result<()> {
        let diagnostic = Diagnostic {
            path: path.into(),
            property: property.map(str::to_string),
            message: message.into(),
        };
        warn!(path = %diagnostic.path, property = ?diagnostic.property, "{}", diagnostic.message);
        if self.strict {
            return Err(Error::SchemaViolation(diagnostic.to_string()));
        }
        self.items.push(diagnostic);
        Ok(())
    }

    pub fn finish<T>(self, value: T) -> Decoded<T> {
        Decoded { value, warnings: self.items }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_when_lenient() {
        let mut diag = Diagnostics::new(false);
        diag.report("/object/shape/mesh", Some("p"), "bad length").unwrap();
        let decoded = diag.finish(());
        assert_eq!(decoded.warnings.len(), 1);
        assert_eq!(decoded.warnings[0].to_string(), "/object/shape/mesh [p]: bad length");
    }

    #[test]
    fn test_strict_fails_fast() {
        let mut diag = Diagnostics::new(true);
        let err = diag.report("/locator", None, "unexpected").unwrap_err();
        assert!(matches!(err, Error::SchemaViolation(_)));
    }
}
