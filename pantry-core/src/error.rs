//! Structured errors
//!
//! Two layers: small tagged enums (`PathError`, `QueryError`) returned by
//! value from hot or local operations, and `PantryError`, the structured
//! error surfaced by the resolver, sessions and processors.

use crate::{CookerPath, OutputPath};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Standard error codes (machine-readable)
pub mod codes {
    pub const UNRESOLVED_DEPENDENCY: &str = "UNRESOLVED_DEPENDENCY";
    pub const DEPENDENCY_CYCLE: &str = "DEPENDENCY_CYCLE";
    pub const SCOPE_VIOLATION: &str = "SCOPE_VIOLATION";
    pub const SOURCE_MISMATCH: &str = "SOURCE_MISMATCH";
    pub const PROCESSING_FAILED: &str = "PROCESSING_FAILED";
    pub const PARSER_FAILED: &str = "PARSER_FAILED";
    pub const CANCELLED: &str = "CANCELLED";
    pub const USAGE_ORDER: &str = "USAGE_ORDER";
    pub const DUPLICATE_COOKER: &str = "DUPLICATE_COOKER";
    pub const DUPLICATE_TABLE: &str = "DUPLICATE_TABLE";
    pub const UNKNOWN_TABLE: &str = "UNKNOWN_TABLE";
    pub const INVALID_PATH: &str = "INVALID_PATH";
    pub const INVALID_CONFIG: &str = "INVALID_CONFIG";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const TYPE_MISMATCH: &str = "TYPE_MISMATCH";
    pub const NOT_READY: &str = "NOT_READY";
    pub const INTERNAL: &str = "INTERNAL";
}

/// Rejected identifier or path
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("{kind} must not be empty")]
    Empty { kind: &'static str },

    #[error("{kind} '{value}' has leading or trailing whitespace")]
    Whitespace { kind: &'static str, value: String },

    #[error("{kind} '{value}' contains reserved character {ch:?}")]
    ReservedChar {
        kind: &'static str,
        value: String,
        ch: char,
    },

    #[error("malformed {kind}: '{value}'")]
    Malformed { kind: &'static str, value: String },
}

/// Failure of an output query
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("no cooker registered at '{0}'")]
    CookerNotFound(CookerPath),

    #[error("cooker does not expose output '{0}'")]
    OutputNotFound(OutputPath),

    #[error("'{0}' is outside the dependency closure of this handle")]
    OutOfScope(OutputPath),

    #[error("'{path}': expected {expected}, found {found}")]
    TypeMismatch {
        path: OutputPath,
        expected: &'static str,
        found: &'static str,
    },

    #[error("outputs are not available while the session is {0}")]
    NotReady(&'static str),
}

/// Severity level of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Reported, nothing was rejected
    Warning,
    /// One table or cooker was rejected; the processor stays usable
    Error,
    /// The session or processor cannot continue
    Fatal,
}

/// Context about where an error occurred
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooker: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    /// Zero-based index of the record being delivered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<u64>,

    /// Propagation notes
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub notes: Vec<String>,
}

/// Structured engine error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PantryError {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,

    pub severity: Severity,
}

impl PantryError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            suggestion: None,
            context: None,
            severity: Severity::Error,
        }
    }

    /// Builder: add suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Builder: set cooker context
    pub fn in_cooker(mut self, cooker: &CookerPath) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        ctx.cooker = Some(cooker.to_string());
        self
    }

    /// Builder: set table context
    pub fn in_table(mut self, table: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        ctx.table = Some(table.into());
        self
    }

    /// Builder: set record context
    pub fn at_record(mut self, index: u64) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        ctx.record = Some(index);
        self
    }

    /// Builder: add propagation note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::default);
        ctx.notes.push(note.into());
        self
    }

    /// Builder: set severity
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }

    /// Recoverable errors reject one table or cooker and leave the
    /// processor usable.
    pub fn is_recoverable(&self) -> bool {
        self.severity != Severity::Fatal
    }

    // ========== Common Error Constructors ==========

    pub fn unresolved_dependency(path: &CookerPath) -> Self {
        Self::new(
            codes::UNRESOLVED_DEPENDENCY,
            format!("No cooker is registered at '{}'", path),
        )
        .with_suggestion("Register the cooker before enabling tables that require it")
    }

    pub fn unknown_data_processor(id: &str) -> Self {
        Self::new(
            codes::UNRESOLVED_DEPENDENCY,
            format!("No data processor is registered as '{}'", id),
        )
    }

    pub fn dependency_cycle(cycle: &[CookerPath]) -> Self {
        let chain: Vec<String> = cycle.iter().map(ToString::to_string).collect();
        Self::new(
            codes::DEPENDENCY_CYCLE,
            format!("Circular cooker dependency: {}", chain.join(" → ")),
        )
        .with_suggestion("Remove one of the composite dependencies in the cycle")
    }

    pub fn scope_violation(path: &OutputPath) -> Self {
        Self::new(
            codes::SCOPE_VIOLATION,
            format!("'{}' is not part of the requester's dependency closure", path),
        )
        .with_suggestion("Declare the cooker as a dependency of the table")
    }

    pub fn source_mismatch(expected: &str, cooker: &CookerPath) -> Self {
        Self::new(
            codes::SOURCE_MISMATCH,
            format!("Cooker '{}' does not belong to source '{}'", cooker, expected),
        )
        .in_cooker(cooker)
    }

    pub fn processing_failed(cooker: &CookerPath, details: impl Into<String>) -> Self {
        Self::new(
            codes::PROCESSING_FAILED,
            format!("Cooker '{}' failed: {}", cooker, details.into()),
        )
        .in_cooker(cooker)
        .with_severity(Severity::Fatal)
    }

    pub fn parser_failed(details: impl Into<String>) -> Self {
        Self::new(
            codes::PARSER_FAILED,
            format!("Source parser failed: {}", details.into()),
        )
        .with_severity(Severity::Fatal)
    }

    pub fn cancelled(records: u64) -> Self {
        Self::new(
            codes::CANCELLED,
            format!("Processing cancelled after {} records", records),
        )
        .with_suggestion("Discard the session and process the source again")
        .with_severity(Severity::Fatal)
    }

    pub fn usage_order(details: impl Into<String>) -> Self {
        Self::new(codes::USAGE_ORDER, details.into())
            .with_suggestion("Register cookers and enable tables before processing starts")
            .with_severity(Severity::Fatal)
    }

    pub fn duplicate_cooker(path: &CookerPath) -> Self {
        Self::new(
            codes::DUPLICATE_COOKER,
            format!("Cooker '{}' is already registered", path),
        )
        .in_cooker(path)
    }

    pub fn duplicate_table(table: impl Into<String>) -> Self {
        let table = table.into();
        Self::new(
            codes::DUPLICATE_TABLE,
            format!("Table '{}' was already added with different dependencies", table),
        )
        .in_table(table)
    }

    pub fn unknown_table(table: impl Into<String>) -> Self {
        let table = table.into();
        Self::new(
            codes::UNKNOWN_TABLE,
            format!("Table '{}' has not been enabled", table),
        )
        .in_table(table)
    }

    pub fn invalid_config(details: impl Into<String>) -> Self {
        Self::new(
            codes::INVALID_CONFIG,
            format!("Invalid configuration: {}", details.into()),
        )
    }

    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(codes::INTERNAL, format!("Internal error: {}", details.into()))
            .with_suggestion("This is a bug, please report it")
            .with_severity(Severity::Fatal)
    }
}

impl std::fmt::Display for PantryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " (suggestion: {})", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for PantryError {}

impl From<PathError> for PantryError {
    fn from(err: PathError) -> Self {
        Self::new(codes::INVALID_PATH, err.to_string())
    }
}

impl From<QueryError> for PantryError {
    fn from(err: QueryError) -> Self {
        let code = match &err {
            QueryError::OutOfScope(path) => return Self::scope_violation(path),
            QueryError::CookerNotFound(_) | QueryError::OutputNotFound(_) => codes::NOT_FOUND,
            QueryError::TypeMismatch { .. } => codes::TYPE_MISMATCH,
            QueryError::NotReady(_) => codes::NOT_READY,
        };
        Self::new(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_chain() {
        let a = CookerPath::composite("a").unwrap();
        let b = CookerPath::composite("b").unwrap();
        let err = PantryError::dependency_cycle(&[a.clone(), b, a]);
        assert!(err.is(codes::DEPENDENCY_CYCLE));
        assert_eq!(err.message, "Circular cooker dependency: a → b → a");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_processing_errors_are_fatal() {
        let path = CookerPath::source("trace", "cpu").unwrap();
        let err = PantryError::processing_failed(&path, "boom").at_record(4);
        assert!(!err.is_recoverable());
        let ctx = err.context.unwrap();
        assert_eq!(ctx.cooker.as_deref(), Some("trace/cpu"));
        assert_eq!(ctx.record, Some(4));
    }

    #[test]
    fn test_query_error_codes() {
        let path = OutputPath::parse("trace/cpu:count").unwrap();
        let err: PantryError = QueryError::OutOfScope(path.clone()).into();
        assert!(err.is(codes::SCOPE_VIOLATION));
        assert!(err.message.contains("trace/cpu:count"));
        assert_eq!(
            err.suggestion.as_deref(),
            Some("Declare the cooker as a dependency of the table")
        );

        let err: PantryError = QueryError::TypeMismatch {
            path,
            expected: "Int",
            found: "Text",
        }
        .into();
        assert!(err.is(codes::TYPE_MISMATCH));
    }

    #[test]
    fn test_display_includes_suggestion() {
        let err = PantryError::usage_order("late registration");
        let text = err.to_string();
        assert!(text.starts_with("[USAGE_ORDER] late registration"));
        assert!(text.contains("suggestion:"));
    }
}
