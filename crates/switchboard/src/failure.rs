//! Failure taxonomy shared by adapters, the validator and the gateway.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Every way an invocation can fail. Callers match on this, never on messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No tool is registered under the requested name.
    NotFound,
    /// Arguments do not satisfy the tool's input schema.
    InvalidArguments,
    UpstreamTimeout,
    UpstreamUnavailable,
    /// The upstream rejected the request (HTTP 4xx).
    InvalidRequest,
    /// The adapter answered, but the payload breaks the output contract.
    SchemaViolation,
}

impl FailureKind {
    pub const ALL: [FailureKind; 6] = [
        FailureKind::NotFound,
        FailureKind::InvalidArguments,
        FailureKind::UpstreamTimeout,
        FailureKind::UpstreamUnavailable,
        FailureKind::InvalidRequest,
        FailureKind::SchemaViolation,
    ];

    /// Only transient upstream conditions are worth retrying.
    pub fn retriable(self) -> bool {
        matches!(
            self,
            FailureKind::UpstreamTimeout | FailureKind::UpstreamUnavailable
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::NotFound => "not_found",
            FailureKind::InvalidArguments => "invalid_arguments",
            FailureKind::UpstreamTimeout => "upstream_timeout",
            FailureKind::UpstreamUnavailable => "upstream_unavailable",
            FailureKind::InvalidRequest => "invalid_request",
            FailureKind::SchemaViolation => "schema_violation",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a single invocation.
///
/// `Received -> Resolved -> Invoking -> Validating -> Completed`, with `Failed`
/// reachable from each of the first four.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Received,
    Resolved,
    Invoking,
    Validating,
    Completed,
    Failed,
}

impl Stage {
    /// The successor on the happy path. Terminal stages have none.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Received => Some(Stage::Resolved),
            Stage::Resolved => Some(Stage::Invoking),
            Stage::Invoking => Some(Stage::Validating),
            Stage::Validating => Some(Stage::Completed),
            Stage::Completed | Stage::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Completed | Stage::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Resolved => "resolved",
            Stage::Invoking => "invoking",
            Stage::Validating => "validating",
            Stage::Completed => "completed",
            Stage::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payload that does not match its schema, pinned to one location.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("`{field}`: expected {expected}, found {actual}")]
pub struct SchemaViolation {
    /// Dotted path with `[n]` indices, e.g. `dokumentlista.dokument[3].titel`.
    /// The root itself is `$`.
    pub field: String,
    pub expected: String,
    /// JSON type of the offending value, or `missing`.
    pub actual: String,
}

impl SchemaViolation {
    pub fn new(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// Errors a source adapter may report. Anything else must be classified into
/// one of these before it leaves the adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    #[error("upstream did not answer within {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    #[error("upstream rejected the request: {0}")]
    InvalidRequest(String),
}

impl AdapterError {
    pub fn kind(&self) -> FailureKind {
        match self {
            AdapterError::Timeout(_) => FailureKind::UpstreamTimeout,
            AdapterError::Unavailable(_) => FailureKind::UpstreamUnavailable,
            AdapterError::InvalidRequest(_) => FailureKind::InvalidRequest,
        }
    }

    pub fn retriable(&self) -> bool {
        self.kind().retriable()
    }
}

/// The terminal failure of one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
    pub retriable: bool,
    /// Where in the lifecycle the invocation failed.
    pub stage: Stage,
    #[serde(flatten)]
    pub violation: Option<SchemaViolation>,
}

impl Failure {
    pub fn new(kind: FailureKind, stage: Stage, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retriable: kind.retriable(),
            stage,
            violation: None,
        }
    }

    pub fn with_violation(mut self, violation: SchemaViolation) -> Self {
        self.violation = Some(violation);
        self
    }

    /// Path of the offending field, when the failure came from validation.
    pub fn field(&self) -> Option<&str> {
        self.violation.as_ref().map(|v| v.field.as_str())
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} at {}] {}", self.kind, self.stage, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_only_upstream_transients_retry() {
        let retriable: Vec<_> = FailureKind::ALL
            .into_iter()
            .filter(|k| k.retriable())
            .collect();
        assert_eq!(
            retriable,
            vec![FailureKind::UpstreamTimeout, FailureKind::UpstreamUnavailable]
        );
    }

    #[test]
    fn test_kind_wire_names_are_stable() {
        for kind in FailureKind::ALL {
            assert_eq!(serde_json::to_value(kind).unwrap(), json!(kind.as_str()));
        }
    }

    #[test]
    fn test_stage_walk() {
        let mut stage = Stage::Received;
        let mut walked = vec![stage];
        while let Some(next) = stage.next() {
            stage = next;
            walked.push(stage);
        }
        assert_eq!(
            walked,
            vec![
                Stage::Received,
                Stage::Resolved,
                Stage::Invoking,
                Stage::Validating,
                Stage::Completed
            ]
        );
        assert!(Stage::Failed.is_terminal());
    }

    #[test]
    fn test_adapter_error_classification() {
        let timeout = AdapterError::Timeout(Duration::from_secs(5));
        assert_eq!(timeout.kind(), FailureKind::UpstreamTimeout);
        assert!(timeout.retriable());
        assert_eq!(timeout.to_string(), "upstream did not answer within 5000ms");

        let rejected = AdapterError::InvalidRequest("HTTP 404".into());
        assert_eq!(rejected.kind(), FailureKind::InvalidRequest);
        assert!(!rejected.retriable());
    }

    #[test]
    fn test_failure_serializes_flat() {
        let failure = Failure::new(
            FailureKind::SchemaViolation,
            Stage::Validating,
            "output does not match schema",
        )
        .with_violation(SchemaViolation::new("organisation_number", "string", "missing"));

        let value = serde_json::to_value(&failure).unwrap();
        assert_eq!(
            value,
            json!({
                "kind": "schema_violation",
                "message": "output does not match schema",
                "retriable": false,
                "stage": "validating",
                "field": "organisation_number",
                "expected": "string",
                "actual": "missing",
            })
        );
    }

    #[test]
    fn test_failure_without_violation_omits_fields() {
        let failure = Failure::new(FailureKind::NotFound, Stage::Received, "nope");
        let value = serde_json::to_value(&failure).unwrap();
        assert!(value.get("field").is_none());
        assert_eq!(value["retriable"], false);
    }
}
