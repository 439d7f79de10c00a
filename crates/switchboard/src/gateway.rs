//! Dispatch: resolve, validate input, invoke, validate output.

use crate::failure::{Failure, FailureKind, Stage};
use crate::registry::Registry;
use crate::validate::validate;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, field, info_span, warn, Instrument, Span};

/// A tool name plus its arguments. Consumed by [`Gateway::invoke`].
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationRequest {
    pub tool: String,
    pub arguments: Value,
}

impl InvocationRequest {
    pub fn new(tool: impl Into<String>, arguments: Value) -> Self {
        Self {
            tool: tool.into(),
            arguments,
        }
    }
}

/// Outcome of one invocation. A `Success` payload always satisfies the
/// tool's output schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InvocationResult {
    Success { payload: Value },
    Failure(Failure),
}

impl InvocationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, InvocationResult::Success { .. })
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            InvocationResult::Failure(failure) => Some(failure),
            InvocationResult::Success { .. } => None,
        }
    }

    pub fn payload(&self) -> Option<&Value> {
        match self {
            InvocationResult::Success { payload } => Some(payload),
            InvocationResult::Failure(_) => None,
        }
    }
}

/// Walks one invocation through its stages and keeps the span in sync.
struct Progress {
    stage: Stage,
    span: Span,
}

impl Progress {
    fn new(span: Span) -> Self {
        span.record("stage", Stage::Received.as_str());
        Self {
            stage: Stage::Received,
            span,
        }
    }

    fn advance(&mut self) {
        if let Some(next) = self.stage.next() {
            self.stage = next;
            self.span.record("stage", next.as_str());
        }
    }

    fn fail(&self, kind: FailureKind, message: impl Into<String>) -> Failure {
        self.span.record("failure.kind", kind.as_str());
        self.span.record("failure.stage", self.stage.as_str());
        Failure::new(kind, self.stage, message)
    }
}

/// Stateless per call; clone freely.
#[derive(Debug, Clone)]
pub struct Gateway {
    registry: Arc<Registry>,
}

impl Gateway {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run one invocation to a terminal state.
    ///
    /// Never retries. Dropping the returned future drops the adapter call.
    pub async fn invoke(&self, request: InvocationRequest) -> InvocationResult {
        let span = info_span!(
            "gateway.invoke",
            tool = %request.tool,
            stage = field::Empty,
            failure.kind = field::Empty,
            failure.stage = field::Empty,
            latency_ms = field::Empty,
        );

        let started = Instant::now();
        let result = self
            .run(request, Progress::new(span.clone()))
            .instrument(span.clone())
            .await;
        span.record("latency_ms", started.elapsed().as_millis() as u64);

        match &result {
            InvocationResult::Success { .. } => {
                span.in_scope(|| debug!("invocation completed"));
            }
            InvocationResult::Failure(failure) => {
                span.in_scope(|| {
                    warn!(
                        kind = %failure.kind,
                        stage = %failure.stage,
                        "invocation failed: {}",
                        failure.message
                    )
                });
            }
        }
        result
    }

    async fn run(&self, request: InvocationRequest, mut progress: Progress) -> InvocationResult {
        // Received
        let descriptor = match self.registry.resolve(&request.tool) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                return InvocationResult::Failure(progress.fail(FailureKind::NotFound, err.to_string()))
            }
        };
        progress.advance();

        // Resolved
        let arguments = match request.arguments {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        let arguments = match validate(&arguments, &descriptor.input_schema) {
            Ok(arguments) => arguments,
            Err(violation) => {
                let message = format!("invalid arguments for `{}`: {}", descriptor.name, violation);
                return InvocationResult::Failure(
                    progress
                        .fail(FailureKind::InvalidArguments, message)
                        .with_violation(violation),
                );
            }
        };
        progress.advance();

        // Invoking
        let payload = match descriptor.handler.invoke(arguments).await {
            Ok(payload) => payload,
            Err(err) => {
                return InvocationResult::Failure(progress.fail(err.kind(), err.to_string()))
            }
        };
        progress.advance();

        // Validating
        match validate(&payload, &descriptor.output_schema) {
            Ok(payload) => {
                progress.advance();
                InvocationResult::Success { payload }
            }
            Err(violation) => {
                let message = format!(
                    "`{}` returned an invalid payload: {}",
                    descriptor.name, violation
                );
                InvocationResult::Failure(
                    progress
                        .fail(FailureKind::SchemaViolation, message)
                        .with_violation(violation),
                )
            }
        }
    }
}
