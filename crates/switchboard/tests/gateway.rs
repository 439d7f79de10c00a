//! End-to-end behaviour of the dispatch gateway against in-process tools.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use switchboard::{
    AdapterError, FailureKind, Gateway, InvocationRequest, InvocationResult, Registry,
    SourceTool, Stage, ToolProvider,
};

/// Returns a canned result and counts calls.
struct Canned {
    name: &'static str,
    result: Result<Value, AdapterError>,
    calls: AtomicUsize,
}

impl Canned {
    fn new(name: &'static str, result: Result<Value, AdapterError>) -> Arc<Self> {
        Arc::new(Self {
            name,
            result,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl SourceTool for Canned {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "Look up a company"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "minLength": 1},
                "limit": {"type": "integer", "minimum": 1, "maximum": 100, "x-coerce": "integer"}
            },
            "required": ["query"]
        })
    }

    fn output_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "organisation_number": {"type": "string"},
                "name": {"type": "string"}
            },
            "required": ["organisation_number", "name"]
        })
    }

    async fn invoke(&self, _arguments: Value) -> Result<Value, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Echoes its arguments back inside the payload.
struct Echo;

#[async_trait]
impl SourceTool for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echo arguments"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"limit": {"type": "integer", "x-coerce": "integer"}}
        })
    }

    fn output_schema(&self) -> Value {
        json!({"type": "object", "required": ["arguments"]})
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, AdapterError> {
        Ok(json!({ "arguments": arguments }))
    }
}

/// Never answers on its own.
struct Hanging {
    dropped: Arc<AtomicUsize>,
}

struct DropGuard(Arc<AtomicUsize>);

impl Drop for DropGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SourceTool for Hanging {
    fn name(&self) -> &str {
        "hang"
    }

    fn description(&self) -> &str {
        "Never returns"
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object"})
    }

    fn output_schema(&self) -> Value {
        json!({"type": "object"})
    }

    async fn invoke(&self, _arguments: Value) -> Result<Value, AdapterError> {
        let _guard = DropGuard(self.dropped.clone());
        std::future::pending::<()>().await;
        Ok(json!({}))
    }
}

struct Provider(Vec<Arc<dyn SourceTool>>);

impl ToolProvider for Provider {
    fn prefix(&self) -> &str {
        "bolagsverket"
    }

    fn tools(&self) -> Vec<Arc<dyn SourceTool>> {
        self.0.clone()
    }
}

fn gateway(tools: Vec<Arc<dyn SourceTool>>) -> Gateway {
    let mut builder = Registry::builder();
    builder.register_provider(&Provider(tools)).unwrap();
    Gateway::new(Arc::new(builder.build()))
}

fn failure(result: &InvocationResult) -> &switchboard::Failure {
    result
        .failure()
        .unwrap_or_else(|| panic!("expected failure, got {result:?}"))
}

#[tokio::test]
async fn unknown_tool_is_not_found() {
    let gateway = gateway(vec![]);
    let result = gateway
        .invoke(InvocationRequest::new("unknown_provider.lookup", json!({})))
        .await;

    let failure = failure(&result);
    assert_eq!(failure.kind, FailureKind::NotFound);
    assert_eq!(failure.stage, Stage::Received);
    assert!(!failure.retriable);
    assert!(failure.message.contains("unknown_provider.lookup"));
}

#[tokio::test]
async fn successful_call_returns_validated_payload() {
    let tool = Canned::new(
        "lookup",
        Ok(json!({"organisation_number": "556000-0000", "name": "Acme AB"})),
    );
    let gateway = gateway(vec![tool.clone() as Arc<dyn SourceTool>]);

    let result = gateway
        .invoke(InvocationRequest::new("bolagsverket.lookup", json!({"query": "acme"})))
        .await;

    assert!(result.is_success(), "{result:?}");
    assert_eq!(result.payload().unwrap()["name"], "Acme AB");
    assert_eq!(tool.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_output_field_is_schema_violation() {
    let tool = Canned::new("lookup", Ok(json!({"name": "Acme AB"})));
    let gateway = gateway(vec![tool as Arc<dyn SourceTool>]);

    let result = gateway
        .invoke(InvocationRequest::new("bolagsverket.lookup", json!({"query": "acme"})))
        .await;

    let failure = failure(&result);
    assert_eq!(failure.kind, FailureKind::SchemaViolation);
    assert_eq!(failure.stage, Stage::Validating);
    assert_eq!(failure.field(), Some("organisation_number"));
    assert!(!failure.retriable);
    assert!(result.payload().is_none());
}

#[tokio::test]
async fn invalid_arguments_never_reach_the_adapter() {
    let tool = Canned::new(
        "lookup",
        Ok(json!({"organisation_number": "1", "name": "x"})),
    );
    let gateway = gateway(vec![tool.clone() as Arc<dyn SourceTool>]);

    for arguments in [json!({}), json!({"query": ""}), json!({"query": "a", "limit": 500})] {
        let result = gateway
            .invoke(InvocationRequest::new("bolagsverket.lookup", arguments))
            .await;
        let failure = failure(&result);
        assert_eq!(failure.kind, FailureKind::InvalidArguments);
        assert_eq!(failure.stage, Stage::Resolved);
        assert!(failure.field().is_some());
    }

    assert_eq!(tool.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn adapter_failures_propagate_unchanged() {
    let cases = [
        (
            AdapterError::Timeout(Duration::from_secs(5)),
            FailureKind::UpstreamTimeout,
            true,
        ),
        (
            AdapterError::Unavailable("HTTP 503".into()),
            FailureKind::UpstreamUnavailable,
            true,
        ),
        (
            AdapterError::InvalidRequest("HTTP 400".into()),
            FailureKind::InvalidRequest,
            false,
        ),
    ];

    for (error, kind, retriable) in cases {
        let gateway = gateway(vec![Canned::new("lookup", Err(error)) as Arc<dyn SourceTool>]);
        let result = gateway
            .invoke(InvocationRequest::new("bolagsverket.lookup", json!({"query": "acme"})))
            .await;

        let failure = failure(&result);
        assert_eq!(failure.kind, kind);
        assert_eq!(failure.retriable, retriable);
        assert_eq!(failure.stage, Stage::Invoking);
    }
}

#[tokio::test]
async fn null_arguments_are_an_empty_object_and_coercions_apply() {
    let gateway = gateway(vec![Arc::new(Echo) as Arc<dyn SourceTool>]);

    let result = gateway
        .invoke(InvocationRequest::new("bolagsverket.echo", Value::Null))
        .await;
    assert_eq!(result.payload(), Some(&json!({"arguments": {}})));

    let result = gateway
        .invoke(InvocationRequest::new("bolagsverket.echo", json!({"limit": "25"})))
        .await;
    assert_eq!(result.payload(), Some(&json!({"arguments": {"limit": 25}})));
}

#[tokio::test]
async fn concurrent_invocations_are_independent() {
    let ok = Canned::new("ok", Ok(json!({"organisation_number": "1", "name": "a"})));
    let broken = Canned::new("broken", Ok(json!({})));
    let gateway = gateway(vec![ok as Arc<dyn SourceTool>, broken]);

    let mut handles = Vec::new();
    for i in 0..20 {
        let gateway = gateway.clone();
        let tool = if i % 2 == 0 { "bolagsverket.ok" } else { "bolagsverket.broken" };
        handles.push(tokio::spawn(async move {
            gateway
                .invoke(InvocationRequest::new(tool, json!({"query": "q"})))
                .await
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let result = handle.await.unwrap();
        assert_eq!(result.is_success(), i % 2 == 0);
    }
}

#[tokio::test]
async fn dropping_the_invocation_drops_the_adapter_call() {
    let dropped = Arc::new(AtomicUsize::new(0));
    let hanging: Arc<dyn SourceTool> = Arc::new(Hanging {
        dropped: dropped.clone(),
    });
    let gateway = gateway(vec![hanging]);

    let call = gateway.invoke(InvocationRequest::new("bolagsverket.hang", json!({})));
    let timed_out = tokio::time::timeout(Duration::from_millis(20), call).await;

    assert!(timed_out.is_err());
    assert_eq!(dropped.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn results_serialize_with_status_tag() {
    let gateway = gateway(vec![]);
    let result = gateway
        .invoke(InvocationRequest::new("nope.nothing", json!({})))
        .await;

    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["status"], "failure");
    assert_eq!(value["kind"], "not_found");
    assert_eq!(value["stage"], "received");
}
