//! MCP protocol dispatch.
//!
//! Routes JSON-RPC methods to their handlers, following the OpenTelemetry
//! JSON-RPC semantic conventions for the dispatch span.
//! See: https://opentelemetry.io/docs/specs/semconv/rpc/json-rpc/

use serde_json::{json, Map, Value};
use switchboard::InvocationRequest;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::error::ErrorData;
use super::jsonrpc::{response, JsonRpcMessage, RequestId};
use super::types::{
    CallToolParams, CallToolResult, CancelledParams, InitializeParams, InitializeResult,
    ListResourcesResult, ListToolsResult, ReadResourceParams, ReadResourceResult,
    ServerCapabilities, Tool, PROTOCOL_VERSION,
};
use super::session::InFlight;
use super::McpState;

/// What a transport should send back for one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// A response to a request.
    Response(Value),
    /// A request withdrawn by `notifications/cancelled`. HTTP still answers it;
    /// stdio stays silent.
    Cancelled(Value),
    /// The body was not a usable JSON-RPC message.
    Rejected(Value),
    /// A notification; nothing to send.
    Accepted,
}

/// A parsed request, already registered as in flight for its session.
///
/// Registration happens when the message is accepted, so a
/// `notifications/cancelled` read after it always finds the request.
#[derive(Debug)]
pub struct PendingRequest {
    request_id: RequestId,
    message: JsonRpcMessage,
    in_flight: InFlight,
}

/// Outcome of accepting one inbound message.
#[derive(Debug)]
pub enum Intake {
    /// Nothing left to run; send the reply (if any) now.
    Done(Reply),
    /// A request to be answered with [`answer`].
    Pending(PendingRequest),
}

/// Handle one raw message body from start to finish.
pub async fn handle_bytes(state: &McpState, session_id: &str, body: &[u8]) -> Reply {
    match accept(state, session_id, body) {
        Intake::Done(reply) => reply,
        Intake::Pending(pending) => answer(state, session_id, pending).await,
    }
}

/// Parse a message body. Notifications and malformed input are handled on
/// the spot; requests are registered and handed back for [`answer`].
pub fn accept(state: &McpState, session_id: &str, body: &[u8]) -> Intake {
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => accept_value(state, session_id, value),
        Err(e) => Intake::Done(Reply::Rejected(response(
            None,
            Err(ErrorData::parse_error(format!("Invalid JSON: {e}"))),
        ))),
    }
}

/// Same as [`accept`] for an already decoded message.
pub fn accept_value(state: &McpState, session_id: &str, body: Value) -> Intake {
    if body.is_array() {
        return Intake::Done(Reply::Rejected(response(
            None,
            Err(ErrorData::invalid_request("Batch requests are not supported")),
        )));
    }

    let raw_id = body
        .get("id")
        .cloned()
        .and_then(|id| serde_json::from_value::<RequestId>(id).ok());

    let message: JsonRpcMessage = match serde_json::from_value(body) {
        Ok(message) => message,
        Err(e) => {
            return Intake::Done(Reply::Rejected(response(
                raw_id.as_ref(),
                Err(ErrorData::invalid_request(format!("Invalid JSON-RPC: {e}"))),
            )))
        }
    };

    let Some(request_id) = message.id.clone() else {
        handle_notification(state, session_id, &message);
        return Intake::Done(Reply::Accepted);
    };

    tracing::debug!(method = %message.method, request_id = %request_id, "Processing MCP request");
    let in_flight = state.sessions.begin_request(session_id, &request_id);
    Intake::Pending(PendingRequest {
        request_id,
        message,
        in_flight,
    })
}

/// Run an accepted request and build its reply.
pub async fn answer(state: &McpState, session_id: &str, pending: PendingRequest) -> Reply {
    let PendingRequest {
        request_id,
        message,
        in_flight,
    } = pending;

    let result = dispatch(state, session_id, &request_id, &message, in_flight.token()).await;
    drop(in_flight);

    let cancelled = matches!(&result, Err(e) if e.code == ErrorData::REQUEST_CANCELLED);
    let body = response(Some(&request_id), result);
    if cancelled {
        Reply::Cancelled(body)
    } else {
        Reply::Response(body)
    }
}

fn handle_notification(state: &McpState, session_id: &str, message: &JsonRpcMessage) {
    match message.method.as_str() {
        "notifications/initialized" => {
            tracing::info!(session_id = %session_id, "Client initialized notification received");
        }
        "notifications/cancelled" => match message.params_as::<CancelledParams>("cancelled") {
            Ok(params) => {
                tracing::info!(
                    session_id = %session_id,
                    request_id = %params.request_id,
                    reason = params.reason.as_deref().unwrap_or(""),
                    "Cancellation requested"
                );
                state.sessions.cancel_request(session_id, &params.request_id);
            }
            Err(e) => tracing::warn!(session_id = %session_id, "Ignoring cancellation: {}", e),
        },
        other => {
            tracing::debug!(method = %other, "Unknown notification received");
        }
    }
}

/// Dispatch a request inside an `mcp.dispatch` span.
pub async fn dispatch(
    state: &McpState,
    session_id: &str,
    request_id: &RequestId,
    message: &JsonRpcMessage,
    cancel: &CancellationToken,
) -> Result<Value, ErrorData> {
    let span = tracing::info_span!(
        "mcp.dispatch",
        rpc.system = "jsonrpc",
        rpc.method = %message.method,
        rpc.jsonrpc.version = "2.0",
        rpc.jsonrpc.request_id = %request_id,
        mcp.session_id = %session_id,
        error.type = tracing::field::Empty,
        rpc.jsonrpc.error_code = tracing::field::Empty,
        rpc.jsonrpc.error_message = tracing::field::Empty,
    );

    async {
        let result = dispatch_inner(state, session_id, message, cancel).await;
        if let Err(ref error) = result {
            let span = tracing::Span::current();
            span.record("error.type", error.error_type());
            span.record("rpc.jsonrpc.error_code", error.code);
            span.record("rpc.jsonrpc.error_message", error.message.as_str());
        }
        result
    }
    .instrument(span)
    .await
}

async fn dispatch_inner(
    state: &McpState,
    session_id: &str,
    message: &JsonRpcMessage,
    cancel: &CancellationToken,
) -> Result<Value, ErrorData> {
    match message.method.as_str() {
        // Lifecycle
        "initialize" => handle_initialize(state, session_id, message),
        "ping" => Ok(json!({})),

        // Tools
        "tools/list" => handle_list_tools(state),
        "tools/call" => handle_call_tool(state, session_id, message, cancel).await,

        // Resources
        "resources/list" => handle_list_resources(state),
        "resources/templates/list" => Ok(json!({ "resourceTemplates": [] })),
        "resources/read" => handle_read_resource(state, message),

        _ => Err(ErrorData::method_not_found(&message.method)),
    }
}

fn to_value<T: serde::Serialize>(result: &T) -> Result<Value, ErrorData> {
    serde_json::to_value(result)
        .map_err(|e| ErrorData::internal_error(format!("Failed to serialize result: {e}")))
}

fn handle_initialize(
    state: &McpState,
    session_id: &str,
    message: &JsonRpcMessage,
) -> Result<Value, ErrorData> {
    let params: InitializeParams = message.params_as("initialize")?;
    if params.protocol_version != PROTOCOL_VERSION {
        tracing::debug!(
            requested = %params.protocol_version,
            offered = PROTOCOL_VERSION,
            "Client asked for another protocol version"
        );
    }
    state.sessions.set_initialized(session_id, params.client_info);

    let mut capabilities = ServerCapabilities::default().enable_tools();
    if !state.gateway.registry().resources().is_empty() {
        capabilities = capabilities.enable_resources();
    }

    let mut result = InitializeResult::new(state.server_info.clone(), capabilities);
    if let Some(instructions) = &state.instructions {
        result = result.with_instructions(instructions.clone());
    }
    to_value(&result)
}

fn handle_list_tools(state: &McpState) -> Result<Value, ErrorData> {
    let tools = state
        .gateway
        .registry()
        .descriptors()
        .iter()
        .map(Tool::from)
        .collect();
    to_value(&ListToolsResult { tools })
}

async fn handle_call_tool(
    state: &McpState,
    session_id: &str,
    message: &JsonRpcMessage,
    cancel: &CancellationToken,
) -> Result<Value, ErrorData> {
    let params: CallToolParams = message.params_as("call")?;
    let arguments = Value::Object(params.arguments.unwrap_or_else(Map::new));

    let tool_span = tracing::info_span!(
        "mcp.tool.call",
        mcp.tool.name = %params.name,
        mcp.session_id = %session_id,
    );

    let invocation = state
        .gateway
        .invoke(InvocationRequest::new(params.name, arguments))
        .instrument(tool_span);

    // Losing the race drops the invocation and with it any upstream request.
    let result = tokio::select! {
        result = invocation => result,
        _ = cancel.cancelled() => return Err(ErrorData::request_cancelled()),
    };

    to_value(&CallToolResult::from(result))
}

fn handle_list_resources(state: &McpState) -> Result<Value, ErrorData> {
    to_value(&ListResourcesResult {
        resources: state.gateway.registry().resources(),
    })
}

fn handle_read_resource(state: &McpState, message: &JsonRpcMessage) -> Result<Value, ErrorData> {
    let params: ReadResourceParams = message.params_as("read")?;

    let _span = tracing::info_span!("mcp.resource.read", mcp.resource.uri = %params.uri).entered();
    let resource = state
        .gateway
        .registry()
        .resource(&params.uri)
        .ok_or_else(|| ErrorData::resource_not_found(&params.uri))?;

    to_value(&ReadResourceResult::from(resource))
}
