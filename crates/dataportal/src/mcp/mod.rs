//! Model Context Protocol surface over the dispatch gateway.
//!
//! Implements the MCP 2025-06-18 lifecycle, tool and resource methods. The
//! protocol core in [`protocol`] is transport-neutral; [`streamable`] serves it
//! over HTTP and `crate::stdio` over newline-delimited stdin/stdout.

pub mod error;
pub mod jsonrpc;
pub mod protocol;
pub mod session;
pub mod streamable;
pub mod types;

pub use error::ErrorData;
pub use jsonrpc::{JsonRpcMessage, RequestId};
pub use protocol::{accept, answer, handle_bytes, Intake, PendingRequest, Reply};
pub use session::{spawn_cleanup_task, SessionStats, SessionStore};
pub use streamable::router;
pub use types::{CallToolResult, Implementation, PROTOCOL_VERSION};

use std::sync::Arc;
use switchboard::Gateway;

const INSTRUCTIONS: &str = "Tools for Swedish public open data. Tool names are \
`<source>.<operation>`: `riksdagen.*` covers parliamentary documents, members \
and calendar events; `skatteverket.*` covers taxeringsenhet type codes and \
property tax statistics. Failed calls return isError with a stable `kind` and \
a `retriable` flag in structuredContent.";

/// Shared state for every MCP transport.
pub struct McpState {
    pub gateway: Arc<Gateway>,
    pub sessions: Arc<SessionStore>,
    pub server_info: Implementation,
    pub instructions: Option<String>,
}

impl McpState {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self {
            gateway,
            sessions: Arc::new(SessionStore::new()),
            server_info: Implementation::new("dataportal", env!("CARGO_PKG_VERSION"))
                .with_title("Sveriges dataportal"),
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }
}
