//! The capability interface every source adapter implements.

use crate::failure::AdapterError;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// One schema-typed operation against an upstream data provider.
///
/// `invoke` receives arguments that already satisfy `input_schema`; adapters
/// do not validate them again.
#[async_trait]
pub trait SourceTool: Send + Sync {
    /// Name within the provider, without the prefix.
    fn name(&self) -> &str;

    fn title(&self) -> Option<&str> {
        None
    }

    fn description(&self) -> &str;

    fn input_schema(&self) -> Value;

    fn output_schema(&self) -> Value;

    async fn invoke(&self, arguments: Value) -> Result<Value, AdapterError>;
}

/// A bundle of tools and resources published under one namespace prefix.
pub trait ToolProvider: Send + Sync {
    /// Namespace for every tool in this provider, e.g. `riksdagen`.
    fn prefix(&self) -> &str;

    fn tools(&self) -> Vec<Arc<dyn SourceTool>>;

    fn resources(&self) -> Vec<ResourceDescriptor> {
        Vec::new()
    }
}

/// A registered tool. Immutable once created.
#[derive(Clone)]
pub struct ToolDescriptor {
    /// Fully namespaced, e.g. `riksdagen.list_documents`.
    pub name: String,
    pub title: Option<String>,
    pub description: String,
    pub input_schema: Value,
    pub output_schema: Value,
    pub handler: Arc<dyn SourceTool>,
}

impl ToolDescriptor {
    /// Capture a tool's metadata under `prefix`.
    pub fn from_tool(prefix: &str, tool: Arc<dyn SourceTool>) -> Self {
        Self {
            name: format!("{}.{}", prefix, tool.name()),
            title: tool.title().map(str::to_string),
            description: tool.description().to_string(),
            input_schema: tool.input_schema(),
            output_schema: tool.output_schema(),
            handler: tool,
        }
    }

    /// The namespace part of the name.
    pub fn prefix(&self) -> &str {
        self.name.split_once('.').map(|(p, _)| p).unwrap_or("")
    }
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("title", &self.title)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Static, readable documentation a provider publishes alongside its tools.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    pub uri: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub mime_type: String,
    /// Returned verbatim by `resources/read`.
    #[serde(skip)]
    pub text: String,
}

impl ResourceDescriptor {
    pub fn new(uri: impl Into<String>, name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            title: None,
            description: None,
            mime_type: "text/plain".to_string(),
            text: text.into(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
