//! Name -> descriptor mapping, frozen after startup.

use crate::tool::{ResourceDescriptor, ToolDescriptor, ToolProvider};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("tool `{0}` is already registered")]
    DuplicateName(String),

    #[error("tool `{0}` is not registered")]
    NotFound(String),

    #[error("invalid tool name `{0}`: expected `<prefix>.<tool>`")]
    InvalidName(String),

    #[error("resource `{0}` is already registered")]
    DuplicateResource(String),
}

/// Collects tools during startup. Consumed by [`RegistryBuilder::build`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    tools: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
    resources: Vec<ResourceDescriptor>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one descriptor. Names are compared case-sensitively.
    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<(), RegistryError> {
        check_name(&descriptor.name)?;
        if self.index.contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicateName(descriptor.name));
        }

        debug!(tool = %descriptor.name, "registered tool");
        self.index.insert(descriptor.name.clone(), self.tools.len());
        self.tools.push(descriptor);
        Ok(())
    }

    /// Register every tool and resource of `provider` under its prefix.
    ///
    /// Either all of the provider's tools are added or none are.
    pub fn register_provider(&mut self, provider: &dyn ToolProvider) -> Result<usize, RegistryError> {
        let prefix = provider.prefix();
        let descriptors: Vec<ToolDescriptor> = provider
            .tools()
            .into_iter()
            .map(|tool| ToolDescriptor::from_tool(prefix, tool))
            .collect();

        {
            let mut seen = HashSet::new();
            for descriptor in &descriptors {
                check_name(&descriptor.name)?;
                if self.index.contains_key(&descriptor.name)
                    || !seen.insert(descriptor.name.as_str())
                {
                    return Err(RegistryError::DuplicateName(descriptor.name.clone()));
                }
            }
        }

        let resources = provider.resources();
        {
            let mut seen = HashSet::new();
            for resource in &resources {
                if self.resources.iter().any(|r| r.uri == resource.uri)
                    || !seen.insert(resource.uri.as_str())
                {
                    return Err(RegistryError::DuplicateResource(resource.uri.clone()));
                }
            }
        }

        let count = descriptors.len();
        for descriptor in descriptors {
            self.register(descriptor)?;
        }
        self.resources.extend(resources);

        debug!(prefix, tools = count, "registered provider");
        Ok(count)
    }

    pub fn build(self) -> Registry {
        Registry {
            tools: self.tools,
            index: self.index,
            resources: self.resources,
        }
    }
}

/// Immutable tool registry. Share it behind an `Arc`; reads need no locking.
#[derive(Debug)]
pub struct Registry {
    tools: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
    resources: Vec<ResourceDescriptor>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn resolve(&self, name: &str) -> Result<&ToolDescriptor, RegistryError> {
        self.index
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// All tools in registration order.
    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Distinct prefixes, in registration order.
    pub fn prefixes(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for tool in &self.tools {
            let prefix = tool.prefix();
            if !seen.contains(&prefix) {
                seen.push(prefix);
            }
        }
        seen
    }

    pub fn resources(&self) -> &[ResourceDescriptor] {
        &self.resources
    }

    pub fn resource(&self, uri: &str) -> Option<&ResourceDescriptor> {
        self.resources.iter().find(|r| r.uri == uri)
    }
}

fn check_name(name: &str) -> Result<(), RegistryError> {
    let valid_part = |s: &str| {
        !s.is_empty()
            && s.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    };

    match name.split_once('.') {
        Some((prefix, local)) if valid_part(prefix) && valid_part(local) => Ok(()),
        _ => Err(RegistryError::InvalidName(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::AdapterError;
    use crate::tool::SourceTool;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Arc;

    struct Named(&'static str);

    #[async_trait]
    impl SourceTool for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "test tool"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object"})
        }

        fn output_schema(&self) -> Value {
            json!({"type": "object"})
        }

        async fn invoke(&self, _arguments: Value) -> Result<Value, AdapterError> {
            Ok(json!({}))
        }
    }

    struct Provider {
        prefix: &'static str,
        names: Vec<&'static str>,
    }

    impl ToolProvider for Provider {
        fn prefix(&self) -> &str {
            self.prefix
        }

        fn tools(&self) -> Vec<Arc<dyn SourceTool>> {
            self.names
                .iter()
                .map(|n| Arc::new(Named(n)) as Arc<dyn SourceTool>)
                .collect()
        }

        fn resources(&self) -> Vec<ResourceDescriptor> {
            vec![ResourceDescriptor::new(
                format!("https://{}.example/", self.prefix),
                format!("{}-docs", self.prefix),
                "docs",
            )]
        }
    }

    fn descriptor(prefix: &str, name: &'static str) -> ToolDescriptor {
        ToolDescriptor::from_tool(prefix, Arc::new(Named(name)))
    }

    #[test]
    fn test_resolve_returns_registered_descriptor() {
        let original = descriptor("alpha", "lookup");
        let handler = original.handler.clone();

        let mut builder = Registry::builder();
        builder.register(original).unwrap();
        let registry = builder.build();

        let resolved = registry.resolve("alpha.lookup").unwrap();
        assert_eq!(resolved.name, "alpha.lookup");
        assert!(Arc::ptr_eq(&resolved.handler, &handler));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut builder = Registry::builder();
        builder.register(descriptor("alpha", "lookup")).unwrap();
        let err = builder.register(descriptor("alpha", "lookup")).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateName("alpha.lookup".into()));
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let mut builder = Registry::builder();
        builder.register(descriptor("alpha", "lookup")).unwrap();
        builder.register(descriptor("alpha", "Lookup")).unwrap();
        let registry = builder.build();

        assert_eq!(registry.len(), 2);
        assert!(registry.resolve("ALPHA.lookup").is_err());
    }

    #[test]
    fn test_unknown_name_is_not_found() {
        let registry = Registry::builder().build();
        assert_eq!(
            registry.resolve("unknown_provider.lookup").unwrap_err(),
            RegistryError::NotFound("unknown_provider.lookup".into())
        );
    }

    #[test]
    fn test_unprefixed_name_rejected() {
        let mut builder = Registry::builder();
        let mut bare = descriptor("alpha", "lookup");
        bare.name = "lookup".into();
        assert!(matches!(
            builder.register(bare),
            Err(RegistryError::InvalidName(_))
        ));
        assert!(matches!(
            builder.register(descriptor("", "lookup")),
            Err(RegistryError::InvalidName(_))
        ));
    }

    #[test]
    fn test_provider_registration_namespaces_tools() {
        let mut builder = Registry::builder();
        let count = builder
            .register_provider(&Provider {
                prefix: "alpha",
                names: vec!["one", "two"],
            })
            .unwrap();
        builder
            .register_provider(&Provider {
                prefix: "beta",
                names: vec!["one"],
            })
            .unwrap();
        let registry = builder.build();

        assert_eq!(count, 2);
        let names: Vec<_> = registry.descriptors().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["alpha.one", "alpha.two", "beta.one"]);
        assert_eq!(registry.prefixes(), vec!["alpha", "beta"]);
        assert_eq!(registry.resources().len(), 2);
        assert!(registry.resource("https://beta.example/").is_some());
    }

    #[test]
    fn test_provider_with_clash_adds_nothing() {
        let mut builder = Registry::builder();
        builder.register(descriptor("alpha", "two")).unwrap();

        let err = builder
            .register_provider(&Provider {
                prefix: "alpha",
                names: vec!["one", "two"],
            })
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateName("alpha.two".into()));

        let registry = builder.build();
        assert_eq!(registry.len(), 1);
        assert!(registry.resolve("alpha.one").is_err());
        assert!(registry.resources().is_empty());
    }

    struct Mirrored;

    impl ToolProvider for Mirrored {
        fn prefix(&self) -> &str {
            "mirror"
        }

        fn tools(&self) -> Vec<Arc<dyn SourceTool>> {
            vec![Arc::new(Named("one")) as Arc<dyn SourceTool>]
        }

        fn resources(&self) -> Vec<ResourceDescriptor> {
            let docs = ResourceDescriptor::new("https://mirror.example/", "mirror-docs", "docs");
            vec![docs.clone(), docs.with_title("Mirror docs again")]
        }
    }

    #[test]
    fn test_provider_repeating_a_resource_uri_is_rejected() {
        let mut builder = Registry::builder();
        let err = builder.register_provider(&Mirrored).unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateResource("https://mirror.example/".into())
        );

        let registry = builder.build();
        assert!(registry.is_empty());
        assert!(registry.resources().is_empty());
    }
}
