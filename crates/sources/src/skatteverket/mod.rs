//! Skatteverket (the Swedish Tax Agency) open datasets on EntryScape rowstore.

mod client;
pub mod models;

pub use client::{Dataset, SkatteverketClient};

use crate::http::{HttpSource, SourceBuildError};
use crate::parse_arguments;
use async_trait::async_trait;
use models::{
    GetTypeCodeRequest, PropertyTaxPage, PropertyTaxPageRequest, SearchPropertyTaxRequest,
    SearchTypeCodesRequest, TypeCodeLookup, TypeCodeMatches, TypeCodePage, TypeCodePageRequest,
};
use portalconf::AdapterConfig;
use serde_json::Value;
use std::sync::Arc;
use switchboard::{schema_for, AdapterError, ResourceDescriptor, SourceTool, ToolProvider};

pub const PREFIX: &str = "skatteverket";

const SWAGGER_BASE: &str = "https://swagger.entryscape.com/?url=";
const DATAPORTAL_TYPE_CODES: &str = "https://www.dataportal.se/datasets/6_67905";
const DATAPORTAL_PROPERTY_TAX: &str = "https://www.dataportal.se/datasets/6_75017";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkatteverketOp {
    GetTypeCode,
    SearchTypeCodes,
    ListTypeCodes,
    SearchPropertyTax,
    ListPropertyTax,
}

impl SkatteverketOp {
    pub const ALL: [SkatteverketOp; 5] = [
        SkatteverketOp::GetTypeCode,
        SkatteverketOp::SearchTypeCodes,
        SkatteverketOp::ListTypeCodes,
        SkatteverketOp::SearchPropertyTax,
        SkatteverketOp::ListPropertyTax,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SkatteverketOp::GetTypeCode => "get_typkod",
            SkatteverketOp::SearchTypeCodes => "search_typkoder",
            SkatteverketOp::ListTypeCodes => "list_typkoder",
            SkatteverketOp::SearchPropertyTax => "search_property_tax",
            SkatteverketOp::ListPropertyTax => "list_property_tax",
        }
    }

    fn title(self) -> &'static str {
        match self {
            SkatteverketOp::GetTypeCode => "Get a taxeringsenhet type code",
            SkatteverketOp::SearchTypeCodes => "Search taxeringsenhet type codes",
            SkatteverketOp::ListTypeCodes => "List taxeringsenhet type codes",
            SkatteverketOp::SearchPropertyTax => "Search property tax statistics",
            SkatteverketOp::ListPropertyTax => "List property tax statistics",
        }
    }

    fn description(self) -> &'static str {
        match self {
            SkatteverketOp::GetTypeCode => {
                "Look up one taxeringsenhet (assessment unit) type code and its description."
            }
            SkatteverketOp::SearchTypeCodes => {
                "Find taxeringsenhet type codes whose description contains the given text."
            }
            SkatteverketOp::ListTypeCodes => "Page through all taxeringsenhet type codes.",
            SkatteverketOp::SearchPropertyTax => {
                "Search fastighetsskatt and fastighetsavgift statistics by column. \
                 Every filter accepts a regular expression."
            }
            SkatteverketOp::ListPropertyTax => {
                "Page through fastighetsskatt and fastighetsavgift statistics."
            }
        }
    }

    fn input_schema(self) -> Value {
        match self {
            SkatteverketOp::GetTypeCode => schema_for::<GetTypeCodeRequest>(),
            SkatteverketOp::SearchTypeCodes => schema_for::<SearchTypeCodesRequest>(),
            SkatteverketOp::ListTypeCodes => schema_for::<TypeCodePageRequest>(),
            SkatteverketOp::SearchPropertyTax => schema_for::<SearchPropertyTaxRequest>(),
            SkatteverketOp::ListPropertyTax => schema_for::<PropertyTaxPageRequest>(),
        }
    }

    fn output_schema(self) -> Value {
        match self {
            SkatteverketOp::GetTypeCode => schema_for::<TypeCodeLookup>(),
            SkatteverketOp::SearchTypeCodes => schema_for::<TypeCodeMatches>(),
            SkatteverketOp::ListTypeCodes => schema_for::<TypeCodePage>(),
            SkatteverketOp::SearchPropertyTax | SkatteverketOp::ListPropertyTax => {
                schema_for::<PropertyTaxPage>()
            }
        }
    }
}

pub struct SkatteverketTool {
    op: SkatteverketOp,
    client: Arc<SkatteverketClient>,
}

#[async_trait]
impl SourceTool for SkatteverketTool {
    fn name(&self) -> &str {
        self.op.name()
    }

    fn title(&self) -> Option<&str> {
        Some(self.op.title())
    }

    fn description(&self) -> &str {
        self.op.description()
    }

    fn input_schema(&self) -> Value {
        self.op.input_schema()
    }

    fn output_schema(&self) -> Value {
        self.op.output_schema()
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, AdapterError> {
        match self.op {
            SkatteverketOp::GetTypeCode => {
                let request: GetTypeCodeRequest = parse_arguments(arguments)?;
                self.client.get_type_code(&request.typkod).await
            }
            SkatteverketOp::SearchTypeCodes => {
                let request: SearchTypeCodesRequest = parse_arguments(arguments)?;
                self.client.search_type_codes(&request.description).await
            }
            SkatteverketOp::ListTypeCodes => {
                let request = parse_arguments(arguments)?;
                self.client.list_type_codes(&request).await
            }
            SkatteverketOp::SearchPropertyTax => {
                let request = parse_arguments(arguments)?;
                self.client.search_property_tax(&request).await
            }
            SkatteverketOp::ListPropertyTax => {
                let request = parse_arguments(arguments)?;
                self.client.list_property_tax(&request).await
            }
        }
    }
}

pub struct SkatteverketProvider {
    client: Arc<SkatteverketClient>,
}

impl SkatteverketProvider {
    pub fn new(config: AdapterConfig) -> Result<Self, SourceBuildError> {
        let http = HttpSource::new(config)?;
        Ok(Self {
            client: Arc::new(SkatteverketClient::new(http)),
        })
    }

    fn dataset_resources(
        &self,
        dataset: Dataset,
        slug: &str,
        label: &str,
        dataportal: &str,
    ) -> Vec<ResourceDescriptor> {
        let api = self.client.dataset_url(dataset);
        let swagger = format!("{SWAGGER_BASE}{}", encode_component(&format!("{api}/swagger")));

        vec![
            ResourceDescriptor::new(
                api,
                format!("skatteverket-{slug}-api"),
                format!("API base URL for {label}"),
            )
            .with_title(format!("{label} API base URL")),
            ResourceDescriptor::new(
                swagger,
                format!("skatteverket-{slug}-swagger"),
                format!("Swagger UI to explore the {label} API"),
            )
            .with_title(format!("{label} Swagger documentation")),
            ResourceDescriptor::new(
                dataportal,
                format!("skatteverket-{slug}-dataportal"),
                "Sveriges Dataportal page where this dataset is listed",
            )
            .with_title(format!("{label} on Sveriges Dataportal")),
        ]
    }
}

impl ToolProvider for SkatteverketProvider {
    fn prefix(&self) -> &str {
        PREFIX
    }

    fn tools(&self) -> Vec<Arc<dyn SourceTool>> {
        SkatteverketOp::ALL
            .into_iter()
            .map(|op| {
                Arc::new(SkatteverketTool {
                    op,
                    client: self.client.clone(),
                }) as Arc<dyn SourceTool>
            })
            .collect()
    }

    fn resources(&self) -> Vec<ResourceDescriptor> {
        let mut resources = self.dataset_resources(
            Dataset::TypeCodes,
            "typkoder",
            "Taxeringsenhet type codes",
            DATAPORTAL_TYPE_CODES,
        );
        resources.extend(self.dataset_resources(
            Dataset::PropertyTax,
            "fastighetsskatt",
            "Property tax and fees",
            DATAPORTAL_PROPERTY_TAX,
        ));
        resources
    }
}

// Percent-encode everything outside the URL unreserved set.
fn encode_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swagger_url_matches_published_link() {
        let provider = SkatteverketProvider::new(AdapterConfig::new(
            "https://skatteverket.entryscape.net/rowstore/dataset",
        ))
        .unwrap();

        let resources = provider.resources();
        assert_eq!(resources.len(), 6);
        assert_eq!(
            resources[1].uri,
            "https://swagger.entryscape.com/?url=https%3A%2F%2Fskatteverket.entryscape.net\
             %2Frowstore%2Fdataset%2F0db155d8-4a46-4b14-aba6-3531ef4141c7%2Fswagger"
        );
        assert_eq!(
            resources[3].uri,
            "https://skatteverket.entryscape.net/rowstore/dataset/ed6459d5-66ae-48a7-bcc8-4bd128f719db"
        );
    }
}
