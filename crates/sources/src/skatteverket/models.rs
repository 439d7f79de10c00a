//! Argument and payload types for Skatteverket's EntryScape rowstore datasets.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetTypeCodeRequest {
    /// The type code to look up, e.g. `120`.
    #[schemars(length(min = 1, max = 5))]
    #[schemars(extend("x-coerce" = "string"))]
    pub typkod: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchTypeCodesRequest {
    /// Text to look for in the type code description, e.g. `Lantbruksenhet`.
    #[schemars(length(min = 1, max = 100))]
    pub description: String,
}

/// Pagination for the type code dataset.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TypeCodePageRequest {
    /// Rows per page, 1 to 100.
    #[serde(default = "default_limit")]
    #[schemars(range(min = 1, max = 100))]
    #[schemars(extend("x-coerce" = "integer"))]
    pub limit: u32,
    /// Rows to skip.
    #[serde(default)]
    #[schemars(extend("x-coerce" = "integer"))]
    pub offset: u32,
}

/// Pagination for the property tax dataset.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct PropertyTaxPageRequest {
    /// Rows per page, 1 to 500.
    #[serde(default = "default_limit")]
    #[schemars(range(min = 1, max = 500))]
    #[schemars(extend("x-coerce" = "integer"))]
    pub limit: u32,
    /// Rows to skip.
    #[serde(default)]
    #[schemars(extend("x-coerce" = "integer"))]
    pub offset: u32,
}

/// Column filters for the property tax dataset. Each filter keeps only rows
/// whose column matches; regular expressions are allowed.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchPropertyTaxRequest {
    /// Date the row was last updated.
    pub uppdateringsdatum: Option<String>,
    /// Grouping, e.g. `Typkod`.
    pub gruppering: Option<String>,
    /// Value within the grouping.
    pub grupperingsvarde: Option<String>,
    /// Statistic, e.g. `Fastighetsskatt` or `Fastighetsavgift`.
    pub statistikterm: Option<String>,
    pub antal: Option<String>,
    pub belopp: Option<String>,
    /// Income year.
    pub inkomstar: Option<String>,
    #[serde(flatten)]
    pub page: PropertyTaxPageRequest,
}

fn default_limit() -> u32 {
    10
}

/// A page of rows as returned by the rowstore API.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RowstorePage<T> {
    /// URL of the next page, when there is one.
    pub next: Option<String>,
    /// Total number of matching rows.
    #[serde(rename = "resultCount", default)]
    #[schemars(extend("x-coerce" = "integer"))]
    pub result_count: Option<u64>,
    #[serde(default)]
    #[schemars(extend("x-coerce" = "integer"))]
    pub offset: Option<u64>,
    #[serde(default)]
    #[schemars(extend("x-coerce" = "integer"))]
    pub limit: Option<u64>,
    /// Upstream query time in milliseconds.
    #[serde(rename = "queryTime", default)]
    #[schemars(extend("x-coerce" = "integer"))]
    pub query_time: Option<u64>,
    #[schemars(extend("x-coerce" = "array"))]
    pub results: Vec<T>,
}

/// A taxeringsenhet type code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TypeCode {
    #[schemars(extend("x-coerce" = "string"))]
    pub typkod: String,
    pub beskrivning: String,
}

/// Result of a single type code lookup.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TypeCodeLookup {
    /// The code that was looked up.
    pub typkod: String,
    pub found: bool,
    pub result: Option<TypeCode>,
}

/// Type codes whose description matched.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TypeCodeMatches {
    pub description: String,
    pub results: Vec<TypeCode>,
}

/// One row of property tax and fee statistics.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PropertyTaxRow {
    #[schemars(extend("x-coerce" = "string"))]
    pub uppdateringsdatum: Option<String>,
    pub gruppering: Option<String>,
    #[serde(rename = "grupperingsvärde")]
    #[schemars(extend("x-coerce" = "string"))]
    pub grupperingsvarde: Option<String>,
    pub statistikterm: Option<String>,
    #[schemars(extend("x-coerce" = "string"))]
    pub antal: Option<String>,
    #[schemars(extend("x-coerce" = "string"))]
    pub belopp: Option<String>,
    #[schemars(extend("x-coerce" = "string"))]
    pub inkomstar: Option<String>,
}

pub type TypeCodePage = RowstorePage<TypeCode>;
pub type PropertyTaxPage = RowstorePage<PropertyTaxRow>;
