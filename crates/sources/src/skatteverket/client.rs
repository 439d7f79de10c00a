use super::models::{PropertyTaxPageRequest, SearchPropertyTaxRequest, TypeCodePageRequest};
use crate::http::{HttpSource, QueryParams};
use serde_json::{json, Value};
use switchboard::AdapterError;
use tracing::{info, warn};

/// Rowstore datasets published by Skatteverket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    /// Taxeringsenheter, typkoder.
    TypeCodes,
    /// Fastighetsskatt och fastighetsavgift.
    PropertyTax,
}

impl Dataset {
    pub fn id(self) -> &'static str {
        match self {
            Dataset::TypeCodes => "0db155d8-4a46-4b14-aba6-3531ef4141c7",
            Dataset::PropertyTax => "ed6459d5-66ae-48a7-bcc8-4bd128f719db",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SkatteverketClient {
    http: HttpSource,
}

impl SkatteverketClient {
    pub fn new(http: HttpSource) -> Self {
        Self { http }
    }

    pub fn dataset_url(&self, dataset: Dataset) -> String {
        self.http.url(dataset.id())
    }

    async fn query(&self, dataset: Dataset, params: QueryParams) -> Result<Value, AdapterError> {
        info!(dataset = dataset.id(), params = ?params.pairs(), "querying skatteverket rowstore");
        self.http.get_json(&self.dataset_url(dataset), &params).await
    }

    pub async fn get_type_code(&self, typkod: &str) -> Result<Value, AdapterError> {
        let params = QueryParams::new().set("typkod", typkod).set("_limit", 1);
        let page = self.query(Dataset::TypeCodes, params).await?;

        let result = rows(&page).first().cloned();
        if result.is_none() {
            warn!(typkod, "type code not found");
        }

        Ok(json!({
            "typkod": typkod.trim(),
            "found": result.is_some(),
            "result": result,
        }))
    }

    pub async fn search_type_codes(&self, description: &str) -> Result<Value, AdapterError> {
        let params = QueryParams::new()
            .set("beskrivning", description)
            .set("_limit", 100);
        let page = self.query(Dataset::TypeCodes, params).await?;

        let results = rows(&page).to_vec();
        if results.is_empty() {
            warn!(description, "no type codes matched");
        }

        Ok(json!({
            "description": description.trim(),
            "results": results,
        }))
    }

    pub async fn list_type_codes(&self, page: &TypeCodePageRequest) -> Result<Value, AdapterError> {
        let params = paging(page.limit, page.offset);
        self.query(Dataset::TypeCodes, params).await
    }

    pub async fn search_property_tax(
        &self,
        request: &SearchPropertyTaxRequest,
    ) -> Result<Value, AdapterError> {
        let params = paging(request.page.limit, request.page.offset)
            .set_opt("uppdateringsdatum", request.uppdateringsdatum.as_deref())
            .set_opt("gruppering", request.gruppering.as_deref())
            .set_opt("grupperingsvärde", request.grupperingsvarde.as_deref())
            .set_opt("statistikterm", request.statistikterm.as_deref())
            .set_opt("antal", request.antal.as_deref())
            .set_opt("belopp", request.belopp.as_deref())
            .set_opt("inkomstar", request.inkomstar.as_deref());
        self.query(Dataset::PropertyTax, params).await
    }

    pub async fn list_property_tax(
        &self,
        page: &PropertyTaxPageRequest,
    ) -> Result<Value, AdapterError> {
        let params = paging(page.limit, page.offset);
        self.query(Dataset::PropertyTax, params).await
    }
}

fn paging(limit: u32, offset: u32) -> QueryParams {
    QueryParams::new().set("_limit", limit).set("_offset", offset)
}

fn rows(page: &Value) -> &[Value] {
    page.get("results")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
