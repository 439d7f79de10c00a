//! Argument and payload types for the Riksdagen open data API.
//!
//! Field names follow the upstream JSON so payloads pass through without
//! renaming. The API reports every number as a string; fields that are
//! numbers in spirit declare an `x-coerce` conversion instead.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Representation to fetch a single document in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    #[default]
    Text,
    Html,
    Json,
}

impl DocumentFormat {
    /// File extension used by `data.riksdagen.se/dokument/`.
    pub fn extension(self) -> &'static str {
        match self {
            DocumentFormat::Text => "text",
            DocumentFormat::Html => "html",
            DocumentFormat::Json => "json",
        }
    }
}

/// Filters for the document list (`avd=dokument`) and calendar (`avd=kalender`).
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListDocumentsRequest {
    /// Document type code, e.g. `mot` (motion), `prop` (proposition) or `bet` (committee report).
    pub doktyp: Option<String>,
    /// Free-text search.
    pub sok: Option<String>,
    /// Parliamentary session, e.g. `2023/24`.
    pub rm: Option<String>,
    /// From date, `YYYY-MM-DD`.
    pub datum: Option<String>,
    /// To date, `YYYY-MM-DD`.
    pub tom: Option<String>,
    /// Committee or organ code, e.g. `FiU`.
    pub organ: Option<String>,
    /// Sort field. Defaults to `rel` (relevance).
    pub sort: Option<String>,
    pub sortorder: Option<SortOrder>,
    /// Page number, starting at 1.
    #[schemars(range(min = 1))]
    #[schemars(extend("x-coerce" = "integer"))]
    pub p: Option<u32>,
}

/// Filters for the member list (`avd=ledamot`).
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListMembersRequest {
    /// Free-text search, e.g. a name.
    pub sok: Option<String>,
    /// From date, `YYYY-MM-DD`.
    pub datum: Option<String>,
    /// To date, `YYYY-MM-DD`.
    pub tom: Option<String>,
    /// Sort field. Defaults to `rel` (relevance).
    pub sort: Option<String>,
    pub sortorder: Option<SortOrder>,
    /// Page number, starting at 1.
    #[schemars(range(min = 1))]
    #[schemars(extend("x-coerce" = "integer"))]
    pub p: Option<u32>,
    /// Hits per page.
    #[schemars(range(min = 1, max = 500))]
    #[schemars(extend("x-coerce" = "integer"))]
    pub pagesize: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FetchDocumentRequest {
    /// A `dok_id` such as `HD096`, or a document URL (absolute, `//host/...` or `/dokument/...`).
    #[schemars(length(min = 1))]
    pub dok_id_or_url: String,
    #[serde(default)]
    pub fmt: DocumentFormat,
}

/// One page of `dokumentlista`. `T` is the row type for the requested `avd`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ListPage<T> {
    /// Total number of hits.
    #[serde(rename = "@traffar", default)]
    #[schemars(extend("x-coerce" = "integer"))]
    pub traffar: Option<u64>,
    /// Current page.
    #[serde(rename = "@sida", default)]
    #[schemars(extend("x-coerce" = "integer"))]
    pub sida: Option<u64>,
    /// Number of pages.
    #[serde(rename = "@sidor", default)]
    #[schemars(extend("x-coerce" = "integer"))]
    pub sidor: Option<u64>,
    #[serde(rename = "@traff_fran", default)]
    #[schemars(extend("x-coerce" = "integer"))]
    pub traff_fran: Option<u64>,
    #[serde(rename = "@traff_till", default)]
    #[schemars(extend("x-coerce" = "integer"))]
    pub traff_till: Option<u64>,
    /// URL of the next page, when there is one.
    #[serde(rename = "@nasta_sida", default)]
    pub nasta_sida: Option<String>,
    #[serde(rename = "@datum", default)]
    pub datum: Option<String>,
    #[serde(rename = "@q", default)]
    pub q: Option<String>,
    #[serde(rename = "@varning", default)]
    pub varning: Option<String>,
    #[serde(rename = "@version", default)]
    pub version: Option<String>,
    /// Always a list; empty when nothing matched.
    #[schemars(extend("x-coerce" = "array"))]
    pub dokument: Vec<T>,
}

pub type DocumentList = ListPage<Document>;
pub type MemberList = ListPage<Member>;

/// Sections a document is listed under.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Sections {
    #[serde(default)]
    #[schemars(extend("x-coerce" = "array"))]
    pub avdelning: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchData {
    pub titel: Option<String>,
    pub undertitel: Option<String>,
    pub soktyp: Option<String>,
    pub statusrad: Option<String>,
    pub brodsmula: Option<String>,
    pub kalenderprio: Option<String>,
    pub parti_kod: Option<String>,
    pub parti_namn: Option<String>,
    pub parti_website_url: Option<String>,
    pub parti_mandat: Option<String>,
}

/// A row of `dokumentlista` for documents and calendar events.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Document {
    pub id: Option<String>,
    pub dok_id: Option<String>,
    pub rm: Option<String>,
    pub beteckning: Option<String>,
    pub typ: Option<String>,
    pub subtyp: Option<String>,
    pub doktyp: Option<String>,
    pub dokumentnamn: Option<String>,
    pub organ: Option<String>,
    pub titel: Option<String>,
    pub undertitel: Option<String>,
    pub datum: Option<String>,
    pub publicerad: Option<String>,
    pub systemdatum: Option<String>,
    pub status: Option<String>,
    pub summary: Option<String>,
    pub notisrubrik: Option<String>,
    pub notis: Option<String>,
    pub nummer: Option<String>,
    pub tempbeteckning: Option<String>,
    pub beslutad: Option<String>,
    pub beslutsdag: Option<String>,
    pub debattnamn: Option<String>,
    pub kalla: Option<String>,
    pub lang: Option<String>,
    pub url: Option<String>,
    pub relurl: Option<String>,
    pub dokument_url_text: Option<String>,
    pub dokument_url_html: Option<String>,
    /// Relevance score.
    #[schemars(extend("x-coerce" = "string"))]
    pub score: Option<String>,
    pub avdelningar: Option<Sections>,
    pub sokdata: Option<SearchData>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PersonDetail {
    pub kod: Option<String>,
    pub uppgift: Option<String>,
    pub typ: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PersonDetails {
    #[serde(default)]
    #[schemars(extend("x-coerce" = "array"))]
    pub uppgift: Vec<PersonDetail>,
}

/// A position held, e.g. a committee seat.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Assignment {
    pub organ_kod: Option<String>,
    pub roll_kod: Option<String>,
    pub status: Option<String>,
    pub typ: Option<String>,
    pub from: Option<String>,
    pub tom: Option<String>,
    pub uppgift: Option<String>,
    #[schemars(extend("x-coerce" = "string"))]
    pub ordningsnummer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Assignments {
    #[serde(default)]
    #[schemars(extend("x-coerce" = "array"))]
    pub uppdrag: Vec<Assignment>,
}

/// A row of `dokumentlista` for `avd=ledamot`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Member {
    pub id: Option<String>,
    pub titel: Option<String>,
    pub tilltalsnamn: Option<String>,
    pub efternamn: Option<String>,
    /// Party abbreviation, e.g. `S` or `M`.
    pub parti: Option<String>,
    pub valkrets: Option<String>,
    #[schemars(extend("x-coerce" = "string"))]
    pub fodd_ar: Option<String>,
    pub iort: Option<String>,
    pub status: Option<String>,
    pub url: Option<String>,
    pub personuppgift: Option<PersonDetails>,
    pub personuppdrag: Option<Assignments>,
}

/// A single fetched document.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchedDocument {
    /// The URL the document was fetched from.
    pub url: String,
    pub format: DocumentFormat,
    /// Body for `text` and `html`.
    pub text: Option<String>,
    /// Parsed body for `json`. Its shape varies by document type.
    pub document: Option<serde_json::Value>,
}
