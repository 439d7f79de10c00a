//! Riksdagen (the Swedish Parliament): documents, members and calendar events.
//!
//! All list operations share `data.riksdagen.se/dokumentlista/`, selected by
//! `avd`; single documents come from `data.riksdagen.se/dokument/`.

mod client;
pub mod models;

pub use client::{normalize_document_url, RiksdagenClient, Section};

use crate::http::{HttpSource, SourceBuildError};
use crate::parse_arguments;
use async_trait::async_trait;
use models::{DocumentList, FetchDocumentRequest, FetchedDocument, ListDocumentsRequest};
use models::{ListMembersRequest, MemberList};
use portalconf::AdapterConfig;
use serde_json::Value;
use std::sync::Arc;
use switchboard::{schema_for, AdapterError, ResourceDescriptor, SourceTool, ToolProvider};

pub const PREFIX: &str = "riksdagen";

const DATAPORTAL_DOCUMENTS: &str = "https://www.dataportal.se/dataservice/98_3023";
const DATAPORTAL_MEMBERS: &str = "https://www.dataportal.se/dataservice/98_3022";
const DATAPORTAL_CALENDAR: &str = "https://www.dataportal.se/dataservice/98_3019";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiksdagenOp {
    ListDocuments,
    FetchDocument,
    ListMembers,
    ListCalendar,
    FetchCalendarEvent,
}

impl RiksdagenOp {
    pub const ALL: [RiksdagenOp; 5] = [
        RiksdagenOp::ListDocuments,
        RiksdagenOp::FetchDocument,
        RiksdagenOp::ListMembers,
        RiksdagenOp::ListCalendar,
        RiksdagenOp::FetchCalendarEvent,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RiksdagenOp::ListDocuments => "list_documents",
            RiksdagenOp::FetchDocument => "fetch_document",
            RiksdagenOp::ListMembers => "list_members",
            RiksdagenOp::ListCalendar => "list_calendar",
            RiksdagenOp::FetchCalendarEvent => "fetch_calendar_event",
        }
    }

    fn title(self) -> &'static str {
        match self {
            RiksdagenOp::ListDocuments => "List Riksdagen documents",
            RiksdagenOp::FetchDocument => "Fetch a Riksdagen document",
            RiksdagenOp::ListMembers => "List members of the Riksdag",
            RiksdagenOp::ListCalendar => "List Riksdagen calendar events",
            RiksdagenOp::FetchCalendarEvent => "Fetch a Riksdagen calendar event",
        }
    }

    fn description(self) -> &'static str {
        match self {
            RiksdagenOp::ListDocuments => {
                "Search the Riksdagen document list (motions, propositions, committee reports \
                 and more). Filter by document type, free text, session, date range and organ."
            }
            RiksdagenOp::FetchDocument => {
                "Fetch one Riksdagen document by dok_id or URL as text, html or json."
            }
            RiksdagenOp::ListMembers => {
                "Search members of the Riksdag with party, constituency and assignments."
            }
            RiksdagenOp::ListCalendar => {
                "List Riksdagen calendar events such as committee meetings and debates. \
                 Filter by type, free text, session, date range and organ."
            }
            RiksdagenOp::FetchCalendarEvent => {
                "Fetch one Riksdagen calendar event document by dok_id or URL as text, html or json."
            }
        }
    }

    fn input_schema(self) -> Value {
        match self {
            RiksdagenOp::ListDocuments | RiksdagenOp::ListCalendar => {
                schema_for::<ListDocumentsRequest>()
            }
            RiksdagenOp::FetchDocument | RiksdagenOp::FetchCalendarEvent => {
                schema_for::<FetchDocumentRequest>()
            }
            RiksdagenOp::ListMembers => schema_for::<ListMembersRequest>(),
        }
    }

    fn output_schema(self) -> Value {
        match self {
            RiksdagenOp::ListDocuments | RiksdagenOp::ListCalendar => schema_for::<DocumentList>(),
            RiksdagenOp::FetchDocument | RiksdagenOp::FetchCalendarEvent => {
                schema_for::<FetchedDocument>()
            }
            RiksdagenOp::ListMembers => schema_for::<MemberList>(),
        }
    }
}

/// One Riksdagen operation bound to a shared client.
pub struct RiksdagenTool {
    op: RiksdagenOp,
    client: Arc<RiksdagenClient>,
}

#[async_trait]
impl SourceTool for RiksdagenTool {
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
            RiksdagenOp::ListDocuments => {
                let request = parse_arguments(arguments)?;
                self.client.list_documents(Section::Documents, &request).await
            }
            RiksdagenOp::ListCalendar => {
                let request = parse_arguments(arguments)?;
                self.client.list_documents(Section::Calendar, &request).await
            }
            RiksdagenOp::ListMembers => {
                let request = parse_arguments(arguments)?;
                self.client.list_members(&request).await
            }
            RiksdagenOp::FetchDocument | RiksdagenOp::FetchCalendarEvent => {
                let request = parse_arguments(arguments)?;
                self.client.fetch_document(&request).await
            }
        }
    }
}

pub struct RiksdagenProvider {
    client: Arc<RiksdagenClient>,
}

impl RiksdagenProvider {
    pub fn new(config: AdapterConfig) -> Result<Self, SourceBuildError> {
        let http = HttpSource::new(config)?;
        Ok(Self {
            client: Arc::new(RiksdagenClient::new(http)),
        })
    }
}

impl ToolProvider for RiksdagenProvider {
    fn prefix(&self) -> &str {
        PREFIX
    }

    fn tools(&self) -> Vec<Arc<dyn SourceTool>> {
        RiksdagenOp::ALL
            .into_iter()
            .map(|op| {
                Arc::new(RiksdagenTool {
                    op,
                    client: self.client.clone(),
                }) as Arc<dyn SourceTool>
            })
            .collect()
    }

    fn resources(&self) -> Vec<ResourceDescriptor> {
        vec![
            ResourceDescriptor::new(
                self.client.list_url(),
                "riksdagen-api",
                "API base URL for Riksdagen document, member and calendar lists",
            )
            .with_title("Riksdagen API base URL"),
            ResourceDescriptor::new(
                DATAPORTAL_DOCUMENTS,
                "riksdagen-documents-dataportal",
                "Sveriges Dataportal listing for Riksdagen documents",
            )
            .with_title("Riksdagen documents on Sveriges Dataportal"),
            ResourceDescriptor::new(
                DATAPORTAL_MEMBERS,
                "riksdagen-members-dataportal",
                "Sveriges Dataportal listing for members of the Riksdag",
            )
            .with_title("Riksdagen members on Sveriges Dataportal"),
            ResourceDescriptor::new(
                DATAPORTAL_CALENDAR,
                "riksdagen-calendar-dataportal",
                "Sveriges Dataportal listing for the Riksdagen calendar",
            )
            .with_title("Riksdagen calendar on Sveriges Dataportal"),
        ]
    }
}
