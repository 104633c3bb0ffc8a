//! Structured delivery through the Communicating With Congress API.
//!
//! Offices that accept CWC messages don't need their web form replayed: the
//! caller's fields are mapped onto a typed message and handed to a
//! [`MessagingApi`].

pub mod client;
pub mod xml;

pub use client::CwcHttpClient;

use crate::error::CwcError;
use crate::engine::FieldMap;
use crate::models::{FillOutcome, LegislatorProfile};
use crate::store::FillStatusSink;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Who is sending on behalf of the constituents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
}

impl Organization {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub member_office: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constituent {
    pub prefix: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Vec<String>,
    pub city: Option<String>,
    pub state_abbreviation: Option<String>,
    pub zip: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub subject: Option<String>,
    pub library_of_congress_topics: Vec<String>,
    pub organization_statement: Option<String>,
    pub constituent_message: Option<String>,
}

/// Everything a CWC message carries apart from the delivery envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CwcMessageParams {
    pub campaign_id: String,
    pub recipient: Recipient,
    pub organization: Option<Organization>,
    pub constituent: Constituent,
    pub message: MessageBody,
}

impl CwcMessageParams {
    /// Map caller fields onto a message for `member_office`.
    pub fn from_fields(
        fields: &FieldMap,
        member_office: impl Into<String>,
        campaign_id: impl Into<String>,
    ) -> Self {
        let owned = |key: &str| fields.get(key).map(str::to_string);

        let address = ["$ADDRESS_STREET", "$ADDRESS_STREET_2"]
            .iter()
            .filter_map(|key| fields.get(key))
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect();

        let statement = owned("$STATEMENT");
        let constituent_message = owned("$MESSAGE").filter(|message| Some(message) != statement.as_ref());

        Self {
            campaign_id: campaign_id.into(),
            recipient: Recipient {
                member_office: member_office.into(),
            },
            organization: None,
            constituent: Constituent {
                prefix: owned("$NAME_PREFIX"),
                first_name: owned("$NAME_FIRST"),
                last_name: owned("$NAME_LAST"),
                address,
                city: owned("$ADDRESS_CITY"),
                state_abbreviation: owned("$ADDRESS_STATE_POSTAL_ABBREV"),
                zip: owned("$ADDRESS_ZIP5"),
                email: owned("$EMAIL"),
            },
            message: MessageBody {
                subject: owned("$SUBJECT"),
                library_of_congress_topics: owned("$TOPIC").into_iter().collect(),
                organization_statement: statement,
                constituent_message,
            },
        }
    }
}

/// A message ready for validation or delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CwcMessage {
    pub delivery_id: String,
    pub params: CwcMessageParams,
    /// Rendered CWC XML document.
    pub document: String,
}

/// The structured messaging service.
#[async_trait]
pub trait MessagingApi: Send + Sync {
    fn create_message(&self, params: CwcMessageParams) -> Result<CwcMessage, CwcError>;

    async fn validate(&self, message: &CwcMessage) -> Result<(), CwcError>;

    async fn deliver(&self, message: &CwcMessage) -> Result<(), CwcError>;
}

/// Per-invocation options for [`CwcSubmitter::message_via_cwc`].
#[derive(Debug, Clone, Default)]
pub struct CwcRequest {
    pub campaign_tag: Option<String>,
    pub organization: Option<Organization>,
    pub validate_only: bool,
}

impl CwcRequest {
    pub fn with_campaign_tag(mut self, tag: impl Into<String>) -> Self {
        self.campaign_tag = Some(tag.into());
        self
    }

    pub fn with_organization(mut self, organization: Organization) -> Self {
        self.organization = Some(organization);
        self
    }

    pub fn validate_only(mut self) -> Self {
        self.validate_only = true;
        self
    }
}

#[derive(Debug)]
pub enum CwcDelivery {
    /// The API accepted the message without delivering it.
    Validated,
    Delivered(FillOutcome),
    /// The profile has no office code; use the web form instead.
    Unroutable,
}

pub struct CwcSubmitter {
    api: Arc<dyn MessagingApi>,
    sink: Option<Arc<dyn FillStatusSink>>,
    record_fill_statuses: bool,
}

impl CwcSubmitter {
    pub fn new(api: Arc<dyn MessagingApi>) -> Self {
        Self {
            api,
            sink: None,
            record_fill_statuses: true,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn FillStatusSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn record_fill_statuses(mut self, record: bool) -> Self {
        self.record_fill_statuses = record;
        self
    }

    pub async fn message_via_cwc(
        &self,
        profile: &LegislatorProfile,
        fields: &FieldMap,
        request: CwcRequest,
    ) -> Result<CwcDelivery, CwcError> {
        let Some(office) = profile.office_code() else {
            info!(bioguide_id = %profile.bioguide_id, "No CWC office code, web form required");
            return Ok(CwcDelivery::Unroutable);
        };

        let campaign_id = request
            .campaign_tag
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
        let mut params = CwcMessageParams::from_fields(fields, office.to_string(), campaign_id);
        params.organization = request.organization;

        let message = self.api.create_message(params)?;

        if request.validate_only {
            self.api.validate(&message).await?;
            info!(bioguide_id = %profile.bioguide_id, office = %office, "CWC message validated");
            return Ok(CwcDelivery::Validated);
        }

        self.api.deliver(&message).await?;
        info!(
            bioguide_id = %profile.bioguide_id,
            office = %office,
            delivery_id = %message.delivery_id,
            "CWC message delivered"
        );

        let outcome = FillOutcome::success(&profile.bioguide_id, request.campaign_tag);
        if self.record_fill_statuses
            && let Some(sink) = &self.sink
            && let Err(err) = sink.record(&outcome)
        {
            warn!(error = %err, "Failed to record fill status");
        }
        Ok(CwcDelivery::Delivered(outcome))
    }
}
