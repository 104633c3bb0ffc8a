//! CWC 2.0 document rendering.

use super::{CwcMessageParams, Organization};
use crate::config::DeliveryAgent;
use chrono::NaiveDate;

pub const CWC_VERSION: &str = "2.0";

/// Escape text for element content.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Minimal indented element writer.
#[derive(Debug, Default)]
struct XmlWriter {
    out: String,
    depth: usize,
}

impl XmlWriter {
    fn new() -> Self {
        Self {
            out: String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"),
            depth: 0,
        }
    }

    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
    }

    fn open(&mut self, name: &str) {
        self.indent();
        self.out.push_str(&format!("<{name}>\n"));
        self.depth += 1;
    }

    fn close(&mut self, name: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.indent();
        self.out.push_str(&format!("</{name}>\n"));
    }

    fn text(&mut self, name: &str, value: &str) {
        self.indent();
        self.out
            .push_str(&format!("<{name}>{}</{name}>\n", escape(value)));
    }

    fn optional(&mut self, name: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.text(name, value);
        }
    }

    fn finish(self) -> String {
        self.out
    }
}

/// Render the full CWC document for one delivery.
pub fn render(
    delivery_id: &str,
    date: NaiveDate,
    agent: &DeliveryAgent,
    params: &CwcMessageParams,
) -> String {
    let mut w = XmlWriter::new();
    w.open("CWC");
    w.text("CWCVersion", CWC_VERSION);

    w.open("Delivery");
    w.text("DeliveryId", delivery_id);
    w.text("DeliveryDate", &date.format("%Y%m%d").to_string());
    w.text("DeliveryAgent", &agent.name);
    w.text("DeliveryAgentAckEmailAddress", &agent.ack_email);
    w.open("DeliveryAgentContact");
    w.text("DeliveryAgentContactName", &agent.contact_name);
    w.text("DeliveryAgentContactEmail", &agent.contact_email);
    w.text("DeliveryAgentContactPhone", &agent.contact_phone);
    w.close("DeliveryAgentContact");
    if let Some(organization) = &params.organization {
        organization_block(&mut w, organization);
    }
    w.text("CampaignId", &params.campaign_id);
    w.close("Delivery");

    w.open("Recipient");
    w.text("MemberOffice", &params.recipient.member_office);
    w.close("Recipient");

    let constituent = &params.constituent;
    w.open("Constituent");
    w.optional("Prefix", constituent.prefix.as_deref());
    w.optional("FirstName", constituent.first_name.as_deref());
    w.optional("LastName", constituent.last_name.as_deref());
    for (index, line) in constituent.address.iter().enumerate() {
        w.text(&format!("Address{}", index + 1), line);
    }
    w.optional("City", constituent.city.as_deref());
    w.optional("StateAbbreviation", constituent.state_abbreviation.as_deref());
    w.optional("Zip", constituent.zip.as_deref());
    w.optional("Email", constituent.email.as_deref());
    w.close("Constituent");

    let message = &params.message;
    w.open("Message");
    w.optional("Subject", message.subject.as_deref());
    if !message.library_of_congress_topics.is_empty() {
        w.open("LibraryOfCongressTopics");
        for topic in &message.library_of_congress_topics {
            w.text("LibraryOfCongressTopic", topic);
        }
        w.close("LibraryOfCongressTopics");
    }
    w.optional("OrganizationStatement", message.organization_statement.as_deref());
    w.optional("ConstituentMessage", message.constituent_message.as_deref());
    w.close("Message");

    w.close("CWC");
    w.finish()
}

fn organization_block(w: &mut XmlWriter, organization: &Organization) {
    w.text("Organization", &organization.name);
    if organization.contact_name.is_some()
        || organization.contact_email.is_some()
        || organization.contact_phone.is_some()
    {
        w.open("OrganizationContact");
        w.optional("OrganizationContactName", organization.contact_name.as_deref());
        w.optional("OrganizationContactEmail", organization.contact_email.as_deref());
        w.optional("OrganizationContactPhone", organization.contact_phone.as_deref());
        w.close("OrganizationContact");
    }
    w.optional("OrganizationAbout", organization.about.as_deref());
}
