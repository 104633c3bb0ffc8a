#![cfg(feature = "test-utils")]

//! CWC delivery through the submitter and the HTTP client.

use std::sync::Arc;

use congress_forms_core::config::DeliveryAgent;
use congress_forms_core::cwc::{
    CwcDelivery, CwcHttpClient, CwcMessageParams, CwcRequest, CwcSubmitter, MessagingApi,
    Organization,
};
use congress_forms_core::engine::FieldMap;
use congress_forms_core::error::CwcError;
use congress_forms_core::testkit::{RecordingMessagingApi, RecordingSink};
use congress_forms_core::{LegislatorProfile, OutcomeStatus};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fields() -> FieldMap {
    FieldMap::new()
        .with("$NAME_PREFIX", "Ms.")
        .with("$NAME_FIRST", "Jane")
        .with("$NAME_LAST", "Doe")
        .with("$ADDRESS_STREET", "1 Main St")
        .with("$ADDRESS_CITY", "Albany")
        .with("$ADDRESS_STATE_POSTAL_ABBREV", "NY")
        .with("$ADDRESS_ZIP5", "12207")
        .with("$EMAIL", "jane@example.com")
        .with("$SUBJECT", "Parks")
        .with("$TOPIC", "Environmental Protection")
        .with("$MESSAGE", "Fund the parks.")
}

fn senator() -> LegislatorProfile {
    LegislatorProfile::senator("S000148", "NY", 3)
}

// ---------------------------------------------------------------------------
// Submitter
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delivery_records_success_outcome() {
    let api = Arc::new(RecordingMessagingApi::new());
    let sink = Arc::new(RecordingSink::default());
    let submitter = CwcSubmitter::new(api.clone()).with_sink(sink.clone());

    let delivery = submitter
        .message_via_cwc(&senator(), &fields(), CwcRequest::default().with_campaign_tag("parks-2024"))
        .await
        .unwrap();

    let CwcDelivery::Delivered(outcome) = delivery else {
        panic!("expected delivery");
    };
    assert_eq!(outcome.status, OutcomeStatus::Success);
    assert_eq!(outcome.campaign_tag.as_deref(), Some("parks-2024"));
    assert_eq!(sink.outcomes(), vec![outcome]);

    let delivered = api.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].params.recipient.member_office, "SNY02");
    assert_eq!(delivered[0].params.campaign_id, "parks-2024");
}

#[tokio::test]
async fn validate_only_does_not_deliver_or_record() {
    let api = Arc::new(RecordingMessagingApi::new());
    let sink = Arc::new(RecordingSink::default());
    let submitter = CwcSubmitter::new(api.clone()).with_sink(sink.clone());

    let delivery = submitter
        .message_via_cwc(&senator(), &fields(), CwcRequest::default().validate_only())
        .await
        .unwrap();

    assert!(matches!(delivery, CwcDelivery::Validated));
    assert_eq!(api.validated().len(), 1);
    assert!(api.delivered().is_empty());
    assert!(sink.outcomes().is_empty());
}

#[tokio::test]
async fn untagged_campaign_gets_random_hex_id() {
    let api = Arc::new(RecordingMessagingApi::new());
    let submitter = CwcSubmitter::new(api.clone());

    submitter
        .message_via_cwc(&senator(), &fields(), CwcRequest::default())
        .await
        .unwrap();

    let campaign_id = &api.delivered()[0].params.campaign_id;
    assert_eq!(campaign_id.len(), 32);
    assert!(campaign_id.chars().all(|c| c.is_ascii_hexdigit()));
}

#[tokio::test]
async fn profile_without_office_is_unroutable() {
    let api = Arc::new(RecordingMessagingApi::new());
    let submitter = CwcSubmitter::new(api.clone());
    let profile = LegislatorProfile::new("X000001", "DC");

    let delivery = submitter
        .message_via_cwc(&profile, &fields(), CwcRequest::default())
        .await
        .unwrap();

    assert!(matches!(delivery, CwcDelivery::Unroutable));
    assert!(api.delivered().is_empty());
}

#[tokio::test]
async fn api_rejection_propagates() {
    let api = Arc::new(RecordingMessagingApi::rejecting(400, "bad zip"));
    let sink = Arc::new(RecordingSink::default());
    let submitter = CwcSubmitter::new(api).with_sink(sink.clone());

    let err = submitter
        .message_via_cwc(&senator(), &fields(), CwcRequest::default())
        .await
        .unwrap_err();

    assert!(matches!(err, CwcError::Api { status: 400, ref body } if body == "bad zip"));
    assert!(sink.outcomes().is_empty());
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

fn client(server: &MockServer) -> CwcHttpClient {
    let agent = DeliveryAgent {
        name: "Example Advocacy".to_string(),
        ack_email: "ack@example.org".to_string(),
        ..DeliveryAgent::default()
    };
    CwcHttpClient::new(&server.uri(), "test-key", agent).unwrap()
}

fn message(client: &CwcHttpClient) -> congress_forms_core::cwc::CwcMessage {
    let mut params = CwcMessageParams::from_fields(&fields(), "SNY02", "campaign-1");
    params.organization = Some(Organization::named("Friends of Parks"));
    client.create_message(params).unwrap()
}

#[tokio::test]
async fn deliver_posts_xml_with_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/message"))
        .and(query_param("apikey", "test-key"))
        .and(header("content-type", "application/xml"))
        .and(body_string_contains("<MemberOffice>SNY02</MemberOffice>"))
        .and(body_string_contains("<DeliveryAgent>Example Advocacy</DeliveryAgent>"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    client.deliver(&message(&client)).await.unwrap();
}

#[tokio::test]
async fn validate_posts_to_validate_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/validate"))
        .and(query_param("apikey", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    client.validate(&message(&client)).await.unwrap();
}

#[tokio::test]
async fn non_success_status_carries_response_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/message"))
        .respond_with(ResponseTemplate::new(400).set_body_string("<Errors><Error>Invalid zip</Error></Errors>"))
        .mount(&server)
        .await;

    let client = client(&server);
    let err = client.deliver(&message(&client)).await.unwrap_err();

    match err {
        CwcError::Api { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("Invalid zip"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn submitter_over_http_delivers_to_office() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/message"))
        .and(body_string_contains("<MemberOffice>HTX36</MemberOffice>"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let submitter = CwcSubmitter::new(Arc::new(client(&server)));
    let profile = LegislatorProfile::representative("B001291", "TX", 36);

    let delivery = submitter
        .message_via_cwc(&profile, &fields(), CwcRequest::default())
        .await
        .unwrap();

    assert!(matches!(delivery, CwcDelivery::Delivered(_)));
}
