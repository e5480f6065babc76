//! Unit tests for request parsing, header derivation and typed views.

use rstest::{fixture, rstest};
use serde_json::{Map, Value, json};
use time::macros::datetime;

use super::*;
use crate::error::{ErrorKind, SmarthomeError};

const MESSAGE_ID: &str = "23624201-23a5-44c3-8fdc-ec6c4b6c3df8";

fn envelope(namespace: &str, name: &str, payload: Value) -> Value {
    json!({
        "header": {
            "messageId": MESSAGE_ID,
            "name": name,
            "namespace": namespace,
            "payloadVersion": "2"
        },
        "payload": payload
    })
}

fn request(namespace: Namespace, name: &str, payload: Value) -> Request {
    Request::parse(envelope(namespace.as_str(), name, payload)).expect("valid envelope")
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

#[fixture]
fn discover_data() -> Value {
    json!({
        "header": {
            "messageId": "6d6d6e14-8aee-473e-8c24-0d31ff9c17a2",
            "name": "DiscoverAppliancesRequest",
            "namespace": "Alexa.ConnectedHome.Discovery",
            "payloadVersion": "2"
        },
        "payload": {"accessToken": "OAuth Token"}
    })
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

#[rstest]
fn parses_discovery_envelope(discover_data: Value) {
    let parsed = Request::parse(discover_data.clone())
        .expect("valid envelope")
        .with_context(json!({"context": "object"}));

    assert_eq!(parsed.data(), &discover_data);
    assert_eq!(parsed.header().to_value(), discover_data["header"]);
    assert_eq!(Value::Object(parsed.payload().clone()), discover_data["payload"]);
    assert_eq!(parsed.context(), Some(&json!({"context": "object"})));
    assert_eq!(parsed.name(), "DiscoverAppliancesRequest");
    assert_eq!(parsed.kind(), RequestKind::Discover);
    assert_eq!(parsed.access_token(), Some("OAuth Token"));
    assert_eq!(parsed.appliance_id(), None);
    assert_eq!(parsed.appliance_details(), None);
}

#[test]
fn parses_from_bytes() {
    let bytes = br#"{"header":{"messageId":"1","name":"TurnOnRequest","namespace":"Alexa.ConnectedHome.Control","payloadVersion":"2"},"payload":{}}"#;
    let parsed = Request::from_slice(bytes).expect("valid envelope");
    assert_eq!(parsed.name(), "TurnOnRequest");
    assert_eq!(parsed.kind(), RequestKind::Generic);
}

#[test]
fn preserves_unknown_header_fields() {
    let mut data = envelope(Namespace::Control.as_str(), "TurnOnRequest", json!({}));
    data["header"]["traceId"] = json!("abc");
    let parsed = Request::parse(data).expect("valid envelope");
    assert_eq!(parsed.response_header(None).to_value()["traceId"], "abc");
}

#[rstest]
#[case::no_header(json!({"payload": {}}))]
#[case::no_payload(json!({"header": {
    "messageId": "1", "name": "TurnOnRequest",
    "namespace": "Alexa.ConnectedHome.Control", "payloadVersion": "2"
}}))]
#[case::payload_not_object(envelope("Alexa.ConnectedHome.Control", "TurnOnRequest", json!([])))]
#[case::header_missing_name(json!({"header": {
    "messageId": "1", "namespace": "Alexa.ConnectedHome.Control", "payloadVersion": "2"
}, "payload": {}}))]
fn rejects_malformed_envelopes(#[case] data: Value) {
    let error = Request::parse(data).expect_err("malformed envelope");
    assert!(matches!(error, RequestError::Malformed { .. }));
}

#[test]
fn rejects_invalid_json_bytes() {
    let error = Request::from_slice(b"{not json").expect_err("invalid json");
    assert!(matches!(error, RequestError::Malformed { source: Some(_), .. }));
}

#[rstest]
#[case::discover("DiscoverAppliancesRequest", RequestKind::Discover)]
#[case::set_percentage("SetPercentageRequest", RequestKind::Percentage)]
#[case::increment_percentage("IncrementPercentageRequest", RequestKind::Percentage)]
#[case::decrement_percentage("DecrementPercentageRequest", RequestKind::Percentage)]
#[case::set_temperature("SetTargetTemperatureRequest", RequestKind::ChangeTemperature)]
#[case::increment_temperature("IncrementTargetTemperatureRequest", RequestKind::ChangeTemperature)]
#[case::decrement_temperature("DecrementTargetTemperatureRequest", RequestKind::ChangeTemperature)]
#[case::get_target("GetTargetTemperatureRequest", RequestKind::GetTargetTemperature)]
#[case::reading("GetTemperatureReadingRequest", RequestKind::TemperatureReading)]
#[case::set_lock("SetLockStateRequest", RequestKind::LockState)]
#[case::get_lock("GetLockStateRequest", RequestKind::LockState)]
#[case::health("HealthCheckRequest", RequestKind::HealthCheck)]
#[case::turn_on("TurnOnRequest", RequestKind::Generic)]
#[case::unknown("MakeCoffeeRequest", RequestKind::Generic)]
fn classifies_request_names(#[case] name: &str, #[case] expected: RequestKind) {
    assert_eq!(RequestKind::from_name(name), expected);
}

#[rstest]
#[case::control(Namespace::Control)]
#[case::query(Namespace::Query)]
#[case::discovery(Namespace::Discovery)]
#[case::system(Namespace::System)]
fn namespaces_parse_from_wire(#[case] namespace: Namespace) {
    assert_eq!(Namespace::from_wire(namespace.as_str()), Some(namespace));
}

// ---------------------------------------------------------------------------
// Headers and generic responses
// ---------------------------------------------------------------------------

#[rstest]
#[case::control(Namespace::Control, "FooRequest", "FooConfirmation")]
#[case::query(Namespace::Query, "FooRequest", "FooResponse")]
#[case::discovery(Namespace::Discovery, "DiscoverAppliancesRequest", "DiscoverAppliancesResponse")]
#[case::system(Namespace::System, "HealthCheckRequest", "HealthCheckResponse")]
fn derives_response_names(
    #[case] namespace: Namespace,
    #[case] name: &str,
    #[case] expected: &str,
) {
    let parsed = request(namespace, name, json!({}));
    let header = parsed.response_header(None);
    assert_eq!(header.name, expected);
    assert_eq!(header.message_id, MESSAGE_ID);
    assert_eq!(header.namespace, namespace.as_str());
    assert_eq!(header.payload_version, "2");
}

#[test]
fn explicit_response_name_wins() {
    let parsed = request(Namespace::Control, "TurnOnRequest", json!({}));
    assert_eq!(parsed.response_header(Some("Custom")).name, "Custom");
}

#[test]
fn empty_response_has_empty_payload() {
    let parsed = request(Namespace::Control, "TurnOffRequest", json!({}));
    assert_eq!(
        parsed.response().to_value(),
        json!({
            "header": {
                "messageId": MESSAGE_ID,
                "name": "TurnOffConfirmation",
                "namespace": "Alexa.ConnectedHome.Control",
                "payloadVersion": "2"
            },
            "payload": {}
        })
    );
}

#[test]
fn raw_response_keeps_custom_header_and_payload() {
    let parsed = request(Namespace::Control, "SetPercentageRequest", json!({}));
    let header = parsed.response_header(Some("CustomConfirmation"));
    let payload = object(json!({"custom": "payload"}));
    let response = parsed.raw_response(payload.clone(), Some(header.clone()));
    assert_eq!(response.header, header);
    assert_eq!(response.payload, payload);
}

#[test]
fn exception_response_uses_error_name_namespace_and_payload() {
    let parsed = request(Namespace::Control, "GetLockStateRequest", json!({}));
    let error = SmarthomeError::unable_to_get_value(crate::error::ErrorInfo::new("DEVICE_JAMMED"));

    let response = parsed.exception_response(&error);

    assert_eq!(response.header.name, "UnableToGetValueError");
    assert_eq!(response.header.namespace, "Alexa.ConnectedHome.Query");
    assert_eq!(response.header.message_id, MESSAGE_ID);
    assert_eq!(response.header.payload_version, "2");
    assert_eq!(&response.payload, error.payload());
}

#[test]
fn exception_response_honours_overrides() {
    let parsed = request(Namespace::Query, "GetTargetTemperatureRequest", json!({}));
    let error = SmarthomeError::from(ErrorKind::TargetOffline)
        .with_name("Renamed")
        .with_payload(object(json!({"why": "unplugged"})));

    let response = parsed.exception_response(&error);

    assert_eq!(response.header.name, "Renamed");
    assert_eq!(response.header.namespace, "Alexa.ConnectedHome.Control");
    assert_eq!(Value::Object(response.payload), json!({"why": "unplugged"}));
}

// ---------------------------------------------------------------------------
// Typed views
// ---------------------------------------------------------------------------

#[test]
fn set_temperature_exposes_target_and_details() {
    let parsed = request(
        Namespace::Control,
        "SetTargetTemperatureRequest",
        json!({
            "accessToken": "[OAuth token here]",
            "appliance": {
                "applianceId": "thermostat1",
                "additionalApplianceDetails": {"foo": "bar"}
            },
            "targetTemperature": {"value": 27.6}
        }),
    );
    let view = parsed.as_change_temperature().expect("temperature view");

    assert_eq!(view.appliance_id(), Some("thermostat1"));
    assert_eq!(view.appliance_details(), Some(&object(json!({"foo": "bar"}))));
    assert_eq!(view.temperature(), Some(27.6));
    assert_eq!(view.delta_temperature(), None);
}

#[test]
fn increment_temperature_response_reports_previous_state() {
    let parsed = request(
        Namespace::Control,
        "IncrementTargetTemperatureRequest",
        json!({
            "appliance": {"applianceId": "bedroom"},
            "deltaTemperature": {"value": 1}
        }),
    );
    let view = parsed.as_change_temperature().expect("temperature view");
    assert_eq!(view.temperature(), None);
    assert_eq!(view.delta_temperature(), Some(1.0));

    let response = view.response(
        TemperatureChange::new(28.6)
            .with_mode(TemperatureMode::Heat)
            .with_previous_temperature(27.6),
    );

    assert_eq!(
        response.to_value(),
        json!({
            "header": {
                "namespace": "Alexa.ConnectedHome.Control",
                "name": "IncrementTargetTemperatureConfirmation",
                "payloadVersion": "2",
                "messageId": MESSAGE_ID
            },
            "payload": {
                "previousState": {
                    "mode": {"value": "AUTO"},
                    "targetTemperature": {"value": 27.6}
                },
                "targetTemperature": {"value": 28.6},
                "temperatureMode": {"value": "HEAT"}
            }
        })
    );
}

#[test]
fn temperature_change_without_previous_state_omits_it() {
    let parsed = request(Namespace::Control, "SetTargetTemperatureRequest", json!({}));
    let view = parsed.as_change_temperature().expect("temperature view");
    let response = view.response(TemperatureChange::new(21.0));
    assert_eq!(
        Value::Object(response.payload),
        json!({
            "targetTemperature": {"value": 21.0},
            "temperatureMode": {"value": "AUTO"}
        })
    );
}

#[test]
fn get_target_temperature_response_with_dual_setpoints() {
    let parsed = request(Namespace::Query, "GetTargetTemperatureRequest", json!({}));
    let view = parsed.as_get_target_temperature().expect("target view");

    let state = TargetTemperatureState::new()
        .with_cooling_temperature(23.89)
        .with_heating_temperature(22.2)
        .with_mode(TemperatureMode::Custom)
        .with_mode_name("Custom mode")
        .with_timestamp(datetime!(2017-03-14 23:20:50.123));

    assert_eq!(
        view.response(&state).to_value(),
        json!({
            "header": {
                "namespace": "Alexa.ConnectedHome.Query",
                "name": "GetTargetTemperatureResponse",
                "payloadVersion": "2",
                "messageId": MESSAGE_ID
            },
            "payload": {
                "coolingTargetTemperature": {"value": 23.89},
                "heatingTargetTemperature": {"value": 22.2},
                "applianceResponseTimestamp": "2017-03-14T23:20:50",
                "temperatureMode": {"value": "CUSTOM", "friendlyName": "Custom mode"}
            }
        })
    );
}

#[test]
fn get_target_temperature_minimal_response() {
    let parsed = request(Namespace::Query, "GetTargetTemperatureRequest", json!({}));
    let view = parsed.as_get_target_temperature().expect("target view");
    let response = view.response(&TargetTemperatureState::new().with_temperature(20.5));
    assert_eq!(
        Value::Object(response.payload),
        json!({
            "targetTemperature": {"value": 20.5},
            "temperatureMode": {"value": "AUTO"}
        })
    );
}

#[test]
fn temperature_reading_passes_text_timestamp_through() {
    let parsed = request(Namespace::Query, "GetTemperatureReadingRequest", json!({}));
    let view = parsed.as_temperature_reading().expect("reading view");
    let stamp = Timestamp::from("2017-01-12T23:20:50.52Z");

    assert_eq!(
        Value::Object(view.response(21.11, Some(&stamp)).payload),
        json!({
            "temperatureReading": {"value": 21.11},
            "applianceResponseTimestamp": "2017-01-12T23:20:50.52Z"
        })
    );
}

#[test]
fn percentage_view_reads_delta() {
    let parsed = request(
        Namespace::Control,
        "IncrementPercentageRequest",
        json!({
            "appliance": {"additionalApplianceDetails": {}, "applianceId": "cinema"},
            "deltaPercentage": {"value": 5.0}
        }),
    );
    let view = parsed.as_percentage().expect("percentage view");
    assert_eq!(view.percentage(), None);
    assert_eq!(view.delta_percentage(), Some(5.0));
}

#[test]
fn lock_state_view_and_response() {
    let parsed = request(
        Namespace::Control,
        "SetLockStateRequest",
        json!({"appliance": {"applianceId": "door"}, "lockState": "LOCKED"}),
    );
    let view = parsed.as_lock_state().expect("lock view");
    assert_eq!(view.lock_state(), Some("LOCKED"));

    let stamp = Timestamp::from(datetime!(2017-03-14 23:20:50 +2));
    let response = view.response(LockState::Locked, Some(&stamp));
    assert_eq!(response.header.name, "SetLockStateConfirmation");
    assert_eq!(
        Value::Object(response.payload),
        json!({
            "lockState": "LOCKED",
            "applianceResponseTimestamp": "2017-03-14T23:20:50+02:00"
        })
    );
}

#[test]
fn missing_lock_state_is_none() {
    let parsed = request(Namespace::Query, "GetLockStateRequest", json!({}));
    let view = parsed.as_lock_state().expect("lock view");
    assert_eq!(view.lock_state(), None);
}

#[test]
fn health_check_response() {
    let parsed = request(Namespace::System, "HealthCheckRequest", json!({}));
    let view = parsed.as_health_check().expect("health view");
    let response = view.response(false, "Broken");
    assert_eq!(response.header.name, "HealthCheckResponse");
    assert_eq!(
        Value::Object(response.payload),
        json!({"isHealthy": false, "description": "Broken"})
    );
}

#[test]
fn views_only_match_their_kind() {
    let parsed = request(Namespace::Control, "TurnOnRequest", json!({}));
    assert!(parsed.as_discover().is_none());
    assert!(parsed.as_percentage().is_none());
    assert!(parsed.as_lock_state().is_none());
    assert!(matches!(parsed.variant(), RequestVariant::Generic(_)));
    assert_eq!(parsed.variant().request().name(), "TurnOnRequest");
}

#[rstest]
fn discover_variant_is_selected(discover_data: Value) {
    let parsed = Request::parse(discover_data).expect("valid envelope");
    assert!(matches!(parsed.variant(), RequestVariant::Discover(_)));
    let view = parsed.as_discover().expect("discover view");
    assert_eq!(
        Value::Object(view.response(&[]).payload),
        json!({"discoveredAppliances": []})
    );
}
