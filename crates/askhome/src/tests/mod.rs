//! Crate-level integration and BDD tests.

use once_cell::sync::Lazy;
use serde_json::{Value, json};

use crate::{
    Appliance, ApplianceDetails, ApplianceInfo, Capabilities, ErrorKind, HandlerResult, Request,
    Smarthome,
};


/// Switchable light supporting only `turnOn`.
struct KitchenLight {
    info: ApplianceInfo,
}

impl KitchenLight {
    fn turn_on(&mut self, request: &Request) -> HandlerResult {
        assert_eq!(self.info.id.as_deref(), request.appliance_id());
        Ok(None)
    }
}

impl Appliance for KitchenLight {
    fn from_request(request: &Request) -> Self {
        Self {
            info: ApplianceInfo::from_request(request),
        }
    }

    fn capabilities() -> &'static Capabilities<Self> {
        static CAPABILITIES: Lazy<Capabilities<KitchenLight>> = Lazy::new(|| {
            Capabilities::<KitchenLight>::builder()
                .action("turn_on", KitchenLight::turn_on)
                .build()
        });
        &CAPABILITIES
    }
}

/// Appliance whose every action reports the device offline.
struct UnpluggedOven;

impl UnpluggedOven {
    fn turn_on(&mut self, _request: &Request) -> HandlerResult {
        Err(ErrorKind::TargetOffline.into())
    }
}

impl Appliance for UnpluggedOven {
    fn from_request(_request: &Request) -> Self {
        Self
    }

    fn capabilities() -> &'static Capabilities<Self> {
        static CAPABILITIES: Lazy<Capabilities<UnpluggedOven>> = Lazy::new(|| {
            Capabilities::<UnpluggedOven>::builder()
                .action("turn_on", UnpluggedOven::turn_on)
                .build()
        });
        &CAPABILITIES
    }
}

fn envelope(message_id: &str, namespace: &str, name: &str, payload: Value) -> Value {
    json!({
        "header": {
            "messageId": message_id,
            "name": name,
            "namespace": namespace,
            "payloadVersion": "2"
        },
        "payload": payload
    })
}

fn control_event(name: &str, appliance_id: &str) -> Value {
    envelope(
        "9f4803ec-4c94-4fdf-89c2-d502d5e52bb4",
        "Alexa.ConnectedHome.Control",
        name,
        json!({
            "accessToken": "token",
            "appliance": {"applianceId": appliance_id, "additionalApplianceDetails": {}}
        }),
    )
}

#[test]
fn end_to_end_turn_on_round_trip() {
    let home = Smarthome::new();
    home.add_appliance::<KitchenLight>("123", ApplianceDetails::new())
        .expect("register");

    let response = home
        .handle(control_event("TurnOnRequest", "123"))
        .expect("dispatch");

    assert_eq!(
        response.to_value(),
        json!({
            "header": {
                "messageId": "9f4803ec-4c94-4fdf-89c2-d502d5e52bb4",
                "name": "TurnOnConfirmation",
                "namespace": "Alexa.ConnectedHome.Control",
                "payloadVersion": "2"
            },
            "payload": {}
        })
    );
}
