//! Typed views over the request payload.
//!
//! Each view borrows the [`Request`] it was built from and dereferences to
//! it, so the generic accessors and response helpers stay available. Field
//! accessors return `None` when the payload lacks the key.

use std::ops::Deref;

use serde_json::{Map, Value, json};

use super::{Request, RequestKind, Response, Timestamp};
use crate::details::DiscoveredAppliance;

/// Borrowed typed view selected by the request kind.
#[derive(Debug, Clone, Copy)]
pub enum RequestVariant<'a> {
    /// Appliance discovery.
    Discover(DiscoverRequest<'a>),
    /// Percentage change.
    Percentage(PercentageRequest<'a>),
    /// Target temperature change.
    ChangeTemperature(ChangeTemperatureRequest<'a>),
    /// Target temperature query.
    GetTargetTemperature(GetTargetTemperatureRequest<'a>),
    /// Temperature reading query.
    TemperatureReading(TemperatureReadingRequest<'a>),
    /// Lock state query or change.
    LockState(LockStateRequest<'a>),
    /// Health check.
    HealthCheck(HealthCheckRequest<'a>),
    /// Any other request.
    Generic(&'a Request),
}

impl<'a> RequestVariant<'a> {
    pub(super) const fn of(request: &'a Request) -> Self {
        match request.kind {
            RequestKind::Discover => Self::Discover(DiscoverRequest::new(request)),
            RequestKind::Percentage => Self::Percentage(PercentageRequest::new(request)),
            RequestKind::ChangeTemperature => {
                Self::ChangeTemperature(ChangeTemperatureRequest::new(request))
            }
            RequestKind::GetTargetTemperature => {
                Self::GetTargetTemperature(GetTargetTemperatureRequest::new(request))
            }
            RequestKind::TemperatureReading => {
                Self::TemperatureReading(TemperatureReadingRequest::new(request))
            }
            RequestKind::LockState => Self::LockState(LockStateRequest::new(request)),
            RequestKind::HealthCheck => Self::HealthCheck(HealthCheckRequest::new(request)),
            RequestKind::Generic => Self::Generic(request),
        }
    }

    /// The underlying request.
    #[must_use]
    pub const fn request(&self) -> &'a Request {
        match self {
            Self::Discover(view) => view.request,
            Self::Percentage(view) => view.request,
            Self::ChangeTemperature(view) => view.request,
            Self::GetTargetTemperature(view) => view.request,
            Self::TemperatureReading(view) => view.request,
            Self::LockState(view) => view.request,
            Self::HealthCheck(view) => view.request,
            Self::Generic(request) => request,
        }
    }
}

macro_rules! request_view {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name<'a> {
            request: &'a Request,
        }

        impl<'a> $name<'a> {
            pub(super) const fn new(request: &'a Request) -> Self {
                Self { request }
            }

            /// The underlying request.
            #[must_use]
            pub const fn request(&self) -> &'a Request {
                self.request
            }
        }

        impl Deref for $name<'_> {
            type Target = Request;

            fn deref(&self) -> &Request {
                self.request
            }
        }
    };
}

request_view!(
    /// View over `DiscoverAppliancesRequest`.
    DiscoverRequest
);
request_view!(
    /// View over `Set`/`Increment`/`DecrementPercentageRequest`.
    PercentageRequest
);
request_view!(
    /// View over `Set`/`Increment`/`DecrementTargetTemperatureRequest`.
    ChangeTemperatureRequest
);
request_view!(
    /// View over `GetTargetTemperatureRequest`.
    GetTargetTemperatureRequest
);
request_view!(
    /// View over `GetTemperatureReadingRequest`.
    TemperatureReadingRequest
);
request_view!(
    /// View over `Get`/`SetLockStateRequest`.
    LockStateRequest
);
request_view!(
    /// View over `HealthCheckRequest`.
    HealthCheckRequest
);

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn insert_timestamp(payload: &mut Map<String, Value>, timestamp: Option<&Timestamp>) {
    if let Some(stamp) = timestamp {
        payload.insert(
            "applianceResponseTimestamp".to_owned(),
            Value::String(stamp.render()),
        );
    }
}

impl DiscoverRequest<'_> {
    /// Lists the given appliances under `discoveredAppliances`.
    #[must_use]
    pub fn response(&self, appliances: &[DiscoveredAppliance]) -> Response {
        let discovered = appliances.iter().map(DiscoveredAppliance::to_value).collect();
        let mut payload = Map::new();
        payload.insert("discoveredAppliances".to_owned(), Value::Array(discovered));
        self.request.raw_response(payload, None)
    }
}

impl PercentageRequest<'_> {
    /// Absolute percentage from `payload.percentageState.value`.
    #[must_use]
    pub fn percentage(&self) -> Option<f64> {
        self.request
            .payload_value("percentageState")
            .and_then(Value::as_f64)
    }

    /// Relative change from `payload.deltaPercentage.value`.
    #[must_use]
    pub fn delta_percentage(&self) -> Option<f64> {
        self.request
            .payload_value("deltaPercentage")
            .and_then(Value::as_f64)
    }
}

/// Temperature modes reported by thermostats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TemperatureMode {
    /// Automatic heating or cooling.
    #[default]
    Auto,
    /// Cooling.
    Cool,
    /// Heating.
    Heat,
    /// Energy saving.
    Eco,
    /// Switched off.
    Off,
    /// Vendor-specific mode; pair it with a friendly name.
    Custom,
}

impl TemperatureMode {
    /// Wire representation of the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "AUTO",
            Self::Cool => "COOL",
            Self::Heat => "HEAT",
            Self::Eco => "ECO",
            Self::Off => "OFF",
            Self::Custom => "CUSTOM",
        }
    }
}

/// Outcome of a target temperature change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureChange {
    temperature: f64,
    mode: TemperatureMode,
    previous: Option<(f64, TemperatureMode)>,
}

impl TemperatureChange {
    /// New target temperature in degrees Celsius, mode `AUTO`.
    #[must_use]
    pub const fn new(temperature: f64) -> Self {
        Self {
            temperature,
            mode: TemperatureMode::Auto,
            previous: None,
        }
    }

    /// Sets the mode the device is now in.
    #[must_use]
    pub const fn with_mode(mut self, mode: TemperatureMode) -> Self {
        self.mode = mode;
        self
    }

    /// Records the previous target temperature with mode `AUTO`.
    #[must_use]
    pub const fn with_previous_temperature(self, temperature: f64) -> Self {
        self.with_previous(temperature, TemperatureMode::Auto)
    }

    /// Records the previous target temperature and mode.
    #[must_use]
    pub const fn with_previous(mut self, temperature: f64, mode: TemperatureMode) -> Self {
        self.previous = Some((temperature, mode));
        self
    }
}

impl ChangeTemperatureRequest<'_> {
    /// Absolute target from `payload.targetTemperature.value`.
    #[must_use]
    pub fn temperature(&self) -> Option<f64> {
        self.request
            .payload_value("targetTemperature")
            .and_then(Value::as_f64)
    }

    /// Relative change from `payload.deltaTemperature.value`.
    #[must_use]
    pub fn delta_temperature(&self) -> Option<f64> {
        self.request
            .payload_value("deltaTemperature")
            .and_then(Value::as_f64)
    }

    /// Confirms the change; `previousState` is only emitted when recorded.
    #[must_use]
    pub fn response(&self, change: TemperatureChange) -> Response {
        let mut payload = object(json!({
            "targetTemperature": {"value": change.temperature},
            "temperatureMode": {"value": change.mode.as_str()},
        }));
        if let Some((temperature, mode)) = change.previous {
            payload.insert(
                "previousState".to_owned(),
                json!({
                    "targetTemperature": {"value": temperature},
                    "mode": {"value": mode.as_str()},
                }),
            );
        }
        self.request.raw_response(payload, None)
    }
}

/// Thermostat state reported for a target temperature query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetTemperatureState {
    temperature: Option<f64>,
    cooling_temperature: Option<f64>,
    heating_temperature: Option<f64>,
    mode: TemperatureMode,
    mode_name: Option<String>,
    timestamp: Option<Timestamp>,
}

impl TargetTemperatureState {
    /// Empty state in mode `AUTO`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Single setpoint in degrees Celsius.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Cooling setpoint for dual-setpoint devices.
    #[must_use]
    pub const fn with_cooling_temperature(mut self, temperature: f64) -> Self {
        self.cooling_temperature = Some(temperature);
        self
    }

    /// Heating setpoint for dual-setpoint devices.
    #[must_use]
    pub const fn with_heating_temperature(mut self, temperature: f64) -> Self {
        self.heating_temperature = Some(temperature);
        self
    }

    /// Current mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: TemperatureMode) -> Self {
        self.mode = mode;
        self
    }

    /// Friendly mode name, required for [`TemperatureMode::Custom`].
    #[must_use]
    pub fn with_mode_name(mut self, name: impl Into<String>) -> Self {
        self.mode_name = Some(name.into());
        self
    }

    /// Time the state was read from the device.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: impl Into<Timestamp>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }
}

impl GetTargetTemperatureRequest<'_> {
    /// Reports the thermostat state; absent setpoints are omitted.
    #[must_use]
    pub fn response(&self, state: &TargetTemperatureState) -> Response {
        let mut mode = Map::new();
        mode.insert("value".to_owned(), Value::from(state.mode.as_str()));
        if let Some(name) = &state.mode_name {
            mode.insert("friendlyName".to_owned(), Value::from(name.as_str()));
        }

        let mut payload = Map::new();
        payload.insert("temperatureMode".to_owned(), Value::Object(mode));
        let setpoints = [
            ("targetTemperature", state.temperature),
            ("coolingTargetTemperature", state.cooling_temperature),
            ("heatingTargetTemperature", state.heating_temperature),
        ];
        for (key, value) in setpoints
            .into_iter()
            .filter_map(|(name, setpoint)| setpoint.map(|reading| (name, reading)))
        {
            payload.insert(key.to_owned(), json!({ "value": value }));
        }
        insert_timestamp(&mut payload, state.timestamp.as_ref());
        self.request.raw_response(payload, None)
    }
}

impl TemperatureReadingRequest<'_> {
    /// Reports the current temperature in degrees Celsius.
    #[must_use]
    pub fn response(&self, temperature: f64, timestamp: Option<&Timestamp>) -> Response {
        let mut payload = object(json!({ "temperatureReading": {"value": temperature} }));
        insert_timestamp(&mut payload, timestamp);
        self.request.raw_response(payload, None)
    }
}

/// Lock states understood by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockState {
    /// Locked.
    Locked,
    /// Unlocked. Only valid in responses to lock state queries.
    Unlocked,
}

impl LockState {
    /// Wire representation of the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Locked => "LOCKED",
            Self::Unlocked => "UNLOCKED",
        }
    }
}

impl LockStateRequest<'_> {
    /// Requested state from `payload.lockState`.
    #[must_use]
    pub fn lock_state(&self) -> Option<&str> {
        self.request.payload().get("lockState").and_then(Value::as_str)
    }

    /// Reports the lock state.
    #[must_use]
    pub fn response(&self, state: LockState, timestamp: Option<&Timestamp>) -> Response {
        let mut payload = Map::new();
        payload.insert("lockState".to_owned(), Value::from(state.as_str()));
        insert_timestamp(&mut payload, timestamp);
        self.request.raw_response(payload, None)
    }
}

impl HealthCheckRequest<'_> {
    /// Reports the adapter health.
    #[must_use]
    pub fn response(&self, healthy: bool, description: &str) -> Response {
        let mut payload = Map::new();
        payload.insert("isHealthy".to_owned(), Value::Bool(healthy));
        payload.insert("description".to_owned(), Value::from(description));
        self.request.raw_response(payload, None)
    }
}
