//! Inbound request envelopes and response construction.
//!
//! A [`Request`] wraps the raw event, its parsed [`Header`] and payload, and
//! the [`RequestKind`] derived from the header name. Typed views over the
//! payload live in [`variants`]; every view shares the same response header
//! rules implemented here.

mod timestamp;
pub mod variants;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::SmarthomeError;
use crate::names::strip_request_suffix;

pub use timestamp::Timestamp;
pub use variants::{
    ChangeTemperatureRequest, DiscoverRequest, GetTargetTemperatureRequest, HealthCheckRequest,
    LockState, LockStateRequest, PercentageRequest, RequestVariant, TargetTemperatureState,
    TemperatureChange, TemperatureMode, TemperatureReadingRequest,
};

/// Protocol namespaces used in request and response headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// State-changing requests, answered with confirmations.
    Control,
    /// Read-only requests, answered with responses.
    Query,
    /// Appliance discovery.
    Discovery,
    /// Health checks.
    System,
}

impl Namespace {
    /// Wire representation of the namespace.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Control => "Alexa.ConnectedHome.Control",
            Self::Query => "Alexa.ConnectedHome.Query",
            Self::Discovery => "Alexa.ConnectedHome.Discovery",
            Self::System => "Alexa.ConnectedHome.System",
        }
    }

    /// Parses a wire namespace, returning `None` for unknown values.
    #[must_use]
    pub fn from_wire(value: &str) -> Option<Self> {
        [Self::Control, Self::Query, Self::Discovery, Self::System]
            .into_iter()
            .find(|namespace| namespace.as_str() == value)
    }
}

/// Request and response header.
///
/// Unknown header fields are preserved so they can be echoed back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    /// Unique identifier of the message.
    pub message_id: String,
    /// Request or response name, e.g. `TurnOnRequest`.
    pub name: String,
    /// Namespace the message belongs to.
    pub namespace: String,
    /// Protocol payload version, `"2"` for this protocol.
    pub payload_version: String,
    /// Any further header fields, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Header {
    /// Renders the header as a JSON object.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut header = self.extra.clone();
        header.insert("messageId".to_owned(), Value::from(self.message_id.as_str()));
        header.insert("name".to_owned(), Value::from(self.name.as_str()));
        header.insert("namespace".to_owned(), Value::from(self.namespace.as_str()));
        header.insert(
            "payloadVersion".to_owned(),
            Value::from(self.payload_version.as_str()),
        );
        Value::Object(header)
    }
}

/// Outbound response: a header and an object payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Response header.
    pub header: Header,
    /// Response payload.
    pub payload: Map<String, Value>,
}

impl Response {
    /// Renders the response as the JSON object returned to the platform.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut response = Map::new();
        response.insert("header".to_owned(), self.header.to_value());
        response.insert("payload".to_owned(), Value::Object(self.payload.clone()));
        Value::Object(response)
    }
}

impl From<Response> for Value {
    fn from(response: Response) -> Self {
        response.to_value()
    }
}

/// Errors raised while reading an inbound event.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The event is not a valid request envelope.
    #[error("malformed request: {message}")]
    Malformed {
        /// Human-readable description of the problem.
        message: String,
        /// Underlying JSON error, when there is one.
        #[source]
        source: Option<serde_json::Error>,
    },
}

impl RequestError {
    /// Creates a malformed request error from a serde error.
    #[must_use]
    pub fn from_json_error(source: serde_json::Error) -> Self {
        Self::Malformed {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Creates a malformed request error with a custom message.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
            source: None,
        }
    }
}

/// Request shape selected from the header name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// `DiscoverAppliancesRequest`.
    Discover,
    /// Set, increment or decrement a percentage.
    Percentage,
    /// Set, increment or decrement the target temperature.
    ChangeTemperature,
    /// `GetTargetTemperatureRequest`.
    GetTargetTemperature,
    /// `GetTemperatureReadingRequest`.
    TemperatureReading,
    /// Get or set the lock state.
    LockState,
    /// `HealthCheckRequest`.
    HealthCheck,
    /// Any other request name.
    Generic,
}

impl RequestKind {
    /// Classifies a request by its header name.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "DiscoverAppliancesRequest" => Self::Discover,
            "SetPercentageRequest" | "IncrementPercentageRequest" | "DecrementPercentageRequest" => {
                Self::Percentage
            }
            "SetTargetTemperatureRequest"
            | "IncrementTargetTemperatureRequest"
            | "DecrementTargetTemperatureRequest" => Self::ChangeTemperature,
            "GetTargetTemperatureRequest" => Self::GetTargetTemperature,
            "GetTemperatureReadingRequest" => Self::TemperatureReading,
            "SetLockStateRequest" | "GetLockStateRequest" => Self::LockState,
            "HealthCheckRequest" => Self::HealthCheck,
            _ => Self::Generic,
        }
    }
}

/// A parsed inbound request.
///
/// # Examples
///
/// ```
/// use askhome::Request;
/// use serde_json::json;
///
/// let request = Request::parse(json!({
///     "header": {
///         "messageId": "01",
///         "name": "TurnOnRequest",
///         "namespace": "Alexa.ConnectedHome.Control",
///         "payloadVersion": "2"
///     },
///     "payload": {"appliance": {"applianceId": "lamp-1", "additionalApplianceDetails": {}}}
/// }))?;
///
/// assert_eq!(request.appliance_id(), Some("lamp-1"));
/// assert_eq!(request.response_header(None).name, "TurnOnConfirmation");
/// # Ok::<(), askhome::RequestError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    data: Value,
    header: Header,
    payload: Map<String, Value>,
    context: Option<Value>,
    kind: RequestKind,
}

impl Request {
    /// Parses a request envelope.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Malformed`] when the header is missing or
    /// incomplete, or when the payload is absent or not an object.
    pub fn parse(data: Value) -> Result<Self, RequestError> {
        let header_value = data
            .get("header")
            .cloned()
            .ok_or_else(|| RequestError::malformed("missing `header` object"))?;
        let header: Header =
            serde_json::from_value(header_value).map_err(RequestError::from_json_error)?;
        let payload = match data.get("payload") {
            Some(Value::Object(payload)) => payload.clone(),
            Some(_) => return Err(RequestError::malformed("`payload` must be an object")),
            None => return Err(RequestError::malformed("missing `payload` object")),
        };
        let kind = RequestKind::from_name(&header.name);
        Ok(Self {
            data,
            header,
            payload,
            context: None,
            kind,
        })
    }

    /// Parses a request envelope from raw JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Malformed`] when the bytes are not JSON or do
    /// not form a valid envelope.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, RequestError> {
        let data: Value = serde_json::from_slice(bytes).map_err(RequestError::from_json_error)?;
        Self::parse(data)
    }

    /// Attaches the opaque invocation context supplied by the host.
    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    /// Raw event exactly as received.
    #[must_use]
    pub const fn data(&self) -> &Value {
        &self.data
    }

    /// Parsed request header.
    #[must_use]
    pub const fn header(&self) -> &Header {
        &self.header
    }

    /// Request payload.
    #[must_use]
    pub const fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// Invocation context, when the host supplied one.
    #[must_use]
    pub const fn context(&self) -> Option<&Value> {
        self.context.as_ref()
    }

    /// Declared request name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.header.name.as_str()
    }

    /// Request shape derived from the name.
    #[must_use]
    pub const fn kind(&self) -> RequestKind {
        self.kind
    }

    /// OAuth token from `payload.accessToken`.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.payload.get("accessToken").and_then(Value::as_str)
    }

    /// Target identifier from `payload.appliance.applianceId`.
    #[must_use]
    pub fn appliance_id(&self) -> Option<&str> {
        self.appliance_field("applianceId").and_then(Value::as_str)
    }

    /// Details attached to the appliance at discovery time, from
    /// `payload.appliance.additionalApplianceDetails`.
    #[must_use]
    pub fn appliance_details(&self) -> Option<&Map<String, Value>> {
        self.appliance_field("additionalApplianceDetails")
            .and_then(Value::as_object)
    }

    fn appliance_field(&self, key: &str) -> Option<&Value> {
        self.payload.get("appliance").and_then(|appliance| appliance.get(key))
    }

    /// Looks up `payload.<key>.value`.
    pub(crate) fn payload_value(&self, key: &str) -> Option<&Value> {
        self.payload.get(key).and_then(|entry| entry.get("value"))
    }

    /// Builds the response header for this request.
    ///
    /// Without an override the name is the request name with its `Request`
    /// suffix replaced by `Confirmation` for control requests or `Response`
    /// otherwise. All other fields are copied from the request header.
    #[must_use]
    pub fn response_header(&self, name: Option<&str>) -> Header {
        let mut header = self.header.clone();
        header.name = name.map_or_else(|| self.default_response_name(), str::to_owned);
        header
    }

    fn default_response_name(&self) -> String {
        let suffix = if self.header.namespace == Namespace::Control.as_str() {
            "Confirmation"
        } else {
            "Response"
        };
        let mut name = strip_request_suffix(&self.header.name).to_owned();
        name.push_str(suffix);
        name
    }

    /// Composes a response from a payload and an optional explicit header.
    #[must_use]
    pub fn raw_response(&self, payload: Map<String, Value>, header: Option<Header>) -> Response {
        Response {
            header: header.unwrap_or_else(|| self.response_header(None)),
            payload,
        }
    }

    /// Response with an empty payload.
    #[must_use]
    pub fn response(&self) -> Response {
        self.raw_response(Map::new(), None)
    }

    /// Error response carrying the error's name, namespace and payload.
    #[must_use]
    pub fn exception_response(&self, error: &SmarthomeError) -> Response {
        let mut header = self.response_header(Some(error.name()));
        error.namespace().as_str().clone_into(&mut header.namespace);
        Response {
            header,
            payload: error.payload().clone(),
        }
    }

    /// Typed view over the request selected by its kind.
    #[must_use]
    pub const fn variant(&self) -> RequestVariant<'_> {
        RequestVariant::of(self)
    }

    /// Discovery view, for `DiscoverAppliancesRequest` only.
    #[must_use]
    pub fn as_discover(&self) -> Option<DiscoverRequest<'_>> {
        (self.kind == RequestKind::Discover).then_some(DiscoverRequest::new(self))
    }

    /// Percentage view, for percentage requests only.
    #[must_use]
    pub fn as_percentage(&self) -> Option<PercentageRequest<'_>> {
        (self.kind == RequestKind::Percentage).then_some(PercentageRequest::new(self))
    }

    /// Temperature change view, for target temperature changes only.
    #[must_use]
    pub fn as_change_temperature(&self) -> Option<ChangeTemperatureRequest<'_>> {
        (self.kind == RequestKind::ChangeTemperature)
            .then_some(ChangeTemperatureRequest::new(self))
    }

    /// Target temperature query view.
    #[must_use]
    pub fn as_get_target_temperature(&self) -> Option<GetTargetTemperatureRequest<'_>> {
        (self.kind == RequestKind::GetTargetTemperature)
            .then_some(GetTargetTemperatureRequest::new(self))
    }

    /// Temperature reading view.
    #[must_use]
    pub fn as_temperature_reading(&self) -> Option<TemperatureReadingRequest<'_>> {
        (self.kind == RequestKind::TemperatureReading)
            .then_some(TemperatureReadingRequest::new(self))
    }

    /// Lock state view, for get and set lock requests.
    #[must_use]
    pub fn as_lock_state(&self) -> Option<LockStateRequest<'_>> {
        (self.kind == RequestKind::LockState).then_some(LockStateRequest::new(self))
    }

    /// Health check view.
    #[must_use]
    pub fn as_health_check(&self) -> Option<HealthCheckRequest<'_>> {
        (self.kind == RequestKind::HealthCheck).then_some(HealthCheckRequest::new(self))
    }
}
