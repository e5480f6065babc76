//! Domain error taxonomy and dispatch failures.
//!
//! [`SmarthomeError`] values are the only failures the dispatcher recovers:
//! each one becomes a well-formed error response carrying its wire name,
//! namespace and structured payload. Everything else surfaces as a
//! [`DispatchError`] for the hosting wrapper to deal with.

use std::error::Error as StdError;

use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::request::{Namespace, RequestError};


/// Code and optional description reported with value get/set failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Machine-readable failure code such as `DEVICE_JAMMED`.
    pub code: String,
    /// Optional free-form description.
    pub description: Option<String>,
}

impl ErrorInfo {
    /// Builds an error info block with only a code.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: None,
        }
    }

    /// Attaches a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn to_value(&self) -> Value {
        let mut info = Map::new();
        info.insert("code".to_owned(), Value::from(self.code.as_str()));
        if let Some(description) = &self.description {
            info.insert("description".to_owned(), Value::from(description.as_str()));
        }
        Value::Object(info)
    }
}

/// Closed set of error conditions understood by the smart-home protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// The requested value lies outside the supported range.
    ValueOutOfRange {
        /// Lowest accepted value.
        minimum: f64,
        /// Highest accepted value.
        maximum: f64,
    },
    /// The target device is not connected or not powered.
    TargetOffline,
    /// The target device was never configured.
    NoSuchTarget,
    /// The bridge connecting the device is powered off.
    BridgeOffline,
    /// Generic runtime failure inside the skill adapter.
    DriverInternal,
    /// A service the adapter depends on is unavailable.
    DependentServiceUnavailable {
        /// Name of the unavailable service.
        service_name: String,
    },
    /// Cloud connectivity of the device is unreliable.
    TargetConnectivityUnstable,
    /// Cloud connectivity of the bridge is unreliable.
    TargetBridgeConnectivityUnstable,
    /// The device firmware is too old.
    TargetFirmwareOutdated {
        /// Oldest supported firmware version.
        minimum_version: String,
        /// Firmware version currently installed.
        current_version: String,
    },
    /// The bridge firmware is too old.
    TargetBridgeFirmwareOutdated {
        /// Oldest supported firmware version.
        minimum_version: String,
        /// Firmware version currently installed.
        current_version: String,
    },
    /// The device reported a hardware fault.
    TargetHardwareMalfunction,
    /// The bridge reported a hardware fault.
    TargetBridgeHardwareMalfunction,
    /// Reading a value from the device failed.
    UnableToGetValue(ErrorInfo),
    /// Writing a value to the device failed.
    UnableToSetValue(ErrorInfo),
    /// The device refuses to apply the requested value.
    UnwillingToSetValue(ErrorInfo),
    /// The device accepts no more requests in the current window.
    RateLimitExceeded {
        /// Number of requests accepted per unit.
        rate_limit: u32,
        /// Window unit, typically `HOUR`.
        time_unit: String,
    },
    /// The device is in a mode that cannot be controlled remotely.
    NotSupportedInCurrentMode {
        /// Mode the device currently reports.
        current_mode: String,
    },
    /// The access token has expired.
    ExpiredAccessToken,
    /// The access token is invalid for another reason.
    InvalidAccessToken,
    /// The target device is not handled by this adapter.
    UnsupportedTarget,
    /// The target device does not support the requested operation.
    UnsupportedOperation,
    /// The requested setting is not valid for the device.
    UnsupportedTargetSetting,
    /// The request could not be understood.
    UnexpectedInformationReceived {
        /// Name of the offending parameter.
        faulting_parameter: String,
    },
}

impl ErrorKind {
    /// Default response name for the kind.
    #[must_use]
    pub const fn wire_name(&self) -> &'static str {
        match self {
            Self::ValueOutOfRange { .. } => "ValueOutOfRangeError",
            Self::TargetOffline => "TargetOfflineError",
            Self::NoSuchTarget => "NoSuchTargetError",
            Self::BridgeOffline => "BridgeOfflineError",
            Self::DriverInternal => "DriverInternalError",
            Self::DependentServiceUnavailable { .. } => "DependentServiceUnavailableError",
            Self::TargetConnectivityUnstable => "TargetConnectivityUnstableError",
            Self::TargetBridgeConnectivityUnstable => "TargetBridgeConnectivityUnstableError",
            Self::TargetFirmwareOutdated { .. } => "TargetFirmwareOutdatedError",
            Self::TargetBridgeFirmwareOutdated { .. } => "TargetBridgeFirmwareOutdatedError",
            Self::TargetHardwareMalfunction => "TargetHardwareMalfunctionError",
            Self::TargetBridgeHardwareMalfunction => "TargetBridgeHardwareMalfunctionError",
            Self::UnableToGetValue(_) => "UnableToGetValueError",
            Self::UnableToSetValue(_) => "UnableToSetValueError",
            Self::UnwillingToSetValue(_) => "UnwillingToSetValueError",
            Self::RateLimitExceeded { .. } => "RateLimitExceededError",
            Self::NotSupportedInCurrentMode { .. } => "NotSupportedInCurrentModeError",
            Self::ExpiredAccessToken => "ExpiredAccessTokenError",
            Self::InvalidAccessToken => "InvalidAccessTokenError",
            Self::UnsupportedTarget => "UnsupportedTargetError",
            Self::UnsupportedOperation => "UnsupportedOperationError",
            Self::UnsupportedTargetSetting => "UnsupportedTargetSettingError",
            Self::UnexpectedInformationReceived { .. } => "UnexpectedInformationReceivedError",
        }
    }

    /// Namespace the error response is reported under.
    #[must_use]
    pub const fn namespace(&self) -> Namespace {
        match self {
            Self::UnableToGetValue(_) => Namespace::Query,
            _ => Namespace::Control,
        }
    }

    /// Structured payload derived from the kind's fields.
    #[must_use]
    pub fn payload(&self) -> Map<String, Value> {
        let value = match self {
            Self::ValueOutOfRange { minimum, maximum } => json!({
                "minimumValue": minimum,
                "maximumValue": maximum,
            }),
            Self::DependentServiceUnavailable { service_name } => {
                json!({ "dependentServiceName": service_name })
            }
            Self::TargetFirmwareOutdated {
                minimum_version,
                current_version,
            }
            | Self::TargetBridgeFirmwareOutdated {
                minimum_version,
                current_version,
            } => json!({
                "minimumFirmwareVersion": minimum_version,
                "currentFirmwareVersion": current_version,
            }),
            Self::UnableToGetValue(info)
            | Self::UnableToSetValue(info)
            | Self::UnwillingToSetValue(info) => json!({ "errorInfo": info.to_value() }),
            Self::RateLimitExceeded {
                rate_limit,
                time_unit,
            } => json!({ "rateLimit": rate_limit, "timeUnit": time_unit }),
            Self::NotSupportedInCurrentMode { current_mode } => {
                json!({ "currentDeviceMode": current_mode })
            }
            Self::UnexpectedInformationReceived { faulting_parameter } => {
                json!({ "faultingParameter": faulting_parameter })
            }
            _ => return Map::new(),
        };
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

/// A domain error raised by a capability handler or by the dispatcher.
///
/// The wire name defaults to [`ErrorKind::wire_name`] and the payload to
/// [`ErrorKind::payload`]; both can be replaced wholesale.
///
/// # Examples
///
/// ```
/// use askhome::{ErrorKind, SmarthomeError};
///
/// let error = SmarthomeError::value_out_of_range(10.0, 30.0);
/// assert_eq!(error.name(), "ValueOutOfRangeError");
/// assert_eq!(error.payload()["maximumValue"], 30.0);
///
/// let renamed = SmarthomeError::from(ErrorKind::TargetOffline).with_name("Gone");
/// assert_eq!(renamed.name(), "Gone");
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{name}")]
pub struct SmarthomeError {
    kind: ErrorKind,
    name: String,
    payload: Map<String, Value>,
}

impl SmarthomeError {
    /// Creates an error with the kind's default name and payload.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            name: kind.wire_name().to_owned(),
            payload: kind.payload(),
            kind,
        }
    }

    /// Overrides the response name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replaces the payload wholesale.
    #[must_use]
    pub fn with_payload(mut self, payload: Map<String, Value>) -> Self {
        self.payload = payload;
        self
    }

    /// Kind this error was built from.
    #[must_use]
    pub const fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Response name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Namespace the error response is reported under.
    #[must_use]
    pub const fn namespace(&self) -> Namespace {
        self.kind.namespace()
    }

    /// Response payload.
    #[must_use]
    pub const fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// A value outside `minimum..=maximum` was requested.
    #[must_use]
    pub fn value_out_of_range(minimum: f64, maximum: f64) -> Self {
        Self::new(ErrorKind::ValueOutOfRange { minimum, maximum })
    }

    /// A dependent service is down.
    #[must_use]
    pub fn dependent_service_unavailable(service_name: impl Into<String>) -> Self {
        Self::new(ErrorKind::DependentServiceUnavailable {
            service_name: service_name.into(),
        })
    }

    /// The device firmware is older than `minimum_version`.
    #[must_use]
    pub fn target_firmware_outdated(
        minimum_version: impl Into<String>,
        current_version: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::TargetFirmwareOutdated {
            minimum_version: minimum_version.into(),
            current_version: current_version.into(),
        })
    }

    /// The bridge firmware is older than `minimum_version`.
    #[must_use]
    pub fn target_bridge_firmware_outdated(
        minimum_version: impl Into<String>,
        current_version: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::TargetBridgeFirmwareOutdated {
            minimum_version: minimum_version.into(),
            current_version: current_version.into(),
        })
    }

    /// Reading a value failed with `info`.
    #[must_use]
    pub fn unable_to_get_value(info: ErrorInfo) -> Self {
        Self::new(ErrorKind::UnableToGetValue(info))
    }

    /// Writing a value failed with `info`.
    #[must_use]
    pub fn unable_to_set_value(info: ErrorInfo) -> Self {
        Self::new(ErrorKind::UnableToSetValue(info))
    }

    /// The device refuses the value; the code defaults to `ThermostatIsOff`.
    #[must_use]
    pub fn unwilling_to_set_value(info: Option<ErrorInfo>) -> Self {
        Self::new(ErrorKind::UnwillingToSetValue(
            info.unwrap_or_else(|| ErrorInfo::new("ThermostatIsOff")),
        ))
    }

    /// Too many requests; the unit defaults to `HOUR`.
    #[must_use]
    pub fn rate_limit_exceeded(rate_limit: u32, time_unit: Option<&str>) -> Self {
        Self::new(ErrorKind::RateLimitExceeded {
            rate_limit,
            time_unit: time_unit.unwrap_or("HOUR").to_owned(),
        })
    }

    /// The device is in `current_mode` and cannot be controlled.
    #[must_use]
    pub fn not_supported_in_current_mode(current_mode: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotSupportedInCurrentMode {
            current_mode: current_mode.into(),
        })
    }

    /// The request carried an unusable `faulting_parameter`.
    #[must_use]
    pub fn unexpected_information_received(faulting_parameter: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnexpectedInformationReceived {
            faulting_parameter: faulting_parameter.into(),
        })
    }
}

impl From<ErrorKind> for SmarthomeError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// Failure returned by a capability handler or dispatcher hook.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Recoverable domain error, translated into an error response.
    #[error("{0}")]
    Domain(Box<SmarthomeError>),
    /// Any other failure; propagated to the caller of the dispatcher.
    #[error("{0}")]
    Fatal(Box<dyn StdError + Send + Sync>),
}

impl HandlerError {
    /// Wraps an arbitrary error as a fatal handler failure.
    pub fn fatal(error: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Fatal(error.into())
    }

    /// Returns the domain error, if this is one.
    #[must_use]
    pub fn as_domain(&self) -> Option<&SmarthomeError> {
        match self {
            Self::Domain(error) => Some(&**error),
            Self::Fatal(_) => None,
        }
    }
}

impl From<SmarthomeError> for HandlerError {
    fn from(error: SmarthomeError) -> Self {
        Self::Domain(Box::new(error))
    }
}

impl From<ErrorKind> for HandlerError {
    fn from(kind: ErrorKind) -> Self {
        Self::from(SmarthomeError::new(kind))
    }
}

/// Outcome of a capability handler: `Ok(None)` means "empty confirmation".
pub type HandlerResult = Result<Option<crate::request::Response>, HandlerError>;

/// Errors that escape [`crate::Smarthome::handle`].
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The inbound event was not a valid request envelope.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// A handler or hook failed with a non-domain error.
    #[error("handler for {request} failed: {source}")]
    Handler {
        /// Name of the request being dispatched.
        request: String,
        /// Underlying failure.
        source: Box<dyn StdError + Send + Sync>,
    },
}
