//! Request routing and response shaping for Alexa smart-home skills.
//!
//! Appliance types declare their capabilities once in a [`Capabilities`]
//! table. A [`Smarthome`] registers appliance instances by identifier,
//! answers discovery and health checks, routes control and query requests to
//! the matching handler and shapes the response, turning any
//! [`SmarthomeError`] into a protocol error response.
//!
//! ```
//! use askhome::{Smarthome, Namespace};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), askhome::DispatchError> {
//! let home = Smarthome::new();
//! let response = home.handle(json!({
//!     "header": {
//!         "messageId": "1",
//!         "name": "TurnOnRequest",
//!         "namespace": "Alexa.ConnectedHome.Control",
//!         "payloadVersion": "2"
//!     },
//!     "payload": {"appliance": {"applianceId": "missing", "additionalApplianceDetails": {}}}
//! }))?;
//! assert_eq!(response.header.name, "UnsupportedTargetError");
//! assert_eq!(response.header.namespace, Namespace::Control.as_str());
//! # Ok(())
//! # }
//! ```

pub mod capability;
pub mod details;
pub mod error;
pub mod names;
pub mod request;
pub mod smarthome;
pub mod telemetry;

#[cfg(test)]
mod tests;

pub use self::capability::{
    Appliance, ApplianceInfo, ApplianceType, Capabilities, CapabilitiesBuilder, Handler,
};
pub use self::details::{ApplianceDetails, DiscoveredAppliance, RegistrationError};
pub use self::error::{
    DispatchError, ErrorInfo, ErrorKind, HandlerError, HandlerResult, SmarthomeError,
};
pub use self::request::{
    Header, LockState, Namespace, Request, RequestError, RequestKind, RequestVariant, Response,
    TargetTemperatureState, TemperatureChange, TemperatureMode, Timestamp,
};
pub use self::smarthome::{Registration, Smarthome};

/// Tracing target for dispatch events.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
