//! The dispatcher: appliance registry plus request routing.
//!
//! [`Smarthome::handle`] is the single entry point. It parses the event,
//! answers discovery and health checks itself (unless a hook takes over),
//! resolves the target appliance type, runs the capability handler and turns
//! domain errors into error responses. Non-domain failures propagate.


use std::fmt;
use std::sync::{PoisonError, RwLock};

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::DISPATCH_TARGET;
use crate::capability::{Appliance, ApplianceType};
use crate::details::{
    ApplianceDetails, DiscoveredAppliance, RegistrationError, validate_appliance_id,
};
use crate::error::{DispatchError, ErrorKind, HandlerError, HandlerResult};
use crate::request::{DiscoverRequest, Request, RequestVariant, Response};

const HEALTHY_DESCRIPTION: &str = "Everything's OK";

type RequestHook = Box<dyn Fn(&Smarthome, &Request) -> HandlerResult + Send + Sync>;
type ResolveHook =
    Box<dyn Fn(&Smarthome, &Request) -> Result<ApplianceType, HandlerError> + Send + Sync>;

/// A registered appliance: its type and resolved discovery record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    appliance_type: ApplianceType,
    discovered: DiscoveredAppliance,
}

impl Registration {
    /// Appliance type requests are routed to.
    #[must_use]
    pub const fn appliance_type(&self) -> &ApplianceType {
        &self.appliance_type
    }

    /// Record emitted during discovery.
    #[must_use]
    pub const fn discovered(&self) -> &DiscoveredAppliance {
        &self.discovered
    }
}

/// Routes smart-home requests to registered appliance types.
///
/// # Examples
///
/// ```
/// use askhome::{Appliance, ApplianceDetails, ApplianceInfo, Capabilities, HandlerResult};
/// use askhome::{Request, Smarthome};
/// use once_cell::sync::Lazy;
/// use serde_json::json;
///
/// struct Light {
///     info: ApplianceInfo,
/// }
///
/// impl Light {
///     fn turn_on(&mut self, _request: &Request) -> HandlerResult {
///         Ok(None)
///     }
/// }
///
/// impl Appliance for Light {
///     fn from_request(request: &Request) -> Self {
///         Self { info: ApplianceInfo::from_request(request) }
///     }
///
///     fn capabilities() -> &'static Capabilities<Self> {
///         static CAPABILITIES: Lazy<Capabilities<Light>> = Lazy::new(|| {
///             Capabilities::<Light>::builder()
///                 .action("turn_on", Light::turn_on)
///                 .build()
///         });
///         &CAPABILITIES
///     }
/// }
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let home = Smarthome::new();
/// home.add_appliance::<Light>("kitchen", ApplianceDetails::new().with_name("Kitchen Light"))?;
///
/// let response = home.handle(json!({
///     "header": {
///         "messageId": "1",
///         "name": "TurnOnRequest",
///         "namespace": "Alexa.ConnectedHome.Control",
///         "payloadVersion": "2"
///     },
///     "payload": {"appliance": {"applianceId": "kitchen", "additionalApplianceDetails": {}}}
/// }))?;
/// assert_eq!(response.header.name, "TurnOnConfirmation");
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct Smarthome {
    defaults: ApplianceDetails,
    appliances: RwLock<IndexMap<String, Registration>>,
    discover_hook: Option<RequestHook>,
    resolve_hook: Option<ResolveHook>,
    health_check_hook: Option<RequestHook>,
}

impl Smarthome {
    /// Empty dispatcher with no detail defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty dispatcher whose registrations fall back to `defaults`.
    #[must_use]
    pub fn with_defaults(defaults: ApplianceDetails) -> Self {
        Self {
            defaults,
            ..Self::default()
        }
    }

    /// Dispatcher-level detail defaults.
    #[must_use]
    pub const fn defaults(&self) -> &ApplianceDetails {
        &self.defaults
    }

    /// Answers discovery requests with `hook` instead of the registry.
    ///
    /// Useful when listing every appliance up front is too expensive; pair
    /// it with [`Self::on_resolve_appliance`].
    #[must_use]
    pub fn on_discover<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Self, &Request) -> HandlerResult + Send + Sync + 'static,
    {
        self.discover_hook = Some(Box::new(hook));
        self
    }

    /// Resolves the target appliance type with `hook` instead of the registry.
    #[must_use]
    pub fn on_resolve_appliance<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Self, &Request) -> Result<ApplianceType, HandlerError> + Send + Sync + 'static,
    {
        self.resolve_hook = Some(Box::new(hook));
        self
    }

    /// Answers health checks with `hook` instead of the default healthy reply.
    #[must_use]
    pub fn on_health_check<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Self, &Request) -> HandlerResult + Send + Sync + 'static,
    {
        self.health_check_hook = Some(Box::new(hook));
        self
    }

    /// Registers appliance type `A` under `id`.
    ///
    /// Details resolve as `details`, then `A::details()`, then the
    /// dispatcher defaults, then the built-in fallbacks. Registering an
    /// existing id replaces the previous entry in place, keeping its
    /// position in discovery.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] when `id` violates the identifier rules.
    pub fn add_appliance<A: Appliance>(
        &self,
        id: &str,
        details: ApplianceDetails,
    ) -> Result<(), RegistrationError> {
        self.add_appliance_type(id, ApplianceType::of::<A>(), details)
    }

    /// Registers an already erased appliance type under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError`] when `id` violates the identifier rules.
    pub fn add_appliance_type(
        &self,
        id: &str,
        appliance_type: ApplianceType,
        details: ApplianceDetails,
    ) -> Result<(), RegistrationError> {
        validate_appliance_id(id)?;
        let discovered = details
            .or(&appliance_type.details())
            .or(&self.defaults)
            .resolve(id, appliance_type.action_names());
        debug!(
            target: DISPATCH_TARGET,
            appliance_id = id,
            appliance_type = appliance_type.type_name(),
            actions = ?discovered.actions,
            "registered appliance"
        );
        self.appliances
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id.to_owned(),
                Registration {
                    appliance_type,
                    discovered,
                },
            );
        Ok(())
    }

    /// Registration for `id`, if any.
    #[must_use]
    pub fn appliance(&self, id: &str) -> Option<Registration> {
        self.appliances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Registered identifiers in registration order.
    #[must_use]
    pub fn appliance_ids(&self) -> Vec<String> {
        self.appliances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Discovery records of every registered appliance in registration order.
    #[must_use]
    pub fn discovered_appliances(&self) -> Vec<DiscoveredAppliance> {
        self.appliances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|registration| registration.discovered.clone())
            .collect()
    }

    /// Default discovery response listing every registered appliance.
    #[must_use]
    pub fn discover(&self, request: &DiscoverRequest<'_>) -> Response {
        request.response(&self.discovered_appliances())
    }

    /// Handles a raw event.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Request`] for malformed events and
    /// [`DispatchError::Handler`] when a handler or hook fails with a
    /// non-domain error.
    pub fn handle(&self, data: Value) -> Result<Response, DispatchError> {
        debug!(target: DISPATCH_TARGET, request = %data, "received request");
        self.handle_request(&Request::parse(data)?)
    }

    /// Handles a raw event together with the host's invocation context.
    ///
    /// # Errors
    ///
    /// As for [`Self::handle`].
    pub fn handle_with_context(
        &self,
        data: Value,
        context: Value,
    ) -> Result<Response, DispatchError> {
        debug!(target: DISPATCH_TARGET, request = %data, "received request");
        self.handle_request(&Request::parse(data)?.with_context(context))
    }

    /// Handles an already parsed request.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Handler`] when a handler or hook fails with a
    /// non-domain error.
    pub fn handle_request(&self, request: &Request) -> Result<Response, DispatchError> {
        let response = match self.dispatch(request) {
            Ok(response) => response,
            Err(HandlerError::Domain(error)) => {
                let payload = Value::Object(error.payload().clone());
                info!(
                    target: DISPATCH_TARGET,
                    request = request.name(),
                    error = error.name(),
                    payload = %payload,
                    "domain error raised"
                );
                request.exception_response(&error)
            }
            Err(HandlerError::Fatal(source)) => {
                warn!(
                    target: DISPATCH_TARGET,
                    request = request.name(),
                    error = %source,
                    "handler failed"
                );
                return Err(DispatchError::Handler {
                    request: request.name().to_owned(),
                    source,
                });
            }
        };
        debug!(target: DISPATCH_TARGET, response = %response.to_value(), "sending response");
        Ok(response)
    }

    fn dispatch(&self, request: &Request) -> Result<Response, HandlerError> {
        match request.variant() {
            RequestVariant::Discover(view) => self.discover_hook.as_ref().map_or_else(
                || Ok(self.discover(&view)),
                |hook| complete(request, hook(self, request)),
            ),
            RequestVariant::HealthCheck(view) => self.health_check_hook.as_ref().map_or_else(
                || Ok(view.response(true, HEALTHY_DESCRIPTION)),
                |hook| complete(request, hook(self, request)),
            ),
            _ => {
                let appliance_type = self.resolve(request)?;
                let outcome = appliance_type
                    .invoke(request)
                    .ok_or(ErrorKind::UnsupportedOperation)?;
                complete(request, outcome)
            }
        }
    }

    fn resolve(&self, request: &Request) -> Result<ApplianceType, HandlerError> {
        if let Some(hook) = &self.resolve_hook {
            return hook(self, request);
        }
        let registered = request
            .appliance_id()
            .and_then(|id| self.appliance(id))
            .ok_or(ErrorKind::UnsupportedTarget)?;
        Ok(registered.appliance_type)
    }
}

/// Fills in the empty confirmation when a handler returns no response.
fn complete(request: &Request, outcome: HandlerResult) -> Result<Response, HandlerError> {
    Ok(outcome?.unwrap_or_else(|| request.response()))
}

impl fmt::Debug for Smarthome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Smarthome")
            .field("defaults", &self.defaults)
            .field("appliances", &self.appliance_ids())
            .field("discover_hook", &self.discover_hook.is_some())
            .field("resolve_hook", &self.resolve_hook.is_some())
            .field("health_check_hook", &self.health_check_hook.is_some())
            .finish()
    }
}
