//! Per-type capability tables and type-erased appliance handles.
//!
//! Each appliance type builds one [`Capabilities`] table, usually inside a
//! `once_cell` static, mapping canonical action and request names to shared
//! handlers. Actions are advertised during discovery and dispatchable;
//! queries are dispatchable only.


use std::any::{TypeId, type_name};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::details::ApplianceDetails;
use crate::error::HandlerResult;
use crate::names::{action_name, request_name};
use crate::request::Request;

/// Shared capability handler for appliance type `A`.
pub type Handler<A> = Arc<dyn Fn(&mut A, &Request) -> HandlerResult + Send + Sync>;

/// Read-only dispatch table for one appliance type.
pub struct Capabilities<A> {
    actions: BTreeMap<String, Handler<A>>,
    request_handlers: BTreeMap<String, Handler<A>>,
}

impl<A: 'static> Capabilities<A> {
    /// Starts an empty table.
    #[must_use]
    pub const fn builder() -> CapabilitiesBuilder<A> {
        CapabilitiesBuilder {
            actions: BTreeMap::new(),
            request_handlers: BTreeMap::new(),
        }
    }

    /// Handlers keyed by lower-camel action name.
    #[must_use]
    pub const fn actions(&self) -> &BTreeMap<String, Handler<A>> {
        &self.actions
    }

    /// Handlers keyed by full request name, queries included.
    #[must_use]
    pub const fn request_handlers(&self) -> &BTreeMap<String, Handler<A>> {
        &self.request_handlers
    }

    /// Sorted action names advertised during discovery.
    #[must_use]
    pub fn action_names(&self) -> Vec<String> {
        self.actions.keys().cloned().collect()
    }

    /// Handler for a request name, if the type supports it.
    #[must_use]
    pub fn request_handler(&self, name: &str) -> Option<&Handler<A>> {
        self.request_handlers.get(name)
    }
}

impl<A> fmt::Debug for Capabilities<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field(
                "request_handlers",
                &self.request_handlers.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Builder for [`Capabilities`].
///
/// Names pass through [`action_name`] and [`request_name`], so a later
/// registration under a canonically equal name replaces an earlier one.
pub struct CapabilitiesBuilder<A> {
    actions: BTreeMap<String, Handler<A>>,
    request_handlers: BTreeMap<String, Handler<A>>,
}

impl<A: 'static> CapabilitiesBuilder<A> {
    /// Registers an action named after `identifier`.
    #[must_use]
    pub fn action<F>(self, identifier: &str, handler: F) -> Self
    where
        F: Fn(&mut A, &Request) -> HandlerResult + Send + Sync + 'static,
    {
        self.action_for(&[identifier], handler)
    }

    /// Registers one handler under several action or request names.
    #[must_use]
    pub fn action_for<F>(mut self, names: &[&str], handler: F) -> Self
    where
        F: Fn(&mut A, &Request) -> HandlerResult + Send + Sync + 'static,
    {
        let shared: Handler<A> = Arc::new(handler);
        for name in names {
            self.actions.insert(action_name(name), Arc::clone(&shared));
            self.request_handlers
                .insert(request_name(name), Arc::clone(&shared));
        }
        self
    }

    /// Registers a query named after `identifier`.
    #[must_use]
    pub fn query<F>(self, identifier: &str, handler: F) -> Self
    where
        F: Fn(&mut A, &Request) -> HandlerResult + Send + Sync + 'static,
    {
        self.query_for(&[identifier], handler)
    }

    /// Registers one query handler under several names.
    ///
    /// A query replaces any action registered earlier under the same name,
    /// so the name stops being advertised during discovery.
    #[must_use]
    pub fn query_for<F>(mut self, names: &[&str], handler: F) -> Self
    where
        F: Fn(&mut A, &Request) -> HandlerResult + Send + Sync + 'static,
    {
        let shared: Handler<A> = Arc::new(handler);
        for name in names {
            self.actions.remove(&action_name(name));
            self.request_handlers
                .insert(request_name(name), Arc::clone(&shared));
        }
        self
    }

    /// Copies every entry of `parent`; later registrations override them.
    #[must_use]
    pub fn inherit(mut self, parent: &Capabilities<A>) -> Self {
        for (name, handler) in &parent.actions {
            self.actions.insert(name.clone(), Arc::clone(handler));
        }
        for (name, handler) in &parent.request_handlers {
            self.request_handlers.insert(name.clone(), Arc::clone(handler));
        }
        self
    }

    /// Copies the entries of a parent appliance type embedded in `A`.
    ///
    /// `project` exposes the parent state the inherited handlers operate on.
    #[must_use]
    pub fn inherit_from<P: 'static>(
        mut self,
        parent: &Capabilities<P>,
        project: fn(&mut A) -> &mut P,
    ) -> Self {
        for (name, handler) in &parent.actions {
            self.actions
                .insert(name.clone(), project_handler(handler, project));
        }
        for (name, handler) in &parent.request_handlers {
            self.request_handlers
                .insert(name.clone(), project_handler(handler, project));
        }
        self
    }

    /// Freezes the table.
    #[must_use]
    pub fn build(self) -> Capabilities<A> {
        Capabilities {
            actions: self.actions,
            request_handlers: self.request_handlers,
        }
    }
}

fn project_handler<A: 'static, P: 'static>(
    handler: &Handler<P>,
    project: fn(&mut A) -> &mut P,
) -> Handler<A> {
    let inner = Arc::clone(handler);
    Arc::new(move |appliance: &mut A, request: &Request| inner(project(appliance), request))
}

/// An appliance type the dispatcher can route requests to.
///
/// A fresh value is built for every dispatched request and dropped once the
/// handler returns.
///
/// # Examples
///
/// ```
/// use askhome::{Appliance, ApplianceInfo, Capabilities, HandlerResult, Request};
/// use once_cell::sync::Lazy;
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
/// assert_eq!(Light::capabilities().action_names(), vec!["turnOn".to_owned()]);
/// ```
pub trait Appliance: Sized + 'static {
    /// Builds the per-request appliance value.
    fn from_request(request: &Request) -> Self;

    /// Capability table shared by every value of the type.
    fn capabilities() -> &'static Capabilities<Self>;

    /// Type-level discovery defaults.
    #[must_use]
    fn details() -> ApplianceDetails {
        ApplianceDetails::default()
    }
}

/// Identifier and discovery details bound from `payload.appliance`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplianceInfo {
    /// Appliance identifier, when the request names one.
    pub id: Option<String>,
    /// Details attached at discovery time; empty when absent.
    pub additional_details: Map<String, Value>,
}

impl ApplianceInfo {
    /// Reads the appliance block of a request.
    #[must_use]
    pub fn from_request(request: &Request) -> Self {
        Self {
            id: request.appliance_id().map(str::to_owned),
            additional_details: request.appliance_details().cloned().unwrap_or_default(),
        }
    }
}

trait ErasedAppliance: Send + Sync {
    fn appliance_type_id(&self) -> TypeId;
    fn type_name(&self) -> &'static str;
    fn action_names(&self) -> Vec<String>;
    fn supports(&self, request_name: &str) -> bool;
    fn details(&self) -> ApplianceDetails;
    fn invoke(&self, request: &Request) -> Option<HandlerResult>;
}

struct Erased<A>(PhantomData<fn() -> A>);

impl<A: Appliance> ErasedAppliance for Erased<A> {
    fn appliance_type_id(&self) -> TypeId {
        TypeId::of::<A>()
    }

    fn type_name(&self) -> &'static str {
        type_name::<A>()
    }

    fn action_names(&self) -> Vec<String> {
        A::capabilities().action_names()
    }

    fn supports(&self, request_name: &str) -> bool {
        A::capabilities().request_handler(request_name).is_some()
    }

    fn details(&self) -> ApplianceDetails {
        A::details()
    }

    fn invoke(&self, request: &Request) -> Option<HandlerResult> {
        let handler = A::capabilities().request_handler(request.name())?;
        let mut appliance = A::from_request(request);
        Some(handler(&mut appliance, request))
    }
}

/// Type-erased handle to an [`Appliance`] implementation.
#[derive(Clone)]
pub struct ApplianceType(Arc<dyn ErasedAppliance>);

impl ApplianceType {
    /// Handle for appliance type `A`.
    #[must_use]
    pub fn of<A: Appliance>() -> Self {
        Self(Arc::new(Erased::<A>(PhantomData)))
    }

    /// Rust type name of the appliance, for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.0.type_name()
    }

    /// Sorted action names the type advertises.
    #[must_use]
    pub fn action_names(&self) -> Vec<String> {
        self.0.action_names()
    }

    /// Whether the type handles `request_name`.
    #[must_use]
    pub fn supports(&self, request_name: &str) -> bool {
        self.0.supports(request_name)
    }

    /// Type-level discovery defaults.
    #[must_use]
    pub fn details(&self) -> ApplianceDetails {
        self.0.details()
    }

    /// Builds an appliance for `request` and runs the matching handler.
    ///
    /// Returns `None` when the type has no handler for the request name.
    #[must_use]
    pub fn invoke(&self, request: &Request) -> Option<HandlerResult> {
        self.0.invoke(request)
    }
}

impl PartialEq for ApplianceType {
    fn eq(&self, other: &Self) -> bool {
        self.0.appliance_type_id() == other.0.appliance_type_id()
    }
}

impl Eq for ApplianceType {}

impl fmt::Debug for ApplianceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApplianceType")
            .field(&self.type_name())
            .finish()
    }
}
