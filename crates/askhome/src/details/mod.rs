//! Discovery metadata for registered appliances.
//!
//! Details are layered: values given at registration win over the appliance
//! type's own defaults, which win over the dispatcher defaults, which win
//! over the built-in fallbacks.


use serde_json::{Map, Value};
use thiserror::Error;

/// Longest accepted appliance identifier.
pub const MAX_APPLIANCE_ID_LEN: usize = 256;

const DEFAULT_DESCRIPTION: &str = "No description";
const DEFAULT_MODEL: &str = "Unknown model";
const DEFAULT_VERSION: &str = "v1";
const DEFAULT_MANUFACTURER: &str = "Unknown manufacturer";

/// Optional discovery metadata; unset fields fall through to the next layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplianceDetails {
    /// Name the customer uses for the device.
    pub name: Option<String>,
    /// Human-readable description, e.g. how the device is connected.
    pub description: Option<String>,
    /// Opaque details echoed back with every request for the appliance.
    pub additional_details: Option<Map<String, Value>>,
    /// Model name.
    pub model: Option<String>,
    /// Vendor-provided version.
    pub version: Option<String>,
    /// Manufacturer name.
    pub manufacturer: Option<String>,
    /// Whether the device is currently reachable.
    pub reachable: Option<bool>,
}

impl ApplianceDetails {
    /// Details with every field unset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the friendly name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the additional details map.
    #[must_use]
    pub fn with_additional_details(mut self, details: Map<String, Value>) -> Self {
        self.additional_details = Some(details);
        self
    }

    /// Sets the model name.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Sets the manufacturer.
    #[must_use]
    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    /// Sets the reachability flag.
    #[must_use]
    pub const fn with_reachable(mut self, reachable: bool) -> Self {
        self.reachable = Some(reachable);
        self
    }

    /// Fills unset fields from `fallback`.
    #[must_use]
    pub fn or(self, fallback: &Self) -> Self {
        Self {
            name: self.name.or_else(|| fallback.name.clone()),
            description: self.description.or_else(|| fallback.description.clone()),
            additional_details: self
                .additional_details
                .or_else(|| fallback.additional_details.clone()),
            model: self.model.or_else(|| fallback.model.clone()),
            version: self.version.or_else(|| fallback.version.clone()),
            manufacturer: self.manufacturer.or_else(|| fallback.manufacturer.clone()),
            reachable: self.reachable.or(fallback.reachable),
        }
    }

    /// Produces the wire record, applying the built-in fallbacks.
    #[must_use]
    pub fn resolve(self, appliance_id: &str, actions: Vec<String>) -> DiscoveredAppliance {
        DiscoveredAppliance {
            appliance_id: appliance_id.to_owned(),
            friendly_name: self.name.unwrap_or_default(),
            friendly_description: self
                .description
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_owned()),
            additional_appliance_details: self.additional_details.unwrap_or_default(),
            model_name: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            version: self.version.unwrap_or_else(|| DEFAULT_VERSION.to_owned()),
            manufacturer_name: self
                .manufacturer
                .unwrap_or_else(|| DEFAULT_MANUFACTURER.to_owned()),
            is_reachable: self.reachable.unwrap_or(true),
            actions,
        }
    }
}

/// Fully resolved discovery record for one appliance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredAppliance {
    /// Stable appliance identifier.
    pub appliance_id: String,
    /// Friendly name.
    pub friendly_name: String,
    /// Friendly description.
    pub friendly_description: String,
    /// Opaque details echoed back with requests.
    pub additional_appliance_details: Map<String, Value>,
    /// Model name.
    pub model_name: String,
    /// Vendor version.
    pub version: String,
    /// Manufacturer name.
    pub manufacturer_name: String,
    /// Reachability flag.
    pub is_reachable: bool,
    /// Sorted action names the appliance advertises.
    pub actions: Vec<String>,
}

impl DiscoveredAppliance {
    /// Renders the record with protocol field names.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut record = Map::new();
        record.insert("applianceId".to_owned(), Value::from(self.appliance_id.as_str()));
        record.insert("friendlyName".to_owned(), Value::from(self.friendly_name.as_str()));
        record.insert(
            "friendlyDescription".to_owned(),
            Value::from(self.friendly_description.as_str()),
        );
        record.insert(
            "additionalApplianceDetails".to_owned(),
            Value::Object(self.additional_appliance_details.clone()),
        );
        record.insert("modelName".to_owned(), Value::from(self.model_name.as_str()));
        record.insert("version".to_owned(), Value::from(self.version.as_str()));
        record.insert(
            "manufacturerName".to_owned(),
            Value::from(self.manufacturer_name.as_str()),
        );
        record.insert("isReachable".to_owned(), Value::Bool(self.is_reachable));
        record.insert(
            "actions".to_owned(),
            Value::Array(self.actions.iter().map(|action| Value::from(action.as_str())).collect()),
        );
        Value::Object(record)
    }
}

/// Errors raised when registering an appliance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// The identifier is empty.
    #[error("appliance identifier must not be empty")]
    EmptyId,

    /// The identifier exceeds [`MAX_APPLIANCE_ID_LEN`].
    #[error("appliance identifier is {length} characters long, the limit is {max}")]
    IdTooLong {
        /// Length of the rejected identifier.
        length: usize,
        /// Maximum accepted length.
        max: usize,
    },

    /// The identifier contains a character outside the accepted set.
    #[error("appliance identifier {id:?} contains unsupported character {character:?}")]
    InvalidCharacter {
        /// Rejected identifier.
        id: String,
        /// First offending character.
        character: char,
    },
}

/// Checks an appliance identifier against the protocol's constraints.
///
/// Identifiers are 1 to 256 characters of ASCII letters, digits and
/// `_ - = # ; : ? @ &`.
///
/// # Errors
///
/// Returns the first violated constraint as a [`RegistrationError`].
pub fn validate_appliance_id(id: &str) -> Result<(), RegistrationError> {
    if id.is_empty() {
        return Err(RegistrationError::EmptyId);
    }
    let length = id.chars().count();
    if length > MAX_APPLIANCE_ID_LEN {
        return Err(RegistrationError::IdTooLong {
            length,
            max: MAX_APPLIANCE_ID_LEN,
        });
    }
    id.chars()
        .find(|ch| !is_id_char(*ch))
        .map_or(Ok(()), |character| {
            Err(RegistrationError::InvalidCharacter {
                id: id.to_owned(),
                character,
            })
        })
}

const fn is_id_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '=' | '#' | ';' | ':' | '?' | '@' | '&')
}
