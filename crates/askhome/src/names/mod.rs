//! Canonical capability naming.
//!
//! Every dispatch key passes through [`action_name`] or [`request_name`], so
//! `turn_on`, `TurnOn` and `TurnOnRequest` all land on the same table slot.


/// Suffix carried by every inbound request name.
pub const REQUEST_SUFFIX: &str = "Request";

/// Returns the lower-camel action name for an identifier.
///
/// # Examples
///
/// ```
/// use askhome::names::action_name;
///
/// assert_eq!(action_name("turn_on"), "turnOn");
/// assert_eq!(action_name("SetTargetTemperatureRequest"), "setTargetTemperature");
/// ```
#[must_use]
pub fn action_name(identifier: &str) -> String {
    let camel = camelize(identifier);
    let mut chars = camel.chars();
    let lowered: String = chars.next().map_or_else(String::new, |first| {
        first.to_lowercase().chain(chars).collect()
    });
    strip_request_suffix(&lowered).to_owned()
}

/// Returns the upper-camel request name for an identifier.
///
/// The `Request` suffix is appended exactly once.
///
/// # Examples
///
/// ```
/// use askhome::names::request_name;
///
/// assert_eq!(request_name("turn_on"), "TurnOnRequest");
/// assert_eq!(request_name("TurnOffRequest"), "TurnOffRequest");
/// ```
#[must_use]
pub fn request_name(identifier: &str) -> String {
    let camel = camelize(identifier);
    let mut name = strip_request_suffix(&camel).to_owned();
    name.push_str(REQUEST_SUFFIX);
    name
}

/// Removes a single trailing `Request` word, if present.
#[must_use]
pub fn strip_request_suffix(name: &str) -> &str {
    name.strip_suffix(REQUEST_SUFFIX).unwrap_or(name)
}

/// Upper-camel form of an identifier.
///
/// The first character is upper-cased and every `_` followed by a character
/// is replaced by that character upper-cased. Matches are taken left to
/// right without overlap, so `a__b` becomes `A_b` and `_private` keeps its
/// leading underscore.
fn camelize(identifier: &str) -> String {
    let mut out = String::with_capacity(identifier.len());
    let mut chars = identifier.chars().peekable();
    if let Some(first) = chars.next() {
        out.extend(first.to_uppercase());
    }
    while let Some(ch) = chars.next() {
        match (ch, chars.peek().copied()) {
            ('_', Some(next)) => {
                chars.next();
                out.extend(next.to_uppercase());
            }
            _ => out.push(ch),
        }
    }
    out
}
