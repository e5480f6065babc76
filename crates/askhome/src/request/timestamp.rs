use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

const NAIVE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

const OFFSET_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
);

/// Point in time attached to query responses.
///
/// Structured values render as ISO-8601 with whole seconds; text is sent
/// verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timestamp {
    /// Date and time with a UTC offset.
    Offset(OffsetDateTime),
    /// Date and time without an offset.
    Naive(PrimitiveDateTime),
    /// Pre-formatted timestamp.
    Formatted(String),
}

impl Timestamp {
    /// Wire representation of the timestamp.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Offset(moment) => moment
                .format(OFFSET_FORMAT)
                .unwrap_or_else(|_| moment.to_string()),
            Self::Naive(moment) => moment
                .format(NAIVE_FORMAT)
                .unwrap_or_else(|_| moment.to_string()),
            Self::Formatted(text) => text.clone(),
        }
    }
}

impl From<OffsetDateTime> for Timestamp {
    fn from(moment: OffsetDateTime) -> Self {
        Self::Offset(moment)
    }
}

impl From<PrimitiveDateTime> for Timestamp {
    fn from(moment: PrimitiveDateTime) -> Self {
        Self::Naive(moment)
    }
}

impl From<String> for Timestamp {
    fn from(text: String) -> Self {
        Self::Formatted(text)
    }
}

impl From<&str> for Timestamp {
    fn from(text: &str) -> Self {
        Self::Formatted(text.to_owned())
    }
}
