use thiserror::Error;

/// Faults raised while turning calendar markup into events or events into a calendar.
#[derive(Error, Debug)]
pub enum Error {
    /// A fragment lacks an element the extractor relies on, which means the
    /// upstream page structure changed.
    #[error("Unexpected HTML: {fragment} has no `{element}` element")]
    MissingElement {
        fragment: &'static str,
        element: &'static str,
    },

    #[error("Unexpected HTML: `{element}` has no `{attribute}` attribute")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("Malformed date `{value}`: {reason}")]
    MalformedDate { value: String, reason: String },

    #[error("No events to emit")]
    NoEvents,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
