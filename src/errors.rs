use thiserror::Error;
use uuid::Uuid;

/// Enumerates high-level errors returned by this library.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Represents a failure in the underlying record store.
    #[error("store error: {source}")]
    Sqlx {
        #[from]
        source: sqlx::Error,
    },

    /// Represents a request body that isn't the expected JSON.
    #[error("malformed request body: {source}")]
    MalformedBody { source: serde_json::Error },

    /// Represents a creation request without some required fields.
    #[error("gear validation failed: {} required", describe_fields(.0))]
    MissingFields(Vec<&'static str>),

    /// Represents an attempt to store an empty required field.
    #[error("gear validation failed: {0} must not be empty")]
    BlankField(&'static str),

    /// Represents an ID that can't be parsed. It can't match any record,
    /// so it reads the same as an unknown one.
    #[error("Gear not found")]
    InvalidId(String),

    /// Represents an ID that doesn't match any record.
    #[error("Gear not found")]
    NotFound(Uuid),
}

fn describe_fields(fields: &[&'static str]) -> String {
    match fields {
        [only] => format!("{} is", only),
        _ => format!("{} are", fields.join(", ")),
    }
}
