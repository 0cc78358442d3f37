//! Error types for the muhurta library.
//!
//! Display-facing entry points never surface these; they degrade to
//! placeholders instead. The variants exist for the internal `try_*` helpers
//! and for callers (such as the CLI) that want the underlying cause.

use std::io;
use thiserror::Error;

/// Result type alias for muhurta operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for muhurta library.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error while reading input.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Embedded or supplied JSON could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No balanced JSON blob was found in the text.
    #[error("No embedded JSON found")]
    NoEmbeddedJson,

    /// A time value could not be interpreted.
    #[error("Invalid time value: {0}")]
    InvalidTime(String),

    /// A slot index falls outside the slots available in one day.
    #[error("Slot {slot} is outside 1..={max}")]
    SlotOutOfRange { slot: i64, max: i64 },

    /// The configured time zone is not a known IANA name.
    #[error("Unknown time zone: {0}")]
    UnknownTimeZone(String),
}
