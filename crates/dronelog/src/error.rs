//! Error types for dronelog.
//!
//! Validation failures are kept in their own type so the form layer can
//! report them before any store round-trip happens. Everything else lands in
//! the crate-wide [`Error`].

use std::fmt;

use chrono::NaiveDateTime;
use thiserror::Error;

/// A form field that must contain something other than whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    /// The pilot's display name.
    Pilot,
    /// The free-text flight location.
    Location,
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pilot => write!(f, "pilot"),
            Self::Location => write!(f, "location"),
        }
    }
}

/// Why a set of raw form values could not become a flight record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// One or more required fields were empty after trimming.
    #[error("missing required field(s): {}", join_fields(.fields))]
    MissingRequiredField {
        /// The empty fields, in form order.
        fields: Vec<RequiredField>,
    },

    /// Landing was not strictly after takeoff.
    #[error(
        "landing time {} must be later than takeoff time {}",
        hh_mm(.landing),
        hh_mm(.takeoff)
    )]
    InvalidTimeRange {
        /// Takeoff instant on the flight date.
        takeoff: NaiveDateTime,
        /// Landing instant on the flight date.
        landing: NaiveDateTime,
    },
}

fn join_fields(fields: &[RequiredField]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn hh_mm(instant: &NaiveDateTime) -> String {
    instant.format("%H:%M").to_string()
}

/// The main error type for dronelog operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Form Errors ===
    /// The submitted form values were rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // === Remote Store Errors ===
    /// The remote table could not be read or written.
    #[error("remote table unavailable: {message}")]
    RemoteUnavailable {
        /// Diagnostic text from the store, passed through verbatim.
        message: String,
    },

    /// The remote table refused the write.
    #[error("remote table rejected the write: {message}")]
    RemoteWriteRejected {
        /// Diagnostic text from the store, passed through verbatim.
        message: String,
    },

    /// A stored row could not be read back as a flight record.
    #[error("row {index} is not a valid flight record: {message}")]
    MalformedRow {
        /// Zero-based position of the row in the table.
        index: usize,
        /// What was wrong with it.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },
}

/// A specialized Result type for dronelog operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a remote-unavailable error.
    #[must_use]
    pub fn remote_unavailable(message: impl Into<String>) -> Self {
        Self::RemoteUnavailable {
            message: message.into(),
        }
    }

    /// Create a remote-write-rejected error.
    #[must_use]
    pub fn remote_write_rejected(message: impl Into<String>) -> Self {
        Self::RemoteWriteRejected {
            message: message.into(),
        }
    }

    /// Create a malformed-row error.
    #[must_use]
    pub fn malformed_row(index: usize, message: impl Into<String>) -> Self {
        Self::MalformedRow {
            index,
            message: message.into(),
        }
    }
}
