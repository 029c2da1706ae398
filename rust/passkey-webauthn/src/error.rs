//! Error types for the WebAuthn adaptation layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A base64url value could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid base64url: {reason}")]
pub struct DecodeError {
    reason: String,
}

impl DecodeError {
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Server-issued options are missing a required field or have the wrong shape.
///
/// Every variant names the offending field using the key path of the
/// standard JSON shape (`rp.id`, `user.id`, `excludeCredentials[2].id`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidOptionsError {
    /// The options value is neither a JSON object nor a string holding one.
    #[error("optionsJSON must be an object")]
    NotAnObject,

    /// The options string is not valid JSON.
    #[error("optionsJSON is not valid JSON: {0}")]
    InvalidJson(String),

    /// A required field is absent, null or blank.
    #[error("{field} is required")]
    Required {
        /// Key path of the field.
        field: String,
    },

    /// A field is present but has the wrong JSON type.
    #[error("{field} must be {expected}")]
    InvalidType {
        /// Key path of the field.
        field: String,
        /// Human-readable description of the expected type.
        expected: &'static str,
    },

    /// A binary field is not valid base64url.
    #[error("{field} is not valid base64url")]
    InvalidEncoding {
        /// Key path of the field.
        field: String,
        /// The underlying decode failure.
        #[source]
        source: DecodeError,
    },
}

/// A native platform response could not be turned into standard JSON.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResponseError {
    /// The platform produced JSON that does not match the response shape.
    #[error("malformed platform response: {0}")]
    Malformed(String),

    /// The platform reported different values for `id` and `rawId`.
    #[error("credential id and rawId differ")]
    MismatchedId,

    /// The response could not be converted into plain JSON values.
    #[error("failed to serialize response: {0}")]
    Serialization(String),
}

/// Failures of a single native credential invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvokeError {
    /// No foreground window or activity is available to host the credential
    /// sheet. Raised before the platform is called.
    #[error("No current Activity available")]
    NoUiContext,

    /// The options could not be turned into a native request.
    #[error(transparent)]
    InvalidOptions(#[from] InvalidOptionsError),

    /// A binary option field failed to decode.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The user dismissed the native credential sheet.
    #[error("User cancelled")]
    Cancelled,

    /// The platform rejected the request.
    #[error("{0}")]
    Platform(String),

    /// The platform completed with a credential of an unexpected kind.
    #[error("Unexpected credential type: {0}")]
    UnexpectedResult(String),

    /// Any other failure, such as the platform releasing a request without
    /// ever completing it.
    #[error("{0}")]
    Unknown(String),
}

impl From<ResponseError> for InvokeError {
    fn from(error: ResponseError) -> Self {
        Self::UnexpectedResult(error.to_string())
    }
}

/// Stable codes reported across the native module boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModuleErrorCode {
    /// The user cancelled the native sheet.
    Cancelled,
    /// Registration failed in the platform.
    CreateError,
    /// Authentication failed in the platform.
    GetError,
    /// Anything the platform did not classify.
    UnknownError,
    /// The options payload failed validation.
    InvalidOptions,
    /// No foreground UI context.
    NoActivity,
    /// The platform returned a credential of an unexpected type.
    UnexpectedType,
}

impl ModuleErrorCode {
    /// The wire representation of the code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cancelled => "CANCELLED",
            Self::CreateError => "CREATE_ERROR",
            Self::GetError => "GET_ERROR",
            Self::UnknownError => "UNKNOWN_ERROR",
            Self::InvalidOptions => "INVALID_OPTIONS",
            Self::NoActivity => "NO_ACTIVITY",
            Self::UnexpectedType => "UNEXPECTED_TYPE",
        }
    }
}

impl fmt::Display for ModuleErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejection from the native module boundary.
///
/// The `Display` output is the bare message so that callers surfacing "the
/// cause message" show what the platform said, not the code.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ModuleError {
    /// Classification of the failure.
    pub code: ModuleErrorCode,
    /// Human-readable cause.
    pub message: String,
}

impl ModuleError {
    /// Create an error with the given code and message.
    pub fn new(code: ModuleErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<InvalidOptionsError> for ModuleError {
    fn from(error: InvalidOptionsError) -> Self {
        Self::new(ModuleErrorCode::InvalidOptions, error.to_string())
    }
}
