//! Base64url conversion for WebAuthn binary fields.
//!
//! Every binary value (challenges, user handles, credential ids, client data,
//! attestation objects, signatures) crosses the JSON boundary as unpadded
//! base64url. Decoding is lenient about padding and alphabet so that values
//! produced by servers that pad, or that use the standard alphabet, are still
//! accepted. Encoding always produces the canonical unpadded url-safe form.

use crate::error::DecodeError;
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

/// Decode a base64url string into raw bytes.
///
/// The url-safe alphabet is mapped back onto the standard one (`-` to `+`,
/// `_` to `/`), the input is right-padded with `=` to a multiple of four
/// characters, and the result is decoded with the standard engine.
///
/// # Errors
///
/// Returns [`DecodeError`] if the padded input is still not valid base64.
pub fn decode_base64url(input: &str) -> Result<Vec<u8>, DecodeError> {
    let mut standard: String = input
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    let padded_len = standard.len().div_ceil(4) * 4;
    while standard.len() < padded_len {
        standard.push('=');
    }

    STANDARD
        .decode(standard.as_bytes())
        .map_err(|error| DecodeError::new(error.to_string()))
}

/// Encode raw bytes as unpadded base64url.
#[must_use]
pub fn encode_base64url(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// An owned byte buffer that travels through JSON as a base64url string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Base64Url(Vec<u8>);

impl Base64Url {
    /// Wrap raw bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// The raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the wrapper and return the raw bytes.
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }

    /// The canonical base64url encoding of the bytes.
    #[must_use]
    pub fn encode(&self) -> String {
        encode_base64url(&self.0)
    }
}

impl Deref for Base64Url {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Base64Url {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Base64Url {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Base64Url {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<Base64Url> for Vec<u8> {
    fn from(value: Base64Url) -> Self {
        value.0
    }
}

impl FromStr for Base64Url {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_base64url(s).map(Self)
    }
}

impl fmt::Display for Base64Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl Serialize for Base64Url {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Base64Url {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        encoded.parse().map_err(serde::de::Error::custom)
    }
}
