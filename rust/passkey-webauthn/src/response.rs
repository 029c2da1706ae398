//! Construction of standard WebAuthn response JSON.
//!
//! Responses are built from one of two sources:
//!
//! - raw native results ([`NativeRegistration`], [`NativeAssertion`]) from
//!   platforms that hand back bytes, which are encoded here, or
//! - response JSON from platforms that already speak WebAuthn JSON, which is
//!   normalized here.
//!
//! Either way the resulting value satisfies the same invariants: `id` and
//! `rawId` carry the same string, binary fields are unpadded base64url, a
//! registration always lists at least one transport, an assertion never
//! carries an empty `userHandle`, and the origin the request was issued for
//! is stamped at the top level for the verifying server.

use crate::codec::encode_base64url;
use crate::error::ResponseError;
use crate::options::{AuthenticatorAttachment, PUBLIC_KEY};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// The transport reported for credentials created by the on-device platform
/// authenticator when the platform does not report one itself.
pub const DEFAULT_TRANSPORT: &str = "internal";

/// A freshly created credential as reported by a byte-oriented platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeRegistration {
    /// The new credential id.
    pub credential_id: Vec<u8>,
    /// The serialized client data the authenticator signed over.
    pub client_data_json: Vec<u8>,
    /// The CBOR attestation object.
    pub attestation_object: Vec<u8>,
    /// Transports reported by the platform; empty when it reports none.
    pub transports: Vec<String>,
    /// Which kind of authenticator produced the credential.
    pub attachment: AuthenticatorAttachment,
}

/// An assertion as reported by a byte-oriented platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeAssertion {
    /// The id of the credential that signed.
    pub credential_id: Vec<u8>,
    /// The serialized client data the authenticator signed over.
    pub client_data_json: Vec<u8>,
    /// The authenticator data.
    pub authenticator_data: Vec<u8>,
    /// The assertion signature.
    pub signature: Vec<u8>,
    /// The user handle stored with the credential, if any.
    pub user_id: Option<Vec<u8>>,
    /// Which kind of authenticator produced the assertion.
    pub attachment: AuthenticatorAttachment,
}

/// The `response` member of a registration result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttestationResponse {
    /// base64url client data.
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    /// base64url attestation object.
    #[serde(rename = "attestationObject")]
    pub attestation_object: String,
    /// Transport hints; never empty once built.
    #[serde(default, deserialize_with = "null_as_default")]
    pub transports: Vec<String>,
    /// Members the platform reported beyond the ones above
    /// (`publicKey`, `authenticatorData`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `response` member of an authentication result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertionResponse {
    /// base64url client data.
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    /// base64url authenticator data.
    #[serde(rename = "authenticatorData")]
    pub authenticator_data: String,
    /// base64url signature.
    pub signature: String,
    /// base64url user handle; absent rather than empty.
    #[serde(
        rename = "userHandle",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub user_handle: Option<String>,
    /// Members the platform reported beyond the ones above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Standard `RegistrationResponseJSON`, plus the top-level `origin`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    raw_id: String,
    #[serde(rename = "type")]
    credential_type: String,
    response: AttestationResponse,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    authenticator_attachment: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    client_extension_results: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    origin: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl RegistrationResponse {
    /// Build a response from raw native bytes.
    #[must_use]
    pub fn from_native(registration: NativeRegistration, origin: &str) -> Self {
        let id = encode_base64url(&registration.credential_id);
        Self {
            raw_id: id.clone(),
            id,
            credential_type: PUBLIC_KEY.into(),
            response: AttestationResponse {
                client_data_json: encode_base64url(&registration.client_data_json),
                attestation_object: encode_base64url(&registration.attestation_object),
                transports: with_default_transport(registration.transports),
                extra: Map::new(),
            },
            authenticator_attachment: Some(registration.attachment.as_str().into()),
            client_extension_results: Map::new(),
            origin: Some(origin.into()),
            extra: Map::new(),
        }
    }

    /// Normalize registration JSON produced by a platform.
    ///
    /// # Errors
    ///
    /// Returns [`ResponseError`] if the JSON does not have the registration
    /// shape, or if it reports different `id` and `rawId` values.
    pub fn from_platform_json(json: &str, origin: &str) -> Result<Self, ResponseError> {
        let mut response: Self = serde_json::from_str(json)
            .map_err(|error| ResponseError::Malformed(error.to_string()))?;

        response.raw_id = unify_ids(&response.id, &response.raw_id)?;
        response.response.transports =
            with_default_transport(std::mem::take(&mut response.response.transports));
        response.origin = Some(origin.into());
        Ok(response)
    }

    /// The credential id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The credential id, as `rawId`. Always equal to [`Self::id`].
    #[must_use]
    pub fn raw_id(&self) -> &str {
        &self.raw_id
    }

    /// The attestation member.
    #[must_use]
    pub fn response(&self) -> &AttestationResponse {
        &self.response
    }

    /// The authenticator attachment tag.
    #[must_use]
    pub fn authenticator_attachment(&self) -> Option<&str> {
        self.authenticator_attachment.as_deref()
    }

    /// The origin stamped on the response.
    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Convert into plain JSON values.
    ///
    /// # Errors
    ///
    /// Returns [`ResponseError::Serialization`] if a member cannot be
    /// represented as JSON.
    pub fn to_json(&self) -> Result<Value, ResponseError> {
        serde_json::to_value(self).map_err(|error| ResponseError::Serialization(error.to_string()))
    }
}

/// Standard `AuthenticationResponseJSON`, plus the top-level `origin`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationResponse {
    id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    raw_id: String,
    #[serde(rename = "type")]
    credential_type: String,
    response: AssertionResponse,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    authenticator_attachment: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    client_extension_results: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    origin: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl AuthenticationResponse {
    /// Build a response from raw native bytes.
    #[must_use]
    pub fn from_native(assertion: NativeAssertion, origin: &str) -> Self {
        let id = encode_base64url(&assertion.credential_id);
        let user_handle = assertion
            .user_id
            .filter(|user_id| !user_id.is_empty())
            .map(|user_id| encode_base64url(&user_id));
        Self {
            raw_id: id.clone(),
            id,
            credential_type: PUBLIC_KEY.into(),
            response: AssertionResponse {
                client_data_json: encode_base64url(&assertion.client_data_json),
                authenticator_data: encode_base64url(&assertion.authenticator_data),
                signature: encode_base64url(&assertion.signature),
                user_handle,
                extra: Map::new(),
            },
            authenticator_attachment: Some(assertion.attachment.as_str().into()),
            client_extension_results: Map::new(),
            origin: Some(origin.into()),
            extra: Map::new(),
        }
    }

    /// Normalize authentication JSON produced by a platform.
    ///
    /// # Errors
    ///
    /// Returns [`ResponseError`] if the JSON does not have the assertion
    /// shape, or if it reports different `id` and `rawId` values.
    pub fn from_platform_json(json: &str, origin: &str) -> Result<Self, ResponseError> {
        let mut response: Self = serde_json::from_str(json)
            .map_err(|error| ResponseError::Malformed(error.to_string()))?;

        response.raw_id = unify_ids(&response.id, &response.raw_id)?;
        if response
            .response
            .user_handle
            .as_deref()
            .is_some_and(str::is_empty)
        {
            response.response.user_handle = None;
        }
        response.origin = Some(origin.into());
        Ok(response)
    }

    /// The credential id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The credential id, as `rawId`. Always equal to [`Self::id`].
    #[must_use]
    pub fn raw_id(&self) -> &str {
        &self.raw_id
    }

    /// The assertion member.
    #[must_use]
    pub fn response(&self) -> &AssertionResponse {
        &self.response
    }

    /// The authenticator attachment tag.
    #[must_use]
    pub fn authenticator_attachment(&self) -> Option<&str> {
        self.authenticator_attachment.as_deref()
    }

    /// The origin stamped on the response.
    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Convert into plain JSON values.
    ///
    /// # Errors
    ///
    /// Returns [`ResponseError::Serialization`] if a member cannot be
    /// represented as JSON.
    pub fn to_json(&self) -> Result<Value, ResponseError> {
        serde_json::to_value(self).map_err(|error| ResponseError::Serialization(error.to_string()))
    }
}

/// Platforms report absent members as `null`; treat those like missing ones.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn with_default_transport(transports: Vec<String>) -> Vec<String> {
    if transports.is_empty() {
        vec![DEFAULT_TRANSPORT.into()]
    } else {
        transports
    }
}

/// `rawId` may be omitted by a platform, in which case it mirrors `id`.
fn unify_ids(id: &str, raw_id: &str) -> Result<String, ResponseError> {
    if raw_id.is_empty() || raw_id == id {
        Ok(id.to_owned())
    } else {
        Err(ResponseError::MismatchedId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use testresult::TestResult;

    fn native_registration(transports: Vec<String>) -> NativeRegistration {
        NativeRegistration {
            credential_id: vec![0xfb, 0xff, 0x01],
            client_data_json: br#"{"type":"webauthn.create"}"#.to_vec(),
            attestation_object: vec![0xa3, 0x63],
            transports,
            attachment: AuthenticatorAttachment::Platform,
        }
    }

    fn native_assertion(user_id: Option<Vec<u8>>) -> NativeAssertion {
        NativeAssertion {
            credential_id: b"cred-1".to_vec(),
            client_data_json: br#"{"type":"webauthn.get"}"#.to_vec(),
            authenticator_data: vec![0u8; 37],
            signature: vec![0x30, 0x45],
            user_id,
            attachment: AuthenticatorAttachment::Platform,
        }
    }

    #[test]
    fn it_builds_registration_json_from_native_bytes() -> TestResult {
        let response = RegistrationResponse::from_native(
            native_registration(Vec::new()),
            "https://example.com",
        );
        let json = response.to_json()?;

        assert_eq!(
            json,
            json!({
                "id": "-_8B",
                "rawId": "-_8B",
                "type": "public-key",
                "response": {
                    "clientDataJSON": encode_base64url(br#"{"type":"webauthn.create"}"#),
                    "attestationObject": "o2M",
                    "transports": ["internal"]
                },
                "authenticatorAttachment": "platform",
                "clientExtensionResults": {},
                "origin": "https://example.com"
            })
        );
        Ok(())
    }

    #[test]
    fn it_keeps_reported_transports() {
        let response = RegistrationResponse::from_native(
            native_registration(vec!["hybrid".into(), "internal".into()]),
            "https://example.com",
        );
        assert_eq!(response.response().transports, vec!["hybrid", "internal"]);
    }

    #[test]
    fn it_injects_the_default_transport_into_platform_json() -> TestResult {
        let platform_json = json!({
            "id": "Y3JlZC0x",
            "rawId": "Y3JlZC0x",
            "type": "public-key",
            "response": {
                "clientDataJSON": "e30",
                "attestationObject": "o2M",
                "publicKey": "MFkw",
                "publicKeyAlgorithm": -7
            },
            "authenticatorAttachment": "platform",
            "clientExtensionResults": { "credProps": { "rk": true } }
        })
        .to_string();

        let response =
            RegistrationResponse::from_platform_json(&platform_json, "https://example.com")?;
        let json = response.to_json()?;

        assert_eq!(json["response"]["transports"], json!(["internal"]));
        assert_eq!(json["response"]["publicKey"], json!("MFkw"));
        assert_eq!(json["response"]["publicKeyAlgorithm"], json!(-7));
        assert_eq!(json["clientExtensionResults"]["credProps"]["rk"], json!(true));
        assert_eq!(json["origin"], json!("https://example.com"));
        assert_eq!(json["id"], json["rawId"]);
        Ok(())
    }

    #[test]
    fn it_treats_null_platform_members_as_unreported() -> TestResult {
        let platform_json = json!({
            "id": "Y3JlZC0x",
            "rawId": null,
            "type": "public-key",
            "response": {
                "clientDataJSON": "e30",
                "attestationObject": "o2M",
                "transports": null
            },
            "authenticatorAttachment": null,
            "clientExtensionResults": null
        })
        .to_string();

        let response =
            RegistrationResponse::from_platform_json(&platform_json, "https://example.com")?;
        let json = response.to_json()?;

        assert_eq!(json["response"]["transports"], json!(["internal"]));
        assert_eq!(json["clientExtensionResults"], json!({}));
        assert_eq!(json["rawId"], json!("Y3JlZC0x"));

        let assertion_json = json!({
            "id": "Y3JlZC0x",
            "rawId": "Y3JlZC0x",
            "type": "public-key",
            "response": {
                "clientDataJSON": "e30",
                "authenticatorData": "AAAA",
                "signature": "MEU",
                "userHandle": null
            },
            "clientExtensionResults": null
        })
        .to_string();

        let assertion =
            AuthenticationResponse::from_platform_json(&assertion_json, "https://example.com")?;
        assert_eq!(assertion.response().user_handle, None);
        assert_eq!(assertion.to_json()?["clientExtensionResults"], json!({}));
        Ok(())
    }

    #[test]
    fn it_mirrors_a_missing_raw_id() -> TestResult {
        let platform_json = json!({
            "id": "Y3JlZC0x",
            "type": "public-key",
            "response": { "clientDataJSON": "e30", "attestationObject": "o2M", "transports": ["hybrid"] }
        })
        .to_string();

        let response =
            RegistrationResponse::from_platform_json(&platform_json, "https://example.com")?;

        assert_eq!(response.raw_id(), "Y3JlZC0x");
        assert_eq!(response.id(), response.raw_id());
        assert_eq!(response.response().transports, vec!["hybrid"]);
        Ok(())
    }

    #[test]
    fn it_rejects_platform_json_with_diverging_ids() {
        let platform_json = json!({
            "id": "YQ",
            "rawId": "Yg",
            "type": "public-key",
            "response": { "clientDataJSON": "e30", "attestationObject": "o2M" }
        })
        .to_string();

        assert_eq!(
            RegistrationResponse::from_platform_json(&platform_json, "https://example.com"),
            Err(ResponseError::MismatchedId)
        );
    }

    #[test]
    fn it_rejects_platform_json_of_the_wrong_shape() {
        let result = RegistrationResponse::from_platform_json("{\"id\": 1}", "https://a.b");
        assert!(matches!(result, Err(ResponseError::Malformed(_))));
    }

    #[test]
    fn it_omits_an_empty_user_handle() -> TestResult {
        let response =
            AuthenticationResponse::from_native(native_assertion(Some(Vec::new())), "https://a.b");
        let json = response.to_json()?;
        assert!(json["response"].get("userHandle").is_none());

        let response = AuthenticationResponse::from_native(native_assertion(None), "https://a.b");
        let json = response.to_json()?;
        assert!(json["response"].get("userHandle").is_none());
        Ok(())
    }

    #[test]
    fn it_encodes_a_present_user_handle() -> TestResult {
        let response = AuthenticationResponse::from_native(
            native_assertion(Some(b"user-1".to_vec())),
            "https://example.com",
        );
        let json = response.to_json()?;

        assert_eq!(json["response"]["userHandle"], json!("dXNlci0x"));
        assert_eq!(json["id"], json!("Y3JlZC0x"));
        assert_eq!(json["id"], json["rawId"]);
        assert_eq!(json["type"], json!("public-key"));
        assert_eq!(json["origin"], json!("https://example.com"));
        assert_eq!(json["clientExtensionResults"], json!({}));
        Ok(())
    }

    #[test]
    fn it_drops_empty_user_handles_from_platform_json() -> TestResult {
        let platform_json = json!({
            "id": "Y3JlZC0x",
            "rawId": "Y3JlZC0x",
            "type": "public-key",
            "response": {
                "clientDataJSON": "e30",
                "authenticatorData": "AAAA",
                "signature": "MEU",
                "userHandle": ""
            }
        })
        .to_string();

        let response =
            AuthenticationResponse::from_platform_json(&platform_json, "https://example.com")?;
        let json = response.to_json()?;

        assert!(json["response"].get("userHandle").is_none());
        assert_eq!(json["origin"], json!("https://example.com"));
        Ok(())
    }
}
