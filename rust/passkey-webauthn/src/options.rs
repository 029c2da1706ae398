//! Parsing of server-issued WebAuthn options.
//!
//! Options arrive as generic JSON in the shapes defined by the WebAuthn
//! Level 3 JSON serialization (`PublicKeyCredentialCreationOptionsJSON` and
//! `PublicKeyCredentialRequestOptionsJSON`). Parsing keeps two views of the
//! same options:
//!
//! - a *canonical* JSON value, forwarded verbatim to platforms that accept
//!   WebAuthn JSON directly, and
//! - typed, decoded fields, used by platforms with strongly-typed APIs.
//!
//! Both views are produced after canonicalization, so every platform sees the
//! same effective values.

use crate::codec::{Base64Url, decode_base64url};
use crate::error::InvalidOptionsError;
use serde_json::{Map, Value};

/// The only credential type WebAuthn defines.
pub const PUBLIC_KEY: &str = "public-key";

/// The origin a native request is issued for when the platform allows the
/// caller to choose one: the relying party id served over HTTPS.
#[must_use]
pub fn origin_for(rp_id: &str) -> String {
    format!("https://{rp_id}")
}

/// How strongly the relying party wants the user to be verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UserVerification {
    /// Verification must happen or the ceremony fails.
    Required,
    /// Verify if the authenticator can.
    #[default]
    Preferred,
    /// Avoid verification where possible.
    Discouraged,
}

impl UserVerification {
    /// Parse the wire value. Unknown values fall back to
    /// [`UserVerification::Preferred`], which is what platforms do.
    #[must_use]
    pub fn from_wire(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "required" => Self::Required,
            "discouraged" => Self::Discouraged,
            _ => Self::Preferred,
        }
    }

    /// The wire value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Preferred => "preferred",
            Self::Discouraged => "discouraged",
        }
    }
}

/// Where the authenticator lives relative to the client device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthenticatorAttachment {
    /// Built into the device.
    Platform,
    /// Roaming (security key, phone over hybrid transport).
    CrossPlatform,
}

impl AuthenticatorAttachment {
    /// Parse the wire value; unknown values yield `None`.
    #[must_use]
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "platform" => Some(Self::Platform),
            "cross-platform" => Some(Self::CrossPlatform),
            _ => None,
        }
    }

    /// The wire value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Platform => "platform",
            Self::CrossPlatform => "cross-platform",
        }
    }
}

/// The relying party a credential is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelyingParty {
    /// The relying party id (a registrable domain). Never blank.
    pub id: String,
    /// Human-readable relying party name.
    pub name: Option<String>,
}

/// The account a credential is created for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEntity {
    /// Opaque user handle.
    pub id: Base64Url,
    /// Account name, used as the passkey nickname.
    pub name: String,
    /// Display name. After parsing this equals `name` whenever `name` is set.
    pub display_name: String,
}

/// A reference to an existing credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialDescriptor {
    /// Opaque credential id.
    pub id: Base64Url,
    /// Transport hints, possibly empty.
    pub transports: Vec<String>,
}

/// Authenticator requirements for registration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthenticatorSelection {
    /// Verification preference, if the server stated one.
    pub user_verification: Option<UserVerification>,
    /// Attachment preference, if the server stated one.
    pub authenticator_attachment: Option<AuthenticatorAttachment>,
    /// Resident key preference (`required`, `preferred`, `discouraged`).
    pub resident_key: Option<String>,
}

/// A requested signature algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKeyCredentialParameters {
    /// COSE algorithm identifier (`-7` is ES256).
    pub alg: i64,
}

/// Parsed registration options.
#[derive(Debug, Clone, PartialEq)]
pub struct CreationOptions {
    canonical: Value,
    /// The relying party.
    pub rp: RelyingParty,
    /// The server challenge.
    pub challenge: Base64Url,
    /// The account being registered.
    pub user: UserEntity,
    /// Credentials that must not be registered again.
    pub exclude_credentials: Vec<CredentialDescriptor>,
    /// Authenticator requirements.
    pub authenticator_selection: Option<AuthenticatorSelection>,
    /// Acceptable algorithms, in preference order.
    pub pub_key_cred_params: Vec<PublicKeyCredentialParameters>,
    /// Ceremony timeout in milliseconds.
    pub timeout: Option<u64>,
}

impl CreationOptions {
    /// Validate and canonicalize `PublicKeyCredentialCreationOptionsJSON`.
    ///
    /// When `user.name` is set and differs from `user.displayName`, the
    /// display name is replaced by the name in the canonical JSON before
    /// anything else reads it. The operating system shows the display name in
    /// its account picker, and the name carries the nickname the user chose
    /// for this passkey.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidOptionsError`] when the value is not an object, when
    /// `rp.id`, `challenge` or `user.id` are missing or blank, or when a
    /// binary field is not valid base64url.
    pub fn parse(mut value: Value) -> Result<Self, InvalidOptionsError> {
        let root = value
            .as_object_mut()
            .ok_or(InvalidOptionsError::NotAnObject)?;

        if let Some(Value::Object(user)) = root.get_mut("user") {
            apply_nickname(user);
        }

        let root = value.as_object().ok_or(InvalidOptionsError::NotAnObject)?;

        let rp_object = root.get("rp").and_then(Value::as_object);
        let rp = RelyingParty {
            id: required_string(rp_object, "id", "rp.id")?,
            name: optional_string(rp_object, "name"),
        };

        let challenge = required_binary(Some(root), "challenge", "challenge")?;

        let user_object = match root.get("user") {
            None | Some(Value::Null) => {
                return Err(InvalidOptionsError::Required {
                    field: "user.id".into(),
                });
            }
            Some(Value::Object(user)) => user,
            Some(_) => {
                return Err(InvalidOptionsError::InvalidType {
                    field: "user".into(),
                    expected: "an object",
                });
            }
        };
        let user = UserEntity {
            id: required_binary(Some(user_object), "id", "user.id")?,
            name: optional_string(Some(user_object), "name").unwrap_or_default(),
            display_name: optional_string(Some(user_object), "displayName").unwrap_or_default(),
        };

        let exclude_credentials = descriptors(root, "excludeCredentials")?;
        let authenticator_selection = root
            .get("authenticatorSelection")
            .and_then(Value::as_object)
            .map(|selection| AuthenticatorSelection {
                user_verification: optional_string(Some(selection), "userVerification")
                    .map(|value| UserVerification::from_wire(&value)),
                authenticator_attachment: optional_string(
                    Some(selection),
                    "authenticatorAttachment",
                )
                .and_then(|value| AuthenticatorAttachment::from_wire(&value)),
                resident_key: optional_string(Some(selection), "residentKey"),
            });

        let pub_key_cred_params = root
            .get("pubKeyCredParams")
            .and_then(Value::as_array)
            .map(|params| {
                params
                    .iter()
                    .filter_map(|param| param.get("alg").and_then(Value::as_i64))
                    .map(|alg| PublicKeyCredentialParameters { alg })
                    .collect()
            })
            .unwrap_or_default();

        let timeout = timeout(root);

        Ok(Self {
            canonical: value,
            rp,
            challenge,
            user,
            exclude_credentials,
            authenticator_selection,
            pub_key_cred_params,
            timeout,
        })
    }

    /// The canonicalized options as JSON.
    #[must_use]
    pub fn canonical_json(&self) -> &Value {
        &self.canonical
    }

    /// The name shown for the new passkey in the platform picker: the
    /// nickname when present, otherwise the display name.
    #[must_use]
    pub fn passkey_name(&self) -> &str {
        if self.user.name.is_empty() {
            &self.user.display_name
        } else {
            &self.user.name
        }
    }

    /// The verification preference from `authenticatorSelection`.
    #[must_use]
    pub fn user_verification(&self) -> Option<UserVerification> {
        self.authenticator_selection
            .as_ref()
            .and_then(|selection| selection.user_verification)
    }

    /// The origin derived from the relying party id.
    #[must_use]
    pub fn origin(&self) -> String {
        origin_for(&self.rp.id)
    }
}

impl TryFrom<Value> for CreationOptions {
    type Error = InvalidOptionsError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

/// Parsed authentication options.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    canonical: Value,
    /// The relying party id. Never blank.
    pub rp_id: String,
    /// The server challenge.
    pub challenge: Base64Url,
    /// Credentials the server will accept; empty means any discoverable one.
    pub allow_credentials: Vec<CredentialDescriptor>,
    /// Verification preference.
    pub user_verification: Option<UserVerification>,
    /// Ceremony timeout in milliseconds.
    pub timeout: Option<u64>,
}

impl RequestOptions {
    /// Validate `PublicKeyCredentialRequestOptionsJSON`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidOptionsError`] when the value is not an object, when
    /// `rpId` or `challenge` are missing or blank, or when a binary field is
    /// not valid base64url.
    pub fn parse(value: Value) -> Result<Self, InvalidOptionsError> {
        let root = value.as_object().ok_or(InvalidOptionsError::NotAnObject)?;

        let rp_id = required_string(Some(root), "rpId", "rpId")?;
        let challenge = required_binary(Some(root), "challenge", "challenge")?;
        let allow_credentials = descriptors(root, "allowCredentials")?;
        let user_verification = optional_string(Some(root), "userVerification")
            .map(|value| UserVerification::from_wire(&value));
        let timeout = timeout(root);

        Ok(Self {
            canonical: value,
            rp_id,
            challenge,
            allow_credentials,
            user_verification,
            timeout,
        })
    }

    /// The options as JSON.
    #[must_use]
    pub fn canonical_json(&self) -> &Value {
        &self.canonical
    }

    /// The origin derived from the relying party id.
    #[must_use]
    pub fn origin(&self) -> String {
        origin_for(&self.rp_id)
    }
}

impl TryFrom<Value> for RequestOptions {
    type Error = InvalidOptionsError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

/// Accept options either as a JSON object or as a string holding one.
///
/// # Errors
///
/// Returns [`InvalidOptionsError::NotAnObject`] for any other shape and
/// [`InvalidOptionsError::InvalidJson`] for unparseable strings.
pub fn options_object(raw: Value) -> Result<Value, InvalidOptionsError> {
    let value = match raw {
        Value::String(text) => serde_json::from_str(&text)
            .map_err(|error| InvalidOptionsError::InvalidJson(error.to_string()))?,
        other => other,
    };
    if value.is_object() {
        Ok(value)
    } else {
        Err(InvalidOptionsError::NotAnObject)
    }
}

fn apply_nickname(user: &mut Map<String, Value>) {
    let nickname = match user.get("name").and_then(Value::as_str) {
        Some(name) if !name.is_empty() => name.to_owned(),
        _ => return,
    };
    if user.get("displayName").and_then(Value::as_str) != Some(nickname.as_str()) {
        user.insert("displayName".into(), Value::String(nickname));
    }
}

fn required_string(
    parent: Option<&Map<String, Value>>,
    key: &str,
    field: &str,
) -> Result<String, InvalidOptionsError> {
    match parent.and_then(|object| object.get(key)) {
        None | Some(Value::Null) => Err(InvalidOptionsError::Required {
            field: field.into(),
        }),
        Some(Value::String(value)) if value.trim().is_empty() => {
            Err(InvalidOptionsError::Required {
                field: field.into(),
            })
        }
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(InvalidOptionsError::InvalidType {
            field: field.into(),
            expected: "a string",
        }),
    }
}

fn required_binary(
    parent: Option<&Map<String, Value>>,
    key: &str,
    field: &str,
) -> Result<Base64Url, InvalidOptionsError> {
    let encoded = required_string(parent, key, field)?;
    decode_base64url(&encoded)
        .map(Base64Url::from)
        .map_err(|source| InvalidOptionsError::InvalidEncoding {
            field: field.into(),
            source,
        })
}

fn optional_string(parent: Option<&Map<String, Value>>, key: &str) -> Option<String> {
    parent
        .and_then(|object| object.get(key))
        .and_then(Value::as_str)
        .map(str::to_owned)
}

/// Descriptor lists are optional: a missing or non-array value yields an
/// empty list, and entries that are not objects are skipped. An entry that
/// is an object must carry a decodable `id`.
fn descriptors(
    root: &Map<String, Value>,
    key: &str,
) -> Result<Vec<CredentialDescriptor>, InvalidOptionsError> {
    let Some(entries) = root.get(key).and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| entry.as_object().map(|object| (index, object)))
        .map(|(index, object)| {
            let field = format!("{key}[{index}].id");
            let id = required_binary(Some(object), "id", &field)?;
            let transports = object
                .get("transports")
                .and_then(Value::as_array)
                .map(|transports| {
                    transports
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_owned)
                        .collect()
                })
                .unwrap_or_default();
            Ok(CredentialDescriptor { id, transports })
        })
        .collect()
}

fn timeout(root: &Map<String, Value>) -> Option<u64> {
    let value = root.get("timeout")?;
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|ms| *ms >= 0.0).map(|ms| ms as u64))
}
