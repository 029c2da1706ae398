//! Passkey sign-in and registration against the auth server.
//!
//! Both actions run the same three steps: fetch options from the server,
//! hand them to the native module, and post the result back for
//! verification. Server and transport failures are returned to the caller
//! exactly as the fetch layer reported them. Anything that goes wrong in the
//! native step, whether the user dismissed the sheet or the platform refused
//! the request, is reported as [`AUTH_CANCELLED`].

use crate::fetch::{Fetch, FetchError, FetchOptions, FetchRequest, FetchResponse};
use crate::store::{SESSION_SIGNAL, Signal, Store};
use passkey_webauthn::{AuthenticatePasskeyRequest, PasskeyModule, RegisterPasskeyRequest};
use serde_json::{Map, Value, json};

/// Code reported for every failure of the native step.
pub const AUTH_CANCELLED: &str = "AUTH_CANCELLED";

/// Message used when a native failure carries no message of its own.
const AUTH_CANCELLED_MESSAGE: &str = "auth cancelled";

/// Endpoint issuing `PublicKeyCredentialRequestOptionsJSON`.
pub const GENERATE_AUTHENTICATE_OPTIONS: &str = "/passkey/generate-authenticate-options";
/// Endpoint verifying an assertion and opening a session.
pub const VERIFY_AUTHENTICATION: &str = "/passkey/verify-authentication";
/// Endpoint issuing `PublicKeyCredentialCreationOptionsJSON`.
pub const GENERATE_REGISTER_OPTIONS: &str = "/passkey/generate-register-options";
/// Endpoint verifying an attestation and storing the passkey.
pub const VERIFY_REGISTRATION: &str = "/passkey/verify-registration";

/// Options for [`PasskeyActions::sign_in_passkey`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignInOptions {
    /// Only offer credentials that are immediately available.
    pub auto_fill: Option<bool>,
    /// Narrow the allowed credentials to this account.
    pub email: Option<String>,
    /// Applied to the verification request.
    pub fetch_options: Option<FetchOptions>,
}

/// Options for [`PasskeyActions::add_passkey`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddPasskeyOptions {
    /// A label for the new passkey.
    pub name: Option<String>,
    /// `platform` or `cross-platform`.
    pub authenticator_attachment: Option<String>,
    /// Ask the platform to register without further prompting.
    pub use_auto_register: Option<bool>,
    /// Applied to the verification request.
    pub fetch_options: Option<FetchOptions>,
}

/// The response every failed native step turns into.
pub fn auth_cancelled(message: Option<String>) -> FetchResponse {
    FetchResponse::failure(FetchError {
        code: Some(AUTH_CANCELLED.into()),
        message: Some(message.unwrap_or_else(|| AUTH_CANCELLED_MESSAGE.into())),
        status: Some(400),
        status_text: Some("BAD_REQUEST".into()),
    })
}

/// Passkey actions bound to a fetcher, a store and a native module.
#[derive(Debug, Clone)]
pub struct PasskeyActions<F, S, M> {
    fetch: F,
    store: S,
    module: M,
    list_passkeys: Signal,
}

impl<F, S, M> PasskeyActions<F, S, M>
where
    F: Fetch,
    S: Store,
    M: PasskeyModule,
{
    /// Bind actions to their collaborators.
    ///
    /// `list_passkeys` is bumped whenever a passkey is added.
    pub fn new(fetch: F, store: S, module: M, list_passkeys: Signal) -> Self {
        Self {
            fetch,
            store,
            module,
            list_passkeys,
        }
    }

    /// The signal bumped after a passkey is added.
    pub fn list_passkeys(&self) -> &Signal {
        &self.list_passkeys
    }

    /// `signIn.passkey`: sign in with an existing passkey.
    ///
    /// Returns the verification response (`{session, user}` on success) and
    /// notifies [`SESSION_SIGNAL`] once the server has accepted the
    /// assertion.
    pub async fn sign_in_passkey(&self, options: SignInOptions) -> FetchResponse {
        let mut body = Map::new();
        if let Some(email) = options.email {
            body.insert("email".into(), Value::String(email));
        }

        let challenge = self
            .fetch
            .fetch(
                GENERATE_AUTHENTICATE_OPTIONS,
                FetchRequest::post(Value::Object(body)),
            )
            .await;
        let Some(options_json) = challenge.data else {
            tracing::debug!("no authentication options; returning server response");
            return challenge;
        };

        let assertion = match self
            .module
            .authenticate_passkey(
                AuthenticatePasskeyRequest::new(options_json).with_autofill(options.auto_fill),
            )
            .await
        {
            Ok(assertion) => assertion,
            Err(error) => {
                tracing::error!(code = %error.code, "Passkey sign-in error: {error}");
                return auth_cancelled(Some(error.message));
            }
        };

        let verified = self
            .fetch
            .fetch(
                VERIFY_AUTHENTICATION,
                FetchRequest::post(json!({ "response": assertion }))
                    .with_options(options.fetch_options.unwrap_or_default()),
            )
            .await;
        if verified.data.is_some() {
            self.store.notify(SESSION_SIGNAL);
        }
        verified
    }

    /// `passkey.addPasskey`: register a new passkey for the signed-in user.
    ///
    /// Returns `Ok(())` once the server has stored the passkey, after
    /// bumping the passkey list signal. Any other outcome is returned as the
    /// response that ended the flow.
    pub async fn add_passkey(&self, options: AddPasskeyOptions) -> Result<(), FetchResponse> {
        let mut request = FetchRequest::get();
        if let Some(attachment) = options
            .authenticator_attachment
            .as_deref()
            .filter(|attachment| !attachment.is_empty())
        {
            request = request.with_query("authenticatorAttachment", attachment);
        }
        if let Some(name) = options.name.as_deref().filter(|name| !name.is_empty()) {
            request = request.with_query("name", name);
        }

        let challenge = self.fetch.fetch(GENERATE_REGISTER_OPTIONS, request).await;
        let Some(options_json) = challenge.data else {
            tracing::debug!("no registration options; returning server response");
            return Err(challenge);
        };

        let attestation = match self
            .module
            .register_passkey(
                RegisterPasskeyRequest::new(options_json)
                    .with_auto_register(options.use_auto_register),
            )
            .await
        {
            Ok(attestation) => attestation,
            Err(error) => {
                tracing::error!(code = %error.code, "Passkey registration error: {error}");
                return Err(auth_cancelled(Some(error.message)));
            }
        };

        let mut body = Map::new();
        body.insert("response".into(), attestation);
        if let Some(name) = options.name {
            body.insert("name".into(), Value::String(name));
        }

        let verified = self
            .fetch
            .fetch(
                VERIFY_REGISTRATION,
                FetchRequest::post(Value::Object(body))
                    .with_options(options.fetch_options.unwrap_or_default()),
            )
            .await;
        if verified.data.is_none() {
            return Err(verified);
        }

        self.list_passkeys.bump();
        Ok(())
    }
}
