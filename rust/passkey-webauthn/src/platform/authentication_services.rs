//! Authentication Services variant (Apple model).
//!
//! The platform takes typed requests built from raw bytes and reports the
//! outcome to a delegate. Each invocation hands the controller its own
//! [`AuthorizationCompletion`], a one-shot handle that is consumed by the
//! first delegate callback. Nothing is retained once the callback fires.

use crate::error::InvokeError;
use crate::invoker::CredentialInvoker;
use crate::options::{AuthenticatorAttachment, CreationOptions, RequestOptions, UserVerification};
use crate::response::{
    AuthenticationResponse, NativeAssertion, NativeRegistration, RegistrationResponse,
};
use passkey_common::{ConditionalSend, ConditionalSync, InlineDispatcher, UiDispatcher};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;

/// A platform public key credential registration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformRegistrationRequest {
    /// The relying party identifier.
    pub relying_party_identifier: String,
    /// The decoded challenge.
    pub challenge: Vec<u8>,
    /// The account name shown in the passkey sheet.
    pub name: String,
    /// The decoded user handle.
    pub user_id: Vec<u8>,
    /// Credentials the authenticator must not already hold.
    pub excluded_credentials: Vec<Vec<u8>>,
    /// Requested user verification, when the options carry one.
    pub user_verification_preference: Option<UserVerification>,
}

/// A platform public key credential assertion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformAssertionRequest {
    /// The relying party identifier.
    pub relying_party_identifier: String,
    /// The decoded challenge.
    pub challenge: Vec<u8>,
    /// Credentials the user may pick from. Empty means any.
    pub allowed_credentials: Vec<Vec<u8>>,
    /// Requested user verification, when the options carry one.
    pub user_verification_preference: Option<UserVerification>,
}

/// A request handed to the authorization controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationRequest {
    /// Create a passkey.
    Registration(PlatformRegistrationRequest),
    /// Sign in with a passkey.
    Assertion(PlatformAssertionRequest),
}

/// Flags for `performRequests(options:)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PerformOptions {
    /// Only offer credentials that are immediately available.
    pub prefer_immediately_available_credentials: bool,
}

/// A newly registered platform credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRegistration {
    /// Raw credential ID, encoded as base64url for `id` and `rawId`.
    pub credential_id: Vec<u8>,
    /// The exact `clientDataJSON` bytes the authenticator signed over.
    pub raw_client_data_json: Vec<u8>,
    /// CBOR attestation object. Reported as empty when a provider omits it.
    pub raw_attestation_object: Option<Vec<u8>>,
}

/// An assertion produced by a platform credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialAssertion {
    /// Raw ID of the credential that signed.
    pub credential_id: Vec<u8>,
    /// The exact `clientDataJSON` bytes covered by the signature.
    pub raw_client_data_json: Vec<u8>,
    /// Authenticator data covered by the signature.
    pub raw_authenticator_data: Vec<u8>,
    /// Signature over the authenticator data and the client data hash.
    pub signature: Vec<u8>,
    /// User handle stored with the credential, reported as `userHandle`.
    pub user_id: Option<Vec<u8>>,
}

/// What the controller reports on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    /// A passkey registration.
    Registration(CredentialRegistration),
    /// A passkey assertion.
    Assertion(CredentialAssertion),
    /// Any other credential kind, named by its platform type.
    Other(String),
}

/// `ASAuthorizationError.Code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthorizationErrorCode {
    /// The user dismissed the sheet.
    Canceled,
    /// The request failed.
    Failed,
    /// The platform received an invalid response.
    InvalidResponse,
    /// No provider handled the request.
    NotHandled,
    /// The request needed UI but could not present it.
    NotInteractive,
    /// Anything else.
    Unknown,
}

/// A failure reported through the delegate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct AuthorizationError {
    /// The platform error code.
    pub code: AuthorizationErrorCode,
    /// The localized description.
    pub message: String,
}

impl AuthorizationError {
    /// Create an error from a code and a localized description.
    pub fn new(code: AuthorizationErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<AuthorizationError> for InvokeError {
    fn from(error: AuthorizationError) -> Self {
        match error.code {
            AuthorizationErrorCode::Canceled => Self::Cancelled,
            _ => Self::Platform(error.message),
        }
    }
}

type Outcome = Result<Authorization, AuthorizationError>;

/// The delegate half of one authorization request.
///
/// Consumed by the first callback. Dropping it without calling either
/// callback fails the pending invocation.
#[derive(Debug)]
pub struct AuthorizationCompletion {
    sender: oneshot::Sender<Outcome>,
}

impl AuthorizationCompletion {
    fn channel() -> (Self, oneshot::Receiver<Outcome>) {
        let (sender, receiver) = oneshot::channel();
        (Self { sender }, receiver)
    }

    /// `authorizationController(_:didCompleteWithAuthorization:)`.
    pub fn did_complete_with_authorization(self, authorization: Authorization) {
        self.complete(Ok(authorization))
    }

    /// `authorizationController(_:didCompleteWithError:)`.
    pub fn did_complete_with_error(self, error: AuthorizationError) {
        self.complete(Err(error))
    }

    fn complete(self, outcome: Outcome) {
        if self.sender.send(outcome).is_err() {
            tracing::warn!("authorization completed after its caller went away");
        }
    }
}

/// The platform authorization controller.
pub trait AuthorizationController: ConditionalSync + 'static {
    /// The window the sheet is presented over.
    type Anchor: ConditionalSend + 'static;

    /// The key window of the foreground scene, if there is one.
    fn presentation_anchor(&self) -> Option<Self::Anchor>;

    /// Whether registration requests accept excluded credentials
    /// (iOS 17.4 and later).
    fn supports_excluded_credentials(&self) -> bool;

    /// Whether `performRequests(options:)` is available (iOS 16, macOS 13
    /// and later).
    fn supports_request_options(&self) -> bool;

    /// Present `request`. Always called on the UI thread.
    ///
    /// `options` is `None` when [`Self::supports_request_options`] is false.
    fn perform_requests(
        &self,
        request: AuthorizationRequest,
        anchor: Self::Anchor,
        options: Option<PerformOptions>,
        completion: AuthorizationCompletion,
    );
}

/// [`CredentialInvoker`] over an [`AuthorizationController`].
///
/// The call that presents the sheet is routed through a [`UiDispatcher`].
/// The default [`InlineDispatcher`] is only correct when polled from the UI
/// thread.
#[derive(Debug)]
pub struct AuthenticationServicesInvoker<C, D = InlineDispatcher> {
    controller: Arc<C>,
    dispatcher: D,
}

impl<C> AuthenticationServicesInvoker<C>
where
    C: AuthorizationController,
{
    /// Wrap a controller, presenting inline.
    pub fn new(controller: C) -> Self {
        Self::with_dispatcher(controller, InlineDispatcher)
    }
}

impl<C, D> AuthenticationServicesInvoker<C, D>
where
    C: AuthorizationController,
    D: UiDispatcher,
{
    /// Wrap a controller, presenting through `dispatcher`.
    pub fn with_dispatcher(controller: C, dispatcher: D) -> Self {
        Self {
            controller: Arc::new(controller),
            dispatcher,
        }
    }

    /// The wrapped controller.
    pub fn controller(&self) -> &C {
        &self.controller
    }

    async fn perform(
        &self,
        request: AuthorizationRequest,
        prefer_immediate: bool,
    ) -> Result<Authorization, InvokeError> {
        let anchor = self
            .controller
            .presentation_anchor()
            .ok_or(InvokeError::NoUiContext)?;
        let options = self
            .controller
            .supports_request_options()
            .then_some(PerformOptions {
                prefer_immediately_available_credentials: prefer_immediate,
            });

        let (completion, outcome) = AuthorizationCompletion::channel();
        let controller = self.controller.clone();
        self.dispatcher.dispatch(Box::new(move || {
            controller.perform_requests(request, anchor, options, completion)
        }));

        match outcome.await {
            Ok(outcome) => Ok(outcome?),
            Err(_) => Err(InvokeError::Unknown(
                "authorization finished without a result".into(),
            )),
        }
    }
}

impl<C, D> CredentialInvoker for AuthenticationServicesInvoker<C, D>
where
    C: AuthorizationController,
    D: UiDispatcher,
{
    async fn create(
        &self,
        options: &CreationOptions,
        prefer_immediate: bool,
        _auto_select: bool,
    ) -> Result<RegistrationResponse, InvokeError> {
        let excluded_credentials = if self.controller.supports_excluded_credentials() {
            options
                .exclude_credentials
                .iter()
                .map(|descriptor| descriptor.id.as_bytes().to_vec())
                .collect()
        } else {
            Vec::new()
        };

        let request = AuthorizationRequest::Registration(PlatformRegistrationRequest {
            relying_party_identifier: options.rp.id.clone(),
            challenge: options.challenge.as_bytes().to_vec(),
            name: options.passkey_name().to_owned(),
            user_id: options.user.id.as_bytes().to_vec(),
            excluded_credentials,
            user_verification_preference: options.user_verification(),
        });

        tracing::debug!(rp_id = %options.rp.id, "presenting passkey registration");
        match self.perform(request, prefer_immediate).await? {
            Authorization::Registration(registration) => Ok(RegistrationResponse::from_native(
                NativeRegistration {
                    credential_id: registration.credential_id,
                    client_data_json: registration.raw_client_data_json,
                    attestation_object: registration.raw_attestation_object.unwrap_or_default(),
                    transports: Vec::new(),
                    attachment: AuthenticatorAttachment::Platform,
                },
                &options.origin(),
            )),
            Authorization::Assertion(_) => Err(InvokeError::UnexpectedResult("assertion".into())),
            Authorization::Other(kind) => Err(InvokeError::UnexpectedResult(kind)),
        }
    }

    async fn get(
        &self,
        options: &RequestOptions,
        prefer_immediate: bool,
    ) -> Result<AuthenticationResponse, InvokeError> {
        let request = AuthorizationRequest::Assertion(PlatformAssertionRequest {
            relying_party_identifier: options.rp_id.clone(),
            challenge: options.challenge.as_bytes().to_vec(),
            allowed_credentials: options
                .allow_credentials
                .iter()
                .map(|descriptor| descriptor.id.as_bytes().to_vec())
                .collect(),
            user_verification_preference: options.user_verification,
        });

        tracing::debug!(rp_id = %options.rp_id, "presenting passkey assertion");
        match self.perform(request, prefer_immediate).await? {
            Authorization::Assertion(assertion) => Ok(AuthenticationResponse::from_native(
                NativeAssertion {
                    credential_id: assertion.credential_id,
                    client_data_json: assertion.raw_client_data_json,
                    authenticator_data: assertion.raw_authenticator_data,
                    signature: assertion.signature,
                    user_id: assertion.user_id,
                    attachment: AuthenticatorAttachment::Platform,
                },
                &options.origin(),
            )),
            Authorization::Registration(_) => {
                Err(InvokeError::UnexpectedResult("registration".into()))
            }
            Authorization::Other(kind) => Err(InvokeError::UnexpectedResult(kind)),
        }
    }
}
