//! Credential Manager variant (Android model).
//!
//! The Credential Manager accepts WebAuthn options as JSON and answers with
//! WebAuthn response JSON, so this adapter forwards the canonical options
//! unchanged and only normalizes what comes back.
//!
//! Callers may ask for an explicit request origin on SDK 34 and above when
//! the app holds [`SET_ORIGIN_PERMISSION`]. The adapter requests
//! `https://{rpId}` whenever it is allowed to and falls back to the
//! platform-derived origin otherwise.

use crate::error::InvokeError;
use crate::invoker::CredentialInvoker;
use crate::options::{CreationOptions, RequestOptions};
use crate::response::{AuthenticationResponse, RegistrationResponse};
use passkey_common::{ConditionalSend, ConditionalSync};
use std::future::Future;
use thiserror::Error;

/// Permission required to set an explicit request origin.
pub const SET_ORIGIN_PERMISSION: &str = "android.permission.CREDENTIAL_MANAGER_SET_ORIGIN";

/// First SDK level (`UPSIDE_DOWN_CAKE`) that supports explicit origins.
pub const SET_ORIGIN_MIN_SDK: u32 = 34;

/// A request to create a public key credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePublicKeyCredentialRequest {
    /// `PublicKeyCredentialCreationOptionsJSON`.
    pub request_json: String,
    /// Only offer providers that can complete immediately.
    pub prefer_immediately_available_credentials: bool,
    /// Explicit origin, when the caller is allowed to set one.
    pub origin: Option<String>,
    /// Let the platform pick a provider without asking.
    pub is_auto_select_allowed: bool,
}

/// One option offered to the credential picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetPublicKeyCredentialOption {
    /// `PublicKeyCredentialRequestOptionsJSON`.
    pub request_json: String,
}

/// A request to retrieve a credential.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GetCredentialRequest {
    /// Options offered to the picker.
    pub credential_options: Vec<GetPublicKeyCredentialOption>,
    /// Explicit origin, when the caller is allowed to set one.
    pub origin: Option<String>,
    /// Only offer credentials that are immediately available.
    pub prefer_immediately_available_credentials: bool,
}

/// Result of [`CredentialManager::create_credential`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateCredentialResponse {
    /// A passkey was created.
    PublicKey {
        /// `RegistrationResponseJSON` as produced by the provider.
        registration_response_json: String,
    },
    /// Some other credential type was created.
    Other {
        /// The platform's type name.
        credential_type: String,
    },
}

/// A credential returned by [`CredentialManager::get_credential`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// A passkey assertion.
    PublicKey {
        /// `AuthenticationResponseJSON` as produced by the provider.
        authentication_response_json: String,
    },
    /// Some other credential type (password, federated, ...).
    Other {
        /// The platform's type name.
        credential_type: String,
    },
}

/// Failures reported by the Credential Manager.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialManagerError {
    /// The user dismissed the sheet.
    #[error("credential request cancelled")]
    Cancelled,

    /// Creating the credential failed.
    #[error("{}", message.as_deref().unwrap_or("Failed to create passkey"))]
    Create {
        /// Platform message, if any.
        message: Option<String>,
    },

    /// Retrieving the credential failed.
    #[error("{}", message.as_deref().unwrap_or("Failed to get passkey"))]
    Get {
        /// Platform message, if any.
        message: Option<String>,
    },

    /// The caller may not set the requested origin.
    #[error("{}", message.as_deref().unwrap_or("origin override not permitted"))]
    Security {
        /// Platform message, if any.
        message: Option<String>,
    },

    /// Anything else.
    #[error("{}", message.as_deref().unwrap_or("Unknown error"))]
    Other {
        /// Platform message, if any.
        message: Option<String>,
    },
}

impl From<CredentialManagerError> for InvokeError {
    fn from(error: CredentialManagerError) -> Self {
        match error {
            CredentialManagerError::Cancelled => Self::Cancelled,
            CredentialManagerError::Create { .. } | CredentialManagerError::Get { .. } => {
                Self::Platform(error.to_string())
            }
            CredentialManagerError::Security { .. } | CredentialManagerError::Other { .. } => {
                Self::Unknown(error.to_string())
            }
        }
    }
}

/// The platform Credential Manager service.
///
/// The suspend functions of the platform service already dispatch their UI
/// to the main thread, so implementations may be polled from any executor.
///
/// A request carrying an `origin` the caller may not claim must fail with
/// [`CredentialManagerError::Security`] before any sheet is shown. The
/// invoker answers that error by reissuing the request without an origin,
/// and the user must see exactly one sheet per invocation.
pub trait CredentialManager: ConditionalSync {
    /// The foreground activity hosting the credential sheet.
    type Activity: ConditionalSend + ConditionalSync;

    /// The current foreground activity, if there is one.
    fn current_activity(&self) -> Option<Self::Activity>;

    /// The platform SDK level.
    fn sdk_version(&self) -> u32;

    /// Whether `activity` holds `permission`.
    fn check_self_permission(&self, activity: &Self::Activity, permission: &str) -> bool;

    /// Create a credential.
    ///
    /// An origin rejection is reported as
    /// [`CredentialManagerError::Security`] without presenting UI.
    fn create_credential(
        &self,
        activity: &Self::Activity,
        request: CreatePublicKeyCredentialRequest,
    ) -> impl Future<Output = Result<CreateCredentialResponse, CredentialManagerError>> + ConditionalSend;

    /// Retrieve a credential.
    ///
    /// An origin rejection is reported as
    /// [`CredentialManagerError::Security`] without presenting UI.
    fn get_credential(
        &self,
        activity: &Self::Activity,
        request: GetCredentialRequest,
    ) -> impl Future<Output = Result<Credential, CredentialManagerError>> + ConditionalSend;
}

/// [`CredentialInvoker`] over a [`CredentialManager`].
#[derive(Debug, Clone)]
pub struct CredentialManagerInvoker<M> {
    manager: M,
}

impl<M> CredentialManagerInvoker<M>
where
    M: CredentialManager,
{
    /// Wrap a Credential Manager.
    pub fn new(manager: M) -> Self {
        Self { manager }
    }

    /// The wrapped manager.
    pub fn manager(&self) -> &M {
        &self.manager
    }

    fn can_use_set_origin(&self, activity: &M::Activity) -> bool {
        self.manager.sdk_version() >= SET_ORIGIN_MIN_SDK
            && self
                .manager
                .check_self_permission(activity, SET_ORIGIN_PERMISSION)
    }

    fn request_origin(&self, activity: &M::Activity, origin: &str) -> Option<String> {
        if self.can_use_set_origin(activity) {
            Some(origin.to_owned())
        } else {
            tracing::debug!(%origin, "explicit origin unavailable; using platform origin");
            None
        }
    }
}

impl<M> CredentialInvoker for CredentialManagerInvoker<M>
where
    M: CredentialManager,
{
    async fn create(
        &self,
        options: &CreationOptions,
        prefer_immediate: bool,
        auto_select: bool,
    ) -> Result<RegistrationResponse, InvokeError> {
        let activity = self
            .manager
            .current_activity()
            .ok_or(InvokeError::NoUiContext)?;

        let origin = options.origin();
        let request = CreatePublicKeyCredentialRequest {
            request_json: options.canonical_json().to_string(),
            prefer_immediately_available_credentials: prefer_immediate,
            origin: self.request_origin(&activity, &origin),
            is_auto_select_allowed: auto_select,
        };

        let result = match self
            .manager
            .create_credential(&activity, request.clone())
            .await
        {
            Err(CredentialManagerError::Security { .. }) if request.origin.is_some() => {
                tracing::debug!(%origin, "origin override rejected; using platform origin");
                self.manager
                    .create_credential(
                        &activity,
                        CreatePublicKeyCredentialRequest {
                            origin: None,
                            ..request
                        },
                    )
                    .await
            }
            result => result,
        };

        match result? {
            CreateCredentialResponse::PublicKey {
                registration_response_json,
            } => Ok(RegistrationResponse::from_platform_json(
                &registration_response_json,
                &origin,
            )?),
            CreateCredentialResponse::Other { credential_type } => {
                Err(InvokeError::UnexpectedResult(credential_type))
            }
        }
    }

    async fn get(
        &self,
        options: &RequestOptions,
        prefer_immediate: bool,
    ) -> Result<AuthenticationResponse, InvokeError> {
        let activity = self
            .manager
            .current_activity()
            .ok_or(InvokeError::NoUiContext)?;

        let origin = options.origin();
        let request = GetCredentialRequest {
            credential_options: vec![GetPublicKeyCredentialOption {
                request_json: options.canonical_json().to_string(),
            }],
            origin: self.request_origin(&activity, &origin),
            prefer_immediately_available_credentials: prefer_immediate,
        };

        let result = match self.manager.get_credential(&activity, request.clone()).await {
            Err(CredentialManagerError::Security { .. }) if request.origin.is_some() => {
                tracing::debug!(%origin, "origin override rejected; using platform origin");
                self.manager
                    .get_credential(
                        &activity,
                        GetCredentialRequest {
                            origin: None,
                            ..request
                        },
                    )
                    .await
            }
            result => result,
        };

        match result? {
            Credential::PublicKey {
                authentication_response_json,
            } => Ok(AuthenticationResponse::from_platform_json(
                &authentication_response_json,
                &origin,
            )?),
            Credential::Other { credential_type } => Err(InvokeError::UnexpectedResult(
                credential_type,
            )),
        }
    }
}
