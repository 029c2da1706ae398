use crate::error::InvokeError;
use crate::options::{CreationOptions, RequestOptions};
use crate::response::{AuthenticationResponse, RegistrationResponse};
use passkey_common::{ConditionalSend, ConditionalSync};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// The two credential ceremonies a platform performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Registration (`navigator.credentials.create`).
    Create,
    /// Authentication (`navigator.credentials.get`).
    Get,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => f.write_str("create"),
            Self::Get => f.write_str("get"),
        }
    }
}

/// Opens the platform credential UI.
///
/// Each call owns exactly one native UI session and its own completion
/// handle. Callers are expected to issue one call at a time per operation,
/// but concurrent calls must not interfere with each other.
///
/// Implementations report a missing foreground UI context as
/// [`InvokeError::NoUiContext`] before touching the platform, a dismissed
/// sheet as [`InvokeError::Cancelled`], and any other platform rejection as
/// [`InvokeError::Platform`].
pub trait CredentialInvoker: ConditionalSync {
    /// Register a new credential.
    ///
    /// `prefer_immediate` asks the platform to only offer credential
    /// providers that can complete without further UI; `auto_select` lets it
    /// pick a provider without asking. Both are hints that platforms without
    /// an equivalent ignore.
    fn create(
        &self,
        options: &CreationOptions,
        prefer_immediate: bool,
        auto_select: bool,
    ) -> impl Future<Output = Result<RegistrationResponse, InvokeError>> + ConditionalSend;

    /// Produce an assertion with an existing credential.
    ///
    /// `prefer_immediate` is the autofill hint: only offer credentials that
    /// are immediately available on the device.
    fn get(
        &self,
        options: &RequestOptions,
        prefer_immediate: bool,
    ) -> impl Future<Output = Result<AuthenticationResponse, InvokeError>> + ConditionalSend;
}

impl<I> CredentialInvoker for Arc<I>
where
    I: CredentialInvoker,
{
    fn create(
        &self,
        options: &CreationOptions,
        prefer_immediate: bool,
        auto_select: bool,
    ) -> impl Future<Output = Result<RegistrationResponse, InvokeError>> + ConditionalSend {
        (**self).create(options, prefer_immediate, auto_select)
    }

    fn get(
        &self,
        options: &RequestOptions,
        prefer_immediate: bool,
    ) -> impl Future<Output = Result<AuthenticationResponse, InvokeError>> + ConditionalSend {
        (**self).get(options, prefer_immediate)
    }
}
