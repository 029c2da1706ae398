//! The JSON-in/JSON-out boundary between client code and a native invoker.
//!
//! Client code hands over server-issued options untouched and receives the
//! response JSON to post back to the server. Everything typed stays on this
//! side of the boundary: requests are parsed before the invoker is called,
//! responses leave as plain [`serde_json::Value`]s, and every failure leaves
//! as a [`ModuleError`] with a stable code.

use crate::error::{InvokeError, ModuleError, ModuleErrorCode};
use crate::invoker::{CredentialInvoker, Operation};
use crate::options::{CreationOptions, RequestOptions, options_object};
use passkey_common::{ConditionalSend, ConditionalSync};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Arguments of [`PasskeyModule::register_passkey`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPasskeyRequest {
    /// `PublicKeyCredentialCreationOptionsJSON`, as an object or a string.
    #[serde(rename = "optionsJSON")]
    pub options_json: Value,
    /// Prefer credential providers that can register without extra UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_auto_register: Option<bool>,
}

impl RegisterPasskeyRequest {
    /// Wrap server-issued creation options.
    pub fn new(options_json: Value) -> Self {
        Self {
            options_json,
            use_auto_register: None,
        }
    }

    /// Set the auto-register hint.
    pub fn with_auto_register(mut self, use_auto_register: Option<bool>) -> Self {
        self.use_auto_register = use_auto_register;
        self
    }
}

/// Arguments of [`PasskeyModule::authenticate_passkey`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatePasskeyRequest {
    /// `PublicKeyCredentialRequestOptionsJSON`, as an object or a string.
    #[serde(rename = "optionsJSON")]
    pub options_json: Value,
    /// Only offer credentials that are immediately available (autofill).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_autofill: Option<bool>,
}

impl AuthenticatePasskeyRequest {
    /// Wrap server-issued request options.
    pub fn new(options_json: Value) -> Self {
        Self {
            options_json,
            use_autofill: None,
        }
    }

    /// Set the autofill hint.
    pub fn with_autofill(mut self, use_autofill: Option<bool>) -> Self {
        self.use_autofill = use_autofill;
        self
    }
}

/// The native passkey module as seen by client code.
pub trait PasskeyModule: ConditionalSync {
    /// Register a passkey and return `RegistrationResponseJSON`.
    fn register_passkey(
        &self,
        request: RegisterPasskeyRequest,
    ) -> impl Future<Output = Result<Value, ModuleError>> + ConditionalSend;

    /// Authenticate with a passkey and return `AuthenticationResponseJSON`.
    fn authenticate_passkey(
        &self,
        request: AuthenticatePasskeyRequest,
    ) -> impl Future<Output = Result<Value, ModuleError>> + ConditionalSend;
}

impl<M> PasskeyModule for Arc<M>
where
    M: PasskeyModule,
{
    fn register_passkey(
        &self,
        request: RegisterPasskeyRequest,
    ) -> impl Future<Output = Result<Value, ModuleError>> + ConditionalSend {
        (**self).register_passkey(request)
    }

    fn authenticate_passkey(
        &self,
        request: AuthenticatePasskeyRequest,
    ) -> impl Future<Output = Result<Value, ModuleError>> + ConditionalSend {
        (**self).authenticate_passkey(request)
    }
}

/// A [`PasskeyModule`] backed by a platform [`CredentialInvoker`].
#[derive(Debug, Clone)]
pub struct NativePasskeyModule<I> {
    invoker: I,
}

impl<I> NativePasskeyModule<I>
where
    I: CredentialInvoker,
{
    /// Create a module around `invoker`.
    pub fn new(invoker: I) -> Self {
        Self { invoker }
    }

    /// The wrapped invoker.
    pub fn invoker(&self) -> &I {
        &self.invoker
    }
}

impl<I> PasskeyModule for NativePasskeyModule<I>
where
    I: CredentialInvoker,
{
    async fn register_passkey(&self, request: RegisterPasskeyRequest) -> Result<Value, ModuleError> {
        let options = CreationOptions::parse(options_object(request.options_json)?)?;
        let use_auto_register = request.use_auto_register.unwrap_or(false);

        tracing::debug!(rp_id = %options.rp.id, use_auto_register, "registering passkey");

        let response = self
            .invoker
            .create(&options, use_auto_register, use_auto_register)
            .await
            .map_err(|error| reject(Operation::Create, error))?;

        response
            .to_json()
            .map_err(|error| ModuleError::new(ModuleErrorCode::UnknownError, error.to_string()))
    }

    async fn authenticate_passkey(
        &self,
        request: AuthenticatePasskeyRequest,
    ) -> Result<Value, ModuleError> {
        let options = RequestOptions::parse(options_object(request.options_json)?)?;
        let use_autofill = request.use_autofill.unwrap_or(false);

        tracing::debug!(rp_id = %options.rp_id, use_autofill, "authenticating with passkey");

        let response = self
            .invoker
            .get(&options, use_autofill)
            .await
            .map_err(|error| reject(Operation::Get, error))?;

        response
            .to_json()
            .map_err(|error| ModuleError::new(ModuleErrorCode::UnknownError, error.to_string()))
    }
}

fn reject(operation: Operation, error: InvokeError) -> ModuleError {
    let code = match (&error, operation) {
        (InvokeError::NoUiContext, _) => ModuleErrorCode::NoActivity,
        (InvokeError::InvalidOptions(_) | InvokeError::Decode(_), _) => {
            ModuleErrorCode::InvalidOptions
        }
        (InvokeError::Cancelled, _) => ModuleErrorCode::Cancelled,
        (InvokeError::Platform(_), Operation::Create) => ModuleErrorCode::CreateError,
        (InvokeError::Platform(_), Operation::Get) => ModuleErrorCode::GetError,
        (InvokeError::UnexpectedResult(_), _) => ModuleErrorCode::UnexpectedType,
        (InvokeError::Unknown(_), _) => ModuleErrorCode::UnknownError,
    };
    tracing::debug!(%operation, %code, "native passkey {operation} failed: {error}");
    ModuleError::new(code, error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::AuthenticatorAttachment;
    use crate::response::{
        AuthenticationResponse, NativeAssertion, NativeRegistration, RegistrationResponse,
    };
    use passkey_common::SharedCell;
    use serde_json::json;
    use testresult::TestResult;

    #[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
    use wasm_bindgen_test::wasm_bindgen_test;

    #[derive(Default)]
    struct RecordingInvoker {
        created: SharedCell<Vec<(String, bool, bool)>>,
        got: SharedCell<Vec<(String, bool)>>,
        failure: Option<InvokeError>,
    }

    impl RecordingInvoker {
        fn failing(error: InvokeError) -> Self {
            Self {
                failure: Some(error),
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.created.read().len() + self.got.read().len()
        }
    }

    impl CredentialInvoker for RecordingInvoker {
        async fn create(
            &self,
            options: &CreationOptions,
            prefer_immediate: bool,
            auto_select: bool,
        ) -> Result<RegistrationResponse, InvokeError> {
            self.created.write().push((
                options.passkey_name().to_owned(),
                prefer_immediate,
                auto_select,
            ));
            if let Some(error) = &self.failure {
                return Err(error.clone());
            }
            Ok(RegistrationResponse::from_native(
                NativeRegistration {
                    credential_id: b"cred-1".to_vec(),
                    client_data_json: b"{}".to_vec(),
                    attestation_object: vec![1, 2, 3],
                    transports: Vec::new(),
                    attachment: AuthenticatorAttachment::Platform,
                },
                &options.origin(),
            ))
        }

        async fn get(
            &self,
            options: &RequestOptions,
            prefer_immediate: bool,
        ) -> Result<AuthenticationResponse, InvokeError> {
            self.got
                .write()
                .push((options.rp_id.clone(), prefer_immediate));
            if let Some(error) = &self.failure {
                return Err(error.clone());
            }
            Ok(AuthenticationResponse::from_native(
                NativeAssertion {
                    credential_id: b"cred-1".to_vec(),
                    client_data_json: b"{}".to_vec(),
                    authenticator_data: vec![0; 37],
                    signature: vec![4, 5, 6],
                    user_id: Some(b"user-1".to_vec()),
                    attachment: AuthenticatorAttachment::Platform,
                },
                &options.origin(),
            ))
        }
    }

    fn creation_options() -> Value {
        json!({
            "rp": { "id": "example.com", "name": "Example" },
            "challenge": "Y2hhbGxlbmdl",
            "user": { "id": "dXNlci0x", "name": "alice", "displayName": "A. Liceman" }
        })
    }

    fn request_options() -> Value {
        json!({ "rpId": "example.com", "challenge": "Y2hhbGxlbmdl" })
    }

    #[cfg_attr(not(all(target_arch = "wasm32", target_os = "unknown")), tokio::test)]
    #[cfg_attr(all(target_arch = "wasm32", target_os = "unknown"), wasm_bindgen_test)]
    async fn it_registers_through_the_invoker() -> TestResult {
        let module = NativePasskeyModule::new(RecordingInvoker::default());

        let response = module
            .register_passkey(
                RegisterPasskeyRequest::new(creation_options()).with_auto_register(Some(true)),
            )
            .await?;

        assert_eq!(
            *module.invoker().created.read(),
            vec![("alice".to_string(), true, true)]
        );
        assert_eq!(response["id"], json!("Y3JlZC0x"));
        assert_eq!(response["rawId"], response["id"]);
        assert_eq!(response["response"]["transports"], json!(["internal"]));
        assert_eq!(response["origin"], json!("https://example.com"));
        Ok(())
    }

    #[cfg_attr(not(all(target_arch = "wasm32", target_os = "unknown")), tokio::test)]
    #[cfg_attr(all(target_arch = "wasm32", target_os = "unknown"), wasm_bindgen_test)]
    async fn it_accepts_options_serialized_as_a_string() -> TestResult {
        let module = NativePasskeyModule::new(RecordingInvoker::default());

        let response = module
            .authenticate_passkey(AuthenticatePasskeyRequest::new(Value::String(
                request_options().to_string(),
            )))
            .await?;

        assert_eq!(
            *module.invoker().got.read(),
            vec![("example.com".to_string(), false)]
        );
        assert_eq!(response["response"]["userHandle"], json!("dXNlci0x"));
        Ok(())
    }

    #[cfg_attr(not(all(target_arch = "wasm32", target_os = "unknown")), tokio::test)]
    #[cfg_attr(all(target_arch = "wasm32", target_os = "unknown"), wasm_bindgen_test)]
    async fn it_fails_fast_without_a_relying_party_id() {
        let module = NativePasskeyModule::new(RecordingInvoker::default());

        let mut options = creation_options();
        options["rp"]["id"] = json!("");
        let error = module
            .register_passkey(RegisterPasskeyRequest::new(options))
            .await
            .err();
        assert_eq!(
            error,
            Some(ModuleError::new(
                ModuleErrorCode::InvalidOptions,
                "rp.id is required"
            ))
        );

        let mut options = creation_options();
        options["rp"] = json!({ "name": "Example" });
        assert!(
            module
                .register_passkey(RegisterPasskeyRequest::new(options))
                .await
                .is_err()
        );

        let error = module
            .authenticate_passkey(AuthenticatePasskeyRequest::new(
                json!({ "challenge": "Y2hhbGxlbmdl" }),
            ))
            .await
            .err();
        assert_eq!(
            error.map(|error| error.code),
            Some(ModuleErrorCode::InvalidOptions)
        );

        assert_eq!(module.invoker().calls(), 0);
    }

    #[cfg_attr(not(all(target_arch = "wasm32", target_os = "unknown")), tokio::test)]
    #[cfg_attr(all(target_arch = "wasm32", target_os = "unknown"), wasm_bindgen_test)]
    async fn it_rejects_options_that_are_not_objects() {
        let module = NativePasskeyModule::new(RecordingInvoker::default());

        let error = module
            .register_passkey(RegisterPasskeyRequest::new(json!(42)))
            .await
            .err();

        assert_eq!(
            error,
            Some(ModuleError::new(
                ModuleErrorCode::InvalidOptions,
                "optionsJSON must be an object"
            ))
        );
        assert_eq!(module.invoker().calls(), 0);
    }

    #[cfg_attr(not(all(target_arch = "wasm32", target_os = "unknown")), tokio::test)]
    #[cfg_attr(all(target_arch = "wasm32", target_os = "unknown"), wasm_bindgen_test)]
    async fn it_classifies_invoker_failures_per_operation() {
        let cases = [
            (InvokeError::Cancelled, ModuleErrorCode::Cancelled, ModuleErrorCode::Cancelled),
            (InvokeError::NoUiContext, ModuleErrorCode::NoActivity, ModuleErrorCode::NoActivity),
            (
                InvokeError::Platform("boom".into()),
                ModuleErrorCode::CreateError,
                ModuleErrorCode::GetError,
            ),
            (
                InvokeError::UnexpectedResult("password".into()),
                ModuleErrorCode::UnexpectedType,
                ModuleErrorCode::UnexpectedType,
            ),
            (
                InvokeError::Unknown("gone".into()),
                ModuleErrorCode::UnknownError,
                ModuleErrorCode::UnknownError,
            ),
        ];

        for (failure, create_code, get_code) in cases {
            let module = NativePasskeyModule::new(RecordingInvoker::failing(failure.clone()));

            let created = module
                .register_passkey(RegisterPasskeyRequest::new(creation_options()))
                .await
                .err()
                .map(|error| (error.code, error.message));
            assert_eq!(created, Some((create_code, failure.to_string())));

            let got = module
                .authenticate_passkey(AuthenticatePasskeyRequest::new(request_options()))
                .await
                .err()
                .map(|error| error.code);
            assert_eq!(got, Some(get_code));
        }
    }

    #[test]
    fn it_serializes_requests_in_the_wrapped_shape() -> TestResult {
        let request = RegisterPasskeyRequest::new(json!({})).with_auto_register(Some(true));
        assert_eq!(
            serde_json::to_value(&request)?,
            json!({ "optionsJSON": {}, "useAutoRegister": true })
        );

        let request: AuthenticatePasskeyRequest =
            serde_json::from_value(json!({ "optionsJSON": { "rpId": "a" } }))?;
        assert_eq!(request.use_autofill, None);
        Ok(())
    }
}
