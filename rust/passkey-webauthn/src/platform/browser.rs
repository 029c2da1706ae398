//! Browser variant over `navigator.credentials`.
//!
//! Options are rebuilt as JS objects from the canonical JSON, with every
//! binary field replaced by a `Uint8Array`. The resulting `PublicKeyCredential`
//! is read back field by field and encoded by the response builder.

use crate::error::InvokeError;
use crate::invoker::CredentialInvoker;
use crate::options::{AuthenticatorAttachment, CreationOptions, CredentialDescriptor, RequestOptions};
use crate::response::{
    AuthenticationResponse, NativeAssertion, NativeRegistration, RegistrationResponse,
};
use js_sys::{Array, Object, Reflect, Uint8Array};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

/// The DOMException name browsers use for a dismissed or timed out prompt.
const NOT_ALLOWED: &str = "NotAllowedError";

/// [`CredentialInvoker`] over the Web Authentication API.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserInvoker;

impl BrowserInvoker {
    /// Create an invoker for the current browsing context.
    pub fn new() -> Self {
        Self
    }
}

impl CredentialInvoker for BrowserInvoker {
    async fn create(
        &self,
        options: &CreationOptions,
        _prefer_immediate: bool,
        _auto_select: bool,
    ) -> Result<RegistrationResponse, InvokeError> {
        let credentials = credentials_container()?;

        let public_key = js_object(options.canonical_json())?;
        js_set(&public_key, "challenge", &bytes(options.challenge.as_bytes()))?;
        let user = js_get(&public_key, "user")?;
        js_set(user.unchecked_ref(), "id", &bytes(options.user.id.as_bytes()))?;
        if !options.exclude_credentials.is_empty() {
            js_set(
                &public_key,
                "excludeCredentials",
                &descriptors(&options.exclude_credentials)?,
            )?;
        }

        let request = Object::new();
        js_set(&request, "publicKey", &public_key)?;

        tracing::debug!(rp_id = %options.rp.id, "navigator.credentials.create");
        let credential = call(&credentials, "create", &request).await?;

        let response = js_get(&credential, "response")?;
        Ok(RegistrationResponse::from_native(
            NativeRegistration {
                credential_id: buffer(&js_get(&credential, "rawId")?),
                client_data_json: buffer(&js_get(&response, "clientDataJSON")?),
                attestation_object: buffer(&js_get(&response, "attestationObject")?),
                transports: transports(&response),
                attachment: attachment(&credential),
            },
            &options.origin(),
        ))
    }

    async fn get(
        &self,
        options: &RequestOptions,
        prefer_immediate: bool,
    ) -> Result<AuthenticationResponse, InvokeError> {
        let credentials = credentials_container()?;

        let public_key = js_object(options.canonical_json())?;
        js_set(&public_key, "challenge", &bytes(options.challenge.as_bytes()))?;
        if !options.allow_credentials.is_empty() {
            js_set(
                &public_key,
                "allowCredentials",
                &descriptors(&options.allow_credentials)?,
            )?;
        }

        let request = Object::new();
        js_set(&request, "publicKey", &public_key)?;
        if prefer_immediate {
            js_set(&request, "mediation", &JsValue::from_str("conditional"))?;
        }

        tracing::debug!(rp_id = %options.rp_id, "navigator.credentials.get");
        let credential = call(&credentials, "get", &request).await?;

        let response = js_get(&credential, "response")?;
        let user_handle = js_get(&response, "userHandle")?;
        Ok(AuthenticationResponse::from_native(
            NativeAssertion {
                credential_id: buffer(&js_get(&credential, "rawId")?),
                client_data_json: buffer(&js_get(&response, "clientDataJSON")?),
                authenticator_data: buffer(&js_get(&response, "authenticatorData")?),
                signature: buffer(&js_get(&response, "signature")?),
                user_id: (!user_handle.is_null() && !user_handle.is_undefined())
                    .then(|| buffer(&user_handle)),
                attachment: attachment(&credential),
            },
            &options.origin(),
        ))
    }
}

/// `navigator.credentials`, or [`InvokeError::NoUiContext`] outside a
/// browsing context.
fn credentials_container() -> Result<JsValue, InvokeError> {
    let navigator = Reflect::get(&js_sys::global(), &"navigator".into())
        .map_err(|_| InvokeError::NoUiContext)?;
    if navigator.is_undefined() {
        return Err(InvokeError::NoUiContext);
    }
    let credentials =
        Reflect::get(&navigator, &"credentials".into()).map_err(|_| InvokeError::NoUiContext)?;
    if credentials.is_undefined() {
        return Err(InvokeError::NoUiContext);
    }
    Ok(credentials)
}

async fn call(credentials: &JsValue, method: &str, request: &Object) -> Result<JsValue, InvokeError> {
    let function: js_sys::Function = js_get(credentials, method)?.unchecked_into();
    let promise: js_sys::Promise = function
        .call1(credentials, request)
        .map_err(rejection)?
        .unchecked_into();
    let credential = JsFuture::from(promise).await.map_err(rejection)?;
    if credential.is_null() {
        return Err(InvokeError::Cancelled);
    }
    Ok(credential)
}

fn rejection(error: JsValue) -> InvokeError {
    let name = Reflect::get(&error, &"name".into())
        .ok()
        .and_then(|name| name.as_string());
    if name.as_deref() == Some(NOT_ALLOWED) {
        return InvokeError::Cancelled;
    }
    let message = Reflect::get(&error, &"message".into())
        .ok()
        .and_then(|message| message.as_string())
        .unwrap_or_else(|| format!("{error:?}"));
    InvokeError::Platform(message)
}

fn js_object(value: &serde_json::Value) -> Result<Object, InvokeError> {
    js_sys::JSON::parse(&value.to_string())
        .map(|value| value.unchecked_into::<Object>())
        .map_err(|e| InvokeError::Unknown(format!("failed to convert options: {e:?}")))
}

fn descriptors(list: &[CredentialDescriptor]) -> Result<Array, InvokeError> {
    let array = Array::new();
    for descriptor in list {
        let entry = Object::new();
        js_set(&entry, "type", &JsValue::from_str(crate::options::PUBLIC_KEY))?;
        js_set(&entry, "id", &bytes(descriptor.id.as_bytes()))?;
        if !descriptor.transports.is_empty() {
            let transports: Array = descriptor
                .transports
                .iter()
                .map(|transport| JsValue::from_str(transport))
                .collect();
            js_set(&entry, "transports", &transports)?;
        }
        array.push(&entry);
    }
    Ok(array)
}

fn transports(response: &JsValue) -> Vec<String> {
    let Some(function) = js_get(response, "getTransports")
        .ok()
        .and_then(|value| value.dyn_into::<js_sys::Function>().ok())
    else {
        return Vec::new();
    };
    function
        .call0(response)
        .ok()
        .map(|list| {
            Array::from(&list)
                .iter()
                .filter_map(|transport| transport.as_string())
                .collect()
        })
        .unwrap_or_default()
}

fn attachment(credential: &JsValue) -> AuthenticatorAttachment {
    js_get(credential, "authenticatorAttachment")
        .ok()
        .and_then(|value| value.as_string())
        .and_then(|value| AuthenticatorAttachment::from_wire(&value))
        .unwrap_or(AuthenticatorAttachment::Platform)
}

fn bytes(value: &[u8]) -> Uint8Array {
    Uint8Array::from(value)
}

fn js_get(object: &JsValue, key: &str) -> Result<JsValue, InvokeError> {
    Reflect::get(object, &JsValue::from_str(key))
        .map_err(|e| InvokeError::UnexpectedResult(format!("failed to get '{key}': {e:?}")))
}

fn js_set(object: &Object, key: &str, value: &JsValue) -> Result<(), InvokeError> {
    Reflect::set(object, &JsValue::from_str(key), value)
        .map_err(|e| InvokeError::Unknown(format!("failed to set '{key}': {e:?}")))?;
    Ok(())
}

/// Convert an `ArrayBuffer` (or typed-array view) to `Vec<u8>`.
fn buffer(value: &JsValue) -> Vec<u8> {
    let array = Uint8Array::new(value);
    let mut bytes = vec![0u8; array.length() as usize];
    array.copy_to(&mut bytes);
    bytes
}
