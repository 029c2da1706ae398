#![warn(missing_docs)]

//! WebAuthn JSON adaptation for native passkey APIs.
//!
//! Servers speak the standard `PublicKeyCredentialCreationOptionsJSON` and
//! `PublicKeyCredentialRequestOptionsJSON` shapes, with every binary field
//! base64url-encoded. Native platforms speak either a JSON dialect of their
//! own or strongly-typed request objects. This crate sits between the two:
//!
//! - [`codec`]: base64url conversion used on every binary field
//! - [`options`]: validation and canonicalization of server-issued options
//! - [`response`]: construction of the standard registration and
//!   authentication response JSON from native results
//! - [`CredentialInvoker`]: the `{create, get}` capability each platform
//!   implements, with variants under [`platform`]
//! - [`PasskeyModule`]: the JSON-in/JSON-out boundary consumed by client code
//!
//! Nothing here verifies signatures or attestations; the bytes are carried
//! opaquely to a server-side verifier.

pub mod codec;
mod error;
mod invoker;
mod module;
pub mod options;
pub mod platform;
pub mod response;

pub use codec::{Base64Url, decode_base64url, encode_base64url};
pub use error::{
    DecodeError, InvalidOptionsError, InvokeError, ModuleError, ModuleErrorCode, ResponseError,
};
pub use invoker::{CredentialInvoker, Operation};
pub use module::{
    AuthenticatePasskeyRequest, NativePasskeyModule, PasskeyModule, RegisterPasskeyRequest,
};
pub use options::{CreationOptions, RequestOptions};
pub use response::{AuthenticationResponse, RegistrationResponse};
