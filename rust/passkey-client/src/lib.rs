#![warn(missing_docs)]

//! Passkey sign-in and registration for auth clients.
//!
//! [`PasskeyClientPlugin`] hands out [`PasskeyActions`] bound to a
//! [`Fetch`] implementation (usually [`HttpFetch`]), a [`Store`] of reactive
//! signals and a native [`PasskeyModule`](passkey_webauthn::PasskeyModule).
//!
//! ```no_run
//! use passkey_client::{ClientConfig, HttpFetch, PasskeyClientPlugin, SignInOptions, SignalStore};
//! use passkey_webauthn::PasskeyModule;
//! use std::sync::Arc;
//!
//! # async fn example(module: impl PasskeyModule) {
//! let plugin = PasskeyClientPlugin::new();
//! let store = Arc::new(SignalStore::new());
//! plugin.install(&store);
//!
//! let fetch = HttpFetch::new(ClientConfig::new("https://example.com/api/auth"));
//! let actions = plugin.actions(fetch, store, module);
//!
//! let signed_in = actions.sign_in_passkey(SignInOptions::default()).await;
//! if let Some(error) = signed_in.error {
//!     eprintln!("sign-in failed: {:?}", error.message);
//! }
//! # }
//! ```

mod actions;
mod config;
mod error;
mod fetch;
mod plugin;
mod store;

pub use actions::*;
pub use config::*;
pub use error::*;
pub use fetch::*;
pub use plugin::*;
pub use store::*;
