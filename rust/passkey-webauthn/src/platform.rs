//! Per-platform [`CredentialInvoker`](crate::CredentialInvoker) variants.
//!
//! The platform models are compiled on every target so they can be exercised
//! with fakes; `native` names the one that matches the build target.

pub mod authentication_services;
pub mod credential_manager;

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub mod browser;

#[cfg(target_os = "android")]
pub use credential_manager as native;

#[cfg(any(target_os = "ios", target_os = "macos"))]
pub use authentication_services as native;

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub use browser as native;
