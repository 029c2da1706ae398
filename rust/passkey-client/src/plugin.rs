use crate::actions::{
    GENERATE_AUTHENTICATE_OPTIONS, GENERATE_REGISTER_OPTIONS, PasskeyActions,
    VERIFY_AUTHENTICATION, VERIFY_REGISTRATION,
};
use crate::fetch::{Fetch, Method};
use crate::store::{LIST_PASSKEYS_SIGNAL, Signal, SignalStore, Store};
use passkey_webauthn::PasskeyModule;

/// Identifier the auth client registers this plugin under.
pub const PLUGIN_ID: &str = "passkey";

/// The client plugin: owns the passkey list signal and hands out actions
/// bound to it.
#[derive(Debug, Clone, Default)]
pub struct PasskeyClientPlugin {
    list_passkeys: Signal,
}

impl PasskeyClientPlugin {
    /// A plugin with a fresh passkey list signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Always [`PLUGIN_ID`].
    pub fn id(&self) -> &'static str {
        PLUGIN_ID
    }

    /// Signals this plugin owns, by name.
    pub fn atoms(&self) -> Vec<(&'static str, Signal)> {
        vec![(LIST_PASSKEYS_SIGNAL, self.list_passkeys.clone())]
    }

    /// Register [`Self::atoms`] with `store`.
    pub fn install(&self, store: &SignalStore) {
        for (name, signal) in self.atoms() {
            store.register(name, signal);
        }
    }

    /// HTTP method of every endpoint the actions call.
    pub fn path_methods(&self) -> Vec<(&'static str, Method)> {
        vec![
            (GENERATE_REGISTER_OPTIONS, Method::Get),
            (VERIFY_REGISTRATION, Method::Post),
            (GENERATE_AUTHENTICATE_OPTIONS, Method::Post),
            (VERIFY_AUTHENTICATION, Method::Post),
        ]
    }

    /// Actions bound to `fetch`, `store` and the native `module`.
    pub fn actions<F, S, M>(&self, fetch: F, store: S, module: M) -> PasskeyActions<F, S, M>
    where
        F: Fetch,
        S: Store,
        M: PasskeyModule,
    {
        PasskeyActions::new(fetch, store, module, self.list_passkeys.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_exposes_its_list_signal_as_an_atom() {
        let plugin = PasskeyClientPlugin::new();
        let store = SignalStore::new();
        plugin.install(&store);

        store.notify(LIST_PASSKEYS_SIGNAL);

        assert_eq!(plugin.id(), "passkey");
        let atoms = plugin.atoms();
        assert_eq!(atoms.len(), 1);
        assert_eq!(atoms[0].0, "$listPasskeys");
        assert_eq!(atoms[0].1.get(), 1);
    }

    #[test]
    fn it_lists_endpoint_methods() {
        let methods = PasskeyClientPlugin::new().path_methods();
        assert!(methods.contains(&("/passkey/generate-register-options", Method::Get)));
        assert!(methods.contains(&("/passkey/verify-authentication", Method::Post)));
    }
}
