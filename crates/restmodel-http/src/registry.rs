//! Reuse of clients with identical configuration.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::client::{Client, SharedClient};
use crate::config::ClientConfig;

type RegistryKey = (String, u64);

/// Hands out one shared client per `(name, configuration fingerprint)`.
///
/// Pass a registry to whatever constructs models; it is safe to share
/// between threads.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: Mutex<HashMap<RegistryKey, SharedClient>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn clients(&self) -> MutexGuard<'_, HashMap<RegistryKey, SharedClient>> {
        self.clients.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fingerprint of the settings that make two clients interchangeable.
    pub fn fingerprint(config: &ClientConfig) -> u64 {
        let mut hasher = DefaultHasher::new();
        config.uri.hash(&mut hasher);
        config.success_codes.hash(&mut hasher);
        config.headers.hash(&mut hasher);
        hasher.finish()
    }

    fn key(config: &ClientConfig) -> RegistryKey {
        (config.name.clone(), Self::fingerprint(config))
    }

    /// The registered client for `config`, creating it with `make` if absent.
    pub fn get_or_insert_with<F>(&self, config: &ClientConfig, make: F) -> SharedClient
    where
        F: FnOnce() -> Client,
    {
        let mut clients = self.clients();
        Arc::clone(clients.entry(Self::key(config)).or_insert_with(|| {
            tracing::debug!(client = %config.name, uri = %config.uri, "Registering client");
            make().shared()
        }))
    }

    /// Like [`get_or_insert_with`](Self::get_or_insert_with) with a fallible
    /// constructor.
    pub fn get_or_try_insert_with<F, E>(
        &self,
        config: &ClientConfig,
        make: F,
    ) -> Result<SharedClient, E>
    where
        F: FnOnce() -> Result<Client, E>,
    {
        let key = Self::key(config);
        let mut clients = self.clients();
        if let Some(client) = clients.get(&key) {
            return Ok(Arc::clone(client));
        }
        let client = make()?.shared();
        clients.insert(key, Arc::clone(&client));
        Ok(client)
    }

    pub fn get(&self, config: &ClientConfig) -> Option<SharedClient> {
        self.clients().get(&Self::key(config)).cloned()
    }

    pub fn remove(&self, config: &ClientConfig) -> Option<SharedClient> {
        self.clients().remove(&Self::key(config))
    }

    pub fn len(&self) -> usize {
        self.clients().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients().is_empty()
    }

    pub fn clear(&self) {
        self.clients().clear();
    }
}
