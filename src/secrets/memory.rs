use super::{SecretBundle, SecretStore};
use crate::error::{ConsulRenderError, Result};
use std::cell::Cell;
use std::collections::HashMap;

/// In-process secret store.
///
/// Counts fetches so callers can check how often the store was consulted.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    items: HashMap<(String, String), SecretBundle>,
    fetches: Cell<usize>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(mut self, bag_name: &str, bag_item: &str, bundle: SecretBundle) -> Self {
        self.insert(bag_name, bag_item, bundle);
        self
    }

    pub fn insert(&mut self, bag_name: &str, bag_item: &str, bundle: SecretBundle) {
        self.items
            .insert((bag_name.to_string(), bag_item.to_string()), bundle);
    }

    /// Number of `fetch` calls so far, successful or not.
    pub fn fetch_count(&self) -> usize {
        self.fetches.get()
    }
}

impl SecretStore for MemorySecretStore {
    fn fetch(&self, bag_name: &str, bag_item: &str) -> Result<SecretBundle> {
        self.fetches.set(self.fetches.get() + 1);
        self.items
            .get(&(bag_name.to_string(), bag_item.to_string()))
            .cloned()
            .ok_or_else(|| ConsulRenderError::SecretNotFound {
                bag_name: bag_name.to_string(),
                bag_item: bag_item.to_string(),
            })
    }
}
