use super::{SecretBundle, SecretStore};
use crate::error::{ConsulRenderError, Result};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Secret store backed by a directory of JSON items.
///
/// Item `(bag, item)` lives at `<root>/<bag>/<item>.json`.
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    root: PathBuf,
}

/// Reject names that would escape the store root.
fn validate_component(kind: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ConsulRenderError::Validation(format!(
            "{} cannot be empty",
            kind
        )));
    }
    if value.contains('/') || value.contains('\0') || value == "." || value == ".." {
        return Err(ConsulRenderError::Validation(format!(
            "{} '{}' must be a single path component",
            kind, value
        )));
    }
    Ok(())
}

impl FileSecretStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn item_path(&self, bag_name: &str, bag_item: &str) -> Result<PathBuf> {
        validate_component("bag_name", bag_name)?;
        validate_component("bag_item", bag_item)?;
        Ok(self.root.join(bag_name).join(format!("{}.json", bag_item)))
    }
}

impl SecretStore for FileSecretStore {
    fn fetch(&self, bag_name: &str, bag_item: &str) -> Result<SecretBundle> {
        let path = self.item_path(bag_name, bag_item)?;
        debug!(path = %path.display(), "reading secret item");

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ConsulRenderError::SecretNotFound {
                    bag_name: bag_name.to_string(),
                    bag_item: bag_item.to_string(),
                })
            }
            Err(e) => return Err(ConsulRenderError::filesystem(path, e)),
        };

        serde_json::from_str(&contents).map_err(|e| ConsulRenderError::MalformedSecret {
            bag_name: bag_name.to_string(),
            bag_item: bag_item.to_string(),
            reason: e.to_string(),
        })
    }
}
