use std::{fmt, path::Path};

use uuid::Uuid;

use crate::data_loaders::session::StoredAsset;

/// Runtime identity of a registered asset. Never persisted; a fresh id is
/// assigned every time an asset enters the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetId(Uuid);

impl AssetId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset-{}", self.0.simple())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDescriptor {
    pub id: AssetId,
    pub path: String,
    pub name: String,
    pub is_animated: bool,
}

impl AssetDescriptor {
    pub fn to_stored(&self) -> StoredAsset {
        StoredAsset {
            path: self.path.clone(),
            name: self.name.clone(),
            is_gif: self.is_animated,
        }
    }
}

/// Display name and animation flag for a picked file: a blank name falls back to
/// the file name, and `.gif` files (any case) play as animations.
pub fn describe_file(path: &str, name: Option<&str>) -> (String, bool) {
    let file_name = file_name_of(path);
    let name = match name.map(str::trim) {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => file_name,
    };
    (name, is_animated_path(path))
}

pub fn file_name_of(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

pub fn is_animated_path(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gif"))
}

/// Ordered list of registered assets. Insertion order drives every generated menu.
#[derive(Debug, Default)]
pub struct AssetRegistry {
    assets: Vec<AssetDescriptor>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_stored(stored: &[StoredAsset]) -> Self {
        let mut registry = Self::new();
        for asset in stored {
            registry.add(asset.path.clone(), asset.name.clone(), asset.is_gif);
        }
        registry
    }

    /// Appends without any duplicate check.
    pub fn add(&mut self, path: impl Into<String>, name: impl Into<String>, is_animated: bool) -> &AssetDescriptor {
        let index = self.assets.len();
        self.assets.push(AssetDescriptor {
            id: AssetId::new(),
            path: path.into(),
            name: name.into(),
            is_animated,
        });
        &self.assets[index]
    }

    /// Out-of-range indices are a no-op.
    pub fn remove(&mut self, index: usize) -> Option<AssetDescriptor> {
        if index < self.assets.len() {
            Some(self.assets.remove(index))
        } else {
            None
        }
    }

    pub fn list(&self) -> &[AssetDescriptor] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn get(&self, id: AssetId) -> Option<&AssetDescriptor> {
        self.assets.iter().find(|a| a.id == id)
    }

    pub fn index_of(&self, id: AssetId) -> Option<usize> {
        self.assets.iter().position(|a| a.id == id)
    }

    pub fn to_stored(&self) -> Vec<StoredAsset> {
        self.assets.iter().map(AssetDescriptor::to_stored).collect()
    }
}
