//! Uploaded media referenced by asset drops.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An uploaded image or video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    /// Library id.
    pub id: String,
    /// Original file name.
    pub name: String,
    /// MIME type (`image/png`, `video/mp4`, ...).
    pub mime_type: String,
    /// `data:` URI carrying the payload.
    pub data: String,
}

impl Asset {
    /// Create an asset from an already-encoded data URI.
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            id: format!("asset-{}", Uuid::new_v4().simple()),
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Create an asset from raw file bytes.
    #[must_use]
    pub fn from_bytes(name: &str, mime_type: &str, bytes: &[u8]) -> Self {
        let data = format!("data:{mime_type};base64,{}", STANDARD.encode(bytes));
        Self::new(name, mime_type, data)
    }

    /// Decode the payload of a base64 data URI.
    ///
    /// Returns `None` for plain URLs or malformed payloads.
    #[must_use]
    pub fn bytes(&self) -> Option<Vec<u8>> {
        let (header, payload) = self.data.strip_prefix("data:")?.split_once(',')?;
        if !header.ends_with(";base64") {
            return None;
        }
        STANDARD.decode(payload).ok()
    }

    /// Whether this is an image.
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    /// Whether this is a video.
    #[must_use]
    pub fn is_video(&self) -> bool {
        self.mime_type.starts_with("video/")
    }
}

/// Assets supplied by the host, in upload order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetLibrary {
    assets: Vec<Asset>,
}

impl AssetLibrary {
    /// Create an empty library.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an asset (replacing one with the same id) and return its id.
    pub fn add(&mut self, asset: Asset) -> String {
        let id = asset.id.clone();
        self.assets.retain(|a| a.id != id);
        self.assets.push(asset);
        id
    }

    /// Look up an asset.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.id == id)
    }

    /// Remove an asset.
    pub fn remove(&mut self, id: &str) -> Option<Asset> {
        let index = self.assets.iter().position(|a| a.id == id)?;
        Some(self.assets.remove(index))
    }

    /// Iterate in upload order.
    pub fn iter(&self) -> impl Iterator<Item = &Asset> {
        self.assets.iter()
    }

    /// Number of assets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether the library is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
