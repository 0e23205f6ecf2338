//! Color filter persistence
//!
//! Filters are remembered per source image, keyed by a hash of the encoded
//! image bytes, with one global default used for images never seen before.

use crate::error::EngineError;
use crate::settings::ColorFilterSettings;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a digest of the encoded image bytes, as 16 hex digits
pub fn image_content_hash(bytes: &[u8]) -> String {
    let hash = bytes
        .iter()
        .fold(FNV_OFFSET, |h, &b| (h ^ b as u64).wrapping_mul(FNV_PRIME));
    format!("{:016x}", hash)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColorFilterStore {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<ColorFilterSettings>,
    pub by_image: BTreeMap<String, ColorFilterSettings>,
}

impl ColorFilterStore {
    /// Load the store; a missing file is an empty store
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        match fs::read_to_string(path.as_ref()) {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), EngineError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Filter for `image_hash`, falling back to the global default
    pub fn load_for(&self, image_hash: Option<&str>) -> Option<ColorFilterSettings> {
        image_hash
            .and_then(|hash| self.by_image.get(hash))
            .or(self.default.as_ref())
            .cloned()
    }

    /// Remember `filter` for one image, or as the default when `image_hash` is `None`
    pub fn save_for(&mut self, image_hash: Option<&str>, filter: ColorFilterSettings) {
        match image_hash {
            Some(hash) => {
                self.by_image.insert(hash.to_string(), filter);
            }
            None => self.default = Some(filter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::ColorKey;

    #[test]
    fn hash_is_stable_and_content_sensitive() {
        let a = image_content_hash(b"abc");
        assert_eq!(a, image_content_hash(b"abc"));
        assert_ne!(a, image_content_hash(b"abd"));
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn hash_matches_published_fnv1a_vectors() {
        // stored keys must survive toolchain upgrades
        assert_eq!(image_content_hash(b""), "cbf29ce484222325");
        assert_eq!(image_content_hash(b"a"), "af63dc4c8601ec8c");
        assert_eq!(image_content_hash(b"foobar"), "85944171f73967e8");
    }

    #[test]
    fn per_image_entry_wins_over_default() {
        let mut store = ColorFilterStore::default();
        let red = ColorFilterSettings::showing([ColorKey::from("#ff0000")]);
        let blue = ColorFilterSettings::hiding([ColorKey::from("#0000ff")]);
        store.save_for(None, red.clone());
        store.save_for(Some("img"), blue.clone());
        assert_eq!(store.load_for(Some("img")), Some(blue));
        assert_eq!(store.load_for(Some("other")), Some(red.clone()));
        assert_eq!(store.load_for(None), Some(red));
    }

    #[test]
    fn json_field_names() {
        let mut store = ColorFilterStore::default();
        store.save_for(Some("abc"), ColorFilterSettings::default());
        let json = serde_json::to_string(&store).unwrap();
        assert!(json.contains("\"byImage\""));
        assert!(!json.contains("\"default\""));
    }
}
