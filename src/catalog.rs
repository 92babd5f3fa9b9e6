//! The static table of models the viewer can display.

/// Caption attached to every visual sub-part of a loaded model.
pub const DEFAULT_FEATURE: &str = "This is a feature of the product.";

/// Where to find one model and how to scale it once loaded.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelDescriptor {
    /// Directory the scene file and its buffers/textures are resolved against.
    pub base_path: String,
    pub file_name: String,
    pub scale: [f32; 3],
    /// Caption tagged onto every surface of this model.
    pub feature: String,
}

impl ModelDescriptor {
    pub fn new(base_path: &str, file_name: &str, scale: [f32; 3]) -> Self {
        Self {
            base_path: base_path.to_string(),
            file_name: file_name.to_string(),
            scale,
            feature: DEFAULT_FEATURE.to_string(),
        }
    }

    /// Path of the scene file relative to the asset root.
    pub fn scene_path(&self) -> String {
        self.asset_path(&self.file_name)
    }

    /// Resolves a resource referenced by the scene file (buffer, image).
    pub fn asset_path(&self, relative: &str) -> String {
        if self.base_path.is_empty() || self.base_path.ends_with('/') {
            format!("{}{}", self.base_path, relative)
        } else {
            format!("{}/{}", self.base_path, relative)
        }
    }
}

/**
 * Ordered display name -> descriptor table.
 *
 * Lookups by unknown names never fail, they fall back to the default entry.
 */
#[derive(Clone, Debug)]
pub struct ModelCatalog {
    entries: Vec<(String, ModelDescriptor)>,
    default_key: String,
}

impl ModelCatalog {
    /**
     * `default_key` must name one of `entries`, otherwise the first entry becomes the default.
     *
     * # Panics
     *
     * Panics if `entries` is empty, as there would be nothing to fall back to.
     */
    pub fn new(entries: Vec<(String, ModelDescriptor)>, default_key: &str) -> Self {
        assert!(!entries.is_empty(), "a model catalog needs at least one entry");
        let default_key = if entries.iter().any(|(key, _)| key == default_key) {
            default_key.to_string()
        } else {
            log::warn!(
                "Default model {} is not part of the catalog, using {} instead",
                default_key,
                entries[0].0
            );
            entries[0].0.clone()
        };
        Self {
            entries,
            default_key,
        }
    }

    pub fn get(&self, key: &str) -> Option<&ModelDescriptor> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, descriptor)| descriptor)
    }

    /// Returns the resolved key together with its descriptor.
    pub fn resolve(&self, key: &str) -> (&str, &ModelDescriptor) {
        match self.entries.iter().find(|(name, _)| name == key) {
            Some((name, descriptor)) => (name, descriptor),
            None => {
                log::debug!("Unknown model {:?}, falling back to {}", key, self.default_key);
                let (name, descriptor) = self
                    .entries
                    .iter()
                    .find(|(name, _)| *name == self.default_key)
                    .unwrap_or(&self.entries[0]);
                (name, descriptor)
            }
        }
    }

    pub fn by_index(&self, idx: usize) -> Option<&str> {
        self.entries.get(idx).map(|(name, _)| name.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn default_key(&self) -> &str {
        &self.default_key
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::new(
            vec![
                (
                    "Falcon".to_string(),
                    ModelDescriptor::new("public/models/millennium_falcon/", "scene1.gltf", [1.0; 3]),
                ),
                (
                    "Adam Head".to_string(),
                    ModelDescriptor::new("public/models/adamHead/", "adamHead.gltf", [1.0; 3]),
                ),
                (
                    "BiWaze".to_string(),
                    ModelDescriptor::new("public/models/export/", "biwaze.gltf", [0.02; 3]),
                ),
            ],
            "Falcon",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_keys_resolve_to_themselves() {
        let catalog = ModelCatalog::default();
        for key in ["Falcon", "Adam Head", "BiWaze"] {
            let (resolved, descriptor) = catalog.resolve(key);
            assert_eq!(resolved, key);
            assert_eq!(Some(descriptor), catalog.get(key));
        }
    }

    #[test]
    fn unknown_key_falls_back_to_falcon() {
        let catalog = ModelCatalog::default();
        let (resolved, descriptor) = catalog.resolve("Death Star");
        assert_eq!(resolved, "Falcon");
        assert_eq!(descriptor.file_name, "scene1.gltf");
        assert_eq!(catalog.resolve(""), catalog.resolve("Falcon"));
    }

    #[test]
    fn biwaze_is_scaled_down() {
        let catalog = ModelCatalog::default();
        assert_eq!(catalog.get("BiWaze").unwrap().scale, [0.02; 3]);
    }

    #[test]
    fn keys_keep_catalog_order() {
        let catalog = ModelCatalog::default();
        let keys: Vec<_> = catalog.keys().collect();
        assert_eq!(keys, ["Falcon", "Adam Head", "BiWaze"]);
        assert_eq!(catalog.by_index(2), Some("BiWaze"));
        assert_eq!(catalog.by_index(3), None);
    }

    #[test]
    fn asset_paths_join_base_path() {
        let descriptor = ModelDescriptor::new("public/models/adamHead/", "adamHead.gltf", [1.0; 3]);
        assert_eq!(descriptor.scene_path(), "public/models/adamHead/adamHead.gltf");
        assert_eq!(
            descriptor.asset_path("textures/skin.jpg"),
            "public/models/adamHead/textures/skin.jpg"
        );
        let bare = ModelDescriptor::new("models", "a.gltf", [1.0; 3]);
        assert_eq!(bare.scene_path(), "models/a.gltf");
    }

    #[test]
    #[should_panic(expected = "at least one entry")]
    fn empty_catalog_is_rejected() {
        ModelCatalog::new(Vec::new(), "Falcon");
    }

    #[test]
    fn invalid_default_uses_first_entry() {
        let catalog = ModelCatalog::new(
            vec![("A".to_string(), ModelDescriptor::new("", "a.gltf", [1.0; 3]))],
            "B",
        );
        assert_eq!(catalog.default_key(), "A");
        assert_eq!(catalog.resolve("B").0, "A");
    }
}
