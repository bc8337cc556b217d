//! Checksums of mounted configuration data.
//!
//! Pods mounting a Secret or ConfigMap carry a checksum of the mounted
//! content so that a content change alters the pod template and rolls the
//! workload.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::k8s::ConfigMap;

/// Hasher for mounted configuration objects.
#[derive(Debug, Default, Clone)]
pub struct ConfigHasher {
    hasher: Sha256,
    objects: usize,
}

impl ConfigHasher {
    /// Creates an empty hasher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one object's data.
    ///
    /// Objects must be added in a stable order; keys are hashed in sorted
    /// order.
    pub fn add(&mut self, kind: &str, name: &str, data: &BTreeMap<String, String>) {
        self.hasher.update(kind.as_bytes());
        self.hasher.update([0u8]);
        self.hasher.update(name.as_bytes());
        self.hasher.update([0u8]);
        self.update_entries(data);
        self.objects += 1;
    }

    /// Adds a ConfigMap, covering both text and binary data.
    pub fn add_config_map(&mut self, name: &str, config_map: &ConfigMap) {
        self.add("ConfigMap", name, &config_map.data);
        if !config_map.binary_data.is_empty() {
            self.hasher.update(b"binaryData\0");
            self.update_entries(&config_map.binary_data);
        }
    }

    fn update_entries(&mut self, data: &BTreeMap<String, String>) {
        for (key, value) in data {
            self.hasher.update(key.as_bytes());
            self.hasher.update([0u8]);
            self.hasher.update(value.as_bytes());
            self.hasher.update([0u8]);
        }
    }

    /// Returns the hex digest, or `None` if nothing was added.
    #[must_use]
    pub fn finish(self) -> Option<String> {
        (self.objects > 0).then(|| hex::encode(self.hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(value: &str) -> BTreeMap<String, String> {
        let mut data = BTreeMap::new();
        data.insert(String::from("key"), value.to_string());
        data
    }

    #[test]
    fn test_hash_deterministic() {
        let mut first = ConfigHasher::new();
        first.add("Secret", "db", &data("a"));
        let mut second = ConfigHasher::new();
        second.add("Secret", "db", &data("a"));

        let first = first.finish().unwrap();
        assert_eq!(Some(first.clone()), second.finish());
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn test_content_change_changes_hash() {
        let mut first = ConfigHasher::new();
        first.add("ConfigMap", "app", &data("a"));
        let mut second = ConfigHasher::new();
        second.add("ConfigMap", "app", &data("b"));
        assert_ne!(first.finish(), second.finish());
    }

    #[test]
    fn test_binary_config_map_changes_hash() {
        use crate::k8s::ObjectMeta;

        let hash = |bytes: Vec<u8>| {
            let config_map = ConfigMap::new(ObjectMeta::new("certs", None)).with_content("ks", bytes);
            let mut hasher = ConfigHasher::new();
            hasher.add_config_map("certs", &config_map);
            hasher.finish()
        };
        assert_ne!(hash(vec![0xff, 0x01]), hash(vec![0xff, 0x02]));
        assert_eq!(hash(vec![0xff, 0x01]), hash(vec![0xff, 0x01]));
    }

    #[test]
    fn test_empty_hasher() {
        assert!(ConfigHasher::new().finish().is_none());
    }
}
