//! Device registry over its own versioned region.
//!
//! The registry image is a flat string map. The host stores a snapshot
//! before launch; the interpreter attaches the handle, loads once, flushes
//! after writes, and refreshes only when the region version has moved since
//! it last looked.

use std::collections::BTreeMap;

use ember_common::{REGISTRY_INITIAL_SIZE, REGISTRY_MAX_SIZE};
use ember_sync::SharedRegion;

pub struct RegistrySync {
    region: SharedRegion,
    entries: BTreeMap<String, String>,
    last_version: i32,
}

impl Default for RegistrySync {
    fn default() -> Self {
        RegistrySync::new()
    }
}

impl RegistrySync {
    pub fn new() -> Self {
        RegistrySync {
            region: SharedRegion::named(REGISTRY_INITIAL_SIZE, REGISTRY_MAX_SIZE, "registry"),
            entries: BTreeMap::new(),
            last_version: 0,
        }
    }

    /// Attaches to an existing registry region and loads its snapshot.
    pub fn attach(region: SharedRegion) -> Self {
        let mut sync = RegistrySync {
            last_version: region.version(),
            entries: BTreeMap::new(),
            region,
        };
        sync.entries = sync.snapshot();
        sync
    }

    /// Handle for handing the region to another thread.
    pub fn region(&self) -> SharedRegion {
        self.region.clone()
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Stores the current image into the shared region.
    pub fn flush(&mut self) {
        self.region.store(&self.entries);
        self.last_version = self.region.version();
    }

    /// Reloads from the region when its version moved since the last look.
    /// Returns whether a reload happened.
    pub fn refresh(&mut self) -> bool {
        let version = self.region.version();
        if version == self.last_version {
            return false;
        }
        self.last_version = version;
        self.entries = self.snapshot();
        true
    }

    fn snapshot(&self) -> BTreeMap<String, String> {
        let value = self.region.load(false);
        match serde_json::from_value(value) {
            Ok(entries) => entries,
            Err(_) => BTreeMap::new(),
        }
    }
}
