//! # GroupRegistry
//!
//! Process-wide name → `Group` directory. Writes happen at startup when
//! groups are declared; reads happen on every request that needs to resolve
//! a group by name (notably the HTTP peer collaborator). A readers-writer
//! lock reflects that read/write skew.

use std::sync::{Arc, OnceLock};

use ahash::RandomState;
use parking_lot::RwLock;

use gcache_common::{GcacheError, GcacheResult};

use crate::group::{Getter, Group};

/// A name → `Group` directory.
pub struct GroupRegistry {
    groups: RwLock<hashbrown::HashMap<String, Arc<Group>, RandomState>>,
}

impl Default for GroupRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupRegistry {
    pub fn new() -> Self {
        GroupRegistry {
            groups: RwLock::new(hashbrown::HashMap::default()),
        }
    }

    /// Constructs a group and registers it under `name`.
    ///
    /// Rejects a name already in use rather than silently replacing the
    /// existing group.
    pub fn new_group(
        &self,
        name: impl Into<String>,
        capacity_bytes: usize,
        getter: Arc<dyn Getter>,
    ) -> GcacheResult<Arc<Group>> {
        let name = name.into();
        let mut groups = self.groups.write();
        if groups.contains_key(&name) {
            return Err(GcacheError::GroupAlreadyRegistered(name));
        }
        let group = Arc::new(Group::new(name.clone(), capacity_bytes, getter));
        groups.insert(name, group.clone());
        Ok(group)
    }

    /// Looks up a previously registered group by name.
    pub fn get_group(&self, name: &str) -> Option<Arc<Group>> {
        self.groups.read().get(name).cloned()
    }
}

/// The process-wide registry most callers should use, mirroring
/// groupcache's package-level `groups` directory.
static DEFAULT_REGISTRY: OnceLock<GroupRegistry> = OnceLock::new();

fn default_registry() -> &'static GroupRegistry {
    DEFAULT_REGISTRY.get_or_init(GroupRegistry::new)
}

/// Constructs and registers a group in the process-wide default registry.
pub fn new_group(
    name: impl Into<String>,
    capacity_bytes: usize,
    getter: Arc<dyn Getter>,
) -> GcacheResult<Arc<Group>> {
    default_registry().new_group(name, capacity_bytes, getter)
}

/// Looks up a group in the process-wide default registry.
pub fn get_group(name: &str) -> Option<Arc<Group>> {
    default_registry().get_group(name)
}
