//! Process-wide dispatch table cache.
//!
//! Get-or-build keyed by type identity. On a miss the table is built
//! exactly once even under concurrent misses for the same type: the map
//! lock covers only slot lookup, and per-type once-cells serialize the
//! build, so unrelated types build concurrently. Published tables are
//! immutable; readers need no lock beyond the slot lookup.
//!
//! The `no_cache` switch disables caching entirely, forcing a rebuild per
//! lookup for live-reload development. It is process-wide configuration
//! set at construction, never per request. Rust has no type unloading,
//! so entries live for the process lifetime.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use crate::table::DispatchTable;

type Slot = Arc<OnceLock<Arc<DispatchTable>>>;

pub struct TableCache {
    no_cache: bool,
    slots: Mutex<HashMap<TypeId, Slot>>,
}

impl TableCache {
    pub fn new(no_cache: bool) -> Self {
        TableCache {
            no_cache,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn no_cache(&self) -> bool {
        self.no_cache
    }

    /// Fetch the table for `key`, building it with `build` on first use.
    pub fn get_or_build(
        &self,
        key: TypeId,
        build: impl FnOnce() -> DispatchTable,
    ) -> Arc<DispatchTable> {
        if self.no_cache {
            return Arc::new(build());
        }
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            slots.entry(key).or_default().clone()
        };
        slot.get_or_init(|| Arc::new(build())).clone()
    }
}
