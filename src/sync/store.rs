//! Persistence seam for authoritative profiles

use std::sync::{Mutex, PoisonError};

use ahash::AHashMap;

use crate::core::types::ProfileId;
use crate::progression::profile::ProfileSnapshot;

/// Storage collaborator that keeps profile snapshots between sessions
pub trait ProfileStore: Send + Sync {
    fn load(&self, id: &ProfileId) -> Option<ProfileSnapshot>;
    fn save(&self, snapshot: &ProfileSnapshot);
}

/// In-process store, used by default and in tests
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    snapshots: Mutex<AHashMap<ProfileId, ProfileSnapshot>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProfileStore for MemoryProfileStore {
    fn load(&self, id: &ProfileId) -> Option<ProfileSnapshot> {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    fn save(&self, snapshot: &ProfileSnapshot) {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(snapshot.id, snapshot.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PlayerId;
    use crate::progression::profile::ProgressionProfile;

    #[test]
    fn test_save_then_load() {
        let store = MemoryProfileStore::new();
        let id: ProfileId = PlayerId::new().into();
        assert!(store.load(&id).is_none());

        let snapshot = ProgressionProfile::new(id).snapshot();
        store.save(&snapshot);
        assert_eq!(store.load(&id), Some(snapshot));
        assert_eq!(store.len(), 1);
    }
}
