// vigil-core/src/infrastructure/baseline/memory.rs

use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::baseline::BaselineSnapshot;
use crate::error::VigilError;
use crate::ports::baseline::BaselineStore;

/// Process-local store, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryBaselineStore {
    snapshots: Mutex<HashMap<String, BaselineSnapshot>>,
}

impl MemoryBaselineStore {
    pub fn with_snapshots<I>(snapshots: I) -> Self
    where
        I: IntoIterator<Item = BaselineSnapshot>,
    {
        Self {
            snapshots: Mutex::new(
                snapshots
                    .into_iter()
                    .map(|s| (s.table.clone(), s))
                    .collect(),
            ),
        }
    }

    fn guard(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, BaselineSnapshot>>, VigilError> {
        self.snapshots
            .lock()
            .map_err(|_| VigilError::InternalError("baseline store lock poisoned".into()))
    }

    pub fn is_empty(&self) -> bool {
        self.guard().map(|s| s.is_empty()).unwrap_or(true)
    }

    pub fn len(&self) -> usize {
        self.guard().map(|s| s.len()).unwrap_or(0)
    }
}

impl BaselineStore for MemoryBaselineStore {
    fn load(&self, table: &str) -> Result<Option<BaselineSnapshot>, VigilError> {
        Ok(self.guard()?.get(table).cloned())
    }

    fn save(&self, snapshot: &BaselineSnapshot) -> Result<(), VigilError> {
        self.guard()?
            .insert(snapshot.table.clone(), snapshot.clone());
        Ok(())
    }
}
