// vigil-core/src/ports/baseline.rs

use crate::domain::baseline::BaselineSnapshot;
use crate::error::VigilError;

/// Persistence of the per-table baseline snapshot.
pub trait BaselineStore: Send + Sync {
    /// `Ok(None)` when no baseline was ever written for the table.
    fn load(&self, table: &str) -> Result<Option<BaselineSnapshot>, VigilError>;

    /// Replaces the stored snapshot atomically.
    fn save(&self, snapshot: &BaselineSnapshot) -> Result<(), VigilError>;
}
