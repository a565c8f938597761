// vigil-core/src/infrastructure/baseline/json.rs

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

use crate::domain::baseline::BaselineSnapshot;
use crate::domain::error::DomainError;
use crate::error::VigilError;
use crate::infrastructure::fs::write_json_atomic;
use crate::ports::baseline::BaselineStore;

pub const FORMAT_VERSION: u32 = 1;
pub const DEFAULT_BASELINE_DIR: &str = ".vigil/baselines";

/// On-disk record: the snapshot plus a format version.
#[derive(Debug, Serialize, Deserialize)]
struct BaselineRecord {
    format_version: u32,
    #[serde(flatten)]
    snapshot: BaselineSnapshot,
}

/// One pretty-printed JSON file per table, replaced atomically on save.
#[derive(Debug, Clone)]
pub struct JsonBaselineStore {
    dir: PathBuf,
}

impl JsonBaselineStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `analytics.orders` -> `<dir>/analytics%2Eorders.json`
    ///
    /// Every byte outside `[A-Za-z0-9_-]` is percent-escaped, so distinct
    /// table names always map to distinct files.
    pub fn path_for(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{}.json", escape_file_stem(table)))
    }

    fn read(&self, table: &str, path: &Path) -> Result<BaselineSnapshot, VigilError> {
        let corrupt = |reason: String| DomainError::CorruptBaseline {
            table: table.to_string(),
            reason,
        };

        let content = fs::read_to_string(path)?;
        let record: BaselineRecord =
            serde_json::from_str(&content).map_err(|e| corrupt(e.to_string()))?;

        if record.format_version > FORMAT_VERSION {
            return Err(corrupt(format!(
                "unsupported format version {}",
                record.format_version
            ))
            .into());
        }
        if record.snapshot.table != table {
            return Err(corrupt(format!(
                "file belongs to table '{}'",
                record.snapshot.table
            ))
            .into());
        }
        Ok(record.snapshot)
    }

    /// Every readable baseline in the directory, sorted by table.
    pub fn list(&self) -> Result<Vec<BaselineSnapshot>, VigilError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut snapshots = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let parsed = fs::read_to_string(&path)
                .map_err(VigilError::from)
                .and_then(|c| {
                    serde_json::from_str::<BaselineRecord>(&c)
                        .map_err(|e| VigilError::InternalError(e.to_string()))
                });
            match parsed {
                Ok(record) => snapshots.push(record.snapshot),
                Err(e) => warn!(path = ?path, "⚠️ Skipping unreadable baseline: {}", e),
            }
        }
        snapshots.sort_by(|a, b| a.table.cmp(&b.table));
        Ok(snapshots)
    }

    /// Removes a table's baseline; `false` when there was none.
    pub fn delete(&self, table: &str) -> Result<bool, VigilError> {
        let path = self.path_for(table);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn escape_file_stem(table: &str) -> String {
    let mut stem = String::with_capacity(table.len());
    for byte in table.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("%{byte:02X}"));
        }
    }
    stem
}

impl BaselineStore for JsonBaselineStore {
    #[instrument(skip(self))]
    fn load(&self, table: &str) -> Result<Option<BaselineSnapshot>, VigilError> {
        let path = self.path_for(table);
        if !path.exists() {
            debug!("No baseline yet");
            return Ok(None);
        }
        self.read(table, &path).map(Some)
    }

    #[instrument(skip(self, snapshot), fields(table = %snapshot.table))]
    fn save(&self, snapshot: &BaselineSnapshot) -> Result<(), VigilError> {
        let record = BaselineRecord {
            format_version: FORMAT_VERSION,
            snapshot: snapshot.clone(),
        };
        write_json_atomic(self.path_for(&snapshot.table), &record)?;
        debug!(run_count = snapshot.run_count, "💾 Baseline written");
        Ok(())
    }
}
