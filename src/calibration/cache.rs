//! File-keyed calibration table cache
//!
//! The table of the selected calibration file is built once and shared by
//! every analysis. Selecting a different file rebuilds it; readers holding
//! the previous table keep a consistent copy through their `Arc`.

use super::table::CalibrationTable;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug)]
struct CachedTable {
    path: PathBuf,
    table: Arc<CalibrationTable>,
}

/// Thread-safe holder of the current calibration table
#[derive(Debug, Default)]
pub struct CalibrationCache {
    current: RwLock<Option<CachedTable>>,
}

impl CalibrationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table built from `path`, loading it if another file (or none) is cached
    ///
    /// A file that cannot be read yields an empty table, which is cached as
    /// well so that the failure is reported once.
    pub fn table_for(&self, path: &Path) -> Arc<CalibrationTable> {
        if let Some(cached) = self.current.read().as_ref() {
            if cached.path == path {
                return Arc::clone(&cached.table);
            }
        }

        let table = match CalibrationTable::from_csv_path(path) {
            Ok(table) => table,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "calibration file unusable, using empty table");
                CalibrationTable::default()
            }
        };
        let table = Arc::new(table);

        let mut current = self.current.write();
        // Another caller may have loaded the same file meanwhile
        if let Some(cached) = current.as_ref() {
            if cached.path == path {
                return Arc::clone(&cached.table);
            }
        }
        debug!(path = %path.display(), "calibration cache replaced");
        *current = Some(CachedTable {
            path: path.to_path_buf(),
            table: Arc::clone(&table),
        });
        table
    }

    /// Path of the cached table, if any
    pub fn path(&self) -> Option<PathBuf> {
        self.current.read().as_ref().map(|c| c.path.clone())
    }

    /// Drop the cached table so the next lookup reloads the file
    pub fn invalidate(&self) {
        *self.current.write() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "ring_reflectivity_{}_{}.csv",
            name,
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_same_path_reuses_table() {
        let path = write_temp("cache_reuse", "650,650.2,10,1,5,2,s\n");
        let cache = CalibrationCache::new();
        let first = cache.table_for(&path);
        let second = cache.table_for(&path);
        std::fs::remove_file(&path).ok();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.rows().count(), 1);
        assert_eq!(cache.path(), Some(path));
    }

    #[test]
    fn test_new_path_rebuilds_table() {
        let a = write_temp("cache_a", "650,650.2\n");
        let b = write_temp("cache_b", "700,700.1\n701,\n");
        let cache = CalibrationCache::new();
        let first = cache.table_for(&a);
        let second = cache.table_for(&b);
        std::fs::remove_file(&a).ok();
        std::fs::remove_file(&b).ok();

        assert_eq!(first.rows().count(), 1);
        assert_eq!(second.rows().count(), 2);
        assert_eq!(cache.path(), Some(b));
    }

    #[test]
    fn test_unreadable_file_gives_empty_table() {
        let cache = CalibrationCache::new();
        let table = cache.table_for(Path::new("/nonexistent/calibration.csv"));
        assert!(table.is_empty());

        cache.invalidate();
        assert!(cache.path().is_none());
    }
}
