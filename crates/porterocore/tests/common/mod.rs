//! Shared test fixtures: a migrated SQLite pool on a temp file.

use porterocore::storage::{create_pool, DbPool};
use tempfile::TempDir;

/// Fresh database in a temp dir. Keep the `TempDir` alive for the test's
/// duration or the file vanishes under the pool.
pub fn test_pool() -> (TempDir, DbPool) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.sqlite");
    let pool = create_pool(path.to_str().unwrap()).unwrap();
    (dir, pool)
}
