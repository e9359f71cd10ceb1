use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use instruments_core::db::{self, DbPool};

static NEXT_DB: AtomicU64 = AtomicU64::new(0);

/// Pool over a fresh throwaway database file for one test.
pub fn test_pool() -> Arc<DbPool> {
    let path = std::env::temp_dir().join(format!(
        "instruments_core_test_{}_{}.db",
        std::process::id(),
        NEXT_DB.fetch_add(1, Ordering::SeqCst)
    ));
    let _ = std::fs::remove_file(&path);
    db::create_pool(path.to_str().expect("temp path is valid utf-8")).expect("create pool")
}
