use crate::config::RohmConfig;
use crate::error::{AppError, StoreError};
use crate::info;
use crate::redb_store::RedbStore;
use crate::store::{DbIndex, Store};
use std::sync::Arc;
use std::{env, fs};

/// A store handle bound to one logical database.
///
/// Selecting another database yields a new session; the previous one keeps
/// pointing where it did. Every mapper operation takes the session explicitly.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn Store>,
    db: DbIndex,
}

impl Session {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Session { store, db: 0 }
    }

    pub fn select(&self, db: DbIndex) -> Session {
        Session { store: Arc::clone(&self.store), db }
    }

    pub fn db(&self) -> DbIndex {
        self.db
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// Clears the selected database only.
    pub fn flush_db(&self) -> Result<(), StoreError> {
        info!("Flushing database {}", self.db);
        self.store.flush_db(self.db)
    }
}

pub struct Storage;

impl Storage {
    /// Opens the database `config` points at and applies its log level.
    pub fn open(config: &RohmConfig) -> Result<Session, AppError> {
        config.apply_log_level()?;
        let store = match &config.db_path {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        fs::create_dir_all(parent)?;
                    }
                }
                info!("Opening db at {:?}", path);
                RedbStore::create(path, config.cache_size_mb)?
            }
            None => RedbStore::in_memory()?,
        };
        Ok(Session::new(Arc::new(store)))
    }

    pub fn in_memory() -> Result<Session, AppError> {
        Ok(Session::new(Arc::new(RedbStore::in_memory()?)))
    }

    /// File-backed database under the system temp dir, suffixed with a random number when `random`.
    pub fn temp(name: &str, random: bool) -> Result<Session, AppError> {
        let db_name = if random {
            format!("{}_{}", name, rand::random::<u64>())
        } else {
            name.to_string()
        };
        let dir = env::temp_dir().join("rohm");
        fs::create_dir_all(&dir)?;
        let db_path = dir.join(format!("{}.redb", db_name));
        if random && db_path.exists() {
            fs::remove_file(&db_path)?;
        }
        let config = RohmConfig { db_path: Some(db_path), ..RohmConfig::default() };
        Storage::open(&config)
    }
}
