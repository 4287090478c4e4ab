//! The primitives rohm needs from a key-value store.
//!
//! Every call names the logical database it targets, so a store handle can be
//! shared between sessions that selected different databases. Each primitive is
//! expected to be atomic on its own; nothing here spans several calls.

use crate::error::StoreError;
use std::time::Duration;

pub type DbIndex = u32;

/// Kind of value a key currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum KeyKind {
    String = 0,
    Hash = 1,
    Set = 2,
    List = 3,
}

impl KeyKind {
    pub fn from_u8(raw: u8) -> Option<KeyKind> {
        match raw {
            0 => Some(KeyKind::String),
            1 => Some(KeyKind::Hash),
            2 => Some(KeyKind::Set),
            3 => Some(KeyKind::List),
            _ => None,
        }
    }
}

pub trait Store: Send + Sync {
    fn kind(&self, db: DbIndex, key: &str) -> Result<Option<KeyKind>, StoreError>;

    fn hset(&self, db: DbIndex, key: &str, fields: &[(&str, String)]) -> Result<(), StoreError>;
    fn hget(&self, db: DbIndex, key: &str, field: &str) -> Result<Option<String>, StoreError>;
    fn hgetall(&self, db: DbIndex, key: &str) -> Result<Vec<(String, String)>, StoreError>;
    /// Returns the number of fields removed; a hash left without fields is removed.
    fn hdel(&self, db: DbIndex, key: &str, fields: &[&str]) -> Result<usize, StoreError>;

    fn get(&self, db: DbIndex, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, db: DbIndex, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes keys of any kind, returns how many existed.
    fn del(&self, db: DbIndex, keys: &[&str]) -> Result<usize, StoreError>;
    fn exists(&self, db: DbIndex, key: &str) -> Result<bool, StoreError> {
        Ok(self.kind(db, key)?.is_some())
    }

    /// Returns true when the member was not present yet.
    fn sadd(&self, db: DbIndex, key: &str, member: &str) -> Result<bool, StoreError>;
    /// Returns true when the member was present; a set left empty is removed.
    fn srem(&self, db: DbIndex, key: &str, member: &str) -> Result<bool, StoreError>;
    fn smembers(&self, db: DbIndex, key: &str) -> Result<Vec<String>, StoreError>;
    fn scard(&self, db: DbIndex, key: &str) -> Result<usize, StoreError>;

    /// Returns the list length after the push.
    fn rpush(&self, db: DbIndex, key: &str, values: &[String]) -> Result<usize, StoreError>;
    fn lrange(&self, db: DbIndex, key: &str) -> Result<Vec<String>, StoreError>;

    /// Replaces a list with `values`, removing the key when `values` is empty.
    fn replace_list(&self, db: DbIndex, key: &str, values: &[String]) -> Result<(), StoreError> {
        self.del(db, &[key])?;
        if !values.is_empty() {
            self.rpush(db, key, values)?;
        }
        Ok(())
    }

    /// Replaces a set with `members`, removing the key when `members` is empty.
    fn replace_set(&self, db: DbIndex, key: &str, members: &[String]) -> Result<(), StoreError> {
        self.del(db, &[key])?;
        for member in members {
            self.sadd(db, key, member)?;
        }
        Ok(())
    }

    fn incr(&self, db: DbIndex, key: &str) -> Result<i64, StoreError>;

    /// Schedules removal of `key`; returns false when the key does not exist.
    fn expire(&self, db: DbIndex, key: &str, ttl: Duration) -> Result<bool, StoreError>;

    fn flush_db(&self, db: DbIndex) -> Result<(), StoreError>;
}
