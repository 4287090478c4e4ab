//! [`Store`] backed by a single redb database.
//!
//! Every logical database owns its own group of tables, named `db{n}_*`.
//! Each mutating primitive runs inside one write transaction, which redb
//! serializes, so every primitive is atomic. Reads run in read transactions
//! over the last committed state. Expiration deadlines live in a table next to
//! the data: reads treat a key past its deadline as absent and the next write
//! touching it purges it.

use crate::error::StoreError;
use crate::store::{DbIndex, KeyKind, Store};
use chrono::Utc;
use redb::backends::InMemoryBackend;
use redb::{
    Database, MultimapTableDefinition, ReadTransaction, ReadableMultimapTable, ReadableTable, TableDefinition, TableError,
    WriteTransaction,
};
use std::path::Path;
use std::time::Duration;

type KindsDef<'a> = TableDefinition<'a, &'static str, u8>;
type StringsDef<'a> = TableDefinition<'a, &'static str, &'static str>;
type HashesDef<'a> = TableDefinition<'a, (&'static str, &'static str), &'static str>;
type SetsDef<'a> = MultimapTableDefinition<'a, &'static str, &'static str>;
type ListsDef<'a> = TableDefinition<'a, (&'static str, u64), &'static str>;
type TtlsDef<'a> = TableDefinition<'a, &'static str, i64>;

struct TableNames {
    kinds: String,
    strings: String,
    hashes: String,
    sets: String,
    lists: String,
    ttls: String,
}

impl TableNames {
    fn new(db: DbIndex) -> Self {
        TableNames {
            kinds: format!("db{}_kinds", db),
            strings: format!("db{}_strings", db),
            hashes: format!("db{}_hashes", db),
            sets: format!("db{}_sets", db),
            lists: format!("db{}_lists", db),
            ttls: format!("db{}_ttls", db),
        }
    }
    fn kinds(&self) -> KindsDef<'_> { TableDefinition::new(&self.kinds) }
    fn strings(&self) -> StringsDef<'_> { TableDefinition::new(&self.strings) }
    fn hashes(&self) -> HashesDef<'_> { TableDefinition::new(&self.hashes) }
    fn sets(&self) -> SetsDef<'_> { MultimapTableDefinition::new(&self.sets) }
    fn lists(&self) -> ListsDef<'_> { TableDefinition::new(&self.lists) }
    fn ttls(&self) -> TtlsDef<'_> { TableDefinition::new(&self.ttls) }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Deadline `ttl` from now, clamped to the largest representable instant.
fn deadline_after(ttl: Duration) -> i64 {
    now_millis().saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX))
}

fn is_past(deadline: Option<i64>) -> bool {
    matches!(deadline, Some(deadline) if deadline <= now_millis())
}

/// A table that was never written reads as empty.
fn optional_table<T>(opened: Result<T, TableError>) -> Result<Option<T>, StoreError> {
    match opened {
        Ok(table) => Ok(Some(table)),
        Err(TableError::TableDoesNotExist(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    pub fn create(path: impl AsRef<Path>, cache_size_mb: usize) -> Result<Self, StoreError> {
        let db = Database::builder().set_cache_size(cache_size_mb * 1024 * 1024).create(path)?;
        Ok(RedbStore { db })
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        let db = Database::builder().create_with_backend(InMemoryBackend::new())?;
        Ok(RedbStore { db })
    }

    fn write<T>(&self, db: DbIndex, op: impl FnOnce(&WriteTransaction, &TableNames) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let tx = self.db.begin_write()?;
        let names = TableNames::new(db);
        let result = op(&tx, &names)?;
        tx.commit()?;
        Ok(result)
    }

    fn read<T>(&self, db: DbIndex, op: impl FnOnce(&ReadTransaction, &TableNames) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let tx = self.db.begin_read()?;
        let names = TableNames::new(db);
        op(&tx, &names)
    }
}

/// Kind of a key that is still alive, without purging anything.
fn read_kind(tx: &ReadTransaction, names: &TableNames, key: &str) -> Result<Option<KeyKind>, StoreError> {
    let Some(kinds) = optional_table(tx.open_table(names.kinds()))? else { return Ok(None) };
    let Some(kind) = kinds.get(key)?.and_then(|guard| KeyKind::from_u8(guard.value())) else { return Ok(None) };
    let deadline = match optional_table(tx.open_table(names.ttls()))? {
        Some(ttls) => ttls.get(key)?.map(|guard| guard.value()),
        None => None,
    };
    Ok(if is_past(deadline) { None } else { Some(kind) })
}

/// Ok(true) when the key holds `expected`, Ok(false) when absent.
fn expect_kind(found: Option<KeyKind>, key: &str, expected: KeyKind) -> Result<bool, StoreError> {
    match found {
        None => Ok(false),
        Some(kind) if kind == expected => Ok(true),
        Some(_) => Err(StoreError::WrongType { key: key.to_string() }),
    }
}

/// Kind of a key that is still alive, purging it first if its deadline passed.
fn live_kind(tx: &WriteTransaction, names: &TableNames, key: &str) -> Result<Option<KeyKind>, StoreError> {
    let kind = {
        let kinds = tx.open_table(names.kinds())?;
        let raw = kinds.get(key)?.map(|guard| guard.value());
        raw.and_then(KeyKind::from_u8)
    };
    let Some(kind) = kind else { return Ok(None) };
    let deadline = {
        let ttls = tx.open_table(names.ttls())?;
        let deadline = ttls.get(key)?.map(|guard| guard.value());
        deadline
    };
    if is_past(deadline) {
        remove_key(tx, names, key, kind)?;
        return Ok(None);
    }
    Ok(Some(kind))
}

fn check_kind(tx: &WriteTransaction, names: &TableNames, key: &str, expected: KeyKind) -> Result<bool, StoreError> {
    expect_kind(live_kind(tx, names, key)?, key, expected)
}

fn mark_kind(tx: &WriteTransaction, names: &TableNames, key: &str, kind: KeyKind) -> Result<(), StoreError> {
    let mut kinds = tx.open_table(names.kinds())?;
    kinds.insert(key, kind as u8)?;
    Ok(())
}

fn hash_fields(hashes: &impl ReadableTable<(&'static str, &'static str), &'static str>, key: &str) -> Result<Vec<(String, String)>, StoreError> {
    let mut fields = Vec::new();
    for entry in hashes.range((key, "")..)? {
        let (k, v) = entry?;
        let (owner, field) = k.value();
        if owner != key {
            break;
        }
        fields.push((field.to_string(), v.value().to_string()));
    }
    Ok(fields)
}

fn list_values(lists: &impl ReadableTable<(&'static str, u64), &'static str>, key: &str) -> Result<Vec<(u64, String)>, StoreError> {
    let mut values = Vec::new();
    for entry in lists.range((key, 0u64)..=(key, u64::MAX))? {
        let (k, v) = entry?;
        values.push((k.value().1, v.value().to_string()));
    }
    Ok(values)
}

fn set_members(sets: &impl ReadableMultimapTable<&'static str, &'static str>, key: &str) -> Result<Vec<String>, StoreError> {
    let mut members = Vec::new();
    for member in sets.get(key)? {
        members.push(member?.value().to_string());
    }
    Ok(members)
}

fn remove_key(tx: &WriteTransaction, names: &TableNames, key: &str, kind: KeyKind) -> Result<(), StoreError> {
    match kind {
        KeyKind::String => {
            let mut strings = tx.open_table(names.strings())?;
            strings.remove(key)?;
        }
        KeyKind::Hash => {
            let mut hashes = tx.open_table(names.hashes())?;
            for (field, _) in hash_fields(&hashes, key)? {
                hashes.remove((key, field.as_str()))?;
            }
        }
        KeyKind::Set => {
            let mut sets = tx.open_multimap_table(names.sets())?;
            sets.remove_all(key)?;
        }
        KeyKind::List => {
            let mut lists = tx.open_table(names.lists())?;
            for (idx, _) in list_values(&lists, key)? {
                lists.remove((key, idx))?;
            }
        }
    }
    let mut kinds = tx.open_table(names.kinds())?;
    kinds.remove(key)?;
    let mut ttls = tx.open_table(names.ttls())?;
    ttls.remove(key)?;
    Ok(())
}

fn push_values(tx: &WriteTransaction, names: &TableNames, key: &str, values: &[String]) -> Result<usize, StoreError> {
    let mut lists = tx.open_table(names.lists())?;
    let next = match lists.range((key, 0u64)..=(key, u64::MAX))?.next_back() {
        Some(entry) => entry?.0.value().1 + 1,
        None => 0,
    };
    for (offset, value) in values.iter().enumerate() {
        lists.insert((key, next + offset as u64), value.as_str())?;
    }
    Ok((next as usize) + values.len())
}

impl Store for RedbStore {
    fn kind(&self, db: DbIndex, key: &str) -> Result<Option<KeyKind>, StoreError> {
        self.read(db, |tx, names| read_kind(tx, names, key))
    }

    fn hset(&self, db: DbIndex, key: &str, fields: &[(&str, String)]) -> Result<(), StoreError> {
        self.write(db, |tx, names| {
            if fields.is_empty() {
                return Ok(());
            }
            if !check_kind(tx, names, key, KeyKind::Hash)? {
                mark_kind(tx, names, key, KeyKind::Hash)?;
            }
            let mut hashes = tx.open_table(names.hashes())?;
            for (field, value) in fields {
                hashes.insert((key, *field), value.as_str())?;
            }
            Ok(())
        })
    }

    fn hget(&self, db: DbIndex, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        self.read(db, |tx, names| {
            if !expect_kind(read_kind(tx, names, key)?, key, KeyKind::Hash)? {
                return Ok(None);
            }
            let Some(hashes) = optional_table(tx.open_table(names.hashes()))? else { return Ok(None) };
            let value = hashes.get((key, field))?.map(|guard| guard.value().to_string());
            Ok(value)
        })
    }

    fn hgetall(&self, db: DbIndex, key: &str) -> Result<Vec<(String, String)>, StoreError> {
        self.read(db, |tx, names| {
            if !expect_kind(read_kind(tx, names, key)?, key, KeyKind::Hash)? {
                return Ok(Vec::new());
            }
            match optional_table(tx.open_table(names.hashes()))? {
                Some(hashes) => hash_fields(&hashes, key),
                None => Ok(Vec::new()),
            }
        })
    }

    fn hdel(&self, db: DbIndex, key: &str, fields: &[&str]) -> Result<usize, StoreError> {
        self.write(db, |tx, names| {
            if !check_kind(tx, names, key, KeyKind::Hash)? {
                return Ok(0);
            }
            let mut removed = 0;
            {
                let mut hashes = tx.open_table(names.hashes())?;
                for field in fields {
                    if hashes.remove((key, *field))?.is_some() {
                        removed += 1;
                    }
                }
            }
            let emptied = hash_fields(&tx.open_table(names.hashes())?, key)?.is_empty();
            if emptied {
                remove_key(tx, names, key, KeyKind::Hash)?;
            }
            Ok(removed)
        })
    }

    fn get(&self, db: DbIndex, key: &str) -> Result<Option<String>, StoreError> {
        self.read(db, |tx, names| {
            if !expect_kind(read_kind(tx, names, key)?, key, KeyKind::String)? {
                return Ok(None);
            }
            let Some(strings) = optional_table(tx.open_table(names.strings()))? else { return Ok(None) };
            let value = strings.get(key)?.map(|guard| guard.value().to_string());
            Ok(value)
        })
    }

    fn set(&self, db: DbIndex, key: &str, value: &str) -> Result<(), StoreError> {
        self.write(db, |tx, names| {
            if let Some(kind) = live_kind(tx, names, key)? {
                remove_key(tx, names, key, kind)?;
            }
            mark_kind(tx, names, key, KeyKind::String)?;
            let mut strings = tx.open_table(names.strings())?;
            strings.insert(key, value)?;
            Ok(())
        })
    }

    fn del(&self, db: DbIndex, keys: &[&str]) -> Result<usize, StoreError> {
        self.write(db, |tx, names| {
            let mut removed = 0;
            for key in keys {
                if let Some(kind) = live_kind(tx, names, key)? {
                    remove_key(tx, names, key, kind)?;
                    removed += 1;
                }
            }
            Ok(removed)
        })
    }

    fn sadd(&self, db: DbIndex, key: &str, member: &str) -> Result<bool, StoreError> {
        self.write(db, |tx, names| {
            if !check_kind(tx, names, key, KeyKind::Set)? {
                mark_kind(tx, names, key, KeyKind::Set)?;
            }
            let mut sets = tx.open_multimap_table(names.sets())?;
            let present = sets.insert(key, member)?;
            Ok(!present)
        })
    }

    fn srem(&self, db: DbIndex, key: &str, member: &str) -> Result<bool, StoreError> {
        self.write(db, |tx, names| {
            if !check_kind(tx, names, key, KeyKind::Set)? {
                return Ok(false);
            }
            let removed = {
                let mut sets = tx.open_multimap_table(names.sets())?;
                sets.remove(key, member)?
            };
            let emptied = set_members(&tx.open_multimap_table(names.sets())?, key)?.is_empty();
            if emptied {
                remove_key(tx, names, key, KeyKind::Set)?;
            }
            Ok(removed)
        })
    }

    fn smembers(&self, db: DbIndex, key: &str) -> Result<Vec<String>, StoreError> {
        self.read(db, |tx, names| {
            if !expect_kind(read_kind(tx, names, key)?, key, KeyKind::Set)? {
                return Ok(Vec::new());
            }
            match optional_table(tx.open_multimap_table(names.sets()))? {
                Some(sets) => set_members(&sets, key),
                None => Ok(Vec::new()),
            }
        })
    }

    fn scard(&self, db: DbIndex, key: &str) -> Result<usize, StoreError> {
        Ok(self.smembers(db, key)?.len())
    }

    fn rpush(&self, db: DbIndex, key: &str, values: &[String]) -> Result<usize, StoreError> {
        self.write(db, |tx, names| {
            if !check_kind(tx, names, key, KeyKind::List)? {
                if values.is_empty() {
                    return Ok(0);
                }
                mark_kind(tx, names, key, KeyKind::List)?;
            }
            push_values(tx, names, key, values)
        })
    }

    fn lrange(&self, db: DbIndex, key: &str) -> Result<Vec<String>, StoreError> {
        self.read(db, |tx, names| {
            if !expect_kind(read_kind(tx, names, key)?, key, KeyKind::List)? {
                return Ok(Vec::new());
            }
            let Some(lists) = optional_table(tx.open_table(names.lists()))? else { return Ok(Vec::new()) };
            Ok(list_values(&lists, key)?.into_iter().map(|(_, value)| value).collect())
        })
    }

    fn replace_list(&self, db: DbIndex, key: &str, values: &[String]) -> Result<(), StoreError> {
        self.write(db, |tx, names| {
            if let Some(kind) = live_kind(tx, names, key)? {
                remove_key(tx, names, key, kind)?;
            }
            if !values.is_empty() {
                mark_kind(tx, names, key, KeyKind::List)?;
                push_values(tx, names, key, values)?;
            }
            Ok(())
        })
    }

    fn replace_set(&self, db: DbIndex, key: &str, members: &[String]) -> Result<(), StoreError> {
        self.write(db, |tx, names| {
            if let Some(kind) = live_kind(tx, names, key)? {
                remove_key(tx, names, key, kind)?;
            }
            if !members.is_empty() {
                mark_kind(tx, names, key, KeyKind::Set)?;
                let mut sets = tx.open_multimap_table(names.sets())?;
                for member in members {
                    sets.insert(key, member.as_str())?;
                }
            }
            Ok(())
        })
    }

    fn incr(&self, db: DbIndex, key: &str) -> Result<i64, StoreError> {
        self.write(db, |tx, names| {
            let exists = check_kind(tx, names, key, KeyKind::String)?;
            let mut strings = tx.open_table(names.strings())?;
            let current = match strings.get(key)?.map(|guard| guard.value().to_string()) {
                Some(raw) => raw
                    .parse::<i64>()
                    .map_err(|_| StoreError::Backend(format!("value at '{}' is not an integer", key)))?,
                None => 0,
            };
            let next = current + 1;
            strings.insert(key, next.to_string().as_str())?;
            drop(strings);
            if !exists {
                mark_kind(tx, names, key, KeyKind::String)?;
            }
            Ok(next)
        })
    }

    fn expire(&self, db: DbIndex, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        self.write(db, |tx, names| {
            if live_kind(tx, names, key)?.is_none() {
                return Ok(false);
            }
            let mut ttls = tx.open_table(names.ttls())?;
            ttls.insert(key, deadline_after(ttl))?;
            Ok(true)
        })
    }

    fn flush_db(&self, db: DbIndex) -> Result<(), StoreError> {
        self.write(db, |tx, names| {
            tx.delete_table(names.kinds())?;
            tx.delete_table(names.strings())?;
            tx.delete_table(names.hashes())?;
            tx.delete_multimap_table(names.sets())?;
            tx.delete_table(names.lists())?;
            tx.delete_table(names.ttls())?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> RedbStore {
        RedbStore::in_memory().expect("in-memory store")
    }

    #[test]
    fn hash_fields_roundtrip_and_vanish_when_empty() {
        let store = store();
        store.hset(0, "User:1", &[("name", "foo".to_string()), ("age", "3".to_string())]).unwrap();
        assert_eq!(store.hget(0, "User:1", "name").unwrap().as_deref(), Some("foo"));
        let mut all = store.hgetall(0, "User:1").unwrap();
        all.sort();
        assert_eq!(all, vec![("age".to_string(), "3".to_string()), ("name".to_string(), "foo".to_string())]);

        assert_eq!(store.hdel(0, "User:1", &["name", "age", "missing"]).unwrap(), 2);
        assert!(!store.exists(0, "User:1").unwrap());
    }

    #[test]
    fn hash_prefix_does_not_leak_between_keys() {
        let store = store();
        store.hset(0, "User:1", &[("name", "a".to_string())]).unwrap();
        store.hset(0, "User:10", &[("name", "b".to_string())]).unwrap();
        assert_eq!(store.hgetall(0, "User:1").unwrap(), vec![("name".to_string(), "a".to_string())]);
        store.del(0, &["User:1"]).unwrap();
        assert_eq!(store.hget(0, "User:10", "name").unwrap().as_deref(), Some("b"));
    }

    #[test]
    fn sets_are_removed_with_their_last_member() {
        let store = store();
        assert!(store.sadd(0, "User:name:foo", "1").unwrap());
        assert!(!store.sadd(0, "User:name:foo", "1").unwrap());
        assert!(store.sadd(0, "User:name:foo", "2").unwrap());
        assert_eq!(store.smembers(0, "User:name:foo").unwrap(), vec!["1", "2"]);
        assert!(store.srem(0, "User:name:foo", "1").unwrap());
        assert!(store.exists(0, "User:name:foo").unwrap());
        assert!(store.srem(0, "User:name:foo", "2").unwrap());
        assert!(!store.exists(0, "User:name:foo").unwrap());
    }

    #[test]
    fn lists_keep_push_order_and_replace() {
        let store = store();
        store.rpush(0, "l", &["b".to_string(), "a".to_string()]).unwrap();
        assert_eq!(store.rpush(0, "l", &["c".to_string()]).unwrap(), 3);
        assert_eq!(store.lrange(0, "l").unwrap(), vec!["b", "a", "c"]);
        store.replace_list(0, "l", &["z".to_string()]).unwrap();
        assert_eq!(store.lrange(0, "l").unwrap(), vec!["z"]);
        store.replace_list(0, "l", &[]).unwrap();
        assert!(!store.exists(0, "l").unwrap());
    }

    #[test]
    fn incr_counts_from_one() {
        let store = store();
        assert_eq!(store.incr(0, "User:id").unwrap(), 1);
        assert_eq!(store.incr(0, "User:id").unwrap(), 2);
        assert_eq!(store.get(0, "User:id").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn wrong_kind_is_rejected() {
        let store = store();
        store.set(0, "User:1", "plain").unwrap();
        assert!(matches!(store.hgetall(0, "User:1"), Err(StoreError::WrongType { .. })));
        assert!(matches!(store.sadd(0, "User:1", "x"), Err(StoreError::WrongType { .. })));
    }

    #[test]
    fn expired_keys_read_as_absent_and_are_purged_on_write() {
        let store = store();
        store.hset(0, "k", &[("old", "v".to_string())]).unwrap();
        assert!(store.expire(0, "k", Duration::from_millis(0)).unwrap());
        assert_eq!(store.hget(0, "k", "old").unwrap(), None);
        assert!(!store.exists(0, "k").unwrap());

        store.hset(0, "k", &[("new", "w".to_string())]).unwrap();
        assert_eq!(store.hgetall(0, "k").unwrap(), vec![("new".to_string(), "w".to_string())]);
        assert!(!store.expire(0, "missing", Duration::from_secs(1)).unwrap());
    }

    #[test]
    fn huge_ttl_saturates_instead_of_expiring() {
        let store = store();
        store.set(0, "a", "v").unwrap();
        store.set(0, "b", "v").unwrap();
        assert!(store.expire(0, "a", Duration::MAX).unwrap());
        assert!(store.expire(0, "b", Duration::from_secs(10_000_000_000_000_000)).unwrap());
        assert_eq!(store.get(0, "a").unwrap().as_deref(), Some("v"));
        assert_eq!(store.get(0, "b").unwrap().as_deref(), Some("v"));
        assert_eq!(deadline_after(Duration::MAX), i64::MAX);
    }

    #[test]
    fn reads_on_a_fresh_database_find_nothing() {
        let store = store();
        assert_eq!(store.kind(3, "k").unwrap(), None);
        assert!(store.hgetall(3, "k").unwrap().is_empty());
        assert!(store.smembers(3, "k").unwrap().is_empty());
        assert!(store.lrange(3, "k").unwrap().is_empty());
        assert_eq!(store.get(3, "k").unwrap(), None);
    }

    #[test]
    fn databases_are_isolated_and_flushed_separately() {
        let store = store();
        store.set(0, "k", "zero").unwrap();
        store.set(7, "k", "seven").unwrap();
        store.flush_db(7).unwrap();
        assert_eq!(store.get(7, "k").unwrap(), None);
        assert_eq!(store.get(0, "k").unwrap().as_deref(), Some("zero"));
    }
}
