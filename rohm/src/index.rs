//! Secondary indexes: one set per indexed value at `{Type}:{attribute}:{value}`.
//!
//! An identifier is a member of an entry iff its stored attribute value equals
//! the entry value, and an entry never outlives its last member. The previous
//! value used for reconciliation always comes from the store.

use crate::attribute::{self, Encoded};
use crate::debug;
use crate::error::AppError;
use crate::metadata::ModelInfo;
use crate::nest::KeyPath;
use crate::reference;
use crate::session::Session;

/// Moves `id` from the entry of `previous` to the entry of `new`.
pub fn reindex(session: &Session, type_name: &str, id: u64, attribute: &str, previous: Option<&str>, new: Option<&str>) -> Result<(), AppError> {
    if previous == new {
        return Ok(());
    }
    if let Some(previous) = previous {
        remove_member(session, &KeyPath::index_entry(type_name, attribute, previous), id)?;
    }
    if let Some(new) = new {
        let entry = KeyPath::index_entry(type_name, attribute, new);
        session.store().sadd(session.db(), entry.key(), &id.to_string())?;
    }
    Ok(())
}

/// Removes `id` from the entries of its current values.
pub fn deindex_all(session: &Session, type_name: &str, id: u64, current: &Encoded) -> Result<(), AppError> {
    for (attribute, value) in current {
        if let Some(value) = value {
            remove_member(session, &KeyPath::index_entry(type_name, attribute, value), id)?;
        }
    }
    Ok(())
}

fn remove_member(session: &Session, entry: &KeyPath, id: u64) -> Result<(), AppError> {
    let store = session.store();
    store.srem(session.db(), entry.key(), &id.to_string())?;
    if store.scard(session.db(), entry.key())? == 0 && store.del(session.db(), &[entry.key()])? > 0 {
        debug!("Removed empty index entry {}", entry);
    }
    Ok(())
}

/// Indexed values as currently stored for `id`, read from the primary record and reference sub-records.
pub fn stored_values<M>(session: &Session, info: &ModelInfo<M>, id: u64) -> Result<Encoded, AppError> {
    let mut values = Vec::new();
    for attr in info.scalars.iter().filter(|a| a.indexed) {
        values.push((attr.name, attribute::read_field(session, info.name, id, attr.name)?));
    }
    for attr in info.references.iter().filter(|a| a.indexed) {
        let target = reference::stored_reference(session, info.name, id, attr.name)?;
        values.push((attr.name, target.map(|t| t.to_string())));
    }
    Ok(values)
}

/// Indexed values about to be written, in the same order as [`stored_values`].
pub fn pending_values<M>(info: &ModelInfo<M>, scalars: &Encoded, references: &[(&'static str, Option<u64>)]) -> Encoded {
    let mut values = Vec::new();
    for attr in info.scalars.iter().filter(|a| a.indexed) {
        let value = scalars.iter().find(|(name, _)| *name == attr.name).and_then(|(_, v)| v.clone());
        values.push((attr.name, value));
    }
    for attr in info.references.iter().filter(|a| a.indexed) {
        let value = references.iter().find(|(name, _)| *name == attr.name).and_then(|(_, v)| v.map(|t| t.to_string()));
        values.push((attr.name, value));
    }
    values
}

/// Identifiers in the entry of `value`, ascending; empty when the entry does not exist.
pub fn members(session: &Session, type_name: &str, attribute: &str, value: &str) -> Result<Vec<u64>, AppError> {
    let entry = KeyPath::index_entry(type_name, attribute, value);
    let mut ids = session
        .store()
        .smembers(session.db(), entry.key())?
        .iter()
        .map(|raw| reference::parse_id(&entry, attribute, raw))
        .collect::<Result<Vec<u64>, AppError>>()?;
    ids.sort_unstable();
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Storage;

    fn entry_exists(session: &Session, value: &str) -> bool {
        KeyPath::index_entry("User", "name", value).exists(session).unwrap()
    }

    #[test]
    fn reindex_moves_membership_and_drops_empty_entry() {
        let session = Storage::in_memory().unwrap();
        reindex(&session, "User", 1, "name", None, Some("a")).unwrap();
        reindex(&session, "User", 2, "name", None, Some("a")).unwrap();
        assert_eq!(members(&session, "User", "name", "a").unwrap(), vec![1, 2]);

        reindex(&session, "User", 1, "name", Some("a"), Some("b")).unwrap();
        assert_eq!(members(&session, "User", "name", "a").unwrap(), vec![2]);
        assert_eq!(members(&session, "User", "name", "b").unwrap(), vec![1]);

        reindex(&session, "User", 2, "name", Some("a"), None).unwrap();
        assert!(!entry_exists(&session, "a"));
    }

    #[test]
    fn reindex_same_value_is_noop() {
        let session = Storage::in_memory().unwrap();
        reindex(&session, "User", 1, "name", None, Some("a")).unwrap();
        reindex(&session, "User", 1, "name", Some("a"), Some("a")).unwrap();
        assert_eq!(members(&session, "User", "name", "a").unwrap(), vec![1]);
    }

    #[test]
    fn deindex_all_keeps_shared_entries() {
        let session = Storage::in_memory().unwrap();
        reindex(&session, "User", 1, "name", None, Some("shared")).unwrap();
        reindex(&session, "User", 2, "name", None, Some("shared")).unwrap();
        reindex(&session, "User", 1, "room", None, Some("3A")).unwrap();

        let current = vec![("name", Some("shared".to_string())), ("room", Some("3A".to_string()))];
        deindex_all(&session, "User", 1, &current).unwrap();
        assert!(entry_exists(&session, "shared"));
        assert!(!KeyPath::index_entry("User", "room", "3A").exists(&session).unwrap());
        assert_eq!(members(&session, "User", "name", "shared").unwrap(), vec![2]);
    }

    #[test]
    fn missing_entry_has_no_members() {
        let session = Storage::in_memory().unwrap();
        assert!(members(&session, "User", "name", "nobody").unwrap().is_empty());
    }
}
