//! Save, load and delete orchestration over the attribute, reference,
//! collection and index components.

use crate::attribute;
use crate::collection;
use crate::debug;
use crate::error::AppError;
use crate::id;
use crate::index;
use crate::metadata::{describe, ModelInfo};
use crate::model::{Model, TargetDelete};
use crate::nest::KeyPath;
use crate::reference;
use crate::session::Session;

/// Persists `model`, assigning it an identifier on first save, and returns the identifier.
///
/// Every attribute is encoded before the first store call, so a reference to an
/// unsaved model fails with [`AppError::MissingId`] and nothing is written.
pub fn save<M: Model>(session: &Session, model: &mut M) -> Result<u64, AppError> {
    let info = describe::<M>()?;
    let current: &M = model;
    let scalars = attribute::encode_scalars(&info, current);
    let references = info
        .references
        .iter()
        .map(|attr| (attr.encode)(current).map(|target| (attr.name, target)))
        .collect::<Result<Vec<_>, AppError>>()?;
    let collections = info
        .collections
        .iter()
        .map(|attr| (attr.encode)(current).map(|values| (attr, values)))
        .collect::<Result<Vec<_>, AppError>>()?;

    let (id, previous) = match model.id() {
        Some(id) => (id, index::stored_values(session, &info, id)?),
        None => {
            let id = id::next_id(session, info.name)?;
            model.set_id(id);
            (id, Vec::new())
        }
    };

    attribute::write_record(session, &info, id, &scalars)?;
    for (name, target) in &references {
        reference::write_reference_id(session, info.name, id, name, *target)?;
    }
    for (attr, values) in collections {
        collection::save_collection(session, info.name, id, attr.name, attr.shape, values)?;
    }

    for (attribute, new) in index::pending_values(&info, &scalars, &references) {
        let old = previous.iter().find(|(name, _)| *name == attribute).and_then(|(_, v)| v.as_deref());
        index::reindex(session, info.name, id, attribute, old, new.as_deref())?;
    }
    if info.all_ids {
        session.store().sadd(session.db(), KeyPath::all_ids(info.name).key(), &id.to_string())?;
    }
    debug!("Saved {}:{}", info.name, id);
    Ok(id)
}

/// Like [`save`], after saving every model held by a reference or a reference
/// collection the same way. Unsaved targets get their identifiers assigned in place.
pub fn save_cascade<M: Model>(session: &Session, model: &mut M) -> Result<u64, AppError> {
    let info = describe::<M>()?;
    for attr in &info.references {
        (attr.save)(model, session)?;
    }
    for children in info.collections.iter().filter_map(|attr| attr.save) {
        children(model, session)?;
    }
    save(session, model)
}

/// Loads the model stored under `id` together with its references and collections.
pub fn get<M: Model>(session: &Session, id: u64) -> Result<Option<M>, AppError> {
    let info = describe::<M>()?;
    let Some(mut model) = attribute::read_record(session, &info, id)? else {
        return Ok(None);
    };
    for attr in &info.references {
        let target = reference::stored_reference(session, info.name, id, attr.name)?;
        (attr.load)(&mut model, session, target)?;
    }
    for attr in &info.collections {
        collection::load_collection(session, info.name, id, attr, &mut model)?;
    }
    Ok(Some(model))
}

pub fn exists<M: Model>(session: &Session, id: u64) -> Result<bool, AppError> {
    let info = describe::<M>()?;
    Ok(KeyPath::record(info.name, id).exists(session)?)
}

/// Removes the model stored under `id`, its sub-records and its index memberships.
/// Returns `false` when there was nothing stored.
pub fn delete<M: Model>(session: &Session, id: u64) -> Result<bool, AppError> {
    remove::<M>(session, id, false)
}

/// Like [`delete`], then deletes every referenced model the same way.
pub fn delete_cascade<M: Model>(session: &Session, id: u64) -> Result<bool, AppError> {
    remove::<M>(session, id, true)
}

fn cascade_targets<M>(session: &Session, info: &ModelInfo<M>, id: u64) -> Result<Vec<(TargetDelete, Vec<u64>)>, AppError> {
    let mut targets = Vec::new();
    for attr in &info.references {
        if let Some(target) = reference::stored_reference(session, info.name, id, attr.name)? {
            targets.push((attr.delete, vec![target]));
        }
    }
    for attr in &info.collections {
        if let Some(delete) = attr.delete {
            targets.push((delete, collection::stored_targets(session, info.name, id, attr)?));
        }
    }
    Ok(targets)
}

fn remove<M: Model>(session: &Session, id: u64, cascade: bool) -> Result<bool, AppError> {
    let info = describe::<M>()?;
    let record = KeyPath::record(info.name, id);
    if !record.exists(session)? {
        return Ok(false);
    }
    let current = index::stored_values(session, &info, id)?;
    index::deindex_all(session, info.name, id, &current)?;

    let targets = if cascade { cascade_targets(session, &info, id)? } else { Vec::new() };

    let sub_records: Vec<KeyPath> = info.sub_records().map(|attr| KeyPath::sub_record(info.name, id, attr)).collect();
    let mut keys: Vec<&str> = vec![record.key()];
    keys.extend(sub_records.iter().map(KeyPath::key));
    session.store().del(session.db(), &keys)?;
    if info.all_ids {
        session.store().srem(session.db(), KeyPath::all_ids(info.name).key(), &id.to_string())?;
    }
    debug!("Deleted {}:{}", info.name, id);

    // the owner is gone before descending, a cycle back to it finds nothing
    for (delete, ids) in targets {
        collection::delete_targets(session, ids, delete)?;
    }
    Ok(true)
}
