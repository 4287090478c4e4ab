use crate::debug;
use crate::error::AppError;
use crate::index;
use crate::metadata::describe;
use crate::model::Model;
use crate::nest::KeyPath;
use crate::session::Session;
use std::time::Duration;

/// Schedules removal of the primary record and every sub-record of `model`.
///
/// Index entries are left alone unless `include_indexes` is set, in which case
/// each entry the model belongs to gets the same TTL. A shared entry then expires
/// for all of its members, not only for this model.
pub fn expire<M: Model>(session: &Session, model: &M, ttl: Duration, include_indexes: bool) -> Result<(), AppError> {
    let info = describe::<M>()?;
    let id = model.id().ok_or(AppError::MissingId { model: info.name, attribute: info.id_attribute })?;
    let store = session.store();

    // index values are read before the record can expire under us
    let indexed = if include_indexes { index::stored_values(session, &info, id)? } else { Vec::new() };

    store.expire(session.db(), KeyPath::record(info.name, id).key(), ttl)?;
    for attribute in info.sub_records() {
        store.expire(session.db(), KeyPath::sub_record(info.name, id, attribute).key(), ttl)?;
    }
    for (attribute, value) in &indexed {
        if let Some(value) = value {
            store.expire(session.db(), KeyPath::index_entry(info.name, attribute, value).key(), ttl)?;
        }
    }
    debug!("Expiring {}:{} in {:?} (indexes: {})", info.name, id, ttl, include_indexes);
    Ok(())
}
