use crate::codec::ToField;
use crate::debug;
use crate::error::AppError;
use crate::index;
use crate::mapper;
use crate::metadata::describe;
use crate::model::Model;
use crate::nest::KeyPath;
use crate::reference;
use crate::session::Session;

/// Models whose indexed `attribute` equals `value` exactly, ordered by identifier.
///
/// Members whose record no longer exists, for instance after expiration, are skipped.
pub fn find<M, V>(session: &Session, attribute: &str, value: &V) -> Result<Vec<M>, AppError>
where
    M: Model,
    V: ToField + ?Sized,
{
    let info = describe::<M>()?;
    if !info.is_indexed(attribute) {
        return Err(AppError::NotIndexed { model: info.name, attribute: attribute.to_string() });
    }
    let ids = index::members(session, info.name, attribute, &value.to_field())?;
    load_many(session, ids)
}

/// Every live model of a type that maintains the all-identifiers registry.
///
/// Identifiers whose record is gone are removed from the registry on the way.
pub fn get_all<M: Model>(session: &Session) -> Result<Vec<M>, AppError> {
    let info = describe::<M>()?;
    if !info.all_ids {
        return Err(AppError::Unsupported(format!("get_all on {}, which is not declared with #[model(all_ids)]", info.name)));
    }
    let registry = KeyPath::all_ids(info.name);
    let mut ids = session
        .store()
        .smembers(session.db(), registry.key())?
        .iter()
        .map(|raw| reference::parse_id(&registry, "all", raw))
        .collect::<Result<Vec<u64>, AppError>>()?;
    ids.sort_unstable();
    let mut models = Vec::with_capacity(ids.len());
    for id in ids {
        match mapper::get::<M>(session, id)? {
            Some(model) => models.push(model),
            None => {
                session.store().srem(session.db(), registry.key(), &id.to_string())?;
                debug!("Pruned {}:{} from {}", info.name, id, registry.key());
            }
        }
    }
    Ok(models)
}

fn load_many<M: Model>(session: &Session, ids: Vec<u64>) -> Result<Vec<M>, AppError> {
    let mut models = Vec::with_capacity(ids.len());
    for id in ids {
        match mapper::get::<M>(session, id)? {
            Some(model) => models.push(model),
            None => debug!("Skipping {} whose record is gone", id),
        }
    }
    Ok(models)
}
