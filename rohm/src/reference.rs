//! Model-to-model references stored as an identifier at `{Type}:{id}:{attribute}`.

use crate::error::AppError;
use crate::mapper;
use crate::model::Model;
use crate::nest::KeyPath;
use crate::session::Session;
use std::cell::Cell;

/// Longest chain of references followed by one load.
pub const MAX_DEPTH: usize = 32;

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Identifier of a referenced model, failing when it was never saved.
pub fn id_of<T: Model>(model: &'static str, attribute: &'static str, target: &T) -> Result<u64, AppError> {
    target.id().ok_or(AppError::MissingId { model, attribute })
}

pub fn write_reference_id(session: &Session, type_name: &str, owner_id: u64, attribute: &str, target: Option<u64>) -> Result<(), AppError> {
    let key = KeyPath::sub_record(type_name, owner_id, attribute);
    match target {
        Some(target) => session.store().set(session.db(), key.key(), &target.to_string())?,
        None => {
            session.store().del(session.db(), &[key.key()])?;
        }
    }
    Ok(())
}

pub fn stored_reference(session: &Session, type_name: &str, owner_id: u64, attribute: &str) -> Result<Option<u64>, AppError> {
    let key = KeyPath::sub_record(type_name, owner_id, attribute);
    match session.store().get(session.db(), key.key())? {
        None => Ok(None),
        Some(raw) => parse_id(&key, attribute, &raw).map(Some),
    }
}

/// Loads the referenced model through the primary load path.
pub fn resolve<T: Model>(session: &Session, target: Option<u64>) -> Result<Option<T>, AppError> {
    let Some(target) = target else { return Ok(None) };
    let depth = DEPTH.with(|d| d.get());
    if depth >= MAX_DEPTH {
        return Err(AppError::Unsupported(format!("reference chain deeper than {}, cyclic references cannot be loaded", MAX_DEPTH)));
    }
    DEPTH.with(|d| d.set(depth + 1));
    let loaded = mapper::get::<T>(session, target);
    DEPTH.with(|d| d.set(depth));
    loaded
}

pub(crate) fn parse_id(key: &KeyPath, attribute: &str, raw: &str) -> Result<u64, AppError> {
    raw.parse::<u64>().map_err(|e| AppError::codec(key.key(), attribute, format!("'{}' is not an identifier: {}", raw, e)))
}
