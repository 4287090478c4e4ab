//! Primary record mapping: scalar attributes as fields of the `{Type}:{id}` hash.

use crate::error::AppError;
use crate::metadata::ModelInfo;
use crate::model::Model;
use crate::nest::KeyPath;
use crate::session::Session;
use std::collections::HashMap;

pub type Encoded = Vec<(&'static str, Option<String>)>;

pub fn encode_scalars<M>(info: &ModelInfo<M>, model: &M) -> Encoded {
    info.scalars.iter().map(|attr| (attr.name, (attr.encode)(model))).collect()
}

/// Writes present values and removes fields of absent ones. The identifier is
/// always written so a record with only absent values still exists.
pub fn write_record<M>(session: &Session, info: &ModelInfo<M>, id: u64, values: &Encoded) -> Result<(), AppError> {
    let record = KeyPath::record(info.name, id);
    let mut present: Vec<(&str, String)> = vec![(info.id_attribute, id.to_string())];
    let mut absent: Vec<&str> = Vec::new();
    for (name, value) in values {
        match value {
            Some(value) => present.push((*name, value.clone())),
            None => absent.push(*name),
        }
    }
    session.store().hset(session.db(), record.key(), &present)?;
    if !absent.is_empty() {
        session.store().hdel(session.db(), record.key(), &absent)?;
    }
    Ok(())
}

pub fn read_field(session: &Session, type_name: &str, id: u64, attribute: &str) -> Result<Option<String>, AppError> {
    let record = KeyPath::record(type_name, id);
    Ok(session.store().hget(session.db(), record.key(), attribute)?)
}

/// Seeds a model from its primary record, `None` when there is no record.
pub fn read_record<M: Model>(session: &Session, info: &ModelInfo<M>, id: u64) -> Result<Option<M>, AppError> {
    let record = KeyPath::record(info.name, id);
    let fields: HashMap<String, String> = session.store().hgetall(session.db(), record.key())?.into_iter().collect();
    if fields.is_empty() {
        return Ok(None);
    }
    let mut model = M::default();
    model.set_id(id);
    for attr in &info.scalars {
        let raw = fields.get(attr.name).map(String::as_str);
        (attr.decode)(&mut model, raw).map_err(|message| AppError::codec(record.key(), attr.name, message))?;
    }
    Ok(Some(model))
}
