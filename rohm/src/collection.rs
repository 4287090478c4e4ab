//! Arrays, lists and sets stored at `{Type}:{id}:{attribute}`.
//!
//! Every element is stored as a slot: an empty slot is the empty string and a
//! present value that is empty or starts with `\` gets a leading `\`, so
//! `None` and `Some("")` stay apart. Arrays and lists keep every slot in order.
//! Sets hold distinct slots and load back in ascending stored order.

use crate::codec::FromField;
use crate::error::AppError;
use crate::metadata::{CollectionAttr, Shape};
use crate::model::{Model, TargetDelete};
use crate::nest::{KeyPath, SEPARATOR};
use crate::reference;
use crate::session::Session;

const EMPTY_SLOT: &str = "";
const ESCAPE: char = '\\';

pub fn encode_slot(value: Option<String>) -> String {
    match value {
        None => EMPTY_SLOT.to_string(),
        Some(value) if value.is_empty() || value.starts_with(ESCAPE) => format!("{}{}", ESCAPE, value),
        Some(value) => value,
    }
}

/// The stored value of a slot, `None` for an empty one.
pub fn decode_slot(raw: &str) -> Option<&str> {
    if raw == EMPTY_SLOT {
        return None;
    }
    Some(raw.strip_prefix(ESCAPE).unwrap_or(raw))
}

/// Replaces the stored contents with `values`.
pub fn save_collection(session: &Session, type_name: &str, owner_id: u64, attribute: &str, shape: Shape, values: Vec<Option<String>>) -> Result<(), AppError> {
    let key = KeyPath::sub_record(type_name, owner_id, attribute);
    let store = session.store();
    match shape {
        Shape::Array(_) => {
            let slots: Vec<String> = if values.iter().all(Option::is_none) {
                Vec::new()
            } else {
                values.into_iter().map(encode_slot).collect()
            };
            store.replace_list(session.db(), key.key(), &slots)?;
        }
        Shape::List => {
            let slots: Vec<String> = values.into_iter().map(encode_slot).collect();
            store.replace_list(session.db(), key.key(), &slots)?;
        }
        Shape::Set => {
            let mut members: Vec<String> = values.into_iter().map(encode_slot).collect();
            members.sort();
            members.dedup();
            store.replace_set(session.db(), key.key(), &members)?;
        }
    }
    Ok(())
}

pub fn stored_elements(session: &Session, type_name: &str, owner_id: u64, attribute: &str, shape: Shape) -> Result<Vec<String>, AppError> {
    let key = KeyPath::sub_record(type_name, owner_id, attribute);
    let elements = match shape {
        Shape::Array(_) | Shape::List => session.store().lrange(session.db(), key.key())?,
        Shape::Set => session.store().smembers(session.db(), key.key())?,
    };
    Ok(elements)
}

pub fn load_collection<M>(session: &Session, type_name: &str, owner_id: u64, attr: &CollectionAttr<M>, model: &mut M) -> Result<(), AppError> {
    let key = KeyPath::sub_record(type_name, owner_id, attr.name);
    let elements = stored_elements(session, type_name, owner_id, attr.name, attr.shape)?;
    (attr.load)(model, session, &key, elements)
}

/// Identifiers of referenced models held by a reference collection.
pub fn stored_targets<M>(session: &Session, type_name: &str, owner_id: u64, attr: &CollectionAttr<M>) -> Result<Vec<u64>, AppError> {
    let key = KeyPath::sub_record(type_name, owner_id, attr.name);
    stored_elements(session, type_name, owner_id, attr.name, attr.shape)?
        .iter()
        .filter_map(|raw| decode_slot(raw))
        .map(|raw| reference::parse_id(&key, attr.name, raw))
        .collect()
}

fn attribute_of(key: &KeyPath) -> &str {
    key.key().rsplit(SEPARATOR).next().unwrap_or_default()
}

fn decode_value<T: FromField>(key: &KeyPath, value: &str) -> Result<T, AppError> {
    T::from_field(value).map_err(|message| AppError::codec(key.key(), attribute_of(key), message))
}

/// Decodes a scalar element, an empty slot is a codec error.
pub fn element<T: FromField>(key: &KeyPath, raw: &str) -> Result<T, AppError> {
    let value = decode_slot(raw).ok_or_else(|| AppError::codec(key.key(), attribute_of(key), "empty slot for a required element"))?;
    decode_value(key, value)
}

/// Decodes an optional scalar element, the empty slot being `None`.
pub fn optional_element<T: FromField>(key: &KeyPath, raw: &str) -> Result<Option<T>, AppError> {
    decode_slot(raw).map(|value| decode_value(key, value)).transpose()
}

/// Encodes a model element as its identifier.
pub fn model_element_id<T: Model>(model: &'static str, attribute: &'static str, target: &T) -> Result<Option<String>, AppError> {
    reference::id_of(model, attribute, target).map(|id| Some(id.to_string()))
}

/// Loads a model element, `None` for an empty slot or a model that no longer exists.
pub fn model_element<T: Model>(session: &Session, key: &KeyPath, raw: &str) -> Result<Option<T>, AppError> {
    let Some(raw) = decode_slot(raw) else { return Ok(None) };
    let id = reference::parse_id(key, attribute_of(key), raw)?;
    reference::resolve::<T>(session, Some(id))
}

/// Loads every model element, dropping those that no longer exist.
pub fn model_elements<T: Model>(session: &Session, key: &KeyPath, raw: Vec<String>) -> Result<Vec<T>, AppError> {
    let mut models = Vec::with_capacity(raw.len());
    for raw in raw {
        if let Some(model) = model_element::<T>(session, key, &raw)? {
            models.push(model);
        }
    }
    Ok(models)
}

/// Loads a fixed-arity array, slot by slot. Missing trailing slots keep their default.
pub fn fill_slots<E: Default, const N: usize>(raw: Vec<String>, mut decode: impl FnMut(&str) -> Result<E, AppError>) -> Result<[E; N], AppError> {
    let mut slots: [E; N] = std::array::from_fn(|_| E::default());
    for (slot, raw) in slots.iter_mut().zip(raw.iter()) {
        *slot = decode(raw)?;
    }
    Ok(slots)
}

pub(crate) fn delete_targets(session: &Session, targets: Vec<u64>, delete: TargetDelete) -> Result<(), AppError> {
    for target in targets {
        delete(session, target)?;
    }
    Ok(())
}
