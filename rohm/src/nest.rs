use crate::error::StoreError;
use crate::session::Session;
use std::fmt;

pub const SEPARATOR: char = ':';

/// Hierarchical store address, `User`, `User:7`, `User:name:foo`...
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPath {
    key: String,
}

impl KeyPath {
    pub fn root(type_name: &str) -> KeyPath {
        KeyPath { key: type_name.to_string() }
    }

    pub fn cat(&self, segment: impl fmt::Display) -> KeyPath {
        KeyPath { key: format!("{}{}{}", self.key, SEPARATOR, segment) }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn exists(&self, session: &Session) -> Result<bool, StoreError> {
        session.store().exists(session.db(), &self.key)
    }

    pub fn record(type_name: &str, id: u64) -> KeyPath {
        KeyPath::root(type_name).cat(id)
    }

    pub fn sub_record(type_name: &str, id: u64, attribute: &str) -> KeyPath {
        KeyPath::record(type_name, id).cat(attribute)
    }

    pub fn index_entry(type_name: &str, attribute: &str, value: &str) -> KeyPath {
        KeyPath::root(type_name).cat(attribute).cat(value)
    }

    pub fn counter(type_name: &str) -> KeyPath {
        KeyPath::root(type_name).cat("id")
    }

    pub fn all_ids(type_name: &str) -> KeyPath {
        KeyPath::root(type_name).cat("all")
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}
