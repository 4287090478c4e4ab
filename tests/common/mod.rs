#![allow(dead_code)]

use rohm::*;
use std::collections::BTreeSet;

#[derive(Scalar, Debug, Clone, Copy, Default, PartialEq)]
pub enum Level {
    #[default]
    Basic,
    Premium,
}

#[derive(Model, Debug, Clone, Default, PartialEq)]
#[model(all_ids)]
pub struct User {
    #[id]
    pub id: Option<u64>,
    #[attribute]
    #[indexed]
    pub name: Option<String>,
    #[transient]
    pub room: Option<String>,
    #[attribute]
    #[indexed]
    pub age: i32,
    #[attribute]
    pub salary: f32,
    #[attribute]
    pub initial: char,
    #[attribute]
    pub level: Level,
    #[reference]
    #[indexed]
    pub country: Option<Country>,
    #[array(reference)]
    pub three_latest_purchases: [Option<Item>; 3],
    #[list(reference)]
    pub purchases: Vec<Item>,
    #[set]
    pub tags: BTreeSet<String>,
    #[list]
    pub scores: Vec<u32>,
}

#[derive(Model, Debug, Clone, Default, PartialEq)]
pub struct Country {
    #[id]
    pub id: Option<u64>,
    #[attribute]
    #[indexed]
    pub name: Option<String>,
}

#[derive(Model, Debug, Clone, Default, PartialEq)]
#[model(all_ids)]
pub struct Item {
    #[id]
    pub id: Option<u64>,
    #[attribute]
    pub name: String,
}

#[derive(Model, Debug, Clone, Default, PartialEq)]
pub struct Book {
    #[id]
    pub id: Option<u64>,
    #[attribute]
    pub name: String,
    #[array]
    pub ratings: [Option<u8>; 4],
    #[set(reference)]
    pub authors: Vec<Country>,
}

#[derive(Model, Debug, Clone, Default, PartialEq)]
pub struct Note {
    #[id]
    pub id: Option<u64>,
    #[array]
    pub slots: [Option<String>; 2],
    #[list]
    pub maybes: Vec<Option<i64>>,
    #[list]
    pub lines: Vec<String>,
}

pub fn user(name: &str) -> User {
    User { name: Some(name.to_string()), ..User::default() }
}

pub fn item(session: &Session, name: &str) -> Item {
    let mut item = Item { name: name.to_string(), ..Item::default() };
    save(session, &mut item).unwrap();
    item
}

pub fn session() -> Session {
    Storage::in_memory().unwrap()
}

pub fn key_exists(session: &Session, key: KeyPath) -> bool {
    key.exists(session).unwrap()
}
