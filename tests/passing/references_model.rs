use rohm::*;
use std::collections::{BTreeSet, HashSet};

#[derive(Model, Default, Clone)]
struct Item {
    #[id]
    id: Option<u64>,
    #[attribute]
    name: String,
}

#[derive(Model, Default)]
struct Basket {
    #[id]
    id: Option<u64>,
    #[reference]
    #[indexed]
    favourite: Option<Item>,
    #[array(reference)]
    latest: [Option<Item>; 3],
    #[list(reference)]
    items: Vec<Item>,
    #[set(reference)]
    unique_items: Vec<Item>,
    #[array]
    slots: [Option<u16>; 2],
    #[list]
    counts: Vec<i64>,
    #[set]
    labels: BTreeSet<String>,
    #[set]
    flags: HashSet<bool>,
}

fn main() {
    let _ = Basket::default();
    let _ = Item::declaration();
}
