mod common;

use common::*;
use rohm::*;
use std::collections::BTreeSet;
use std::thread;

#[test]
fn save_and_get() {
    let session = session();
    let mut user = user("foo");
    user.room = Some("vroom".to_string());
    let id = save(&session, &mut user).unwrap();

    assert_eq!(user.id, Some(id));
    let saved = get::<User>(&session, id).unwrap().unwrap();
    assert_eq!(saved.name, user.name);
    assert_eq!(saved.room, None);
    assert_eq!(saved.id, user.id);
    assert_eq!(saved.age, user.age);
}

#[test]
fn save_assigns_increasing_ids_per_type() {
    let session = session();
    let first = save(&session, &mut user("a")).unwrap();
    let second = save(&session, &mut user("b")).unwrap();
    let item = item(&session, "x");
    assert!(second > first);
    assert_eq!(item.id, Some(1));
}

#[test]
fn save_with_array_of_references() {
    let session = session();
    let items = [item(&session, "Foo0"), item(&session, "Foo1"), item(&session, "Foo2")];
    let mut user = user("foo");
    user.three_latest_purchases = [Some(items[0].clone()), Some(items[1].clone()), Some(items[2].clone())];
    let id = save(&session, &mut user).unwrap();

    let saved = get::<User>(&session, id).unwrap().unwrap();
    assert_eq!(saved.three_latest_purchases, user.three_latest_purchases);
    assert_eq!(saved.three_latest_purchases[1].as_ref().map(|i| i.name.as_str()), Some("Foo1"));

    assert!(delete_cascade::<User>(&session, id).unwrap());
    for item in &items {
        assert!(get::<Item>(&session, item.id.unwrap()).unwrap().is_none());
        assert!(!delete::<Item>(&session, item.id.unwrap()).unwrap());
    }
}

#[test]
fn array_keeps_empty_slots_in_place() {
    let session = session();
    let middle = item(&session, "middle");
    let mut user = user("gaps");
    user.three_latest_purchases = [None, Some(middle.clone()), None];
    let id = save(&session, &mut user).unwrap();

    let saved = get::<User>(&session, id).unwrap().unwrap();
    assert_eq!(saved.three_latest_purchases, [None, Some(middle), None]);

    let mut book = Book { name: "rated".to_string(), ratings: [Some(5), None, None, Some(1)], ..Book::default() };
    let book_id = save(&session, &mut book).unwrap();
    assert_eq!(get::<Book>(&session, book_id).unwrap().unwrap().ratings, [Some(5), None, None, Some(1)]);
}

#[test]
fn save_with_other_value_types() {
    let session = session();
    let mut first = User { age: 99, salary: 9999.99, initial: 'f', level: Level::Premium, ..user("foo") };
    let mut second = User { age: -9, initial: 'é', ..user("foo2") };
    save(&session, &mut first).unwrap();
    save(&session, &mut second).unwrap();

    for expected in [&first, &second] {
        let saved = get::<User>(&session, expected.id.unwrap()).unwrap().unwrap();
        assert_eq!(saved.age, expected.age);
        assert_eq!(saved.salary, expected.salary);
        assert_eq!(saved.initial, expected.initial);
        assert_eq!(saved.level, expected.level);
    }

    assert!(delete::<User>(&session, first.id.unwrap()).unwrap());
    assert!(get::<User>(&session, first.id.unwrap()).unwrap().is_none());
    assert!(delete::<User>(&session, second.id.unwrap()).unwrap());
    assert!(get::<User>(&session, second.id.unwrap()).unwrap().is_none());
}

#[test]
fn delete_removes_record() {
    let session = session();
    let mut user = User::default();
    let id = save(&session, &mut user).unwrap();

    assert!(exists::<User>(&session, id).unwrap());
    assert!(get::<User>(&session, id).unwrap().is_some());
    assert!(delete::<User>(&session, id).unwrap());
    assert!(get::<User>(&session, id).unwrap().is_none());
    assert!(!delete::<User>(&session, id).unwrap());
}

#[test]
fn delete_removes_sub_records() {
    let session = session();
    let mut user = user("collector");
    user.purchases = vec![item(&session, "a")];
    user.tags = BTreeSet::from(["x".to_string()]);
    let id = save(&session, &mut user).unwrap();
    assert!(key_exists(&session, KeyPath::sub_record("User", id, "purchases")));

    delete::<User>(&session, id).unwrap();
    assert!(!key_exists(&session, KeyPath::sub_record("User", id, "purchases")));
    assert!(!key_exists(&session, KeyPath::sub_record("User", id, "tags")));
    // plain delete leaves referenced models alone
    assert!(get::<Item>(&session, user.purchases[0].id.unwrap()).unwrap().is_some());
}

#[test]
fn transient_fields_are_not_persisted() {
    let session = session();
    let mut user = user("foo");
    user.room = Some("3A".to_string());
    let id = save(&session, &mut user).unwrap();

    let saved = get::<User>(&session, id).unwrap().unwrap();
    assert_eq!(saved.name, user.name);
    assert_eq!(saved.room, None);
}

#[test]
fn fails_when_reference_was_not_saved() {
    let session = session();
    let mut user = user("bar");
    user.country = Some(Country::default());

    match save(&session, &mut user) {
        Err(AppError::MissingId { model, attribute }) => {
            assert_eq!(model, "User");
            assert_eq!(attribute, "country");
        }
        other => panic!("expected MissingId, got {:?}", other.map(|_| ())),
    }
    assert_eq!(user.id, None);
    assert!(!key_exists(&session, KeyPath::counter("User")));
    assert!(!key_exists(&session, KeyPath::record("User", 1)));
}

#[test]
fn fails_when_collection_element_was_not_saved() {
    let session = session();
    let mut user = user("bar");
    user.purchases = vec![Item::default()];
    assert!(matches!(save(&session, &mut user), Err(AppError::MissingId { attribute: "purchases", .. })));
}

#[test]
fn handles_references() {
    let session = session();
    let mut nowhere = user("foo");
    let id = save(&session, &mut nowhere).unwrap();
    assert!(get::<User>(&session, id).unwrap().unwrap().country.is_none());

    let mut somewhere = Country { name: Some("Somewhere".to_string()), ..Country::default() };
    save(&session, &mut somewhere).unwrap();

    let mut traveller = user("bar");
    traveller.country = Some(somewhere.clone());
    let id = save(&session, &mut traveller).unwrap();

    let saved = get::<User>(&session, id).unwrap().unwrap();
    assert_eq!(saved.country, Some(somewhere));
}

#[test]
fn optional_slots_keep_empty_values_and_positions() {
    let session = session();
    let mut note = Note {
        slots: [Some(String::new()), Some("x".to_string())],
        maybes: vec![Some(1), None, Some(2)],
        lines: vec![String::new(), "\\escaped".to_string(), "plain".to_string()],
        ..Note::default()
    };
    let id = save(&session, &mut note).unwrap();
    assert_eq!(get::<Note>(&session, id).unwrap().unwrap(), note);

    note.slots = [None, Some(String::new())];
    note.maybes = vec![None, None];
    save(&session, &mut note).unwrap();
    assert_eq!(get::<Note>(&session, id).unwrap().unwrap(), note);
}

#[test]
fn save_cascade_saves_held_models_first() {
    let session = session();
    let mut traveller = user("cascade");
    traveller.country = Some(Country { name: Some("Atlantis".to_string()), ..Country::default() });
    traveller.three_latest_purchases = [Some(Item { name: "first".to_string(), ..Item::default() }), None, None];
    traveller.purchases = vec![Item { name: "second".to_string(), ..Item::default() }];

    assert!(matches!(save(&session, &mut traveller.clone()), Err(AppError::MissingId { .. })));
    let id = save_cascade(&session, &mut traveller).unwrap();

    let country_id = traveller.country.as_ref().and_then(|c| c.id).unwrap();
    assert!(traveller.three_latest_purchases[0].as_ref().and_then(|i| i.id).is_some());
    assert!(traveller.purchases[0].id.is_some());
    assert_eq!(get::<User>(&session, id).unwrap().unwrap(), traveller);
    assert_eq!(get_all::<Item>(&session).unwrap().len(), 2);

    // re-saving moves the held model's index entry instead of leaving the old one behind
    traveller.country.as_mut().unwrap().name = Some("Lemuria".to_string());
    save_cascade(&session, &mut traveller).unwrap();
    assert!(find::<Country, _>(&session, "name", "Atlantis").unwrap().is_empty());
    let found = find::<Country, _>(&session, "name", "Lemuria").unwrap();
    assert_eq!(found.iter().map(|c| c.id.unwrap()).collect::<Vec<_>>(), vec![country_id]);
}

#[test]
fn reference_to_deleted_model_loads_as_none() {
    let session = session();
    let mut country = Country { name: Some("Gone".to_string()), ..Country::default() };
    save(&session, &mut country).unwrap();
    let mut user = user("orphan");
    user.country = Some(country.clone());
    let id = save(&session, &mut user).unwrap();

    delete::<Country>(&session, country.id.unwrap()).unwrap();
    assert!(get::<User>(&session, id).unwrap().unwrap().country.is_none());
}

#[test]
fn collections_round_trip() {
    let session = session();
    let mut user = user("lists");
    user.purchases = vec![item(&session, "b"), item(&session, "a"), item(&session, "c")];
    user.tags = BTreeSet::from(["red".to_string(), "blue".to_string()]);
    user.scores = vec![3, 1, 3, 2];
    let id = save(&session, &mut user).unwrap();

    let saved = get::<User>(&session, id).unwrap().unwrap();
    assert_eq!(saved.purchases, user.purchases);
    assert_eq!(saved.tags, user.tags);
    assert_eq!(saved.scores, vec![3, 1, 3, 2]);

    let mut authors = vec![Country { name: Some("A".into()), ..Country::default() }, Country { name: Some("B".into()), ..Country::default() }];
    for author in authors.iter_mut() {
        save(&session, author).unwrap();
    }
    let mut book = Book { name: "Anthology".to_string(), authors: vec![authors[1].clone(), authors[0].clone(), authors[1].clone()], ..Book::default() };
    let book_id = save(&session, &mut book).unwrap();
    let saved = get::<Book>(&session, book_id).unwrap().unwrap();
    assert_eq!(saved.authors, authors);
}

#[test]
fn saving_empty_collection_removes_sub_record() {
    let session = session();
    let mut user = user("shrinking");
    user.scores = vec![1, 2];
    let id = save(&session, &mut user).unwrap();
    assert!(key_exists(&session, KeyPath::sub_record("User", id, "scores")));

    user.scores.clear();
    save(&session, &mut user).unwrap();
    assert!(!key_exists(&session, KeyPath::sub_record("User", id, "scores")));
    assert!(get::<User>(&session, id).unwrap().unwrap().scores.is_empty());
}

#[test]
fn update_removes_stale_field() {
    let session = session();
    let mut user = user("named");
    let id = save(&session, &mut user).unwrap();

    user.name = None;
    save(&session, &mut user).unwrap();
    let raw = session.store().hget(session.db(), KeyPath::record("User", id).key(), "name").unwrap();
    assert_eq!(raw, None);
    assert_eq!(get::<User>(&session, id).unwrap().unwrap().name, None);
    assert!(!key_exists(&session, KeyPath::index_entry("User", "name", "named")));
}

#[test]
fn get_all_returns_every_model() {
    let session = session();
    save(&session, &mut user("foo")).unwrap();
    save(&session, &mut user("foo1")).unwrap();

    let users = get_all::<User>(&session).unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0].name.as_deref(), Some("foo"));
    assert_eq!(users[1].name.as_deref(), Some("foo1"));

    delete::<User>(&session, users[0].id.unwrap()).unwrap();
    assert_eq!(get_all::<User>(&session).unwrap().len(), 1);
}

#[test]
fn get_all_not_supported() {
    let session = session();
    save(&session, &mut Book { name: "title".to_string(), ..Book::default() }).unwrap();
    save(&session, &mut Book { name: "another title".to_string(), ..Book::default() }).unwrap();

    assert!(matches!(get_all::<Book>(&session), Err(AppError::Unsupported(_))));
}

#[test]
fn select_db_isolates_models() {
    let session = session();
    let mut user = user("foo");
    let id = save(&session, &mut user).unwrap();

    let other = session.select(7);
    assert!(get::<User>(&other, id).unwrap().is_none());
    assert!(get::<User>(&session, id).unwrap().is_some());
}

#[test]
fn flush_db_clears_only_selected_db() {
    let session = session();
    let seven = session.select(7);
    let one = session.select(1);
    let mut first = user("foo");
    let first_id = save(&seven, &mut first).unwrap();
    let mut second = user("bar");
    let second_id = save(&one, &mut second).unwrap();

    one.flush_db().unwrap();
    assert!(get::<User>(&one, second_id).unwrap().is_none());
    assert!(get::<User>(&seven, first_id).unwrap().is_some());

    seven.flush_db().unwrap();
    assert!(get::<User>(&seven, first_id).unwrap().is_none());
}

#[test]
fn undecodable_value_is_codec_error() {
    let session = session();
    let mut user = user("broken");
    let id = save(&session, &mut user).unwrap();
    let record = KeyPath::record("User", id);
    session.store().hset(session.db(), record.key(), &[("age", "not a number".to_string())]).unwrap();

    match get::<User>(&session, id) {
        Err(AppError::Codec { key, field, .. }) => {
            assert_eq!(key, record.key());
            assert_eq!(field, "age");
        }
        other => panic!("expected codec error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn key_of_another_kind_is_wrong_type() {
    let session = session();
    session.store().set(session.db(), KeyPath::record("User", 1).key(), "plain").unwrap();
    assert!(matches!(get::<User>(&session, 1), Err(AppError::Store(StoreError::WrongType { .. }))));
}

#[test]
fn concurrent_saves_get_distinct_ids() {
    let session = session();
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let session = session.clone();
            thread::spawn(move || (0..10).map(|i| save(&session, &mut user(&format!("{}-{}", t, i))).unwrap()).collect::<Vec<u64>>())
        })
        .collect();
    let mut ids: Vec<u64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 40);
    assert_eq!(get_all::<User>(&session).unwrap().len(), 40);
}
