use rohm::*;

#[derive(Model, Default)]
struct Minimal {
    #[id]
    id: Option<u64>,
}

#[derive(Model, Default)]
#[model(all_ids)]
struct Named {
    #[id]
    id: Option<u64>,
    #[attribute]
    #[indexed]
    name: String,
    #[attribute]
    nickname: Option<String>,
    #[transient]
    cached: u32,
}

fn main() {
    let _ = Minimal { id: None };
    let _ = Named { id: Some(1), name: "foo".to_string(), nickname: None, cached: 0 };
    let _ = describe::<Named>();
}
