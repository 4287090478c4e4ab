use rohm::*;

#[derive(Scalar, Default, Debug, Clone, Copy, PartialEq)]
enum Status {
    #[default]
    Draft,
    Published,
    Archived,
}

#[derive(Model, Default)]
struct Post {
    #[id]
    id: Option<u64>,
    #[attribute]
    #[indexed]
    status: Status,
    #[attribute]
    previous: Option<Status>,
}

fn main() {
    assert_eq!(Status::Published.to_field(), "Published");
    assert_eq!(Status::from_field("Archived"), Ok(Status::Archived));
    assert!(Status::from_field("Deleted").is_err());
    let _ = Post { id: None, status: Status::Draft, previous: Some(Status::Archived) };
}
