use crate::error::{AppError, StoreError};
use crate::nest::KeyPath;
use crate::session::Session;

/// Next identifier of `type_name`, one atomic increment on `{Type}:id`.
pub fn next_id(session: &Session, type_name: &str) -> Result<u64, AppError> {
    let counter = KeyPath::counter(type_name);
    let next = session.store().incr(session.db(), counter.key())?;
    u64::try_from(next).map_err(|_| AppError::Store(StoreError::Backend(format!("counter '{}' went negative: {}", counter, next))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Storage;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn ids_increase_per_type() {
        let session = Storage::in_memory().unwrap();
        assert_eq!(next_id(&session, "User").unwrap(), 1);
        assert_eq!(next_id(&session, "User").unwrap(), 2);
        assert_eq!(next_id(&session, "Item").unwrap(), 1);
    }

    #[test]
    fn concurrent_callers_get_disjoint_ids() {
        let session = Storage::in_memory().unwrap();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let session = session.clone();
                thread::spawn(move || (0..25).map(|_| next_id(&session, "User").unwrap()).collect::<Vec<_>>())
            })
            .collect();
        let ids: HashSet<u64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        assert_eq!(ids.len(), 100);
        assert_eq!(ids.iter().max(), Some(&100));
    }
}
