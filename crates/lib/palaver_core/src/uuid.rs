// Identifier generation.
//
// Conversation and message ids are opaque strings to callers. They are
// generated as UUIDv7 so that ids created later sort after earlier ones,
// which keeps primary-key index inserts append-only.

use uuid::Uuid;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn uuidv7() -> Uuid {
    Uuid::now_v7()
}

/// Generate a new opaque record id.
pub fn new_id() -> String {
    uuidv7().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuidv7_is_valid() {
        let id = uuidv7();
        assert_eq!(id.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn new_ids_sort_by_creation() {
        let a = new_id();
        let b = new_id();
        assert_ne!(a, b);
        assert!(b >= a);
    }
}
