//! Identifier generation.

use uuid::Uuid;

/// New time-ordered identifier for notes and tags.
///
/// UUIDv7 carries a millisecond timestamp in its high bits, so primary key
/// order follows creation order and inserts stay append-mostly.
#[inline]
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_v7_and_unique() {
        let a = new_v7();
        let b = new_v7();
        assert_eq!(a.get_version_num(), 7);
        assert_ne!(a, b);
    }
}
