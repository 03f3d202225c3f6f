use uuid::Uuid;

/// Length of every id issued by [`RandomIdGenerator`]
pub const BOOK_ID_LENGTH: usize = 16;

/// Source of opaque book ids. The store relies on nothing but the returned strings being
/// distinct from the ids already on the shelf.
pub trait IdGenerator: Send + Sync {
    fn next_id(&mut self) -> String;
}

/// Issues fixed-length ids taken from the hex digits of a random v4 UUID.
#[allow(clippy::exhaustive_structs, reason = "Stateless generator")]
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    #[inline]
    fn next_id(&mut self) -> String {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(BOOK_ID_LENGTH);
        id
    }
}

/// Deterministic ids (`book000000000001`, `book000000000002`, ...), useful where the issued ids
/// have to be known in advance.
#[derive(Debug, Default, Clone)]
pub struct SequentialIdGenerator {
    issued: u64,
}

impl IdGenerator for SequentialIdGenerator {
    #[inline]
    fn next_id(&mut self) -> String {
        self.issued = self.issued.saturating_add(1);
        format!("book{:012}", self.issued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    #[test]
    fn random_ids_have_fixed_length() {
        let mut ids = RandomIdGenerator;
        for _ in 0..100 {
            let id = ids.next_id();
            assert_eq!(id.len(), BOOK_ID_LENGTH);
            assert!(id.chars().all(|ch| ch.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn random_ids_do_not_repeat() {
        let mut ids = RandomIdGenerator;
        let issued: HashSet<String> = (0..1000).map(|_| ids.next_id()).collect();
        assert_eq!(issued.len(), 1000);
    }

    #[test]
    fn sequential_ids() {
        let mut ids = SequentialIdGenerator::default();
        assert_eq!(ids.next_id(), "book000000000001");
        assert_eq!(ids.next_id(), "book000000000002");
        assert_eq!(ids.next_id().len(), BOOK_ID_LENGTH);
    }
}
