/// Rules a client-supplied book payload can violate.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name required")]
    NameRequired,

    #[error("readPage exceeds pageCount")]
    ReadPageExceedsPageCount { read_page: u32, page_count: u32 },
}

/// Why a [`BookStore`](crate::BookStore) operation was refused.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The caller supplied data that breaks a field rule
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// No book with the given id is on the shelf
    #[error("book not found (id={0})")]
    NotFound(String),

    /// An inserted book could not be found right after the insert. Not expected to happen with an
    /// in-memory store, treated as an internal error.
    #[error("book was not persisted (id={0})")]
    Persistence(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn validation_messages() {
        assert_eq!(ValidationError::NameRequired.to_string(), "name required");
        assert_eq!(
            ValidationError::ReadPageExceedsPageCount {
                read_page: 20,
                page_count: 10
            }
            .to_string(),
            "readPage exceeds pageCount"
        );
    }

    #[test]
    fn validation_converts_into_store_error() {
        let error: StoreError = ValidationError::NameRequired.into();
        assert_eq!(error, StoreError::Validation(ValidationError::NameRequired));
        assert_eq!(error.to_string(), "validation failed: name required");
    }
}
