use bookshelf_core::BookStore;
use tokio::sync::RwLock;

/// State shared by every connection: the one book store of the process.
///
/// Reads (`list_books`, `get_book`) take the read lock, every mutation takes the write lock for
/// its whole duration, so each request is applied atomically.
pub struct AppState {
    pub store: RwLock<BookStore>,
}

impl Default for AppState {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self::with_store(BookStore::new())
    }

    #[must_use]
    #[inline]
    pub fn with_store(store: BookStore) -> Self {
        Self {
            store: RwLock::new(store),
        }
    }

    /// Number of books currently on the shelf
    #[inline]
    pub async fn book_count(&self) -> usize {
        self.store.read().await.len()
    }
}
