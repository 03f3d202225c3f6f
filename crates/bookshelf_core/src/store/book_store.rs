use crate::store::errors::StoreError;
use crate::store::filter::BookFilter;
use crate::store::id::{IdGenerator, RandomIdGenerator};
use crate::store::types::{Book, BookPayload, BookQuery, BookSummary};
use chrono::Utc;
use log::{debug, error, warn};

/// The shelf: books in insertion order, held in memory for the lifetime of the process.
///
/// The store has no internal locking. Callers that share it between tasks wrap it in a lock and
/// hold it for the duration of each operation.
pub struct BookStore {
    books: Vec<Book>,
    ids: Box<dyn IdGenerator>,
}

impl Default for BookStore {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl BookStore {
    /// Empty store issuing random ids
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self::with_id_generator(RandomIdGenerator)
    }

    #[must_use]
    #[inline]
    pub fn with_id_generator<G: IdGenerator + 'static>(ids: G) -> Self {
        Self {
            books: Vec::new(),
            ids: Box::new(ids),
        }
    }

    /// Validates the payload and appends a new book to the end of the shelf.
    /// # Errors
    /// Returns `StoreError::Validation` if the name is missing or more pages were read than the
    /// book has, and `StoreError::Persistence` if the book is not on the shelf after the insert.
    #[allow(
        clippy::missing_inline_in_public_items,
        reason = "Large function, called once per request"
    )]
    pub fn add_book(&mut self, payload: BookPayload) -> Result<String, StoreError> {
        let fields = payload.into_fields().inspect_err(|err| {
            warn!("Rejected new book: {err}");
        })?;

        let id = self.fresh_id();
        let book = Book::create(id.clone(), fields, Utc::now());
        self.books.push(book);

        // The append itself cannot fail, check anyway that the book landed at the tail
        if self.books.last().is_none_or(|book| book.id != id) {
            error!("Book {id} missing from store after insert");
            return Err(StoreError::Persistence(id));
        }

        debug!("Added book {id}, {} books on shelf", self.books.len());
        Ok(id)
    }

    /// Summaries of all books matching the query, in shelf order. Recognized filters are
    /// combined, so a book must satisfy each of them to be listed.
    #[must_use]
    #[allow(
        clippy::missing_inline_in_public_items,
        reason = "Called once per request"
    )]
    pub fn list_books(&self, query: &BookQuery) -> Vec<BookSummary> {
        let filter = BookFilter::from_query(query);
        if filter.is_empty() {
            return self.books.iter().map(Book::summary).collect();
        }
        self.books
            .iter()
            .filter(|book| filter.matches(book))
            .map(Book::summary)
            .collect()
    }

    /// # Errors
    /// Returns `StoreError::NotFound` if no book has the given id.
    #[inline]
    pub fn get_book(&self, id: &str) -> Result<&Book, StoreError> {
        self.books
            .iter()
            .find(|book| book.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_owned()))
    }

    /// Replaces every field of the book except its id and insertion time.
    ///
    /// The payload is validated before the book is looked up, so an invalid payload is reported
    /// even for an unknown id.
    /// # Errors
    /// Returns `StoreError::Validation` under the same rules as [`Self::add_book`] and
    /// `StoreError::NotFound` if no book has the given id.
    #[allow(
        clippy::missing_inline_in_public_items,
        reason = "Called once per request"
    )]
    pub fn update_book(&mut self, id: &str, payload: BookPayload) -> Result<(), StoreError> {
        let fields = payload.into_fields().inspect_err(|err| {
            warn!("Rejected update of book {id}: {err}");
        })?;

        let Some(book) = self.books.iter_mut().find(|book| book.id == id) else {
            warn!("Cannot update book {id}, not on shelf");
            return Err(StoreError::NotFound(id.to_owned()));
        };
        book.apply(fields, Utc::now());

        debug!("Updated book {id}");
        Ok(())
    }

    /// Removes the book from the shelf, keeping the order of the remaining books.
    /// # Errors
    /// Returns `StoreError::NotFound` if no book has the given id.
    #[allow(
        clippy::missing_inline_in_public_items,
        reason = "Called once per request"
    )]
    pub fn delete_book(&mut self, id: &str) -> Result<Book, StoreError> {
        let Some(index) = self.books.iter().position(|book| book.id == id) else {
            warn!("Cannot delete book {id}, not on shelf");
            return Err(StoreError::NotFound(id.to_owned()));
        };
        let removed = self.books.remove(index);

        debug!("Deleted book {id}, {} books on shelf", self.books.len());
        Ok(removed)
    }

    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.books.len()
    }

    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// All books in shelf order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Book> {
        self.books.iter()
    }

    /// Draws ids until one is not taken yet.
    fn fresh_id(&mut self) -> String {
        loop {
            let id = self.ids.next_id();
            if self.books.iter().all(|book| book.id != id) {
                return id;
            }
            warn!("Generated id {id} already taken, drawing another");
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "Tests are predefined and guaranteed to be Some/Ok"
)]
mod tests {
    use super::*;
    use crate::store::errors::ValidationError;
    use crate::store::id::SequentialIdGenerator;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn store() -> BookStore {
        BookStore::with_id_generator(SequentialIdGenerator::default())
    }

    fn payload(name: &str, page_count: u32, read_page: u32, reading: bool) -> BookPayload {
        BookPayload {
            reading,
            publisher: Some(json!(format!("{name} Press"))),
            ..BookPayload::new(name, page_count, read_page)
        }
    }

    fn ids(summaries: &[BookSummary]) -> Vec<&str> {
        summaries.iter().map(|summary| summary.id.as_str()).collect()
    }

    /// Hands out a fixed list of ids in order
    struct ScriptedIds(Vec<&'static str>);

    impl IdGenerator for ScriptedIds {
        fn next_id(&mut self) -> String {
            self.0.remove(0).to_owned()
        }
    }

    #[test]
    fn add_book_fully_read_is_finished() {
        let mut store = store();
        let id = store.add_book(BookPayload::new("Go", 100, 100)).unwrap();

        let book = store.get_book(&id).unwrap();
        assert!(book.finished);
        assert_eq!(book.inserted_at, book.updated_at);
        assert_eq!(book.name, "Go");
    }

    #[test]
    fn add_book_partially_read_is_not_finished() {
        let mut store = store();
        let id = store.add_book(BookPayload::new("Go", 100, 40)).unwrap();
        assert!(!store.get_book(&id).unwrap().finished);
    }

    #[test]
    fn add_book_rejects_empty_name_without_change() {
        let mut store = store();
        store.add_book(BookPayload::new("Kept", 10, 0)).unwrap();

        let result = store.add_book(BookPayload::new("", 10, 0));
        assert_eq!(
            result,
            Err(StoreError::Validation(ValidationError::NameRequired))
        );
        assert_eq!(store.len(), 1);

        let result = store.add_book(BookPayload {
            page_count: 10,
            ..BookPayload::default()
        });
        assert_eq!(
            result,
            Err(StoreError::Validation(ValidationError::NameRequired))
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn add_book_rejects_read_page_past_page_count_without_change() {
        let mut store = store();
        let result = store.add_book(BookPayload::new("X", 10, 20));
        assert_eq!(
            result,
            Err(StoreError::Validation(
                ValidationError::ReadPageExceedsPageCount {
                    read_page: 20,
                    page_count: 10
                }
            ))
        );
        assert!(store.is_empty());
    }

    #[test]
    fn added_book_is_listed() {
        let mut store = store();
        let id = store.add_book(payload("Dune", 412, 0, true)).unwrap();

        let listed = store.list_books(&BookQuery::default());
        assert_eq!(
            listed,
            vec![BookSummary {
                id,
                name: "Dune".to_owned(),
                publisher: Some(json!("Dune Press")),
            }]
        );
    }

    #[test]
    fn list_without_filter_keeps_insertion_order() {
        let mut store = store();
        let first = store.add_book(payload("One", 10, 0, false)).unwrap();
        let second = store.add_book(payload("Two", 10, 0, false)).unwrap();
        let third = store.add_book(payload("Three", 10, 0, false)).unwrap();

        let listed = store.list_books(&BookQuery::default());
        assert_eq!(
            ids(&listed),
            vec![first.as_str(), second.as_str(), third.as_str()]
        );
    }

    #[test]
    fn list_by_name_is_case_insensitive_substring() {
        let mut store = store();
        let potter = store
            .add_book(payload("Harry Potter", 300, 0, false))
            .unwrap();
        store.add_book(payload("Dune", 412, 0, false)).unwrap();

        let listed = store.list_books(&BookQuery::by_name("potter"));
        assert_eq!(ids(&listed), vec![potter.as_str()]);

        let listed = store.list_books(&BookQuery::by_name("HARRY"));
        assert_eq!(ids(&listed), vec![potter.as_str()]);

        assert!(store.list_books(&BookQuery::by_name("hobbit")).is_empty());
    }

    #[test]
    fn list_by_reading_flag() {
        let mut store = store();
        let reading = store.add_book(payload("A", 10, 1, true)).unwrap();
        let idle = store.add_book(payload("B", 10, 1, false)).unwrap();
        let also_reading = store.add_book(payload("C", 10, 1, true)).unwrap();

        let listed = store.list_books(&BookQuery::by_reading("1"));
        assert_eq!(ids(&listed), vec![reading.as_str(), also_reading.as_str()]);

        let listed = store.list_books(&BookQuery::by_reading("0"));
        assert_eq!(ids(&listed), vec![idle.as_str()]);

        // Unknown literals fall through to the full listing
        let listed = store.list_books(&BookQuery::by_reading("true"));
        assert_eq!(listed.len(), 3);
    }

    #[test]
    fn list_by_finished_flag() {
        let mut store = store();
        let done = store.add_book(payload("Done", 10, 10, false)).unwrap();
        let open = store.add_book(payload("Open", 10, 3, true)).unwrap();

        let listed = store.list_books(&BookQuery::by_finished("1"));
        assert_eq!(ids(&listed), vec![done.as_str()]);

        let listed = store.list_books(&BookQuery::by_finished("0"));
        assert_eq!(ids(&listed), vec![open.as_str()]);
    }

    #[test]
    fn list_filters_combine() {
        let mut store = store();
        let wanted = store
            .add_book(payload("Rust in Action", 400, 20, true))
            .unwrap();
        store
            .add_book(payload("Rust for Rustaceans", 280, 0, false))
            .unwrap();
        store.add_book(payload("Dune", 412, 5, true)).unwrap();

        let query = BookQuery {
            name: Some("rust".to_owned()),
            reading: Some("1".to_owned()),
            finished: Some("0".to_owned()),
        };
        let listed = store.list_books(&query);
        assert_eq!(ids(&listed), vec![wanted.as_str()]);
    }

    #[test]
    fn get_unknown_id_is_not_found() {
        let mut store = store();
        store.add_book(BookPayload::new("Go", 100, 0)).unwrap();
        assert_eq!(
            store.get_book("never-issued"),
            Err(StoreError::NotFound("never-issued".to_owned()))
        );
    }

    #[test]
    fn update_replaces_fields_and_recomputes_finished() {
        let mut store = store();
        let id = store.add_book(payload("Draft", 100, 10, true)).unwrap();
        let before = store.get_book(&id).unwrap().clone();

        let update = BookPayload {
            year: Some(json!("2021")),
            author: Some(json!("Someone")),
            summary: Some(json!("Finally done")),
            publisher: None,
            reading: false,
            ..BookPayload::new("Final", 200, 200)
        };
        store.update_book(&id, update).unwrap();

        let after = store.get_book(&id).unwrap();
        assert_eq!(after.id, before.id);
        assert_eq!(after.inserted_at, before.inserted_at);
        assert!(after.updated_at >= before.updated_at);
        assert_eq!(after.name, "Final");
        assert_eq!(after.year, Some(json!("2021")));
        assert_eq!(after.author, Some(json!("Someone")));
        assert_eq!(after.summary, Some(json!("Finally done")));
        assert_eq!(after.publisher, None);
        assert_eq!((after.page_count, after.read_page), (200, 200));
        assert!(after.finished);
        assert!(!after.reading);
    }

    #[test]
    fn update_unfinishes_book_when_pages_added() {
        let mut store = store();
        let id = store.add_book(BookPayload::new("Go", 100, 100)).unwrap();
        store
            .update_book(&id, BookPayload::new("Go", 120, 100))
            .unwrap();
        assert!(!store.get_book(&id).unwrap().finished);
    }

    #[test]
    fn update_applies_same_page_rule_as_add() {
        let mut store = store();
        let id = store.add_book(BookPayload::new("Go", 100, 0)).unwrap();

        let result = store.update_book(&id, BookPayload::new("Go", 100, 101));
        assert_eq!(
            result,
            Err(StoreError::Validation(
                ValidationError::ReadPageExceedsPageCount {
                    read_page: 101,
                    page_count: 100
                }
            ))
        );
        assert_eq!(store.get_book(&id).unwrap().read_page, 0);
    }

    #[test]
    fn update_rejects_empty_name() {
        let mut store = store();
        let id = store.add_book(BookPayload::new("Go", 100, 0)).unwrap();
        let result = store.update_book(&id, BookPayload::new("", 100, 0));
        assert_eq!(
            result,
            Err(StoreError::Validation(ValidationError::NameRequired))
        );
        assert_eq!(store.get_book(&id).unwrap().name, "Go");
    }

    #[test]
    fn update_unknown_id_is_not_found_and_changes_nothing() {
        let mut store = store();
        let id = store.add_book(BookPayload::new("Go", 100, 0)).unwrap();
        let before: Vec<Book> = store.iter().cloned().collect();

        let result = store.update_book("missing", BookPayload::new("Other", 10, 0));
        assert_eq!(result, Err(StoreError::NotFound("missing".to_owned())));

        let after: Vec<Book> = store.iter().cloned().collect();
        assert_eq!(after, before);
        assert_eq!(store.get_book(&id).unwrap().name, "Go");
    }

    #[test]
    fn update_validates_before_lookup() {
        let mut store = store();
        let result = store.update_book("missing", BookPayload::new("", 10, 0));
        assert_eq!(
            result,
            Err(StoreError::Validation(ValidationError::NameRequired))
        );
    }

    #[test]
    fn delete_removes_exactly_one_and_keeps_order() {
        let mut store = store();
        let first = store.add_book(BookPayload::new("One", 10, 0)).unwrap();
        let second = store.add_book(BookPayload::new("Two", 10, 0)).unwrap();
        let third = store.add_book(BookPayload::new("Three", 10, 0)).unwrap();

        let removed = store.delete_book(&second).unwrap();
        assert_eq!(removed.id, second);
        assert_eq!(store.len(), 2);

        let listed = store.list_books(&BookQuery::default());
        assert_eq!(ids(&listed), vec![first.as_str(), third.as_str()]);
        assert!(store.get_book(&second).is_err());
    }

    #[test]
    fn delete_unknown_id_is_not_found() {
        let mut store = store();
        store.add_book(BookPayload::new("One", 10, 0)).unwrap();
        assert_eq!(
            store.delete_book("missing"),
            Err(StoreError::NotFound("missing".to_owned()))
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn ids_are_never_reused_after_collision() {
        let mut store =
            BookStore::with_id_generator(ScriptedIds(vec!["aaaa", "aaaa", "bbbb"]));
        let first = store.add_book(BookPayload::new("One", 10, 0)).unwrap();
        let second = store.add_book(BookPayload::new("Two", 10, 0)).unwrap();
        assert_eq!(first, "aaaa");
        assert_eq!(second, "bbbb");
    }

    #[test]
    fn random_ids_are_unique_across_shelf() {
        let mut store = BookStore::new();
        for index in 0..50 {
            store
                .add_book(BookPayload::new(&format!("Book {index}"), 10, 0))
                .unwrap();
        }
        let mut issued: Vec<&str> = store.iter().map(|book| book.id.as_str()).collect();
        issued.sort_unstable();
        issued.dedup();
        assert_eq!(issued.len(), 50);
    }
}
