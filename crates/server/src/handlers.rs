use crate::protocol::Request;
use crate::response::{BAD_REQUEST, CREATED, NOT_FOUND, OK, Reply, ResponseData};
use crate::state::AppState;
use bookshelf_core::{BookPayload, BookQuery, StoreError, ValidationError};
use tracing::instrument;

/// Routes a decoded request to its handler.
#[inline]
pub async fn dispatch(state: &AppState, request: Request) -> Reply {
    match request {
        Request::AddBook { payload } => add_book(state, payload).await,
        Request::ListBooks { query } => list_books(state, &query).await,
        Request::GetBook { book_id } => get_book(state, &book_id).await,
        Request::EditBook { book_id, payload } => edit_book(state, &book_id, payload).await,
        Request::DeleteBook { book_id } => delete_book(state, &book_id).await,
    }
}

#[instrument(name = "op.add_book", skip_all, fields(name = ?payload.name))]
#[allow(
    clippy::missing_inline_in_public_items,
    reason = "Called once per request"
)]
pub async fn add_book(state: &AppState, payload: BookPayload) -> Reply {
    let result = state.store.write().await.add_book(payload);
    match result {
        Ok(book_id) => {
            tracing::info!(%book_id, "book added");
            Reply::success(
                CREATED,
                Some("Book added successfully"),
                Some(ResponseData::BookId { book_id }),
            )
        }
        Err(StoreError::Validation(err)) => {
            Reply::fail(BAD_REQUEST, validation_message("add", &err))
        }
        Err(err) => {
            tracing::error!("Failed to add book: {err}");
            Reply::error("Failed to add book")
        }
    }
}

#[instrument(name = "op.list_books", skip(state))]
#[allow(
    clippy::missing_inline_in_public_items,
    reason = "Called once per request"
)]
pub async fn list_books(state: &AppState, query: &BookQuery) -> Reply {
    let books = state.store.read().await.list_books(query);
    tracing::debug!(count = books.len(), "books listed");
    Reply::success(OK, None, Some(ResponseData::Books { books }))
}

#[instrument(name = "op.get_book", skip(state))]
#[allow(
    clippy::missing_inline_in_public_items,
    reason = "Called once per request"
)]
pub async fn get_book(state: &AppState, book_id: &str) -> Reply {
    let read_guard = state.store.read().await;
    match read_guard.get_book(book_id) {
        Ok(book) => Reply::success(OK, None, Some(ResponseData::Book { book: book.clone() })),
        Err(err) => {
            tracing::info!("{err}");
            Reply::fail(NOT_FOUND, "Book not found")
        }
    }
}

#[instrument(name = "op.edit_book", skip(state, payload))]
#[allow(
    clippy::missing_inline_in_public_items,
    reason = "Called once per request"
)]
pub async fn edit_book(state: &AppState, book_id: &str, payload: BookPayload) -> Reply {
    let result = state.store.write().await.update_book(book_id, payload);
    match result {
        Ok(()) => {
            tracing::info!("book updated");
            Reply::success(OK, Some("Book updated successfully"), None)
        }
        Err(StoreError::Validation(err)) => {
            Reply::fail(BAD_REQUEST, validation_message("update", &err))
        }
        Err(StoreError::NotFound(_)) => {
            Reply::fail(NOT_FOUND, "Failed to update book. Id not found")
        }
        Err(err) => {
            tracing::error!("Failed to update book: {err}");
            Reply::error("Failed to update book")
        }
    }
}

#[instrument(name = "op.delete_book", skip(state))]
#[allow(
    clippy::missing_inline_in_public_items,
    reason = "Called once per request"
)]
pub async fn delete_book(state: &AppState, book_id: &str) -> Reply {
    let result = state.store.write().await.delete_book(book_id);
    match result {
        Ok(removed) => {
            tracing::info!(name = %removed.name, "book deleted");
            Reply::success(OK, Some("Book deleted successfully"), None)
        }
        Err(StoreError::NotFound(_)) => {
            Reply::fail(NOT_FOUND, "Failed to delete book. Id not found")
        }
        Err(err) => {
            tracing::error!("Failed to delete book: {err}");
            Reply::error("Failed to delete book")
        }
    }
}

/// Client-facing text for a rejected payload, e.g. "Failed to add book. Please provide the book
/// name".
fn validation_message(action: &str, err: &ValidationError) -> String {
    tracing::warn!("Rejected payload: {err}");
    match err {
        ValidationError::NameRequired => {
            format!("Failed to {action} book. Please provide the book name")
        }
        ValidationError::ReadPageExceedsPageCount { .. } => {
            format!("Failed to {action} book. readPage must not be greater than pageCount")
        }
        _ => format!("Failed to {action} book. {err}"),
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::panic,
    reason = "Tests are predefined and guaranteed to be Some/Ok"
)]
mod tests {
    use super::*;
    use crate::response::ResponseBody;
    use bookshelf_core::{BookStore, SequentialIdGenerator};
    use pretty_assertions::assert_eq;

    fn state() -> AppState {
        AppState::with_store(BookStore::with_id_generator(
            SequentialIdGenerator::default(),
        ))
    }

    fn book_id(reply: &Reply) -> String {
        match reply.data() {
            Some(ResponseData::BookId { book_id }) => book_id.clone(),
            other => panic!("expected book id, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn add_book_replies_created_with_id() {
        let state = state();
        let reply = add_book(&state, BookPayload::new("Go", 100, 100)).await;

        assert_eq!(reply.code, CREATED);
        assert_eq!(reply.message(), Some("Book added successfully"));
        assert_eq!(book_id(&reply), "book000000000001");
        assert_eq!(state.book_count().await, 1);
    }

    #[tokio::test]
    async fn add_book_without_name_fails() {
        let state = state();
        let reply = add_book(&state, BookPayload::new("", 10, 0)).await;

        assert_eq!(
            reply,
            Reply::fail(
                BAD_REQUEST,
                "Failed to add book. Please provide the book name"
            )
        );
        assert_eq!(state.book_count().await, 0);
    }

    #[tokio::test]
    async fn add_book_with_too_many_read_pages_fails() {
        let state = state();
        let reply = add_book(&state, BookPayload::new("X", 10, 20)).await;

        assert_eq!(
            reply,
            Reply::fail(
                BAD_REQUEST,
                "Failed to add book. readPage must not be greater than pageCount"
            )
        );
        assert_eq!(state.book_count().await, 0);
    }

    #[tokio::test]
    async fn list_books_returns_summaries() {
        let state = state();
        add_book(&state, BookPayload::new("Harry Potter", 300, 0)).await;
        add_book(&state, BookPayload::new("Dune", 412, 412)).await;

        let reply = list_books(&state, &BookQuery::by_name("potter")).await;
        assert_eq!(reply.code, OK);
        let Some(ResponseData::Books { books }) = reply.data() else {
            panic!("expected books, got {reply:?}");
        };
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].name, "Harry Potter");

        let reply = list_books(&state, &BookQuery::by_finished("1")).await;
        let Some(ResponseData::Books { books }) = reply.data() else {
            panic!("expected books, got {reply:?}");
        };
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].name, "Dune");
    }

    #[tokio::test]
    async fn get_book_returns_full_record_or_not_found() {
        let state = state();
        let id = book_id(&add_book(&state, BookPayload::new("Go", 100, 10)).await);

        let reply = get_book(&state, &id).await;
        assert_eq!(reply.code, OK);
        let Some(ResponseData::Book { book }) = reply.data() else {
            panic!("expected book, got {reply:?}");
        };
        assert_eq!(book.id, id);
        assert_eq!((book.page_count, book.read_page), (100, 10));

        let reply = get_book(&state, "unknown").await;
        assert_eq!(reply, Reply::fail(NOT_FOUND, "Book not found"));
    }

    #[tokio::test]
    async fn edit_book_outcomes() {
        let state = state();
        let id = book_id(&add_book(&state, BookPayload::new("Go", 100, 10)).await);

        let reply = edit_book(&state, &id, BookPayload::new("Go 2", 100, 100)).await;
        assert_eq!(
            reply,
            Reply::success(OK, Some("Book updated successfully"), None)
        );

        let reply = edit_book(&state, &id, BookPayload::new("", 100, 100)).await;
        assert_eq!(
            reply,
            Reply::fail(
                BAD_REQUEST,
                "Failed to update book. Please provide the book name"
            )
        );

        let reply = edit_book(&state, &id, BookPayload::new("Go", 100, 101)).await;
        assert_eq!(
            reply,
            Reply::fail(
                BAD_REQUEST,
                "Failed to update book. readPage must not be greater than pageCount"
            )
        );

        let reply = edit_book(&state, "unknown", BookPayload::new("Go", 100, 0)).await;
        assert_eq!(
            reply,
            Reply::fail(NOT_FOUND, "Failed to update book. Id not found")
        );

        let stored = state.store.read().await.get_book(&id).unwrap().clone();
        assert_eq!(stored.name, "Go 2");
        assert!(stored.finished);
    }

    #[tokio::test]
    async fn delete_book_outcomes() {
        let state = state();
        let id = book_id(&add_book(&state, BookPayload::new("Go", 100, 10)).await);

        let reply = delete_book(&state, "unknown").await;
        assert_eq!(
            reply,
            Reply::fail(NOT_FOUND, "Failed to delete book. Id not found")
        );
        assert_eq!(state.book_count().await, 1);

        let reply = delete_book(&state, &id).await;
        assert_eq!(
            reply,
            Reply::success(OK, Some("Book deleted successfully"), None)
        );
        assert_eq!(state.book_count().await, 0);
    }

    #[tokio::test]
    async fn dispatch_routes_by_op() {
        let state = state();
        let reply = dispatch(
            &state,
            Request::AddBook {
                payload: BookPayload::new("Go", 1, 0),
            },
        )
        .await;
        assert_eq!(reply.code, CREATED);

        let reply = dispatch(
            &state,
            Request::GetBook {
                book_id: "missing".to_owned(),
            },
        )
        .await;
        assert!(matches!(reply.body, ResponseBody::Fail { .. }));
    }
}
