//! `bookshelf_core`
//!
//! Core library for the platform-independent logic of the bookshelf service: the in-memory book
//! store, its validation rules and list filters. The crate does no I/O, so it can be driven by the
//! network server as well as by tests or other front ends.

pub mod store;

pub use store::book_store::BookStore;
pub use store::errors::{StoreError, ValidationError};
pub use store::id::{IdGenerator, RandomIdGenerator, SequentialIdGenerator};
pub use store::types::{Book, BookPayload, BookQuery, BookSummary, is_finished};
