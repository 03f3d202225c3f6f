//! Book store
//!
//! The module exposes the `BookStore` struct and its methods to add, list, fetch, update and
//! delete books held in memory.
pub mod book_store;
pub mod errors;
pub mod filter;
pub mod id;
pub mod types;
