//! Persisted state: the file-backed to-do list.

pub mod todo_store;

pub use todo_store::{StoreError, TodoStore};
