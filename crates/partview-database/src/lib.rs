//! # partview-database
//!
//! Record store abstraction for PartView with a PostgreSQL implementation
//! (sqlx) and a process-local in-memory implementation used for
//! development and tests.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryStore;
pub use store::{NoteStore, RecordStore, Stores};
