//! Database layer - the SQLite store, table definitions and batched writes

pub mod schema;
pub mod store;
pub mod writer;

pub use schema::{LOAD_ORDER, TableDef, recreate_tables};
pub use store::Store;
pub use writer::{InsertTemplate, TableWriter};
