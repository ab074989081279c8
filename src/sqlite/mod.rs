// SQLite back-end
//
// - config: connection options and builder
// - connection: opening, transactions, batches and catalog lookups
// - statement: compiled statements backed by rusqlite's statement cache
// - params: binding values to rusqlite
// - result: buffered rows

pub mod config;
pub mod connection;
pub mod params;
pub mod result;
pub mod statement;

pub use config::{SqliteOptions, SqliteOptionsBuilder};
pub use connection::SqliteDatabase;
pub use result::SqliteRows;
pub use statement::SqliteStatement;
