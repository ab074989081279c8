// PostgreSQL back-end
//
// - config: connection options and builder
// - connection: client, private runtime, transactions and catalog lookups
// - statement: statements prepared with declared parameter types
// - params: binding values (including large objects) to tokio-postgres
// - result: rows converted to the value model

pub mod config;
pub mod connection;
pub mod params;
pub mod result;
pub mod statement;

pub use config::{PostgresOptions, PostgresOptionsBuilder};
pub use connection::PostgresDatabase;
pub use result::PostgresRows;
pub use statement::PostgresStatement;
