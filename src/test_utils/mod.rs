//! Test doubles for exercising the manager without a database server.
//!
//! Enabled by the `test-utils` feature.

mod scripted;

pub use scripted::{ScriptedBackend, ScriptedDatabase, ScriptedStatement};
