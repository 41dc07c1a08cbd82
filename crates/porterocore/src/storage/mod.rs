//! SQLite persistence: pool, migrations, and the row stores.

pub mod catalog;
pub mod db;
pub mod files;
pub mod ledger;
pub mod migrations;
pub mod settings;

pub use db::{create_pool, get_connection, DbConnection, DbPool};
