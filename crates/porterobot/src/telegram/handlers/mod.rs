//! Dispatcher schema and handler chain

pub mod commands;
pub mod purchase;
pub mod schema;
pub mod types;

pub use schema::schema;
pub use types::{HandlerDeps, HandlerError};
