//! SeaORM-backed implementations of the contracts.

mod connection;
mod query;

pub use connection::{ConnectionAdapter, OrmHandle};
pub use query::QueryAdapter;
