//! ipop - a thin abstraction over SeaORM connections and queries
//!
//! This crate puts a trait boundary between application code and the
//! database: services and repositories depend on the [`Connection`] and
//! [`Query`] contracts instead of on [`sea_orm::DatabaseConnection`], so
//! every database-touching code path can be unit-tested against the mock
//! implementations without a running database.
//!
//! # Modules
//!
//! - **connection**: The [`Connection`] contract (CRUD, transactions,
//!   migrations, table maintenance)
//! - **query**: The chainable [`Query`] contract
//! - **adapter**: SeaORM-backed implementations of both contracts
//! - **mock**: Configurable in-memory implementations for tests (behind the
//!   `mocks` feature outside of this crate's own tests)
//! - **types**: Shared types (pagination)
//! - **error**: Centralized error handling
//!
//! # Usage
//!
//! ```ignore
//! let conn = ConnectionAdapter::connect("sqlite::memory:").await?;
//! conn.migrate_up::<Migrator>(None).await?;
//!
//! let team = conn.validate_and_create::<team::Model, team::ActiveModel>(team).await?;
//! let big = conn
//!     .q::<team::Entity>()
//!     .filter("size > ?", vec![10.into()])
//!     .order_by("name", Order::Asc)
//!     .all()
//!     .await?;
//! ```

pub mod adapter;
pub mod connection;
pub mod error;
#[cfg(any(test, feature = "mocks"))]
pub mod mock;
pub mod query;
pub mod types;

// Re-export commonly used types at crate root
pub use adapter::{ConnectionAdapter, QueryAdapter};
pub use connection::Connection;
pub use error::{Error, OptionExt, Result};
#[cfg(any(test, feature = "mocks"))]
pub use mock::{MockConnection, MockQuery};
pub use query::Query;
pub use types::PaginationParams;
