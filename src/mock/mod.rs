//! Mock implementations of the contracts for unit testing.
//!
//! [`MockConnection`] and [`MockQuery`] implement [`Connection`](crate::Connection)
//! and [`Query`](crate::Query) without a database. Every method consults an
//! injectable override closure and falls back to an innocuous default (empty
//! vector, `None`, zero count, placeholder statement) when none is
//! configured. Builder calls on `MockQuery` are recorded so tests can assert
//! the clause chain, and `MockConnection` keeps a log of the methods invoked
//! on it.
//!
//! Overrides for generic methods are keyed by the entity or active-model
//! type, so one mock can serve several entities:
//!
//! ```ignore
//! let conn = MockConnection::new();
//! conn.on_create::<team::ActiveModel>(|_| Err(Error::NotFound));
//! conn.expect_query(MockQuery::<team::Entity>::new().on_count(|_| Ok(7)));
//! ```

mod connection;
mod query;

pub use connection::MockConnection;
pub use query::{Clause, MockQuery};

#[cfg(test)]
pub(crate) mod widget {
    //! Throwaway entity for the mock unit tests.

    use sea_orm::entity::prelude::*;
    use validator::Validate;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Validate)]
    #[sea_orm(table_name = "widgets")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        #[validate(length(min = 1, message = "name must not be empty"))]
        pub name: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}
