//! The abstract query contract.
//!
//! A [`Query`] is an in-progress, chainable query bound to one SeaORM entity.
//! Builder methods consume and return `Self` so clauses can be chained;
//! terminal methods execute against the database and return results or errors
//! exactly as SeaORM defines them.
//!
//! Clause arguments are raw SQL fragments with `?` placeholders, bound to
//! [`sea_orm::Value`] parameters, so the contract stays independent of any
//! one entity's column enum:
//!
//! ```ignore
//! let teams = conn
//!     .q::<team::Entity>()
//!     .filter("name like ?", vec!["Team%".into()])
//!     .order_by("id", Order::Desc)
//!     .limit(10)
//!     .all()
//!     .await?;
//! ```

use async_trait::async_trait;
use sea_orm::{EntityTrait, JoinType, Order, PrimaryKeyTrait, Statement, Value};

use crate::error::Result;
use crate::types::PaginationParams;

/// Chainable query builder over the entity `E`.
///
/// Implemented by the SeaORM-backed [`QueryAdapter`](crate::adapter::QueryAdapter)
/// and by [`MockQuery`](crate::mock::MockQuery) for tests.
#[async_trait]
pub trait Query<E>: Sized + Send
where
    E: EntityTrait + 'static,
    E::Model: Send + Sync,
{
    /// Append a where clause. Use `?` in place of arguments.
    ///
    /// ```ignore
    /// q.filter("id in (?, ?, ?)", vec![1.into(), 2.into(), 3.into()])
    /// ```
    fn filter(self, stmt: &str, values: Vec<Value>) -> Self;

    /// Append an order clause for the given expression.
    fn order_by(self, expr: &str, order: Order) -> Self;

    /// Add a limit clause.
    fn limit(self, limit: u64) -> Self;

    /// Add an offset clause.
    fn offset(self, offset: u64) -> Self;

    /// Query only the given columns instead of the full entity row.
    fn select_only(self, columns: &[&str]) -> Self;

    /// Append a GROUP BY clause.
    fn group_by(self, fields: &[&str]) -> Self;

    /// Append a HAVING clause. Use `?` in place of arguments.
    fn having(self, stmt: &str, values: Vec<Value>) -> Self;

    /// Append a join clause of the given kind against `table`, with a raw
    /// `on` condition. Use `?` in place of arguments.
    fn join(self, kind: JoinType, table: &str, on: &str, values: Vec<Value>) -> Self;

    fn inner_join(self, table: &str, on: &str, values: Vec<Value>) -> Self {
        self.join(JoinType::InnerJoin, table, on, values)
    }

    fn left_join(self, table: &str, on: &str, values: Vec<Value>) -> Self {
        self.join(JoinType::LeftJoin, table, on, values)
    }

    fn right_join(self, table: &str, on: &str, values: Vec<Value>) -> Self {
        self.join(JoinType::RightJoin, table, on, values)
    }

    /// Restrict the query to one page of results. Pages are 1-based.
    fn paginate(self, page: u64, per_page: u64) -> Self {
        let page = page.max(1);
        self.limit(per_page).offset((page - 1) * per_page)
    }

    /// Restrict the query to the page described by `params`.
    fn paginate_params(self, params: &PaginationParams) -> Self {
        self.limit(params.limit()).offset(params.offset())
    }

    /// Apply a reusable scope to the query.
    ///
    /// ```ignore
    /// fn by_name<Q: Query<team::Entity>>(name: &str) -> impl FnOnce(Q) -> Q + '_ {
    ///     move |q| q.filter("name = ?", vec![name.into()])
    /// }
    ///
    /// conn.q::<team::Entity>().scope(by_name("mark")).all().await?;
    /// ```
    fn scope<F>(self, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        f(self)
    }

    /// The SQL statement and bound values this query would execute.
    fn to_statement(&self) -> Statement;

    /// Retrieve all records matching the query.
    async fn all(self) -> Result<Vec<E::Model>>;

    /// The first record matching the query, if any.
    async fn one(self) -> Result<Option<E::Model>>;

    /// The last record matching the query (primary key descending), if any.
    async fn last(self) -> Result<Option<E::Model>>;

    /// The record with the given primary key that also matches the query.
    async fn find(
        self,
        id: <E::PrimaryKey as PrimaryKeyTrait>::ValueType,
    ) -> Result<Option<E::Model>>;

    /// Count the records matching the query.
    async fn count(self) -> Result<u64>;

    /// Count the records matching the query, for a given field.
    async fn count_by_field(self, field: &str) -> Result<u64>;

    /// Whether any record matches the query.
    async fn exists(self) -> Result<bool>;

    /// Run the query, discarding any result rows.
    async fn exec(self) -> Result<()> {
        self.exec_with_count().await.map(|_| ())
    }

    /// Run the query and return the number of affected rows.
    async fn exec_with_count(self) -> Result<u64>;
}
