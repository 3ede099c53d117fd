//! The abstract connection contract.
//!
//! Application code depends on [`Connection`] instead of on
//! [`sea_orm::DatabaseConnection`], so everything touching the database can
//! be unit-tested against [`MockConnection`](crate::mock::MockConnection).
//!
//! The contract deliberately introduces no semantics of its own: every
//! operation behaves exactly as the corresponding SeaORM call, with
//! connection and transaction values wrapped back into the abstract type so
//! callers never see the concrete handle.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, DatabaseBackend, EntityTrait, IdenStatic,
    IntoActiveModel, Iterable, Order, PrimaryKeyToColumn, PrimaryKeyTrait, Related,
    TryIntoModel, Value,
};
use sea_orm_migration::MigratorTrait;
use validator::Validate;

use crate::error::Result;
use crate::query::Query;
use crate::types::PaginationParams;

/// A database session: CRUD, querying, pagination, transactions, and
/// migrations.
///
/// Record-touching operations are generic over the SeaORM entity or active
/// model, the way repository traits usually are; consumers take
/// `C: Connection` rather than a trait object. Query construction goes
/// through the associated [`Select`](Connection::Select) builder, and the
/// retrieval conveniences (`find`, `first`, `all`, ...) are provided methods
/// over it, so adapters and mocks only implement the seams that actually
/// differ.
#[async_trait]
pub trait Connection: Send + Sync {
    /// The connection type callbacks receive inside [`transaction`](Connection::transaction).
    type Tx: Connection;

    /// The query builder produced by [`q`](Connection::q).
    type Select<'a, E>: Query<E> + Send + 'a
    where
        Self: 'a,
        E: EntityTrait + 'static,
        E::Model: Send + Sync;

    /// The database backend behind this connection.
    fn backend(&self) -> DatabaseBackend;

    /// The datasource connection string, when known.
    fn url(&self) -> Option<&str>;

    /// The name of the table used to track migrations.
    fn migration_table_name(&self) -> &'static str;

    /// Check connectivity by executing a trivial query.
    async fn ping(&self) -> Result<()>;

    /// Release the session. Closing a transaction handle rolls it back.
    async fn close(self) -> Result<()>
    where
        Self: Sized;

    /// Start a new transaction on the connection.
    async fn begin(&self) -> Result<Self::Tx>;

    /// Run `f` inside a transaction. If `f` returns an error the transaction
    /// is rolled back, otherwise it commits when `f` returns.
    async fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: for<'c> FnOnce(
                &'c Self::Tx,
            ) -> Pin<Box<dyn Future<Output = Result<T>> + Send + 'c>>
            + Send,
        T: Send;

    /// Run `f` inside a transaction that is rolled back when `f` returns,
    /// regardless of its result. Useful for tests.
    async fn rollback<F, T>(&self, f: F) -> Result<T>
    where
        F: for<'c> FnOnce(
                &'c Self::Tx,
            ) -> Pin<Box<dyn Future<Output = Result<T>> + Send + 'c>>
            + Send,
        T: Send;

    /// Erase all rows from every user table in the datasource. The migration
    /// bookkeeping table is left alone.
    async fn truncate_all(&self) -> Result<()>;

    /// Erase all rows from the entity's table.
    async fn truncate<E>(&self) -> Result<()>
    where
        E: EntityTrait + 'static;

    /// Create a new "empty" query for the current connection.
    fn q<'a, E>(&'a self) -> Self::Select<'a, E>
    where
        E: EntityTrait + 'static,
        E::Model: Send + Sync;

    /// Create a query from a raw SQL statement, keeping the `?` argument
    /// syntax.
    ///
    /// ```ignore
    /// conn.raw::<team::Entity>("select * from teams where id = ?", vec![1.into()])
    /// ```
    fn raw<'a, E>(&'a self, stmt: &str, values: Vec<Value>) -> Self::Select<'a, E>
    where
        E: EntityTrait + 'static,
        E::Model: Send + Sync;

    /// Append a where clause to a fresh query. Use `?` in place of arguments.
    fn filter<'a, E>(&'a self, stmt: &str, values: Vec<Value>) -> Self::Select<'a, E>
    where
        E: EntityTrait + 'static,
        E::Model: Send + Sync,
    {
        self.q::<E>().filter(stmt, values)
    }

    /// Append an order clause to a fresh query.
    fn order<'a, E>(&'a self, expr: &str, order: Order) -> Self::Select<'a, E>
    where
        E: EntityTrait + 'static,
        E::Model: Send + Sync,
    {
        self.q::<E>().order_by(expr, order)
    }

    /// Add a limit clause to a fresh query.
    fn limit<'a, E>(&'a self, limit: u64) -> Self::Select<'a, E>
    where
        E: EntityTrait + 'static,
        E::Model: Send + Sync,
    {
        self.q::<E>().limit(limit)
    }

    /// Query only the given columns.
    fn select<'a, E>(&'a self, columns: &[&str]) -> Self::Select<'a, E>
    where
        E: EntityTrait + 'static,
        E::Model: Send + Sync,
    {
        self.q::<E>().select_only(columns)
    }

    /// Paginate records returned from the database. Pages are 1-based.
    fn paginate<'a, E>(&'a self, page: u64, per_page: u64) -> Self::Select<'a, E>
    where
        E: EntityTrait + 'static,
        E::Model: Send + Sync,
    {
        self.q::<E>().paginate(page, per_page)
    }

    /// Paginate records according to parsed request parameters.
    fn paginate_params<'a, E>(&'a self, params: &PaginationParams) -> Self::Select<'a, E>
    where
        E: EntityTrait + 'static,
        E::Model: Send + Sync,
    {
        self.q::<E>().paginate_params(params)
    }

    /// Apply a reusable scope to a fresh query.
    fn scoped<'a, E, F>(&'a self, f: F) -> Self::Select<'a, E>
    where
        E: EntityTrait + 'static,
        E::Model: Send + Sync,
        F: FnOnce(Self::Select<'a, E>) -> Self::Select<'a, E>,
    {
        f(self.q::<E>())
    }

    /// Find the record of the entity with a particular primary key.
    async fn find<E>(
        &self,
        id: <E::PrimaryKey as PrimaryKeyTrait>::ValueType,
    ) -> Result<Option<E::Model>>
    where
        E: EntityTrait + 'static,
        E::Model: Send + Sync,
    {
        self.q::<E>().find(id).await
    }

    /// First record of the entity, by primary key ascending.
    async fn first<E>(&self) -> Result<Option<E::Model>>
    where
        E: EntityTrait + 'static,
        E::Model: Send + Sync,
    {
        let mut q = self.q::<E>();
        for pk in E::PrimaryKey::iter() {
            q = q.order_by(pk.into_column().as_str(), Order::Asc);
        }
        q.one().await
    }

    /// Last record of the entity, by primary key descending.
    async fn last<E>(&self) -> Result<Option<E::Model>>
    where
        E: EntityTrait + 'static,
        E::Model: Send + Sync,
    {
        self.q::<E>().last().await
    }

    /// Retrieve all records of the entity.
    async fn all<E>(&self) -> Result<Vec<E::Model>>
    where
        E: EntityTrait + 'static,
        E::Model: Send + Sync,
    {
        self.q::<E>().all().await
    }

    /// Count the records of the entity.
    async fn count<E>(&self) -> Result<u64>
    where
        E: EntityTrait + 'static,
        E::Model: Send + Sync,
    {
        self.q::<E>().count().await
    }

    /// Fetch fresh data for an already loaded record, using its primary key.
    async fn reload<E>(&self, model: &E::Model) -> Result<Option<E::Model>>
    where
        E: EntityTrait + 'static,
        E::Model: Send + Sync;

    /// Load the related record (at most one) for each of the given records.
    async fn load_one<E, R>(&self, models: &[E::Model]) -> Result<Vec<Option<R::Model>>>
    where
        E: EntityTrait + Related<R> + 'static,
        E::Model: Send + Sync,
        R: EntityTrait + 'static,
        R::Model: Send + Sync;

    /// Load the related records for each of the given records.
    async fn load_many<E, R>(&self, models: &[E::Model]) -> Result<Vec<Vec<R::Model>>>
    where
        E: EntityTrait + Related<R> + 'static,
        E::Model: Send + Sync,
        R: EntityTrait + 'static,
        R::Model: Send + Sync;

    /// Retrieve all records of the entity together with their related
    /// records, eagerly loaded.
    async fn all_with_related<E, R>(&self) -> Result<Vec<(E::Model, Vec<R::Model>)>>
    where
        E: EntityTrait + Related<R> + 'static,
        E::Model: Send + Sync,
        R: EntityTrait + 'static,
        R::Model: Send + Sync;

    /// Insert a new record.
    async fn create<A>(&self, model: A) -> Result<<<A as ActiveModelTrait>::Entity as EntityTrait>::Model>
    where
        A: ActiveModelTrait
            + ActiveModelBehavior
            + TryIntoModel<<<A as ActiveModelTrait>::Entity as EntityTrait>::Model>
            + Send
            + 'static,
        <<A as ActiveModelTrait>::Entity as EntityTrait>::Model: IntoActiveModel<A> + Send;

    /// Write changes from a record to the database.
    async fn update<A>(&self, model: A) -> Result<<<A as ActiveModelTrait>::Entity as EntityTrait>::Model>
    where
        A: ActiveModelTrait
            + ActiveModelBehavior
            + TryIntoModel<<<A as ActiveModelTrait>::Entity as EntityTrait>::Model>
            + Send
            + 'static,
        <<A as ActiveModelTrait>::Entity as EntityTrait>::Model: IntoActiveModel<A> + Send;

    /// Insert the record when its primary key is not set, update it
    /// otherwise.
    async fn save<A>(&self, model: A) -> Result<A>
    where
        A: ActiveModelTrait + ActiveModelBehavior + Send + 'static,
        <<A as ActiveModelTrait>::Entity as EntityTrait>::Model: IntoActiveModel<A> + Send;

    /// Delete a record from the database.
    async fn destroy<A>(&self, model: A) -> Result<()>
    where
        A: ActiveModelTrait + ActiveModelBehavior + Send + 'static,
        <<A as ActiveModelTrait>::Entity as EntityTrait>::Model: IntoActiveModel<A> + Send;

    /// Delete the record with the given primary key, returning the number of
    /// rows affected.
    async fn destroy_by_id<E>(
        &self,
        id: <E::PrimaryKey as PrimaryKeyTrait>::ValueType,
    ) -> Result<u64>
    where
        E: EntityTrait + 'static;

    /// Apply validation rules on the given record, then insert it if
    /// validation succeeds. Validation failures surface as
    /// [`Error::Validation`](crate::Error::Validation) without touching the
    /// database.
    async fn validate_and_create<M, A>(
        &self,
        model: M,
    ) -> Result<<<A as ActiveModelTrait>::Entity as EntityTrait>::Model>
    where
        M: Validate + IntoActiveModel<A> + Send + 'static,
        A: ActiveModelTrait
            + ActiveModelBehavior
            + TryIntoModel<<<A as ActiveModelTrait>::Entity as EntityTrait>::Model>
            + Send
            + 'static,
        <<A as ActiveModelTrait>::Entity as EntityTrait>::Model: IntoActiveModel<A> + Send,
    {
        model.validate()?;
        self.create(model.into_active_model().reset_all()).await
    }

    /// Apply validation rules on the given record, then update it if
    /// validation succeeds.
    async fn validate_and_update<M, A>(
        &self,
        model: M,
    ) -> Result<<<A as ActiveModelTrait>::Entity as EntityTrait>::Model>
    where
        M: Validate + IntoActiveModel<A> + Send + 'static,
        A: ActiveModelTrait
            + ActiveModelBehavior
            + TryIntoModel<<<A as ActiveModelTrait>::Entity as EntityTrait>::Model>
            + Send
            + 'static,
        <<A as ActiveModelTrait>::Entity as EntityTrait>::Model: IntoActiveModel<A> + Send,
    {
        model.validate()?;
        self.update(model.into_active_model().reset_all()).await
    }

    /// Apply validation rules on the given record, then save it if
    /// validation succeeds.
    async fn validate_and_save<M, A>(&self, model: M) -> Result<A>
    where
        M: Validate + IntoActiveModel<A> + Send + 'static,
        A: ActiveModelTrait + ActiveModelBehavior + Send + 'static,
        <<A as ActiveModelTrait>::Entity as EntityTrait>::Model: IntoActiveModel<A> + Send,
    {
        model.validate()?;
        self.save(model.into_active_model().reset_all()).await
    }

    /// Apply pending migrations, or the next `steps` of them.
    async fn migrate_up<M>(&self, steps: Option<u32>) -> Result<()>
    where
        M: MigratorTrait + 'static;

    /// Roll back all applied migrations, or the last `steps` of them.
    async fn migrate_down<M>(&self, steps: Option<u32>) -> Result<()>
    where
        M: MigratorTrait + 'static;

    /// Drop all tables and re-apply every migration.
    async fn migrate_fresh<M>(&self) -> Result<()>
    where
        M: MigratorTrait + 'static;

    /// List all defined migrations with their applied status.
    async fn migrate_status<M>(&self) -> Result<Vec<(String, bool)>>
    where
        M: MigratorTrait + 'static;
}

/// Reduces the `Box::pin` boilerplate of transactional closures.
///
/// ```ignore
/// with_transaction!(conn, |tx| {
///     tx.create(team).await?;
///     Ok(())
/// })
/// ```
#[macro_export]
macro_rules! with_transaction {
    ($conn:expr, |$tx:ident| $body:expr) => {
        $conn
            .transaction(|$tx| Box::pin(async move { $body }))
            .await
    };
}
