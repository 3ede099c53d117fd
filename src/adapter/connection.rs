//! Connection adapter over a SeaORM handle.
//!
//! [`ConnectionAdapter`] satisfies the [`Connection`] contract by holding the
//! concrete SeaORM object and forwarding each call one-for-one. Transaction
//! values are wrapped back into `ConnectionAdapter<DatabaseTransaction>` so
//! callers never see the concrete handle, and errors propagate unchanged.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ConnectOptions, ConnectionTrait,
    Database, DatabaseBackend, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    IntoActiveModel, Iterable, ModelTrait, PrimaryKeyToColumn, PrimaryKeyTrait, QueryFilter,
    QueryOrder, Related, Statement, TransactionTrait, TryIntoModel, Value,
};
use sea_orm_migration::{IntoSchemaManagerConnection, MigratorTrait};

use super::query::QueryAdapter;
use crate::connection::Connection;
use crate::error::Result;

/// Name of the table sea-orm-migration uses to track applied migrations.
const MIGRATION_TABLE: &str = "seaql_migrations";

/// A SeaORM handle the adapter can wrap: a live connection or an open
/// transaction. `dispose` releases the handle, closing the connection or
/// rolling back the transaction.
#[async_trait]
pub trait OrmHandle: ConnectionTrait + TransactionTrait + Send + Sync {
    async fn dispose(self) -> std::result::Result<(), DbErr>
    where
        Self: Sized;
}

#[async_trait]
impl OrmHandle for DatabaseConnection {
    async fn dispose(self) -> std::result::Result<(), DbErr> {
        self.close().await
    }
}

#[async_trait]
impl OrmHandle for DatabaseTransaction {
    async fn dispose(self) -> std::result::Result<(), DbErr> {
        self.rollback().await
    }
}

/// Concrete implementation of [`Connection`] forwarding to SeaORM.
#[derive(Debug)]
pub struct ConnectionAdapter<C> {
    conn: C,
    url: Option<String>,
}

impl<C> ConnectionAdapter<C> {
    /// Wrap an existing SeaORM handle.
    pub fn new(conn: C) -> Self {
        Self { conn, url: None }
    }

    /// Get a reference to the wrapped handle.
    pub fn inner(&self) -> &C {
        &self.conn
    }

    /// Unwrap the adapter, returning the SeaORM handle.
    pub fn into_inner(self) -> C {
        self.conn
    }
}

impl ConnectionAdapter<DatabaseConnection> {
    /// Open a new datasource connection.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with(ConnectOptions::new(url)).await
    }

    /// Open a new datasource connection with explicit options.
    pub async fn connect_with(options: ConnectOptions) -> Result<Self> {
        let url = options.get_url().to_string();
        let conn = Database::connect(options).await?;
        tracing::info!(url = %url, "database connected");
        Ok(Self {
            conn,
            url: Some(url),
        })
    }
}

impl ConnectionAdapter<DatabaseTransaction> {
    /// Commit the wrapped transaction. To roll it back instead, use
    /// [`Connection::close`] or let [`Connection::transaction`] manage the
    /// lifecycle.
    pub async fn commit(self) -> Result<()> {
        self.conn.commit().await?;
        Ok(())
    }
}

impl<C: OrmHandle> ConnectionAdapter<C> {
    fn wrap(&self, txn: DatabaseTransaction) -> ConnectionAdapter<DatabaseTransaction> {
        ConnectionAdapter {
            conn: txn,
            url: self.url.clone(),
        }
    }

    /// Names of the user tables in the datasource, excluding the migration
    /// bookkeeping table.
    async fn user_tables(&self, backend: DatabaseBackend) -> Result<Vec<String>> {
        let sql = match backend {
            DatabaseBackend::Sqlite => {
                "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%'"
            }
            DatabaseBackend::Postgres => {
                "SELECT tablename FROM pg_tables WHERE schemaname = current_schema()"
            }
            DatabaseBackend::MySql => {
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE'"
            }
        };

        let rows = self
            .conn
            .query_all(Statement::from_string(backend, sql))
            .await?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.try_get_by_index(0)?;
            if name != MIGRATION_TABLE {
                tables.push(name);
            }
        }
        Ok(tables)
    }

    async fn erase_table(&self, backend: DatabaseBackend, table: &str) -> Result<()> {
        let sql = match backend {
            DatabaseBackend::Sqlite => format!(r#"DELETE FROM "{table}""#),
            DatabaseBackend::Postgres => {
                format!(r#"TRUNCATE TABLE "{table}" RESTART IDENTITY CASCADE"#)
            }
            DatabaseBackend::MySql => format!("TRUNCATE TABLE `{table}`"),
        };
        self.conn
            .execute(Statement::from_string(backend, sql))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl<C> Connection for ConnectionAdapter<C>
where
    C: OrmHandle + 'static,
    for<'a> &'a C: IntoSchemaManagerConnection<'a>,
{
    type Tx = ConnectionAdapter<DatabaseTransaction>;

    type Select<'a, E>
        = QueryAdapter<'a, C, E>
    where
        Self: 'a,
        E: EntityTrait + 'static,
        E::Model: Send + Sync;

    fn backend(&self) -> DatabaseBackend {
        self.conn.get_database_backend()
    }

    fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    fn migration_table_name(&self) -> &'static str {
        MIGRATION_TABLE
    }

    async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .execute(Statement::from_string(backend, "SELECT 1"))
            .await?;
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.conn.dispose().await?;
        Ok(())
    }

    async fn begin(&self) -> Result<Self::Tx> {
        let txn = self.conn.begin().await?;
        Ok(self.wrap(txn))
    }

    async fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: for<'c> FnOnce(
                &'c Self::Tx,
            ) -> Pin<Box<dyn Future<Output = Result<T>> + Send + 'c>>
            + Send,
        T: Send,
    {
        let ctx = self.wrap(self.conn.begin().await?);
        match f(&ctx).await {
            Ok(value) => {
                ctx.into_inner().commit().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = ctx.into_inner().rollback().await {
                    tracing::error!("transaction rollback failed: {rollback_err}");
                }
                Err(e)
            }
        }
    }

    async fn rollback<F, T>(&self, f: F) -> Result<T>
    where
        F: for<'c> FnOnce(
                &'c Self::Tx,
            ) -> Pin<Box<dyn Future<Output = Result<T>> + Send + 'c>>
            + Send,
        T: Send,
    {
        let ctx = self.wrap(self.conn.begin().await?);
        let result = f(&ctx).await;
        ctx.into_inner().rollback().await?;
        result
    }

    async fn truncate_all(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        let tables = self.user_tables(backend).await?;

        // Catalog order ignores dependencies, so parent rows would go
        // before their children; suspend enforcement while erasing.
        let fk_guard = match backend {
            DatabaseBackend::MySql => {
                Some(("SET FOREIGN_KEY_CHECKS = 0", "SET FOREIGN_KEY_CHECKS = 1"))
            }
            DatabaseBackend::Sqlite => {
                Some(("PRAGMA foreign_keys = OFF", "PRAGMA foreign_keys = ON"))
            }
            DatabaseBackend::Postgres => None,
        };

        if let Some((off, _)) = fk_guard {
            self.conn
                .execute(Statement::from_string(backend, off))
                .await?;
        }

        let mut result = Ok(());
        for table in &tables {
            result = self.erase_table(backend, table).await;
            if result.is_err() {
                break;
            }
        }

        if let Some((_, on)) = fk_guard {
            self.conn
                .execute(Statement::from_string(backend, on))
                .await?;
        }

        result
    }

    async fn truncate<E>(&self) -> Result<()>
    where
        E: EntityTrait + 'static,
    {
        let backend = self.conn.get_database_backend();
        self.erase_table(backend, E::default().table_name()).await
    }

    fn q<'a, E>(&'a self) -> Self::Select<'a, E>
    where
        E: EntityTrait + 'static,
        E::Model: Send + Sync,
    {
        QueryAdapter::new(&self.conn)
    }

    fn raw<'a, E>(&'a self, stmt: &str, values: Vec<Value>) -> Self::Select<'a, E>
    where
        E: EntityTrait + 'static,
        E::Model: Send + Sync,
    {
        let backend = self.conn.get_database_backend();
        QueryAdapter::from_statement(
            &self.conn,
            Statement::from_sql_and_values(backend, stmt, values),
        )
    }

    async fn reload<E>(&self, model: &E::Model) -> Result<Option<E::Model>>
    where
        E: EntityTrait + 'static,
        E::Model: Send + Sync,
    {
        let mut select = E::find();
        for pk in E::PrimaryKey::iter() {
            let col = pk.into_column();
            select = select.filter(col.eq(model.get(col)));
        }
        Ok(select.one(&self.conn).await?)
    }

    async fn load_one<E, R>(&self, models: &[E::Model]) -> Result<Vec<Option<R::Model>>>
    where
        E: EntityTrait + Related<R> + 'static,
        E::Model: Send + Sync,
        R: EntityTrait + 'static,
        R::Model: Send + Sync,
    {
        use sea_orm::LoaderTrait;
        Ok(models.load_one(R::default(), &self.conn).await?)
    }

    async fn load_many<E, R>(&self, models: &[E::Model]) -> Result<Vec<Vec<R::Model>>>
    where
        E: EntityTrait + Related<R> + 'static,
        E::Model: Send + Sync,
        R: EntityTrait + 'static,
        R::Model: Send + Sync,
    {
        use sea_orm::LoaderTrait;
        Ok(models.load_many(R::default(), &self.conn).await?)
    }

    async fn all_with_related<E, R>(&self) -> Result<Vec<(E::Model, Vec<R::Model>)>>
    where
        E: EntityTrait + Related<R> + 'static,
        E::Model: Send + Sync,
        R: EntityTrait + 'static,
        R::Model: Send + Sync,
    {
        Ok(E::find()
            .find_with_related(R::default())
            .all(&self.conn)
            .await?)
    }

    async fn create<A>(
        &self,
        model: A,
    ) -> Result<<<A as ActiveModelTrait>::Entity as EntityTrait>::Model>
    where
        A: ActiveModelTrait
            + ActiveModelBehavior
            + TryIntoModel<<<A as ActiveModelTrait>::Entity as EntityTrait>::Model>
            + Send
            + 'static,
        <<A as ActiveModelTrait>::Entity as EntityTrait>::Model: IntoActiveModel<A> + Send,
    {
        Ok(model.insert(&self.conn).await?)
    }

    async fn update<A>(
        &self,
        model: A,
    ) -> Result<<<A as ActiveModelTrait>::Entity as EntityTrait>::Model>
    where
        A: ActiveModelTrait
            + ActiveModelBehavior
            + TryIntoModel<<<A as ActiveModelTrait>::Entity as EntityTrait>::Model>
            + Send
            + 'static,
        <<A as ActiveModelTrait>::Entity as EntityTrait>::Model: IntoActiveModel<A> + Send,
    {
        Ok(model.update(&self.conn).await?)
    }

    async fn save<A>(&self, model: A) -> Result<A>
    where
        A: ActiveModelTrait + ActiveModelBehavior + Send + 'static,
        <<A as ActiveModelTrait>::Entity as EntityTrait>::Model: IntoActiveModel<A> + Send,
    {
        Ok(model.save(&self.conn).await?)
    }

    async fn destroy<A>(&self, model: A) -> Result<()>
    where
        A: ActiveModelTrait + ActiveModelBehavior + Send + 'static,
        <<A as ActiveModelTrait>::Entity as EntityTrait>::Model: IntoActiveModel<A> + Send,
    {
        model.delete(&self.conn).await?;
        Ok(())
    }

    async fn destroy_by_id<E>(
        &self,
        id: <E::PrimaryKey as PrimaryKeyTrait>::ValueType,
    ) -> Result<u64>
    where
        E: EntityTrait + 'static,
    {
        let result = E::delete_by_id(id).exec(&self.conn).await?;
        Ok(result.rows_affected)
    }

    async fn migrate_up<M>(&self, steps: Option<u32>) -> Result<()>
    where
        M: MigratorTrait + 'static,
    {
        M::up(&self.conn, steps).await?;
        tracing::info!(?steps, "migrations applied");
        Ok(())
    }

    async fn migrate_down<M>(&self, steps: Option<u32>) -> Result<()>
    where
        M: MigratorTrait + 'static,
    {
        M::down(&self.conn, steps).await?;
        tracing::info!(?steps, "migrations reverted");
        Ok(())
    }

    async fn migrate_fresh<M>(&self) -> Result<()>
    where
        M: MigratorTrait + 'static,
    {
        M::fresh(&self.conn).await?;
        Ok(())
    }

    async fn migrate_status<M>(&self) -> Result<Vec<(String, bool)>>
    where
        M: MigratorTrait + 'static,
    {
        use sea_orm_migration::seaql_migrations;

        // Creates the bookkeeping table when it does not exist yet, so a
        // fresh database reports every migration as pending.
        M::install(&self.conn).await?;

        let applied: HashSet<String> = seaql_migrations::Entity::find()
            .order_by_asc(seaql_migrations::Column::Version)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(|m| m.version)
            .collect();

        Ok(M::migrations()
            .iter()
            .map(|m| {
                let name = m.name().to_string();
                let is_applied = applied.contains(&name);
                (name, is_applied)
            })
            .collect())
    }
}
