//! Query adapter over a SeaORM select.
//!
//! [`QueryAdapter`] satisfies the [`Query`] contract by holding a
//! `sea_orm::Select` (or a raw [`Statement`]) plus a borrowed handle, and
//! forwarding each clause to SeaORM / sea-query. Once a raw statement is
//! set, builder clauses no longer apply; the raw SQL runs as given.

use async_trait::async_trait;
use sea_orm::sea_query::{Alias, Condition, Expr};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, Iterable, JoinType, Order,
    PaginatorTrait, PrimaryKeyToColumn, PrimaryKeyTrait, QueryFilter, QueryOrder, QuerySelect,
    QueryTrait, Select, Statement, Value,
};

use crate::error::Result;
use crate::query::Query;

/// Concrete implementation of [`Query`] forwarding to SeaORM.
pub struct QueryAdapter<'a, C, E>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    conn: &'a C,
    select: Select<E>,
    raw: Option<Statement>,
}

impl<'a, C, E> QueryAdapter<'a, C, E>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    pub(crate) fn new(conn: &'a C) -> Self {
        Self {
            conn,
            select: E::find(),
            raw: None,
        }
    }

    pub(crate) fn from_statement(conn: &'a C, stmt: Statement) -> Self {
        Self {
            conn,
            select: E::find(),
            raw: Some(stmt),
        }
    }

    fn build(&self) -> Statement {
        match &self.raw {
            Some(stmt) => stmt.clone(),
            None => self.select.build(self.conn.get_database_backend()),
        }
    }
}

#[async_trait]
impl<'a, C, E> Query<E> for QueryAdapter<'a, C, E>
where
    C: ConnectionTrait,
    E: EntityTrait + 'static,
    E::Model: Send + Sync,
{
    fn filter(mut self, stmt: &str, values: Vec<Value>) -> Self {
        self.select = self.select.filter(Expr::cust_with_values(stmt, values));
        self
    }

    fn order_by(mut self, expr: &str, order: Order) -> Self {
        self.select = self.select.order_by(Expr::cust(expr), order);
        self
    }

    fn limit(mut self, limit: u64) -> Self {
        self.select = self.select.limit(limit);
        self
    }

    fn offset(mut self, offset: u64) -> Self {
        self.select = self.select.offset(offset);
        self
    }

    fn select_only(mut self, columns: &[&str]) -> Self {
        self.select = QuerySelect::select_only(self.select);
        for column in columns {
            self.select = self.select.expr(Expr::cust(*column));
        }
        self
    }

    fn group_by(mut self, fields: &[&str]) -> Self {
        for field in fields {
            self.select = self.select.group_by(Expr::cust(*field));
        }
        self
    }

    fn having(mut self, stmt: &str, values: Vec<Value>) -> Self {
        self.select = self.select.having(Expr::cust_with_values(stmt, values));
        self
    }

    fn join(mut self, kind: JoinType, table: &str, on: &str, values: Vec<Value>) -> Self {
        let condition = Condition::all().add(Expr::cust_with_values(on, values));
        QueryTrait::query(&mut self.select).join(kind, Alias::new(table), condition);
        self
    }

    fn to_statement(&self) -> Statement {
        self.build()
    }

    async fn all(self) -> Result<Vec<E::Model>> {
        match self.raw {
            Some(stmt) => Ok(E::Model::find_by_statement(stmt).all(self.conn).await?),
            None => Ok(self.select.all(self.conn).await?),
        }
    }

    async fn one(self) -> Result<Option<E::Model>> {
        match self.raw {
            Some(stmt) => Ok(E::Model::find_by_statement(stmt).one(self.conn).await?),
            None => Ok(self.select.one(self.conn).await?),
        }
    }

    async fn last(mut self) -> Result<Option<E::Model>> {
        if self.raw.is_none() {
            for pk in E::PrimaryKey::iter() {
                self.select = self.select.order_by(pk.into_column(), Order::Desc);
            }
        }
        self.one().await
    }

    async fn find(
        mut self,
        id: <E::PrimaryKey as PrimaryKeyTrait>::ValueType,
    ) -> Result<Option<E::Model>> {
        use sea_orm::sea_query::IntoValueTuple;

        let mut values = id.into_value_tuple().into_iter();
        for pk in E::PrimaryKey::iter() {
            if let Some(value) = values.next() {
                self.select = self.select.filter(pk.into_column().eq(value));
            }
        }
        self.one().await
    }

    async fn count(self) -> Result<u64> {
        match self.raw {
            // Raw statements are opaque; fetch and count instead of
            // rewriting them into a COUNT subquery.
            Some(stmt) => Ok(self.conn.query_all(stmt).await?.len() as u64),
            None => Ok(self.select.count(self.conn).await?),
        }
    }

    async fn count_by_field(mut self, field: &str) -> Result<u64> {
        if let Some(stmt) = self.raw {
            return Ok(self.conn.query_all(stmt).await?.len() as u64);
        }

        {
            let query = QueryTrait::query(&mut self.select);
            query.clear_selects();
            query.expr(Expr::cust(format!("COUNT({field})")));
        }
        let stmt = self.select.build(self.conn.get_database_backend());

        match self.conn.query_one(stmt).await? {
            Some(row) => {
                let count: i64 = row.try_get_by_index(0)?;
                Ok(count as u64)
            }
            None => Ok(0),
        }
    }

    async fn exists(self) -> Result<bool> {
        let stmt = match self.raw {
            Some(stmt) => stmt,
            None => self
                .select
                .limit(1)
                .build(self.conn.get_database_backend()),
        };
        Ok(self.conn.query_one(stmt).await?.is_some())
    }

    async fn exec_with_count(self) -> Result<u64> {
        let stmt = self.build();
        let result = self.conn.execute(stmt).await?;
        Ok(result.rows_affected())
    }
}
