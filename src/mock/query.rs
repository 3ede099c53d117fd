use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sea_orm::sea_query::JoinType;
use sea_orm::{DatabaseBackend, EntityTrait, Order, PrimaryKeyTrait, Statement, Value};

use crate::error::Result;
use crate::query::Query;

/// A builder call recorded by [`MockQuery`].
#[derive(Debug, Clone)]
pub enum Clause {
    Filter {
        stmt: String,
        values: Vec<Value>,
    },
    OrderBy {
        expr: String,
        order: Order,
    },
    Limit(u64),
    Offset(u64),
    SelectOnly(Vec<String>),
    GroupBy(Vec<String>),
    Having {
        stmt: String,
        values: Vec<Value>,
    },
    Join {
        kind: JoinType,
        table: String,
        on: String,
        values: Vec<Value>,
    },
    Raw {
        stmt: String,
        values: Vec<Value>,
    },
}

type AllFn<E> = Arc<dyn Fn(&[Clause]) -> Result<Vec<<E as EntityTrait>::Model>> + Send + Sync>;
type OneFn<E> = Arc<dyn Fn(&[Clause]) -> Result<Option<<E as EntityTrait>::Model>> + Send + Sync>;
type FindFn<E> = Arc<
    dyn Fn(
            &[Clause],
            <<E as EntityTrait>::PrimaryKey as PrimaryKeyTrait>::ValueType,
        ) -> Result<Option<<E as EntityTrait>::Model>>
        + Send
        + Sync,
>;
type CountFn = Arc<dyn Fn(&[Clause]) -> Result<u64> + Send + Sync>;
type CountByFieldFn = Arc<dyn Fn(&[Clause], &str) -> Result<u64> + Send + Sync>;
type ExistsFn = Arc<dyn Fn(&[Clause]) -> Result<bool> + Send + Sync>;
type StatementFn = Arc<dyn Fn(&[Clause]) -> Statement + Send + Sync>;

/// In-memory [`Query`] double.
///
/// Builder methods append a [`Clause`] to a shared log instead of touching a
/// select statement; terminal methods run the matching override closure with
/// the recorded clauses, or return an empty default. The clause log is shared
/// between clones, so a test can hold on to the prototype passed to
/// [`MockConnection::expect_query`](super::MockConnection::expect_query) and
/// inspect [`recorded`](Self::recorded) after the code under test ran.
pub struct MockQuery<E: EntityTrait> {
    clauses: Arc<Mutex<Vec<Clause>>>,
    all_fn: Option<AllFn<E>>,
    one_fn: Option<OneFn<E>>,
    last_fn: Option<OneFn<E>>,
    find_fn: Option<FindFn<E>>,
    count_fn: Option<CountFn>,
    count_by_field_fn: Option<CountByFieldFn>,
    exists_fn: Option<ExistsFn>,
    exec_fn: Option<CountFn>,
    statement_fn: Option<StatementFn>,
}

impl<E: EntityTrait> MockQuery<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the clauses recorded so far.
    pub fn recorded(&self) -> Vec<Clause> {
        self.clauses.lock().expect("clause log poisoned").clone()
    }

    pub fn on_all(
        mut self,
        f: impl Fn(&[Clause]) -> Result<Vec<E::Model>> + Send + Sync + 'static,
    ) -> Self {
        self.all_fn = Some(Arc::new(f));
        self
    }

    pub fn on_one(
        mut self,
        f: impl Fn(&[Clause]) -> Result<Option<E::Model>> + Send + Sync + 'static,
    ) -> Self {
        self.one_fn = Some(Arc::new(f));
        self
    }

    pub fn on_last(
        mut self,
        f: impl Fn(&[Clause]) -> Result<Option<E::Model>> + Send + Sync + 'static,
    ) -> Self {
        self.last_fn = Some(Arc::new(f));
        self
    }

    pub fn on_find(
        mut self,
        f: impl Fn(
                &[Clause],
                <E::PrimaryKey as PrimaryKeyTrait>::ValueType,
            ) -> Result<Option<E::Model>>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.find_fn = Some(Arc::new(f));
        self
    }

    pub fn on_count(
        mut self,
        f: impl Fn(&[Clause]) -> Result<u64> + Send + Sync + 'static,
    ) -> Self {
        self.count_fn = Some(Arc::new(f));
        self
    }

    pub fn on_count_by_field(
        mut self,
        f: impl Fn(&[Clause], &str) -> Result<u64> + Send + Sync + 'static,
    ) -> Self {
        self.count_by_field_fn = Some(Arc::new(f));
        self
    }

    pub fn on_exists(
        mut self,
        f: impl Fn(&[Clause]) -> Result<bool> + Send + Sync + 'static,
    ) -> Self {
        self.exists_fn = Some(Arc::new(f));
        self
    }

    pub fn on_exec_with_count(
        mut self,
        f: impl Fn(&[Clause]) -> Result<u64> + Send + Sync + 'static,
    ) -> Self {
        self.exec_fn = Some(Arc::new(f));
        self
    }

    pub fn on_statement(
        mut self,
        f: impl Fn(&[Clause]) -> Statement + Send + Sync + 'static,
    ) -> Self {
        self.statement_fn = Some(Arc::new(f));
        self
    }

    pub(crate) fn push(self, clause: Clause) -> Self {
        self.clauses.lock().expect("clause log poisoned").push(clause);
        self
    }
}

impl<E: EntityTrait> Default for MockQuery<E> {
    fn default() -> Self {
        Self {
            clauses: Arc::new(Mutex::new(Vec::new())),
            all_fn: None,
            one_fn: None,
            last_fn: None,
            find_fn: None,
            count_fn: None,
            count_by_field_fn: None,
            exists_fn: None,
            exec_fn: None,
            statement_fn: None,
        }
    }
}

impl<E: EntityTrait> Clone for MockQuery<E> {
    fn clone(&self) -> Self {
        Self {
            clauses: Arc::clone(&self.clauses),
            all_fn: self.all_fn.clone(),
            one_fn: self.one_fn.clone(),
            last_fn: self.last_fn.clone(),
            find_fn: self.find_fn.clone(),
            count_fn: self.count_fn.clone(),
            count_by_field_fn: self.count_by_field_fn.clone(),
            exists_fn: self.exists_fn.clone(),
            exec_fn: self.exec_fn.clone(),
            statement_fn: self.statement_fn.clone(),
        }
    }
}

impl<E: EntityTrait> fmt::Debug for MockQuery<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockQuery")
            .field("clauses", &self.recorded())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<E> Query<E> for MockQuery<E>
where
    E: EntityTrait + 'static,
    E::Model: Send + Sync,
{
    fn filter(self, stmt: &str, values: Vec<Value>) -> Self {
        self.push(Clause::Filter {
            stmt: stmt.to_owned(),
            values,
        })
    }

    fn order_by(self, expr: &str, order: Order) -> Self {
        self.push(Clause::OrderBy {
            expr: expr.to_owned(),
            order,
        })
    }

    fn limit(self, limit: u64) -> Self {
        self.push(Clause::Limit(limit))
    }

    fn offset(self, offset: u64) -> Self {
        self.push(Clause::Offset(offset))
    }

    fn select_only(self, columns: &[&str]) -> Self {
        self.push(Clause::SelectOnly(
            columns.iter().map(|c| (*c).to_owned()).collect(),
        ))
    }

    fn group_by(self, fields: &[&str]) -> Self {
        self.push(Clause::GroupBy(
            fields.iter().map(|f| (*f).to_owned()).collect(),
        ))
    }

    fn having(self, stmt: &str, values: Vec<Value>) -> Self {
        self.push(Clause::Having {
            stmt: stmt.to_owned(),
            values,
        })
    }

    fn join(self, kind: JoinType, table: &str, on: &str, values: Vec<Value>) -> Self {
        self.push(Clause::Join {
            kind,
            table: table.to_owned(),
            on: on.to_owned(),
            values,
        })
    }

    fn to_statement(&self) -> Statement {
        let clauses = self.recorded();
        match &self.statement_fn {
            Some(f) => f(&clauses),
            None => Statement::from_string(DatabaseBackend::Sqlite, "-- mock query"),
        }
    }

    async fn all(self) -> Result<Vec<E::Model>> {
        let clauses = self.recorded();
        match &self.all_fn {
            Some(f) => f(&clauses),
            None => Ok(Vec::new()),
        }
    }

    async fn one(self) -> Result<Option<E::Model>> {
        let clauses = self.recorded();
        match &self.one_fn {
            Some(f) => f(&clauses),
            None => Ok(None),
        }
    }

    async fn last(self) -> Result<Option<E::Model>> {
        let clauses = self.recorded();
        match &self.last_fn {
            Some(f) => f(&clauses),
            None => Ok(None),
        }
    }

    async fn find(
        self,
        id: <E::PrimaryKey as PrimaryKeyTrait>::ValueType,
    ) -> Result<Option<E::Model>> {
        let clauses = self.recorded();
        match &self.find_fn {
            Some(f) => f(&clauses, id),
            None => Ok(None),
        }
    }

    async fn count(self) -> Result<u64> {
        let clauses = self.recorded();
        match &self.count_fn {
            Some(f) => f(&clauses),
            None => Ok(0),
        }
    }

    async fn count_by_field(self, field: &str) -> Result<u64> {
        let clauses = self.recorded();
        match &self.count_by_field_fn {
            Some(f) => f(&clauses, field),
            None => Ok(0),
        }
    }

    async fn exists(self) -> Result<bool> {
        let clauses = self.recorded();
        match &self.exists_fn {
            Some(f) => f(&clauses),
            None => Ok(false),
        }
    }

    async fn exec_with_count(self) -> Result<u64> {
        let clauses = self.recorded();
        match &self.exec_fn {
            Some(f) => f(&clauses),
            None => Ok(0),
        }
    }
}
