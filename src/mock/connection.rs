use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, DatabaseBackend, EntityTrait, IntoActiveModel,
    PrimaryKeyTrait, Related, TryIntoModel, Value,
};
use sea_orm_migration::MigratorTrait;

use crate::connection::Connection;
use crate::error::Result;

use super::query::{Clause, MockQuery};

type ModelOf<A> = <<A as ActiveModelTrait>::Entity as EntityTrait>::Model;

type UnitFn = Arc<dyn Fn() -> Result<()> + Send + Sync>;
type BeginFn = Arc<dyn Fn() -> Result<MockConnection> + Send + Sync>;
type StepsFn = Arc<dyn Fn(Option<u32>) -> Result<()> + Send + Sync>;
type StatusFn = Arc<dyn Fn() -> Result<Vec<(String, bool)>> + Send + Sync>;
type CreateFn<A> = Arc<dyn Fn(A) -> Result<ModelOf<A>> + Send + Sync>;
type SaveFn<A> = Arc<dyn Fn(A) -> Result<A> + Send + Sync>;
type DestroyFn<A> = Arc<dyn Fn(A) -> Result<()> + Send + Sync>;
type DestroyByIdFn<E> = Arc<
    dyn Fn(<<E as EntityTrait>::PrimaryKey as PrimaryKeyTrait>::ValueType) -> Result<u64>
        + Send
        + Sync,
>;
type ReloadFn<E> = Arc<
    dyn Fn(&<E as EntityTrait>::Model) -> Result<Option<<E as EntityTrait>::Model>> + Send + Sync,
>;
type LoadOneFn<E, R> = Arc<
    dyn Fn(&[<E as EntityTrait>::Model]) -> Result<Vec<Option<<R as EntityTrait>::Model>>>
        + Send
        + Sync,
>;
type LoadManyFn<E, R> = Arc<
    dyn Fn(&[<E as EntityTrait>::Model]) -> Result<Vec<Vec<<R as EntityTrait>::Model>>>
        + Send
        + Sync,
>;
type RelatedFn<E, R> = Arc<
    dyn Fn() -> Result<Vec<(<E as EntityTrait>::Model, Vec<<R as EntityTrait>::Model>)>>
        + Send
        + Sync,
>;

#[derive(Default)]
struct State {
    /// Override closures, keyed by method name and the entity or active-model
    /// type the call was made with.
    overrides: Mutex<HashMap<(&'static str, TypeId), Box<dyn Any + Send + Sync>>>,
    /// Query prototypes handed out by `q`, keyed by entity type.
    queries: Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
    /// Names of the connection methods invoked so far, in order.
    calls: Mutex<Vec<&'static str>>,
}

/// In-memory [`Connection`] double.
///
/// Every operation records its name, runs the override registered for its
/// method and type (if any), and otherwise succeeds with a harmless default:
/// writes echo the record back, reads return nothing, maintenance calls are
/// no-ops. Clones share the override table and call log, and transactions
/// hand the callback a clone of the mock itself.
pub struct MockConnection {
    state: Arc<State>,
    url: Option<String>,
    backend: DatabaseBackend,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the connection string reported by [`Connection::url`].
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Override the backend reported by [`Connection::backend`].
    pub fn with_backend(mut self, backend: DatabaseBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Names of the connection methods invoked so far, in call order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.state.calls.lock().expect("call log poisoned").clone()
    }

    /// Register the query that [`Connection::q`] hands out for the entity
    /// `E`. The prototype is cloned per `q` call; clones share its clause
    /// log, so the instance kept by the test sees what the code under test
    /// built.
    pub fn expect_query<E>(&self, query: MockQuery<E>)
    where
        E: EntityTrait + 'static,
    {
        self.state
            .queries
            .lock()
            .expect("query map poisoned")
            .insert(TypeId::of::<E>(), Box::new(query));
    }

    pub fn on_ping(&self, f: impl Fn() -> Result<()> + Send + Sync + 'static) {
        self.install("ping", TypeId::of::<()>(), Arc::new(f) as UnitFn);
    }

    pub fn on_close(&self, f: impl Fn() -> Result<()> + Send + Sync + 'static) {
        self.install("close", TypeId::of::<()>(), Arc::new(f) as UnitFn);
    }

    pub fn on_begin(&self, f: impl Fn() -> Result<MockConnection> + Send + Sync + 'static) {
        self.install("begin", TypeId::of::<()>(), Arc::new(f) as BeginFn);
    }

    pub fn on_truncate_all(&self, f: impl Fn() -> Result<()> + Send + Sync + 'static) {
        self.install("truncate_all", TypeId::of::<()>(), Arc::new(f) as UnitFn);
    }

    pub fn on_truncate<E>(&self, f: impl Fn() -> Result<()> + Send + Sync + 'static)
    where
        E: EntityTrait + 'static,
    {
        self.install("truncate", TypeId::of::<E>(), Arc::new(f) as UnitFn);
    }

    pub fn on_reload<E>(
        &self,
        f: impl Fn(&E::Model) -> Result<Option<E::Model>> + Send + Sync + 'static,
    ) where
        E: EntityTrait + 'static,
    {
        self.install("reload", TypeId::of::<E>(), Arc::new(f) as ReloadFn<E>);
    }

    pub fn on_load_one<E, R>(
        &self,
        f: impl Fn(&[E::Model]) -> Result<Vec<Option<R::Model>>> + Send + Sync + 'static,
    ) where
        E: EntityTrait + 'static,
        R: EntityTrait + 'static,
    {
        self.install("load_one", TypeId::of::<(E, R)>(), Arc::new(f) as LoadOneFn<E, R>);
    }

    pub fn on_load_many<E, R>(
        &self,
        f: impl Fn(&[E::Model]) -> Result<Vec<Vec<R::Model>>> + Send + Sync + 'static,
    ) where
        E: EntityTrait + 'static,
        R: EntityTrait + 'static,
    {
        self.install("load_many", TypeId::of::<(E, R)>(), Arc::new(f) as LoadManyFn<E, R>);
    }

    pub fn on_all_with_related<E, R>(
        &self,
        f: impl Fn() -> Result<Vec<(E::Model, Vec<R::Model>)>> + Send + Sync + 'static,
    ) where
        E: EntityTrait + 'static,
        R: EntityTrait + 'static,
    {
        self.install(
            "all_with_related",
            TypeId::of::<(E, R)>(),
            Arc::new(f) as RelatedFn<E, R>,
        );
    }

    pub fn on_create<A>(&self, f: impl Fn(A) -> Result<ModelOf<A>> + Send + Sync + 'static)
    where
        A: ActiveModelTrait + 'static,
    {
        self.install("create", TypeId::of::<A>(), Arc::new(f) as CreateFn<A>);
    }

    pub fn on_update<A>(&self, f: impl Fn(A) -> Result<ModelOf<A>> + Send + Sync + 'static)
    where
        A: ActiveModelTrait + 'static,
    {
        self.install("update", TypeId::of::<A>(), Arc::new(f) as CreateFn<A>);
    }

    pub fn on_save<A>(&self, f: impl Fn(A) -> Result<A> + Send + Sync + 'static)
    where
        A: ActiveModelTrait + 'static,
    {
        self.install("save", TypeId::of::<A>(), Arc::new(f) as SaveFn<A>);
    }

    pub fn on_destroy<A>(&self, f: impl Fn(A) -> Result<()> + Send + Sync + 'static)
    where
        A: ActiveModelTrait + 'static,
    {
        self.install("destroy", TypeId::of::<A>(), Arc::new(f) as DestroyFn<A>);
    }

    pub fn on_destroy_by_id<E>(
        &self,
        f: impl Fn(<E::PrimaryKey as PrimaryKeyTrait>::ValueType) -> Result<u64>
            + Send
            + Sync
            + 'static,
    ) where
        E: EntityTrait + 'static,
    {
        self.install("destroy_by_id", TypeId::of::<E>(), Arc::new(f) as DestroyByIdFn<E>);
    }

    pub fn on_migrate_up<M>(&self, f: impl Fn(Option<u32>) -> Result<()> + Send + Sync + 'static)
    where
        M: MigratorTrait + 'static,
    {
        self.install("migrate_up", TypeId::of::<M>(), Arc::new(f) as StepsFn);
    }

    pub fn on_migrate_down<M>(&self, f: impl Fn(Option<u32>) -> Result<()> + Send + Sync + 'static)
    where
        M: MigratorTrait + 'static,
    {
        self.install("migrate_down", TypeId::of::<M>(), Arc::new(f) as StepsFn);
    }

    pub fn on_migrate_fresh<M>(&self, f: impl Fn() -> Result<()> + Send + Sync + 'static)
    where
        M: MigratorTrait + 'static,
    {
        self.install("migrate_fresh", TypeId::of::<M>(), Arc::new(f) as UnitFn);
    }

    pub fn on_migrate_status<M>(
        &self,
        f: impl Fn() -> Result<Vec<(String, bool)>> + Send + Sync + 'static,
    ) where
        M: MigratorTrait + 'static,
    {
        self.install("migrate_status", TypeId::of::<M>(), Arc::new(f) as StatusFn);
    }

    fn install<T: Send + Sync + 'static>(&self, method: &'static str, key: TypeId, value: T) {
        self.state
            .overrides
            .lock()
            .expect("override map poisoned")
            .insert((method, key), Box::new(value));
    }

    fn lookup<T: Clone + 'static>(&self, method: &'static str, key: TypeId) -> Option<T> {
        self.state
            .overrides
            .lock()
            .expect("override map poisoned")
            .get(&(method, key))
            .and_then(|boxed| boxed.downcast_ref::<T>())
            .cloned()
    }

    fn record(&self, method: &'static str) {
        self.state
            .calls
            .lock()
            .expect("call log poisoned")
            .push(method);
    }
}

impl Default for MockConnection {
    fn default() -> Self {
        Self {
            state: Arc::new(State::default()),
            url: Some("mock://db".to_owned()),
            backend: DatabaseBackend::Sqlite,
        }
    }
}

impl Clone for MockConnection {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            url: self.url.clone(),
            backend: self.backend,
        }
    }
}

impl fmt::Debug for MockConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockConnection")
            .field("url", &self.url)
            .field("backend", &self.backend)
            .field("calls", &self.calls())
            .finish()
    }
}

#[async_trait]
impl Connection for MockConnection {
    type Tx = MockConnection;

    type Select<'a, E>
        = MockQuery<E>
    where
        Self: 'a,
        E: EntityTrait + 'static,
        E::Model: Send + Sync;

    fn backend(&self) -> DatabaseBackend {
        self.backend
    }

    fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    fn migration_table_name(&self) -> &'static str {
        "seaql_migrations"
    }

    async fn ping(&self) -> Result<()> {
        self.record("ping");
        match self.lookup::<UnitFn>("ping", TypeId::of::<()>()) {
            Some(f) => f(),
            None => Ok(()),
        }
    }

    async fn close(self) -> Result<()> {
        self.record("close");
        match self.lookup::<UnitFn>("close", TypeId::of::<()>()) {
            Some(f) => f(),
            None => Ok(()),
        }
    }

    async fn begin(&self) -> Result<Self::Tx> {
        self.record("begin");
        match self.lookup::<BeginFn>("begin", TypeId::of::<()>()) {
            Some(f) => f(),
            None => Ok(self.clone()),
        }
    }

    async fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: for<'c> FnOnce(
                &'c Self::Tx,
            ) -> Pin<Box<dyn Future<Output = Result<T>> + Send + 'c>>
            + Send,
        T: Send,
    {
        self.record("transaction");
        let tx = self.begin().await?;
        f(&tx).await
    }

    async fn rollback<F, T>(&self, f: F) -> Result<T>
    where
        F: for<'c> FnOnce(
                &'c Self::Tx,
            ) -> Pin<Box<dyn Future<Output = Result<T>> + Send + 'c>>
            + Send,
        T: Send,
    {
        self.record("rollback");
        let tx = self.begin().await?;
        f(&tx).await
    }

    async fn truncate_all(&self) -> Result<()> {
        self.record("truncate_all");
        match self.lookup::<UnitFn>("truncate_all", TypeId::of::<()>()) {
            Some(f) => f(),
            None => Ok(()),
        }
    }

    async fn truncate<E>(&self) -> Result<()>
    where
        E: EntityTrait + 'static,
    {
        self.record("truncate");
        match self.lookup::<UnitFn>("truncate", TypeId::of::<E>()) {
            Some(f) => f(),
            None => Ok(()),
        }
    }

    fn q<'a, E>(&'a self) -> Self::Select<'a, E>
    where
        E: EntityTrait + 'static,
        E::Model: Send + Sync,
    {
        self.record("q");
        self.state
            .queries
            .lock()
            .expect("query map poisoned")
            .get(&TypeId::of::<E>())
            .and_then(|boxed| boxed.downcast_ref::<MockQuery<E>>())
            .cloned()
            .unwrap_or_default()
    }

    fn raw<'a, E>(&'a self, stmt: &str, values: Vec<Value>) -> Self::Select<'a, E>
    where
        E: EntityTrait + 'static,
        E::Model: Send + Sync,
    {
        self.q::<E>().push(Clause::Raw {
            stmt: stmt.to_owned(),
            values,
        })
    }

    async fn reload<E>(&self, model: &E::Model) -> Result<Option<E::Model>>
    where
        E: EntityTrait + 'static,
        E::Model: Send + Sync,
    {
        self.record("reload");
        match self.lookup::<ReloadFn<E>>("reload", TypeId::of::<E>()) {
            Some(f) => f(model),
            None => Ok(Some(model.clone())),
        }
    }

    async fn load_one<E, R>(&self, models: &[E::Model]) -> Result<Vec<Option<R::Model>>>
    where
        E: EntityTrait + Related<R> + 'static,
        E::Model: Send + Sync,
        R: EntityTrait + 'static,
        R::Model: Send + Sync,
    {
        self.record("load_one");
        match self.lookup::<LoadOneFn<E, R>>("load_one", TypeId::of::<(E, R)>()) {
            Some(f) => f(models),
            None => Ok(models.iter().map(|_| None).collect()),
        }
    }

    async fn load_many<E, R>(&self, models: &[E::Model]) -> Result<Vec<Vec<R::Model>>>
    where
        E: EntityTrait + Related<R> + 'static,
        E::Model: Send + Sync,
        R: EntityTrait + 'static,
        R::Model: Send + Sync,
    {
        self.record("load_many");
        match self.lookup::<LoadManyFn<E, R>>("load_many", TypeId::of::<(E, R)>()) {
            Some(f) => f(models),
            None => Ok(models.iter().map(|_| Vec::new()).collect()),
        }
    }

    async fn all_with_related<E, R>(&self) -> Result<Vec<(E::Model, Vec<R::Model>)>>
    where
        E: EntityTrait + Related<R> + 'static,
        E::Model: Send + Sync,
        R: EntityTrait + 'static,
        R::Model: Send + Sync,
    {
        self.record("all_with_related");
        match self.lookup::<RelatedFn<E, R>>("all_with_related", TypeId::of::<(E, R)>()) {
            Some(f) => f(),
            None => Ok(Vec::new()),
        }
    }

    async fn create<A>(&self, model: A) -> Result<ModelOf<A>>
    where
        A: ActiveModelTrait
            + ActiveModelBehavior
            + TryIntoModel<ModelOf<A>>
            + Send
            + 'static,
        ModelOf<A>: IntoActiveModel<A> + Send,
    {
        self.record("create");
        match self.lookup::<CreateFn<A>>("create", TypeId::of::<A>()) {
            Some(f) => f(model),
            None => model.try_into_model().map_err(Into::into),
        }
    }

    async fn update<A>(&self, model: A) -> Result<ModelOf<A>>
    where
        A: ActiveModelTrait
            + ActiveModelBehavior
            + TryIntoModel<ModelOf<A>>
            + Send
            + 'static,
        ModelOf<A>: IntoActiveModel<A> + Send,
    {
        self.record("update");
        match self.lookup::<CreateFn<A>>("update", TypeId::of::<A>()) {
            Some(f) => f(model),
            None => model.try_into_model().map_err(Into::into),
        }
    }

    async fn save<A>(&self, model: A) -> Result<A>
    where
        A: ActiveModelTrait + ActiveModelBehavior + Send + 'static,
        ModelOf<A>: IntoActiveModel<A> + Send,
    {
        self.record("save");
        match self.lookup::<SaveFn<A>>("save", TypeId::of::<A>()) {
            Some(f) => f(model),
            None => Ok(model),
        }
    }

    async fn destroy<A>(&self, model: A) -> Result<()>
    where
        A: ActiveModelTrait + ActiveModelBehavior + Send + 'static,
        ModelOf<A>: IntoActiveModel<A> + Send,
    {
        self.record("destroy");
        match self.lookup::<DestroyFn<A>>("destroy", TypeId::of::<A>()) {
            Some(f) => f(model),
            None => Ok(()),
        }
    }

    async fn destroy_by_id<E>(
        &self,
        id: <E::PrimaryKey as PrimaryKeyTrait>::ValueType,
    ) -> Result<u64>
    where
        E: EntityTrait + 'static,
    {
        self.record("destroy_by_id");
        match self.lookup::<DestroyByIdFn<E>>("destroy_by_id", TypeId::of::<E>()) {
            Some(f) => f(id),
            None => Ok(0),
        }
    }

    async fn migrate_up<M>(&self, steps: Option<u32>) -> Result<()>
    where
        M: MigratorTrait + 'static,
    {
        self.record("migrate_up");
        match self.lookup::<StepsFn>("migrate_up", TypeId::of::<M>()) {
            Some(f) => f(steps),
            None => Ok(()),
        }
    }

    async fn migrate_down<M>(&self, steps: Option<u32>) -> Result<()>
    where
        M: MigratorTrait + 'static,
    {
        self.record("migrate_down");
        match self.lookup::<StepsFn>("migrate_down", TypeId::of::<M>()) {
            Some(f) => f(steps),
            None => Ok(()),
        }
    }

    async fn migrate_fresh<M>(&self) -> Result<()>
    where
        M: MigratorTrait + 'static,
    {
        self.record("migrate_fresh");
        match self.lookup::<UnitFn>("migrate_fresh", TypeId::of::<M>()) {
            Some(f) => f(),
            None => Ok(()),
        }
    }

    async fn migrate_status<M>(&self) -> Result<Vec<(String, bool)>>
    where
        M: MigratorTrait + 'static,
    {
        self.record("migrate_status");
        match self.lookup::<StatusFn>("migrate_status", TypeId::of::<M>()) {
            Some(f) => f(),
            None => Ok(Vec::new()),
        }
    }
}
