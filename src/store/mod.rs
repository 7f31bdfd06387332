// src/store/mod.rs

//! Record stores.
//!
//! Every table is reached through a [`Store`] typed by its [`Record`]. The
//! backing storage is a [`Db`] handle injected through `AppState`: Postgres in
//! production, an in-process map for tests and local runs. Reads never return
//! soft-deleted rows; deletion goes through [`Lifecycle`].

pub mod filter;
pub mod memory;
pub mod postgres;
pub mod reconcile;

use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, postgres::PgRow};
use uuid::Uuid;

use crate::error::AppResult;

pub use filter::{ListFilter, ListParams};
pub use memory::MemoryDb;

/// Audit columns carried by every table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Audit {
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<Uuid>,
}

impl Audit {
    pub fn created(actor: Option<Uuid>) -> Self {
        Self {
            deleted: false,
            created_at: Utc::now(),
            created_by: actor,
            updated_at: None,
            updated_by: None,
        }
    }

    pub fn touch(&mut self, actor: Option<Uuid>) {
        self.updated_at = Some(Utc::now());
        self.updated_by = actor;
    }

    fn columns(&self) -> [(&'static str, Param); 5] {
        [
            ("deleted", Param::Bool(self.deleted)),
            ("created_at", Param::Time(Some(self.created_at))),
            ("created_by", Param::Uuid(self.created_by)),
            ("updated_at", Param::Time(self.updated_at)),
            ("updated_by", Param::Uuid(self.updated_by)),
        ]
    }
}

/// A bindable column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Uuid(Option<Uuid>),
    Text(Option<String>),
    Int(Option<i32>),
    Bool(bool),
    Time(Option<DateTime<Utc>>),
}

impl Param {
    pub fn is_null(&self) -> bool {
        matches!(
            self,
            Param::Uuid(None) | Param::Text(None) | Param::Int(None) | Param::Time(None)
        )
    }

    /// The value as it appears in a record's JSON form.
    pub fn to_json(&self) -> Value {
        match self {
            Param::Uuid(v) => json!(v),
            Param::Text(v) => json!(v),
            Param::Int(v) => json!(v),
            Param::Bool(v) => json!(v),
            Param::Time(v) => json!(v),
        }
    }

    pub(crate) fn bind(self, builder: &mut QueryBuilder<'_, Postgres>) {
        match self {
            Param::Uuid(v) => builder.push_bind(v),
            Param::Text(v) => builder.push_bind(v),
            Param::Int(v) => builder.push_bind(v),
            Param::Bool(v) => builder.push_bind(v),
            Param::Time(v) => builder.push_bind(v),
        };
    }
}

impl From<Uuid> for Param {
    fn from(v: Uuid) -> Self {
        Param::Uuid(Some(v))
    }
}

impl From<Option<Uuid>> for Param {
    fn from(v: Option<Uuid>) -> Self {
        Param::Uuid(v)
    }
}

impl From<String> for Param {
    fn from(v: String) -> Self {
        Param::Text(Some(v))
    }
}

impl From<&str> for Param {
    fn from(v: &str) -> Self {
        Param::Text(Some(v.to_string()))
    }
}

impl From<Option<String>> for Param {
    fn from(v: Option<String>) -> Self {
        Param::Text(v)
    }
}

impl From<i32> for Param {
    fn from(v: i32) -> Self {
        Param::Int(Some(v))
    }
}

impl From<Option<i32>> for Param {
    fn from(v: Option<i32>) -> Self {
        Param::Int(v)
    }
}

impl From<bool> for Param {
    fn from(v: bool) -> Self {
        Param::Bool(v)
    }
}

impl From<DateTime<Utc>> for Param {
    fn from(v: DateTime<Utc>) -> Self {
        Param::Time(Some(v))
    }
}

impl From<Option<DateTime<Utc>>> for Param {
    fn from(v: Option<DateTime<Utc>>) -> Self {
        Param::Time(v)
    }
}

/// Row predicate, always combined with `deleted = FALSE`.
#[derive(Debug, Clone)]
pub enum Condition {
    Eq(&'static str, Param),
    EqIgnoreCase(&'static str, String),
    In(&'static str, Vec<Uuid>),
}

impl Condition {
    pub fn eq(column: &'static str, value: impl Into<Param>) -> Self {
        Condition::Eq(column, value.into())
    }
}

/// A table row with a UUID key and audit columns.
pub trait Record:
    Serialize + DeserializeOwned + for<'r> FromRow<'r, PgRow> + Clone + Send + Sync + Unpin + 'static
{
    const TABLE: &'static str;

    /// Columns matched by the `keywords` filter, joined with OR.
    const SEARCH: &'static [&'static str] = &[];

    /// Columns accepted by `orderBy` in addition to the audit timestamps.
    const SORTABLE: &'static [&'static str] = &[];

    fn id(&self) -> Uuid;

    fn audit(&self) -> &Audit;

    fn audit_mut(&mut self) -> &mut Audit;

    /// Domain columns, excluding `id` and the audit columns.
    fn columns(&self) -> Vec<(&'static str, Param)>;

    fn is_sortable(column: &str) -> bool {
        matches!(column, "created_at" | "updated_at") || Self::SORTABLE.contains(&column)
    }
}

/// Injected storage handle shared by all stores.
#[derive(Clone)]
pub enum Db {
    Postgres(PgPool),
    Memory(MemoryDb),
}

impl Db {
    pub fn memory() -> Self {
        Db::Memory(MemoryDb::default())
    }

    pub fn store<R: Record>(&self) -> Store<R> {
        Store {
            db: self.clone(),
            _record: PhantomData,
        }
    }
}

/// Typed access to one table.
pub struct Store<R> {
    db: Db,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> Store<R> {
    /// One page of matching rows.
    pub async fn list(&self, filter: &ListFilter, scope: &[Condition]) -> AppResult<Vec<R>> {
        match &self.db {
            Db::Postgres(pool) => postgres::list::<R>(pool, filter, scope).await,
            Db::Memory(mem) => mem.list::<R>(filter, scope).await,
        }
    }

    /// Number of rows matching the filter, ignoring paging.
    pub async fn count(&self, filter: &ListFilter, scope: &[Condition]) -> AppResult<i64> {
        match &self.db {
            Db::Postgres(pool) => postgres::count::<R>(pool, filter, scope).await,
            Db::Memory(mem) => mem.count::<R>(filter, scope).await,
        }
    }

    pub async fn total_pages(&self, filter: &ListFilter, scope: &[Condition]) -> AppResult<i64> {
        let count = self.count(filter, scope).await?;
        Ok(filter.total_pages(count))
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Option<R>> {
        self.find_one(&[Condition::eq("id", id)]).await
    }

    /// All matching rows, oldest first.
    pub async fn find(&self, conditions: &[Condition]) -> AppResult<Vec<R>> {
        match &self.db {
            Db::Postgres(pool) => postgres::find::<R>(pool, conditions).await,
            Db::Memory(mem) => mem.find::<R>(conditions).await,
        }
    }

    pub async fn find_one(&self, conditions: &[Condition]) -> AppResult<Option<R>> {
        Ok(self.find(conditions).await?.into_iter().next())
    }

    pub async fn insert(&self, record: &R) -> AppResult<()> {
        match &self.db {
            Db::Postgres(pool) => postgres::insert(pool, record).await,
            Db::Memory(mem) => mem.insert(record).await,
        }
    }

    /// Overwrites the domain columns and update stamps of a live row.
    /// Returns `false` when the row is missing or soft-deleted.
    pub async fn update(&self, record: &R) -> AppResult<bool> {
        match &self.db {
            Db::Postgres(pool) => postgres::update(pool, record).await,
            Db::Memory(mem) => mem.update(record).await,
        }
    }
}

/// Soft-delete capability shared by every store.
#[async_trait]
pub trait Lifecycle {
    /// Flags one live row as deleted. Returns `false` when nothing matched.
    async fn mark_deleted(&self, id: Uuid, actor: Option<Uuid>) -> AppResult<bool>;

    /// Flags every live row matching `conditions` as deleted.
    async fn mark_deleted_where(&self, conditions: &[Condition], actor: Option<Uuid>)
    -> AppResult<u64>;
}

#[async_trait]
impl<R: Record> Lifecycle for Store<R> {
    async fn mark_deleted(&self, id: Uuid, actor: Option<Uuid>) -> AppResult<bool> {
        let affected = self
            .mark_deleted_where(&[Condition::eq("id", id)], actor)
            .await?;
        Ok(affected > 0)
    }

    async fn mark_deleted_where(
        &self,
        conditions: &[Condition],
        actor: Option<Uuid>,
    ) -> AppResult<u64> {
        match &self.db {
            Db::Postgres(pool) => postgres::mark_deleted::<R>(pool, conditions, actor).await,
            Db::Memory(mem) => mem.mark_deleted::<R>(conditions, actor).await,
        }
    }
}
