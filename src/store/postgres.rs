// src/store/postgres.rs

use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::AppResult;

use super::{Condition, ListFilter, Param, Record};

/// Appends `WHERE deleted = FALSE` plus the given predicates.
fn push_conditions(builder: &mut QueryBuilder<'_, Postgres>, conditions: &[Condition]) {
    builder.push(" WHERE deleted = FALSE");

    for condition in conditions {
        match condition {
            Condition::Eq(column, param) if param.is_null() => {
                builder.push(" AND ").push(*column).push(" IS NULL");
            }
            Condition::Eq(column, param) => {
                builder.push(" AND ").push(*column).push(" = ");
                param.clone().bind(builder);
            }
            Condition::EqIgnoreCase(column, value) => {
                builder.push(" AND LOWER(").push(*column).push(") = LOWER(");
                builder.push_bind(value.clone());
                builder.push(")");
            }
            Condition::In(_, ids) if ids.is_empty() => {
                builder.push(" AND FALSE");
            }
            Condition::In(column, ids) => {
                builder.push(" AND ").push(*column).push(" = ANY(");
                builder.push_bind(ids.clone());
                builder.push(")");
            }
        }
    }
}

fn push_keywords<R: Record>(builder: &mut QueryBuilder<'_, Postgres>, filter: &ListFilter) {
    let Some(pattern) = filter.like_pattern() else {
        return;
    };
    if R::SEARCH.is_empty() {
        return;
    }

    builder.push(" AND (");
    for (i, column) in R::SEARCH.iter().enumerate() {
        if i > 0 {
            builder.push(" OR ");
        }
        builder.push(*column).push(" ILIKE ");
        builder.push_bind(pattern.clone());
    }
    builder.push(")");
}

pub async fn list<R: Record>(
    pool: &PgPool,
    filter: &ListFilter,
    scope: &[Condition],
) -> AppResult<Vec<R>> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM ");
    builder.push(R::TABLE);
    push_conditions(&mut builder, scope);
    push_keywords::<R>(&mut builder, filter);

    // order column is checked against `Record::is_sortable` by `ListParams::resolve`
    builder
        .push(" ORDER BY ")
        .push(&filter.order_column)
        .push(if filter.descending { " DESC" } else { " ASC" })
        .push(", id ASC LIMIT ");
    builder.push_bind(filter.limit);
    builder.push(" OFFSET ");
    builder.push_bind(filter.offset());

    let rows = builder.build_query_as::<R>().fetch_all(pool).await?;
    Ok(rows)
}

pub async fn count<R: Record>(
    pool: &PgPool,
    filter: &ListFilter,
    scope: &[Condition],
) -> AppResult<i64> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM ");
    builder.push(R::TABLE);
    push_conditions(&mut builder, scope);
    push_keywords::<R>(&mut builder, filter);

    let count = builder.build_query_scalar::<i64>().fetch_one(pool).await?;
    Ok(count)
}

pub async fn find<R: Record>(pool: &PgPool, conditions: &[Condition]) -> AppResult<Vec<R>> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM ");
    builder.push(R::TABLE);
    push_conditions(&mut builder, conditions);
    builder.push(" ORDER BY created_at ASC, id ASC");

    let rows = builder.build_query_as::<R>().fetch_all(pool).await?;
    Ok(rows)
}

pub async fn insert<R: Record>(pool: &PgPool, record: &R) -> AppResult<()> {
    let mut columns: Vec<(&'static str, Param)> = vec![("id", Param::from(record.id()))];
    columns.extend(record.columns());
    columns.extend(record.audit().columns());

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("INSERT INTO ");
    builder.push(R::TABLE).push(" (");
    for (i, (name, _)) in columns.iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        builder.push(*name);
    }
    builder.push(") VALUES (");
    for (i, (_, param)) in columns.into_iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        param.bind(&mut builder);
    }
    builder.push(")");

    builder.build().execute(pool).await?;
    Ok(())
}

pub async fn update<R: Record>(pool: &PgPool, record: &R) -> AppResult<bool> {
    let audit = record.audit();
    let mut columns = record.columns();
    columns.push(("updated_at", Param::Time(audit.updated_at)));
    columns.push(("updated_by", Param::Uuid(audit.updated_by)));

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE ");
    builder.push(R::TABLE).push(" SET ");
    for (i, (name, param)) in columns.into_iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        builder.push(name).push(" = ");
        param.bind(&mut builder);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(record.id());
    builder.push(" AND deleted = FALSE");

    let result = builder.build().execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

pub async fn mark_deleted<R: Record>(
    pool: &PgPool,
    conditions: &[Condition],
    actor: Option<Uuid>,
) -> AppResult<u64> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE ");
    builder.push(R::TABLE).push(" SET deleted = TRUE, updated_at = ");
    builder.push_bind(Utc::now());
    builder.push(", updated_by = ");
    builder.push_bind(actor);
    push_conditions(&mut builder, conditions);

    let result = builder.build().execute(pool).await?;
    Ok(result.rows_affected())
}

/// True when the error is a Postgres unique violation (SQLSTATE 23505).
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db_err| db_err.code())
        .is_some_and(|code| code == "23505")
}
