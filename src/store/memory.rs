// src/store/memory.rs

use std::{cmp::Ordering, collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

use super::{Condition, ListFilter, Record};

/// In-process backend. Rows are kept in their JSON form, one vector per table,
/// in insertion order.
#[derive(Clone, Default)]
pub struct MemoryDb {
    tables: Arc<RwLock<HashMap<&'static str, Vec<Value>>>>,
}

fn text(row: &Value, column: &str) -> Option<String> {
    row.get(column).and_then(Value::as_str).map(str::to_string)
}

fn matches(row: &Value, conditions: &[Condition]) -> bool {
    if row.get("deleted") != Some(&Value::Bool(false)) {
        return false;
    }

    conditions.iter().all(|condition| match condition {
        Condition::Eq(column, param) => {
            row.get(*column).unwrap_or(&Value::Null) == &param.to_json()
        }
        Condition::EqIgnoreCase(column, value) => text(row, column)
            .is_some_and(|stored| stored.to_lowercase() == value.to_lowercase()),
        Condition::In(column, ids) => text(row, column)
            .and_then(|stored| stored.parse::<Uuid>().ok())
            .is_some_and(|id| ids.contains(&id)),
    })
}

fn matches_keywords<R: Record>(row: &Value, filter: &ListFilter) -> bool {
    if filter.keywords.is_empty() || R::SEARCH.is_empty() {
        return true;
    }
    let needle = filter.keywords.to_lowercase();
    R::SEARCH.iter().any(|column| {
        text(row, column).is_some_and(|stored| stored.to_lowercase().contains(&needle))
    })
}

/// Orders JSON scalars the way the SQL columns would: nulls first, numbers
/// numerically, RFC 3339 strings chronologically.
fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::String(x), Value::String(y)) => {
            match (x.parse::<DateTime<Utc>>(), y.parse::<DateTime<Utc>>()) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        _ => Ordering::Equal,
    }
}

fn decode<R: Record>(rows: Vec<Value>) -> AppResult<Vec<R>> {
    rows.into_iter()
        .map(|row| serde_json::from_value::<R>(row).map_err(AppError::from))
        .collect()
}

impl MemoryDb {
    async fn select<R: Record>(&self, filter: Option<&ListFilter>, conditions: &[Condition]) -> Vec<Value> {
        let tables = self.tables.read().await;
        tables
            .get(R::TABLE)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches(row, conditions))
                    .filter(|row| filter.is_none_or(|f| matches_keywords::<R>(row, f)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub async fn list<R: Record>(
        &self,
        filter: &ListFilter,
        scope: &[Condition],
    ) -> AppResult<Vec<R>> {
        let mut rows = self.select::<R>(Some(filter), scope).await;

        let column = filter.order_column.as_str();
        rows.sort_by(|a, b| {
            let ordering = compare(
                a.get(column).unwrap_or(&Value::Null),
                b.get(column).unwrap_or(&Value::Null),
            );
            if filter.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });

        let page = rows
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.limit as usize)
            .collect();
        decode(page)
    }

    pub async fn count<R: Record>(
        &self,
        filter: &ListFilter,
        scope: &[Condition],
    ) -> AppResult<i64> {
        Ok(self.select::<R>(Some(filter), scope).await.len() as i64)
    }

    pub async fn find<R: Record>(&self, conditions: &[Condition]) -> AppResult<Vec<R>> {
        let mut rows = self.select::<R>(None, conditions).await;
        rows.sort_by(|a, b| {
            compare(
                a.get("created_at").unwrap_or(&Value::Null),
                b.get("created_at").unwrap_or(&Value::Null),
            )
        });
        decode(rows)
    }

    pub async fn insert<R: Record>(&self, record: &R) -> AppResult<()> {
        let row = serde_json::to_value(record)?;
        let id = json!(record.id());

        let mut tables = self.tables.write().await;
        let rows = tables.entry(R::TABLE).or_default();
        if rows.iter().any(|existing| existing.get("id") == Some(&id)) {
            return Err(AppError::Conflict(format!(
                "duplicate key value violates unique constraint \"{}_pkey\"",
                R::TABLE
            )));
        }
        rows.push(row);
        Ok(())
    }

    pub async fn update<R: Record>(&self, record: &R) -> AppResult<bool> {
        let mut replacement = serde_json::to_value(record)?;
        let id = json!(record.id());

        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(R::TABLE) else {
            return Ok(false);
        };
        let Some(row) = rows
            .iter_mut()
            .find(|row| row.get("id") == Some(&id) && row.get("deleted") == Some(&Value::Bool(false)))
        else {
            return Ok(false);
        };

        // creation stamps and the lifecycle flag are never rewritten by an update
        for column in ["deleted", "created_at", "created_by"] {
            if let (Some(slot), Some(kept)) = (replacement.get_mut(column), row.get(column)) {
                *slot = kept.clone();
            }
        }
        *row = replacement;
        Ok(true)
    }

    pub async fn mark_deleted<R: Record>(
        &self,
        conditions: &[Condition],
        actor: Option<Uuid>,
    ) -> AppResult<u64> {
        let now = json!(Utc::now());
        let actor = json!(actor);

        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(R::TABLE) else {
            return Ok(0);
        };

        let mut affected = 0;
        for row in rows.iter_mut().filter(|row| matches(row, conditions)) {
            if let Value::Object(map) = row {
                map.insert("deleted".to_string(), Value::Bool(true));
                map.insert("updated_at".to_string(), now.clone());
                map.insert("updated_by".to_string(), actor.clone());
                affected += 1;
            }
        }
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::lesson::Lesson;
    use crate::models::master::Master;
    use crate::store::{Db, Lifecycle};

    fn lesson(name: &str, description: Option<&str>) -> Lesson {
        Lesson::new(name.to_string(), description.map(str::to_string), None)
    }

    #[tokio::test]
    async fn list_filters_keywords_across_columns() {
        let db = Db::memory();
        let store = db.store::<Lesson>();
        store.insert(&lesson("Algebra", None)).await.unwrap();
        store.insert(&lesson("History", Some("ancient algebra texts"))).await.unwrap();
        store.insert(&lesson("Biology", Some("cells"))).await.unwrap();

        let filter = ListFilter {
            keywords: "ALGEBRA".to_string(),
            ..ListFilter::default()
        };
        let found = store.list(&filter, &[]).await.unwrap();
        let names: Vec<_> = found.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Algebra", "History"]);
        assert_eq!(store.count(&filter, &[]).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn list_sorts_and_pages() {
        let db = Db::memory();
        let store = db.store::<Lesson>();
        for name in ["c", "a", "d", "b"] {
            store.insert(&lesson(name, None)).await.unwrap();
        }

        let filter = ListFilter {
            limit: 2,
            page: 2,
            order_column: "name".to_string(),
            descending: true,
            ..ListFilter::default()
        };
        let page = store.list(&filter, &[]).await.unwrap();
        let names: Vec<_> = page.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(store.total_pages(&filter, &[]).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn soft_deleted_rows_are_invisible() {
        let db = Db::memory();
        let store = db.store::<Lesson>();
        let kept = lesson("kept", None);
        let gone = lesson("gone", None);
        store.insert(&kept).await.unwrap();
        store.insert(&gone).await.unwrap();

        assert!(store.mark_deleted(gone.id, None).await.unwrap());
        assert!(!store.mark_deleted(gone.id, None).await.unwrap());

        assert!(store.get(gone.id).await.unwrap().is_none());
        assert!(store.get(kept.id).await.unwrap().is_some());
        assert_eq!(store.count(&ListFilter::default(), &[]).await.unwrap(), 1);

        let mut revived = gone.clone();
        revived.name = "revived".to_string();
        assert!(!store.update(&revived).await.unwrap());
    }

    #[tokio::test]
    async fn update_keeps_creation_stamps() {
        let db = Db::memory();
        let store = db.store::<Lesson>();
        let actor = Uuid::new_v4();
        let original = Lesson::new("Physics".to_string(), None, Some(actor));
        store.insert(&original).await.unwrap();

        let mut changed = original.clone();
        changed.name = "Applied Physics".to_string();
        changed.audit.created_by = None;
        changed.audit.touch(Some(actor));
        assert!(store.update(&changed).await.unwrap());

        let stored = store.get(original.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Applied Physics");
        assert_eq!(stored.audit.created_by, Some(actor));
        assert_eq!(stored.audit.updated_by, Some(actor));
    }

    #[tokio::test]
    async fn duplicate_ids_conflict() {
        let db = Db::memory();
        let store = db.store::<Lesson>();
        let record = lesson("once", None);
        store.insert(&record).await.unwrap();
        assert!(matches!(store.insert(&record).await, Err(AppError::Conflict(_))));
    }

    #[test]
    fn compare_orders_timestamps_chronologically() {
        let earlier = json!("2024-01-01T09:00:00.5Z");
        let later = json!("2024-01-01T10:00:00Z");
        assert_eq!(compare(&earlier, &later), Ordering::Less);
        assert_eq!(compare(&Value::Null, &later), Ordering::Less);
        assert_eq!(compare(&json!(3), &json!(12)), Ordering::Less);
    }
}
