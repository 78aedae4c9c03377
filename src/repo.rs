use async_trait::async_trait;
use serde_json::Value;
use sqlx::{sqlite::SqliteRow, Column, Row as _, SqlitePool, TypeInfo, ValueRef};
use tracing::debug;

use crate::{
    id::new_uuid_v7,
    model::schema_for,
    schema::{EntitySchema, FieldKind, Row, CREATED_AT, ID, UPDATED_AT},
    store::{Query, RecordStore, STORE_NOT_FOUND, STORE_UNKNOWN_COLUMN, STORE_UNKNOWN_TABLE},
    time::now_ms,
    AppError, AppResult,
};

fn ensure_table(table: &str) -> AppResult<&'static EntitySchema> {
    schema_for(table).ok_or_else(|| {
        AppError::new(STORE_UNKNOWN_TABLE, "invalid table").in_table(table)
    })
}

fn ensure_column(schema: &EntitySchema, column: &str) -> AppResult<()> {
    if schema.has_column(column) {
        Ok(())
    } else {
        Err(AppError::new(STORE_UNKNOWN_COLUMN, "invalid column")
            .in_table(schema.table)
            .with_context("column", column.to_string()))
    }
}

fn row_to_value(schema: &EntitySchema, row: SqliteRow) -> Row {
    let mut map = Row::new();
    for col in row.columns() {
        let idx = col.ordinal();
        let v = row.try_get_raw(idx).ok();
        let val = match v {
            Some(raw) => {
                if raw.is_null() {
                    Value::Null
                } else {
                    match raw.type_info().name() {
                        "INTEGER" => row
                            .try_get::<i64, _>(idx)
                            .map(Value::from)
                            .unwrap_or(Value::Null),
                        "REAL" => row
                            .try_get::<f64, _>(idx)
                            .map(Value::from)
                            .unwrap_or(Value::Null),
                        _ => row
                            .try_get::<String, _>(idx)
                            .map(Value::from)
                            .unwrap_or(Value::Null),
                    }
                }
            }
            None => Value::Null,
        };
        map.insert(col.name().to_string(), val);
    }

    // Text lists are stored as JSON; anything unparseable is left for narrowing.
    for spec in schema.fields.iter().filter(|f| f.kind == FieldKind::TextList) {
        if let Some(Value::String(text)) = map.get(spec.name) {
            if let Ok(parsed @ Value::Array(_)) = serde_json::from_str::<Value>(text) {
                map.insert(spec.name.to_string(), parsed);
            }
        }
    }
    map
}

fn bind_value<'q>(
    q: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    v: &Value,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    match v {
        Value::Null => q.bind(Option::<i64>::None),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(Option::<i64>::None)
            }
        }
        Value::Bool(b) => q.bind(*b as i64),
        Value::String(s) => q.bind(s.clone()),
        _ => q.bind(v.to_string()),
    }
}

/// [`RecordStore`] over the app's SQLite database.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteStore { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn select_inner(&self, table: &str, query: &Query) -> AppResult<Vec<Row>> {
        let schema = ensure_table(table)?;
        ensure_column(schema, query.order.column)?;
        for (column, _) in &query.filters {
            ensure_column(schema, column)?;
        }

        let mut sql = format!("SELECT * FROM {table}");
        if !query.filters.is_empty() {
            let clauses: Vec<String> = query
                .filters
                .iter()
                .map(|(c, _)| format!("{c} = ?"))
                .collect();
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        let dir = if query.order.descending { "DESC" } else { "ASC" };
        sql.push_str(&format!(" ORDER BY {} {dir}, id {dir}", query.order.column));

        let mut q = sqlx::query(&sql);
        for (_, value) in &query.filters {
            q = bind_value(q, value);
        }
        let rows = q.fetch_all(&self.pool).await.map_err(AppError::from)?;
        debug!(target: "together", event = "store_select", table, rows = rows.len());
        Ok(rows.into_iter().map(|r| row_to_value(schema, r)).collect())
    }

    async fn insert_inner(&self, table: &str, mut data: Row) -> AppResult<Row> {
        let schema = ensure_table(table)?;
        let now = now_ms();
        data.insert(ID.into(), Value::String(new_uuid_v7()));
        data.insert(CREATED_AT.into(), Value::from(now));
        if schema.has_updated_at {
            data.insert(UPDATED_AT.into(), Value::from(now));
        } else {
            data.remove(UPDATED_AT);
        }

        let cols: Vec<String> = data.keys().cloned().collect();
        for c in &cols {
            ensure_column(schema, c)?;
        }
        let placeholders: Vec<&str> = cols.iter().map(|_| "?").collect();
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({}) RETURNING *",
            cols.join(","),
            placeholders.join(",")
        );
        let mut query = sqlx::query(&sql);
        for c in &cols {
            query = bind_value(query, &data[c.as_str()]);
        }
        let row = query.fetch_one(&self.pool).await.map_err(AppError::from)?;
        debug!(target: "together", event = "store_insert", table);
        Ok(row_to_value(schema, row))
    }

    async fn update_inner(&self, table: &str, id: &str, mut data: Row) -> AppResult<Row> {
        let schema = ensure_table(table)?;
        data.remove(ID);
        data.remove(CREATED_AT);
        if schema.has_updated_at {
            data.insert(UPDATED_AT.into(), Value::from(now_ms()));
        } else {
            data.remove(UPDATED_AT);
        }

        let cols: Vec<String> = data.keys().cloned().collect();
        for c in &cols {
            ensure_column(schema, c)?;
        }

        let fetched = if cols.is_empty() {
            sqlx::query(&format!("SELECT * FROM {table} WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
        } else {
            let set_clause: Vec<String> = cols.iter().map(|c| format!("{c} = ?")).collect();
            let sql = format!(
                "UPDATE {table} SET {} WHERE id = ? RETURNING *",
                set_clause.join(",")
            );
            let mut query = sqlx::query(&sql);
            for c in &cols {
                query = bind_value(query, &data[c.as_str()]);
            }
            query.bind(id).fetch_optional(&self.pool).await
        };

        let row = fetched
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::new(STORE_NOT_FOUND, "id not found"))?;
        debug!(target: "together", event = "store_update", table, id);
        Ok(row_to_value(schema, row))
    }

    async fn delete_inner(&self, table: &str, id: &str) -> AppResult<()> {
        ensure_table(table)?;
        let res = sqlx::query(&format!("DELETE FROM {table} WHERE id = ?"))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        if res.rows_affected() == 0 {
            return Err(AppError::new(STORE_NOT_FOUND, "id not found"));
        }
        debug!(target: "together", event = "store_delete", table, id);
        Ok(())
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn select(&self, table: &str, query: &Query) -> AppResult<Vec<Row>> {
        self.select_inner(table, query).await.map_err(|err| {
            err.with_context("operation", "select")
                .in_table(table)
        })
    }

    async fn insert(&self, table: &str, row: Row) -> AppResult<Row> {
        self.insert_inner(table, row).await.map_err(|err| {
            err.with_context("operation", "insert")
                .in_table(table)
        })
    }

    async fn update(&self, table: &str, id: &str, changes: Row) -> AppResult<Row> {
        self.update_inner(table, id, changes).await.map_err(|err| {
            err.with_context("operation", "update")
                .in_table(table)
                .with_context("id", id.to_string())
        })
    }

    async fn delete(&self, table: &str, id: &str) -> AppResult<()> {
        self.delete_inner(table, id).await.map_err(|err| {
            err.with_context("operation", "delete")
                .in_table(table)
                .with_context("id", id.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CHECKINS, GOALS};
    use crate::schema::fields;
    use serde_json::json;

    async fn store() -> SqliteStore {
        let pool = crate::db::open_memory_pool().await.expect("pool");
        crate::migrate::apply_migrations(&pool).await.expect("migrate");
        SqliteStore::new(pool)
    }

    #[tokio::test]
    async fn insert_assigns_identity_and_stamps() {
        let store = store().await;
        let row = store
            .insert(
                "checkins",
                fields(json!({ "date": "2025-08-09", "checkin_type": "monthly" })),
            )
            .await
            .expect("insert");
        assert_eq!(row[ID].as_str().map(str::len), Some(36));
        assert!(row[CREATED_AT].as_i64().unwrap() > 0);
        assert!(!row.contains_key(UPDATED_AT));
    }

    #[tokio::test]
    async fn select_filters_and_orders() {
        let store = store().await;
        for (date, kind) in [("2025-08-01", "weekly"), ("2025-08-15", "weekly"), ("2025-08-10", "monthly")] {
            store
                .insert("checkins", fields(json!({ "date": date, "checkin_type": kind })))
                .await
                .expect("insert");
        }
        let rows = store
            .select("checkins", &Query::ordered(CHECKINS.sort).eq("checkin_type", "weekly"))
            .await
            .expect("select");
        let dates: Vec<_> = rows.iter().map(|r| r["date"].as_str().unwrap()).collect();
        assert_eq!(dates, vec!["2025-08-15", "2025-08-01"]);
    }

    #[tokio::test]
    async fn unknown_tables_and_columns_are_refused() {
        let store = store().await;
        let err = store
            .select("academics", &Query::ordered(GOALS.sort))
            .await
            .unwrap_err();
        assert_eq!(err.code(), STORE_UNKNOWN_TABLE);
        assert_eq!(err.context().get("operation"), Some(&"select".to_string()));

        let err = store
            .insert("goals", fields(json!({ "title": "x", "partner_id": "p" })))
            .await
            .unwrap_err();
        assert_eq!(err.code(), STORE_UNKNOWN_COLUMN);
    }

    #[tokio::test]
    async fn missing_ids_are_not_found() {
        let store = store().await;
        let err = store
            .update("goals", "nope", fields(json!({ "progress": 5 })))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.context().get("id"), Some(&"nope".to_string()));
        assert!(store.delete("goals", "nope").await.unwrap_err().is_not_found());
    }
}
