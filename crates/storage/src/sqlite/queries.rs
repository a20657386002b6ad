use crate::codec::{ColumnType, Record, Value};
use crate::error::Result;
use crate::gc::{Sweep, STALE_UPLOAD_AGE};
use crate::keys::{Kind, SINGLETON_ID};
use sqlx::sqlite::SqliteRow;
use common::UploadStatus;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

/// Query operations for SQLite storage
pub struct Queries;

impl Queries {
    /// Insert or fully replace the row with primary key `id`
    pub async fn upsert<R: Record>(pool: &SqlitePool, id: &str, record: &R) -> Result<()> {
        let sql = upsert_sql::<R>();
        let mut query = sqlx::query(&sql).bind(row_id(R::KIND, id));
        for value in record.encode() {
            query = match value {
                Value::Text(text) => query.bind(text),
                Value::Int(number) => query.bind(number),
                Value::Bool(flag) => query.bind(flag),
            };
        }
        query.execute(pool).await?;
        Ok(())
    }

    pub async fn select<R: Record>(pool: &SqlitePool, id: &str) -> Result<Option<R>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ?",
            column_list::<R>(),
            R::KIND.table()
        );
        let row = sqlx::query(&sql)
            .bind(row_id(R::KIND, id))
            .fetch_optional(pool)
            .await?;
        row.map(|row| decode_row(&row, id)).transpose()
    }

    pub async fn select_all<R: Record>(pool: &SqlitePool) -> Result<HashMap<String, R>> {
        let sql = format!(
            "SELECT id, {} FROM {}",
            column_list::<R>(),
            R::KIND.table()
        );
        let rows = sqlx::query(&sql).fetch_all(pool).await?;

        let mut records = HashMap::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id")?;
            let record = decode_row(&row, &id)?;
            records.insert(id, record);
        }
        Ok(records)
    }

    pub async fn delete(pool: &SqlitePool, kind: Kind, id: &str) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE id = ?", kind.table());
        sqlx::query(&sql)
            .bind(row_id(kind, id))
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Delete `id` only if the row still matches `sweep`, in one statement
    pub async fn delete_if(pool: &SqlitePool, sweep: Sweep, id: &str, now: i64) -> Result<bool> {
        let (sql, now_binds) = sweep_sql(sweep);
        let mut query = sqlx::query(&sql).bind(id);
        for _ in 0..now_binds {
            query = query.bind(now);
        }
        let result = query.execute(pool).await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_all(pool: &SqlitePool, kind: Kind) -> Result<u64> {
        let sql = format!("DELETE FROM {}", kind.table());
        let result = sqlx::query(&sql).execute(pool).await?;
        Ok(result.rows_affected())
    }

    pub async fn user_version(pool: &SqlitePool) -> Result<i32> {
        let version: i32 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(pool)
            .await?;
        Ok(version)
    }

    pub async fn set_user_version(pool: &SqlitePool, version: i32) -> Result<()> {
        // PRAGMA takes no bind parameters
        sqlx::query(&format!("PRAGMA user_version = {version}"))
            .execute(pool)
            .await?;
        Ok(())
    }
}

fn row_id(kind: Kind, id: &str) -> &str {
    if kind.is_singleton() {
        SINGLETON_ID
    } else {
        id
    }
}

fn column_list<R: Record>() -> String {
    R::COLUMNS
        .iter()
        .map(|column| column.column)
        .collect::<Vec<_>>()
        .join(", ")
}

fn upsert_sql<R: Record>() -> String {
    let placeholders = vec!["?"; R::COLUMNS.len() + 1].join(", ");
    let updates = R::COLUMNS
        .iter()
        .map(|column| format!("{0} = excluded.{0}", column.column))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} (id, {}) VALUES ({}) ON CONFLICT(id) DO UPDATE SET {}",
        R::KIND.table(),
        column_list::<R>(),
        placeholders,
        updates
    )
}

/// The statement and how many times `now` is bound after the id
fn sweep_sql(sweep: Sweep) -> (String, usize) {
    let (condition, now_binds) = match sweep {
        Sweep::ExpiredSession => ("renew_at <= ? OR valid_until <= ?".to_string(), 2),
        Sweep::StaleUpload => (
            format!(
                "current_status = {} AND (last_update = 0 OR ? - last_update > {})",
                UploadStatus::IN_PROGRESS,
                STALE_UPLOAD_AGE
            ),
            1,
        ),
    };
    let sql = format!(
        "DELETE FROM {} WHERE id = ? AND ({})",
        sweep.kind().table(),
        condition
    );
    (sql, now_binds)
}

fn decode_row<R: Record>(row: &SqliteRow, id: &str) -> Result<R> {
    let mut values = Vec::with_capacity(R::COLUMNS.len());
    for column in R::COLUMNS {
        let value = match column.ty {
            ColumnType::Text => Value::Text(row.try_get(column.column)?),
            ColumnType::Int => Value::Int(row.try_get(column.column)?),
            ColumnType::Bool => Value::Bool(row.try_get(column.column)?),
        };
        values.push(value);
    }
    R::decode(id, values)
}
