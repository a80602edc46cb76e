use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{Column, Executor, PgConnection, Row, Statement, TypeInfo, ValueRef};

use crate::core::types::{DbRow, QueryResult};
use crate::error::AppResult;

/// Runs one statement and materializes the whole result set.
///
/// Column names come from the prepared statement's metadata, so they are
/// available even when the statement returns no rows. Execution errors are
/// surfaced verbatim; SQL correctness is the caller's responsibility and
/// nothing is retried.
pub async fn run_query(conn: &mut PgConnection, sql: &str) -> AppResult<QueryResult> {
    let stmt = conn.prepare(sql).await?;
    let columns: Vec<String> = stmt.columns().iter().map(|c| c.name().to_string()).collect();

    let pg_rows = stmt.query().fetch_all(&mut *conn).await?;

    let mut rows = Vec::with_capacity(pg_rows.len());
    for row in &pg_rows {
        let mut out = DbRow::new();
        for (i, name) in columns.iter().enumerate() {
            out.insert(name.clone(), decode_value(row, i));
        }
        rows.push(out);
    }

    Ok(QueryResult { columns, rows })
}

/// Decodes one cell into a JSON scalar by its Postgres type.
///
/// Datetime types become ISO-8601 strings; numeric and uuid keep their
/// textual form; anything unrecognized is attempted as text and finally
/// decays to null with a logged warning.
fn decode_value(row: &PgRow, idx: usize) -> Value {
    match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(index = idx, error = %e, "could not read column value; emitting null");
            return Value::Null;
        }
    }

    let column = &row.columns()[idx];
    let type_name = column.type_info().name();
    let decoded = match type_name {
        "BOOL" => row.try_get::<bool, _>(idx).map(Value::Bool),
        "INT2" => row.try_get::<i16, _>(idx).map(|v| Value::from(i64::from(v))),
        "INT4" => row.try_get::<i32, _>(idx).map(|v| Value::from(i64::from(v))),
        "INT8" => row.try_get::<i64, _>(idx).map(Value::from),
        "FLOAT4" => row.try_get::<f32, _>(idx).map(|v| json_number(f64::from(v))),
        "FLOAT8" => row.try_get::<f64, _>(idx).map(json_number),
        "NUMERIC" => row
            .try_get::<sqlx::types::Decimal, _>(idx)
            .map(|v| Value::String(v.to_string())),
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => {
            row.try_get::<String, _>(idx).map(Value::String)
        }
        "TIMESTAMP" => row
            .try_get::<NaiveDateTime, _>(idx)
            .map(|v| Value::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        "TIMESTAMPTZ" => row
            .try_get::<DateTime<Utc>, _>(idx)
            .map(|v| Value::String(v.to_rfc3339())),
        "DATE" => row
            .try_get::<NaiveDate, _>(idx)
            .map(|v| Value::String(v.format("%Y-%m-%d").to_string())),
        "TIME" => row
            .try_get::<NaiveTime, _>(idx)
            .map(|v| Value::String(v.format("%H:%M:%S%.f").to_string())),
        "UUID" => row
            .try_get::<sqlx::types::Uuid, _>(idx)
            .map(|v| Value::String(v.to_string())),
        "JSON" | "JSONB" => row.try_get::<Value, _>(idx),
        _ => row.try_get::<String, _>(idx).map(Value::String),
    };

    match decoded {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(
                column = column.name(),
                column_type = type_name,
                error = %e,
                "could not decode column value; emitting null"
            );
            Value::Null
        }
    }
}

fn json_number(v: f64) -> Value {
    // JSON has no NaN or infinity.
    serde_json::Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
}
