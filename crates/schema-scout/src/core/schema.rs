use std::collections::HashSet;

use sqlx::{PgConnection, Row};

use crate::core::types::{ColumnDef, TableColumns, TableDefinition};
use crate::error::AppResult;

/// Catalog queries are scoped to a single schema. Multi-schema discovery is
/// not supported; widening this requires revisiting every query below.
pub const SCHEMA_SCOPE: &str = "public";

const LIST_TABLES_SQL: &str = "SELECT tablename::text FROM pg_tables WHERE schemaname = $1";

// Reconstructs column definitions from the attribute catalog instead of
// parsing DDL. Dropped columns keep their attnum slot, hence the filter.
const DESCRIBE_TABLE_SQL: &str = "\
SELECT pg_attribute.attname::text AS column_name,
       format_type(pg_attribute.atttypid, pg_attribute.atttypmod) AS data_type
FROM pg_class
JOIN pg_namespace ON pg_namespace.oid = pg_class.relnamespace
JOIN pg_attribute ON pg_attribute.attrelid = pg_class.oid
WHERE pg_attribute.attnum > 0
  AND NOT pg_attribute.attisdropped
  AND pg_class.relname = $1
  AND pg_namespace.nspname = $2
ORDER BY pg_attribute.attnum";

// Joined against information_schema.tables so views stay out, matching the
// filter of LIST_TABLES_SQL.
const COLUMNS_PER_TABLE_SQL: &str = "\
SELECT c.table_name::text,
       array_agg(c.column_name::text ORDER BY c.ordinal_position) AS columns
FROM information_schema.columns c
JOIN information_schema.tables t
  ON t.table_schema = c.table_schema AND t.table_name = c.table_name
WHERE c.table_schema = $1
  AND t.table_type = 'BASE TABLE'
GROUP BY c.table_name
ORDER BY c.table_name";

// Tables whose foreign keys point at the given table.
const REFERENCING_TABLES_SQL: &str = "\
SELECT a.relname::text
FROM pg_constraint con
JOIN pg_class a ON a.oid = con.conrelid
WHERE con.confrelid = (SELECT oid FROM pg_class WHERE relname = $1)
LIMIT $2";

// Tables the given table points at through its own foreign keys.
const REFERENCED_TABLES_SQL: &str = "\
SELECT a.relname::text
FROM pg_constraint con
JOIN pg_class a ON a.oid = con.confrelid
WHERE con.conrelid = (SELECT oid FROM pg_class WHERE relname = $1)
LIMIT $2";

/// Names of all user tables, in the database's natural catalog order.
pub async fn list_tables(conn: &mut PgConnection) -> AppResult<Vec<String>> {
    let rows = sqlx::query(LIST_TABLES_SQL)
        .bind(SCHEMA_SCOPE)
        .fetch_all(&mut *conn)
        .await?;
    let mut tables = Vec::with_capacity(rows.len());
    for row in rows {
        tables.push(row.try_get::<String, _>(0)?);
    }
    Ok(tables)
}

/// Rebuilds the column-level definition of one table from the catalog.
///
/// The table name is a bound parameter, never interpolated. An unknown table
/// yields a definition with no columns.
pub async fn describe_table(conn: &mut PgConnection, table: &str) -> AppResult<TableDefinition> {
    let rows = sqlx::query(DESCRIBE_TABLE_SQL)
        .bind(table)
        .bind(SCHEMA_SCOPE)
        .fetch_all(&mut *conn)
        .await?;
    let mut columns = Vec::with_capacity(rows.len());
    for row in rows {
        columns.push(ColumnDef {
            name: row.try_get("column_name")?,
            data_type: row.try_get("data_type")?,
        });
    }
    Ok(TableDefinition {
        name: table.to_string(),
        columns,
    })
}

/// Definition of every user table, preserving `list_tables` order.
pub async fn describe_all_tables(conn: &mut PgConnection) -> AppResult<Vec<TableDefinition>> {
    let tables = list_tables(&mut *conn).await?;
    let mut definitions = Vec::with_capacity(tables.len());
    for table in &tables {
        definitions.push(describe_table(&mut *conn, table).await?);
    }
    Ok(definitions)
}

/// Per-table column names via a single aggregate query.
pub async fn list_columns_per_table(conn: &mut PgConnection) -> AppResult<Vec<TableColumns>> {
    let rows = sqlx::query(COLUMNS_PER_TABLE_SQL)
        .bind(SCHEMA_SCOPE)
        .fetch_all(&mut *conn)
        .await?;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(TableColumns {
            table_name: row.try_get(0)?,
            columns: row.try_get("columns")?,
        });
    }
    Ok(out)
}

/// Tables related to the given tables through foreign keys, in both
/// directions, capped at `max_per_table` per table and direction. The result
/// is an unordered de-duplicated set; callers wanting deterministic output
/// sort at their boundary.
pub async fn related_tables(
    conn: &mut PgConnection,
    tables: &[String],
    max_per_table: usize,
) -> AppResult<HashSet<String>> {
    let limit = max_per_table as i64;
    let mut related = HashSet::new();
    for table in tables {
        for sql in [REFERENCING_TABLES_SQL, REFERENCED_TABLES_SQL] {
            let rows = sqlx::query(sql)
                .bind(table)
                .bind(limit)
                .fetch_all(&mut *conn)
                .await?;
            for row in rows {
                related.insert(row.try_get::<String, _>(0)?);
            }
        }
    }
    Ok(related)
}
