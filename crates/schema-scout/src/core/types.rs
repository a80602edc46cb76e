use serde::{Deserialize, Serialize};

/// One column of a reconstructed table definition, in catalog ordinal order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: String,
}

/// A column-level table definition reconstructed from catalog metadata.
///
/// Immutable once built; the canonical `CREATE TABLE` text form is both the
/// human-readable rendering and the unit fed to relevance ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl TableDefinition {
    pub fn create_table_text(&self) -> String {
        if self.columns.is_empty() {
            return format!("CREATE TABLE {} (\n);", self.name);
        }
        let columns = self
            .columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.data_type))
            .collect::<Vec<_>>()
            .join(",\n");
        format!("CREATE TABLE {} (\n{}\n);", self.name, columns)
    }
}

/// Lightweight per-table column summary from the aggregate catalog query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableColumns {
    pub table_name: String,
    pub columns: Vec<String>,
}

pub type DbRow = serde_json::Map<String, serde_json::Value>;

/// A fully materialized statement result. `columns` carries the column order
/// reported by the database; every row holds the same column set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<DbRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(name: &str, columns: &[(&str, &str)]) -> TableDefinition {
        TableDefinition {
            name: name.to_string(),
            columns: columns
                .iter()
                .map(|(n, t)| ColumnDef {
                    name: n.to_string(),
                    data_type: t.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn create_table_text_renders_columns_in_order() {
        let d = def("orders", &[("id", "integer"), ("name", "text")]);
        assert_eq!(d.create_table_text(), "CREATE TABLE orders (\nid integer,\nname text\n);");
    }

    #[test]
    fn create_table_text_single_column_has_no_trailing_comma() {
        let d = def("events", &[("id", "bigint")]);
        assert_eq!(d.create_table_text(), "CREATE TABLE events (\nid bigint\n);");
    }

    #[test]
    fn create_table_text_without_columns() {
        let d = def("empty", &[]);
        assert_eq!(d.create_table_text(), "CREATE TABLE empty (\n);");
    }
}
