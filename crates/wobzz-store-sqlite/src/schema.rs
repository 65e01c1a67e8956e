//! SQL generated from the [`wobzz_core::schema`] catalog.

use wobzz_core::schema::{Column, ColumnType, TableDef};

/// Connection settings applied once at open.
pub const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA synchronous  = NORMAL;
PRAGMA foreign_keys = OFF;
";

fn sql_type(ty: ColumnType) -> &'static str {
  match ty {
    ColumnType::Integer | ColumnType::Bit => "INTEGER",
    // Dates stay ISO text; decimals stay exact text.
    ColumnType::Text | ColumnType::Date | ColumnType::Decimal => "TEXT",
  }
}

fn column_ddl(table: &TableDef, column: &Column) -> String {
  let mut ddl = format!("    {} {}", column.name, sql_type(column.ty));
  if column.not_null {
    ddl.push_str(" NOT NULL");
  }
  if let Some(default) = column.default {
    ddl.push_str(" DEFAULT ");
    ddl.push_str(default);
  }
  if table.key == Some(column.name) {
    ddl.push_str(" PRIMARY KEY");
  }
  if column.ty == ColumnType::Bit {
    ddl.push_str(&format!(" CHECK ({0} IS NULL OR {0} IN (0, 1))", column.name));
  }
  ddl
}

/// `DROP TABLE IF EXISTS` followed by `CREATE TABLE` for `table`.
pub fn recreate_table(table: &TableDef) -> String {
  let mut lines: Vec<String> = table.columns.iter().map(|c| column_ddl(table, c)).collect();
  if !table.natural_key.is_empty() {
    lines.push(format!("    UNIQUE ({})", table.natural_key.join(", ")));
  }
  format!(
    "DROP TABLE IF EXISTS {name};\nCREATE TABLE {name} (\n{body}\n);\n",
    name = table.sql_name(),
    body = lines.join(",\n"),
  )
}

/// Positional `INSERT` for `columns`. Columns with a declared default take it
/// when bound to null, mirroring how a bulk insert treats empty fields.
pub fn insert(table: &TableDef, columns: &[&'static Column]) -> String {
  let names: Vec<&str> = columns.iter().map(|c| c.name).collect();
  let params: Vec<String> = columns
    .iter()
    .enumerate()
    .map(|(i, c)| match c.default {
      Some(default) => format!("COALESCE(?{}, {default})", i + 1),
      None => format!("?{}", i + 1),
    })
    .collect();
  format!(
    "INSERT INTO {} ({}) VALUES ({})",
    table.sql_name(),
    names.join(", "),
    params.join(", "),
  )
}

pub fn select(table: &TableDef, columns: &[&str]) -> String {
  format!("SELECT {} FROM {}", columns.join(", "), table.sql_name())
}

#[cfg(test)]
mod tests {
  use wobzz_core::schema::{DAG, SUBTRAJECT};

  use super::*;

  #[test]
  fn dimension_ddl_has_key_and_unique_natural_key() {
    let ddl = recreate_table(&DAG);
    assert!(ddl.starts_with("DROP TABLE IF EXISTS DIM_DAG;"));
    assert!(ddl.contains("dag_id INTEGER NOT NULL PRIMARY KEY"));
    assert!(ddl.contains("UNIQUE (dag_datum)"));
  }

  #[test]
  fn fact_insert_coalesces_defaults() {
    let columns: Vec<_> = SUBTRAJECT.columns.iter().take(2).collect();
    assert_eq!(
      insert(&SUBTRAJECT, &columns),
      "INSERT INTO FCT_SUBTRAJECT (beh_id, dag_id_begindatum_zorgtraject) \
       VALUES (COALESCE(?1, -1), COALESCE(?2, -4))",
    );
  }
}
