//! SQLite store: per-entity UPDATE batches and raw table import.

use std::path::Path;

use crosswalk_recon::update::{apply_updates, StoreUpdate, UpdateReport, UpdateSink};
use crosswalk_recon::{Schema, Table, Value};
use log::{debug, info};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};

use crate::error::StoreError;

/// Name of the surrogate key column added by [`import_table`].
pub const ROW_ID_COLUMN: &str = "id";

pub struct SqliteStore {
    conn: Connection,
    table: String,
    id_column: String,
}

impl SqliteStore {
    pub fn open(path: &Path, table: &str, id_column: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn, table, id_column)
    }

    /// Wrap an open connection. The table and its id column must exist.
    pub fn with_connection(conn: Connection, table: &str, id_column: &str) -> Result<Self, StoreError> {
        let store = Self {
            conn,
            table: table.to_string(),
            id_column: id_column.to_string(),
        };
        let columns = store.columns()?;
        if columns.is_empty() {
            return Err(StoreError::MissingTable(table.to_string()));
        }
        if !columns.iter().any(|c| c == id_column) {
            return Err(StoreError::MissingColumn {
                table: table.to_string(),
                column: id_column.to_string(),
            });
        }
        Ok(store)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    /// Run all updates inside one transaction. Per-entity failures are
    /// collected in the report and do not roll back the others.
    pub fn apply_batch(&mut self, updates: &[StoreUpdate]) -> Result<UpdateReport, StoreError> {
        self.conn.execute("BEGIN TRANSACTION", [])?;
        let report = apply_updates(self, updates);
        self.conn.execute("COMMIT", [])?;
        Ok(report)
    }
}

impl UpdateSink for SqliteStore {
    type Error = StoreError;

    fn columns(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", quote_ident(&self.table)))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn update(&mut self, update: &StoreUpdate) -> Result<usize, StoreError> {
        let id = SqlValue::Text(update.entity_id.to_string());
        if update.assignments.is_empty() {
            let sql = format!(
                "SELECT COUNT(*) FROM {} WHERE {} = ?1",
                quote_ident(&self.table),
                quote_ident(&self.id_column)
            );
            let count: i64 = self.conn.query_row(&sql, [id], |row| row.get(0))?;
            return Ok(count as usize);
        }

        let sets: Vec<String> = update
            .assignments
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{} = ?{}", quote_ident(column), i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            quote_ident(&self.table),
            sets.join(", "),
            quote_ident(&self.id_column),
            sets.len() + 1
        );
        let mut params: Vec<SqlValue> = update.assignments.iter().map(|(_, v)| to_sql(v)).collect();
        params.push(id);

        debug!("entity {}: {}", update.entity_id, sql);
        Ok(self.conn.execute(&sql, params_from_iter(params))?)
    }
}

/// Load `table` into a new SQLite table of TEXT columns with an
/// autoincrement `id` key. Returns the number of rows inserted.
pub fn import_table(conn: &Connection, name: &str, table: &Table) -> Result<usize, StoreError> {
    // Reserve the surrogate key name; a data column called `id` becomes `id_1`.
    let schema = Schema::with_unique_names(
        std::iter::once(ROW_ID_COLUMN.to_string()).chain(table.schema().names().iter().cloned()),
    );
    let columns: Vec<String> = schema.names()[1..].iter().map(|c| quote_ident(c)).collect();

    let mut create = format!(
        "CREATE TABLE IF NOT EXISTS {} ({} INTEGER PRIMARY KEY AUTOINCREMENT",
        quote_ident(name),
        ROW_ID_COLUMN
    );
    for column in &columns {
        create.push_str(&format!(", {column} TEXT"));
    }
    create.push(')');

    let insert = if columns.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", quote_ident(name))
    } else {
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(name),
            columns.join(", "),
            placeholders.join(", ")
        )
    };

    let tx = conn.unchecked_transaction()?;
    tx.execute(&create, [])?;
    {
        let mut stmt = tx.prepare(&insert)?;
        for row in table.rows() {
            stmt.execute(params_from_iter(row.iter().map(to_text)))?;
        }
    }
    tx.commit()?;

    info!("imported {} rows into '{name}'", table.len());
    Ok(table.len())
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Missing => SqlValue::Null,
        Value::Number(n) if n.is_nan() => SqlValue::Null,
        Value::Number(n) => SqlValue::Real(*n),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
    }
}

fn to_text(value: &Value) -> SqlValue {
    if value.is_missing() {
        SqlValue::Null
    } else {
        SqlValue::Text(value.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosswalk_recon::EntityId;

    fn store() -> SqliteStore {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE suppliers (\"Supplier ID\" INTEGER, \"Status\" TEXT, \"Spend Amount\" REAL);
             INSERT INTO suppliers VALUES (100, 'Pending', 1.0);
             INSERT INTO suppliers VALUES (200, 'Active', 2.0);",
        )
        .unwrap();
        SqliteStore::with_connection(conn, "suppliers", "Supplier ID").unwrap()
    }

    fn update(id: &str, assignments: Vec<(&str, Value)>) -> StoreUpdate {
        StoreUpdate {
            entity_id: EntityId::parse(id).unwrap(),
            assignments: assignments.into_iter().map(|(c, v)| (c.to_string(), v)).collect(),
        }
    }

    #[test]
    fn missing_table_and_column() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(matches!(
            SqliteStore::with_connection(conn, "nope", "id"),
            Err(StoreError::MissingTable(_))
        ));

        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE t (a TEXT)", []).unwrap();
        assert!(matches!(
            SqliteStore::with_connection(conn, "t", "id"),
            Err(StoreError::MissingColumn { .. })
        ));
    }

    #[test]
    fn columns_in_table_order() {
        assert_eq!(store().columns().unwrap(), vec!["Supplier ID", "Status", "Spend Amount"]);
    }

    #[test]
    fn batch_updates_and_reports() {
        let mut store = store();
        let updates = vec![
            update("100", vec![("Status", Value::text("Approved")), ("Spend Amount", Value::Number(9.5))]),
            update("999", vec![("Status", Value::text("Ghost"))]),
            update("200", vec![("No Such Column", Value::text("x"))]),
        ];
        let report = store.apply_batch(&updates).unwrap();
        assert_eq!(report.attempted, 3);
        assert_eq!(report.applied, 1);
        assert_eq!(report.discrepancies.len(), 2);
        assert_eq!(report.discrepancies[0].entity_id, "999");
        assert_eq!(report.discrepancies[1].entity_id, "200");

        let (status, spend): (String, f64) = store
            .connection()
            .query_row(
                "SELECT \"Status\", \"Spend Amount\" FROM suppliers WHERE \"Supplier ID\" = 100",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(status, "Approved");
        assert_eq!(spend, 9.5);
    }

    #[test]
    fn missing_value_writes_null() {
        let mut store = store();
        let report = store
            .apply_batch(&[update("200", vec![("Spend Amount", Value::Missing)])])
            .unwrap();
        assert_eq!(report.applied, 1);
        let spend: Option<f64> = store
            .connection()
            .query_row("SELECT \"Spend Amount\" FROM suppliers WHERE \"Supplier ID\" = 200", [], |r| r.get(0))
            .unwrap();
        assert_eq!(spend, None);
    }

    #[test]
    fn import_creates_text_table() {
        let conn = Connection::open_in_memory().unwrap();
        let table = Table::from_rows(
            Schema::new(["id", "Supplier Name", "Wave"]).unwrap(),
            vec![
                vec![Value::text("7"), Value::text("Acme"), Value::Number(3.0)],
                vec![Value::text("8"), Value::text("Globex"), Value::Missing],
            ],
        )
        .unwrap();
        assert_eq!(import_table(&conn, "data_dump_raw", &table).unwrap(), 2);

        let rows: Vec<(i64, String, String, Option<String>)> = conn
            .prepare("SELECT id, id_1, \"Supplier Name\", Wave FROM data_dump_raw ORDER BY id")
            .unwrap()
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(rows[0], (1, "7".into(), "Acme".into(), Some("3".into())));
        assert_eq!(rows[1].3, None);
    }
}
