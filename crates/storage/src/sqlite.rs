use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, Row};

use casefold_core::{CaseStatus, ComplaintRecord, Field, FieldSet, FieldValue, RecordId};

use crate::error::StorageError;
use crate::traits::{BatchOutcome, RecordFilter, RecordStore, SortOrder, StoreBatch, StoreOp};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Run each batch inside one transaction. When false every step commits
    /// on its own and a failing step leaves the earlier ones in place.
    pub atomic_batches: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            atomic_batches: true,
        }
    }
}

pub struct SqliteStore {
    conn: Connection,
    options: StoreOptions,
}

impl SqliteStore {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        Self::open_with(path, StoreOptions::default())
    }

    pub fn open_with(path: &str, options: StoreOptions) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn, options })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::open_in_memory_with(StoreOptions::default())
    }

    pub fn open_in_memory_with(options: StoreOptions) -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn, options })
    }

    pub fn options(&self) -> StoreOptions {
        self.options
    }

    /// Raw connection, for maintenance and tests.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

fn select_columns() -> String {
    let mut cols = vec!["id"];
    cols.extend(Field::ALL.iter().map(|f| f.as_str()));
    cols.join(", ")
}

fn to_sql_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Integer(n) => Value::Integer(*n),
        FieldValue::Real(r) => Value::Real(*r),
        FieldValue::Text(s) => Value::Text(s.clone()),
    }
}

fn from_sql_ref(field: Field, value: ValueRef<'_>) -> Result<FieldValue, StorageError> {
    match value {
        ValueRef::Null => Ok(FieldValue::Null),
        ValueRef::Integer(n) => Ok(FieldValue::Integer(n)),
        ValueRef::Real(r) => Ok(FieldValue::Real(r)),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map(|s| FieldValue::Text(s.to_string()))
            .map_err(|e| StorageError::Serialization(format!("{field}: {e}"))),
        ValueRef::Blob(_) => Err(StorageError::Serialization(format!(
            "{field}: unexpected blob"
        ))),
    }
}

/// Read a row selected with [`select_columns`]. Null columns are left out of
/// the field set.
fn read_record(row: &Row) -> Result<ComplaintRecord, StorageError> {
    let id = RecordId::new(row.get::<_, i64>(0)?)?;
    let mut fields = FieldSet::new();
    for (i, field) in Field::ALL.iter().enumerate() {
        let value = from_sql_ref(*field, row.get_ref(i + 1)?)?;
        if !value.is_null() {
            fields.set(*field, value);
        }
    }
    Ok(ComplaintRecord::new(id, fields))
}

fn map_constraint(e: rusqlite::Error, context: impl FnOnce() -> String) -> StorageError {
    match e {
        rusqlite::Error::SqliteFailure(err, msg)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StorageError::ConstraintViolation(match msg {
                Some(m) => format!("{}: {m}", context()),
                None => context(),
            })
        }
        other => StorageError::Sqlite(other),
    }
}

fn insert_row(
    conn: &Connection,
    id: Option<RecordId>,
    fields: &FieldSet,
) -> Result<RecordId, StorageError> {
    let mut cols: Vec<&str> = Vec::with_capacity(Field::ALL.len() + 1);
    let mut values: Vec<Value> = Vec::with_capacity(Field::ALL.len() + 1);
    if let Some(id) = id {
        cols.push("id");
        values.push(Value::Integer(id.get()));
    }
    for field in Field::ALL {
        cols.push(field.as_str());
        values.push(to_sql_value(fields.get(field)));
    }
    let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "INSERT INTO complaint ({}) VALUES ({})",
        cols.join(", "),
        placeholders.join(", ")
    );
    conn.execute(&sql, rusqlite::params_from_iter(values))
        .map_err(|e| {
            map_constraint(e, || match id {
                Some(id) => format!("restoring record {id}"),
                None => "inserting record".to_string(),
            })
        })?;
    Ok(match id {
        Some(id) => id,
        None => RecordId::new(conn.last_insert_rowid())?,
    })
}

fn update_row(conn: &Connection, id: RecordId, fields: &FieldSet) -> Result<usize, StorageError> {
    if fields.is_empty() {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM complaint WHERE id = ?1)",
            [id.get()],
            |row| row.get(0),
        )?;
        return Ok(usize::from(exists));
    }
    let mut assignments = Vec::with_capacity(fields.len());
    let mut values = Vec::with_capacity(fields.len() + 1);
    for (i, (field, value)) in fields.iter().enumerate() {
        assignments.push(format!("{} = ?{}", field.as_str(), i + 1));
        values.push(to_sql_value(value));
    }
    values.push(Value::Integer(id.get()));
    let sql = format!(
        "UPDATE complaint SET {} WHERE id = ?{}",
        assignments.join(", "),
        values.len()
    );
    conn.execute(&sql, rusqlite::params_from_iter(values))
        .map_err(|e| map_constraint(e, || format!("updating record {id}")))
}

fn delete_row(conn: &Connection, id: RecordId) -> Result<usize, StorageError> {
    Ok(conn.execute("DELETE FROM complaint WHERE id = ?1", [id.get()])?)
}

/// Apply one batch step. Updates and deletes that touch no row fail.
fn materialize_op(
    conn: &Connection,
    op: &StoreOp,
    outcome: &mut BatchOutcome,
) -> Result<(), StorageError> {
    match op {
        StoreOp::Insert { fields } => {
            let id = insert_row(conn, None, fields)?;
            outcome.inserted.push(id);
            outcome.changed += 1;
        }
        StoreOp::Restore { record } => {
            insert_row(conn, Some(record.id), &record.fields)?;
            outcome.changed += 1;
        }
        StoreOp::Update { id, fields } => {
            let changed = update_row(conn, *id, fields)?;
            if changed == 0 {
                return Err(StorageError::NotFound(format!("record {id}")));
            }
            outcome.changed += changed;
        }
        StoreOp::Delete { id } => {
            let changed = delete_row(conn, *id)?;
            if changed == 0 {
                return Err(StorageError::NotFound(format!("record {id}")));
            }
            outcome.changed += changed;
        }
    }
    Ok(())
}

impl RecordStore for SqliteStore {
    fn fetch_by_ids(&self, ids: &[RecordId]) -> Result<Vec<ComplaintRecord>, StorageError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "SELECT {} FROM complaint WHERE id IN ({}) ORDER BY id ASC",
            select_columns(),
            placeholders.join(", ")
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(rusqlite::params_from_iter(ids.iter().map(|id| id.get())))?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            result.push(read_record(row)?);
        }
        Ok(result)
    }

    fn fetch_by_filter(&self, filter: &RecordFilter) -> Result<Vec<ComplaintRecord>, StorageError> {
        let mut conditions: Vec<String> = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        let mut like = |column: &str, value: &Option<String>| {
            if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                params.push(Value::Text(format!("%{v}%")));
                conditions.push(format!("{column} LIKE ?{}", params.len()));
            }
        };
        like("victim_name", &filter.victim_name);
        like("acknowledgment_no", &filter.acknowledgment_no);
        like("victim_mobile_numbers", &filter.victim_mobile_numbers);
        like("police_station", &filter.police_station);
        like("investigation_officer", &filter.investigation_officer);
        like("action_taken", &filter.action_taken);
        like("sub_category_of_complaint", &filter.sub_category);
        like("lost_amount", &filter.lost_amount);
        like("lien_amount", &filter.lien_amount);

        let mut exact = |column: &str, value: &Option<String>| {
            if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                params.push(Value::Text(v.to_string()));
                conditions.push(format!("{column} = ?{}", params.len()));
            }
        };
        exact("category_of_complaint", &filter.category);
        exact("bns", &filter.bns_section);
        exact("it_act", &filter.it_act_section);

        if let (Some(from), Some(to)) = (&filter.date_from, &filter.date_to) {
            params.push(Value::Text(from.clone()));
            params.push(Value::Text(to.clone()));
            conditions.push(format!(
                "date_of_complaint BETWEEN ?{} AND ?{}",
                params.len() - 1,
                params.len()
            ));
        }

        match filter.status {
            Some(CaseStatus::Pending) => {
                conditions.push("(action_taken IS NULL OR trim(action_taken) = '')".into())
            }
            Some(CaseStatus::Resolved) => {
                conditions.push("(action_taken IS NOT NULL AND trim(action_taken) != '')".into())
            }
            None => {}
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        let order = match filter.sort {
            SortOrder::Id => "id ASC",
            SortOrder::Newest => "date_of_complaint DESC, id DESC",
            SortOrder::Oldest => "date_of_complaint ASC, id ASC",
        };
        let sql = format!(
            "SELECT {} FROM complaint{where_clause} ORDER BY {order}",
            select_columns()
        );
        tracing::debug!(%sql, params = params.len(), "fetch_by_filter");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(rusqlite::params_from_iter(params))?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            result.push(read_record(row)?);
        }
        Ok(result)
    }

    fn get(&self, id: RecordId) -> Result<Option<ComplaintRecord>, StorageError> {
        Ok(self.fetch_by_ids(&[id])?.into_iter().next())
    }

    fn insert(&mut self, fields: &FieldSet) -> Result<RecordId, StorageError> {
        insert_row(&self.conn, None, fields)
    }

    fn update(&mut self, id: RecordId, fields: &FieldSet) -> Result<usize, StorageError> {
        update_row(&self.conn, id, fields)
    }

    fn delete(&mut self, id: RecordId) -> Result<usize, StorageError> {
        delete_row(&self.conn, id)
    }

    fn apply(&mut self, batch: &StoreBatch) -> Result<BatchOutcome, StorageError> {
        let mut outcome = BatchOutcome::default();
        tracing::debug!(steps = batch.len(), atomic = self.options.atomic_batches, "applying batch");

        if self.options.atomic_batches {
            let tx = self.conn.transaction()?;
            for (step, op) in batch.ops().iter().enumerate() {
                if let Err(e) = materialize_op(&tx, op, &mut outcome) {
                    // Dropping the transaction rolls every step back.
                    drop(tx);
                    tracing::warn!(step, op = op.op_type_name(), error = %e, "batch rolled back");
                    return Err(StorageError::BatchAborted {
                        step,
                        applied: 0,
                        source: Box::new(e),
                    });
                }
            }
            tx.commit()?;
        } else {
            for (step, op) in batch.ops().iter().enumerate() {
                if let Err(e) = materialize_op(&self.conn, op, &mut outcome) {
                    tracing::warn!(step, op = op.op_type_name(), error = %e, "batch stopped part-way");
                    return Err(StorageError::BatchAborted {
                        step,
                        applied: step,
                        source: Box::new(e),
                    });
                }
            }
        }
        Ok(outcome)
    }

    fn count(&self) -> Result<u64, StorageError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM complaint", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_by_status(&self, status: CaseStatus) -> Result<u64, StorageError> {
        let sql = match status {
            CaseStatus::Pending => {
                "SELECT COUNT(*) FROM complaint WHERE action_taken IS NULL OR trim(action_taken) = ''"
            }
            CaseStatus::Resolved => {
                "SELECT COUNT(*) FROM complaint WHERE action_taken IS NOT NULL AND trim(action_taken) != ''"
            }
        };
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
