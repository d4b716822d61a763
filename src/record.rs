/// Record Module
///
/// A `Schema` is a typed table definition: a table name plus ordered column
/// templates with optional defaults, constructed once. `Schema::record()`
/// spawns a `Record` instance that owns an independent mutable copy of the
/// columns (defaults applied), an optional key, and the CRUD methods that
/// drive the statement builder and the execution runtime.
///
/// A record's qualified table name is `name:key` when a key is present and
/// the bare name otherwise; a key that already contains `:` is taken as the
/// full qualified name. SELECT-by-predicate strips the qualifier via the
/// builder's `ignore_id` flag.
use std::fmt;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::client::{Client, SqlOutcome};
use crate::column::{Column, Value};
use crate::core::{Result, SurqlError};
use crate::query::{Query, SQL_DATETIME_FORMAT};
use crate::trace;
use crate::types::TypeKind;

/// A record key: either an integer or a string. A string key may carry the
/// full `table:key` form.
#[derive(Debug, Clone, PartialEq)]
pub enum Key {
    Int(i64),
    Str(String),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(i) => write!(f, "{}", i),
            Key::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Key {
    fn from(v: i64) -> Self {
        Key::Int(v)
    }
}

impl From<&str> for Key {
    fn from(v: &str) -> Self {
        Key::Str(v.to_string())
    }
}

impl From<String> for Key {
    fn from(v: String) -> Self {
        Key::Str(v)
    }
}

/// A table schema descriptor: name plus column templates. Built once at
/// startup; records are spawned from it per use-case.
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    columns: Vec<Column>,
}

impl Schema {
    /// Creates a schema for the given table. The name is lower-cased, the
    /// same way a type name would be.
    pub fn new(name: &str) -> Self {
        Schema {
            name: name.to_lowercase(),
            columns: Vec::new(),
        }
    }

    /// Declares a column. Declaration order is preserved and drives the
    /// order of DEFINE FIELD and SET fragments.
    pub fn column(mut self, col: Column) -> Self {
        self.columns.push(col);
        self
    }

    /// Spawns an independent record instance. Column defaults are applied
    /// as initial values.
    pub fn record(&self) -> Record {
        let mut columns = self.columns.clone();
        for col in &mut columns {
            if col.value == Value::Null {
                if let Some(default) = &col.default {
                    col.value = default.clone();
                }
            }
        }
        Record {
            table: self.name.clone(),
            key: None,
            columns,
            is_none: true,
            last_result_time: String::new(),
        }
    }
}

/// A typed table instance with CRUD behavior. Not pooled or cached; use one
/// per logical operation sequence.
#[derive(Debug, Clone)]
pub struct Record {
    table: String,
    key: Option<Key>,
    columns: Vec<Column>,
    is_none: bool,
    last_result_time: String,
}

impl Record {
    /// The qualified table name: `name:key` when a key is present, the
    /// bare name otherwise.
    pub fn table_name(&self) -> String {
        match &self.key {
            None => self.table.clone(),
            Some(Key::Str(s)) if s.contains(':') => s.clone(),
            Some(key) => format!("{}:{}", self.table, key),
        }
    }

    /// The table name with any `:key` qualifier stripped.
    pub fn bare_name(&self) -> String {
        self.table_name()
            .split(':')
            .next()
            .unwrap_or_default()
            .to_string()
    }

    pub fn set_key(&mut self, key: impl Into<Key>) -> &mut Self {
        self.key = Some(key.into());
        self
    }

    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    /// The portion of the key after the colon, or the whole key when it
    /// carries no qualifier. Empty when no key is set.
    pub fn key_id(&self) -> String {
        match &self.key {
            None => String::new(),
            Some(key) => {
                let text = key.to_string();
                match text.split_once(':') {
                    Some((_, id)) => id.to_string(),
                    None => text,
                }
            }
        }
    }

    /// True until a fetch/insert/update succeeds with data. Check this
    /// before reading column values after a fetch.
    pub fn is_none(&self) -> bool {
        self.is_none
    }

    /// The `time` field of the most recent non-empty result envelope.
    pub fn last_result_time(&self) -> &str {
        &self.last_result_time
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Sets a column's value by name.
    pub fn set_value(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        match self.column_mut(name) {
            Some(col) => {
                col.set_value(value);
                Ok(self)
            }
            None => Err(SurqlError::Schema(format!("unknown column: {}", name))),
        }
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.column(name).map(|c| &c.value)
    }

    /// A record-reference value pointing at this record's qualified name,
    /// for use in another record's record-typed column.
    pub fn reference(&self) -> Value {
        Value::Thing(self.table_name())
    }

    /// Maps a result row onto the columns. A non-object row sets `is_none`
    /// and mutates nothing. The row's `id` field feeds the key; declared
    /// columns are set from same-named row fields, with datetime-typed
    /// columns parsed from their textual form.
    pub fn set_data(&mut self, row: &serde_json::Value) -> &mut Self {
        let fields = match row.as_object() {
            Some(fields) => fields,
            None => {
                self.is_none = true;
                return self;
            }
        };

        if let Some(id) = fields.get("id") {
            if let Some(text) = id.as_str() {
                self.key = Some(Key::Str(text.to_string()));
            } else if let Some(num) = id.as_i64() {
                self.key = Some(Key::Int(num));
            }
        }

        for col in &mut self.columns {
            if let Some(field) = fields.get(&col.name) {
                col.value = Self::map_field(col, field);
            }
        }

        self.is_none = false;
        self
    }

    /// Converts a response field per the column's declared type: datetime
    /// text becomes a Datetime value, record-typed text becomes a Thing,
    /// everything else converts structurally.
    fn map_field(col: &Column, field: &serde_json::Value) -> Value {
        match (col.ty.kind(), field) {
            (TypeKind::Datetime, serde_json::Value::String(s)) => {
                Value::Datetime(parse_datetime(s))
            }
            (TypeKind::Record, serde_json::Value::String(s)) => Value::Thing(s.clone()),
            _ => Value::from_json(field),
        }
    }

    fn expect_results(&mut self, outcome: SqlOutcome) -> Result<crate::client::Envelope> {
        match outcome {
            SqlOutcome::Results(envelope) => {
                let non_empty = envelope
                    .result
                    .as_array()
                    .map(|rows| !rows.is_empty())
                    .unwrap_or(false);
                if non_empty && !envelope.time.is_empty() {
                    self.last_result_time = envelope.time.clone();
                }
                Ok(envelope)
            }
            SqlOutcome::DbError {
                code,
                details,
                information,
            } => Err(SurqlError::Query(format!(
                "database error {}: {} ({})",
                code, details, information
            ))),
        }
    }

    fn rows<'a>(&self, envelope: &'a crate::client::Envelope) -> Result<&'a [serde_json::Value]> {
        envelope
            .result
            .as_array()
            .map(|rows| rows.as_slice())
            .ok_or_else(|| SurqlError::Response(envelope.result.to_string()))
    }

    /// Issues the SCHEMAFULL declaration followed by a DEFINE FIELD for
    /// every declared column.
    pub async fn create_table(&mut self, client: &Client) -> Result<()> {
        let mut q = Query::new();
        q.schemafull(self);
        for col in &self.columns {
            q.define_field(self, col);
        }

        let outcome = client.executes(&q.to_string()).await?;
        let envelope = self.expect_results(outcome)?;
        trace::log_response(&envelope.result);
        Ok(())
    }

    /// SELECT on the qualified table name. An empty result sets `is_none`
    /// and leaves columns untouched.
    pub async fn fetch(&mut self, client: &Client) -> Result<&mut Self> {
        let mut q = Query::new();
        q.select(self, false);
        trace::log_select(&q);

        let outcome = client.executes(&q.to_string()).await?;
        let envelope = self.expect_results(outcome)?;
        let rows = self.rows(&envelope)?;
        match rows.first() {
            None => {
                self.is_none = true;
            }
            Some(row) => {
                trace::log_response(row);
                let row = row.clone();
                self.set_data(&row);
            }
        }
        Ok(self)
    }

    /// SELECT on the bare table name with a caller-supplied predicate.
    pub async fn fetch_where(&mut self, client: &Client, predicate: &str) -> Result<&mut Self> {
        let mut q = Query::new();
        q.select(self, true);
        q.where_clause(predicate);
        trace::log_select(&q);

        let outcome = client.executes(&q.to_string()).await?;
        let envelope = self.expect_results(outcome)?;
        let rows = self.rows(&envelope)?;
        match rows.first() {
            None => {
                self.is_none = true;
            }
            Some(row) => {
                trace::log_response(row);
                let row = row.clone();
                self.set_data(&row);
            }
        }
        Ok(self)
    }

    /// CREATE with every declared column's current value.
    pub async fn insert(&mut self, client: &Client) -> Result<&mut Self> {
        let mut q = Query::new();
        q.insert(self);
        for col in &self.columns {
            q.add_sqlvalue(col);
        }
        trace::log_insert(&q);

        let outcome = client.executes(&q.to_string()).await?;
        let envelope = self.expect_results(outcome)?;
        let rows = self.rows(&envelope)?;
        match rows.first() {
            None => {
                self.is_none = true;
            }
            Some(row) => {
                trace::log_response(row);
                let row = row.clone();
                self.set_data(&row);
            }
        }
        Ok(self)
    }

    /// UPDATE with every declared column's current value.
    pub async fn update(&mut self, client: &Client) -> Result<&mut Self> {
        let mut q = Query::new();
        q.update(self);
        for col in &self.columns {
            q.add_sqlvalue(col);
        }
        trace::log_update(&q);

        let outcome = client.executes(&q.to_string()).await?;
        let envelope = self.expect_results(outcome)?;
        let rows = self.rows(&envelope)?;
        match rows.first() {
            None => {
                self.is_none = true;
            }
            Some(row) => {
                trace::log_response(row);
                let row = row.clone();
                self.set_data(&row);
            }
        }
        Ok(self)
    }

    /// DELETE FROM the qualified table name. Success is keyed on the
    /// result being sequence-shaped, not on a row count; a non-sequence
    /// result reports `false` without raising.
    pub async fn delete(&mut self, client: &Client) -> Result<bool> {
        let mut q = Query::new();
        q.delete(self);
        trace::log_delete(&self.table_name());

        let outcome = client.executes(&q.to_string()).await?;
        let envelope = self.expect_results(outcome)?;
        trace::log_response(&envelope.result);
        Ok(envelope.result.is_array())
    }
}

/// Lenient datetime parse used for response mapping: falls back to the Unix
/// epoch when the text does not match the SQL datetime pattern.
pub fn parse_datetime(text: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(text, SQL_DATETIME_FORMAT)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
