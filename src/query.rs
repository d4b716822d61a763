/// Statement Builder Module
///
/// `Query` accumulates DEFINE/SELECT/CREATE/UPDATE/DELETE statement
/// fragments from records, columns and raw clauses, and finalizes them into
/// one executable SurrealQL statement string. One `Query` instance
/// corresponds to exactly one logical statement; `original` fragments may be
/// appended out of band for multi-statement scripts.
///
/// Clause helpers append the caller's text verbatim: predicate correctness
/// is the caller's responsibility and no SQL-injection protection is
/// provided. This is a deliberate limitation.
///
/// Literal rendering dispatches on the column's *declared* type kind, never
/// on the runtime shape of its value. A mismatched value is not validated
/// and renders malformed SQL. This tolerance is deliberate as well.
use std::fmt;

use crate::column::{Column, Value};
use crate::record::Record;
use crate::types::TypeKind;

/// Datetime pattern used inside rendered SQL literals.
pub const SQL_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Stateful statement accumulator. Fragments are appended by successive
/// calls; `to_string` performs the cleanup passes and guarantees a trailing
/// terminator.
#[derive(Debug, Default)]
pub struct Query {
    query: String,
    raw: String,
}

impl Query {
    pub fn new() -> Self {
        Query::default()
    }

    fn quote(v: &str) -> String {
        format!("'{}'", v)
    }

    /// Renders an array literal, recursively.
    ///
    /// An exactly-two-element `[datetime, format-string]` pair is an
    /// affordance for passing a value and its format positionally: it
    /// renders as a single quoted formatted timestamp, not as an array.
    pub fn list_join(&self, value: &[Value]) -> String {
        if value.is_empty() {
            return "[]".to_string();
        }

        if let [Value::Datetime(dt), Value::Strand(format)] = value {
            return format!("'{}',", dt.format(format));
        }

        let mut sql = String::from("[");
        for v in value {
            match v {
                Value::Strand(s) => {
                    sql.push_str(&format!("{},", Self::quote(s)));
                }
                Value::Array(inner) => {
                    if inner.is_empty() {
                        continue;
                    }
                    if let [Value::Datetime(dt), Value::Strand(format)] = &inner[..] {
                        sql.push_str(&format!("'{}',", dt.format(format)));
                        continue;
                    }
                    sql.push_str(&format!("{},", self.list_join(inner)));
                }
                Value::Thing(reference) => {
                    sql.push_str(&format!("{},", reference));
                }
                Value::Object(obj) => {
                    let json = serde_json::to_string(obj).unwrap_or_else(|_| "null".to_string());
                    sql.push_str(&format!("{},", json));
                }
                other => {
                    sql.push_str(&format!("{},", other));
                }
            }
        }
        sql + "]"
    }

    /// Emits a `DEFINE TABLE ... SCHEMAFULL` declaration.
    pub fn schemafull(&mut self, record: &Record) {
        self.query
            .push_str(&format!("DEFINE TABLE {} SCHEMAFULL;\n", record.table_name()));
    }

    /// Emits `DEFINE FIELD <name> ON TABLE <table> TYPE <type>` with an
    /// optional `DEFAULT <literal>`. The table name is always the bare
    /// (unqualified) name, even if the record currently carries a key.
    pub fn define_field(&mut self, record: &Record, col: &Column) {
        let mut define_query = format!(
            "DEFINE FIELD {} ON TABLE {} TYPE {} ",
            col.name,
            record.bare_name(),
            col.ty
        );

        if let Some(default) = &col.default {
            if !default.is_empty() {
                let literal = match col.ty.kind() {
                    TypeKind::String => Self::quote(&default.to_string()),
                    TypeKind::Datetime => match default {
                        Value::Datetime(dt) => {
                            Self::quote(&dt.format(SQL_DATETIME_FORMAT).to_string())
                        }
                        other => Self::quote(&other.to_string()),
                    },
                    _ => default.to_string(),
                };
                define_query.push_str(&format!("DEFAULT {}", literal));
            }
        }

        self.query.push_str(&define_query);
        self.query.push(';');
    }

    /// Emits `REMOVE FIELD IF EXISTS <name> ON TABLE <table>`.
    pub fn remove_field(&mut self, record: &Record, col: &Column) {
        self.query.push_str(&format!(
            "REMOVE FIELD IF EXISTS {} ON TABLE {};",
            col.name,
            record.table_name()
        ));
    }

    /// Emits `SELECT * FROM <table>`. With `ignore_id` the bare table name
    /// is used, for scanning by predicate rather than by key.
    pub fn select(&mut self, record: &Record, ignore_id: bool) {
        let table_name = if ignore_id {
            record.bare_name()
        } else {
            record.table_name()
        };
        self.query.push_str(&format!("SELECT * FROM {}", table_name));
    }

    pub fn where_clause(&mut self, predicate: &str) {
        self.query.push_str(&format!(" WHERE {} ", predicate));
    }

    pub fn fetch(&mut self, fetch: &str) {
        self.query.push_str(&format!(" FETCH {} ", fetch));
    }

    pub fn insert(&mut self, record: &Record) {
        self.query.push_str(&format!("CREATE {} SET ", record.table_name()));
    }

    pub fn update(&mut self, record: &Record) {
        self.query.push_str(&format!("UPDATE {} SET ", record.table_name()));
    }

    pub fn delete(&mut self, record: &Record) {
        self.query.push_str(&format!("DELETE FROM {} ", record.table_name()));
    }

    pub fn limit(&mut self, limit: u64) {
        self.query.push_str(&format!("LIMIT {}", limit));
    }

    pub fn asc(&mut self, col: &Column) {
        self.query.push_str(&format!("ORDER BY {} ASC ", col.name));
    }

    pub fn desc(&mut self, col: &Column) {
        self.query.push_str(&format!("ORDER BY {} DESC ", col.name));
    }

    /// Appends raw statement text to the secondary buffer, for statements
    /// the builder has no dedicated method for. Rendered ahead of the
    /// accumulated fragments.
    pub fn original(&mut self, original_sql: &str) {
        self.raw.push_str(original_sql);
    }

    /// Appends `<name> = <literal>,` with the literal chosen by the
    /// column's declared type kind.
    pub fn add_sqlvalue(&mut self, col: &Column) {
        match col.ty.kind() {
            TypeKind::Array => self.add_array(col),
            TypeKind::String => self.add_string(col),
            TypeKind::Bool => self.add_bool(col),
            TypeKind::Record => self.add_record(col),
            TypeKind::Object => self.add_object(col),
            TypeKind::Datetime => self.add_datetime(col, SQL_DATETIME_FORMAT),
            TypeKind::Bytes => self.add_bytes(col),
            TypeKind::Int
            | TypeKind::Float
            | TypeKind::Number
            | TypeKind::Custom(_) => self.add_normal(col),
        }
    }

    /// String literal: single-quoted, value embedded verbatim. Embedded
    /// quotes are not escaped (documented limitation). An empty string
    /// renders `''`, absent renders `None`.
    pub fn add_string(&mut self, col: &Column) {
        match &col.value {
            Value::Null => self.query.push_str(&format!("{} = None,", col.name)),
            Value::Strand(s) if s.is_empty() => {
                self.query.push_str(&format!("{} = '',", col.name))
            }
            other => self
                .query
                .push_str(&format!("{} = {},", col.name, Self::quote(&other.to_string()))),
        }
    }

    /// Unquoted literal for numeric and named types.
    pub fn add_normal(&mut self, col: &Column) {
        if col.value.is_empty() {
            self.query.push_str(&format!("{} = None,", col.name));
            return;
        }
        self.query.push_str(&format!("{} = {},", col.name, col.value));
    }

    /// Byte literal via the `<bytes>"..."` cast syntax.
    pub fn add_bytes(&mut self, col: &Column) {
        if col.value.is_empty() {
            self.query.push_str(&format!("{} = None,", col.name));
            return;
        }
        self.query
            .push_str(&format!("{} = <bytes>\"{}\",", col.name, col.value));
    }

    /// Object literal as JSON.
    pub fn add_object(&mut self, col: &Column) {
        if col.value.is_empty() {
            self.query.push_str(&format!("{} = None,", col.name));
            return;
        }
        let json = match &col.value {
            Value::Object(obj) => {
                serde_json::to_string(obj).unwrap_or_else(|_| "null".to_string())
            }
            other => other.to_string(),
        };
        self.query.push_str(&format!("{} = {},", col.name, json));
    }

    pub fn add_bool(&mut self, col: &Column) {
        if col.value.is_empty() {
            self.query.push_str(&format!("{} = None,", col.name));
            return;
        }
        self.query.push_str(&format!("{} = {},", col.name, col.value));
    }

    /// Record-reference literal: a textual value renders verbatim, a
    /// `Thing` renders the referenced table's qualified name.
    pub fn add_record(&mut self, col: &Column) {
        match &col.value {
            v if v.is_empty() => self.query.push_str(&format!("{} = None,", col.name)),
            Value::Strand(s) => self.query.push_str(&format!("{} = {},", col.name, s)),
            Value::Thing(reference) => {
                self.query.push_str(&format!("{} = {},", col.name, reference))
            }
            other => self.query.push_str(&format!("{} = {},", col.name, other)),
        }
    }

    /// Datetime literal via `return type::datetime('...')`. A non-datetime
    /// value is formatted as-is into the cast (mismatches render incorrect
    /// SQL rather than being validated).
    pub fn add_datetime(&mut self, col: &Column, format: &str) {
        if col.value.is_empty() {
            self.query.push_str(&format!("{} = None,", col.name));
            return;
        }
        let rendered = match &col.value {
            Value::Datetime(dt) => dt.format(format).to_string(),
            other => other.to_string(),
        };
        self.query.push_str(&format!(
            "{} = return type::datetime('{}'),",
            col.name, rendered
        ));
    }

    /// Array literal, `[]` when the value is absent or empty. A non-array
    /// value is wrapped as a singleton.
    pub fn add_array(&mut self, col: &Column) {
        if col.value.is_empty() {
            self.query.push_str(&format!("{} = [],", col.name));
            return;
        }
        let literal = match &col.value {
            Value::Array(items) => self.list_join(items),
            other => self.list_join(std::slice::from_ref(other)),
        };
        self.query.push_str(&format!("{} = {},", col.name, literal));
    }
}

/// Finalizes the accumulated statement: the raw buffer renders first, then
/// the built fragments, with a guaranteed trailing `;` and the separator
/// clean-ups applied in order: `,,` collapses to `,`, `,]` to `]`, `,;` to
/// `;`, and `;\n` to `;`.
impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut query = format!("{}{}", self.raw, self.query);

        if !query.ends_with(';') {
            query.push(';');
        }

        let cleaned = query
            .replace(",,", ",")
            .replace(",]", "]")
            .replace(",;", ";")
            .replace(";\n", ";");

        f.write_str(&cleaned)
    }
}
