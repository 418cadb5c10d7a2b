//! Struct-to-column mapping.
//!
//! A [`Record`] describes its tagged fields once through a [`MappingBuilder`]
//! (usually generated by `#[derive(Record)]`). The result is a flattened
//! [`StructMapping`]: nested records contribute their columns with a prefix,
//! and every column carries typed accessors into the outer record.
//!
//! ```ignore
//! #[derive(Debug, Default, tagorm::Record)]
//! #[db(table = "books")]
//! struct Book {
//!     #[db("id,key,auto")]
//!     id: i64,
//!     #[db("title")]
//!     title: String,
//!     #[db("version,oplock")]
//!     version: i32,
//!     #[db(nested = "author_,rel=a")]
//!     author: Author,
//! }
//! ```

pub mod builder;
pub mod cache;
pub mod tag;

pub use builder::MappingBuilder;
pub use cache::MappingCache;

use std::fmt;
use std::sync::Arc;

use crate::error::{OrmError, OrmResult};
use crate::value::{ConversionError, Value};

/// A record type that can be mapped to table columns.
pub trait Record: Default + Send + Sync + 'static {
    /// Register the tagged fields of this type.
    fn describe(builder: &mut MappingBuilder<Self>);

    /// Explicit table name. When `None` the configured naming strategy is
    /// applied to the bare type name.
    fn table_name() -> Option<&'static str> {
        None
    }
}

pub(crate) type Getter<R> = Arc<dyn Fn(&R) -> Value + Send + Sync>;
pub(crate) type Setter<R> = Arc<dyn Fn(&mut R, Value) -> Result<(), ConversionError> + Send + Sync>;

/// One mapped column of record type `R`.
pub struct ColumnMapping<R> {
    /// Field path from the outer record, e.g. `author.name`.
    pub field: String,
    /// Result column name, including nested prefixes.
    pub column: String,
    /// Relation the column is read from, for nested records joined in.
    pub relation: Option<String>,
    /// Column name inside the relation (without the nesting prefix).
    pub relation_column: String,
    pub is_key: bool,
    pub is_auto: bool,
    pub is_oplock: bool,
    pub(crate) get: Getter<R>,
    pub(crate) set: Setter<R>,
}

impl<R> Clone for ColumnMapping<R> {
    fn clone(&self) -> Self {
        Self {
            field: self.field.clone(),
            column: self.column.clone(),
            relation: self.relation.clone(),
            relation_column: self.relation_column.clone(),
            is_key: self.is_key,
            is_auto: self.is_auto,
            is_oplock: self.is_oplock,
            get: Arc::clone(&self.get),
            set: Arc::clone(&self.set),
        }
    }
}

impl<R> fmt::Debug for ColumnMapping<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnMapping")
            .field("field", &self.field)
            .field("column", &self.column)
            .field("relation", &self.relation)
            .field("is_key", &self.is_key)
            .field("is_auto", &self.is_auto)
            .field("is_oplock", &self.is_oplock)
            .finish()
    }
}

impl<R> ColumnMapping<R> {
    /// Read the field as a bindable value.
    pub fn value(&self, record: &R) -> Value {
        (self.get)(record)
    }

    /// Write a result cell into the field.
    pub fn assign(&self, record: &mut R, value: Value) -> OrmResult<()> {
        (self.set)(record, value).map_err(|e| OrmError::decode(&self.column, e.to_string()))
    }

    /// Whether the column belongs to the record's own table.
    ///
    /// Columns of nested records read through a relation are select-only.
    pub fn is_writable(&self) -> bool {
        self.relation.is_none()
    }
}

/// A nested record registered on the outer type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedMapping {
    pub field: String,
    pub column_prefix: String,
    pub relation: Option<String>,
    pub columns: Vec<String>,
}

/// The flattened column map of a record type.
pub struct StructMapping<R> {
    type_name: String,
    columns: Vec<ColumnMapping<R>>,
    nested: Vec<NestedMapping>,
}

impl<R> fmt::Debug for StructMapping<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructMapping")
            .field("type_name", &self.type_name)
            .field("columns", &self.columns)
            .field("nested", &self.nested)
            .finish()
    }
}

impl<R: Record> StructMapping<R> {
    /// Walk `R::describe` and build its mapping.
    pub fn build() -> OrmResult<Self> {
        let mut builder = MappingBuilder::<R>::new();
        R::describe(&mut builder);
        builder.finish()
    }
}

impl<R> StructMapping<R> {
    /// Bare type name (last path segment, no generics).
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Every mapped column, in registration order.
    pub fn columns(&self) -> &[ColumnMapping<R>] {
        &self.columns
    }

    /// Nested records, in registration order.
    pub fn nested(&self) -> &[NestedMapping] {
        &self.nested
    }

    /// Look up a column by result name.
    pub fn column(&self, name: &str) -> Option<&ColumnMapping<R>> {
        self.columns.iter().find(|c| c.column == name)
    }

    /// All column names.
    pub fn all_columns(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.column.as_str()).collect()
    }

    /// Writable columns that are not auto-generated (the INSERT column list).
    pub fn non_auto_columns(&self) -> Vec<&str> {
        self.insertable().map(|c| c.column.as_str()).collect()
    }

    /// Key columns.
    pub fn key_columns(&self) -> Vec<&str> {
        self.keys().map(|c| c.column.as_str()).collect()
    }

    /// Auto-generated columns.
    pub fn auto_columns(&self) -> Vec<&str> {
        self.autos().map(|c| c.column.as_str()).collect()
    }

    pub(crate) fn insertable(&self) -> impl Iterator<Item = &ColumnMapping<R>> {
        self.columns.iter().filter(|c| c.is_writable() && !c.is_auto)
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = &ColumnMapping<R>> {
        self.columns.iter().filter(|c| c.is_writable() && c.is_key)
    }

    pub(crate) fn autos(&self) -> impl Iterator<Item = &ColumnMapping<R>> {
        self.columns.iter().filter(|c| c.is_writable() && c.is_auto)
    }

    /// Columns assigned by UPDATE: writable, not key, not auto, not the lock.
    pub(crate) fn updatable(&self) -> impl Iterator<Item = &ColumnMapping<R>> {
        self.columns
            .iter()
            .filter(|c| c.is_writable() && !c.is_key && !c.is_auto && !c.is_oplock)
    }

    /// Values of the non-auto columns, aligned with [`non_auto_columns`](Self::non_auto_columns).
    pub fn non_auto_values(&self, record: &R) -> Vec<Value> {
        self.insertable().map(|c| c.value(record)).collect()
    }

    /// Values of the key columns, aligned with [`key_columns`](Self::key_columns).
    pub fn key_values(&self, record: &R) -> Vec<Value> {
        self.keys().map(|c| c.value(record)).collect()
    }

    /// The single column flagged both key and auto.
    pub fn auto_key(&self) -> OrmResult<&ColumnMapping<R>> {
        let mut found = self.keys().filter(|c| c.is_auto);
        match (found.next(), found.count()) {
            (Some(col), 0) => Ok(col),
            (first, rest) => Err(OrmError::AutoKey {
                type_name: self.type_name.clone(),
                found: usize::from(first.is_some()) + rest,
            }),
        }
    }

    /// The optimistic lock column, if any.
    pub fn oplock(&self) -> Option<&ColumnMapping<R>> {
        self.columns.iter().find(|c| c.is_writable() && c.is_oplock)
    }

    /// Current lock value and the value it advances to.
    pub fn oplock_values(&self, record: &R) -> OrmResult<Option<(Value, Value)>> {
        let Some(col) = self.oplock() else {
            return Ok(None);
        };
        let current = col.value(record);
        let next = next_lock_value(&current).ok_or_else(|| {
            OrmError::build(format!(
                "optimistic lock column '{}' must hold an integer, found {}",
                col.column,
                current.kind()
            ))
        })?;
        Ok(Some((current, next)))
    }

    /// Advance the lock field in memory after a successful write.
    pub fn advance_oplock(&self, record: &mut R) -> OrmResult<()> {
        if let (Some(col), Some((_, next))) = (self.oplock(), self.oplock_values(record)?) {
            col.assign(record, next)?;
        }
        Ok(())
    }

    /// Assign values positionally, in the order of [`columns`](Self::columns).
    pub fn set_all(&self, record: &mut R, values: Vec<Value>) -> OrmResult<()> {
        if values.len() != self.columns.len() {
            return Err(OrmError::decode(
                "*",
                format!(
                    "{} expects {} columns, row has {}",
                    self.type_name,
                    self.columns.len(),
                    values.len()
                ),
            ));
        }
        for (col, value) in self.columns.iter().zip(values) {
            col.assign(record, value)?;
        }
        Ok(())
    }

    /// Assign values to the fields mapped by the given column names.
    pub fn set_named<S: AsRef<str>>(
        &self,
        record: &mut R,
        columns: &[S],
        values: Vec<Value>,
    ) -> OrmResult<()> {
        for (name, value) in columns.iter().zip(values) {
            let name = name.as_ref();
            let col = self.column(name).ok_or_else(|| OrmError::UnknownColumn {
                type_name: self.type_name.clone(),
                column: name.to_string(),
            })?;
            col.assign(record, value)?;
        }
        Ok(())
    }
}

fn next_lock_value(current: &Value) -> Option<Value> {
    match current {
        Value::I16(v) => Some(Value::I16(v.wrapping_add(1))),
        Value::I32(v) => Some(Value::I32(v.wrapping_add(1))),
        Value::I64(v) => Some(Value::I64(v.wrapping_add(1))),
        _ => None,
    }
}

/// Last path segment of a type name, without generic arguments.
pub(crate) fn bare_type_name(full: &str) -> &str {
    let head = full.split('<').next().unwrap_or(full);
    head.rsplit("::").next().unwrap_or(head)
}
