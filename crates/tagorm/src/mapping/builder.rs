//! Registration-time mapping builder.

use std::any::type_name;
use std::collections::HashSet;
use std::sync::Arc;

use super::tag::{parse_column_tag, parse_nested_tag};
use super::{ColumnMapping, NestedMapping, Record, StructMapping, bare_type_name};
use crate::error::{OrmError, OrmResult};
use crate::value::Scannable;

/// Collects the tagged fields of a record type.
///
/// The first registration error is kept and reported by the mapping build;
/// later registrations are ignored once an error is recorded.
pub struct MappingBuilder<R> {
    type_name: String,
    columns: Vec<ColumnMapping<R>>,
    nested: Vec<NestedMapping>,
    error: Option<OrmError>,
}

impl<R: Record> MappingBuilder<R> {
    pub(crate) fn new() -> Self {
        Self {
            type_name: bare_type_name(type_name::<R>()).to_string(),
            columns: Vec::new(),
            nested: Vec::new(),
            error: None,
        }
    }

    fn tag_error(&mut self, field: &str, message: String) {
        if self.error.is_none() {
            self.error = Some(OrmError::Tag {
                type_name: self.type_name.clone(),
                field: field.to_string(),
                message,
            });
        }
    }

    /// Map a scalar field to a column.
    ///
    /// `tag` is `"column[,key][,auto][,oplock]"`.
    pub fn column<V, G, M>(&mut self, field: &str, tag: &str, get: G, get_mut: M) -> &mut Self
    where
        V: Scannable,
        G: Fn(&R) -> &V + Send + Sync + 'static,
        M: Fn(&mut R) -> &mut V + Send + Sync + 'static,
    {
        if self.error.is_some() {
            return self;
        }
        let tag = match parse_column_tag(tag) {
            Ok(tag) => tag,
            Err(message) => {
                self.tag_error(field, message);
                return self;
            }
        };

        self.columns.push(ColumnMapping {
            field: field.to_string(),
            column: tag.column.clone(),
            relation: None,
            relation_column: tag.column,
            is_key: tag.is_key,
            is_auto: tag.is_auto,
            is_oplock: tag.is_oplock,
            get: Arc::new(move |r: &R| get(r).to_value()),
            set: Arc::new(move |r: &mut R, value| {
                V::from_value(value).map(|v| *get_mut(r) = v)
            }),
        });
        self
    }

    /// Map a nested record field.
    ///
    /// `tag` is `"prefix[,rel=name]"`. The nested columns are flattened into
    /// this mapping with `prefix` prepended. With a relation the columns are
    /// read from that relation and are not written by INSERT or UPDATE.
    pub fn nested<N, G, M>(&mut self, field: &str, tag: &str, get: G, get_mut: M) -> &mut Self
    where
        N: Record,
        G: Fn(&R) -> &N + Send + Sync + 'static,
        M: Fn(&mut R) -> &mut N + Send + Sync + 'static,
    {
        if self.error.is_some() {
            return self;
        }
        let tag = match parse_nested_tag(tag) {
            Ok(tag) => tag,
            Err(message) => {
                self.tag_error(field, message);
                return self;
            }
        };
        let inner = match StructMapping::<N>::build() {
            Ok(mapping) => mapping,
            Err(err) => {
                self.error = Some(err);
                return self;
            }
        };

        let get = Arc::new(get);
        let get_mut = Arc::new(get_mut);
        let mut columns = Vec::with_capacity(inner.columns.len());
        for col in inner.columns {
            let (outer_get, inner_get) = (Arc::clone(&get), col.get);
            let (outer_set, inner_set) = (Arc::clone(&get_mut), col.set);
            let (relation, relation_column) = match (col.relation, &tag.relation) {
                (Some(rel), _) => (Some(rel), col.relation_column),
                (None, Some(rel)) => (Some(rel.clone()), col.column.clone()),
                (None, None) => (None, format!("{}{}", tag.prefix, col.column)),
            };
            let column = format!("{}{}", tag.prefix, col.column);
            columns.push(column.clone());
            self.columns.push(ColumnMapping {
                field: format!("{field}.{}", col.field),
                column,
                relation,
                relation_column,
                is_key: col.is_key,
                is_auto: col.is_auto,
                is_oplock: col.is_oplock,
                get: Arc::new(move |r: &R| inner_get(outer_get(r))),
                set: Arc::new(move |r: &mut R, value| inner_set(outer_set(r), value)),
            });
        }

        self.nested.push(NestedMapping {
            field: field.to_string(),
            column_prefix: tag.prefix.clone(),
            relation: tag.relation.clone(),
            columns,
        });
        for deeper in inner.nested {
            self.nested.push(NestedMapping {
                field: format!("{field}.{}", deeper.field),
                column_prefix: format!("{}{}", tag.prefix, deeper.column_prefix),
                relation: deeper.relation.or_else(|| tag.relation.clone()),
                columns: deeper
                    .columns
                    .iter()
                    .map(|c| format!("{}{c}", tag.prefix))
                    .collect(),
            });
        }
        self
    }

    pub(crate) fn finish(self) -> OrmResult<StructMapping<R>> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let mut seen = HashSet::new();
        for col in &self.columns {
            if !seen.insert(col.column.as_str()) {
                return Err(OrmError::Tag {
                    type_name: self.type_name.clone(),
                    field: col.field.clone(),
                    message: format!("duplicate column \"{}\"", col.column),
                });
            }
        }

        let locks: Vec<&ColumnMapping<R>> = self
            .columns
            .iter()
            .filter(|c| c.is_writable() && c.is_oplock)
            .collect();
        if let [_, second, ..] = locks.as_slice() {
            return Err(OrmError::Tag {
                type_name: self.type_name.clone(),
                field: second.field.clone(),
                message: "more than one optimistic lock column".to_string(),
            });
        }

        Ok(StructMapping {
            type_name: self.type_name,
            columns: self.columns,
            nested: self.nested,
        })
    }
}
