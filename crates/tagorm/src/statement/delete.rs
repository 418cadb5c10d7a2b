//! DELETE builder.

use super::{SqlWriter, Statement, returning_refs};
use crate::condition::Condition;
use crate::dialect::{Dialect, ReturningPosition};
use crate::error::{OrmError, OrmResult};
use crate::value::Value;

/// DELETE query builder.
#[derive(Debug, Clone, Default)]
pub struct Delete {
    table: String,
    filters: Vec<Condition>,
    returning: Vec<String>,
    suffixes: Vec<Condition>,
}

impl Delete {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Self::default()
        }
    }

    /// Add a WHERE condition; all conditions are ANDed.
    pub fn filter(mut self, cond: Condition) -> Self {
        self.filters.push(cond);
        self
    }

    pub fn returning<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.returning
            .extend(columns.iter().map(|c| c.as_ref().to_string()));
        self
    }

    pub fn suffix(mut self, suffix: Condition) -> Self {
        self.suffixes.push(suffix);
        self
    }
}

impl Statement for Delete {
    fn render(&self, dialect: &dyn Dialect) -> OrmResult<(String, Vec<Value>)> {
        if self.table.is_empty() {
            return Err(OrmError::build("delete requires a table"));
        }

        let returning = if self.returning.is_empty() {
            None
        } else {
            let refs = returning_refs(&self.returning);
            Some(dialect.returning_deleted_clause(&refs).ok_or_else(|| {
                OrmError::build(format!("{} does not support returning clauses", dialect.name()))
            })?)
        };

        let mut w = SqlWriter::new();
        w.push("DELETE FROM ")
            .push(&dialect.quote_qualified(&self.table));
        if let Some((clause, ReturningPosition::BeforeValues)) = &returning {
            w.clause(clause);
        }
        w.filters("WHERE", &self.filters)?;
        if let Some((clause, ReturningPosition::End)) = &returning {
            w.clause(clause);
        }
        w.suffixes(&self.suffixes)?;
        Ok(w.finish())
    }

    fn returns_rows(&self) -> bool {
        !self.returning.is_empty()
    }
}
