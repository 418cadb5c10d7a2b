//! UPDATE builder.

use super::{SqlWriter, Statement, returning_refs};
use crate::condition::Condition;
use crate::dialect::{Dialect, ReturningPosition};
use crate::error::{OrmError, OrmResult};
use crate::value::Value;

#[derive(Debug, Clone)]
enum Assignment {
    Value { column: String, value: Value },
    Raw(Condition),
}

/// UPDATE query builder. At least one SET entry is required.
#[derive(Debug, Clone, Default)]
pub struct Update {
    table: String,
    assignments: Vec<Assignment>,
    filters: Vec<Condition>,
    returning: Vec<String>,
    suffixes: Vec<Condition>,
}

impl Update {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Self::default()
        }
    }

    /// `SET column = ?` (column quoted on render).
    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.assignments.push(Assignment::Value {
            column: column.to_string(),
            value: value.into(),
        });
        self
    }

    /// A raw SET fragment such as `hits = hits + ?`.
    pub fn set_raw(mut self, fragment: Condition) -> Self {
        self.assignments.push(Assignment::Raw(fragment));
        self
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

impl Statement for Update {
    fn render(&self, dialect: &dyn Dialect) -> OrmResult<(String, Vec<Value>)> {
        if self.table.is_empty() {
            return Err(OrmError::build("update requires a table"));
        }
        if self.assignments.is_empty() {
            return Err(OrmError::build("update requires at least one SET entry"));
        }

        let returning = if self.returning.is_empty() {
            None
        } else {
            let refs = returning_refs(&self.returning);
            Some(dialect.returning_clause(&refs).ok_or_else(|| {
                OrmError::build(format!("{} does not support returning clauses", dialect.name()))
            })?)
        };

        let mut w = SqlWriter::new();
        w.push("UPDATE ")
            .push(&dialect.quote_qualified(&self.table))
            .push(" SET ");
        for (i, assignment) in self.assignments.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            match assignment {
                Assignment::Value { column, value } => {
                    w.push(&dialect.quote(column))
                        .push(" = ?")
                        .args([value.clone()]);
                }
                Assignment::Raw(fragment) => {
                    w.condition(fragment)?;
                }
            }
        }

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
