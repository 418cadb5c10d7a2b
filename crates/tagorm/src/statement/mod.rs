//! Statement builders.
//!
//! Builders accumulate clauses and render deterministically to
//! `(sql, args)` with neutral `?` placeholders. Table names and record
//! columns are quoted through the dialect; free-form fragments (select
//! expressions, ORDER BY items, suffixes) are emitted as given.
//!
//! ```
//! use tagorm::{Condition, dialect::Postgres, statement::{self, Statement}};
//!
//! let (sql, args) = statement::select()
//!     .columns(&["id", "title"])
//!     .from("books")
//!     .filter(Condition::eq("title", "Dune"))
//!     .order_by("id DESC")
//!     .limit(5)
//!     .render(&Postgres)
//!     .unwrap();
//! assert_eq!(
//!     sql,
//!     "SELECT id, title FROM \"books\" WHERE title = ? ORDER BY id DESC LIMIT ?"
//! );
//! assert_eq!(args.len(), 2);
//! ```

mod delete;
mod insert;
mod select;
mod update;

pub use delete::Delete;
pub use insert::Insert;
pub use select::{Join, JoinKind, Select};
pub use update::Update;

use crate::condition::Condition;
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::value::Value;

/// A renderable statement.
pub trait Statement {
    /// Render SQL with neutral placeholders and the ordered arguments.
    fn render(&self, dialect: &dyn Dialect) -> OrmResult<(String, Vec<Value>)>;

    /// Whether executing the statement produces rows.
    fn returns_rows(&self) -> bool;
}

/// Start a SELECT.
pub fn select() -> Select {
    Select::new()
}

/// Start an INSERT into `table`.
pub fn insert(table: &str) -> Insert {
    Insert::new(table)
}

/// Start an UPDATE of `table`.
pub fn update(table: &str) -> Update {
    Update::new(table)
}

/// Start a DELETE from `table`.
pub fn delete(table: &str) -> Delete {
    Delete::new(table)
}

/// Accumulates SQL text and arguments while rendering.
#[derive(Debug, Default)]
pub(crate) struct SqlWriter {
    sql: String,
    args: Vec<Value>,
}

impl SqlWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    /// Push a keyword or clause, separated by a single space.
    pub(crate) fn clause(&mut self, sql: &str) -> &mut Self {
        if !self.sql.is_empty() && !self.sql.ends_with(' ') {
            self.sql.push(' ');
        }
        self.sql.push_str(sql);
        self
    }

    pub(crate) fn args(&mut self, args: impl IntoIterator<Item = Value>) -> &mut Self {
        self.args.extend(args);
        self
    }

    pub(crate) fn condition(&mut self, cond: &Condition) -> OrmResult<&mut Self> {
        let (sql, args) = cond.parts()?;
        self.sql.push_str(sql);
        self.args.extend_from_slice(args);
        Ok(self)
    }

    /// `WHERE c1 AND c2 ...`; nothing when `filters` is empty.
    pub(crate) fn filters(&mut self, keyword: &str, filters: &[Condition]) -> OrmResult<&mut Self> {
        if filters.is_empty() {
            return Ok(self);
        }
        let combined = Condition::and(filters.iter().cloned());
        self.clause(keyword).push(" ");
        self.condition(&combined)
    }

    pub(crate) fn suffixes(&mut self, suffixes: &[Condition]) -> OrmResult<&mut Self> {
        for suffix in suffixes {
            self.clause("");
            self.condition(suffix)?;
        }
        Ok(self)
    }

    pub(crate) fn finish(self) -> (String, Vec<Value>) {
        (self.sql, self.args)
    }
}

/// `(?, ?, ?)` for `n` columns.
pub(crate) fn placeholder_group(n: usize) -> String {
    let mut group = String::with_capacity(n * 3 + 2);
    group.push('(');
    for i in 0..n {
        if i > 0 {
            group.push_str(", ");
        }
        group.push('?');
    }
    group.push(')');
    group
}

pub(crate) fn quote_all(dialect: &dyn Dialect, columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| dialect.quote(c))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn check_error(build_error: &Option<String>) -> OrmResult<()> {
    match build_error {
        Some(message) => Err(OrmError::build(message.clone())),
        None => Ok(()),
    }
}

pub(crate) fn returning_refs(columns: &[String]) -> Vec<&str> {
    columns.iter().map(String::as_str).collect()
}

#[cfg(test)]
mod tests;
