//! SQL dialect adapters.
//!
//! Statement builders render neutral SQL with `?` placeholders; a
//! [`Dialect`] supplies quoting, LIMIT/OFFSET syntax, returning clauses and
//! the final placeholder rewrite.

use std::fmt;

use crate::error::OrmError;
use crate::placeholder;
use crate::value::Value;

/// Where a returning clause goes in INSERT/UPDATE/DELETE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturningPosition {
    /// Before `VALUES` (INSERT) or before `WHERE` (UPDATE/DELETE).
    BeforeValues,
    /// At the end of the statement, before suffixes.
    End,
}

/// Database-specific SQL rendering.
pub trait Dialect: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Quote a single identifier.
    fn quote(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    /// Quote a dotted identifier part by part: `a.b` -> `"a"."b"`.
    fn quote_qualified(&self, ident: &str) -> String {
        ident
            .split('.')
            .map(|part| self.quote(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Rewrite neutral `?` placeholders into the dialect's syntax.
    fn replace_placeholders(&self, sql: &str) -> String {
        sql.to_string()
    }

    fn build_limit(&self, limit: u64) -> (String, Vec<Value>) {
        ("LIMIT ?".to_string(), vec![bound(limit)])
    }

    fn build_offset(&self, offset: u64) -> (String, Vec<Value>) {
        ("OFFSET ?".to_string(), vec![bound(offset)])
    }

    /// Whether OFFSET is rendered before LIMIT.
    fn is_offset_first(&self) -> bool {
        false
    }

    /// Whether LIMIT needs an ORDER BY and an explicit OFFSET.
    fn requires_order_for_limit(&self) -> bool {
        false
    }

    /// Column references to the values a write produces.
    fn format_new_values(&self, columns: &[&str]) -> Vec<String> {
        columns.iter().map(|c| self.quote(c)).collect()
    }

    /// Column references to the values a DELETE removes.
    fn format_old_values(&self, columns: &[&str]) -> Vec<String> {
        self.format_new_values(columns)
    }

    /// Returning clause for INSERT/UPDATE, or `None` if unsupported.
    fn returning_clause(&self, _columns: &[&str]) -> Option<(String, ReturningPosition)> {
        None
    }

    /// Returning clause for DELETE, or `None` if unsupported.
    fn returning_deleted_clause(&self, columns: &[&str]) -> Option<(String, ReturningPosition)> {
        self.returning_clause(columns)
    }

    fn supports_returning(&self) -> bool {
        self.returning_clause(&["x"]).is_some()
    }

    /// Map a driver error onto the constraint violation variants.
    fn classify_error(&self, err: OrmError) -> OrmError {
        err
    }
}

fn bound(n: u64) -> Value {
    Value::I64(i64::try_from(n).unwrap_or(i64::MAX))
}

/// PostgreSQL: `$n` placeholders, `RETURNING`, SQLSTATE classification.
#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl Dialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn replace_placeholders(&self, sql: &str) -> String {
        placeholder::rewrite(sql, |i| format!("${i}"))
    }

    fn returning_clause(&self, columns: &[&str]) -> Option<(String, ReturningPosition)> {
        Some((
            format!("RETURNING {}", self.format_new_values(columns).join(", ")),
            ReturningPosition::End,
        ))
    }

    fn classify_error(&self, err: OrmError) -> OrmError {
        match err {
            OrmError::Query(e) => OrmError::from_db_error(e),
            other => other,
        }
    }
}

/// Plain ANSI SQL: `?` placeholders and no returning clause. Generated keys
/// come back through the driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ansi;

impl Dialect for Ansi {
    fn name(&self) -> &'static str {
        "ansi"
    }
}

/// SQL Server: `@pN` placeholders, `OFFSET .. ROWS FETCH NEXT .. ROWS ONLY`
/// and `OUTPUT INSERTED.*`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServer;

impl Dialect for SqlServer {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn quote(&self, ident: &str) -> String {
        format!("[{}]", ident.replace(']', "]]"))
    }

    fn replace_placeholders(&self, sql: &str) -> String {
        placeholder::rewrite(sql, |i| format!("@p{i}"))
    }

    fn build_limit(&self, limit: u64) -> (String, Vec<Value>) {
        ("FETCH NEXT ? ROWS ONLY".to_string(), vec![bound(limit)])
    }

    fn build_offset(&self, offset: u64) -> (String, Vec<Value>) {
        ("OFFSET ? ROWS".to_string(), vec![bound(offset)])
    }

    fn is_offset_first(&self) -> bool {
        true
    }

    fn requires_order_for_limit(&self) -> bool {
        true
    }

    fn format_new_values(&self, columns: &[&str]) -> Vec<String> {
        columns
            .iter()
            .map(|c| format!("INSERTED.{}", self.quote(c)))
            .collect()
    }

    fn format_old_values(&self, columns: &[&str]) -> Vec<String> {
        columns
            .iter()
            .map(|c| format!("DELETED.{}", self.quote(c)))
            .collect()
    }

    fn returning_clause(&self, columns: &[&str]) -> Option<(String, ReturningPosition)> {
        Some((
            format!("OUTPUT {}", self.format_new_values(columns).join(", ")),
            ReturningPosition::BeforeValues,
        ))
    }

    fn returning_deleted_clause(&self, columns: &[&str]) -> Option<(String, ReturningPosition)> {
        Some((
            format!("OUTPUT {}", self.format_old_values(columns).join(", ")),
            ReturningPosition::BeforeValues,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postgres_numbers_placeholders() {
        assert_eq!(
            Postgres.replace_placeholders("a = ? AND b = '?' AND c IN (?,?)"),
            "a = $1 AND b = '?' AND c IN ($2,$3)"
        );
        assert_eq!(SqlServer.replace_placeholders("a = ?"), "a = @p1");
        assert_eq!(Ansi.replace_placeholders("a = ?"), "a = ?");
    }

    #[test]
    fn quoting() {
        assert_eq!(Postgres.quote("order"), "\"order\"");
        assert_eq!(Postgres.quote("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(Postgres.quote_qualified("public.books"), "\"public\".\"books\"");
        assert_eq!(SqlServer.quote("books"), "[books]");
    }

    #[test]
    fn returning_support() {
        assert!(Postgres.supports_returning());
        assert!(!Ansi.supports_returning());
        assert_eq!(
            Postgres.returning_clause(&["id", "created_at"]),
            Some((
                "RETURNING \"id\", \"created_at\"".to_string(),
                ReturningPosition::End
            ))
        );
        assert_eq!(
            SqlServer.returning_deleted_clause(&["id"]).map(|(s, _)| s),
            Some("OUTPUT DELETED.[id]".to_string())
        );
    }

    #[test]
    fn limit_offset_fragments() {
        assert_eq!(
            Postgres.build_limit(10),
            ("LIMIT ?".to_string(), vec![Value::I64(10)])
        );
        assert!(SqlServer.is_offset_first());
        assert_eq!(SqlServer.build_offset(0).0, "OFFSET ? ROWS");
    }
}
