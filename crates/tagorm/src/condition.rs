//! Query condition algebra.
//!
//! A [`Condition`] is an immutable `(fragment, args, error)` triple built from
//! a template with `?` placeholders. Conditions compose with
//! [`Condition::and`], [`Condition::or`] and [`Condition::not`]; an error in
//! any input makes the result carry that error and no SQL is assembled.
//!
//! # Example
//! ```
//! use tagorm::{Condition, cond};
//!
//! let c = Condition::and([
//!     cond!("status = ?", "active"),
//!     cond!("id IN (?)", vec![1i64, 2, 3]),
//! ]);
//! assert_eq!(c.sql(), "status = ? AND id IN (?,?,?)");
//! assert_eq!(c.args().len(), 4);
//! ```

use crate::error::{OrmError, OrmResult};
use crate::placeholder;
use crate::value::{Arg, IntoArg, Value};

/// A composable SQL predicate with its bound arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    sql: String,
    args: Vec<Value>,
    error: Option<String>,
}

/// Build a [`Condition`] from a template and heterogeneous arguments.
///
/// ```
/// let c = tagorm::cond!("age > ? AND name = ?", 18i32, "bob");
/// assert_eq!(c.args().len(), 2);
/// ```
#[macro_export]
macro_rules! cond {
    ($template:expr $(, $arg:expr)* $(,)?) => {
        $crate::Condition::new($template, vec![$($crate::IntoArg::into_arg($arg)),*])
    };
}

impl Condition {
    /// Create a condition from a template and positional arguments.
    ///
    /// List arguments expand to one placeholder per element. An empty list or a
    /// placeholder/argument count mismatch produces an inert error condition.
    pub fn new(template: impl AsRef<str>, args: Vec<Arg>) -> Self {
        match placeholder::expand(template.as_ref(), args) {
            Ok((sql, args)) => Self {
                sql,
                args,
                error: None,
            },
            Err(message) => Self::failed(message),
        }
    }

    /// Create a raw SQL condition without arguments.
    ///
    /// The fragment must not contain placeholders.
    pub fn raw(sql: impl AsRef<str>) -> Self {
        Self::new(sql, Vec::new())
    }

    fn failed(message: String) -> Self {
        Self {
            sql: String::new(),
            args: Vec::new(),
            error: Some(message),
        }
    }

    fn binary(column: &str, op: &str, value: impl IntoArg) -> Self {
        Self::new(format!("{column} {op} ?"), vec![value.into_arg()])
    }

    // ==================== Column helpers ====================

    /// column = value
    pub fn eq(column: &str, value: impl IntoArg) -> Self {
        Self::binary(column, "=", value)
    }

    /// column <> value
    pub fn ne(column: &str, value: impl IntoArg) -> Self {
        Self::binary(column, "<>", value)
    }

    /// column > value
    pub fn gt(column: &str, value: impl IntoArg) -> Self {
        Self::binary(column, ">", value)
    }

    /// column >= value
    pub fn gte(column: &str, value: impl IntoArg) -> Self {
        Self::binary(column, ">=", value)
    }

    /// column < value
    pub fn lt(column: &str, value: impl IntoArg) -> Self {
        Self::binary(column, "<", value)
    }

    /// column <= value
    pub fn lte(column: &str, value: impl IntoArg) -> Self {
        Self::binary(column, "<=", value)
    }

    /// column LIKE pattern
    pub fn like(column: &str, pattern: impl IntoArg) -> Self {
        Self::binary(column, "LIKE", pattern)
    }

    /// column IS NULL
    pub fn is_null(column: &str) -> Self {
        Self::raw(format!("{column} IS NULL"))
    }

    /// column IS NOT NULL
    pub fn is_not_null(column: &str) -> Self {
        Self::raw(format!("{column} IS NOT NULL"))
    }

    /// column IN (values...); an empty list is an error.
    pub fn in_list(column: &str, values: impl IntoArg) -> Self {
        Self::new(format!("{column} IN (?)"), vec![values.into_arg()])
    }

    /// column NOT IN (values...); an empty list is an error.
    pub fn not_in(column: &str, values: impl IntoArg) -> Self {
        Self::new(format!("{column} NOT IN (?)"), vec![values.into_arg()])
    }

    /// column BETWEEN from AND to
    pub fn between(column: &str, from: impl IntoArg, to: impl IntoArg) -> Self {
        Self::new(
            format!("{column} BETWEEN ? AND ?"),
            vec![from.into_arg(), to.into_arg()],
        )
    }

    // ==================== Composition ====================

    /// Join conditions with AND. A single condition is returned unchanged.
    pub fn and(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Self::join(conditions, " AND ", false, "and")
    }

    /// Join conditions with OR inside parentheses. A single condition is
    /// returned unchanged.
    pub fn or(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Self::join(conditions, " OR ", true, "or")
    }

    /// Negate a condition: `NOT (fragment)`.
    pub fn not(condition: Condition) -> Self {
        if condition.error.is_some() {
            return condition;
        }
        Self {
            sql: format!("NOT ({})", condition.sql),
            args: condition.args,
            error: None,
        }
    }

    fn join(
        conditions: impl IntoIterator<Item = Condition>,
        separator: &str,
        parenthesize: bool,
        name: &str,
    ) -> Self {
        let mut conditions: Vec<Condition> = conditions.into_iter().collect();
        if let Some(failed) = conditions.iter().position(|c| c.error.is_some()) {
            return conditions.swap_remove(failed);
        }
        match conditions.len() {
            0 => Self::failed(format!("{name}() requires at least one condition")),
            1 => conditions.remove(0),
            _ => {
                let mut sql = String::new();
                let mut args = Vec::new();
                if parenthesize {
                    sql.push('(');
                }
                for (i, c) in conditions.into_iter().enumerate() {
                    if i > 0 {
                        sql.push_str(separator);
                    }
                    sql.push_str(&c.sql);
                    args.extend(c.args);
                }
                if parenthesize {
                    sql.push(')');
                }
                Self {
                    sql,
                    args,
                    error: None,
                }
            }
        }
    }

    // ==================== Accessors ====================

    /// The SQL fragment with neutral `?` placeholders.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The arguments bound to the fragment, in placeholder order.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// The build error carried by this condition, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Fragment and arguments, or the carried error as [`OrmError::Build`].
    pub fn parts(&self) -> OrmResult<(&str, &[Value])> {
        match &self.error {
            Some(message) => Err(OrmError::build(message.clone())),
            None => Ok((&self.sql, &self.args)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cond;

    fn c(sql: &str) -> Condition {
        Condition::raw(sql)
    }

    #[test]
    fn list_argument_expands_in_order() {
        let cond = Condition::in_list("id", vec![10i64, 20, 30]);
        assert_eq!(cond.sql(), "id IN (?,?,?)");
        assert_eq!(
            cond.args(),
            &[Value::I64(10), Value::I64(20), Value::I64(30)]
        );
    }

    #[test]
    fn single_condition_is_returned_verbatim() {
        let only = cond!("a = ?", 1i64);
        assert_eq!(Condition::and([only.clone()]), only);
        assert_eq!(Condition::or([only.clone()]), only);
    }

    #[test]
    fn and_or_not_render() {
        assert_eq!(
            Condition::and([c("f1"), c("f2"), c("f3")]).sql(),
            "f1 AND f2 AND f3"
        );
        assert_eq!(Condition::or([c("f1"), c("f2")]).sql(), "(f1 OR f2)");
        assert_eq!(Condition::not(c("f")).sql(), "NOT (f)");
    }

    #[test]
    fn composition_concatenates_args() {
        let cond = Condition::or([cond!("a = ?", 1i64), cond!("b = ?", "x")]);
        assert_eq!(cond.args(), &[Value::I64(1), Value::Text("x".into())]);
        let negated = Condition::not(cond.clone());
        assert_eq!(negated.args(), cond.args());
    }

    #[test]
    fn errors_short_circuit() {
        let bad = Condition::in_list("id", Vec::<i64>::new());
        assert!(bad.error().is_some());

        let combined = Condition::and([c("ok"), bad.clone(), c("other")]);
        assert_eq!(combined, bad);
        assert_eq!(Condition::not(bad.clone()), bad);
        assert!(combined.parts().unwrap_err().is_build());
    }

    #[test]
    fn argument_count_mismatch_is_an_error() {
        let cond = cond!("a = ? AND b = ?", 1i64);
        assert!(cond.error().is_some());
        assert_eq!(cond.sql(), "");
    }

    #[test]
    fn zero_conditions_is_an_error() {
        assert!(Condition::and(Vec::new()).error().is_some());
        assert!(Condition::or(Vec::new()).error().is_some());
    }

    #[test]
    fn helpers_render_templates() {
        assert_eq!(Condition::eq("title", "T").sql(), "title = ?");
        assert_eq!(Condition::is_null("deleted_at").sql(), "deleted_at IS NULL");
        assert_eq!(
            Condition::between("age", 18i32, 65i32).sql(),
            "age BETWEEN ? AND ?"
        );
    }
}
