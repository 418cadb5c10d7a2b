//! Neutral `?` placeholder handling.
//!
//! Statements are rendered with `?` as the placeholder token. Dialects that
//! use another syntax rewrite the token right before execution through
//! [`rewrite`]. A `?` inside a single-quoted string literal is left alone.

use crate::value::{Arg, Value};

/// The dialect-neutral placeholder token.
pub const PLACEHOLDER: char = '?';

/// Count placeholder occurrences outside string literals.
pub fn count(sql: &str) -> usize {
    let mut n = 0;
    scan(sql, |_| n += 1);
    n
}

/// Replace each placeholder with `f(index)`, where `index` is 1-based.
///
/// ```
/// let sql = tagorm::placeholder::rewrite("a = ? AND b = '?' AND c = ?", |i| format!("${i}"));
/// assert_eq!(sql, "a = $1 AND b = '?' AND c = $2");
/// ```
pub fn rewrite(sql: &str, mut f: impl FnMut(usize) -> String) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut idx = 0;
    let mut in_literal = false;
    for ch in sql.chars() {
        match ch {
            '\'' => {
                in_literal = !in_literal;
                out.push(ch);
            }
            PLACEHOLDER if !in_literal => {
                idx += 1;
                out.push_str(&f(idx));
            }
            _ => out.push(ch),
        }
    }
    out
}

fn scan(sql: &str, mut on_placeholder: impl FnMut(usize)) {
    let mut in_literal = false;
    for (pos, ch) in sql.char_indices() {
        match ch {
            '\'' => in_literal = !in_literal,
            PLACEHOLDER if !in_literal => on_placeholder(pos),
            _ => {}
        }
    }
}

/// Bind positional arguments to a template, expanding list arguments.
///
/// Each placeholder consumes one argument. A list argument with n elements
/// turns its placeholder into n comma-separated placeholders.
pub(crate) fn expand(template: &str, args: Vec<Arg>) -> Result<(String, Vec<Value>), String> {
    let mut positions = Vec::new();
    scan(template, |pos| positions.push(pos));

    if positions.len() != args.len() {
        return Err(format!(
            "template has {} placeholder(s) but {} argument(s) were given: {}",
            positions.len(),
            args.len(),
            template
        ));
    }

    let mut sql = String::with_capacity(template.len() + 8);
    let mut values = Vec::with_capacity(args.len());
    let mut last = 0;
    for (pos, arg) in positions.into_iter().zip(args) {
        sql.push_str(&template[last..pos]);
        last = pos + PLACEHOLDER.len_utf8();
        match arg {
            Arg::Value(v) => {
                sql.push(PLACEHOLDER);
                values.push(v);
            }
            Arg::List(list) => {
                if list.is_empty() {
                    return Err(format!("empty list argument in: {template}"));
                }
                for (i, v) in list.into_iter().enumerate() {
                    if i > 0 {
                        sql.push(',');
                    }
                    sql.push(PLACEHOLDER);
                    values.push(v);
                }
            }
        }
    }
    sql.push_str(&template[last..]);
    Ok((sql, values))
}
