//! Table naming strategies.

use heck::ToSnakeCase;

/// How a record type name becomes a table name when the record does not
/// declare one.
#[derive(Debug, Clone, Copy, Default)]
pub enum TableNaming {
    /// Use the bare type name unchanged: `BookAuthor`.
    #[default]
    Identity,
    /// `BookAuthor` -> `book_author`.
    SnakeCase,
    /// `BookAuthor` -> `BookAuthors`.
    Plural,
    /// `BookAuthor` -> `book_authors`.
    SnakeCasePlural,
    /// Caller-supplied conversion.
    Custom(fn(&str) -> String),
}

impl TableNaming {
    /// Apply the strategy to a bare type name.
    pub fn apply(&self, type_name: &str) -> String {
        match self {
            TableNaming::Identity => type_name.to_string(),
            TableNaming::SnakeCase => type_name.to_snake_case(),
            TableNaming::Plural => pluralize(type_name),
            TableNaming::SnakeCasePlural => pluralize(&type_name.to_snake_case()),
            TableNaming::Custom(f) => f(type_name),
        }
    }
}

/// English plural heuristic: `category` -> `categories`, `box` -> `boxes`,
/// `book` -> `books`.
pub fn pluralize(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    let consonant_y = lower.ends_with('y')
        && !matches!(
            lower.chars().rev().nth(1),
            Some('a' | 'e' | 'i' | 'o' | 'u') | None
        );
    if consonant_y {
        format!("{}ies", &word[..word.len() - 1])
    } else if ["s", "x", "z", "ch", "sh"].iter().any(|s| lower.ends_with(s)) {
        format!("{word}es")
    } else {
        format!("{word}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategies() {
        assert_eq!(TableNaming::Identity.apply("BookAuthor"), "BookAuthor");
        assert_eq!(TableNaming::SnakeCase.apply("BookAuthor"), "book_author");
        assert_eq!(TableNaming::Plural.apply("Book"), "Books");
        assert_eq!(TableNaming::SnakeCasePlural.apply("BookCategory"), "book_categories");
        assert_eq!(
            TableNaming::Custom(|n| format!("t_{n}")).apply("Book"),
            "t_Book"
        );
    }

    #[test]
    fn plural_rules() {
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("match"), "matches");
        assert_eq!(pluralize("user"), "users");
    }
}
