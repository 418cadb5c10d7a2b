//! Derive macros for tagorm
//!
//! Provides `#[derive(Record)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod record;

/// Derive `Record` for a struct with named fields.
///
/// # Example
///
/// ```ignore
/// use tagorm::Record;
///
/// #[derive(Default, Record)]
/// #[db(table = "books")]
/// struct Book {
///     #[db("id,key,auto")]
///     id: i64,
///     #[db("title")]
///     title: String,
///     #[db("version,oplock")]
///     version: i32,
///     #[db(nested = "author_,rel=a")]
///     author: Author,
///     // Untagged: not mapped.
///     cached_label: String,
/// }
/// ```
///
/// # Attributes
///
/// - `#[db(table = "name")]` - Table name; otherwise the handle's naming strategy applies
/// - `#[db("column,key,auto,oplock")]` - Column name followed by options
/// - `#[db(nested = "prefix,rel=name")]` - Nested record with a column prefix and relation
///
/// Reference, raw pointer, `Box`, `Rc` and `Arc` fields are never mapped.
#[proc_macro_derive(Record, attributes(db))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
