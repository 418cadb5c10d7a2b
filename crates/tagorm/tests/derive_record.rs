//! `#[derive(Record)]` produces the same mapping as a hand-written describe.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tagorm::{MappingCache, OrmError, Record, TableNaming, Value, target::table_name_of};

#[derive(Debug, Default, Record)]
struct Publisher {
    #[db("id")]
    id: i64,
    #[db("name")]
    name: String,
}

#[derive(Debug, Default, Record)]
#[db(table = "catalog.books")]
struct Book {
    #[db("id,key,auto")]
    id: i64,
    #[db("title")]
    title: String,
    #[db("published_at")]
    published_at: Option<DateTime<Utc>>,
    #[db("version,oplock")]
    version: i64,
    #[db(nested = "publisher_,rel=p")]
    publisher: Publisher,
    #[db("cover")]
    cover: Box<Vec<u8>>,
    shelf_position: usize,
}

#[derive(Debug, Default, Record)]
struct LibraryCard {
    #[db("")]
    number: String,
}

#[test]
fn derived_mapping_lists_tagged_columns() {
    let cache = MappingCache::new();
    let mapping = cache.get::<Book>().unwrap();

    assert_eq!(
        mapping.all_columns(),
        vec!["id", "title", "published_at", "version", "publisher_id", "publisher_name"]
    );
    assert_eq!(mapping.key_columns(), vec!["id"]);
    assert_eq!(mapping.auto_columns(), vec!["id"]);
    assert_eq!(mapping.auto_key().unwrap().field, "id");
    assert_eq!(mapping.oplock().unwrap().column, "version");

    let publisher = mapping.column("publisher_name").unwrap();
    assert_eq!(publisher.relation.as_deref(), Some("p"));
    assert_eq!(publisher.relation_column, "name");
    assert!(!publisher.is_writable());
}

#[test]
fn derived_setters_assign_fields() {
    let cache = MappingCache::new();
    let mapping = cache.get::<Book>().unwrap();

    let mut book = Book::default();
    mapping
        .set_named(
            &mut book,
            &["title", "publisher_name"],
            vec![Value::from("Dune"), Value::from("Chilton")],
        )
        .unwrap();
    assert_eq!(book.title, "Dune");
    assert_eq!(book.publisher.name, "Chilton");

    mapping.advance_oplock(&mut book).unwrap();
    assert_eq!(book.version, 1);
}

#[test]
fn declared_table_wins_over_naming() {
    assert_eq!(table_name_of::<Book>(&TableNaming::SnakeCasePlural), "catalog.books");
    assert_eq!(
        table_name_of::<LibraryCard>(&TableNaming::SnakeCasePlural),
        "library_cards"
    );
}

#[test]
fn empty_tag_fails_every_time() {
    let cache = Arc::new(MappingCache::new());
    for _ in 0..2 {
        let err = cache.get::<LibraryCard>().unwrap_err();
        assert!(matches!(err, OrmError::Tag { ref field, .. } if field == "number"));
    }
    assert!(cache.is_empty());
}

#[test]
fn describe_is_callable_directly() {
    let mapping = tagorm::StructMapping::<Publisher>::build().unwrap();
    assert_eq!(mapping.type_name(), "Publisher");
    assert_eq!(Publisher::table_name(), None);
}
