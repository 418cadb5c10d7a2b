use super::*;
use crate::cond;
use crate::dialect::{Ansi, Postgres, SqlServer};

#[test]
fn select_full_clause_order() {
    let (sql, args) = select()
        .distinct()
        .columns(&["b.id", "a.name"])
        .from_as("books", "b")
        .inner_join("authors", "a", Condition::raw("a.id = b.author_id"))
        .filter(cond!("b.price > ?", 10i64))
        .filter(Condition::in_list("b.kind", vec!["x", "y"]))
        .group_by(&["b.id", "a.name"])
        .having(cond!("COUNT(*) > ?", 1i64))
        .order_by("b.id")
        .limit(10)
        .offset(20)
        .suffix(Condition::raw("FOR UPDATE"))
        .render(&Ansi)
        .expect("render");
    assert_eq!(
        sql,
        "SELECT DISTINCT b.id, a.name FROM \"books\" \"b\" INNER JOIN \"authors\" \"a\" \
         ON a.id = b.author_id WHERE b.price > ? AND b.kind IN (?,?) GROUP BY b.id, a.name \
         HAVING COUNT(*) > ? ORDER BY b.id LIMIT ? OFFSET ? FOR UPDATE"
    );
    assert_eq!(
        args,
        vec![
            Value::I64(10),
            Value::Text("x".into()),
            Value::Text("y".into()),
            Value::I64(1),
            Value::I64(10),
            Value::I64(20),
        ]
    );
}

#[test]
fn select_requires_columns_and_from() {
    assert!(select().from("t").render(&Ansi).unwrap_err().is_build());
    assert!(select().column("*").render(&Ansi).unwrap_err().is_build());
}

#[test]
fn having_without_group_by_fails() {
    let err = select()
        .column("*")
        .from("t")
        .having(Condition::raw("COUNT(*) > 1"))
        .render(&Ansi)
        .unwrap_err();
    assert!(err.is_build());
}

#[test]
fn condition_error_propagates_into_render() {
    let err = select()
        .column("*")
        .from("t")
        .filter(Condition::in_list("id", Vec::<i64>::new()))
        .render(&Ansi)
        .unwrap_err();
    assert!(err.is_build());
}

#[test]
fn rendering_is_repeatable() {
    let q = select()
        .column("id")
        .from("t")
        .filter(cond!("a = ? OR b = ?", 1i64, 2i64))
        .limit(3);
    assert_eq!(
        q.render(&Postgres).expect("first"),
        q.render(&Postgres).expect("second")
    );
}

#[test]
fn offset_first_dialect_orders_paging() {
    let (sql, args) = select()
        .column("id")
        .from("t")
        .order_by("id")
        .limit(1)
        .render(&SqlServer)
        .expect("render");
    assert_eq!(
        sql,
        "SELECT id FROM [t] ORDER BY id OFFSET ? ROWS FETCH NEXT ? ROWS ONLY"
    );
    assert_eq!(args, vec![Value::I64(0), Value::I64(1)]);

    let err = select()
        .column("id")
        .from("t")
        .limit(1)
        .render(&SqlServer)
        .unwrap_err();
    assert!(err.is_build());
}

#[test]
fn count_sql_drops_paging_and_wraps_groups() {
    let base = select()
        .column("id")
        .from("t")
        .filter(cond!("a = ?", 1i64))
        .order_by("id")
        .limit(5);
    let (sql, args) = base.to_count_sql(&Postgres).expect("count");
    assert_eq!(sql, "SELECT COUNT(*) FROM \"t\" WHERE a = ?");
    assert_eq!(args, vec![Value::I64(1)]);

    let (sql, _) = base
        .group_by(&["id"])
        .to_count_sql(&Postgres)
        .expect("count");
    assert_eq!(
        sql,
        "SELECT COUNT(*) FROM (SELECT id FROM \"t\" WHERE a = ? GROUP BY id) AS \"counted\""
    );
}

#[test]
fn insert_multi_row_with_returning() {
    let (sql, args) = insert("books")
        .columns(&["title", "price"])
        .values(vec![Value::from("A"), Value::I64(1)])
        .values(vec![Value::from("B"), Value::I64(2)])
        .returning(&["id"])
        .render(&Postgres)
        .expect("render");
    assert_eq!(
        sql,
        "INSERT INTO \"books\" (\"title\", \"price\") VALUES (?, ?), (?, ?) RETURNING \"id\""
    );
    assert_eq!(args.len(), 4);

    let (sql, _) = insert("books")
        .columns(&["title"])
        .values(vec![Value::from("A")])
        .returning(&["id"])
        .render(&SqlServer)
        .expect("render");
    assert_eq!(
        sql,
        "INSERT INTO [books] ([title]) OUTPUT INSERTED.[id] VALUES (?)"
    );
}

#[test]
fn insert_arity_mismatch_fails() {
    let err = insert("t")
        .columns(&["a", "b", "c"])
        .values(vec![Value::I64(1), Value::I64(2)])
        .render(&Postgres)
        .unwrap_err();
    assert!(err.is_build());
    assert!(insert("").columns(&["a"]).values(vec![Value::Null]).render(&Ansi).is_err());
    assert!(insert("t").values(vec![]).render(&Ansi).is_err());
    assert!(insert("t").columns(&["a"]).render(&Ansi).is_err());
}

#[test]
fn returning_is_rejected_where_unsupported() {
    let err = insert("t")
        .columns(&["a"])
        .values(vec![Value::I64(1)])
        .returning(&["id"])
        .render(&Ansi)
        .unwrap_err();
    assert!(err.is_build());
}

#[test]
fn update_set_where_returning() {
    let (sql, args) = update("books")
        .set("title", "T")
        .set_raw(cond!("hits = hits + ?", 1i64))
        .filter(Condition::eq("\"id\"", 7i64))
        .returning(&["hits"])
        .suffix(Condition::raw("-- audit"))
        .render(&Postgres)
        .expect("render");
    assert_eq!(
        sql,
        "UPDATE \"books\" SET \"title\" = ?, hits = hits + ? WHERE \"id\" = ? \
         RETURNING \"hits\" -- audit"
    );
    assert_eq!(
        args,
        vec![Value::Text("T".into()), Value::I64(1), Value::I64(7)]
    );
    assert!(update("books").render(&Postgres).unwrap_err().is_build());
}

#[test]
fn delete_renders_where_and_returning() {
    let (sql, args) = delete("books")
        .filter(Condition::eq("id", 3i64))
        .returning(&["id"])
        .render(&SqlServer)
        .expect("render");
    assert_eq!(sql, "DELETE FROM [books] OUTPUT DELETED.[id] WHERE id = ?");
    assert_eq!(args, vec![Value::I64(3)]);

    let (sql, _) = delete("books").render(&Ansi).expect("render");
    assert_eq!(sql, "DELETE FROM \"books\"");
    assert!(delete("").render(&Ansi).is_err());
}
