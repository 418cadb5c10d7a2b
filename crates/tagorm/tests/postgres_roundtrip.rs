//! Round trips against a live PostgreSQL. Skipped when `DATABASE_URL` is unset.

#![allow(dead_code)]

use std::panic::{AssertUnwindSafe, resume_unwind};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use futures_util::FutureExt;
use tagorm::{Condition, Db, DbConfig, OrmResult, PgDriver, Record, TableNaming};

#[derive(Debug, Default, Clone, PartialEq, Record)]
struct Shelf {
    #[db("id,key,auto")]
    id: i64,
    #[db("label")]
    label: String,
    #[db("note")]
    note: Option<String>,
    #[db("version,oplock")]
    version: i32,
    #[db(nested = "owner_")]
    owner: Owner,
    // Not mapped.
    scratch: String,
}

#[derive(Debug, Default, Clone, PartialEq, Record)]
struct Owner {
    #[db("name")]
    name: String,
}

fn database_url(test: &str) -> Option<String> {
    dotenvy::dotenv().ok();
    match std::env::var("DATABASE_URL") {
        Ok(v) => Some(v),
        Err(_) => {
            eprintln!("DATABASE_URL is not set; skipping {test}");
            None
        }
    }
}

static TABLE: OnceLock<String> = OnceLock::new();

/// One fresh table per test process; `TableNaming::Custom` routes `Shelf` to it.
fn shelf_table(_: &str) -> String {
    TABLE
        .get_or_init(|| {
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock before UNIX_EPOCH")
                .as_nanos();
            format!("tagorm_shelf_{}_{}", std::process::id(), nanos)
        })
        .clone()
}

async fn setup(url: &str) -> OrmResult<(Db<PgDriver>, String)> {
    let table = shelf_table("Shelf");
    let config = DbConfig::new().table_naming(TableNaming::Custom(shelf_table));
    let mut db = tagorm::connect_with_config(url, config)?;
    db.raw_execute(Condition::raw(format!(
        "CREATE TABLE {table} (
            id BIGSERIAL PRIMARY KEY,
            label TEXT NOT NULL,
            note TEXT,
            version INT NOT NULL DEFAULT 1,
            owner_name TEXT NOT NULL DEFAULT ''
        )"
    )))
    .await?;
    Ok((db, table))
}

async fn teardown(db: &mut Db<PgDriver>, table: &str) -> OrmResult<()> {
    db.raw_execute(Condition::raw(format!("DROP TABLE IF EXISTS {table}")))
        .await?;
    Ok(())
}

#[tokio::test]
async fn record_round_trip() -> OrmResult<()> {
    let Some(url) = database_url("record_round_trip") else {
        return Ok(());
    };
    let (mut db, table) = setup(&url).await?;

    // The table is dropped even when an assertion fails.
    let outcome = AssertUnwindSafe(exercise(&mut db)).catch_unwind().await;
    teardown(&mut db, &table).await?;
    match outcome {
        Ok(result) => result,
        Err(panic) => resume_unwind(panic),
    }
}

async fn exercise(db: &mut Db<PgDriver>) -> OrmResult<()> {
    let mut shelves = vec![
        Shelf {
            label: "fiction".into(),
            version: 1,
            owner: Owner { name: "ana".into() },
            ..Default::default()
        },
        Shelf {
            label: "poetry".into(),
            note: Some("top row".into()),
            version: 1,
            ..Default::default()
        },
    ];
    assert_eq!(db.insert(&mut shelves).await?, 2);
    assert!(shelves[0].id > 0 && shelves[1].id > shelves[0].id);

    let mut found = Shelf::default();
    db.select(&mut found)
        .filter(Condition::eq("\"id\"", shelves[1].id))
        .fetch()
        .await?;
    assert_eq!(found.note.as_deref(), Some("top row"));

    let mut all: Vec<Shelf> = Vec::new();
    db.select(&mut all).order_by("\"id\"").fetch().await?;
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].owner.name, "ana");
    assert_eq!(db.count::<Shelf>(None).await?, 2);

    found.label = "verse".into();
    db.update(&mut found).await?;
    assert_eq!(found.version, 2);

    // A stale copy loses the race.
    let mut stale = all[1].clone();
    stale.label = "lost".into();
    assert!(db.update(&mut stale).await.unwrap_err().is_optimistic_lock());

    assert_eq!(db.delete(&mut found).await?, 1);
    let mut missing = Shelf::default();
    let err = db
        .select(&mut missing)
        .filter(Condition::eq("\"id\"", found.id))
        .fetch()
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(db.count::<Shelf>(None).await?, 1);

    let result: OrmResult<()> = async {
        tagorm::transaction!(&mut *db, tx, {
            let mut shelf = Shelf {
                label: "temp".into(),
                version: 1,
                ..Default::default()
            };
            tx.insert(&mut shelf).await?;
            tx.raw_execute(Condition::raw("SELECT * FROM no_such_table")).await?;
            Ok(())
        })
    }
    .await;
    assert!(result.is_err());
    assert_eq!(db.count::<Shelf>(None).await?, 1);

    Ok(())
}
