//! # tagorm
//!
//! Tag-driven SQL statement building and record mapping.
//!
//! - **Conditions**: parameterized SQL fragments with neutral `?`
//!   placeholders, composed with AND / OR / NOT.
//! - **Statements**: SELECT / INSERT / UPDATE / DELETE builders that render
//!   deterministically through a [`Dialect`].
//! - **Records**: structs describe their columns once (`#[derive(Record)]`
//!   or by hand); mappings are built on first use and cached per type.
//! - **Execution**: a [`Db`] handle runs statements, hydrates records and
//!   caches prepared statements per connection in an LRU.
//!
//! ```ignore
//! use tagorm::{Condition, Record};
//!
//! #[derive(Debug, Default, Record)]
//! #[db(table = "books")]
//! struct Book {
//!     #[db("id,key,auto")]
//!     id: i64,
//!     #[db("title")]
//!     title: String,
//!     #[db("version,oplock")]
//!     version: i32,
//! }
//!
//! let mut db = tagorm::connect(&database_url)?;
//! let mut book = Book { title: "Dune".into(), ..Default::default() };
//! db.insert(&mut book).await?;
//!
//! let mut found = Book::default();
//! db.select(&mut found)
//!     .filter(Condition::eq("\"id\"", book.id))
//!     .fetch()
//!     .await?;
//! ```

pub mod condition;
pub mod db;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod mapping;
pub mod naming;
pub mod placeholder;
pub mod statement;
pub mod stmt_cache;
pub mod target;
pub mod value;

#[cfg(feature = "pool")]
pub mod pool;

pub use condition::Condition;
pub use db::{Cursor, Db, DbConfig, RecordSelect};
pub use dialect::{Ansi, Dialect, Postgres, ReturningPosition, SqlServer};
pub use driver::{Connection, Driver, ExecResult, Row, RowStream};
pub use error::{OrmError, OrmResult};
pub use mapping::{
    ColumnMapping, MappingBuilder, MappingCache, NestedMapping, Record, StructMapping,
};
pub use naming::TableNaming;
pub use statement::Statement;
pub use stmt_cache::StatementCache;
pub use target::{Boxed, RecordDescriptor, Shape, Target};
pub use value::{Arg, ConversionError, IntoArg, Scannable, Value};

#[cfg(feature = "pool")]
pub use driver::postgres::{PgConnection, PgDriver};

#[cfg(feature = "pool")]
pub use pool::{
    connect, connect_with_config, create_pool, create_pool_with_config, create_pool_with_tls,
};

#[cfg(feature = "derive")]
pub use tagorm_derive::Record;
