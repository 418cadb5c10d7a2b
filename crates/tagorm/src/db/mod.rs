//! The database handle.
//!
//! [`Db`] ties a [`Driver`], a [`Dialect`] and a [`MappingCache`] together
//! and owns the per-handle state: the two prepared-statement caches, the
//! optional dedicated connection and the active transaction. Mutating
//! methods take `&mut self`; use [`Db::clone_handle`] for concurrent work.
//!
//! ```ignore
//! let pool = tagorm::create_pool(&database_url)?;
//! let mut db = tagorm::Db::postgres(pool);
//!
//! let mut book = Book { title: "Dune".into(), ..Default::default() };
//! db.insert(&mut book).await?;
//!
//! let mut books: Vec<Book> = Vec::new();
//! db.select(&mut books)
//!     .filter(tagorm::cond!("\"title\" LIKE ?", "D%"))
//!     .order_by("\"id\"")
//!     .fetch()
//!     .await?;
//!
//! tagorm::transaction!(&mut db, tx, {
//!     tx.update(&mut book).await?;
//!     Ok(())
//! })?;
//! ```

mod config;
mod cursor;
mod record;
mod select;

pub use config::DbConfig;
pub use cursor::Cursor;
pub use select::RecordSelect;

use std::sync::Arc;

use crate::condition::Condition;
use crate::dialect::Dialect;
use crate::driver::{Connection, Driver, ExecResult, Query, Row};
use crate::error::{OrmError, OrmResult};
use crate::mapping::MappingCache;
use crate::statement::Statement;
use crate::stmt_cache::StatementCache;
use crate::value::Value;

type Handle<D> = <<D as Driver>::Conn as Connection>::Statement;

/// Runs the given block inside a transaction on a [`Db`] handle.
///
/// - Begins a transaction with `begin()`.
/// - Commits on `Ok(_)`.
/// - Rolls back on `Err(_)`.
///
/// The block must evaluate to `tagorm::OrmResult<T>`.
#[macro_export]
macro_rules! transaction {
    ($db:expr, $tx:ident, $body:block) => {{
        let $tx = $db;
        $tx.begin().await?;

        let __tagorm_tx_result: $crate::OrmResult<_> = async { $body }.await;
        match __tagorm_tx_result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(error) => match $tx.rollback().await {
                Ok(()) => Err(error),
                Err(rollback_err) => Err($crate::OrmError::Other(format!(
                    "{error} (rollback failed: {rollback_err})"
                ))),
            },
        }
    }};
}

/// A database handle.
pub struct Db<D: Driver> {
    driver: Arc<D>,
    dialect: Arc<dyn Dialect>,
    mappings: Arc<MappingCache>,
    config: DbConfig,
    conn: Option<D::Conn>,
    conn_cache: StatementCache<Handle<D>>,
    tx: Option<D::Conn>,
    tx_cache: StatementCache<Handle<D>>,
}

impl<D: Driver> std::fmt::Debug for Db<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db")
            .field("dialect", &self.dialect.name())
            .field("config", &self.config)
            .field("in_transaction", &self.tx.is_some())
            .field("conn_cache_len", &self.conn_cache.len())
            .field("tx_cache_len", &self.tx_cache.len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Query,
    Execute,
}

enum Outcome {
    Rows(Vec<Row>),
    Exec(ExecResult),
}

struct SqlLog {
    max: Option<usize>,
    in_tx: bool,
}

impl<D: Driver> Db<D> {
    /// Create a handle with the default configuration and the process-wide
    /// mapping cache.
    pub fn new(driver: D, dialect: impl Dialect + 'static) -> Self {
        Self::with_config(driver, dialect, DbConfig::default())
    }

    pub fn with_config(driver: D, dialect: impl Dialect + 'static, config: DbConfig) -> Self {
        Self::from_parts(
            Arc::new(driver),
            Arc::new(dialect),
            MappingCache::global(),
            config,
        )
    }

    fn from_parts(
        driver: Arc<D>,
        dialect: Arc<dyn Dialect>,
        mappings: Arc<MappingCache>,
        config: DbConfig,
    ) -> Self {
        Self {
            conn: None,
            conn_cache: StatementCache::new(config.cache_capacity, config.conn_cache_enabled),
            tx: None,
            tx_cache: StatementCache::new(config.cache_capacity, config.tx_cache_enabled),
            driver,
            dialect,
            mappings,
            config,
        }
    }

    /// Use a specific mapping cache instead of the process-wide one.
    pub fn with_mappings(mut self, mappings: Arc<MappingCache>) -> Self {
        self.mappings = mappings;
        self
    }

    /// A new handle sharing the driver, dialect and mapping cache, with its
    /// own statement caches and no transaction.
    pub fn clone_handle(&self) -> Self {
        Self::from_parts(
            Arc::clone(&self.driver),
            Arc::clone(&self.dialect),
            Arc::clone(&self.mappings),
            self.config.clone(),
        )
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn dialect(&self) -> &dyn Dialect {
        &*self.dialect
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    pub fn mappings(&self) -> &Arc<MappingCache> {
        &self.mappings
    }

    pub fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }

    /// Number of prepared statements cached (connection, transaction).
    pub fn cached_statements(&self) -> (usize, usize) {
        (self.conn_cache.len(), self.tx_cache.len())
    }

    // ==================== Transactions ====================

    /// Begin a transaction on a freshly acquired connection.
    pub async fn begin(&mut self) -> OrmResult<()> {
        if self.tx.is_some() {
            return Err(OrmError::transaction("a transaction is already active"));
        }
        let mut conn = self.driver.acquire().await?;
        conn.batch_execute("BEGIN")
            .await
            .map_err(|e| self.dialect.classify_error(e))?;
        self.tx = Some(conn);
        tracing::trace!(target: "tagorm.tx", "begin");
        Ok(())
    }

    pub async fn commit(&mut self) -> OrmResult<()> {
        self.finish_tx("COMMIT").await
    }

    pub async fn rollback(&mut self) -> OrmResult<()> {
        self.finish_tx("ROLLBACK").await
    }

    async fn finish_tx(&mut self, command: &'static str) -> OrmResult<()> {
        let Some(mut conn) = self.tx.take() else {
            return Err(OrmError::transaction(format!(
                "{command} without an active transaction"
            )));
        };
        // Handles die with the transaction's connection session state.
        self.tx_cache.invalidate();
        let result = conn.batch_execute(command).await;
        tracing::trace!(target: "tagorm.tx", command, ok = result.is_ok(), "end");
        if result.is_err() {
            // The session may still hold the transaction open.
            conn.discard();
        }
        result.map_err(|e| self.dialect.classify_error(e))
    }

    // ==================== Execution ====================

    /// Render and execute a statement that returns no rows.
    pub async fn execute<S: Statement + Sync>(&mut self, stmt: &S) -> OrmResult<ExecResult> {
        let (sql, args) = stmt.render(&*self.dialect)?;
        self.exec_sql(&sql, &args).await
    }

    /// Render and run a statement, returning its rows.
    pub async fn fetch_all<S: Statement + Sync>(&mut self, stmt: &S) -> OrmResult<Vec<Row>> {
        let (sql, args) = stmt.render(&*self.dialect)?;
        self.query_sql(&sql, &args).await
    }

    /// Execute a raw `?` template.
    pub async fn raw_execute(&mut self, query: Condition) -> OrmResult<ExecResult> {
        let (sql, args) = query.parts()?;
        let (sql, args) = (sql.to_string(), args.to_vec());
        self.exec_sql(&sql, &args).await
    }

    /// Run a raw `?` template, returning its rows.
    pub async fn raw_query(&mut self, query: Condition) -> OrmResult<Vec<Row>> {
        let (sql, args) = query.parts()?;
        let (sql, args) = (sql.to_string(), args.to_vec());
        self.query_sql(&sql, &args).await
    }

    pub(crate) async fn exec_sql(&mut self, sql: &str, args: &[Value]) -> OrmResult<ExecResult> {
        match self.run(sql, args, Op::Execute).await? {
            Outcome::Exec(result) => Ok(result),
            Outcome::Rows(rows) => Ok(ExecResult {
                rows_affected: rows.len() as u64,
                last_insert_id: None,
            }),
        }
    }

    pub(crate) async fn query_sql(&mut self, sql: &str, args: &[Value]) -> OrmResult<Vec<Row>> {
        match self.run(sql, args, Op::Query).await? {
            Outcome::Rows(rows) => Ok(rows),
            Outcome::Exec(_) => Ok(Vec::new()),
        }
    }

    /// Rewrite placeholders, then run on the transaction, the dedicated
    /// connection, or a connection acquired for this call.
    async fn run(&mut self, sql: &str, args: &[Value], op: Op) -> OrmResult<Outcome> {
        let sql = self.dialect.replace_placeholders(sql);
        let log = SqlLog {
            max: self.config.max_logged_sql,
            in_tx: self.tx.is_some(),
        };

        let result = if let Some(conn) = self.tx.as_mut() {
            run_on(conn, &mut self.tx_cache, &sql, args, op, &log).await
        } else if self.conn_cache.is_enabled() {
            if self.conn.is_none() {
                self.conn = Some(self.driver.acquire().await?);
            }
            let result = match self.conn.as_mut() {
                Some(conn) => run_on(conn, &mut self.conn_cache, &sql, args, op, &log).await,
                None => Err(OrmError::Connection("no dedicated connection".to_string())),
            };
            if result.is_err() {
                self.release_lost_conn();
            }
            result
        } else {
            let mut conn = self.driver.acquire().await?;
            run_on(&mut conn, &mut StatementCache::disabled(), &sql, args, op, &log).await
        };
        result.map_err(|e| self.dialect.classify_error(e))
    }

    /// Drop the dedicated connection and its prepared handles once the
    /// session is gone, so the next call acquires a fresh one.
    fn release_lost_conn(&mut self) {
        if let Some(conn) = self.conn.take_if(|conn| conn.is_closed()) {
            tracing::warn!(
                target: "tagorm.stmt_cache",
                cached = self.conn_cache.len(),
                "dedicated connection lost, releasing it"
            );
            self.conn_cache.invalidate();
            conn.discard();
        }
    }

    /// Release every connection-cache handle and the dedicated connection.
    pub async fn close(&mut self) -> OrmResult<()> {
        let handles = self.conn_cache.clear();
        if let Some(mut conn) = self.conn.take() {
            for handle in handles {
                conn.close(handle).await?;
            }
        }
        Ok(())
    }
}

impl<D: Driver> Drop for Db<D> {
    fn drop(&mut self) {
        if let Some(conn) = self.tx.take() {
            tracing::warn!(
                target: "tagorm.tx",
                "handle dropped with an open transaction, discarding connection"
            );
            conn.discard();
        }
    }
}

async fn run_on<C: Connection>(
    conn: &mut C,
    cache: &mut StatementCache<C::Statement>,
    sql: &str,
    args: &[Value],
    op: Op,
    log: &SqlLog,
) -> OrmResult<Outcome> {
    let mut cached = false;
    let stmt = if cache.is_enabled() {
        match cache.get(sql) {
            Some(stmt) => {
                cached = true;
                Some(stmt)
            }
            None => {
                let stmt = conn.prepare(sql).await?;
                if let Some(evicted) = cache.add(sql.to_string(), stmt.clone()) {
                    if let Err(err) = conn.close(evicted).await {
                        tracing::warn!(
                            target: "tagorm.stmt_cache",
                            error = %err,
                            "failed to close evicted statement"
                        );
                    }
                }
                Some(stmt)
            }
        }
    } else {
        None
    };

    tracing::debug!(
        target: "tagorm.sql",
        in_tx = log.in_tx,
        cached,
        param_count = args.len(),
        sql = %truncate_sql(sql, log.max),
        "execute"
    );

    let query = match &stmt {
        Some(stmt) => Query::Prepared(stmt),
        None => Query::Text(sql),
    };
    match dispatch(conn, query, args, op).await {
        Err(err) if stmt.is_some() && conn.is_stale_statement(&err) => {
            tracing::warn!(
                target: "tagorm.sql",
                error = %err,
                "stale prepared statement, retrying unprepared"
            );
            cache.remove(sql);
            dispatch(conn, Query::Text(sql), args, op).await
        }
        other => other,
    }
}

async fn dispatch<C: Connection>(
    conn: &mut C,
    query: Query<'_, C::Statement>,
    args: &[Value],
    op: Op,
) -> OrmResult<Outcome> {
    match op {
        Op::Query => conn.query(query, args).await.map(Outcome::Rows),
        Op::Execute => conn.execute(query, args).await.map(Outcome::Exec),
    }
}

pub(crate) fn truncate_sql(sql: &str, max: Option<usize>) -> String {
    match max {
        Some(max) if sql.len() > max => {
            let mut end = max;
            while end > 0 && !sql.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &sql[..end])
        }
        _ => sql.to_string(),
    }
}

#[cfg(feature = "pool")]
impl Db<crate::driver::postgres::PgDriver> {
    /// A PostgreSQL handle over a connection pool.
    pub fn postgres(pool: deadpool_postgres::Pool) -> Self {
        Self::new(
            crate::driver::postgres::PgDriver::new(pool),
            crate::dialect::Postgres,
        )
    }
}
