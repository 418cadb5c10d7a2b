//! Driver seam.
//!
//! A [`Driver`] hands out [`Connection`]s; a connection prepares, executes
//! and streams statements over [`Value`] arguments and returns driver-neutral
//! [`Row`]s. The PostgreSQL implementation lives in [`postgres`].

#[cfg(feature = "pool")]
pub mod postgres;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;

use crate::error::{OrmError, OrmResult};
use crate::value::Value;

/// A result row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of the named column.
    pub fn get(&self, column: &str) -> Option<&Value> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.values.get(idx)
    }

    /// Value of the named column, or a decode error.
    pub fn try_get(&self, column: &str) -> OrmResult<&Value> {
        self.get(column)
            .ok_or_else(|| OrmError::decode(column, "column not found in row"))
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn into_parts(self) -> (Arc<[String]>, Vec<Value>) {
        (self.columns, self.values)
    }
}

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Generated key reported by drivers without a returning clause.
    pub last_insert_id: Option<i64>,
}

/// What to run: raw SQL text or a prepared handle.
#[derive(Debug)]
pub enum Query<'a, S> {
    Text(&'a str),
    Prepared(&'a S),
}

impl<S> Clone for Query<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for Query<'_, S> {}

/// A stream of database rows.
///
/// Type-erased so every driver returns the same streaming type.
#[must_use]
pub struct RowStream {
    inner: Pin<Box<dyn Stream<Item = OrmResult<Row>> + Send>>,
}

impl RowStream {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = OrmResult<Row>> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
        }
    }
}

impl std::fmt::Debug for RowStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowStream").finish_non_exhaustive()
    }
}

impl Stream for RowStream {
    type Item = OrmResult<Row>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

/// Source of connections, usually a pool.
pub trait Driver: Send + Sync + 'static {
    type Conn: Connection;

    fn acquire(&self) -> impl Future<Output = OrmResult<Self::Conn>> + Send;
}

/// One database session.
///
/// Prepared handles are per-connection and must not be used elsewhere.
pub trait Connection: Send + 'static {
    type Statement: Clone + Send + Sync + 'static;

    fn prepare(&mut self, sql: &str) -> impl Future<Output = OrmResult<Self::Statement>> + Send;

    /// Release a prepared handle. Dropping the handle is enough by default.
    fn close(&mut self, stmt: Self::Statement) -> impl Future<Output = OrmResult<()>> + Send {
        drop(stmt);
        async { Ok(()) }
    }

    fn query(
        &mut self,
        query: Query<'_, Self::Statement>,
        args: &[Value],
    ) -> impl Future<Output = OrmResult<Vec<Row>>> + Send;

    fn execute(
        &mut self,
        query: Query<'_, Self::Statement>,
        args: &[Value],
    ) -> impl Future<Output = OrmResult<ExecResult>> + Send;

    fn query_stream(
        &mut self,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = OrmResult<RowStream>> + Send;

    /// Run one or more statements without arguments (`BEGIN`, `COMMIT`, ...).
    fn batch_execute(&mut self, sql: &str) -> impl Future<Output = OrmResult<()>> + Send;

    /// Whether `err` means a cached prepared handle is no longer valid.
    fn is_stale_statement(&self, err: &OrmError) -> bool {
        let _ = err;
        false
    }

    /// Whether the session is gone and the connection cannot be reused.
    fn is_closed(&self) -> bool {
        false
    }

    /// Drop the session without returning it for reuse. Called when a
    /// transaction is abandoned, so the server rolls it back.
    fn discard(self)
    where
        Self: Sized,
    {
        drop(self);
    }
}
