use std::sync::Arc;

use futures_util::StreamExt;

use super::Db;
use crate::condition::Condition;
use crate::driver::{Connection, Driver, RowStream};
use crate::error::{OrmError, OrmResult};
use crate::mapping::{Record, StructMapping};

/// Row-at-a-time reader over a query result.
///
/// Outside a transaction the cursor owns the connection it reads from and
/// returns it when closed or dropped. Rows are assigned by column name.
pub struct Cursor<C, R> {
    stream: Option<RowStream>,
    conn: Option<C>,
    mapping: Arc<StructMapping<R>>,
}

impl<C, R> std::fmt::Debug for Cursor<C, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("type_name", &self.mapping.type_name())
            .field("open", &self.stream.is_some())
            .finish()
    }
}

impl<D: Driver> Db<D> {
    /// Open a cursor over a raw query. Statements behind a cursor are not
    /// prepared through the cache.
    pub async fn cursor<R: Record>(&mut self, query: Condition) -> OrmResult<Cursor<D::Conn, R>> {
        let (mapping, _) = self.mapping_of::<R>()?;
        let (sql, args) = query.parts()?;
        let sql = self.dialect.replace_placeholders(sql);
        let args = args.to_vec();
        tracing::debug!(
            target: "tagorm.sql",
            in_tx = self.tx.is_some(),
            param_count = args.len(),
            sql = %super::truncate_sql(&sql, self.config.max_logged_sql),
            "open cursor"
        );

        let (stream, conn) = match self.tx.as_mut() {
            Some(tx) => (tx.query_stream(&sql, &args).await, None),
            None => {
                let mut conn = self.driver.acquire().await?;
                (conn.query_stream(&sql, &args).await, Some(conn))
            }
        };
        let stream = stream.map_err(|e| self.dialect.classify_error(e))?;
        Ok(Cursor {
            stream: Some(stream),
            conn,
            mapping,
        })
    }
}

impl<C: Connection, R: Record> Cursor<C, R> {
    /// Read the next row into `record`. Returns `false` once exhausted.
    pub async fn next(&mut self, record: &mut R) -> OrmResult<bool> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(OrmError::Other("cursor is closed".to_string()));
        };
        match stream.next().await {
            Some(row) => {
                let (names, values) = row?.into_parts();
                self.mapping.set_named(record, &names, values)?;
                Ok(true)
            }
            None => {
                self.close();
                Ok(false)
            }
        }
    }

    /// Read the next row into a fresh record.
    pub async fn next_record(&mut self) -> OrmResult<Option<R>> {
        let mut record = R::default();
        Ok(self.next(&mut record).await?.then_some(record))
    }

    /// Read every remaining row.
    pub async fn collect(mut self) -> OrmResult<Vec<R>> {
        let mut records = Vec::new();
        while let Some(record) = self.next_record().await? {
            records.push(record);
        }
        Ok(records)
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Stop reading and release the connection.
    pub fn close(&mut self) {
        self.stream = None;
        self.conn = None;
    }
}
