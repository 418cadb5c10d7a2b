//! PostgreSQL driver over a `deadpool-postgres` pool.

use std::error::Error;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::BytesMut;
use deadpool_postgres::{Object, Pool};
use futures_core::Stream;
use tokio_postgres::types::{IsNull, ToSql, Type};

use super::{Connection, Driver, ExecResult, Query, Row, RowStream};
use crate::error::{OrmError, OrmResult};
use crate::value::Value;

/// Pool-backed PostgreSQL driver.
#[derive(Clone)]
pub struct PgDriver {
    pool: Pool,
}

impl std::fmt::Debug for PgDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgDriver")
            .field("status", &self.pool.status())
            .finish()
    }
}

impl PgDriver {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

impl Driver for PgDriver {
    type Conn = PgConnection;

    async fn acquire(&self) -> OrmResult<PgConnection> {
        let client = self.pool.get().await?;
        Ok(PgConnection { client })
    }
}

/// A pooled PostgreSQL connection. Returned to the pool on drop.
pub struct PgConnection {
    client: Object,
}

fn params(args: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    args.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

impl Connection for PgConnection {
    type Statement = tokio_postgres::Statement;

    async fn prepare(&mut self, sql: &str) -> OrmResult<Self::Statement> {
        self.client.prepare(sql).await.map_err(OrmError::from)
    }

    async fn query(
        &mut self,
        query: Query<'_, Self::Statement>,
        args: &[Value],
    ) -> OrmResult<Vec<Row>> {
        let params = params(args);
        let rows = match query {
            Query::Text(sql) => self.client.query(sql, &params).await?,
            Query::Prepared(stmt) => self.client.query(stmt, &params).await?,
        };
        let Some(first) = rows.first() else {
            return Ok(Vec::new());
        };
        let columns = column_names(first);
        rows.iter().map(|row| decode_row(row, &columns)).collect()
    }

    async fn execute(
        &mut self,
        query: Query<'_, Self::Statement>,
        args: &[Value],
    ) -> OrmResult<ExecResult> {
        let params = params(args);
        let rows_affected = match query {
            Query::Text(sql) => self.client.execute(sql, &params).await?,
            Query::Prepared(stmt) => self.client.execute(stmt, &params).await?,
        };
        Ok(ExecResult {
            rows_affected,
            last_insert_id: None,
        })
    }

    async fn query_stream(&mut self, sql: &str, args: &[Value]) -> OrmResult<RowStream> {
        let params = params(args);
        let stream = self.client.query_raw(sql, params.iter().copied()).await?;
        Ok(RowStream::new(DecodeRowStream::new(stream)))
    }

    async fn batch_execute(&mut self, sql: &str) -> OrmResult<()> {
        self.client.batch_execute(sql).await.map_err(OrmError::from)
    }

    fn is_stale_statement(&self, err: &OrmError) -> bool {
        is_retryable_prepared_error(err)
    }

    fn is_closed(&self) -> bool {
        self.client.is_closed()
    }

    fn discard(self) {
        // Detach from the pool; dropping the client closes the session.
        drop(Object::take(self.client));
    }
}

/// SQLSTATE 26000, or 0A000 "cached plan must not change result type".
pub(crate) fn is_retryable_prepared_error(err: &OrmError) -> bool {
    let OrmError::Query(e) = err else {
        return false;
    };
    let Some(db_err) = e.as_db_error() else {
        return false;
    };

    match db_err.code().code() {
        "0A000" => db_err
            .message()
            .to_ascii_lowercase()
            .contains("cached plan must not change result type"),
        "26000" => true,
        _ => false,
    }
}

fn column_names(row: &tokio_postgres::Row) -> Arc<[String]> {
    row.columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect()
}

fn decode_row(row: &tokio_postgres::Row, columns: &Arc<[String]>) -> OrmResult<Row> {
    let values = row
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| decode_cell(row, idx, col.name(), col.type_()))
        .collect::<OrmResult<Vec<_>>>()?;
    Ok(Row::new(Arc::clone(columns), values))
}

fn decode_cell(row: &tokio_postgres::Row, idx: usize, name: &str, ty: &Type) -> OrmResult<Value> {
    fn get<'a, T>(row: &'a tokio_postgres::Row, idx: usize, name: &str) -> OrmResult<Option<T>>
    where
        T: tokio_postgres::types::FromSql<'a>,
    {
        row.try_get::<_, Option<T>>(idx)
            .map_err(|e| OrmError::decode(name, e.to_string()))
    }

    let value = match *ty {
        Type::BOOL => get(row, idx, name)?.map(Value::Bool),
        Type::INT2 => get(row, idx, name)?.map(Value::I16),
        Type::INT4 => get(row, idx, name)?.map(Value::I32),
        Type::INT8 => get(row, idx, name)?.map(Value::I64),
        Type::FLOAT4 => get(row, idx, name)?.map(Value::F32),
        Type::FLOAT8 => get(row, idx, name)?.map(Value::F64),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
            get(row, idx, name)?.map(Value::Text)
        }
        Type::BYTEA => get(row, idx, name)?.map(Value::Bytes),
        Type::DATE => get(row, idx, name)?.map(Value::Date),
        Type::TIMESTAMP => get(row, idx, name)?.map(Value::Timestamp),
        Type::TIMESTAMPTZ => get(row, idx, name)?.map(Value::TimestampTz),
        Type::UUID => get(row, idx, name)?.map(Value::Uuid),
        Type::JSON | Type::JSONB => get(row, idx, name)?.map(Value::Json),
        _ => {
            return Err(OrmError::decode(
                name,
                format!("unsupported column type {ty}"),
            ));
        }
    };
    Ok(value.unwrap_or(Value::Null))
}

impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => v.to_sql(ty, out),
            Value::I16(v) => match *ty {
                Type::INT4 => i32::from(*v).to_sql(ty, out),
                Type::INT8 => i64::from(*v).to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::I32(v) => match *ty {
                Type::INT2 => i16::try_from(*v)?.to_sql(ty, out),
                Type::INT8 => i64::from(*v).to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::I64(v) => match *ty {
                Type::INT2 => i16::try_from(*v)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*v)?.to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::F32(v) => match *ty {
                Type::FLOAT8 => f64::from(*v).to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::F64(v) => match *ty {
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::Text(v) => v.to_sql(ty, out),
            Value::Bytes(v) => v.to_sql(ty, out),
            Value::Date(v) => v.to_sql(ty, out),
            Value::Timestamp(v) => v.to_sql(ty, out),
            Value::TimestampTz(v) => v.to_sql(ty, out),
            Value::Uuid(v) => v.to_sql(ty, out),
            Value::Json(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

/// Decodes `tokio_postgres` rows into [`Row`]s, sharing one column list.
struct DecodeRowStream<S> {
    inner: Pin<Box<S>>,
    columns: Option<Arc<[String]>>,
}

impl<S> DecodeRowStream<S> {
    fn new(stream: S) -> Self {
        Self {
            inner: Box::pin(stream),
            columns: None,
        }
    }
}

impl<S> Stream for DecodeRowStream<S>
where
    S: Stream<Item = Result<tokio_postgres::Row, tokio_postgres::Error>> + Send + 'static,
{
    type Item = OrmResult<Row>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(row))) => {
                let columns = Arc::clone(self.columns.get_or_insert_with(|| column_names(&row)));
                Poll::Ready(Some(decode_row(&row, &columns)))
            }
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(OrmError::from(e)))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_coerce_to_parameter_type() {
        let mut buf = BytesMut::new();
        Value::I64(7)
            .to_sql(&Type::INT4, &mut buf)
            .expect("encode");
        assert_eq!(&buf[..], &7i32.to_be_bytes()[..]);

        let mut buf = BytesMut::new();
        assert!(Value::I64(i64::MAX).to_sql(&Type::INT2, &mut buf).is_err());
    }

    #[test]
    fn null_encodes_as_null() {
        let mut buf = BytesMut::new();
        assert!(matches!(
            Value::Null.to_sql(&Type::TEXT, &mut buf),
            Ok(IsNull::Yes)
        ));
    }
}
