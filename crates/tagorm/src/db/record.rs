//! Record-level writes and row hydration.

use std::sync::Arc;

use super::Db;
use crate::condition::Condition;
use crate::driver::{Driver, Row};
use crate::error::{OrmError, OrmResult};
use crate::mapping::{ColumnMapping, Record, StructMapping};
use crate::statement::{self, Statement};
use crate::target::{RecordDescriptor, Target, table_name_of};
use crate::value::Value;

impl<D: Driver> Db<D> {
    pub(crate) fn mapping_of<R: Record>(&self) -> OrmResult<(Arc<StructMapping<R>>, String)> {
        let mapping = self.mappings.get::<R>()?;
        Ok((mapping, table_name_of::<R>(&self.config.table_naming)))
    }

    fn column_eq<R>(&self, col: &ColumnMapping<R>, value: Value) -> Condition {
        Condition::eq(&self.dialect.quote(&col.column), value)
    }

    /// Insert every record of the target and write generated keys back.
    ///
    /// With a returning clause all records go in one statement. Otherwise
    /// records are inserted one at a time and the driver's generated id is
    /// assigned to the auto key. An empty target is a no-op.
    pub async fn insert<T: Target>(&mut self, target: &mut T) -> OrmResult<u64> {
        let mut desc = RecordDescriptor::new(target, &self.mappings, &self.config.table_naming)?;
        let mapping = Arc::clone(desc.mapping());
        let table = desc.table_name().to_string();
        if desc.is_empty() {
            return Ok(0);
        }
        let columns = mapping.non_auto_columns();
        let autos = mapping.auto_columns();

        if !autos.is_empty() && !self.dialect.supports_returning() {
            let key = mapping.auto_key()?;
            let mut total = 0;
            for i in 0..desc.len() {
                let Some(record) = desc.element(i) else {
                    break;
                };
                let stmt = statement::insert(&table)
                    .columns(&columns)
                    .values(mapping.non_auto_values(record));
                let result = self.execute(&stmt).await?;
                let id = result.last_insert_id.ok_or_else(|| {
                    OrmError::Driver(format!(
                        "no generated key reported for {}",
                        mapping.type_name()
                    ))
                })?;
                if let Some(record) = desc.element_at(i) {
                    key.assign(record, Value::I64(id))?;
                }
                total += result.rows_affected;
            }
            return Ok(total);
        }

        let mut stmt = statement::insert(&table).columns(&columns);
        for i in 0..desc.len() {
            if let Some(record) = desc.element(i) {
                stmt = stmt.values(mapping.non_auto_values(record));
            }
        }
        if autos.is_empty() {
            return Ok(self.execute(&stmt).await?.rows_affected);
        }

        let rows = self.fetch_all(&stmt.returning(&autos)).await?;
        if rows.len() != desc.len() {
            return Err(OrmError::Other(format!(
                "insert returned {} rows for {} records",
                rows.len(),
                desc.len()
            )));
        }
        let inserted = rows.len() as u64;
        for (i, row) in rows.into_iter().enumerate() {
            let (names, values) = row.into_parts();
            if let Some(record) = desc.element_at(i) {
                mapping.set_named(record, &names, values)?;
            }
        }
        Ok(inserted)
    }

    /// Update every record of the target by key.
    ///
    /// Records with an optimistic lock column are matched on the current
    /// lock value and write the advanced one; zero affected rows then fails
    /// with [`OrmError::OptimisticLock`]. The in-memory lock advances only
    /// after a successful write.
    pub async fn update<T: Target>(&mut self, target: &mut T) -> OrmResult<u64> {
        let mut desc = RecordDescriptor::new(target, &self.mappings, &self.config.table_naming)?;
        let mapping = Arc::clone(desc.mapping());
        let table = desc.table_name().to_string();
        if mapping.keys().next().is_none() {
            return Err(OrmError::build(format!(
                "{} has no key columns to update by",
                mapping.type_name()
            )));
        }

        let mut total = 0;
        for i in 0..desc.len() {
            let Some(record) = desc.element(i) else {
                break;
            };
            let mut stmt = statement::update(&table);
            for col in mapping.updatable() {
                stmt = stmt.set(&col.column, col.value(record));
            }
            let lock = mapping.oplock_values(record)?;
            if let (Some(col), Some((current, next))) = (mapping.oplock(), &lock) {
                stmt = stmt
                    .set(&col.column, next.clone())
                    .filter(self.column_eq(col, current.clone()));
            }
            for key in mapping.keys() {
                stmt = stmt.filter(self.column_eq(key, key.value(record)));
            }

            let affected = self.execute(&stmt).await?.rows_affected;
            if lock.is_some() {
                if affected == 0 {
                    return Err(OrmError::optimistic_lock(format!(
                        "{} was changed or removed since it was read",
                        mapping.type_name()
                    )));
                }
                if let Some(record) = desc.element_at(i) {
                    mapping.advance_oplock(record)?;
                }
            }
            total += affected;
        }
        Ok(total)
    }

    /// Delete every record of the target by key, honoring the optimistic lock.
    pub async fn delete<T: Target>(&mut self, target: &mut T) -> OrmResult<u64> {
        let desc = RecordDescriptor::new(target, &self.mappings, &self.config.table_naming)?;
        let mapping = Arc::clone(desc.mapping());
        let table = desc.table_name().to_string();
        if mapping.keys().next().is_none() {
            return Err(OrmError::build(format!(
                "{} has no key columns to delete by",
                mapping.type_name()
            )));
        }

        let mut total = 0;
        for i in 0..desc.len() {
            let Some(record) = desc.element(i) else {
                break;
            };
            let mut stmt = statement::delete(&table);
            for key in mapping.keys() {
                stmt = stmt.filter(self.column_eq(key, key.value(record)));
            }
            let lock = mapping.oplock_values(record)?;
            if let (Some(col), Some((current, _))) = (mapping.oplock(), &lock) {
                stmt = stmt.filter(self.column_eq(col, current.clone()));
            }

            let affected = self.execute(&stmt).await?.rows_affected;
            if lock.is_some() && affected == 0 {
                return Err(OrmError::optimistic_lock(format!(
                    "{} was changed or removed since it was read",
                    mapping.type_name()
                )));
            }
            total += affected;
        }
        Ok(total)
    }

    /// Insert each record of a slice. Shorthand for [`insert`](Self::insert).
    pub async fn insert_all<R: Record>(&mut self, records: &mut Vec<R>) -> OrmResult<u64> {
        self.insert(records).await
    }

    /// Count rows of `R`'s table, optionally filtered.
    pub async fn count<R: Record>(&mut self, filter: Option<Condition>) -> OrmResult<u64> {
        let (_, table) = self.mapping_of::<R>()?;
        let mut query = statement::select().column("*").from(&table);
        if let Some(filter) = filter {
            query = query.filter(filter);
        }
        let (sql, args) = query.to_count_sql(&*self.dialect)?;
        let rows = self.query_sql(&sql, &args).await?;
        let count = rows
            .first()
            .and_then(|row| row.values().first())
            .and_then(Value::as_i64)
            .ok_or_else(|| OrmError::decode("count", "count query returned no integer"))?;
        u64::try_from(count).map_err(|e| OrmError::decode("count", e.to_string()))
    }

    /// Run a raw query and hydrate the target by column name.
    ///
    /// Returns the number of rows hydrated. A single-record target with no
    /// rows yields [`OrmError::NotFound`].
    pub async fn raw_select<T: Target>(
        &mut self,
        target: &mut T,
        query: Condition,
    ) -> OrmResult<usize> {
        let (mapping, _) = self.mapping_of::<T::Record>()?;
        let rows = self.raw_query(query).await?;
        hydrate_named(target, &mapping, rows)
    }

    /// Run a statement with a returning clause and hydrate the target from
    /// the returned rows.
    pub async fn fetch_returning<T, S>(&mut self, stmt: &S, target: &mut T) -> OrmResult<usize>
    where
        T: Target,
        S: Statement + Sync,
    {
        let (mapping, _) = self.mapping_of::<T::Record>()?;
        let rows = self.fetch_all(stmt).await?;
        hydrate_named(target, &mapping, rows)
    }
}

fn single_row<R>(
    single: bool,
    mapping: &StructMapping<R>,
    mut rows: Vec<Row>,
) -> OrmResult<Vec<Row>> {
    if single {
        if rows.is_empty() {
            return Err(OrmError::not_found(format!(
                "no {} row matched",
                mapping.type_name()
            )));
        }
        rows.truncate(1);
    }
    Ok(rows)
}

/// Assign rows positionally, in mapping column order.
pub(crate) fn hydrate_positional<T: Target>(
    target: &mut T,
    mapping: &StructMapping<T::Record>,
    rows: Vec<Row>,
) -> OrmResult<usize> {
    let rows = single_row(target.shape().is_single(), mapping, rows)?;
    let count = rows.len();
    for row in rows {
        target.grow_by(|record| mapping.set_all(record, row.into_values()))?;
    }
    Ok(count)
}

/// Assign rows by column name.
pub(crate) fn hydrate_named<T: Target>(
    target: &mut T,
    mapping: &StructMapping<T::Record>,
    rows: Vec<Row>,
) -> OrmResult<usize> {
    let rows = single_row(target.shape().is_single(), mapping, rows)?;
    let count = rows.len();
    for row in rows {
        let (names, values) = row.into_parts();
        target.grow_by(|record| mapping.set_named(record, &names, values))?;
    }
    Ok(count)
}
