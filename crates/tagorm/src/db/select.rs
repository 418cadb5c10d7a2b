use super::Db;
use super::record::hydrate_positional;
use crate::condition::Condition;
use crate::dialect::Dialect;
use crate::driver::Driver;
use crate::error::OrmResult;
use crate::mapping::{ColumnMapping, StructMapping};
use crate::statement::{JoinKind, Select, Statement};
use crate::target::Target;

/// A SELECT into a target, built from the target's mapping.
///
/// Columns come from the mapping in declaration order; nested columns read
/// through a relation are qualified by it. Once a join is added, the
/// record's own columns are qualified by its table. A single-record target
/// reads at most one row and fails with `NotFound` when none match.
#[must_use = "call .fetch().await to run the query"]
pub struct RecordSelect<'a, D: Driver, T: Target> {
    db: &'a mut Db<D>,
    target: &'a mut T,
    query: Select,
}

impl<D: Driver> Db<D> {
    /// Start a SELECT that hydrates `target`.
    pub fn select<'a, T: Target>(&'a mut self, target: &'a mut T) -> RecordSelect<'a, D, T> {
        RecordSelect {
            db: self,
            target,
            query: Select::new(),
        }
    }
}

impl<'a, D: Driver, T: Target> RecordSelect<'a, D, T> {
    pub fn filter(mut self, cond: Condition) -> Self {
        self.query = self.query.filter(cond);
        self
    }

    pub fn join(
        mut self,
        kind: JoinKind,
        table: &str,
        alias: Option<&str>,
        on: Option<Condition>,
    ) -> Self {
        self.query = self.query.join(kind, table, alias, on);
        self
    }

    pub fn inner_join(mut self, table: &str, alias: &str, on: Condition) -> Self {
        self.query = self.query.inner_join(table, alias, on);
        self
    }

    pub fn left_join(mut self, table: &str, alias: &str, on: Condition) -> Self {
        self.query = self.query.left_join(table, alias, on);
        self
    }

    pub fn order_by(mut self, item: impl Into<String>) -> Self {
        self.query = self.query.order_by(item);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.query = self.query.limit(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.query = self.query.offset(offset);
        self
    }

    /// Trailing fragment such as `FOR UPDATE`.
    pub fn suffix(mut self, suffix: Condition) -> Self {
        self.query = self.query.suffix(suffix);
        self
    }

    /// Render the final query without running it.
    pub fn to_sql(&self) -> OrmResult<(String, Vec<crate::value::Value>)> {
        let (mapping, table) = self.db.mapping_of::<T::Record>()?;
        let query = self.assemble(&mapping, &table);
        query.render(self.db.dialect())
    }

    fn assemble(&self, mapping: &StructMapping<T::Record>, table: &str) -> Select {
        let dialect = self.db.dialect();
        let qualify = self.query.has_joins();
        let column_sql =
            |col: &ColumnMapping<T::Record>| select_column(dialect, table, qualify, col);

        let columns: Vec<String> = mapping.columns().iter().map(column_sql).collect();
        let mut query = self.query.clone().columns(&columns).from(table);

        if self.target.shape().is_single() {
            query = query.limit(1);
            if dialect.requires_order_for_limit() && !query.has_order_by() {
                for key in mapping.keys() {
                    query = query.order_by(select_column(dialect, table, qualify, key));
                }
            }
        }
        query
    }

    /// Run the query and hydrate the target. Returns the number of rows read.
    pub async fn fetch(self) -> OrmResult<usize> {
        let (mapping, table) = self.db.mapping_of::<T::Record>()?;
        let query = self.assemble(&mapping, &table);
        let (sql, args) = query.render(self.db.dialect())?;
        let rows = self.db.query_sql(&sql, &args).await?;
        hydrate_positional(self.target, &mapping, rows)
    }
}

fn select_column<R>(
    dialect: &dyn Dialect,
    table: &str,
    qualify: bool,
    col: &ColumnMapping<R>,
) -> String {
    match &col.relation {
        Some(relation) => format!(
            "{}.{}",
            dialect.quote(relation),
            dialect.quote(&col.relation_column)
        ),
        None if qualify => format!(
            "{}.{}",
            dialect.quote_qualified(table),
            dialect.quote(&col.column)
        ),
        None => dialect.quote(&col.column),
    }
}

