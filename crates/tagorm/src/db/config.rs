use crate::naming::TableNaming;
use crate::stmt_cache::DEFAULT_CAPACITY;

/// Configuration for [`Db`](super::Db).
///
/// ```
/// use tagorm::{DbConfig, TableNaming};
///
/// let config = DbConfig::new()
///     .statement_cache(128)
///     .conn_statement_cache(true)
///     .table_naming(TableNaming::SnakeCasePlural)
///     .max_logged_sql(500);
/// assert_eq!(config.cache_capacity, 128);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Capacity of each prepared-statement cache.
    pub cache_capacity: usize,
    /// Cache prepared statements inside transactions.
    pub tx_cache_enabled: bool,
    /// Cache prepared statements outside transactions. The handle then keeps
    /// one dedicated connection for non-transactional work.
    pub conn_cache_enabled: bool,
    /// Table naming for records without a declared table. The bare type
    /// name by default.
    pub table_naming: TableNaming,
    /// Truncate logged SQL to this many bytes. `None` disables truncation.
    pub max_logged_sql: Option<usize>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CAPACITY,
            tx_cache_enabled: true,
            conn_cache_enabled: false,
            table_naming: TableNaming::Identity,
            max_logged_sql: Some(200),
        }
    }
}

impl DbConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the prepared-statement cache capacity.
    pub fn statement_cache(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Disable both prepared-statement caches.
    pub fn no_statement_cache(mut self) -> Self {
        self.tx_cache_enabled = false;
        self.conn_cache_enabled = false;
        self
    }

    pub fn tx_statement_cache(mut self, enabled: bool) -> Self {
        self.tx_cache_enabled = enabled;
        self
    }

    pub fn conn_statement_cache(mut self, enabled: bool) -> Self {
        self.conn_cache_enabled = enabled;
        self
    }

    pub fn table_naming(mut self, naming: TableNaming) -> Self {
        self.table_naming = naming;
        self
    }

    pub fn max_logged_sql(mut self, len: usize) -> Self {
        self.max_logged_sql = Some(len);
        self
    }

    /// Log SQL without truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_logged_sql = None;
        self
    }
}
