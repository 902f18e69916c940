//! SchemaManager - Provides methods for schema operations in migrations

use crate::executor::{DbError, SqlExecutor};
use crate::raw_sql::execute_unprepared;
use sea_query::{IndexCreateStatement, PostgresQueryBuilder, TableCreateStatement};

/// SchemaManager provides methods for performing schema operations in migrations
///
/// Wraps the executor the migrator opened its transaction on, so every statement a
/// migration issues is part of that transaction.
pub struct SchemaManager<'a> {
    executor: &'a dyn SqlExecutor,
}

impl<'a> SchemaManager<'a> {
    pub fn new(executor: &'a dyn SqlExecutor) -> Self {
        Self { executor }
    }

    /// Run raw DDL, for constructs sea-query cannot express (CHECK constraints,
    /// partial indexes).
    pub fn execute(&self, sql: &str) -> Result<(), DbError> {
        execute_unprepared(self.executor, sql).map(|_| ())
    }

    /// Create a table
    ///
    /// # Example
    /// ```rust,no_run
    /// # use stockguard::migration::SchemaManager;
    /// # fn run(manager: &SchemaManager<'_>) -> Result<(), stockguard::DbError> {
    /// use sea_query::{ColumnDef, Table};
    ///
    /// let table = Table::create()
    ///     .table("camera")
    ///     .if_not_exists()
    ///     .col(ColumnDef::new("camera_id").big_integer().not_null().primary_key())
    ///     .to_owned();
    /// manager.create_table(table)
    /// # }
    /// ```
    pub fn create_table(&self, table: TableCreateStatement) -> Result<(), DbError> {
        let sql = table.build(PostgresQueryBuilder);
        self.execute(&sql)
    }

    /// Create an index
    pub fn create_index(&self, index: IndexCreateStatement) -> Result<(), DbError> {
        let sql = index.build(PostgresQueryBuilder);
        self.execute(&sql)
    }

    /// True when `table` exists in the current schema.
    pub fn has_table(&self, table: &str) -> Result<bool, DbError> {
        crate::raw_sql::query_value(
            self.executor,
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_name = $1)",
            &[&table],
        )
    }
}
