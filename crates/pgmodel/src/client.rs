//! Database client contract and backend implementations.
//!
//! [`DatabaseClient`] unifies direct connections, transactions, and pooled
//! clients behind one trait, so a model can be handed any of them. The
//! low-level `query`/`execute` pair is all a backend must supply; the
//! statement-level methods (`select`, `insert`, ...) are provided on the
//! trait itself and are where the SQL text is produced and the caller
//! contracts are enforced.

use crate::error::{ModelError, ModelResult};
use crate::fragment;
use crate::model::Conflict;
use crate::row::{Changes, Conditions, OrderBy, Row, decode_row};
use crate::value::{Param, ParamList, param_refs};
use tracing::debug;

/// A trait that unifies database clients and transactions.
///
/// Statement-level methods perform their caller-contract checks (non-empty
/// row/changes/conditions) before any I/O is issued; persistence failures
/// from the driver are propagated unmodified.
pub trait DatabaseClient: Send + Sync {
    /// Execute a query and return all rows, decoded into dynamic mappings.
    fn query(
        &self,
        sql: &str,
        params: &[Param],
    ) -> impl std::future::Future<Output = ModelResult<Vec<Row>>> + Send;

    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        params: &[Param],
    ) -> impl std::future::Future<Output = ModelResult<u64>> + Send;

    /// `SELECT *` with optional WHERE / ORDER BY / trailing SQL fragment.
    fn select(
        &self,
        table: &str,
        conditions: Option<&Conditions>,
        order_by: Option<&OrderBy>,
        extra: Option<&str>,
    ) -> impl std::future::Future<Output = ModelResult<Vec<Row>>> + Send {
        async move {
            let mut sql = format!("SELECT * FROM {}", fragment::quote_ident(table));
            let mut params = ParamList::new();
            if let Some(conditions) = conditions.filter(|c| !c.is_empty()) {
                sql.push_str(" WHERE ");
                sql.push_str(&fragment::assignment_fields(conditions, 0).join(" AND "));
                params.extend_from(conditions);
            }
            if let Some(order_by) = order_by.filter(|o| !o.is_empty()) {
                sql.push_str(" ORDER BY ");
                sql.push_str(&fragment::order_clauses(order_by).join(","));
            }
            if let Some(extra) = extra {
                sql.push(' ');
                sql.push_str(extra);
            }
            debug!(target: "pgmodel.sql", param_count = params.len(), sql = %sql);
            self.query(&sql, params.as_slice()).await
        }
    }

    /// Select a single row (`LIMIT 1`); `None` when nothing matches.
    fn select_one(
        &self,
        table: &str,
        conditions: Option<&Conditions>,
        order_by: Option<&OrderBy>,
    ) -> impl std::future::Future<Output = ModelResult<Option<Row>>> + Send {
        async move {
            let rows = self.select(table, conditions, order_by, Some("LIMIT 1")).await?;
            Ok(rows.into_iter().next())
        }
    }

    /// `SELECT COUNT(*)` with optional WHERE / trailing SQL fragment.
    ///
    /// Returns the raw result rows; the aggregate is aliased `count`.
    fn count(
        &self,
        table: &str,
        conditions: &Conditions,
        extra: Option<&str>,
    ) -> impl std::future::Future<Output = ModelResult<Vec<Row>>> + Send {
        async move {
            let mut sql = format!(
                "SELECT COUNT(*) AS count FROM {}",
                fragment::quote_ident(table)
            );
            let mut params = ParamList::new();
            if !conditions.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&fragment::assignment_fields(conditions, 0).join(" AND "));
                params.extend_from(conditions);
            }
            if let Some(extra) = extra {
                sql.push(' ');
                sql.push_str(extra);
            }
            debug!(target: "pgmodel.sql", param_count = params.len(), sql = %sql);
            self.query(&sql, params.as_slice()).await
        }
    }

    /// INSERT with optional ON CONFLICT clause, returning the RETURNING rows.
    ///
    /// Conflict change values are appended after the insert values, so their
    /// assignment placeholders are offset by the insert value count.
    fn insert(
        &self,
        table: &str,
        row: &Row,
        returning: &str,
        conflict: Option<&Conflict>,
    ) -> impl std::future::Future<Output = ModelResult<Vec<Row>>> + Send {
        async move {
            if row.is_empty() {
                return Err(ModelError::contract("insert requires a non-empty row"));
            }
            let mut params = ParamList::new();
            params.extend_from(row);
            let mut sql = format!(
                "INSERT INTO {}({}) VALUES({})",
                table,
                fragment::column_fields(row).join(","),
                fragment::value_placeholders(row, 0).join(","),
            );
            if let Some(conflict) = conflict {
                sql.push(' ');
                sql.push_str(&fragment::conflict_clause(conflict, params.len()));
                if !conflict.target.is_empty() {
                    if let Some(changes) = conflict.changes.as_ref().filter(|c| !c.is_empty()) {
                        params.extend_from(changes);
                    }
                }
            }
            sql.push_str(" RETURNING ");
            sql.push_str(returning);
            debug!(target: "pgmodel.sql", param_count = params.len(), sql = %sql);
            self.query(&sql, params.as_slice()).await
        }
    }

    /// UPDATE with SET from `changes` and WHERE from `conditions`.
    ///
    /// Value arrays are concatenated `changes ++ conditions`; the WHERE
    /// placeholders start at `changes.len()` so indices do not collide.
    fn update(
        &self,
        table: &str,
        changes: &Changes,
        conditions: &Conditions,
    ) -> impl std::future::Future<Output = ModelResult<u64>> + Send {
        async move {
            if changes.is_empty() {
                return Err(ModelError::contract(
                    "update requires a non-empty changes mapping",
                ));
            }
            if conditions.is_empty() {
                return Err(ModelError::contract(
                    "update requires a non-empty conditions mapping",
                ));
            }
            let mut params = ParamList::new();
            params.extend_from(changes);
            params.extend_from(conditions);
            let sql = format!(
                "UPDATE {} SET {} WHERE {}",
                table,
                fragment::assignment_fields(changes, 0).join(","),
                fragment::assignment_fields(conditions, changes.len()).join(" AND "),
            );
            debug!(target: "pgmodel.sql", param_count = params.len(), sql = %sql);
            self.execute(&sql, params.as_slice()).await
        }
    }

    /// DELETE with WHERE from `conditions`.
    ///
    /// Empty conditions are a programmer error; the statement is never
    /// allowed to degrade into an unconditional delete.
    fn delete(
        &self,
        table: &str,
        conditions: &Conditions,
    ) -> impl std::future::Future<Output = ModelResult<u64>> + Send {
        async move {
            if conditions.is_empty() {
                return Err(ModelError::contract(
                    "delete requires a non-empty conditions mapping",
                ));
            }
            let mut params = ParamList::new();
            params.extend_from(conditions);
            let sql = format!(
                "DELETE FROM {} WHERE {}",
                table,
                fragment::assignment_fields(conditions, 0).join(" AND "),
            );
            debug!(target: "pgmodel.sql", param_count = params.len(), sql = %sql);
            self.execute(&sql, params.as_slice()).await
        }
    }
}

impl DatabaseClient for tokio_postgres::Client {
    async fn query(&self, sql: &str, params: &[Param]) -> ModelResult<Vec<Row>> {
        let refs = param_refs(params);
        let rows = tokio_postgres::Client::query(self, sql, &refs)
            .await
            .map_err(ModelError::from_db_error)?;
        rows.iter().map(decode_row).collect()
    }

    async fn execute(&self, sql: &str, params: &[Param]) -> ModelResult<u64> {
        let refs = param_refs(params);
        tokio_postgres::Client::execute(self, sql, &refs)
            .await
            .map_err(ModelError::from_db_error)
    }
}

impl DatabaseClient for tokio_postgres::Transaction<'_> {
    async fn query(&self, sql: &str, params: &[Param]) -> ModelResult<Vec<Row>> {
        let refs = param_refs(params);
        let rows = tokio_postgres::Transaction::query(self, sql, &refs)
            .await
            .map_err(ModelError::from_db_error)?;
        rows.iter().map(decode_row).collect()
    }

    async fn execute(&self, sql: &str, params: &[Param]) -> ModelResult<u64> {
        let refs = param_refs(params);
        tokio_postgres::Transaction::execute(self, sql, &refs)
            .await
            .map_err(ModelError::from_db_error)
    }
}

#[cfg(feature = "pool")]
impl DatabaseClient for deadpool_postgres::Client {
    async fn query(&self, sql: &str, params: &[Param]) -> ModelResult<Vec<Row>> {
        // Delegate to the deref target (ClientWrapper / tokio_postgres::Client).
        DatabaseClient::query(&***self, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[Param]) -> ModelResult<u64> {
        DatabaseClient::execute(&***self, sql, params).await
    }
}

impl<C: DatabaseClient> DatabaseClient for &C {
    async fn query(&self, sql: &str, params: &[Param]) -> ModelResult<Vec<Row>> {
        (*self).query(sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[Param]) -> ModelResult<u64> {
        (*self).execute(sql, params).await
    }
}
