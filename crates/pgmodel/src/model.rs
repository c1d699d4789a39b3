//! Per-table entity gateway.
//!
//! A [`Model`] is instantiated once per table from an explicit
//! [`ModelConfig`] and an injected [`DatabaseClient`]; there is no global
//! client state. It owns timestamp defaulting, conflict-target composition
//! for upserts, and primary-key propagation back onto the caller's row.

use crate::client::DatabaseClient;
use crate::error::{ModelError, ModelResult};
use crate::record::Record;
use crate::row::{Changes, Conditions, OrderBy, Row};
use chrono::{SecondsFormat, Utc};
use serde_json::Value;

/// Per-table configuration: table name, primary-key column, and whether
/// `created_at`/`updated_at` are auto-populated.
///
/// Deserializable so table descriptors can live in application config.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ModelConfig {
    pub table: String,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    #[serde(default = "default_timestamps")]
    pub timestamps: bool,
}

fn default_primary_key() -> String {
    "id".to_string()
}

fn default_timestamps() -> bool {
    true
}

impl ModelConfig {
    /// Configuration for `table` with primary key `id` and timestamps on.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            primary_key: "id".to_string(),
            timestamps: true,
        }
    }

    /// Override the primary-key column.
    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    /// Disable `created_at`/`updated_at` auto-population.
    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }
}

/// Conflict specification for upserts.
///
/// An empty target means "do nothing" on conflict; a non-empty target with
/// changes means "do update". A `Conflict` is read-only input: the effective
/// changes map an upsert executes with is always newly built, never written
/// back into a caller-supplied `Conflict`.
#[derive(Clone, Debug, Default)]
pub struct Conflict {
    /// Ordered column names forming the conflict target.
    pub target: Vec<String>,
    /// Update-on-conflict changes; `None` lets the upsert default them.
    pub changes: Option<Changes>,
}

impl Conflict {
    /// A conflict spec over the given target columns.
    pub fn target<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            target: columns.into_iter().map(Into::into).collect(),
            changes: None,
        }
    }

    /// An empty-target spec: do nothing on any conflict.
    pub fn do_nothing() -> Self {
        Self::default()
    }

    /// Attach explicit update-on-conflict changes.
    pub fn with_changes(mut self, changes: Changes) -> Self {
        self.changes = Some(changes);
        self
    }
}

/// Argument accepted by [`Model::find_one`]: either a bare primary-key
/// value or a full conditions mapping.
#[derive(Clone, Debug)]
pub enum Lookup {
    /// A primary-key value, wrapped as `{primary_key: value}`.
    Key(Value),
    /// An explicit conditions mapping, used as-is.
    Where(Conditions),
}

impl From<Conditions> for Lookup {
    fn from(conditions: Conditions) -> Self {
        Lookup::Where(conditions)
    }
}

impl From<Value> for Lookup {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Lookup::Where(map),
            other => Lookup::Key(other),
        }
    }
}

impl From<i64> for Lookup {
    fn from(value: i64) -> Self {
        Lookup::Key(Value::from(value))
    }
}

impl From<&str> for Lookup {
    fn from(value: &str) -> Self {
        Lookup::Key(Value::String(value.to_string()))
    }
}

impl From<String> for Lookup {
    fn from(value: String) -> Self {
        Lookup::Key(Value::String(value))
    }
}

/// The per-table CRUD façade.
pub struct Model<C: DatabaseClient> {
    config: ModelConfig,
    client: C,
}

impl<C: DatabaseClient> Model<C> {
    /// Create a gateway from an explicit configuration and client.
    pub fn new(config: ModelConfig, client: C) -> Self {
        Self { config, client }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Wrap attributes in a [`Record`] bound to this model.
    pub fn record(&self, attributes: Row) -> Record<'_, C> {
        Record::new(self, attributes)
    }

    /// Fetch all rows matching `conditions`; an empty vec when none match.
    pub async fn find(
        &self,
        conditions: Option<&Conditions>,
        order_by: Option<&OrderBy>,
        extra: Option<&str>,
    ) -> ModelResult<Vec<Row>> {
        self.client
            .select(&self.config.table, conditions, order_by, extra)
            .await
    }

    /// Fetch a single row by primary-key value or conditions mapping.
    ///
    /// Appends an implicit `LIMIT 1`; absence is `None`, never an error.
    pub async fn find_one(
        &self,
        lookup: impl Into<Lookup>,
        order_by: Option<&OrderBy>,
    ) -> ModelResult<Option<Row>> {
        let conditions = match lookup.into() {
            Lookup::Key(value) => {
                let mut conditions = Conditions::new();
                conditions.insert(self.config.primary_key.clone(), value);
                conditions
            }
            Lookup::Where(conditions) => conditions,
        };
        self.client
            .select_one(&self.config.table, Some(&conditions), order_by)
            .await
    }

    /// Count rows matching `conditions`; 0 when the aggregate row is absent.
    pub async fn count(&self, conditions: &Conditions, extra: Option<&str>) -> ModelResult<i64> {
        let rows = self
            .client
            .count(&self.config.table, conditions, extra)
            .await?;
        Ok(rows
            .first()
            .and_then(|row| row.get("count"))
            .and_then(count_value)
            .unwrap_or(0))
    }

    /// Insert `row`, returning every column of the stored row.
    pub async fn insert(&self, row: &mut Row) -> ModelResult<()> {
        self.insert_returning(row, "*").await
    }

    /// Insert `row` with an explicit RETURNING column.
    ///
    /// When timestamps are enabled, `created_at`/`updated_at` default to the
    /// same call-time instant unless the caller supplied them. On success
    /// the caller's row is decorated in place with the primary-key value
    /// from the first returned row; no returned row is a benign no-op.
    pub async fn insert_returning(&self, row: &mut Row, returning: &str) -> ModelResult<()> {
        self.apply_insert_timestamps(row);
        let returned = self
            .client
            .insert(&self.config.table, row, returning, None)
            .await?;
        self.propagate_primary_key(row, &returned);
        Ok(())
    }

    /// Alias for [`Model::insert`].
    pub async fn create(&self, row: &mut Row) -> ModelResult<()> {
        self.insert(row).await
    }

    /// Insert with an ON CONFLICT clause.
    ///
    /// The default conflict target is the primary key. When `conflict`
    /// carries no changes, the full row (after timestamp enrichment) becomes
    /// the update-on-conflict changes; `updated_at` defaults into the changes
    /// map independently of the inserted row, so a conflicting upsert
    /// always refreshes it.
    pub async fn upsert(&self, row: &mut Row, conflict: Option<Conflict>) -> ModelResult<()> {
        self.apply_insert_timestamps(row);
        let conflict = conflict.unwrap_or_else(|| Conflict::target([self.config.primary_key.clone()]));
        let mut changes = match conflict.changes {
            Some(changes) => changes,
            None => row.clone(),
        };
        if self.config.timestamps && !changes.contains_key("updated_at") {
            changes.insert("updated_at".to_string(), Value::String(now()));
        }
        let effective = Conflict {
            target: conflict.target,
            changes: Some(changes),
        };
        let returned = self
            .client
            .insert(
                &self.config.table,
                row,
                &self.config.primary_key,
                Some(&effective),
            )
            .await?;
        self.propagate_primary_key(row, &returned);
        Ok(())
    }

    /// Update rows matching `conditions` with `changes`.
    ///
    /// When timestamps are enabled and `changes` lacks `updated_at`, it is
    /// set to "now" on an internal copy; the caller's mapping is untouched.
    pub async fn update(&self, changes: &Changes, conditions: &Conditions) -> ModelResult<u64> {
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
        let mut changes = changes.clone();
        if self.config.timestamps && !changes.contains_key("updated_at") {
            changes.insert("updated_at".to_string(), Value::String(now()));
        }
        self.client
            .update(&self.config.table, &changes, conditions)
            .await
    }

    /// Delete rows matching `conditions`; empty conditions fail before I/O.
    pub async fn delete(&self, conditions: &Conditions) -> ModelResult<u64> {
        self.client.delete(&self.config.table, conditions).await
    }

    fn apply_insert_timestamps(&self, row: &mut Row) {
        if !self.config.timestamps {
            return;
        }
        let now = now();
        if !row.contains_key("created_at") {
            row.insert("created_at".to_string(), Value::String(now.clone()));
        }
        if !row.contains_key("updated_at") {
            row.insert("updated_at".to_string(), Value::String(now));
        }
    }

    fn propagate_primary_key(&self, row: &mut Row, returned: &[Row]) {
        if let Some(value) = returned.first().and_then(|r| r.get(&self.config.primary_key)) {
            row.insert(self.config.primary_key.clone(), value.clone());
        }
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn count_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
