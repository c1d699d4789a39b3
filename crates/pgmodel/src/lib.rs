//! # pgmodel
//!
//! A thin dynamic-row data-access layer for PostgreSQL.
//!
//! ## Features
//!
//! - **Dynamic rows**: a row is an ordered column → JSON-value mapping; no
//!   schema, no derive, no code generation
//! - **Fragment builder**: pure functions turn condition/change mappings
//!   into parameterized WHERE/SET/VALUES/ORDER fragments with contiguous
//!   `$1, $2, ...` numbering across concatenated value lists
//! - **Per-table models**: find / find_one / count / insert / upsert /
//!   update / delete with timestamp defaulting, ON CONFLICT composition,
//!   and primary-key propagation back onto the caller's row
//! - **Records**: "save current object" semantics plus nested-path
//!   attribute helpers for in-memory staging
//! - **Safe defaults**: DELETE and UPDATE require conditions; violations
//!   fail before any I/O
//! - **Client-agnostic**: pass a connection, a transaction, or a pooled
//!   client anywhere a [`DatabaseClient`] is expected
//!
//! ## Example
//!
//! ```ignore
//! use pgmodel::{Model, ModelConfig, row};
//!
//! let users = Model::new(ModelConfig::new("users"), &client);
//!
//! let mut alice = row!({"username": "alice", "email": "alice@example.com"});
//! users.insert(&mut alice).await?;          // alice now carries "id"
//!
//! let found = users.find_one(row!({"username": "alice"}), None).await?;
//!
//! users
//!     .update(&row!({"email": "a@example.com"}), &row!({"username": "alice"}))
//!     .await?;
//! ```

pub mod client;
pub mod error;
pub mod fragment;
pub mod model;
pub mod record;
pub mod row;
pub mod value;

pub use client::DatabaseClient;
pub use error::{ModelError, ModelResult};
pub use fragment::{
    assignment_fields, column_fields, conflict_clause, order_clauses, quote_ident,
    value_placeholders,
};
pub use model::{Conflict, Lookup, Model, ModelConfig};
pub use record::Record;
pub use row::{Changes, Conditions, OrderBy, Row, decode_row};
pub use value::{Param, ParamList, param_refs};

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_with_config};
