//! Model/Record CRUD semantics against a scripted mock client.
//!
//! The mock records every generated SQL string and parameter list, so these
//! tests pin the exact statement shapes and the placeholder/value alignment
//! without a database.

use pgmodel::{Conflict, DatabaseClient, Model, ModelConfig, ModelResult, Param, Row, row};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct Call {
    sql: String,
    params: Vec<Value>,
}

#[derive(Default)]
struct MockClient {
    calls: Mutex<Vec<Call>>,
    rows: Mutex<VecDeque<Vec<Row>>>,
    affected: Mutex<VecDeque<u64>>,
}

impl MockClient {
    fn new() -> Self {
        Self::default()
    }

    fn push_rows(&self, rows: Vec<Row>) {
        self.rows.lock().unwrap().push_back(rows);
    }

    fn push_affected(&self, count: u64) {
        self.affected.lock().unwrap().push_back(count);
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record_call(&self, sql: &str, params: &[Param]) {
        self.calls.lock().unwrap().push(Call {
            sql: sql.to_string(),
            params: params.iter().map(|p| p.value().clone()).collect(),
        });
    }
}

impl DatabaseClient for MockClient {
    async fn query(&self, sql: &str, params: &[Param]) -> ModelResult<Vec<Row>> {
        self.record_call(sql, params);
        Ok(self.rows.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn execute(&self, sql: &str, params: &[Param]) -> ModelResult<u64> {
        self.record_call(sql, params);
        Ok(self.affected.lock().unwrap().pop_front().unwrap_or(0))
    }
}

fn users(client: &MockClient) -> Model<&MockClient> {
    Model::new(ModelConfig::new("users"), client)
}

fn users_plain(client: &MockClient) -> Model<&MockClient> {
    Model::new(ModelConfig::new("users").without_timestamps(), client)
}

#[tokio::test]
async fn find_builds_select_with_where_order_and_extra() {
    let client = MockClient::new();
    let model = users(&client);

    let conditions = row!({"status": "active", "role": "admin"});
    let order_by = row!({"created_at": "DESC"});
    let rows = model
        .find(Some(&conditions), Some(&order_by), Some("LIMIT 5"))
        .await
        .unwrap();
    assert!(rows.is_empty());

    let calls = client.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].sql,
        r#"SELECT * FROM "users" WHERE "status" = $1 AND "role" = $2 ORDER BY "created_at" DESC LIMIT 5"#
    );
    assert_eq!(calls[0].params, vec![json!("active"), json!("admin")]);
}

#[tokio::test]
async fn find_without_conditions_selects_everything() {
    let client = MockClient::new();
    let model = users(&client);

    model.find(None, None, None).await.unwrap();
    assert_eq!(client.calls()[0].sql, r#"SELECT * FROM "users""#);
}

#[tokio::test]
async fn find_one_wraps_bare_key_and_limits_to_one() {
    let client = MockClient::new();
    let model = users(&client);

    let found = model.find_one(7i64, None).await.unwrap();
    assert!(found.is_none());

    let calls = client.calls();
    assert_eq!(
        calls[0].sql,
        r#"SELECT * FROM "users" WHERE "id" = $1 LIMIT 1"#
    );
    assert_eq!(calls[0].params, vec![json!(7)]);
}

#[tokio::test]
async fn find_one_accepts_conditions_mapping() {
    let client = MockClient::new();
    client.push_rows(vec![row!({"id": 3, "email": "a@b.c"})]);
    let model = users(&client);

    let found = model
        .find_one(row!({"email": "a@b.c"}), None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.get("id"), Some(&json!(3)));
    assert_eq!(
        client.calls()[0].sql,
        r#"SELECT * FROM "users" WHERE "email" = $1 LIMIT 1"#
    );
}

#[tokio::test]
async fn count_parses_aggregate_row() {
    let client = MockClient::new();
    client.push_rows(vec![row!({"count": 42})]);
    let model = users(&client);

    let count = model.count(&row!({"status": "active"}), None).await.unwrap();
    assert_eq!(count, 42);
    assert_eq!(
        client.calls()[0].sql,
        r#"SELECT COUNT(*) AS count FROM "users" WHERE "status" = $1"#
    );
}

#[tokio::test]
async fn count_defaults_to_zero_without_rows() {
    let client = MockClient::new();
    let model = users(&client);
    assert_eq!(model.count(&row!({"status": "gone"}), None).await.unwrap(), 0);
}

#[tokio::test]
async fn insert_defaults_both_timestamps_to_the_same_instant() {
    let client = MockClient::new();
    client.push_rows(vec![row!({"id": 11})]);
    let model = users(&client);

    let mut user = row!({"username": "alice"});
    model.insert(&mut user).await.unwrap();

    let created = user.get("created_at").unwrap();
    let updated = user.get("updated_at").unwrap();
    assert!(created.is_string());
    assert_eq!(created, updated);
    assert_eq!(user.get("id"), Some(&json!(11)));

    let calls = client.calls();
    assert_eq!(
        calls[0].sql,
        r#"INSERT INTO users("username","created_at","updated_at") VALUES($1,$2,$3) RETURNING *"#
    );
    assert_eq!(calls[0].params[0], json!("alice"));
    assert_eq!(calls[0].params.len(), 3);
}

#[tokio::test]
async fn insert_keeps_caller_supplied_timestamps() {
    let client = MockClient::new();
    let model = users(&client);

    let mut user = row!({"username": "bob", "created_at": "2000-01-01T00:00:00.000Z"});
    model.insert(&mut user).await.unwrap();

    assert_eq!(
        user.get("created_at"),
        Some(&json!("2000-01-01T00:00:00.000Z"))
    );
    // updated_at was still defaulted.
    assert_ne!(user.get("updated_at"), user.get("created_at"));
}

#[tokio::test]
async fn insert_without_returned_row_is_a_benign_no_op() {
    let client = MockClient::new();
    let model = users_plain(&client);

    let mut user = row!({"username": "carol"});
    model.insert(&mut user).await.unwrap();
    assert!(!user.contains_key("id"));
}

#[tokio::test]
async fn insert_empty_row_fails_before_any_io() {
    let client = MockClient::new();
    let model = users_plain(&client);

    let mut empty = Row::new();
    let err = model.insert(&mut empty).await.unwrap_err();
    assert!(err.is_contract());
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn upsert_defaults_conflict_to_primary_key_and_full_row() {
    let client = MockClient::new();
    client.push_rows(vec![row!({"id": 1})]);
    let model = users_plain(&client);

    let mut user = row!({"id": 1, "name": "x"});
    model.upsert(&mut user, None).await.unwrap();

    let calls = client.calls();
    assert_eq!(
        calls[0].sql,
        r#"INSERT INTO users("id","name") VALUES($1,$2) ON CONFLICT (id) DO UPDATE SET "id" = $3,"name" = $4 RETURNING id"#
    );
    // Conflict change values are the row's own values, appended after the
    // insert values so the $3/$4 placeholders index correctly.
    assert_eq!(
        calls[0].params,
        vec![json!(1), json!("x"), json!(1), json!("x")]
    );
}

#[tokio::test]
async fn upsert_refreshes_updated_at_in_both_row_and_changes() {
    let client = MockClient::new();
    let model = users(&client);

    let mut user = row!({"id": 9, "name": "y"});
    model.upsert(&mut user, None).await.unwrap();

    assert!(user.contains_key("created_at"));
    assert!(user.contains_key("updated_at"));

    let call = client.calls().remove(0);
    // insert values: id, name, created_at, updated_at; changes repeat them.
    assert_eq!(call.params.len(), 8);
    assert_eq!(call.params[3], call.params[7]);
    assert!(call.sql.contains(r#""updated_at" = $8"#));
}

#[tokio::test]
async fn upsert_defaults_updated_at_into_explicit_changes() {
    let client = MockClient::new();
    let model = users(&client);

    let mut user = row!({"id": 2, "name": "z"});
    let conflict = Conflict::target(["id"]).with_changes(row!({"name": "z2"}));
    model.upsert(&mut user, Some(conflict)).await.unwrap();

    let call = client.calls().remove(0);
    assert!(call.sql.contains(r#"DO UPDATE SET "name" = $5,"updated_at" = $6"#));
    assert_eq!(call.params[4], json!("z2"));
}

#[tokio::test]
async fn upsert_with_empty_target_does_nothing_on_conflict() {
    let client = MockClient::new();
    let model = users_plain(&client);

    let mut user = row!({"id": 4, "name": "w"});
    model
        .upsert(&mut user, Some(Conflict::do_nothing()))
        .await
        .unwrap();

    let call = client.calls().remove(0);
    assert_eq!(
        call.sql,
        r#"INSERT INTO users("id","name") VALUES($1,$2) ON CONFLICT DO NOTHING RETURNING id"#
    );
    assert_eq!(call.params.len(), 2);
}

#[tokio::test]
async fn update_offsets_condition_placeholders_past_changes() {
    let client = MockClient::new();
    client.push_affected(1);
    let model = users_plain(&client);

    let affected = model
        .update(&row!({"name": "n", "email": "e"}), &row!({"id": 5}))
        .await
        .unwrap();
    assert_eq!(affected, 1);

    let call = client.calls().remove(0);
    assert_eq!(
        call.sql,
        r#"UPDATE users SET "name" = $1,"email" = $2 WHERE "id" = $3"#
    );
    assert_eq!(call.params, vec![json!("n"), json!("e"), json!(5)]);
}

#[tokio::test]
async fn update_defaults_updated_at_without_touching_the_caller_mapping() {
    let client = MockClient::new();
    let model = users(&client);

    let changes = row!({"name": "n"});
    model.update(&changes, &row!({"id": 5})).await.unwrap();

    // The caller's mapping is untouched; the executed SET carries updated_at.
    assert!(!changes.contains_key("updated_at"));
    let call = client.calls().remove(0);
    assert_eq!(
        call.sql,
        r#"UPDATE users SET "name" = $1,"updated_at" = $2 WHERE "id" = $3"#
    );
}

#[tokio::test]
async fn update_requires_changes_and_conditions() {
    let client = MockClient::new();
    let model = users(&client);

    let err = model.update(&Row::new(), &row!({"id": 1})).await.unwrap_err();
    assert!(err.is_contract());
    let err = model.update(&row!({"a": 1}), &Row::new()).await.unwrap_err();
    assert!(err.is_contract());
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn delete_builds_where_and_requires_conditions() {
    let client = MockClient::new();
    client.push_affected(2);
    let model = users(&client);

    let affected = model.delete(&row!({"status": "banned"})).await.unwrap();
    assert_eq!(affected, 2);
    assert_eq!(
        client.calls()[0].sql,
        r#"DELETE FROM users WHERE "status" = $1"#
    );

    let err = model.delete(&Row::new()).await.unwrap_err();
    assert!(err.is_contract());
    assert_eq!(client.calls().len(), 1);
}

#[tokio::test]
async fn record_update_defaults_conditions_to_primary_key() {
    let client = MockClient::new();
    client.push_affected(1);
    let model = users_plain(&client);

    let mut record = model.record(row!({"id": 8, "name": "r"}));
    let affected = record.update(None).await.unwrap();
    assert_eq!(affected, 1);

    let call = client.calls().remove(0);
    assert_eq!(
        call.sql,
        r#"UPDATE users SET "id" = $1,"name" = $2 WHERE "id" = $3"#
    );
    assert_eq!(call.params[2], json!(8));
}

#[tokio::test]
async fn record_without_primary_key_conditions_on_null() {
    let client = MockClient::new();
    let model = users_plain(&client);

    let mut record = model.record(row!({"name": "unsaved"}));
    record.delete(None).await.unwrap();

    let call = client.calls().remove(0);
    assert_eq!(call.sql, r#"DELETE FROM users WHERE "id" = $1"#);
    assert_eq!(call.params, vec![Value::Null]);
}

#[tokio::test]
async fn record_create_propagates_the_primary_key() {
    let client = MockClient::new();
    client.push_rows(vec![row!({"id": 21})]);
    let model = users_plain(&client);

    let mut record = model.record(row!({"name": "fresh"}));
    record.create().await.unwrap();
    assert_eq!(record.get("id"), Some(&json!(21)));
}

#[tokio::test]
async fn retrieve_returns_a_new_record_wrapping_fetched_attributes() {
    let client = MockClient::new();
    client.push_rows(vec![row!({"id": 5, "name": "stored"})]);
    let model = users_plain(&client);

    let record = model.record(row!({"id": 5, "name": "stale"}));
    let record = record.retrieve().await.unwrap();
    assert_eq!(record.get("name"), Some(&json!("stored")));

    assert_eq!(
        client.calls()[0].sql,
        r#"SELECT * FROM "users" WHERE "id" = $1 LIMIT 1"#
    );
}

#[tokio::test]
async fn retrieve_miss_keeps_the_original_attributes() {
    let client = MockClient::new();
    let model = users_plain(&client);

    let record = model.record(row!({"id": 6, "name": "kept"}));
    let record = record.retrieve().await.unwrap();
    assert_eq!(record.get("name"), Some(&json!("kept")));
}

#[tokio::test]
async fn retrieve_reuses_the_conditions_last_used() {
    let client = MockClient::new();
    client.push_affected(1);
    client.push_rows(vec![row!({"id": 30, "email": "e@x.y"})]);
    let model = users_plain(&client);

    let mut record = model.record(row!({"id": 30, "email": "e@x.y"}));
    record.update(Some(row!({"email": "e@x.y"}))).await.unwrap();
    let record = record.retrieve().await.unwrap();

    let calls = client.calls();
    assert_eq!(
        calls[1].sql,
        r#"SELECT * FROM "users" WHERE "email" = $1 LIMIT 1"#
    );
    assert_eq!(record.get("id"), Some(&json!(30)));
}

#[test]
fn record_setters_chain_and_merge() {
    let client = MockClient::new();
    let model = users_plain(&client);

    let mut record = model.record(row!({"name": "a"}));
    record
        .set("role", "admin")
        .assign(row!({"name": "b", "active": true}));
    assert_eq!(record.get("name"), Some(&json!("b")));
    assert_eq!(record.get("role"), Some(&json!("admin")));
    assert_eq!(record.get("active"), Some(&json!(true)));
}

#[test]
fn record_set_in_is_chainable_on_success_only() {
    let client = MockClient::new();
    let model = users_plain(&client);

    let mut record = model.record(row!({"profile": {"contact": {}}}));
    assert!(
        record
            .set_in(&["profile", "contact", "email"], json!("a@b.c"))
            .is_some()
    );
    assert_eq!(
        record.get_in(&["profile", "contact", "email"]),
        Some(&json!("a@b.c"))
    );

    assert!(record.set_in(&["profile", "missing", "x"], json!(1)).is_none());
    assert_eq!(record.get_in(&["profile", "missing", "x"]), None);
}
