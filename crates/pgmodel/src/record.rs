//! Row instances bound to a model.
//!
//! A [`Record`] wraps a model reference and one row's in-memory attributes,
//! giving "save current object" semantics: persistence methods forward to
//! the model using the current attributes, with conditions defaulting to
//! the primary key, and the nested attribute helpers stage in-memory
//! mutations without touching the database.

use crate::client::DatabaseClient;
use crate::error::ModelResult;
use crate::model::{Conflict, Model};
use crate::row::{Conditions, Row};
use serde_json::Value;

/// One row's transient in-memory state, bound to its table's [`Model`].
pub struct Record<'m, C: DatabaseClient> {
    model: &'m Model<C>,
    attributes: Row,
    /// Conditions last used by `update`/`delete`, reused by `retrieve`.
    conditions: Option<Conditions>,
}

impl<'m, C: DatabaseClient> Record<'m, C> {
    /// Wrap attributes in a record bound to `model`.
    pub fn new(model: &'m Model<C>, attributes: Row) -> Self {
        Self {
            model,
            attributes,
            conditions: None,
        }
    }

    /// The current in-memory attributes.
    pub fn attributes(&self) -> &Row {
        &self.attributes
    }

    /// Consume the record, keeping its attributes.
    pub fn into_attributes(self) -> Row {
        self.attributes
    }

    /// Get a top-level attribute.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Walk a key path through nested mappings.
    ///
    /// Returns `None` for an empty path, or as soon as an intermediate
    /// value is falsy (JSON null, `false`, `0`, `""`) or the walk leaves
    /// object territory.
    pub fn get_in(&self, path: &[&str]) -> Option<&Value> {
        get_path(&self.attributes, path)
    }

    /// Set a top-level attribute; chainable.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Set a value at a nested key path.
    ///
    /// Walks all but the last segment; any falsy or non-object intermediate
    /// aborts with `None` and no mutation. The final segment is set
    /// unconditionally, even if it did not previously exist — intentionally
    /// asymmetric with [`Record::get_in`], which would refuse to walk
    /// through a falsy value at that position.
    pub fn set_in(&mut self, path: &[&str], value: impl Into<Value>) -> Option<&mut Self> {
        if set_path(&mut self.attributes, path, value.into()) {
            Some(self)
        } else {
            None
        }
    }

    /// Shallow-merge a partial mapping into the attributes; chainable.
    pub fn assign(&mut self, partial: Row) -> &mut Self {
        for (key, value) in partial {
            self.attributes.insert(key, value);
        }
        self
    }

    /// Insert the current attributes; the primary key (and timestamps) land
    /// back in this record's attributes.
    pub async fn create(&mut self) -> ModelResult<()> {
        let model = self.model;
        model.create(&mut self.attributes).await
    }

    /// Upsert the current attributes.
    pub async fn upsert(&mut self, conflict: Option<Conflict>) -> ModelResult<()> {
        let model = self.model;
        model.upsert(&mut self.attributes, conflict).await
    }

    /// Update using the current attributes as changes.
    ///
    /// Conditions default to `{primary_key: current value}` and are
    /// remembered for [`Record::retrieve`].
    pub async fn update(&mut self, conditions: Option<Conditions>) -> ModelResult<u64> {
        let conditions = conditions.unwrap_or_else(|| self.key_conditions());
        let affected = self.model.update(&self.attributes, &conditions).await?;
        self.conditions = Some(conditions);
        Ok(affected)
    }

    /// Delete this record's row.
    ///
    /// Conditions default to `{primary_key: current value}` and are
    /// remembered for [`Record::retrieve`].
    pub async fn delete(&mut self, conditions: Option<Conditions>) -> ModelResult<u64> {
        let conditions = conditions.unwrap_or_else(|| self.key_conditions());
        let affected = self.model.delete(&conditions).await?;
        self.conditions = Some(conditions);
        Ok(affected)
    }

    /// Re-fetch this record's row.
    ///
    /// Uses the remembered conditions, else the primary key. Returns a new
    /// record wrapping the fetched attributes, or `self` unchanged when
    /// nothing was found — a miss never destroys in-memory state.
    pub async fn retrieve(self) -> ModelResult<Record<'m, C>> {
        let conditions = self
            .conditions
            .clone()
            .unwrap_or_else(|| self.key_conditions());
        match self.model.find_one(conditions.clone(), None).await? {
            Some(attributes) => Ok(Record {
                model: self.model,
                attributes,
                conditions: Some(conditions),
            }),
            None => Ok(self),
        }
    }

    fn key_conditions(&self) -> Conditions {
        let key = &self.model.config().primary_key;
        let mut conditions = Conditions::new();
        conditions.insert(
            key.clone(),
            self.attributes.get(key).cloned().unwrap_or(Value::Null),
        );
        conditions
    }
}

/// JS-style falsiness over JSON values: null, false, 0, and "" are falsy.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f == 0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn get_path<'a>(attributes: &'a Row, path: &[&str]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut current = attributes.get(*first)?;
    for key in rest {
        if is_falsy(current) {
            return None;
        }
        current = current.as_object()?.get(*key)?;
    }
    Some(current)
}

fn set_path(attributes: &mut Row, path: &[&str], value: Value) -> bool {
    let Some((last, intermediates)) = path.split_last() else {
        return false;
    };
    let Some((first, rest)) = intermediates.split_first() else {
        attributes.insert((*last).to_string(), value);
        return true;
    };
    let Some(mut current) = attributes.get_mut(*first) else {
        return false;
    };
    if is_falsy(current) {
        return false;
    }
    for key in rest {
        let Some(next) = current.as_object_mut().and_then(|m| m.get_mut(*key)) else {
            return false;
        };
        if is_falsy(next) {
            return false;
        }
        current = next;
    }
    match current.as_object_mut() {
        Some(map) => {
            map.insert((*last).to_string(), value);
            true
        }
        None => false,
    }
}
