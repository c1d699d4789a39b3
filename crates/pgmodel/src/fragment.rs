//! Query fragment builder.
//!
//! Pure functions that translate column/value mappings into SQL text
//! fragments with `$1, $2, ...` placeholders. Nothing here executes SQL;
//! the fragments and the value lists drawn from the same mapping stay
//! positionally aligned because the mapping preserves insertion order
//! (`serde_json`'s `preserve_order` feature) and is iterated the same way
//! on both sides.
//!
//! The `start_index` offset exists because some statements concatenate two
//! independent value lists into one placeholder numbering: an UPDATE's SET
//! changes followed by its WHERE conditions, or an INSERT's values followed
//! by its ON CONFLICT DO UPDATE changes.

use crate::model::Conflict;
use crate::row::{OrderBy, Row};

/// Render a column identifier double-quoted, escaping embedded `"` as `""`.
pub fn quote_ident(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('"');
    for ch in name.chars() {
        if ch == '"' {
            out.push('"');
            out.push('"');
        } else {
            out.push(ch);
        }
    }
    out.push('"');
    out
}

/// Quoted column identifiers, one per key, in mapping iteration order.
///
/// No dedup; the mapping's keys are already unique.
pub fn column_fields(columns: &Row) -> Vec<String> {
    columns.keys().map(|name| quote_ident(name)).collect()
}

/// `"column" = $N` assignments, N starting at `start_index + 1`.
pub fn assignment_fields(columns: &Row, start_index: usize) -> Vec<String> {
    columns
        .keys()
        .enumerate()
        .map(|(i, name)| format!("{} = ${}", quote_ident(name), i + start_index + 1))
        .collect()
}

/// `$N` placeholders for a VALUES list, N starting at `start_index + 1`.
pub fn value_placeholders(columns: &Row, start_index: usize) -> Vec<String> {
    (0..columns.len())
        .map(|i| format!("${}", i + start_index + 1))
        .collect()
}

/// `"column" DIRECTION` clauses, direction taken verbatim from the value.
///
/// Direction strings are not validated; supplying a valid `ASC`/`DESC` is
/// the caller's responsibility.
pub fn order_clauses(order_by: &OrderBy) -> Vec<String> {
    order_by
        .iter()
        .map(|(name, direction)| {
            let direction = match direction.as_str() {
                Some(s) => s.to_string(),
                None => direction.to_string(),
            };
            format!("{} {}", quote_ident(name), direction)
        })
        .collect()
}

/// Render an `ON CONFLICT ...` clause.
///
/// An empty target means "do nothing". A non-empty target with changes
/// becomes DO UPDATE, with assignment placeholders starting at
/// `value_count_before + 1` so they index correctly into a value array
/// formed by concatenating the insert values with the conflict's own
/// change values. A non-empty target without changes falls back to a
/// targeted DO NOTHING.
pub fn conflict_clause(conflict: &Conflict, value_count_before: usize) -> String {
    if conflict.target.is_empty() {
        return "ON CONFLICT DO NOTHING".to_string();
    }
    let target = conflict.target.join(",");
    match &conflict.changes {
        Some(changes) if !changes.is_empty() => {
            let assignments = assignment_fields(changes, value_count_before);
            format!(
                "ON CONFLICT ({}) DO UPDATE SET {}",
                target,
                assignments.join(",")
            )
        }
        _ => format!("ON CONFLICT ({}) DO NOTHING", target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;

    #[test]
    fn quote_simple() {
        assert_eq!(quote_ident("username"), r#""username""#);
    }

    #[test]
    fn quote_escapes_embedded_quote() {
        assert_eq!(quote_ident(r#"has"quote"#), r#""has""quote""#);
    }

    #[test]
    fn column_fields_in_order() {
        let columns = row!({"b": 1, "a": 2, "c": 3});
        assert_eq!(
            column_fields(&columns),
            vec![r#""b""#, r#""a""#, r#""c""#]
        );
    }

    #[test]
    fn assignment_fields_number_from_one() {
        let columns = row!({"status": "active", "role": "admin"});
        assert_eq!(
            assignment_fields(&columns, 0),
            vec![r#""status" = $1"#, r#""role" = $2"#]
        );
    }

    #[test]
    fn assignment_fields_honor_start_index() {
        let columns = row!({"id": 7});
        assert_eq!(assignment_fields(&columns, 2), vec![r#""id" = $3"#]);
    }

    #[test]
    fn value_placeholders_with_offset() {
        let columns = row!({"a": 1, "b": 2});
        assert_eq!(value_placeholders(&columns, 0), vec!["$1", "$2"]);
        assert_eq!(value_placeholders(&columns, 3), vec!["$4", "$5"]);
    }

    #[test]
    fn order_clauses_pass_direction_verbatim() {
        let order_by = row!({"created_at": "DESC", "id": "asc"});
        assert_eq!(
            order_clauses(&order_by),
            vec![r#""created_at" DESC"#, r#""id" asc"#]
        );
    }

    #[test]
    fn conflict_empty_target_is_do_nothing() {
        let conflict = Conflict::default();
        assert_eq!(conflict_clause(&conflict, 4), "ON CONFLICT DO NOTHING");
    }

    #[test]
    fn conflict_with_changes_offsets_placeholders() {
        let conflict = Conflict::target(["id"]).with_changes(row!({"name": "x", "updated_at": "now"}));
        assert_eq!(
            conflict_clause(&conflict, 3),
            r#"ON CONFLICT (id) DO UPDATE SET "name" = $4,"updated_at" = $5"#
        );
    }

    #[test]
    fn conflict_target_without_changes_is_targeted_do_nothing() {
        let conflict = Conflict::target(["email", "tenant_id"]);
        assert_eq!(
            conflict_clause(&conflict, 0),
            "ON CONFLICT (email,tenant_id) DO NOTHING"
        );
    }
}
