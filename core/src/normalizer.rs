//! Mapping of provider item records onto `NormalizedItem`.
//!
//! # Design
//! Providers disagree on every field: where the name lives, which flag means
//! "done", whether ids exist at all. The rules are expressed per
//! `IntegrationKind` as a completion predicate plus ordered field lists, and a
//! single pass applies them. Completed items never leave this module.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::types::{IntegrationKind, NormalizedItem};

const ID_FIELDS: &[&str] = &["uid", "id", "item_id", "itemId"];
const NAME_FIELDS: &[&str] = &["summary", "name"];

/// Name fields tried after `summary` and `name`.
fn extra_name_fields(kind: IntegrationKind) -> &'static [&'static str] {
    match kind {
        IntegrationKind::LocalTodo | IntegrationKind::LegacyShoppingList => &[],
        IntegrationKind::GoogleTasks => &["title"],
        IntegrationKind::Todoist => &["content"],
        IntegrationKind::CalDav => &["description"],
        IntegrationKind::AlexaTodo | IntegrationKind::Bring => &["text"],
        IntegrationKind::Unknown => &["description", "title", "text", "content"],
    }
}

/// Python-style truthiness: `false`, `0`, `""`, `[]`, `{}` and `null` are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn flag(record: &Map<String, Value>, field: &str) -> bool {
    record.get(field).is_some_and(is_truthy)
}

fn status_is(record: &Map<String, Value>, expected: &str) -> bool {
    record.get("status").and_then(Value::as_str) == Some(expected)
}

/// Whether `kind` considers `record` done.
pub fn is_completed(record: &Map<String, Value>, kind: IntegrationKind) -> bool {
    match kind {
        IntegrationKind::Bring => {
            status_is(record, "completed")
                || flag(record, "complete")
                || flag(record, "checked")
                || flag(record, "purchase")
        }
        IntegrationKind::Todoist => {
            flag(record, "checked") || flag(record, "completed") || status_is(record, "completed")
        }
        IntegrationKind::CalDav => status_is(record, "COMPLETED"),
        _ => status_is(record, "completed") || flag(record, "complete"),
    }
}

/// First non-empty string (or number) among `fields`.
fn first_text(record: &Map<String, Value>, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| match record.get(*field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn quantity_suffix(name: String, quantity: Option<&Value>) -> String {
    match quantity {
        Some(Value::String(q)) if !q.is_empty() => format!("{name} ({q})"),
        Some(q @ Value::Number(_)) if is_truthy(q) => format!("{name} ({q})"),
        _ => name,
    }
}

/// Normalize one provider sequence, dropping completed and nameless entries.
pub fn normalize(raw_items: &[Value], kind: IntegrationKind) -> Vec<NormalizedItem> {
    raw_items
        .iter()
        .enumerate()
        .filter_map(|(index, raw)| normalize_one(index, raw, kind))
        .collect()
}

fn normalize_one(index: usize, raw: &Value, kind: IntegrationKind) -> Option<NormalizedItem> {
    let record = match raw {
        Value::String(text) if !text.trim().is_empty() => {
            return Some(NormalizedItem::active(format!("item_{index}"), text.clone()));
        }
        Value::Object(record) => record,
        other => {
            log::debug!("skipping unusable {kind} item at {index}: {other}");
            return None;
        }
    };

    if is_completed(record, kind) {
        return None;
    }

    let Some(name) = first_text(record, NAME_FIELDS)
        .or_else(|| first_text(record, extra_name_fields(kind)))
    else {
        log::debug!("skipping nameless {kind} item at {index}");
        return None;
    };

    let name = if kind == IntegrationKind::Bring {
        quantity_suffix(name, record.get("quantity"))
    } else {
        name
    };

    let id = first_text(record, ID_FIELDS).unwrap_or_else(|| {
        if kind == IntegrationKind::Bring {
            Uuid::new_v4().to_string()
        } else {
            format!("item_{index}")
        }
    });

    Some(NormalizedItem::active(id, name))
}

/// Normalize Bring!'s `purchase_items` map, keeping map order.
pub fn normalize_purchase_map(purchase_items: &Map<String, Value>) -> Vec<NormalizedItem> {
    purchase_items
        .iter()
        .filter_map(|(key, data)| {
            let Value::Object(record) = data else {
                return None;
            };
            if flag(record, "purchased") {
                return None;
            }
            let name = first_text(record, &["name"]).unwrap_or_else(|| key.clone());
            Some(NormalizedItem::active(
                key.clone(),
                quantity_suffix(name, record.get("quantity")),
            ))
        })
        .collect()
}
