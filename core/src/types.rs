//! Domain types shared by the classifier, the normalizer and the resolver.
//!
//! # Design
//! Provider records stay untyped (`serde_json::Value`) until normalization;
//! only the canonical shapes handed to callers get concrete structs. Every
//! value here is built fresh per resolution.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Entity id of the pre-todo-platform shopping list.
pub const LEGACY_SHOPPING_LIST_ID: &str = "shopping_list.shopping_list";

/// One entity snapshot as returned by `/api/states`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEntity {
    #[serde(rename = "entity_id", default)]
    pub id: String,
    #[serde(default, deserialize_with = "state_as_string")]
    pub state: String,
    #[serde(default, deserialize_with = "attributes_or_empty")]
    pub attributes: Map<String, Value>,
}

impl RawEntity {
    /// A snapshot carrying only an id, used when the real one is unreachable.
    pub fn bare(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Self::default()
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// `friendly_name` when set, otherwise the id without its domain prefix.
    pub fn display_name(&self) -> String {
        match self.attribute("friendly_name").and_then(Value::as_str) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.object_id().to_string(),
        }
    }

    /// The part of the id after the first `.`.
    pub fn object_id(&self) -> &str {
        self.id.split_once('.').map_or(self.id.as_str(), |(_, rest)| rest)
    }

    pub fn is_todo(&self) -> bool {
        self.id.starts_with("todo.")
    }

    /// The entity state read as an item count, when it is a positive integer.
    pub fn claimed_item_count(&self) -> Option<u64> {
        self.state.trim().parse::<u64>().ok().filter(|n| *n > 0)
    }
}

fn state_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Anything other than an object (`null` included) reads as no attributes.
fn attributes_or_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(map) => map,
        _ => Map::new(),
    })
}

/// The provider backing a to-do-like entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationKind {
    LocalTodo,
    GoogleTasks,
    Todoist,
    #[serde(rename = "caldav")]
    CalDav,
    AlexaTodo,
    Bring,
    LegacyShoppingList,
    Unknown,
}

impl IntegrationKind {
    pub const ALL: [IntegrationKind; 8] = [
        IntegrationKind::LocalTodo,
        IntegrationKind::GoogleTasks,
        IntegrationKind::Todoist,
        IntegrationKind::CalDav,
        IntegrationKind::AlexaTodo,
        IntegrationKind::Bring,
        IntegrationKind::LegacyShoppingList,
        IntegrationKind::Unknown,
    ];

    /// The value Home Assistant reports in the `integration` attribute.
    pub fn as_str(self) -> &'static str {
        match self {
            IntegrationKind::LocalTodo => "local_todo",
            IntegrationKind::GoogleTasks => "google_tasks",
            IntegrationKind::Todoist => "todoist",
            IntegrationKind::CalDav => "caldav",
            IntegrationKind::AlexaTodo => "alexa_todo",
            IntegrationKind::Bring => "bring",
            IntegrationKind::LegacyShoppingList => "legacy_shopping_list",
            IntegrationKind::Unknown => "unknown",
        }
    }

    /// Case-sensitive lookup; anything unrecognized is `Unknown`.
    pub fn from_integration(value: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .unwrap_or(IntegrationKind::Unknown)
    }
}

impl fmt::Display for IntegrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    NeedsAction,
    Completed,
}

/// A provider item mapped onto the canonical shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedItem {
    pub id: String,
    pub name: String,
    pub status: ItemStatus,
}

impl NormalizedItem {
    pub fn active(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: ItemStatus::NeedsAction,
        }
    }
}

/// One discovered list with its live active-item count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSummary {
    pub id: String,
    pub name: String,
    pub item_count: usize,
    pub integration: IntegrationKind,
}

/// Items of one list, optionally capped by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedItems {
    pub items: Vec<NormalizedItem>,
    pub total_count: usize,
    pub truncated: bool,
}

impl ResolvedItems {
    /// Head-truncate `items` to `limit`, keeping the pre-truncation count.
    pub fn from_items(mut items: Vec<NormalizedItem>, limit: Option<usize>) -> Self {
        let total_count = items.len();
        let truncated = limit.is_some_and(|n| n < total_count);
        if let Some(n) = limit {
            items.truncate(n);
        }
        Self {
            items,
            total_count,
            truncated,
        }
    }
}
