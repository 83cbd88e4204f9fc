//! Per-integration extraction chains.
//!
//! # Design
//! Each `IntegrationKind` maps to a fixed, ordered slice of `ExtractionAttempt`
//! descriptors. The resolver walks the slice and stops at the first attempt
//! that yields active items, so the fallback order for every provider can be
//! read (and tested) here without following any control flow.

use serde_json::{Map, Value};

use crate::types::IntegrationKind;

/// A priority-ordered list of attribute names holding item arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeProbe {
    names: &'static [&'static str],
}

impl AttributeProbe {
    pub const fn new(names: &'static [&'static str]) -> Self {
        Self { names }
    }

    pub fn names(&self) -> &'static [&'static str] {
        self.names
    }

    /// Return the first name whose value is a non-empty array, with that array.
    ///
    /// `lookup` is called in priority order and never past the winning name.
    pub fn first_non_empty<'a, F>(&self, mut lookup: F) -> Option<(&'static str, &'a [Value])>
    where
        F: FnMut(&str) -> Option<&'a Value>,
    {
        self.names.iter().find_map(|name| match lookup(name) {
            Some(Value::Array(items)) if !items.is_empty() => Some((*name, items.as_slice())),
            _ => None,
        })
    }

    pub fn probe<'a>(&self, attributes: &'a Map<String, Value>) -> Option<(&'static str, &'a [Value])> {
        self.first_non_empty(|name| attributes.get(name))
    }
}

/// One concrete way of retrieving raw items for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionAttempt {
    /// `todo.get_items`; `raw_list_id` also sends the id without its `todo.` prefix.
    ServiceCall { raw_list_id: bool },
    /// Probe the entity's own attributes.
    StateAttribute(AttributeProbe),
    /// Bring!'s `purchase_items` map of `key -> {name, quantity, purchased}`.
    PurchaseItemsMap,
    /// Scan sibling `todo.*` / `sensor.*` entities. Only runs when the entity's
    /// state claims a positive item count.
    RelatedEntity {
        probe: AttributeProbe,
        provider_hint: &'static str,
    },
    /// `GET /api/todo/items?entity_id=…`
    TodoApiEndpoint,
    /// `GET /api/shopping_list`
    LegacyShoppingList,
}

impl ExtractionAttempt {
    /// Short name used in log lines.
    pub fn label(&self) -> &'static str {
        match self {
            ExtractionAttempt::ServiceCall { raw_list_id: false } => "service_call",
            ExtractionAttempt::ServiceCall { raw_list_id: true } => "service_call_raw_id",
            ExtractionAttempt::StateAttribute(_) => "state_attribute",
            ExtractionAttempt::PurchaseItemsMap => "purchase_items",
            ExtractionAttempt::RelatedEntity { .. } => "related_entity",
            ExtractionAttempt::TodoApiEndpoint => "todo_api",
            ExtractionAttempt::LegacyShoppingList => "legacy_shopping_list",
        }
    }
}

const ITEMS: AttributeProbe = AttributeProbe::new(&["items"]);
const CALDAV_TODOS: AttributeProbe = AttributeProbe::new(&["todos"]);
const ALEXA_ATTRIBUTES: AttributeProbe =
    AttributeProbe::new(&["items", "item_names", "todos", "to_dos", "tasks"]);
const BRING_ATTRIBUTES: AttributeProbe =
    AttributeProbe::new(&["items", "item_names", "purchases", "shopping_list", "products"]);
const GENERIC_ATTRIBUTES: AttributeProbe =
    AttributeProbe::new(&["items", "item", "todo_items", "entity_items"]);

const SERVICE_CALL: ExtractionAttempt = ExtractionAttempt::ServiceCall { raw_list_id: false };

const LOCAL_TODO_CHAIN: &[ExtractionAttempt] = &[ExtractionAttempt::StateAttribute(ITEMS)];

const SERVICE_THEN_ITEMS_CHAIN: &[ExtractionAttempt] =
    &[SERVICE_CALL, ExtractionAttempt::StateAttribute(ITEMS)];

const CALDAV_CHAIN: &[ExtractionAttempt] = &[ExtractionAttempt::StateAttribute(CALDAV_TODOS)];

const ALEXA_CHAIN: &[ExtractionAttempt] =
    &[SERVICE_CALL, ExtractionAttempt::StateAttribute(ALEXA_ATTRIBUTES)];

const BRING_CHAIN: &[ExtractionAttempt] = &[
    SERVICE_CALL,
    ExtractionAttempt::StateAttribute(BRING_ATTRIBUTES),
    ExtractionAttempt::PurchaseItemsMap,
    ExtractionAttempt::RelatedEntity {
        probe: BRING_ATTRIBUTES,
        provider_hint: "bring",
    },
    ExtractionAttempt::ServiceCall { raw_list_id: true },
];

const LEGACY_CHAIN: &[ExtractionAttempt] = &[ExtractionAttempt::LegacyShoppingList];

const GENERIC_CHAIN: &[ExtractionAttempt] = &[
    ExtractionAttempt::StateAttribute(GENERIC_ATTRIBUTES),
    ExtractionAttempt::TodoApiEndpoint,
    SERVICE_CALL,
];

/// The fixed extraction chain for `kind`, cheapest attempt first.
pub fn attempts_for(kind: IntegrationKind) -> &'static [ExtractionAttempt] {
    match kind {
        IntegrationKind::LocalTodo => LOCAL_TODO_CHAIN,
        IntegrationKind::GoogleTasks | IntegrationKind::Todoist => SERVICE_THEN_ITEMS_CHAIN,
        IntegrationKind::CalDav => CALDAV_CHAIN,
        IntegrationKind::AlexaTodo => ALEXA_CHAIN,
        IntegrationKind::Bring => BRING_CHAIN,
        IntegrationKind::LegacyShoppingList => LEGACY_CHAIN,
        IntegrationKind::Unknown => GENERIC_CHAIN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn labels(kind: IntegrationKind) -> Vec<&'static str> {
        attempts_for(kind).iter().map(ExtractionAttempt::label).collect()
    }

    #[test]
    fn every_kind_has_a_chain() {
        for kind in IntegrationKind::ALL {
            assert!(!attempts_for(kind).is_empty(), "{kind}");
        }
    }

    #[test]
    fn bring_chain_order() {
        assert_eq!(
            labels(IntegrationKind::Bring),
            vec![
                "service_call",
                "state_attribute",
                "purchase_items",
                "related_entity",
                "service_call_raw_id"
            ]
        );
    }

    #[test]
    fn unknown_chain_is_generic() {
        assert_eq!(
            labels(IntegrationKind::Unknown),
            vec!["state_attribute", "todo_api", "service_call"]
        );
        match attempts_for(IntegrationKind::Unknown)[0] {
            ExtractionAttempt::StateAttribute(probe) => {
                assert_eq!(probe.names(), &["items", "item", "todo_items", "entity_items"])
            }
            other => panic!("unexpected first attempt {other:?}"),
        }
    }

    #[test]
    fn service_backed_kinds_fall_back_to_items() {
        for kind in [IntegrationKind::GoogleTasks, IntegrationKind::Todoist] {
            assert_eq!(labels(kind), vec!["service_call", "state_attribute"]);
        }
    }

    #[test]
    fn attribute_only_kinds() {
        assert_eq!(labels(IntegrationKind::LocalTodo), vec!["state_attribute"]);
        assert_eq!(
            attempts_for(IntegrationKind::CalDav),
            &[ExtractionAttempt::StateAttribute(AttributeProbe::new(&["todos"]))]
        );
        assert_eq!(labels(IntegrationKind::LegacyShoppingList), vec!["legacy_shopping_list"]);
    }

    #[test]
    fn alexa_probes_five_attributes() {
        match attempts_for(IntegrationKind::AlexaTodo)[1] {
            ExtractionAttempt::StateAttribute(probe) => assert_eq!(
                probe.names(),
                &["items", "item_names", "todos", "to_dos", "tasks"]
            ),
            other => panic!("unexpected attempt {other:?}"),
        }
    }

    #[test]
    fn probe_skips_empty_and_stops_at_first_hit() {
        let probe = AttributeProbe::new(&["a", "b", "c"]);
        let a = json!([]);
        let b = json!(["bread"]);
        let c = json!(["never"]);
        let mut asked = Vec::new();

        let hit = probe.first_non_empty(|name| {
            asked.push(name.to_string());
            match name {
                "a" => Some(&a),
                "b" => Some(&b),
                _ => Some(&c),
            }
        });

        let (name, items) = hit.unwrap();
        assert_eq!(name, "b");
        assert_eq!(items, &[json!("bread")]);
        assert_eq!(asked, vec!["a", "b"]);
    }

    #[test]
    fn probe_ignores_non_arrays() {
        let attributes = match json!({"items": "3 items", "item_names": {"a": 1}}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let probe = AttributeProbe::new(&["items", "item_names"]);
        assert!(probe.probe(&attributes).is_none());
    }
}
