//! Integration classification from a single entity snapshot.

use serde_json::Value;

use crate::types::{IntegrationKind, RawEntity, LEGACY_SHOPPING_LIST_ID};

/// `supported_features` bitmask reported by Bring! lists.
pub const BRING_SUPPORTED_FEATURES: u64 = 71;

/// Determine which integration backs `entity`. First match wins:
///
/// 1. `supported_features == 71` is Bring!, whatever `integration` claims.
/// 2. A non-empty string `integration` attribute, mapped case-sensitively.
/// 3. The legacy shopping list id.
/// 4. `Unknown`.
///
/// Pure: reads only the snapshot it is given.
pub fn classify(entity: &RawEntity) -> IntegrationKind {
    if entity
        .attribute("supported_features")
        .is_some_and(is_bring_bitmask)
    {
        return IntegrationKind::Bring;
    }

    if let Some(integration) = entity.attribute("integration").and_then(Value::as_str) {
        if !integration.is_empty() {
            return IntegrationKind::from_integration(integration);
        }
    }

    if entity.id == LEGACY_SHOPPING_LIST_ID {
        return IntegrationKind::LegacyShoppingList;
    }

    IntegrationKind::Unknown
}

fn is_bring_bitmask(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            n.as_u64() == Some(BRING_SUPPORTED_FEATURES)
                || n.as_f64() == Some(BRING_SUPPORTED_FEATURES as f64)
        }
        _ => false,
    }
}
