//! List enumeration and item resolution over a `Transport`.
//!
//! # Design
//! `ListResolver` owns a `HassClient` and a transport and nothing else; every
//! resolution builds its own state and throws it away. Provider failures are
//! absorbed one attempt at a time: an attempt that errors is logged and counts
//! as empty, and the chain moves on. Only configuration problems reach the
//! caller.

use std::cell::OnceCell;

use log::{debug, error, info, warn};
use serde_json::Value;

use crate::classifier::classify;
use crate::client::HassClient;
use crate::config::HomeAssistantConfig;
use crate::error::{ApiError, ConfigError};
use crate::http::{Transport, UreqTransport};
use crate::normalizer::{normalize, normalize_purchase_map};
use crate::strategy::{attempts_for, AttributeProbe, ExtractionAttempt};
use crate::types::{
    IntegrationKind, ListSummary, NormalizedItem, RawEntity, ResolvedItems, LEGACY_SHOPPING_LIST_ID,
};

/// Display name of the legacy list in summaries.
pub const LEGACY_SHOPPING_LIST_NAME: &str = "Shopping List (Legacy)";

/// Resolves lists and items against one Home Assistant instance.
#[derive(Debug)]
pub struct ListResolver<T> {
    client: HassClient,
    transport: T,
    default_list_id: Option<String>,
}

impl ListResolver<UreqTransport> {
    /// Validate `config` and build a resolver over a pooled ureq agent.
    pub fn from_config(config: &HomeAssistantConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let resolver = Self::new(
            HassClient::new(&config.url, &config.token),
            UreqTransport::new(config.timeout()),
        );
        Ok(resolver.with_default_list(&config.todo_list_entity_id))
    }
}

impl<T: Transport> ListResolver<T> {
    pub fn new(client: HassClient, transport: T) -> Self {
        Self {
            client,
            transport,
            default_list_id: None,
        }
    }

    /// Set the list `resolve_default_items` reads. An empty id clears it.
    pub fn with_default_list(mut self, list_id: &str) -> Self {
        let list_id = list_id.trim();
        self.default_list_id = (!list_id.is_empty()).then(|| list_id.to_string());
        self
    }

    pub fn default_list_id(&self) -> Option<&str> {
        self.default_list_id.as_deref()
    }

    /// Every `todo.*` entity with its active item count.
    ///
    /// Falls back to the legacy shopping list when no todo entity exists.
    /// An unreachable backend yields an empty vector.
    pub fn enumerate_lists(&self) -> Vec<ListSummary> {
        let states = match self.fetch_states() {
            Ok(states) => states,
            Err(err) => {
                error!("failed to fetch states from {}: {err}", self.client.base_url());
                return Vec::new();
            }
        };

        let todo_entities: Vec<&RawEntity> = states.iter().filter(|e| e.is_todo()).collect();
        info!(
            "found {} states, {} todo entities",
            states.len(),
            todo_entities.len()
        );

        if todo_entities.is_empty() {
            info!("no todo entities, trying legacy shopping list");
            return self.legacy_summary().into_iter().collect();
        }

        let memo = StatesMemo::preloaded(&states);
        todo_entities
            .into_iter()
            .map(|entity| {
                let integration = classify(entity);
                let items = self.extract(entity, integration, &memo);
                ListSummary {
                    id: entity.id.clone(),
                    name: entity.display_name(),
                    item_count: items.len(),
                    integration,
                }
            })
            .collect()
    }

    /// Active items of `list_id`, head-truncated to `limit`.
    ///
    /// Fails only when `list_id` is empty; provider errors degrade to an
    /// empty result.
    pub fn resolve_items(
        &self,
        list_id: &str,
        limit: Option<usize>,
    ) -> Result<ResolvedItems, ConfigError> {
        let list_id = list_id.trim();
        if list_id.is_empty() {
            return Err(ConfigError::Missing("list id"));
        }

        let entity = if list_id == LEGACY_SHOPPING_LIST_ID {
            RawEntity::bare(list_id)
        } else {
            match self.fetch_entity(list_id) {
                Ok(entity) => entity,
                Err(err) => {
                    warn!("could not read state of {list_id}: {err}");
                    RawEntity::bare(list_id)
                }
            }
        };

        let integration = classify(&entity);
        let items = self.extract(&entity, integration, &StatesMemo::default());
        Ok(ResolvedItems::from_items(items, limit))
    }

    /// `resolve_items` for the configured default list.
    pub fn resolve_default_items(&self, limit: Option<usize>) -> Result<ResolvedItems, ConfigError> {
        let list_id = self
            .default_list_id
            .as_deref()
            .ok_or(ConfigError::Missing("todo_list_entity_id"))?;
        self.resolve_items(list_id, limit)
    }

    fn fetch_states(&self) -> Result<Vec<RawEntity>, ApiError> {
        let response = self.transport.execute(self.client.build_list_states())?;
        self.client.parse_list_states(response)
    }

    fn fetch_entity(&self, entity_id: &str) -> Result<RawEntity, ApiError> {
        let response = self.transport.execute(self.client.build_get_state(entity_id))?;
        self.client.parse_get_state(response)
    }

    fn fetch_legacy_items(&self) -> Result<Vec<NormalizedItem>, ApiError> {
        let response = self.transport.execute(self.client.build_shopping_list())?;
        let raw = self.client.parse_shopping_list(response)?;
        Ok(normalize(&raw, IntegrationKind::LegacyShoppingList))
    }

    fn legacy_summary(&self) -> Option<ListSummary> {
        match self.fetch_legacy_items() {
            Ok(items) => Some(ListSummary {
                id: LEGACY_SHOPPING_LIST_ID.to_string(),
                name: LEGACY_SHOPPING_LIST_NAME.to_string(),
                item_count: items.len(),
                integration: IntegrationKind::LegacyShoppingList,
            }),
            Err(err) => {
                warn!("legacy shopping list unavailable: {err}");
                None
            }
        }
    }

    /// Walk the chain for `integration` until an attempt yields active items.
    fn extract(
        &self,
        entity: &RawEntity,
        integration: IntegrationKind,
        memo: &StatesMemo<'_>,
    ) -> Vec<NormalizedItem> {
        let chain = attempts_for(integration);
        info!(
            "resolving {} as {integration} ({} attempts)",
            entity.id,
            chain.len()
        );

        for attempt in chain {
            match self.run_attempt(attempt, entity, integration, memo) {
                Ok(items) if !items.is_empty() => {
                    info!(
                        "{}: {} active items via {}",
                        entity.id,
                        items.len(),
                        attempt.label()
                    );
                    return items;
                }
                Ok(_) => debug!("{}: {} yielded no active items", entity.id, attempt.label()),
                Err(err) => warn!("{}: {} failed: {err}", entity.id, attempt.label()),
            }
        }

        info!("{}: no active items found", entity.id);
        Vec::new()
    }

    fn run_attempt(
        &self,
        attempt: &ExtractionAttempt,
        entity: &RawEntity,
        integration: IntegrationKind,
        memo: &StatesMemo<'_>,
    ) -> Result<Vec<NormalizedItem>, ApiError> {
        match *attempt {
            ExtractionAttempt::ServiceCall { raw_list_id } => {
                let list_id = raw_list_id.then(|| entity.object_id());
                let request = self.client.build_get_items_service(&entity.id, list_id)?;
                let response = self.transport.execute(request)?;
                let raw = self.client.parse_get_items_service(response, &entity.id)?;
                Ok(normalize(&raw, integration))
            }
            ExtractionAttempt::StateAttribute(probe) => {
                Ok(probe_attributes(entity, probe, integration))
            }
            ExtractionAttempt::PurchaseItemsMap => Ok(match entity.attribute("purchase_items") {
                Some(Value::Object(purchase_items)) => normalize_purchase_map(purchase_items),
                _ => Vec::new(),
            }),
            ExtractionAttempt::RelatedEntity {
                probe,
                provider_hint,
            } => self.scan_related(entity, probe, provider_hint, integration, memo),
            ExtractionAttempt::TodoApiEndpoint => {
                let response = self.transport.execute(self.client.build_todo_items(&entity.id))?;
                let raw = self.client.parse_todo_items(response)?;
                Ok(normalize(&raw, integration))
            }
            ExtractionAttempt::LegacyShoppingList => self.fetch_legacy_items(),
        }
    }

    fn scan_related(
        &self,
        entity: &RawEntity,
        probe: AttributeProbe,
        provider_hint: &str,
        integration: IntegrationKind,
        memo: &StatesMemo<'_>,
    ) -> Result<Vec<NormalizedItem>, ApiError> {
        let Some(claimed) = entity.claimed_item_count() else {
            debug!("{}: state claims no items, skipping related scan", entity.id);
            return Ok(Vec::new());
        };
        debug!("{}: state claims {claimed} items, scanning related entities", entity.id);

        let states = memo.get(self)?;
        for candidate in related_candidates(states, entity, provider_hint) {
            let items = probe_attributes(candidate, probe, integration);
            if !items.is_empty() {
                info!("{}: using items of related entity {}", entity.id, candidate.id);
                return Ok(items);
            }
        }
        Ok(Vec::new())
    }
}

fn probe_attributes(
    entity: &RawEntity,
    probe: AttributeProbe,
    integration: IntegrationKind,
) -> Vec<NormalizedItem> {
    match probe.probe(&entity.attributes) {
        Some((name, raw)) => {
            debug!("{}: {} raw items in attribute '{name}'", entity.id, raw.len());
            normalize(raw, integration)
        }
        None => Vec::new(),
    }
}

/// `todo.*` and `sensor.*` entities other than `target` whose id contains the
/// target's object id or, case-insensitively, `provider_hint`.
pub fn related_candidates<'a>(
    states: &'a [RawEntity],
    target: &RawEntity,
    provider_hint: &str,
) -> Vec<&'a RawEntity> {
    let base = target.object_id();
    let hint = provider_hint.to_lowercase();
    states
        .iter()
        .filter(|e| e.id.starts_with("todo.") || e.id.starts_with("sensor."))
        .filter(|e| e.id != target.id)
        .filter(|e| {
            (!base.is_empty() && e.id.contains(base))
                || (!hint.is_empty() && e.id.to_lowercase().contains(&hint))
        })
        .collect()
}

/// Request-scoped copy of `/api/states`, fetched at most once per resolution.
#[derive(Default)]
struct StatesMemo<'s> {
    preloaded: Option<&'s [RawEntity]>,
    fetched: OnceCell<Vec<RawEntity>>,
}

impl<'s> StatesMemo<'s> {
    fn preloaded(states: &'s [RawEntity]) -> Self {
        Self {
            preloaded: Some(states),
            fetched: OnceCell::new(),
        }
    }

    fn get<T: Transport>(&self, resolver: &ListResolver<T>) -> Result<&[RawEntity], ApiError> {
        if let Some(states) = self.preloaded {
            return Ok(states);
        }
        if let Some(states) = self.fetched.get() {
            return Ok(states);
        }
        let states = resolver.fetch_states()?;
        Ok(self.fetched.get_or_init(|| states))
    }
}
