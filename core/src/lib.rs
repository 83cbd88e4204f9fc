//! Shopping list resolution against a Home Assistant instance.
//!
//! # Overview
//! Enumerates every todo-style list and returns the active items of one list,
//! whichever integration backs it (Local To-do, Google Tasks, Todoist, CalDAV,
//! Alexa, Bring!, or the legacy shopping list).
//!
//! # Design
//! - `HassClient` is stateless: it builds `HttpRequest` values and parses
//!   `HttpResponse` values without touching the network. A `Transport`
//!   performs the round-trip (host-does-IO pattern), so everything above it is
//!   deterministic under a stub transport.
//! - `classify` picks an `IntegrationKind` from one entity snapshot;
//!   `attempts_for` maps it to a fixed extraction chain; `normalize` turns raw
//!   provider records into `NormalizedItem`s and drops completed ones.
//! - `ListResolver` ties these together and never fails on provider errors,
//!   only on configuration problems.

pub mod classifier;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod logger;
pub mod normalizer;
pub mod resolver;
pub mod strategy;
pub mod types;

pub use classifier::classify;
pub use client::HassClient;
pub use config::{Config, HomeAssistantConfig, LoggingConfig};
pub use error::{ApiError, ConfigError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use normalizer::{normalize, normalize_purchase_map};
pub use resolver::ListResolver;
pub use strategy::{attempts_for, AttributeProbe, ExtractionAttempt};
pub use types::{
    IntegrationKind, ItemStatus, ListSummary, NormalizedItem, RawEntity, ResolvedItems,
    LEGACY_SHOPPING_LIST_ID,
};
