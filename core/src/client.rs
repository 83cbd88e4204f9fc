//! Stateless request builder and response parser for the Home Assistant REST API.
//!
//! # Design
//! `HassClient` holds only the base URL and the bearer token. Each call is
//! split into a `build_*` method producing an `HttpRequest` and a `parse_*`
//! method consuming an `HttpResponse`; a `Transport` runs the round-trip in
//! between. Item payloads stay as raw JSON values for the normalizer.

use serde_json::{json, Value};

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::RawEntity;

/// Request builder for one Home Assistant instance.
#[derive(Clone)]
pub struct HassClient {
    base_url: String,
    token: String,
}

impl std::fmt::Debug for HassClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HassClient")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl HassClient {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn headers(&self) -> Vec<(String, String)> {
        vec![
            ("authorization".to_string(), format!("Bearer {}", self.token)),
            ("content-type".to_string(), "application/json".to_string()),
        ]
    }

    fn get(&self, path: String) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path,
            query: Vec::new(),
            headers: self.headers(),
            body: None,
        }
    }

    pub fn build_list_states(&self) -> HttpRequest {
        self.get(format!("{}/api/states", self.base_url))
    }

    pub fn build_get_state(&self, entity_id: &str) -> HttpRequest {
        self.get(format!("{}/api/states/{entity_id}", self.base_url))
    }

    /// `todo.get_items` with `return_response`. `list_id` adds the raw
    /// provider list id some Bring setups expect next to the entity id.
    pub fn build_get_items_service(
        &self,
        entity_id: &str,
        list_id: Option<&str>,
    ) -> Result<HttpRequest, ApiError> {
        let mut payload = json!({ "entity_id": entity_id });
        if let Some(list_id) = list_id {
            payload["list_id"] = Value::String(list_id.to_string());
        }
        let body =
            serde_json::to_string(&payload).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: format!("{}/api/services/todo/get_items?return_response", self.base_url),
            query: Vec::new(),
            headers: self.headers(),
            body: Some(body),
        })
    }

    pub fn build_todo_items(&self, entity_id: &str) -> HttpRequest {
        let mut request = self.get(format!("{}/api/todo/items", self.base_url));
        request.query.push(("entity_id".to_string(), entity_id.to_string()));
        request
    }

    pub fn build_shopping_list(&self) -> HttpRequest {
        self.get(format!("{}/api/shopping_list", self.base_url))
    }

    /// Decode `/api/states`. Entries that do not look like an entity are
    /// skipped so one odd sibling cannot hide every list.
    pub fn parse_list_states(&self, response: HttpResponse) -> Result<Vec<RawEntity>, ApiError> {
        check_status(&response)?;
        let entries: Vec<Value> = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::DeserializationError(e.to_string()))?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<RawEntity>(entry) {
                Ok(entity) if !entity.id.is_empty() => Some(entity),
                Ok(_) => {
                    log::debug!("skipping state without entity_id");
                    None
                }
                Err(e) => {
                    log::debug!("skipping undecodable state: {e}");
                    None
                }
            })
            .collect())
    }

    pub fn parse_get_state(&self, response: HttpResponse) -> Result<RawEntity, ApiError> {
        check_status(&response)?;
        serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))
    }

    /// Extract the raw items of `entity_id` from a service response.
    ///
    /// Accepts a flat `{"items": [...]}`, the `{"service_response": {id: {"items": [...]}}}`
    /// envelope, and the bare `{id: {"items": [...]}}` map older servers return.
    /// A well-formed response that carries no items yields an empty vector.
    pub fn parse_get_items_service(
        &self,
        response: HttpResponse,
        entity_id: &str,
    ) -> Result<Vec<Value>, ApiError> {
        check_status(&response)?;
        let body: Value = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::DeserializationError(e.to_string()))?;
        let Value::Object(root) = body else {
            return Err(ApiError::DeserializationError(
                "service response is not an object".to_string(),
            ));
        };

        if let Some(items) = root.get("items") {
            return items_array(items);
        }
        if let Some(envelope) = root.get("service_response") {
            return match envelope.get(entity_id).and_then(|entity| entity.get("items")) {
                Some(items) => items_array(items),
                None => Ok(Vec::new()),
            };
        }
        match root.get(entity_id).and_then(|entity| entity.get("items")) {
            Some(items) => items_array(items),
            None => Ok(Vec::new()),
        }
    }

    pub fn parse_todo_items(&self, response: HttpResponse) -> Result<Vec<Value>, ApiError> {
        check_status(&response)?;
        parse_array(&response.body)
    }

    pub fn parse_shopping_list(&self, response: HttpResponse) -> Result<Vec<Value>, ApiError> {
        check_status(&response)?;
        parse_array(&response.body)
    }
}

fn parse_array(body: &str) -> Result<Vec<Value>, ApiError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| ApiError::DeserializationError(e.to_string()))?;
    items_array(&value)
}

fn items_array(value: &Value) -> Result<Vec<Value>, ApiError> {
    match value {
        Value::Array(items) => Ok(items.clone()),
        Value::Null => Ok(Vec::new()),
        other => Err(ApiError::DeserializationError(format!(
            "expected an item array, got {}",
            type_name(other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    match response.status {
        200..=299 => Ok(()),
        401 => Err(ApiError::Unauthorized),
        404 => Err(ApiError::NotFound),
        status => Err(ApiError::HttpError {
            status,
            body: response.body.clone(),
        }),
    }
}
