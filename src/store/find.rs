//! Read-through search with the compact filter DSL.
//!
//! A criterion key is either a plain field name (exact match) or
//! `field__modifier`. The INCLUDES translation is schema-aware: a
//! multi-valued field gets a list criterion, a string-typed field a single
//! scalar — the remote rejects the wrong shape.

use std::collections::VecDeque;

use futures::stream::{self, Stream};
use serde_json::{json, Map, Value as JsonValue};
use tracing::debug;

use crate::core::error::{Result, StoreError};
use crate::entity::Entity;
use crate::ops;
use crate::schema::entity::EntitySchema;
use crate::store::store::EntityStore;

/// Builder for find criteria.
///
/// ```
/// use graphstore::store::FindQuery;
/// use serde_json::json;
///
/// let query = FindQuery::new()
///     .arg("title__contains", json!("interview"))
///     .arg("rating100__gte", json!(80))
///     .arg("studio__null", json!(false));
/// assert_eq!(query.len(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FindQuery {
    criteria: Vec<(String, JsonValue)>,
}

impl FindQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, key: &str, value: JsonValue) -> Self {
        self.criteria.push((key.to_string(), value));
        self
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }
}

impl EntityStore {
    /// Search the remote catalog. Results pass through the identity map
    /// and are cached. Capped at [`EntityStore::FIND_LIMIT`] results;
    /// larger result sets must use `find_iter`.
    pub async fn find(&self, type_name: &str, query: &FindQuery) -> Result<Vec<Entity>> {
        let (_, count) = self.find_page(type_name, query, 1, 1).await?;
        if count > Self::FIND_LIMIT {
            return Err(StoreError::ResultLimit {
                count,
                limit: Self::FIND_LIMIT,
            });
        }
        if count == 0 {
            return Ok(Vec::new());
        }
        let (items, _) = self.find_page(type_name, query, 1, count).await?;
        Ok(items)
    }

    /// First match, or `None`.
    pub async fn find_one(&self, type_name: &str, query: &FindQuery) -> Result<Option<Entity>> {
        let (items, _) = self.find_page(type_name, query, 1, 1).await?;
        Ok(items.into_iter().next())
    }

    /// Lazy search yielding one entity at a time, fetching pages of
    /// `query_batch` on demand. Dropping the stream early abandons the
    /// remaining pages.
    pub fn find_iter<'a>(
        &'a self,
        type_name: &'a str,
        query: FindQuery,
        query_batch: usize,
    ) -> impl Stream<Item = Result<Entity>> + 'a {
        let batch = query_batch.max(1);
        struct IterState {
            page: usize,
            buffer: VecDeque<Entity>,
            done: bool,
            query: FindQuery,
        }
        let state = IterState {
            page: 1,
            buffer: VecDeque::new(),
            done: false,
            query,
        };
        stream::try_unfold(state, move |mut state| async move {
            loop {
                if let Some(entity) = state.buffer.pop_front() {
                    return Ok(Some((entity, state)));
                }
                if state.done {
                    return Ok(None);
                }
                let (items, _) = self
                    .find_page(type_name, &state.query, state.page, batch)
                    .await?;
                state.done = items.len() < batch;
                state.page += 1;
                if items.is_empty() {
                    return Ok(None);
                }
                state.buffer.extend(items);
            }
        })
    }

    pub(crate) async fn find_page(
        &self,
        type_name: &str,
        query: &FindQuery,
        page: usize,
        per_page: usize,
    ) -> Result<(Vec<Entity>, usize)> {
        let schema = self.registry().get(type_name)?;
        let entity_filter = translate_criteria(&schema, query)?;

        let mut variables = Map::new();
        variables.insert(
            "filter".to_string(),
            json!({ "page": page, "per_page": per_page }),
        );
        if !entity_filter.is_empty() {
            variables.insert(
                ops::filter_variable_key(type_name),
                JsonValue::Object(entity_filter),
            );
        }

        let operation = ops::find_many_operation(type_name);
        debug!(type_name, page, per_page, "executing find");
        let result = self
            .transport()
            .execute(&operation, JsonValue::Object(variables))
            .await?;

        let data = result
            .get(&operation)
            .and_then(JsonValue::as_object)
            .ok_or_else(|| {
                StoreError::Payload(format!("missing '{}' in find response", operation))
            })?;
        let count = data
            .get("count")
            .and_then(JsonValue::as_u64)
            .unwrap_or(0) as usize;

        let items_key = ops::result_items_key(type_name);
        let mut items = Vec::new();
        if let Some(raw_items) = data.get(&items_key).and_then(JsonValue::as_array) {
            for raw in raw_items {
                items.push(self.ingest(type_name, raw.clone())?);
            }
        }
        Ok((items, count))
    }
}

/// Translate DSL criteria into the remote's per-field criterion objects.
fn translate_criteria(schema: &EntitySchema, query: &FindQuery) -> Result<Map<String, JsonValue>> {
    let mut filter = Map::new();
    for (key, value) in &query.criteria {
        // Nested sub-filters and raw criterion objects pass straight through.
        if key.ends_with("_filter") {
            filter.insert(key.clone(), value.clone());
            continue;
        }
        if value
            .as_object()
            .map(|m| m.contains_key("modifier"))
            .unwrap_or(false)
        {
            filter.insert(key.clone(), value.clone());
            continue;
        }

        let (field, modifier) = parse_lookup(key)?;
        let criterion = build_criterion(schema, &field, &modifier, value)?;
        filter.insert(field, criterion);
    }
    Ok(filter)
}

fn parse_lookup(key: &str) -> Result<(String, String)> {
    let (field, lookup) = match key.rsplit_once("__") {
        Some((field, lookup)) => (field, lookup),
        None => return Ok((key.to_string(), "EQUALS".to_string())),
    };
    let modifier = match lookup {
        "exact" => "EQUALS",
        "contains" | "in" => "INCLUDES",
        "regex" => "MATCHES_REGEX",
        // The remote exposes only strict comparisons.
        "gt" | "gte" => "GREATER_THAN",
        "lt" | "lte" => "LESS_THAN",
        "between" => "BETWEEN",
        "null" => "IS_NULL",
        _ => return Err(StoreError::InvalidFilter(key.to_string())),
    };
    Ok((field.to_string(), modifier.to_string()))
}

fn build_criterion(
    schema: &EntitySchema,
    field: &str,
    modifier: &str,
    value: &JsonValue,
) -> Result<JsonValue> {
    match modifier {
        "IS_NULL" => {
            let wants_null = value.as_bool().unwrap_or(true);
            let modifier = if wants_null { "IS_NULL" } else { "NOT_NULL" };
            Ok(json!({ "value": "", "modifier": modifier }))
        }
        "BETWEEN" => match value.as_array() {
            Some(bounds) if bounds.len() == 2 => Ok(json!({
                "value": bounds[0],
                "value2": bounds[1],
                "modifier": "BETWEEN",
            })),
            _ => Err(StoreError::InvalidFilter(format!(
                "{}__between expects a two-element array",
                field
            ))),
        },
        "INCLUDES" => {
            let multi_valued = schema
                .field(field)
                .map(|d| d.field_type.is_list() || d.field_type.is_reference())
                .unwrap_or(false);
            let wire_value = if multi_valued {
                match value {
                    JsonValue::Array(_) => value.clone(),
                    other => json!([other]),
                }
            } else {
                value.clone()
            };
            Ok(json!({ "value": wire_value, "modifier": "INCLUDES" }))
        }
        other => Ok(json!({ "value": value, "modifier": other })),
    }
}
