//! Relationship read paths.
//!
//! Relationship metadata on the owning type describes how to read the
//! inverse side. A peer that embeds the list directly is read (and, if
//! needed, populated) in place; a peer that only exposes a count goes
//! through the owning type's find with an INCLUDES criterion on the peer
//! id. Complex-object relationships read the same way, with the wrapper
//! records resolved by the standard ingestion path.

use serde_json::json;

use crate::core::error::{Result, StoreError};
use crate::core::value::Value;
use crate::entity::Entity;
use crate::schema::relationship::QueryStrategy;
use crate::store::find::FindQuery;
use crate::store::store::EntityStore;

impl EntityStore {
    /// Every `owning_type` entity whose relationship `field` contains
    /// `peer` — the inverse side of the relationship, read according to
    /// its declared strategy.
    pub async fn related(
        &self,
        peer: &Entity,
        owning_type: &str,
        field: &str,
    ) -> Result<Vec<Entity>> {
        let schema = self.registry().get(owning_type)?;
        let rel = schema
            .relationship(field)
            .ok_or_else(|| StoreError::UnknownField {
                type_name: owning_type.to_string(),
                field: field.to_string(),
            })?;
        if rel.inverse_type != peer.type_name() {
            return Err(StoreError::TypeMismatch {
                expected: rel.inverse_type.clone(),
                actual: peer.type_name().to_string(),
            });
        }

        match rel.query_strategy {
            QueryStrategy::DirectField => {
                let inverse_field = rel.inverse_query_field.clone().ok_or_else(|| {
                    StoreError::UnknownField {
                        type_name: rel.inverse_type.clone(),
                        field: format!("<inverse of {}.{}>", owning_type, field),
                    }
                })?;
                if !peer.has_received(&inverse_field) {
                    self.populate(peer, &[inverse_field.as_str()], false).await?;
                }
                Ok(peer
                    .get(&inverse_field)?
                    .value()
                    .map(Value::entities)
                    .unwrap_or_default())
            }
            QueryStrategy::FilterQuery | QueryStrategy::ComplexObject => {
                let query =
                    FindQuery::new().arg(&format!("{}__in", field), json!(peer.id()));
                self.find(owning_type, &query).await
            }
        }
    }
}
