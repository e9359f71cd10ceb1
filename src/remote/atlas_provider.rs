use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};

use crate::instruments::instruments_errors::{InstrumentError, Result};
use crate::instruments::{FieldOp, Instrument, InstrumentUpdate};

use super::remote_store::RemoteInstrumentStore;

/// Connection settings for a MongoDB-Atlas-style Data API endpoint.
#[derive(Debug, Clone)]
pub struct AtlasConfig {
    pub base_url: String,
    pub api_key: String,
    pub data_source: String,
    pub database: String,
    pub collection: String,
}

impl AtlasConfig {
    pub fn new(base_url: String, api_key: String, data_source: String, database: String) -> Self {
        Self {
            base_url,
            api_key,
            data_source,
            database,
            collection: "instruments".to_string(),
        }
    }
}

/// Remote store talking to the hosted document database over its HTTP
/// Data API (`findOne` / `updateOne` actions).
pub struct AtlasProvider {
    client: Client,
    config: AtlasConfig,
}

impl AtlasProvider {
    pub fn new(config: AtlasConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    async fn action(&self, action: &str, payload: Value) -> Result<Value> {
        let url = format!(
            "{}/action/{}",
            self.config.base_url.trim_end_matches('/'),
            action
        );

        let response = self
            .client
            .post(&url)
            .header("api-key", &self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| InstrumentError::RemoteStore(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InstrumentError::RemoteStore(format!(
                "{} returned {}",
                action, status
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| InstrumentError::RemoteStore(e.to_string()))
    }

    fn scoped(&self, rest: Value) -> Value {
        let mut payload = json!({
            "dataSource": self.config.data_source,
            "database": self.config.database,
            "collection": self.config.collection,
        });
        if let (Some(base), Some(extra)) = (payload.as_object_mut(), rest.as_object()) {
            for (key, value) in extra {
                base.insert(key.clone(), value.clone());
            }
        }
        payload
    }
}

#[async_trait]
impl RemoteInstrumentStore for AtlasProvider {
    async fn find_by_symbol(&self, symbol: &str) -> Result<Option<Instrument>> {
        let payload = self.scoped(json!({
            "filter": { "symbol": symbol },
            "projection": { "_id": 0 },
        }));

        let response = self.action("findOne", payload).await?;
        match response.get("document") {
            None | Some(Value::Null) => Ok(None),
            Some(document) => Instrument::from_document(document).map(Some),
        }
    }

    async fn upsert(&self, symbol: &str, update: &InstrumentUpdate) -> Result<Instrument> {
        let mut set = Map::new();
        let mut unset = Map::new();
        for (field, op) in &update.set {
            match op {
                FieldOp::Set(value) => {
                    set.insert(field.clone(), value.clone());
                }
                FieldOp::Unset => {
                    unset.insert(field.clone(), json!(""));
                }
            }
        }

        let mut update_doc = Map::new();
        update_doc.insert("$set".to_string(), Value::Object(set));
        if !unset.is_empty() {
            update_doc.insert("$unset".to_string(), Value::Object(unset));
        }
        update_doc.insert(
            "$setOnInsert".to_string(),
            Value::Object(update.set_on_insert.clone().into_iter().collect()),
        );

        let payload = self.scoped(json!({
            "filter": { "symbol": symbol },
            "update": Value::Object(update_doc),
            "upsert": true,
        }));

        self.action("updateOne", payload).await.map_err(|e| match e {
            InstrumentError::RemoteStore(message) => InstrumentError::RemoteWrite(message),
            other => other,
        })?;

        // The caller mirrors the complete record, not the delta.
        self.find_by_symbol(symbol)
            .await?
            .ok_or_else(|| InstrumentError::RemoteWrite("record absent after upsert".to_string()))
    }
}
