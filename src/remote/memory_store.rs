use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::instruments::instruments_errors::{InstrumentError, Result};
use crate::instruments::{FieldOp, Instrument, InstrumentUpdate};

use super::remote_store::RemoteInstrumentStore;

/// In-process remote store applying the same `$set`/`$setOnInsert`
/// document semantics as the hosted one. Used in tests and offline runs.
pub struct MemoryStore {
    documents: RwLock<HashMap<String, Map<String, Value>>>,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            fail_writes: false,
        }
    }

    /// Makes every subsequent upsert fail, for exercising commit aborts.
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteInstrumentStore for MemoryStore {
    async fn find_by_symbol(&self, symbol: &str) -> Result<Option<Instrument>> {
        let documents = self.documents.read().await;
        match documents.get(symbol) {
            Some(document) => Instrument::from_document(&Value::Object(document.clone())).map(Some),
            None => Ok(None),
        }
    }

    async fn upsert(&self, symbol: &str, update: &InstrumentUpdate) -> Result<Instrument> {
        if self.fail_writes {
            return Err(InstrumentError::RemoteWrite(
                "simulated remote failure".to_string(),
            ));
        }

        let mut documents = self.documents.write().await;
        let document = documents.entry(symbol.to_string()).or_insert_with(|| {
            // First write for this symbol: the insert-only fields apply.
            update
                .set_on_insert
                .iter()
                .map(|(field, value)| (field.clone(), value.clone()))
                .collect()
        });

        for (field, op) in &update.set {
            match op {
                FieldOp::Set(value) => {
                    document.insert(field.clone(), value.clone());
                }
                FieldOp::Unset => {
                    document.remove(field);
                }
            }
        }

        Instrument::from_document(&Value::Object(document.clone()))
    }
}
