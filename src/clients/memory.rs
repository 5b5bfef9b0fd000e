//! In-process implementations of the store traits

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use tracing::debug;

use crate::clients::traits::{KeyValueStore, RecordStore};
use crate::clients::types::{Document, Order, Predicate};
use crate::error::{Error, Result};

/// Document store kept in memory, with the same query surface as the backend
#[derive(Default)]
pub struct InMemoryStore {
    collections: Mutex<HashMap<String, BTreeMap<String, Value>>>,
    writes: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document under a known id
    pub fn insert(&self, collection: &str, id: &str, data: Value) {
        self.collections
            .lock()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), data);
    }

    /// Number of create/update/delete calls served so far
    pub fn write_count(&self) -> usize {
        self.writes.load(AtomicOrdering::SeqCst)
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }
}

/// Resolve a dotted path such as `metadata.userId`
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, segment| current.get(segment))
}

fn set_path(target: &mut Value, path: &str, value: Value) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(last) = segments.pop() else {
        return;
    };
    let mut current = target;
    for segment in segments {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        current = &mut current[segment];
    }
    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    current[last] = value;
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .unwrap_or(0.0)
            .partial_cmp(&y.as_f64().unwrap_or(0.0))
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        // Missing fields sort first, like the backend does for nulls
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Document> {
        self.collections
            .lock()
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|data| Document {
                id: id.to_string(),
                data: data.clone(),
            })
            .ok_or_else(|| Error::not_found(collection, id))
    }

    async fn query(
        &self,
        collection: &str,
        predicates: &[Predicate],
        order: Option<&Order>,
        limit: Option<usize>,
    ) -> Result<Vec<Document>> {
        let mut docs: Vec<Document> = {
            let collections = self.collections.lock();
            let Some(all) = collections.get(collection) else {
                return Ok(Vec::new());
            };
            all.iter()
                .filter(|(_, data)| {
                    predicates
                        .iter()
                        .all(|p| lookup(data, &p.field) == Some(&p.value))
                })
                .map(|(id, data)| Document {
                    id: id.clone(),
                    data: data.clone(),
                })
                .collect()
        };

        if let Some(order) = order {
            docs.sort_by(|a, b| {
                let ordering =
                    compare_values(lookup(&a.data, &order.field), lookup(&b.data, &order.field));
                if order.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }
        if let Some(limit) = limit {
            docs.truncate(limit);
        }

        debug!(collection, matched = docs.len(), "In-memory query");
        Ok(docs)
    }

    async fn create(&self, collection: &str, data: Value) -> Result<String> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.insert(collection, &id, data);
        self.writes.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<()> {
        let Value::Object(fields) = patch else {
            return Err(Error::Store("update patch must be an object".to_string()));
        };

        let mut collections = self.collections.lock();
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| Error::not_found(collection, id))?;
        for (path, value) in fields {
            set_path(doc, &path, value);
        }
        self.writes.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let removed = self
            .collections
            .lock()
            .get_mut(collection)
            .and_then(|docs| docs.remove(id));
        if removed.is_none() {
            return Err(Error::not_found(collection, id));
        }
        self.writes.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(())
    }
}

/// Key-value store that lives for the process only
#[derive(Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}
