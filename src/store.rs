//! The authoritative state store: snapshots, path-keyed patches, and the
//! timeout-bounded client used by everything else.

use crate::config::StoreConfig;
use crate::errors::{StoreError, StoreResult};
use crate::player::StoredPlayer;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Top-level key that wraps everything in the legacy layout.
pub const LEGACY_ROOT: &str = "pkm";

/// Where the game state lives inside the store document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreLayout {
    #[default]
    Current,
    /// Everything nested under a `pkm` object, addressed as `pkm.<path>`.
    Legacy,
}

impl StoreLayout {
    pub fn detect(root: &Value) -> Self {
        let has_current_keys = ["player", "world_state", "settings"]
            .iter()
            .any(|key| root.get(*key).is_some());
        let has_legacy_root = root.get(LEGACY_ROOT).is_some_and(Value::is_object);
        if has_legacy_root && !has_current_keys {
            StoreLayout::Legacy
        } else {
            StoreLayout::Current
        }
    }
}

/// A point-in-time copy of the store document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    layout: StoreLayout,
    root: Value,
}

impl StoreSnapshot {
    pub fn new(root: Value) -> Self {
        Self {
            layout: StoreLayout::detect(&root),
            root,
        }
    }

    pub fn layout(&self) -> StoreLayout {
        self.layout
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// The document holding `player`, `settings` and `world_state`,
    /// whichever layout the store uses.
    pub fn document(&self) -> &Value {
        match self.layout {
            StoreLayout::Current => &self.root,
            StoreLayout::Legacy => self.root.get(LEGACY_ROOT).unwrap_or(&Value::Null),
        }
    }

    pub fn player(&self) -> StoredPlayer {
        StoredPlayer::from_document(self.document())
    }

    pub fn world_state(&self) -> Option<&Value> {
        self.document().get("world_state")
    }

    /// Applies a document-relative patch to this copy.
    pub fn apply(&mut self, patch: &StorePatch) {
        patch.clone().for_layout(self.layout).apply_to(&mut self.root);
    }
}

/// Dotted-path writes and deletions against the store document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StorePatch {
    sets: BTreeMap<String, Value>,
    deletes: BTreeSet<String>,
}

impl StorePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, path: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let path = path.into();
        self.deletes.remove(&path);
        self.sets.insert(path, value.into());
        self
    }

    pub fn delete(&mut self, path: impl Into<String>) -> &mut Self {
        let path = path.into();
        self.sets.remove(&path);
        self.deletes.insert(path);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty() && self.deletes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sets.len() + self.deletes.len()
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.sets.get(path)
    }

    pub fn deletes(&self, path: &str) -> bool {
        self.deletes.contains(path)
    }

    /// Folds `other` in; its entries win on conflicting paths.
    pub fn extend(&mut self, other: StorePatch) {
        for path in other.deletes {
            self.delete(path);
        }
        for (path, value) in other.sets {
            self.set(path, value);
        }
    }

    /// Rewrites every path for the given layout.
    pub fn for_layout(self, layout: StoreLayout) -> StorePatch {
        match layout {
            StoreLayout::Current => self,
            StoreLayout::Legacy => {
                let prefix = |path: String| format!("{}.{}", LEGACY_ROOT, path);
                StorePatch {
                    sets: self.sets.into_iter().map(|(p, v)| (prefix(p), v)).collect(),
                    deletes: self.deletes.into_iter().map(prefix).collect(),
                }
            }
        }
    }

    /// Wire form: one nested object, with deletions as `null`.
    pub fn to_nested(&self) -> Value {
        let mut root = Value::Object(Map::new());
        for path in &self.deletes {
            set_path(&mut root, path, Value::Null);
        }
        for (path, value) in &self.sets {
            set_path(&mut root, path, value.clone());
        }
        root
    }

    /// Applies deletions, then writes, creating intermediate objects.
    pub fn apply_to(&self, doc: &mut Value) {
        for path in &self.deletes {
            remove_path(doc, path);
        }
        for (path, value) in &self.sets {
            set_path(doc, path, value.clone());
        }
    }
}

/// The child of a container node, addressing arrays by index.
fn child_mut<'a>(node: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match node {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
        _ => None,
    }
}

/// Writes `value` at `path`. Missing or null intermediate nodes become
/// objects; an existing scalar or array is never replaced by one, so such a
/// write is skipped.
fn set_path(doc: &mut Value, path: &str, value: Value) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(leaf) = segments.pop() else {
        return;
    };
    let mut node = doc;
    for segment in segments {
        if node.is_null() {
            *node = Value::Object(Map::new());
        }
        node = match node {
            Value::Object(map) => map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
            Value::Array(items) => match segment.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
                Some(next) => next,
                None => {
                    warn!(path, segment, "array index out of range; write skipped");
                    return;
                }
            },
            _ => {
                warn!(path, segment, "store path crosses a non-object value; write skipped");
                return;
            }
        };
    }
    if node.is_null() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => {
            map.insert(leaf.to_string(), value);
        }
        Value::Array(items) => match leaf.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
            Some(slot) => *slot = value,
            None => warn!(path, "array index out of range; write skipped"),
        },
        _ => warn!(path, "store path ends in a non-object value; write skipped"),
    }
}

fn remove_path(doc: &mut Value, path: &str) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(leaf) = segments.pop() else {
        return;
    };
    let mut node = doc;
    for segment in segments {
        match child_mut(node, segment) {
            Some(next) => node = next,
            None => return,
        }
    }
    if let Value::Object(map) = node {
        map.remove(leaf);
    }
}

/// The external key-value document store.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Current document.
    async fn snapshot(&self) -> StoreResult<Value>;

    /// Merges a root-relative patch into the document.
    async fn apply(&self, patch: StorePatch) -> StoreResult<()>;
}

/// A store kept in process memory.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    doc: Arc<RwLock<Value>>,
    latency: Option<Duration>,
}

impl InMemoryStore {
    pub fn new(doc: Value) -> Self {
        Self {
            doc: Arc::new(RwLock::new(doc)),
            latency: None,
        }
    }

    /// Delays every read by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub async fn document(&self) -> Value {
        self.doc.read().await.clone()
    }
}

#[async_trait]
impl StateStore for InMemoryStore {
    async fn snapshot(&self) -> StoreResult<Value> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        Ok(self.doc.read().await.clone())
    }

    async fn apply(&self, patch: StorePatch) -> StoreResult<()> {
        let mut doc = self.doc.write().await;
        if !doc.is_object() {
            return Err(StoreError::InvalidPatch(
                "store document is not an object".to_string(),
            ));
        }
        patch.apply_to(&mut doc);
        Ok(())
    }
}

/// Timeout-bounded reads and fire-and-forget writes.
#[derive(Clone)]
pub struct StoreClient {
    store: Arc<dyn StateStore>,
    read_timeout: Duration,
    write_settle: Duration,
}

impl StoreClient {
    pub fn new(store: Arc<dyn StateStore>, config: &StoreConfig) -> Self {
        Self {
            store,
            read_timeout: config.read_timeout(),
            write_settle: config.write_settle(),
        }
    }

    /// Reads a snapshot; a timeout or a store error degrades to `None`.
    pub async fn read(&self) -> Option<StoreSnapshot> {
        match tokio::time::timeout(self.read_timeout, self.store.snapshot()).await {
            Ok(Ok(root)) => Some(StoreSnapshot::new(root)),
            Ok(Err(e)) => {
                warn!(error = %e, "store read failed; continuing without stored data");
                None
            }
            Err(_) => {
                let e = StoreError::Timeout(self.read_timeout);
                warn!(error = %e, "store read timed out; continuing without stored data");
                None
            }
        }
    }

    /// Spawns the write and returns at once. The handle resolves after the
    /// store accepted the patch and the settle delay elapsed; callers that do
    /// not care about durability can drop it.
    pub fn write(&self, patch: StorePatch, layout: StoreLayout) -> JoinHandle<StoreResult<()>> {
        let store = Arc::clone(&self.store);
        let settle = self.write_settle;
        let patch = patch.for_layout(layout);
        tokio::spawn(async move {
            if patch.is_empty() {
                return Ok(());
            }
            let paths = patch.len();
            let result = store.apply(patch).await;
            match &result {
                Ok(()) => debug!(paths, "store patch applied"),
                Err(e) => warn!(error = %e, "store patch rejected"),
            }
            tokio::time::sleep(settle).await;
            result
        })
    }
}
