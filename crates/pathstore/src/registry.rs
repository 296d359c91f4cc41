//! Registry of named stores and the data-access facade.

use crate::debounce::Debouncer;
use crate::session::SessionStore;
use crate::store::{Store, StoreOptions};
use pathstore_query::{parse, query_to_string, ParseError, ParsedPath, PathEval};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Default quiescence window for subscriber deliveries.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store name already in use: {0}")]
    DuplicateStore(String),
    #[error("no store registered under the name: {0}")]
    UnknownStore(String),
    #[error("no data at path: {0}")]
    NoData(String),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Explicit registry of named stores.
///
/// Owns every store it registers, the shared debouncer thread, and
/// the optional session side-store. Passed by reference to whatever
/// needs store lookup; there is no process-wide registry.
pub struct StoreRegistry {
    stores: Mutex<BTreeMap<String, Arc<Store>>>,
    session: Option<Arc<dyn SessionStore>>,
    session_all: Arc<AtomicBool>,
    debouncer: Arc<Debouncer>,
    next_subscriber_id: Arc<AtomicU64>,
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::with_options(None, DEFAULT_DEBOUNCE_WINDOW)
    }

    pub fn with_options(
        session: Option<Arc<dyn SessionStore>>,
        debounce_window: Duration,
    ) -> Self {
        Self {
            stores: Mutex::new(BTreeMap::new()),
            session,
            session_all: Arc::new(AtomicBool::new(false)),
            debouncer: Arc::new(Debouncer::new(debounce_window)),
            next_subscriber_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Enable session persistence for every store in this registry.
    pub fn set_session_all(&self, enabled: bool) {
        self.session_all.store(enabled, Ordering::Relaxed);
    }

    /// Register a new store. When session persistence applies and a
    /// snapshot was persisted earlier, it overrides `default_data`.
    pub fn register(
        &self,
        name: &str,
        default_data: Value,
        options: StoreOptions,
    ) -> Result<Arc<Store>, StoreError> {
        let mut stores = self.stores.lock().unwrap_or_else(|e| e.into_inner());
        if stores.contains_key(name) {
            return Err(StoreError::DuplicateStore(name.to_owned()));
        }
        let persisted = if options.session || self.session_all.load(Ordering::Relaxed) {
            self.session
                .as_ref()
                .and_then(|session| session.get_item(name))
        } else {
            None
        };
        let data = persisted.unwrap_or(default_data);
        let store = Arc::new(Store::new(
            name.to_owned(),
            data,
            options,
            Arc::clone(&self.session_all),
            self.session.clone(),
            Arc::clone(&self.debouncer),
            Arc::clone(&self.next_subscriber_id),
        ));
        stores.insert(name.to_owned(), Arc::clone(&store));
        debug!(store = name, "registered store");
        Ok(store)
    }

    /// Look up a store by name.
    pub fn store(&self, name: &str) -> Result<Arc<Store>, StoreError> {
        let stores = self.stores.lock().unwrap_or_else(|e| e.into_inner());
        stores
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::UnknownStore(name.to_owned()))
    }

    /// Remove a store from the registry, returning it to the caller
    /// for teardown.
    pub fn unregister(&self, name: &str) -> Result<Arc<Store>, StoreError> {
        let mut stores = self.stores.lock().unwrap_or_else(|e| e.into_inner());
        stores
            .remove(name)
            .ok_or_else(|| StoreError::UnknownStore(name.to_owned()))
    }

    /// Data-access facade: parse `expression`, resolve each segment
    /// against its store's current snapshot, and merge union segments
    /// into one mapping keyed by segment name.
    ///
    /// Unknown stores and absent results are escalated to errors here;
    /// the evaluator itself never fails.
    pub fn data(&self, expression: &str) -> Result<Value, StoreError> {
        match parse(expression)? {
            ParsedPath::Single(query) => {
                let snapshot = self.store(&query.store)?.data();
                PathEval::resolve(&query, &snapshot)
                    .ok_or_else(|| StoreError::NoData(expression.to_owned()))
            }
            ParsedPath::Union(queries) => {
                let mut out = Map::new();
                for query in &queries {
                    let snapshot = self.store(&query.store)?.data();
                    // Resolve unwrapped; the union wraps each segment
                    // under its name instead.
                    let mut unwrapped = query.clone();
                    unwrapped.name = None;
                    let value = PathEval::resolve(&unwrapped, &snapshot)
                        .ok_or_else(|| StoreError::NoData(query_to_string(query)))?;
                    let name = query
                        .name
                        .clone()
                        .unwrap_or_else(|| query.store.clone());
                    out.insert(name, value);
                }
                Ok(Value::Object(out))
            }
        }
    }
}
