//! Store container: snapshot, updates, subscriptions.

use crate::debounce::Debouncer;
use crate::session::SessionStore;
use pathstore_query::{PathEval, PathStep, Query};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Hook run whenever something subscribes to a store. The usual use
/// is lazily fetching the initial data of a store that only matters
/// once someone is listening.
pub type OnSubscribe = Arc<dyn Fn() + Send + Sync>;

/// Callback receiving projected snapshots. An absent projection is
/// delivered as `null`.
pub type SubscriberFn = Arc<dyn Fn(Value) + Send + Sync>;

/// Options accepted at store registration.
#[derive(Default, Clone)]
pub struct StoreOptions {
    /// Persist this store's snapshot to the session side-store.
    pub session: bool,
    /// Runs on every subscribe.
    pub on_subscribe: Option<OnSubscribe>,
}

/// What part of the store a subscriber watches, and when deliveries
/// are suppressed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Path to project out of the snapshot before comparing/delivering.
    pub store_path: Vec<PathStep>,
    /// Inclusion filter applied to the projection.
    pub just: Option<Vec<String>>,
    /// Exclusion filter applied to the projection.
    pub not: Option<Vec<String>>,
    /// Suppress deliveries whose projected mapping has `key == value`.
    pub filter: Option<(String, String)>,
}

struct Subscriber {
    projection: Query,
    filter: Option<(String, String)>,
    last: Option<Value>,
    deliver: SubscriberFn,
}

/// Named container of the current snapshot of a nested data value.
///
/// Created through [`crate::StoreRegistry::register`]; updates are
/// serialized behind the snapshot lock, and change notifications are
/// delivered per subscriber through the registry's debouncer.
pub struct Store {
    name: String,
    data: Mutex<Value>,
    subscribers: Mutex<BTreeMap<u64, Subscriber>>,
    on_subscribe: Mutex<Option<OnSubscribe>>,
    use_session: AtomicBool,
    session_all: Arc<AtomicBool>,
    session: Option<Arc<dyn SessionStore>>,
    debouncer: Arc<Debouncer>,
    next_subscriber_id: Arc<AtomicU64>,
}

/// Handle to one subscription. Calling [`Subscription::unsubscribe`]
/// removes the subscriber and clears any pending flush.
pub struct Subscription {
    store: Arc<Store>,
    id: u64,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn unsubscribe(self) {
        self.store.remove_subscriber(self.id);
    }
}

impl Store {
    pub(crate) fn new(
        name: String,
        data: Value,
        options: StoreOptions,
        session_all: Arc<AtomicBool>,
        session: Option<Arc<dyn SessionStore>>,
        debouncer: Arc<Debouncer>,
        next_subscriber_id: Arc<AtomicU64>,
    ) -> Self {
        Self {
            name,
            data: Mutex::new(data),
            subscribers: Mutex::new(BTreeMap::new()),
            on_subscribe: Mutex::new(options.on_subscribe),
            use_session: AtomicBool::new(options.session),
            session_all,
            session,
            debouncer,
            next_subscriber_id,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// A copy of the current snapshot.
    pub fn data(&self) -> Value {
        self.data.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Replace the on-subscribe hook.
    pub fn set_on_subscribe(&self, hook: OnSubscribe) {
        let mut slot = self.on_subscribe.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(hook);
    }

    /// Enable session persistence for this store.
    pub fn use_session(&self) {
        self.use_session.store(true, Ordering::Relaxed);
    }

    /// Update the snapshot and broadcast to subscribers.
    ///
    /// A deep-equal input is skipped. A mapping input is shallow
    /// merged over a mapping snapshot; anything else replaces the
    /// snapshot wholesale.
    pub fn update(&self, data: Value) {
        self.apply_update(data, false);
    }

    /// Update without broadcasting; subscribers' last-seen
    /// projections are refreshed so the change is never delivered.
    pub fn silent_update(&self, data: Value) {
        self.apply_update(data, true);
    }

    fn apply_update(&self, incoming: Value, silent: bool) {
        let current = {
            let mut snapshot = self.data.lock().unwrap_or_else(|e| e.into_inner());
            if *snapshot == incoming {
                debug!(store = %self.name, "store skipped update, data unchanged");
                return;
            }
            *snapshot = Self::merge(&snapshot, incoming);
            debug!(store = %self.name, silent, "store updated");
            snapshot.clone()
        };
        if self.use_session.load(Ordering::Relaxed) || self.session_all.load(Ordering::Relaxed) {
            if let Some(session) = &self.session {
                session.set_item(&self.name, current.clone());
            }
        }
        self.notify(&current, silent);
    }

    fn merge(current: &Value, incoming: Value) -> Value {
        match (current, incoming) {
            (Value::Object(base), Value::Object(patch)) => {
                let mut merged = base.clone();
                for (key, value) in patch {
                    merged.insert(key, value);
                }
                Value::Object(merged)
            }
            (_, other) => other,
        }
    }

    fn notify(&self, data: &Value, silent: bool) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        for (id, subscriber) in subscribers.iter_mut() {
            let projected = PathEval::resolve(&subscriber.projection, data);
            if silent {
                subscriber.last = projected;
                continue;
            }
            if subscriber.last == projected {
                continue;
            }
            subscriber.last = projected.clone();
            let value = projected.unwrap_or(Value::Null);
            if let Some((key, text)) = &subscriber.filter {
                if PathEval::field_matches(&value, key, text) {
                    continue;
                }
            }
            self.debouncer
                .schedule(*id, value, Arc::clone(&subscriber.deliver));
        }
    }

    /// Subscribe to a projection of this store.
    ///
    /// The callback fires only when the projection deep-differs from
    /// its last-seen value, debounced on the registry's quiescence
    /// window. There is no initial delivery.
    pub fn subscribe(
        self: &Arc<Self>,
        options: SubscribeOptions,
        callback: impl Fn(Value) + Send + Sync + 'static,
    ) -> Subscription {
        let hook = {
            let slot = self.on_subscribe.lock().unwrap_or_else(|e| e.into_inner());
            slot.clone()
        };
        if let Some(hook) = hook {
            hook();
        }
        let projection = Query {
            name: None,
            store: self.name.clone(),
            prop_name: None,
            store_path: options.store_path,
            just: options.just,
            not: options.not,
        };
        let last = {
            let snapshot = self.data.lock().unwrap_or_else(|e| e.into_inner());
            PathEval::resolve(&projection, &snapshot)
        };
        let id = self.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.insert(
            id,
            Subscriber {
                projection,
                filter: options.filter,
                last,
                deliver: Arc::new(callback),
            },
        );
        Subscription {
            store: Arc::clone(self),
            id,
        }
    }

    pub(crate) fn remove_subscriber(&self, id: u64) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.remove(&id);
        self.debouncer.cancel(id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}
