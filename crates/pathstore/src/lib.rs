//! In-memory reactive data store with path query subscriptions.
//!
//! Stores hold a nested snapshot (`serde_json::Value`) under a name
//! in an explicit [`StoreRegistry`]. Values are read with the
//! `pathstore-query` expression language, and subscribers watch a
//! projection of a store with deliveries debounced on a quiescence
//! window.
//!
//! # Example
//!
//! ```
//! use pathstore::{StoreOptions, StoreRegistry};
//! use serde_json::json;
//!
//! let registry = StoreRegistry::new();
//! registry
//!     .register("App", json!({"config": {"theme": "dark"}}), StoreOptions::default())
//!     .unwrap();
//!
//! assert_eq!(registry.data("App.config.theme").unwrap(), json!("dark"));
//! ```

mod debounce;
pub use debounce::{Debouncer, DeliverFn};

mod registry;
pub use registry::{StoreError, StoreRegistry, DEFAULT_DEBOUNCE_WINDOW};

mod session;
pub use session::{MemorySession, SessionStore};

mod store;
pub use store::{
    OnSubscribe, Store, StoreOptions, SubscribeOptions, SubscriberFn, Subscription,
};

// Re-export the query language surface.
pub use pathstore_query::{
    accessed_stores, parse, query_to_string, ParseError, ParsedPath, PathEval, PathStep, Query,
};

/// Returns the crate version at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
