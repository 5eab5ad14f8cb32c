//! Provide a [`Context`] for the execution of one request.
//!
//! The context contains a DashMap which allows data to be passed from the request handling code
//! down to data fetchers and exception resolvers. Data fetchers decorated by the engine can reach
//! the context of the request they run for through [`Context::current`], without it being handed
//! to them explicitly.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tower::BoxError;
use uuid::Uuid;

use crate::json_ext::Value;

/// Holds [`Context`] entries.
pub(crate) type Entries = Arc<DashMap<String, Value>>;

tokio::task_local! {
    static CURRENT: Context;
}

/// Context for one GraphQL execution.
///
/// Cloning is cheap, clones share the same entries.
#[derive(Clone, Debug)]
pub struct Context {
    entries: Entries,
    execution_id: Uuid,
}

impl Context {
    pub fn new() -> Self {
        Context {
            entries: Default::default(),
            execution_id: Uuid::new_v4(),
        }
    }

    /// The identifier of the execution this context was created for.
    pub fn execution_id(&self) -> Uuid {
        self.execution_id
    }

    /// The context of the execution the calling task runs for, if any.
    ///
    /// Set while a decorated data fetcher runs.
    pub fn current() -> Option<Context> {
        CURRENT.try_with(|context| context.clone()).ok()
    }

    /// Runs `future` with this context installed as the [`Context::current`] one.
    pub async fn scope<F>(self, future: F) -> F::Output
    where
        F: Future,
    {
        CURRENT.scope(self, future).await
    }

    pub fn get<K, V>(&self, key: K) -> Result<Option<V>, BoxError>
    where
        K: Into<String>,
        V: for<'de> serde::Deserialize<'de>,
    {
        self.entries
            .get(&key.into())
            .map(|v| serde_json_bytes::from_value(v.value().clone()))
            .transpose()
            .map_err(|e| e.into())
    }

    pub fn insert<K, V>(&self, key: K, value: V) -> Result<Option<V>, BoxError>
    where
        K: Into<String>,
        V: for<'de> serde::Deserialize<'de> + Serialize,
    {
        match serde_json_bytes::to_value(value) {
            Ok(value) => self
                .entries
                .insert(key.into(), value)
                .map(|v| serde_json_bytes::from_value(v))
                .transpose()
                .map_err(|e| e.into()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
