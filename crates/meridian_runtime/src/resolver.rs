//! Async resolvers and their recorded outputs.
//!
//! Resolvers are the only place nondeterminism may enter a room. All
//! resolvers attached to one request run concurrently, strictly before the
//! synchronous handler; any failure aborts the request with the resolver's
//! identity and no state is mutated. Their outputs are recorded to the
//! journal so reevaluation substitutes them instead of re-running.

use async_trait::async_trait;
use indexmap::IndexMap;
use meridian_journal::ResolverOutputMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

use crate::error::{RuntimeError, RuntimeResult};
use crate::services::ServiceRegistry;

/// Request-scoped inputs a resolver sees
#[derive(Debug, Clone, Copy)]
pub struct ResolverContext<'a> {
    /// The room's service capabilities
    pub services: &'a ServiceRegistry,
    /// The request payload
    pub payload: &'a Value,
}

/// A named async data fetch attached to a join, action, or event
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Name the output is recorded under
    fn name(&self) -> &str;

    /// Produce the output for one request
    ///
    /// # Errors
    ///
    /// Any error aborts the whole request before its handler runs.
    async fn resolve(&self, ctx: ResolverContext<'_>) -> Result<Value, String>;
}

/// A resolver from a plain closure; enough for resolvers that only consult
/// services synchronously
pub struct FnResolver {
    name: String,
    f: Arc<dyn Fn(ResolverContext<'_>) -> Result<Value, String> + Send + Sync>,
}

impl FnResolver {
    /// Wrap a closure as a named resolver
    pub fn new(
        name: impl Into<String>,
        f: impl Fn(ResolverContext<'_>) -> Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            f: Arc::new(f),
        }
    }
}

#[async_trait]
impl Resolver for FnResolver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve(&self, ctx: ResolverContext<'_>) -> Result<Value, String> {
        (self.f)(ctx)
    }
}

/// Outputs of one request's resolvers, keyed by resolver name
///
/// An explicit map rather than injected values: handlers state which
/// resolver they read, and replay substitutes by the same name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolverOutputs {
    outputs: IndexMap<String, Value>,
}

impl ResolverOutputs {
    /// Create an empty output set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one resolver's output
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.outputs.insert(name.into(), value);
    }

    /// The raw output of one resolver
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.outputs.get(name)
    }

    /// Deserialize one resolver's output into a concrete type
    ///
    /// # Errors
    ///
    /// Returns `Resolver` naming the output when it is missing or does not
    /// deserialize.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> RuntimeResult<T> {
        let value = self.outputs.get(name).ok_or_else(|| RuntimeError::Resolver {
            resolver: name.to_string(),
            message: "no recorded output".to_string(),
        })?;
        serde_json::from_value(value.clone()).map_err(|e| RuntimeError::Resolver {
            resolver: name.to_string(),
            message: e.to_string(),
        })
    }

    /// Whether no outputs were recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Convert to the journal's recorded form
    #[must_use]
    pub fn to_recorded(&self) -> ResolverOutputMap {
        self.outputs.clone()
    }

    /// Rebuild from the journal's recorded form
    #[must_use]
    pub fn from_recorded(recorded: ResolverOutputMap) -> Self {
        Self { outputs: recorded }
    }
}

/// Run every resolver of one request concurrently
///
/// # Errors
///
/// The first failure (in resolver declaration order) aborts with
/// `Resolver`; no partial outputs escape.
pub async fn run_resolvers(
    resolvers: &[Arc<dyn Resolver>],
    services: &ServiceRegistry,
    payload: &Value,
) -> RuntimeResult<ResolverOutputs> {
    let futures = resolvers.iter().map(|resolver| async move {
        let result = resolver
            .resolve(ResolverContext { services, payload })
            .await;
        (resolver.name().to_string(), result)
    });
    let results = futures::future::join_all(futures).await;

    let mut outputs = ResolverOutputs::new();
    for (name, result) in results {
        match result {
            Ok(value) => outputs.insert(name, value),
            Err(message) => {
                return Err(RuntimeError::Resolver {
                    resolver: name,
                    message,
                })
            }
        }
    }
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolver(name: &str, value: Value) -> Arc<dyn Resolver> {
        Arc::new(FnResolver::new(name, move |_| Ok(value.clone())))
    }

    #[tokio::test]
    async fn test_resolvers_run_and_collect_by_name() {
        let resolvers = vec![
            resolver("shuffle", json!([3, 1, 2])),
            resolver("profile", json!({"name": "alice"})),
        ];
        let services = ServiceRegistry::new();
        let outputs = run_resolvers(&resolvers, &services, &json!({}))
            .await
            .unwrap();

        assert_eq!(outputs.value("shuffle"), Some(&json!([3, 1, 2])));
        let cards: Vec<u32> = outputs.get("shuffle").unwrap();
        assert_eq!(cards, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn test_failure_aborts_with_resolver_identity() {
        let resolvers = vec![
            resolver("ok", json!(1)),
            Arc::new(FnResolver::new("db", |_| Err("timeout".to_string())))
                as Arc<dyn Resolver>,
        ];
        let services = ServiceRegistry::new();
        let err = run_resolvers(&resolvers, &services, &json!({}))
            .await
            .unwrap_err();
        assert!(
            matches!(err, RuntimeError::Resolver { ref resolver, .. } if resolver == "db")
        );
    }

    #[tokio::test]
    async fn test_resolver_reads_payload() {
        let echo = Arc::new(FnResolver::new("echo", |ctx: ResolverContext<'_>| {
            Ok(ctx.payload.clone())
        })) as Arc<dyn Resolver>;
        let services = ServiceRegistry::new();
        let outputs = run_resolvers(&[echo], &services, &json!({"count": 2}))
            .await
            .unwrap();
        assert_eq!(outputs.value("echo"), Some(&json!({"count": 2})));
    }

    #[test]
    fn test_typed_get_reports_missing_output() {
        let outputs = ResolverOutputs::new();
        let err = outputs.get::<u32>("shuffle").unwrap_err();
        assert!(
            matches!(err, RuntimeError::Resolver { ref resolver, .. } if resolver == "shuffle")
        );
    }

    #[test]
    fn test_recorded_round_trip() {
        let mut outputs = ResolverOutputs::new();
        outputs.insert("shuffle", json!([1, 2]));
        let recorded = outputs.to_recorded();
        assert_eq!(ResolverOutputs::from_recorded(recorded), outputs);
    }
}
