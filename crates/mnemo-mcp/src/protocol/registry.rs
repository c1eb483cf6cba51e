//! Method registry: maps method names to handlers.
//!
//! The registry is an explicit object owned by one server instance — never
//! ambient state — so multiple servers (and tests) cannot interfere. It is
//! populated during setup and only read during dispatch.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::types::{Request, RpcError};

/// Boxed future returned by handlers.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a handler resolves to: a result value, or a tagged failure the
/// dispatcher converts into a wire error.
pub type HandlerResult = Result<Value, RpcError>;

/// A registered method handler. Invoked with the request's `params` and the
/// full request envelope.
pub trait MethodHandler: Send + Sync {
    fn call(&self, params: Option<Value>, request: &Request) -> BoxFuture<'static, HandlerResult>;
}

/// Adapter so plain async closures register as handlers.
struct FnHandler<F>(F);

impl<F, Fut> MethodHandler for FnHandler<F>
where
    F: Fn(Option<Value>, Request) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, params: Option<Value>, request: &Request) -> BoxFuture<'static, HandlerResult> {
        Box::pin((self.0)(params, request.clone()))
    }
}

/// Registry mapping method names to handlers. Last registration wins.
#[derive(Default)]
pub struct MethodRegistry {
    methods: HashMap<String, Arc<dyn MethodHandler>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `method`, replacing any previous one. Method
    /// names are not validated.
    pub fn register<F, Fut>(&mut self, method: impl Into<String>, handler: F)
    where
        F: Fn(Option<Value>, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.methods
            .insert(method.into(), Arc::new(FnHandler(handler)));
    }

    pub fn resolve(&self, method: &str) -> Option<Arc<dyn MethodHandler>> {
        self.methods.get(method).cloned()
    }

    pub fn contains(&self, method: &str) -> bool {
        self.methods.contains_key(method)
    }

    /// Sorted list of registered method names.
    pub fn method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.methods.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}
