//! Protocol server: composes a transport with the registry and drives the
//! serialized dispatch loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use super::registry::MethodRegistry;
use super::validate;
use crate::transport::{Inbound, TcpTransport, Transport};
use crate::types::{
    InitializeParams, InitializeResult, Notification, Request, RequestId, Response, RpcError,
    RpcResult, ServerIdentity,
};

pub const INITIALIZE_METHOD: &str = "initialize";
pub const PING_METHOD: &str = "ping";

/// Reserved meta-method: enumerates registered methods without touching the
/// registry's normal resolution path. Always available, handshake or not.
pub const DISCOVER_METHOD: &str = "rpc.discover";

/// Notification emitted by the binary once its transport is up.
pub const READY_METHOD: &str = "server.ready";

/// One RPC server bound to one transport (one connection).
///
/// Dispatch is serialized: each message is fully handled — handler awaited,
/// response sent — before the next one is read, so response order equals
/// request order. A handler that never resolves blocks this connection's
/// queue; there is no per-dispatch timeout.
pub struct ProtocolServer<T: Transport> {
    transport: T,
    registry: MethodRegistry,
    identity: Arc<ServerIdentity>,
    initialized: Arc<AtomicBool>,
    inbound: Option<mpsc::Receiver<Inbound>>,
    started: bool,
}

impl<T: Transport> ProtocolServer<T> {
    /// Build a server with the two built-in methods pre-registered.
    pub fn new(transport: T, identity: ServerIdentity) -> Self {
        let identity = Arc::new(identity);
        let initialized = Arc::new(AtomicBool::new(false));
        let mut registry = MethodRegistry::new();

        {
            let identity = Arc::clone(&identity);
            let initialized = Arc::clone(&initialized);
            registry.register(INITIALIZE_METHOD, move |params, _req| {
                let identity = Arc::clone(&identity);
                let initialized = Arc::clone(&initialized);
                async move { handle_initialize(&identity, &initialized, params) }
            });
        }

        registry.register(PING_METHOD, |_params, _req| async { Ok(json!({ "ok": true })) });

        Self {
            transport,
            registry,
            identity,
            initialized,
            inbound: None,
            started: false,
        }
    }

    /// Register an application method. Setup-phase only: the registry is
    /// treated as immutable once the transport is started.
    pub fn register<F, Fut>(&mut self, method: impl Into<String>, handler: F)
    where
        F: Fn(Option<Value>, Request) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Value, RpcError>> + Send + 'static,
    {
        self.registry.register(method, handler);
    }

    pub fn registry(&self) -> &MethodRegistry {
        &self.registry
    }

    pub fn identity(&self) -> &ServerIdentity {
        &self.identity
    }

    /// Whether `initialize` has been handled. Advisory only — nothing gates
    /// dispatch on it.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Take the inbound receiver and start the transport. Idempotent.
    pub async fn start(&mut self) -> RpcResult<()> {
        if self.started {
            return Ok(());
        }
        self.inbound = self.transport.incoming();
        if self.inbound.is_none() {
            return Err(RpcError::Transport(
                "inbound channel already taken".to_string(),
            ));
        }
        self.transport.start().await?;
        self.started = true;
        Ok(())
    }

    /// Process inbound messages until the transport's channel closes.
    pub async fn run(&mut self) -> RpcResult<()> {
        self.start().await?;
        let mut inbound = match self.inbound.take() {
            Some(inbound) => inbound,
            None => {
                return Err(RpcError::Transport(
                    "run called twice on one server".to_string(),
                ))
            }
        };
        while let Some(frame) = inbound.recv().await {
            self.dispatch(frame).await?;
        }
        self.transport.stop().await
    }

    pub async fn stop(&mut self) -> RpcResult<()> {
        self.transport.stop().await
    }

    /// Send one notification to the peer.
    pub async fn notify(&mut self, method: &str, params: Option<Value>) -> RpcResult<()> {
        let notification = Notification::new(method.to_string(), params);
        let value = serde_json::to_value(&notification).map_err(RpcError::Json)?;
        self.transport.send(value).await
    }

    /// Handle one inbound frame and send whatever it produces. A send
    /// failure propagates to the caller; it is never converted into another
    /// response.
    pub async fn dispatch(&mut self, raw: Inbound) -> RpcResult<()> {
        if let Some(outbound) = self.handle_message(raw).await {
            self.transport.send(outbound).await?;
        }
        Ok(())
    }

    /// The dispatch algorithm, minus the send: validate, resolve, invoke,
    /// and shape the reply. Returns `None` when nothing goes on the wire
    /// (notifications, regardless of outcome).
    pub async fn handle_message(&self, raw: Inbound) -> Option<Value> {
        let raw = match raw {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("undecodable frame: {e}");
                return Some(to_wire(e.to_error_response(RequestId::Null)));
            }
        };

        let request = match validate::validate_request(&raw) {
            Ok(request) => request,
            Err(diagnostics) => {
                let e = RpcError::InvalidRequest(validate::render(&diagnostics));
                tracing::warn!("invalid envelope: {e}");
                return Some(to_wire(e.to_error_response(RequestId::Null)));
            }
        };

        let id = request.response_id();
        let is_notification = request.is_notification();

        if request.method == DISCOVER_METHOD {
            if is_notification {
                return None;
            }
            let result = json!({ "methods": self.registry.method_names() });
            return Some(to_wire(Response::new(id, result)));
        }

        let handler = match self.registry.resolve(&request.method) {
            Some(handler) => handler,
            None => {
                if is_notification {
                    tracing::debug!(method = %request.method, "dropping notification for unknown method");
                    return None;
                }
                let e = RpcError::MethodNotFound(request.method.clone());
                return Some(to_wire(e.to_error_response(id)));
            }
        };

        match handler.call(request.params.clone(), &request).await {
            Ok(result) => {
                if is_notification {
                    None
                } else {
                    Some(to_wire(Response::new(id, result)))
                }
            }
            Err(e) => {
                if is_notification {
                    tracing::warn!(method = %request.method, "notification handler failed: {e}");
                    return None;
                }
                // Only tagged input-validation failures keep their code;
                // everything else a handler raises is an internal failure.
                let e = match e {
                    e @ RpcError::InvalidParams(_) => e,
                    e @ RpcError::Internal(_) => e,
                    other => RpcError::Internal(other.to_string()),
                };
                Some(to_wire(e.to_error_response(id)))
            }
        }
    }
}

fn handle_initialize(
    identity: &ServerIdentity,
    initialized: &AtomicBool,
    params: Option<Value>,
) -> Result<Value, RpcError> {
    let params: InitializeParams = match params {
        Some(value) => {
            serde_json::from_value(value).map_err(|e| RpcError::InvalidParams(e.to_string()))?
        }
        None => InitializeParams::default(),
    };

    // The caller's requested version and capabilities are accepted and
    // ignored; the server always answers with its own fixed version.
    if let Some(requested) = params.protocol_version.as_deref() {
        if requested != identity.protocol_version {
            tracing::debug!(
                "client requested protocol version {requested}, serving {}",
                identity.protocol_version
            );
        }
    }

    if !initialized.swap(true, Ordering::SeqCst) {
        tracing::info!(server = %identity.name, "handshake complete");
    }

    serde_json::to_value(InitializeResult::for_identity(identity)).map_err(RpcError::Json)
}

fn to_wire(message: impl serde::Serialize) -> Value {
    serde_json::to_value(message).unwrap_or_default()
}

/// Accept loop: one [`ProtocolServer`] over a [`TcpTransport`] per
/// connection, each with its own registry populated by `setup`.
pub async fn serve_tcp<F>(addr: &str, identity: ServerIdentity, setup: F) -> RpcResult<()>
where
    F: Fn(&mut ProtocolServer<TcpTransport>) + Send + Sync + 'static,
{
    let listener = TcpListener::bind(addr).await.map_err(RpcError::Io)?;
    tracing::info!("listening on {addr}");
    let setup = Arc::new(setup);

    loop {
        let (stream, peer) = listener.accept().await.map_err(RpcError::Io)?;
        tracing::debug!("accepted connection from {peer}");
        let identity = identity.clone();
        let setup = Arc::clone(&setup);
        tokio::spawn(async move {
            let mut server = ProtocolServer::new(TcpTransport::new(stream), identity);
            setup(&mut server);
            if let Err(e) = server.run().await {
                tracing::warn!("connection {peer} ended with error: {e}");
            }
        });
    }
}
