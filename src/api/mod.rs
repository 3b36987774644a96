// Axum web server layer

use axum::{
    extract::{Request, State},
    http::Method,
    response::Response,
    routing::MethodRouter,
    Router,
};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, RwLock};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower::ServiceExt;
use tracing::{error, info};

pub mod handlers;
pub mod middleware;
pub mod request;
pub mod responses;

use crate::config::HttpConfig;
use crate::core::errors::EventSourceError;
use crate::core::route::params_conflict;
use request::BodyLimits;

#[derive(Default)]
struct TableState {
    router: Router,
    registered: Vec<(Method, String)>,
}

/// Routes of a running client.
///
/// Registration swaps in a new router; every request is dispatched to the
/// router current at the time it arrives, so routes can be added while the
/// listener is already accepting connections.
#[derive(Clone, Default)]
pub struct RouteTable {
    inner: Arc<RwLock<TableState>>,
}

impl RouteTable {
    /// Add one route.
    ///
    /// Rejects a second registration of the same method and path, and paths
    /// that bind differently named parameters at the same position as an
    /// existing path (the router cannot hold both).
    pub fn register(
        &self,
        method: &Method,
        path: &str,
        method_router: MethodRouter,
    ) -> Result<(), EventSourceError> {
        let mut state = self.inner.write().map_err(|_| {
            EventSourceError::ConfigurationError("route table lock poisoned".to_string())
        })?;

        let collides = state.registered.iter().any(|(registered_method, registered_path)| {
            (registered_method == method && registered_path == path)
                || params_conflict(registered_path, path)
        });
        if collides {
            return Err(EventSourceError::DuplicateRoute {
                method: method.to_string(),
                path: path.to_string(),
            });
        }

        let router = std::mem::take(&mut state.router);
        state.router = router.route(path, method_router);
        state.registered.push((method.clone(), path.to_string()));
        Ok(())
    }

    /// Registered (method, path) pairs in registration order
    pub fn routes(&self) -> Vec<(Method, String)> {
        match self.inner.read() {
            Ok(state) => state.registered.clone(),
            Err(poisoned) => poisoned.into_inner().registered.clone(),
        }
    }

    fn snapshot(&self) -> Router {
        match self.inner.read() {
            Ok(state) => state.router.clone(),
            Err(poisoned) => poisoned.into_inner().router.clone(),
        }
    }
}

async fn route_table_handler(State(table): State<RouteTable>, request: Request) -> Response {
    match table.snapshot().oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    }
}

/// Create the service that fronts a route table
///
/// Middleware stack (outermost to innermost):
/// - Tracing (tower-http::trace)
/// - CORS, permissive (tower-http::cors)
/// - Body size limit (tower-http::limit)
///
/// Per-route auth gates are installed on each route by the registrar.
pub fn create_service(routes: RouteTable, limits: BodyLimits) -> Router {
    Router::new()
        .fallback(route_table_handler)
        .with_state(routes)
        .layer(middleware::body_size_limit_layer(&limits))
        .layer(middleware::cors_layer())
        .layer(middleware::tracing_layer())
}

/// Handle to a listening HTTP server and its route table
pub struct HttpClient {
    local_addr: SocketAddr,
    routes: RouteTable,
    limits: BodyLimits,
    service: Router,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
    server: Mutex<Option<JoinHandle<std::io::Result<()>>>>,
}

impl HttpClient {
    /// Bind the configured address and start serving on a background task
    pub async fn bind(config: &HttpConfig) -> Result<Self, EventSourceError> {
        let routes = RouteTable::default();
        let limits = BodyLimits::from_config(config);
        let service = create_service(routes.clone(), limits);

        let listener = TcpListener::bind((config.bind_address.as_str(), config.port))
            .await
            .map_err(|e| {
                error!(error = %e, bind_address = %config.bind_address, port = config.port, "Failed to bind");
                e
            })?;
        let local_addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = service.clone();
        let server = tokio::spawn(async move {
            axum::serve(listener, app.into_make_service())
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        info!(addr = %local_addr, "HTTP event source listening");

        Ok(Self {
            local_addr,
            routes,
            limits,
            service,
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            server: Mutex::new(Some(server)),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn limits(&self) -> BodyLimits {
        self.limits
    }

    /// The full middleware stack and route table as a tower service, for
    /// driving requests without going through the socket.
    pub fn service(&self) -> Router {
        self.service.clone()
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn shutdown(&self) -> Result<(), EventSourceError> {
        let shutdown_tx = self.shutdown_tx.lock().ok().and_then(|mut tx| tx.take());
        let server = self.server.lock().ok().and_then(|mut server| server.take());

        if let Some(tx) = shutdown_tx {
            let _ = tx.send(());
        }
        if let Some(server) = server {
            server
                .await
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;
            info!(addr = %self.local_addr, "HTTP event source stopped");
        }
        Ok(())
    }
}
