//! Route table of the public API.

use std::sync::Arc;

use axum::handler::Handler;
use axum::middleware::from_fn_with_state;
use axum::routing::{on, MethodFilter, MethodRouter};
use axum::Router;

use crate::http::handler::{create_handler, health_handler};
use crate::http::middleware::{require_bearer, BearerAuth};
use crate::svc::ServiceContext;

pub const CREATE_ORDER_PATH: &str = "/api/order/create";
pub const HEALTH_PATH: &str = "/health";

pub struct Route {
    pub method: MethodFilter,
    pub path: &'static str,
    /// Requires a bearer token when auth is configured.
    pub protected: bool,
    pub handler: MethodRouter<Arc<ServiceContext>>,
}

fn route<H, T>(method: MethodFilter, path: &'static str, protected: bool, handler: H) -> Route
where
    H: Handler<T, Arc<ServiceContext>>,
    T: 'static,
{
    Route {
        method,
        path,
        protected,
        handler: on(method, handler),
    }
}

/// Every route the gateway serves.
pub fn routes() -> Vec<Route> {
    vec![
        route(MethodFilter::POST, CREATE_ORDER_PATH, true, create_handler),
        route(MethodFilter::GET, HEALTH_PATH, false, health_handler),
    ]
}

/// Fold the table into an axum router, guarding protected routes with `auth`.
pub fn router(auth: Option<Arc<BearerAuth>>) -> Router<Arc<ServiceContext>> {
    routes().into_iter().fold(Router::new(), |router, r| {
        let handler = match (&auth, r.protected) {
            (Some(auth), true) => r
                .handler
                .route_layer(from_fn_with_state(auth.clone(), require_bearer)),
            _ => r.handler,
        };
        router.route(r.path, handler)
    })
}
