//! Controllers and the ordered fallback registry

use axum::{body::Body, http::Request, response::Response};
use cabinet_core::ApiError;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Future returned by a [`Handler`]
pub type HandlerFuture = BoxFuture<'static, Result<Response, ApiError>>;

/// Type-erased request handler
pub type Handler = Arc<dyn Fn(Request<Body>) -> HandlerFuture + Send + Sync>;

/// Exact path to handler mapping contributed by a controller
pub type RouteMap = HashMap<String, Handler>;

/// Wrap an async function as a [`Handler`]
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, ApiError>> + Send + 'static,
{
    Arc::new(move |request| Box::pin(f(request)))
}

/// A pluggable group of API endpoints.
///
/// Controllers contribute exact routes once at startup and may claim any
/// path the route table did not match at request time.
pub trait Controller: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Exact routes, collected once when the route table is built
    fn register_routes(&self) -> RouteMap;

    /// Claim a request the route table did not match
    fn handle_routes(&self, _request: &Request<Body>) -> Option<Handler> {
        None
    }
}

/// Controllers in fallback order.
///
/// The install controller is held apart because its routes are the only
/// ones reachable before installation. It is also consulted first during
/// fallback, followed by the others in registration order.
pub struct ControllerRegistry {
    install: Arc<dyn Controller>,
    controllers: Vec<Arc<dyn Controller>>,
}

impl ControllerRegistry {
    /// Create a registry around the install controller
    pub fn new(install: Arc<dyn Controller>) -> Self {
        Self {
            install,
            controllers: Vec::new(),
        }
    }

    /// Append a controller to the fallback order
    pub fn register(mut self, controller: Arc<dyn Controller>) -> Self {
        self.controllers.push(controller);
        self
    }

    pub fn install_controller(&self) -> &Arc<dyn Controller> {
        &self.install
    }

    /// Controllers other than the install controller, in registration order
    pub fn controllers(&self) -> &[Arc<dyn Controller>] {
        &self.controllers
    }

    /// Every controller in fallback order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Controller>> {
        std::iter::once(&self.install).chain(self.controllers.iter())
    }

    /// Number of controllers, the install controller included
    pub fn count(&self) -> usize {
        self.controllers.len() + 1
    }

    /// First controller willing to handle the request
    pub fn claim(&self, request: &Request<Body>) -> Option<(&str, Handler)> {
        self.iter().find_map(|controller| {
            controller
                .handle_routes(request)
                .map(|handler| (controller.name(), handler))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    struct Claiming {
        name: &'static str,
        prefix: &'static str,
    }

    impl Controller for Claiming {
        fn name(&self) -> &str {
            self.name
        }

        fn register_routes(&self) -> RouteMap {
            RouteMap::new()
        }

        fn handle_routes(&self, request: &Request<Body>) -> Option<Handler> {
            if !request.uri().path().starts_with(self.prefix) {
                return None;
            }
            Some(handler(|_| async { Ok(StatusCode::OK.into_response()) }))
        }
    }

    fn request(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    #[test]
    fn test_claim_follows_registration_order() {
        let registry = ControllerRegistry::new(Arc::new(Claiming {
            name: "install",
            prefix: "/api/install",
        }))
        .register(Arc::new(Claiming {
            name: "first",
            prefix: "/api/files",
        }))
        .register(Arc::new(Claiming {
            name: "second",
            prefix: "/api",
        }));

        let names: Vec<_> = registry.iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, ["install", "first", "second"]);
        assert_eq!(registry.count(), 3);

        assert_eq!(registry.claim(&request("/api/files/1")).unwrap().0, "first");
        assert_eq!(registry.claim(&request("/api/user")).unwrap().0, "second");
        assert_eq!(registry.claim(&request("/api/install/x")).unwrap().0, "install");
        assert!(registry.claim(&request("/other")).is_none());
    }

    #[tokio::test]
    async fn test_handler_wraps_async_fn() {
        let h = handler(|request: Request<Body>| async move {
            let path = request.uri().path().to_string();
            Ok((StatusCode::ACCEPTED, path).into_response())
        });

        let response = h(request("/api/echo")).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}
