//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. Alongside the trees the
//! router keeps one [`Route`] record per registration so documentation can
//! be generated from exactly what is served.

use std::collections::HashMap;
use std::sync::Arc;

use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::middleware::validate_schema;
use crate::request::Request;
use crate::response::Response;
use crate::schema::Schema;
use crate::status::Status;

/// A registered route, as seen by documentation generators.
#[derive(Clone, Debug)]
pub struct Route {
    pub method: Method,
    pub path: String,
    /// Request-body schema enforced on this route, if any.
    pub schema: Option<Arc<Schema>>,
}

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Every registration returns `self` so calls chain.
pub struct Router {
    trees: HashMap<Method, MatchitRouter<BoxedHandler>>,
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self { trees: HashMap::new(), routes: Vec::new() }
    }

    /// Register a handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them:
    ///
    /// ```rust,no_run
    /// # use schemagate::{Method, Request, Response, Router};
    /// # async fn get_todo(_: Request) -> Response { Response::text("") }
    /// # async fn list_todos(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::Get, "/todos/{id}", get_todo)
    ///     .on(Method::Get, "/todos",      list_todos);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered for `method`. Routes are fixed at startup, so this is a
    /// programming error.
    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.add(method, path, None, handler.into_boxed_handler())
    }

    /// Register a handler behind a validation gate bound to `schema`.
    ///
    /// Equivalent to `on(method, path, validate_schema(schema, handler))`,
    /// but the schema is also recorded for documentation.
    pub fn on_validated(
        self,
        method: Method,
        path: &str,
        schema: Arc<Schema>,
        handler: impl Handler,
    ) -> Self {
        let gated = validate_schema(Arc::clone(&schema), handler);
        self.add(method, path, Some(schema), gated.into_boxed_handler())
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::Get, path, handler)
    }

    fn add(
        mut self,
        method: Method,
        path: &str,
        schema: Option<Arc<Schema>>,
        handler: BoxedHandler,
    ) -> Self {
        self.trees
            .entry(method)
            .or_default()
            .insert(path, handler)
            .unwrap_or_else(|e| panic!("invalid route `{method} {path}`: {e}"));
        self.routes.push(Route { method, path: path.to_owned(), schema });
        self
    }

    /// Registered routes in registration order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Routes one request in-process. Unknown paths answer `404`.
    pub async fn handle(&self, mut req: Request) -> Response {
        match self.lookup(req.method, &req.path) {
            Some((handler, params)) => {
                req.params = params;
                handler.call(req).await
            }
            None => Response::status(Status::NotFound),
        }
    }

    pub(crate) fn lookup(
        &self,
        method: Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.trees.get(&method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
