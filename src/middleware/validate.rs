//! Request-body validation gate.
//!
//! Binds one [`Schema`] to one handler. Per request the gate parses the body
//! into a [`Document`], collects every violation, and then either calls the
//! handler with the untouched request or answers on its behalf:
//!
//! ```text
//! HTTP/1.1 406 Not Acceptable
//! content-type: application/json
//!
//! {"success":false,"message":"invalid input","errors":["'userId' is a required property"]}
//! ```
//!
//! A body that is not JSON at all is one more violation, not a fault.
//!
//! ```rust,no_run
//! use schemagate::middleware::validate_schema;
//! use schemagate::schema::SchemaRegistry;
//! use schemagate::{Method, Request, Response, Router};
//!
//! async fn add_todo(_req: Request) -> Response {
//!     Response::json(br#"{"msg":"todo saved"}"#.to_vec())
//! }
//!
//! let registry = SchemaRegistry::from_embedded(&[
//!     ("add_todo", r#"{"type":"object","required":["userId","title"]}"#),
//! ]).unwrap();
//!
//! let app = Router::new()
//!     .on(Method::Post, "/todos", validate_schema(registry.require("add_todo").unwrap(), add_todo));
//! ```

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::handler::{BoxFuture, BoxedHandler, Handler};
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::schema::{Document, Schema};
use crate::status::Status;

/// Fixed `message` of every rejection body.
pub const INVALID_INPUT: &str = "invalid input";

/// Wraps `handler` so it only runs for bodies that satisfy `schema`.
pub fn validate_schema(schema: Arc<Schema>, handler: impl Handler) -> impl Handler {
    ValidationGate::new(schema).wrap(handler)
}

// ── Gate ──────────────────────────────────────────────────────────────────────

/// Middleware object holding the bound schema.
///
/// Cheap to clone; one gate can wrap any number of handlers.
#[derive(Clone, Debug)]
pub struct ValidationGate {
    schema: Arc<Schema>,
}

impl ValidationGate {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Parses and validates `body`.
    pub fn check(&self, body: &[u8]) -> Result<(), Rejection> {
        let document: Document = match serde_json::from_slice(body) {
            Ok(document) => document,
            Err(e) => {
                return Err(Rejection::new(vec![format!("request body is not valid JSON: {e}")]));
            }
        };

        let errors = self.schema.validate(&document);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Rejection::new(errors))
        }
    }

    /// Returns a handler that runs this gate before `handler`.
    pub fn wrap(self, handler: impl Handler) -> impl Handler {
        let gated = Arc::new(Gated { gate: self, inner: handler.into_boxed_handler() });
        move |req: Request| gated.call(req)
    }
}

struct Gated {
    gate: ValidationGate,
    inner: BoxedHandler,
}

impl Gated {
    fn call(&self, req: Request) -> BoxFuture {
        match self.gate.check(req.body()) {
            Ok(()) => self.inner.call(req),
            Err(rejection) => {
                debug!(
                    operation = self.gate.schema.name(),
                    path = req.path(),
                    violations = rejection.errors.len(),
                    "request rejected by schema"
                );
                Box::pin(async move { rejection.into_response() })
            }
        }
    }
}

// ── Rejection ─────────────────────────────────────────────────────────────────

/// Body of a `406` answered by the gate.
///
/// `errors` is never empty and keeps the validator's discovery order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Rejection {
    success: bool,
    message: &'static str,
    errors: Vec<String>,
}

impl Rejection {
    fn new(errors: Vec<String>) -> Self {
        Self { success: false, message: INVALID_INPUT, errors }
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self) {
            Ok(body) => Response::builder().status(Status::NotAcceptable).json(body),
            Err(_) => Response::status(Status::NotAcceptable),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::{Value, json};

    use super::*;
    use crate::Method;
    use crate::schema::RegistryConfig;

    fn todo_gate() -> ValidationGate {
        let document = json!({
            "type": "object",
            "properties": {
                "id": {"type": "string", "maxLength": 255},
                "userId": {"type": "string", "maxLength": 255},
                "title": {"type": "string", "maxLength": 255},
                "completed": {"type": "boolean"}
            },
            "additionalProperties": false,
            "required": ["userId", "title"]
        });
        let schema = Schema::compile("add_todo", &document, &RegistryConfig::default()).unwrap();
        ValidationGate::new(Arc::new(schema))
    }

    fn counting_handler(calls: Arc<AtomicUsize>) -> impl Handler {
        move |req: Request| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Response::json(req.body().to_vec())
            }
        }
    }

    fn post(body: &'static str) -> Request {
        Request::new(Method::Post, "/todos").with_body(body)
    }

    #[test]
    fn check_accepts_valid_body() {
        assert!(todo_gate().check(br#"{"userId":"u1","title":"Buy milk"}"#).is_ok());
    }

    #[test]
    fn check_reports_missing_required_field() {
        let rejection = todo_gate().check(br#"{"title":"Buy milk"}"#).unwrap_err();
        assert_eq!(rejection.errors(), ["'userId' is a required property".to_owned()]);
    }

    #[test]
    fn malformed_body_is_a_single_violation() {
        let bodies: [&[u8]; 3] = [b"", b"{", b"not json"];
        for body in bodies {
            let rejection = todo_gate().check(body).unwrap_err();
            assert_eq!(rejection.errors().len(), 1);
            assert!(rejection.errors()[0].starts_with("request body is not valid JSON"));
        }
    }

    #[test]
    fn check_is_idempotent() {
        let gate = todo_gate();
        let body = br#"{"title":7,"extra":1}"#;
        assert_eq!(gate.check(body).unwrap_err(), gate.check(body).unwrap_err());
    }

    #[test]
    fn rejection_serializes_error_contract() {
        let response = Rejection::new(vec!["a".to_owned(), "b".to_owned()]).into_response();
        assert_eq!(response.status_code(), 406);
        assert_eq!(response.header("content-type"), Some("application/json"));

        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body, json!({"success": false, "message": "invalid input", "errors": ["a", "b"]}));
    }

    #[tokio::test]
    async fn valid_request_reaches_handler_once_unmodified() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = todo_gate().wrap(counting_handler(Arc::clone(&calls))).into_boxed_handler();

        let body = r#"{"userId":"u1","title":"Buy milk"}"#;
        let response = handler.call(post(body)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.body(), body.as_bytes());
    }

    #[tokio::test]
    async fn invalid_request_never_reaches_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = todo_gate().wrap(counting_handler(Arc::clone(&calls))).into_boxed_handler();

        let response = handler.call(post(r#"{"userId":"u1","title":"Buy milk","extra":1}"#)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(response.status_code(), 406);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["errors"].as_array().unwrap().len(), 1);
        assert!(body["errors"][0].as_str().unwrap().contains("extra"));
    }

    #[tokio::test]
    async fn validate_schema_matches_wrap() {
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = todo_gate();
        let handler = validate_schema(Arc::clone(gate.schema()), counting_handler(Arc::clone(&calls)))
            .into_boxed_handler();

        let response = handler.call(post(r#"{"title":"Buy milk"}"#)).await;
        assert_eq!(response.status_code(), 406);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let response = handler.call(post(r#"{"userId":"u1","title":"Buy milk"}"#)).await;
        assert_eq!(response.status_code(), 200);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
