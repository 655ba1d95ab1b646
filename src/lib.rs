//! # schemagate
//!
//! Schema-validated route handlers on a minimal hyper host.
//!
//! A handler is an `async fn(Request) -> impl IntoResponse`. Wrapping one with
//! [`middleware::validate_schema`] binds it to a JSON Schema: the wrapper
//! parses the request body, collects every violation, and answers
//! `406 Not Acceptable` itself when there are any. The handler only ever sees
//! bodies that passed.
//!
//! ```text
//! {"success": false, "message": "invalid input", "errors": ["'userId' is a required property"]}
//! ```
//!
//! The same schemas feed [`docs::ApiDoc`], so the published OpenAPI document
//! describes exactly what the gate enforces.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use schemagate::schema::SchemaRegistry;
//! use schemagate::{Json, Method, Request, Router, Server};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), schemagate::Error> {
//!     let schemas = SchemaRegistry::from_embedded(&[(
//!         "add_todo",
//!         r#"{"type":"object","properties":{"title":{"type":"string"}},"required":["title"]}"#,
//!     )])?;
//!
//!     let app = Router::new()
//!         .on_validated(Method::Post, "/todos", schemas.require("add_todo")?, add_todo);
//!
//!     Server::bind("127.0.0.1:5000")?.serve(app).await
//! }
//!
//! async fn add_todo(req: Request) -> Json<serde_json::Value> {
//!     // Only reached when the body matched the schema.
//!     let todo: serde_json::Value = req.json().unwrap_or_default();
//!     Json(json!({ "msg": "todo saved", "title": todo["title"] }))
//! }
//! ```

mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;
mod status;

pub mod docs;
pub mod health;
pub mod middleware;
pub mod schema;

pub use error::Error;
pub use handler::Handler;
pub use method::Method;
pub use request::Request;
pub use response::{IntoResponse, Json, Response, ResponseBuilder};
pub use router::{Route, Router};
pub use server::Server;
pub use status::Status;
