//! OpenAPI documentation generated from a [`Router`].
//!
//! Gated routes document their request-body schema and the `406` answer the
//! gate gives for bodies that violate it, so the published contract is the
//! one actually enforced.
//!
//! ```rust
//! use schemagate::docs::ApiDoc;
//! use schemagate::{Request, Response, Router};
//!
//! async fn list_todos(_req: Request) -> Response { Response::json(b"[]".to_vec()) }
//!
//! let app = Router::new().get("/todos", list_todos);
//! let doc = ApiDoc::from_router(&app, "Todo API", "1.0.0");
//! let app = app.get("/openapi.json", doc.into_handler());
//! ```

use std::collections::BTreeMap;

use bytes::Bytes;
use serde_json::Value;
use tracing::{error, warn};
use utoipa::openapi::path::{
    Operation, OperationBuilder, ParameterBuilder, ParameterIn, PathItemBuilder, PathItemType,
};
use utoipa::openapi::request_body::RequestBodyBuilder;
use utoipa::openapi::schema::{ArrayBuilder, ObjectBuilder, Ref, Schema as DocSchema, SchemaType};
use utoipa::openapi::RefOr;
use utoipa::openapi::{
    self, ComponentsBuilder, Content, InfoBuilder, OpenApi, OpenApiBuilder, PathsBuilder, Required,
};

use crate::handler::Handler;
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::router::{Route, Router};
use crate::status::Status;

const VALIDATION_ERROR: &str = "ValidationError";

/// A generated OpenAPI 3.0 document.
#[derive(Clone)]
pub struct ApiDoc {
    openapi: OpenApi,
}

impl ApiDoc {
    /// Documents every route currently registered on `router`.
    pub fn from_router(router: &Router, title: &str, version: &str) -> Self {
        let mut items: BTreeMap<&str, PathItemBuilder> = BTreeMap::new();
        for route in router.routes() {
            let item = items.remove(route.path.as_str()).unwrap_or_default();
            items.insert(&route.path, item.operation(path_item_type(route.method), operation(route)));
        }

        let paths = items
            .into_iter()
            .fold(PathsBuilder::new(), |paths, (path, item)| paths.path(path, item.build()));

        let openapi = OpenApiBuilder::new()
            .info(InfoBuilder::new().title(title).version(version).build())
            .paths(paths.build())
            .components(Some(
                ComponentsBuilder::new()
                    .schema(VALIDATION_ERROR, validation_error_schema())
                    .build(),
            ))
            .build();
        Self { openapi }
    }

    pub fn as_openapi(&self) -> &OpenApi {
        &self.openapi
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        self.openapi.to_pretty_json()
    }

    /// A handler that serves the document as `application/json`.
    ///
    /// Serialized once, here; each request clones the shared bytes.
    pub fn into_handler(self) -> impl Handler {
        let body = match self.to_json() {
            Ok(json) => Some(Bytes::from(json)),
            Err(e) => {
                error!("failed to serialize API documentation: {e}");
                None
            }
        };
        move |_req: Request| {
            let body = body.clone();
            async move {
                match body {
                    Some(body) => Response::json(body),
                    None => Response::status(Status::InternalServerError),
                }
            }
        }
    }
}

fn operation(route: &Route) -> Operation {
    let mut op = OperationBuilder::new()
        .response("200", openapi::ResponseBuilder::new().description("Success").build());

    if let Some(schema) = &route.schema {
        op = op
            .operation_id(Some(schema.name()))
            .summary(schema.title())
            .description(schema.description())
            .request_body(Some(
                RequestBodyBuilder::new()
                    .content("application/json", Content::new(request_schema(schema.name(), schema.document())))
                    .required(Some(Required::True))
                    .build(),
            ))
            .response(
                "406",
                openapi::ResponseBuilder::new()
                    .description("Not Acceptable (validation error)")
                    .content(
                        "application/json",
                        Content::new(RefOr::<DocSchema>::Ref(Ref::from_schema_name(VALIDATION_ERROR))),
                    )
                    .build(),
            );
    }

    for name in path_params(&route.path) {
        op = op.parameter(
            ParameterBuilder::new()
                .name(name)
                .parameter_in(ParameterIn::Path)
                .required(Required::True)
                .schema(Some(typed(SchemaType::String)))
                .build(),
        );
    }

    op.build()
}

/// Converts a JSON Schema document into an OpenAPI schema object.
///
/// Keywords OpenAPI 3.0 has no slot for (`$schema` among them) are dropped.
/// A document that does not fit the OpenAPI schema model is published as a
/// free-form object.
fn request_schema(name: &str, document: &Value) -> RefOr<DocSchema> {
    match serde_json::from_value(document.clone()) {
        Ok(schema) => schema,
        Err(e) => {
            warn!(schema = name, "request schema not representable in OpenAPI: {e}");
            typed(SchemaType::Object)
        }
    }
}

fn path_item_type(method: Method) -> PathItemType {
    match method {
        Method::Connect => PathItemType::Connect,
        Method::Delete  => PathItemType::Delete,
        Method::Get     => PathItemType::Get,
        Method::Head    => PathItemType::Head,
        Method::Options => PathItemType::Options,
        Method::Patch   => PathItemType::Patch,
        Method::Post    => PathItemType::Post,
        Method::Put     => PathItemType::Put,
        Method::Trace   => PathItemType::Trace,
    }
}

fn path_params(path: &str) -> Vec<&str> {
    path.split('/')
        .filter_map(|segment| segment.strip_prefix('{')?.strip_suffix('}'))
        .map(|name| name.trim_start_matches('*'))
        .collect()
}

fn typed(schema_type: SchemaType) -> RefOr<DocSchema> {
    RefOr::T(DocSchema::Object(ObjectBuilder::new().schema_type(schema_type).build()))
}

/// Shape of the body [`Rejection`](crate::middleware::Rejection) produces.
fn validation_error_schema() -> RefOr<DocSchema> {
    let success = ObjectBuilder::new()
        .schema_type(SchemaType::Boolean)
        .enum_values(Some([false]))
        .build();
    let message = ObjectBuilder::new()
        .schema_type(SchemaType::String)
        .enum_values(Some([crate::middleware::validate::INVALID_INPUT]))
        .build();
    let errors = ArrayBuilder::new()
        .items(typed(SchemaType::String))
        .min_items(Some(1))
        .build();

    let body = ObjectBuilder::new()
        .schema_type(SchemaType::Object)
        .property("success", RefOr::T(DocSchema::Object(success)))
        .required("success")
        .property("message", RefOr::T(DocSchema::Object(message)))
        .required("message")
        .property("errors", RefOr::T(DocSchema::Array(errors)))
        .required("errors")
        .build();
    RefOr::T(DocSchema::Object(body))
}
