//! Todo service with a schema-gated create endpoint.
//!
//! Run with:
//!   cargo run --example todo -- --log-level debug
//!
//! Try:
//!   curl http://localhost:5000/todos
//!   curl -X POST http://localhost:5000/todos -d '{"userId":"u1","title":"Buy milk"}'
//!   curl -X POST http://localhost:5000/todos -d '{"title":"Buy milk"}'        # 406
//!   curl http://localhost:5000/todos/1
//!   curl http://localhost:5000/openapi.json

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use schemagate::docs::ApiDoc;
use schemagate::schema::{RegistryConfig, SchemaError, SchemaRegistry};
use schemagate::{IntoResponse, Json, Method, Request, Response, Router, Server, Status, health};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{error, info};

const INPUT_TODO_SCHEMA: &str = include_str!("../schemas/input_todo.schema.json");

// ── Configuration ─────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "todo", version, about = "Todo service with schema-validated input")]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "TODO_ADDR", default_value = "127.0.0.1:5000")]
    addr: String,

    /// JSON file the todos are stored in.
    #[arg(long, env = "TODO_STORE", default_value = "todos.json")]
    store: PathBuf,

    /// Reject undeclared fields on every object schema.
    #[arg(long, env = "TODO_STRICT")]
    strict: bool,

    /// Log output format (stderr).
    #[arg(long, env = "TODO_LOG_FORMAT", value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, env = "TODO_LOG_LEVEL", value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_filter(self) -> tracing::level_filters::LevelFilter {
        match self {
            LogLevel::Error => tracing::level_filters::LevelFilter::ERROR,
            LogLevel::Warn => tracing::level_filters::LevelFilter::WARN,
            LogLevel::Info => tracing::level_filters::LevelFilter::INFO,
            LogLevel::Debug => tracing::level_filters::LevelFilter::DEBUG,
            LogLevel::Trace => tracing::level_filters::LevelFilter::TRACE,
        }
    }
}

fn init_logging(format: LogFormat, level: LogLevel) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level.as_filter())
        .with_target(false);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}

// ── Store ─────────────────────────────────────────────────────────────────────

/// Fields are declared in key order; the store file keeps keys sorted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Todo {
    completed: bool,
    id: u64,
    title: String,
    #[serde(rename = "userId")]
    user_id: String,
}

/// Body of `POST /todos`. A client-supplied `id` is ignored.
#[derive(Debug, Deserialize)]
struct NewTodo {
    #[serde(rename = "userId")]
    user_id: String,
    title: String,
    #[serde(default)]
    completed: bool,
}

/// Todos kept as a JSON array in one file, four-space indented.
///
/// The mutex serialises read-modify-write cycles within this process.
struct TodoStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl TodoStore {
    fn new(path: PathBuf) -> Self {
        Self { path, lock: Mutex::new(()) }
    }

    async fn list(&self) -> io::Result<Vec<Todo>> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    async fn add(&self, new: NewTodo) -> io::Result<Todo> {
        let _guard = self.lock.lock().await;
        let mut todos = self.read().await?;
        let todo = Todo {
            completed: new.completed,
            id: todos.len() as u64 + 1,
            title: new.title,
            user_id: new.user_id,
        };
        todos.push(todo.clone());
        tokio::fs::write(&self.path, encode(&todos)?).await?;
        Ok(todo)
    }

    /// A missing file is an empty list.
    async fn read(&self) -> io::Result<Vec<Todo>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

fn encode(todos: &[Todo]) -> io::Result<Vec<u8>> {
    let mut json = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut json, formatter);
    todos.serialize(&mut serializer).map_err(io::Error::other)?;
    Ok(json)
}

// ── Handlers ──────────────────────────────────────────────────────────────────

// GET /todos
async fn list_todos(store: Arc<TodoStore>, _req: Request) -> Response {
    match store.list().await {
        Ok(todos) => Json(json!({ "todos": todos })).into_response(),
        Err(e) => store_failure(e),
    }
}

// GET /todos/{id}
async fn get_todo(store: Arc<TodoStore>, req: Request) -> Response {
    let Some(id) = req.param("id").and_then(|id| id.parse::<u64>().ok()) else {
        return Response::status(Status::NotFound);
    };
    match store.list().await {
        Ok(todos) => match todos.into_iter().find(|todo| todo.id == id) {
            Some(todo) => Json(todo).into_response(),
            None => Response::status(Status::NotFound),
        },
        Err(e) => store_failure(e),
    }
}

// POST /todos, behind the input-todo-schema gate.
async fn add_todo(store: Arc<TodoStore>, req: Request) -> Response {
    let new: NewTodo = match req.json() {
        Ok(new) => new,
        Err(_) => return Response::status(Status::BadRequest),
    };
    match store.add(new).await {
        Ok(todo) => {
            info!(id = todo.id, "todo saved");
            Json(json!({ "msg": "todo saved" })).into_response()
        }
        Err(e) => store_failure(e),
    }
}

fn store_failure(e: io::Error) -> Response {
    error!("todo store: {e}");
    Response::status(Status::InternalServerError)
}

fn build_app(store: Arc<TodoStore>, schemas: &SchemaRegistry) -> Result<Router, SchemaError> {
    let list = Arc::clone(&store);
    let get = Arc::clone(&store);
    let add = store;

    let app = Router::new()
        .get("/todos", move |req: Request| list_todos(Arc::clone(&list), req))
        .get("/todos/{id}", move |req: Request| get_todo(Arc::clone(&get), req))
        .on_validated(
            Method::Post,
            "/todos",
            schemas.require("add_todo")?,
            move |req: Request| add_todo(Arc::clone(&add), req),
        )
        .get("/healthz", health::liveness)
        .get("/readyz", health::readiness);

    let doc = ApiDoc::from_router(&app, "Todo API", env!("CARGO_PKG_VERSION"));
    Ok(app.get("/openapi.json", doc.into_handler()))
}

fn load_schemas(strict: bool) -> Result<SchemaRegistry, SchemaError> {
    let config = RegistryConfig { strict_mode: strict, ..RegistryConfig::default() };
    SchemaRegistry::from_embedded_with_config(&[("add_todo", INPUT_TODO_SCHEMA)], config)
}

#[tokio::main]
async fn main() -> Result<(), schemagate::Error> {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let schemas = load_schemas(cli.strict)?;
    let store = Arc::new(TodoStore::new(cli.store));
    let app = build_app(store, &schemas)?;

    Server::bind(&cli.addr)?.serve(app).await
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;

    fn temp_store(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "schemagate-todo-{tag}-{}-{}.json",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ))
    }

    fn app(path: &PathBuf) -> Router {
        let store = Arc::new(TodoStore::new(path.clone()));
        build_app(store, &load_schemas(false).unwrap()).unwrap()
    }

    fn post(body: &'static str) -> Request {
        Request::new(Method::Post, "/todos").with_body(body)
    }

    fn body_json(response: Response) -> Value {
        serde_json::from_slice(response.body()).unwrap()
    }

    #[test]
    fn cli_reads_flags() {
        let cli = Cli::try_parse_from(["todo", "--addr", "0.0.0.0:8080", "--strict", "--log-format", "json"])
            .expect("args should parse");
        assert_eq!(cli.addr, "0.0.0.0:8080");
        assert!(cli.strict);
        assert!(matches!(cli.log_format, LogFormat::Json));
    }

    #[tokio::test]
    async fn add_then_list_and_get() {
        let path = temp_store("add");
        let app = app(&path);

        let response = app.handle(post(r#"{"userId":"u1","title":"Buy milk"}"#)).await;
        assert_eq!(response.status_code(), 200);
        assert_eq!(body_json(response), json!({"msg": "todo saved"}));

        let list = body_json(app.handle(Request::new(Method::Get, "/todos")).await);
        assert_eq!(
            list,
            json!({"todos": [{"id": 1, "userId": "u1", "title": "Buy milk", "completed": false}]})
        );

        let one = app.handle(Request::new(Method::Get, "/todos/1")).await;
        assert_eq!(one.status_code(), 200);
        assert_eq!(body_json(one)["title"], "Buy milk");

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn store_file_has_sorted_keys_and_four_space_indent() {
        let path = temp_store("format");
        let app = app(&path);

        let response = app.handle(post(r#"{"userId":"u1","title":"Buy milk"}"#)).await;
        assert_eq!(response.status_code(), 200);

        let written = std::fs::read_to_string(&path).unwrap();
        let expected = "[\n    {\n        \"completed\": false,\n        \"id\": 1,\n        \"title\": \"Buy milk\",\n        \"userId\": \"u1\"\n    }\n]";
        assert_eq!(written, expected);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn missing_user_id_is_rejected_and_nothing_is_saved() {
        let path = temp_store("reject");
        let app = app(&path);

        let response = app.handle(post(r#"{"title":"Buy milk"}"#)).await;
        assert_eq!(response.status_code(), 406);
        let body = body_json(response);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "invalid input");
        assert_eq!(body["errors"].as_array().unwrap().len(), 1);
        assert!(body["errors"][0].as_str().unwrap().contains("userId"));

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn extra_field_is_rejected() {
        let path = temp_store("extra");
        let app = app(&path);

        let response = app.handle(post(r#"{"userId":"u1","title":"Buy milk","extra":1}"#)).await;
        assert_eq!(response.status_code(), 406);
        assert!(body_json(response)["errors"][0].as_str().unwrap().contains("extra"));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn unknown_todo_is_404() {
        let path = temp_store("missing");
        let app = app(&path);

        assert_eq!(app.handle(Request::new(Method::Get, "/todos/9")).await.status_code(), 404);
        assert_eq!(app.handle(Request::new(Method::Get, "/todos/abc")).await.status_code(), 404);
    }

    #[tokio::test]
    async fn openapi_documents_add_todo() {
        let path = temp_store("docs");
        let app = app(&path);

        let doc = body_json(app.handle(Request::new(Method::Get, "/openapi.json")).await);
        let post = &doc["paths"]["/todos"]["post"];
        assert_eq!(post["operationId"], "add_todo");
        assert_eq!(
            post["requestBody"]["content"]["application/json"]["schema"]["required"],
            json!(["userId", "title"])
        );
    }
}
