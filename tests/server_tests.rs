use std::net::SocketAddr;

use schemagate::schema::SchemaRegistry;
use schemagate::{Method, Request, Response, Router, Server};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

const INPUT_TODO_SCHEMA: &str = include_str!("../schemas/input_todo.schema.json");

async fn add_todo(_req: Request) -> Response {
    Response::json(br#"{"msg":"todo saved"}"#.to_vec())
}

async fn start(max_body_size: usize) -> (SocketAddr, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let schemas = SchemaRegistry::from_embedded(&[("add_todo", INPUT_TODO_SCHEMA)]).unwrap();
    let router = Router::new()
        .on_validated(Method::Post, "/todos", schemas.require("add_todo").unwrap(), add_todo);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        Server::from_listener(listener)
            .max_body_size(max_body_size)
            .serve_with_shutdown(router, async {
                let _ = rx.await;
            })
            .await
            .unwrap();
    });
    (addr, tx, handle)
}

async fn roundtrip(addr: SocketAddr, method: &str, path: &str, body: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "{method} {path} HTTP/1.1\r\nhost: localhost\r\ncontent-type: application/json\r\n\
         content-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn gated_route_over_tcp() {
    let (addr, shutdown, handle) = start(1024).await;

    let rejected = roundtrip(addr, "POST", "/todos", r#"{"title":"Buy milk"}"#).await;
    assert!(rejected.starts_with("HTTP/1.1 406"), "{rejected}");
    assert!(rejected.contains(r#""message":"invalid input""#), "{rejected}");

    let accepted = roundtrip(addr, "POST", "/todos", r#"{"userId":"u1","title":"Buy milk"}"#).await;
    assert!(accepted.starts_with("HTTP/1.1 200"), "{accepted}");
    assert!(accepted.ends_with(r#"{"msg":"todo saved"}"#), "{accepted}");

    shutdown.send(()).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn unknown_path_and_method() {
    let (addr, shutdown, handle) = start(1024).await;

    let missing = roundtrip(addr, "GET", "/nowhere", "").await;
    assert!(missing.starts_with("HTTP/1.1 404"), "{missing}");

    let custom = roundtrip(addr, "PURGE", "/todos", "").await;
    assert!(custom.starts_with("HTTP/1.1 405"), "{custom}");

    shutdown.send(()).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn oversized_body_is_refused_before_the_gate() {
    let (addr, shutdown, handle) = start(64).await;

    let title = "x".repeat(128);
    let oversized = format!(r#"{{"userId":"u1","title":"{title}"}}"#);
    let refused = roundtrip(addr, "POST", "/todos", &oversized).await;
    assert!(refused.starts_with("HTTP/1.1 413"), "{refused}");
    assert!(!refused.contains("invalid input"), "{refused}");

    let small = roundtrip(addr, "POST", "/todos", r#"{"userId":"u1","title":"a"}"#).await;
    assert!(small.starts_with("HTTP/1.1 200"), "{small}");

    shutdown.send(()).unwrap();
    handle.await.unwrap();
}
