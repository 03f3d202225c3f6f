//! End-to-end tests: start a real server on a free port and talk to it over TCP.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Tests are predefined and guaranteed to be Some/Ok"
)]

use bookshelf_core::{BookPayload, BookQuery};
use bookshelf_server::protocol::{Request, encode_request};
use bookshelf_server::response::{Reply, ResponseBody, ResponseData};
use bookshelf_server::{AppState, BookshelfServer, ServerConfig};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt as _, AsyncWriteExt as _, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::{Duration, timeout};

/// Start a server on a free port, return its address and a handle to its state.
async fn start_test_server() -> (SocketAddr, Arc<AppState>) {
    start_test_server_with_line_limit(ServerConfig::default().max_line_bytes).await
}

async fn start_test_server_with_line_limit(max_line_bytes: usize) -> (SocketAddr, Arc<AppState>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = BookshelfServer::new(ServerConfig {
        bind_addr: addr.to_string(),
        max_line_bytes,
    });
    let state = server.state();
    tokio::spawn(async move {
        server.serve(listener).await.unwrap();
    });
    (addr, state)
}

struct Client {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, writer) = stream.into_split();
        Self {
            lines: BufReader::new(reader).lines(),
            writer,
        }
    }

    async fn send_raw(&mut self, line: &str) -> Reply {
        self.send_bytes(line.as_bytes()).await
    }

    async fn send_bytes(&mut self, bytes: &[u8]) -> Reply {
        self.writer.write_all(bytes).await.unwrap();
        let reply = timeout(Duration::from_secs(2), self.lines.next_line())
            .await
            .expect("server should reply within timeout")
            .unwrap()
            .expect("server closed connection");
        serde_json::from_str(&reply).unwrap()
    }

    async fn send(&mut self, request: &Request) -> Reply {
        self.send_raw(&encode_request(request).unwrap()).await
    }

    async fn add(&mut self, payload: BookPayload) -> Reply {
        self.send(&Request::AddBook { payload }).await
    }

    async fn list(&mut self, query: BookQuery) -> Vec<String> {
        let reply = self.send(&Request::ListBooks { query }).await;
        assert_eq!(reply.code, 200);
        match reply.data() {
            Some(ResponseData::Books { books }) => {
                books.iter().map(|book| book.name.clone()).collect()
            }
            other => panic!("expected books, got {other:?}"),
        }
    }
}

fn book_id(reply: &Reply) -> String {
    match reply.data() {
        Some(ResponseData::BookId { book_id }) => book_id.clone(),
        other => panic!("expected book id, got {other:?}"),
    }
}

fn assert_fail(reply: &Reply, code: u16, message: &str) {
    assert_eq!(reply.code, code);
    assert_eq!(
        reply.body,
        ResponseBody::Fail {
            message: message.to_owned()
        }
    );
}

#[tokio::test]
async fn shelf_scenario() {
    let (addr, state) = start_test_server().await;
    let mut client = Client::connect(addr).await;

    let reply = client.add(BookPayload::new("Go", 100, 100)).await;
    assert_eq!(reply.code, 201);
    let go = book_id(&reply);

    let reply = client
        .send(&Request::GetBook {
            book_id: go.clone(),
        })
        .await;
    let Some(ResponseData::Book { book }) = reply.data() else {
        panic!("expected book, got {reply:?}");
    };
    assert!(book.finished);
    assert_eq!(book.inserted_at, book.updated_at);

    let reply = client.add(BookPayload::new("", 10, 0)).await;
    assert_fail(
        &reply,
        400,
        "Failed to add book. Please provide the book name",
    );

    let reply = client.add(BookPayload::new("X", 10, 20)).await;
    assert_fail(
        &reply,
        400,
        "Failed to add book. readPage must not be greater than pageCount",
    );
    assert_eq!(state.book_count().await, 1);

    let reply = client
        .send(&Request::GetBook {
            book_id: "unknown".to_owned(),
        })
        .await;
    assert_fail(&reply, 404, "Book not found");

    let reply = client
        .send(&Request::DeleteBook {
            book_id: "unknown".to_owned(),
        })
        .await;
    assert_fail(&reply, 404, "Failed to delete book. Id not found");

    let reply = client
        .send(&Request::DeleteBook { book_id: go })
        .await;
    assert_eq!(reply.code, 200);
    assert_eq!(reply.message(), Some("Book deleted successfully"));
    assert_eq!(state.book_count().await, 0);
}

#[tokio::test]
async fn list_filters_over_the_wire() {
    let (addr, _state) = start_test_server().await;
    let mut client = Client::connect(addr).await;

    for (name, pages, read, reading) in [
        ("Harry Potter", 300, 300, false),
        ("Dune", 412, 20, true),
        ("The Hobbit", 310, 0, false),
    ] {
        let payload = BookPayload {
            reading,
            ..BookPayload::new(name, pages, read)
        };
        assert_eq!(client.add(payload).await.code, 201);
    }

    assert_eq!(
        client.list(BookQuery::default()).await,
        vec!["Harry Potter", "Dune", "The Hobbit"]
    );
    assert_eq!(
        client.list(BookQuery::by_name("potter")).await,
        vec!["Harry Potter"]
    );
    assert_eq!(client.list(BookQuery::by_reading("1")).await, vec!["Dune"]);
    assert_eq!(
        client.list(BookQuery::by_reading("0")).await,
        vec!["Harry Potter", "The Hobbit"]
    );
    assert_eq!(
        client.list(BookQuery::by_finished("1")).await,
        vec!["Harry Potter"]
    );
    assert_eq!(
        client.list(BookQuery::by_reading("maybe")).await.len(),
        3
    );
}

#[tokio::test]
async fn edit_book_over_the_wire() {
    let (addr, _state) = start_test_server().await;
    let mut client = Client::connect(addr).await;
    let id = book_id(&client.add(BookPayload::new("Draft", 100, 10)).await);

    let reply = client
        .send(&Request::EditBook {
            book_id: id.clone(),
            payload: BookPayload::new("Final", 100, 100),
        })
        .await;
    assert_eq!(reply.code, 200);
    assert_eq!(reply.message(), Some("Book updated successfully"));

    let reply = client
        .send(&Request::EditBook {
            book_id: "unknown".to_owned(),
            payload: BookPayload::new("Final", 100, 0),
        })
        .await;
    assert_fail(&reply, 404, "Failed to update book. Id not found");

    let reply = client.send(&Request::GetBook { book_id: id }).await;
    let Some(ResponseData::Book { book }) = reply.data() else {
        panic!("expected book, got {reply:?}");
    };
    assert_eq!(book.name, "Final");
    assert!(book.finished);
}

#[tokio::test]
async fn malformed_line_keeps_connection_open() {
    let (addr, _state) = start_test_server().await;
    let mut client = Client::connect(addr).await;

    let reply = client.send_raw("this is not json\n").await;
    assert_eq!(reply.code, 400);
    assert!(matches!(reply.body, ResponseBody::Fail { .. }));

    let reply = client.add(BookPayload::new("Still here", 1, 0)).await;
    assert_eq!(reply.code, 201);
}

#[tokio::test]
async fn invalid_utf8_line_keeps_connection_open() {
    let (addr, state) = start_test_server().await;
    let mut client = Client::connect(addr).await;

    let reply = client
        .send_bytes(b"{\"op\":\"get_book\",\"bookId\":\"\xff\xfe\"}\n")
        .await;
    assert_eq!(reply.code, 400);
    assert!(reply.message().unwrap().starts_with("Invalid request"));

    let reply = client.add(BookPayload::new("Still here", 1, 0)).await;
    assert_eq!(reply.code, 201);
    assert_eq!(state.book_count().await, 1);
}

#[tokio::test]
async fn overlong_line_is_rejected_and_skipped() {
    let (addr, state) = start_test_server_with_line_limit(256).await;
    let mut client = Client::connect(addr).await;

    let oversized = format!(
        "{{\"op\":\"add_book\",\"payload\":{{\"name\":\"{}\"}}}}\n",
        "x".repeat(1024)
    );
    let reply = client.send_raw(&oversized).await;
    assert_fail(&reply, 400, "Invalid request: line too long");
    assert_eq!(state.book_count().await, 0);

    let reply = client.add(BookPayload::new("Short", 1, 0)).await;
    assert_eq!(reply.code, 201);
    assert_eq!(client.list(BookQuery::default()).await, vec!["Short"]);
}

#[tokio::test]
async fn free_form_fields_are_stored_as_sent() {
    let (addr, _state) = start_test_server().await;
    let mut client = Client::connect(addr).await;

    let reply = client
        .send_raw(
            "{\"op\":\"add_book\",\"payload\":{\"name\":\"X\",\"year\":\"2008\",\"publisher\":42,\"pageCount\":10,\"readPage\":0}}\n",
        )
        .await;
    assert_eq!(reply.code, 201);
    let id = book_id(&reply);

    let reply = client.send(&Request::GetBook { book_id: id }).await;
    let Some(ResponseData::Book { book }) = reply.data() else {
        panic!("expected book, got {reply:?}");
    };
    assert_eq!(book.year, Some(json!("2008")));
    assert_eq!(book.publisher, Some(json!(42)));
}

#[tokio::test]
async fn clients_share_one_store() {
    let (addr, state) = start_test_server().await;

    let mut tasks = Vec::new();
    for index in 0..8 {
        tasks.push(tokio::spawn(async move {
            let mut client = Client::connect(addr).await;
            for round in 0..5 {
                let reply = client
                    .add(BookPayload::new(&format!("Book {index}-{round}"), 10, 0))
                    .await;
                assert_eq!(reply.code, 201);
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(state.book_count().await, 40);
    let mut client = Client::connect(addr).await;
    assert_eq!(client.list(BookQuery::default()).await.len(), 40);
}
