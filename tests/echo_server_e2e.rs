//! End-to-end smoke test: start the real server against a live ring,
//! connect with a raw `TcpStream`, and check the echoed response. Needs
//! a kernel with `io_uring` support, so it does not run by default —
//! mirrors the teacher's hand-rolled `client.rs` debug tool, reduced to
//! just enough to drive one request/response round trip.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

use ringd::config::ServerConfig;
use ringd::server::Server;

#[test]
#[ignore = "requires a kernel with io_uring support"]
fn echoes_a_simple_get_request() {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 18080,
        queue_depth: 32,
        buffer_size: 4096,
        buffer_count: 64,
    };

    let mut server = Server::new(&config).expect("failed to start server");
    thread::spawn(move || server.run());
    thread::sleep(Duration::from_millis(100));

    let mut stream = TcpStream::connect(("127.0.0.1", 18080)).expect("failed to connect");
    stream
        .write_all(b"GET /ping HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).unwrap();
    let text = String::from_utf8(response).unwrap();

    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(text.contains("\"uri\":\"/ping\""));
}
