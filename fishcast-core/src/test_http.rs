//! One-shot HTTP servers for exercising the HTTP clients against canned replies.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread::JoinHandle;
use std::time::Duration;

/// Client for talking to the canned servers; loopback must never go through a proxy.
pub(crate) fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().expect("build test client")
}

fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    (listener, format!("http://{addr}"))
}

fn read_head(stream: &mut std::net::TcpStream) -> String {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    String::from_utf8_lossy(&head).into_owned()
}

/// Answers exactly one request with `status` (e.g. `"200 OK"`) and `body`.
/// The join handle yields the raw request head that was received.
pub(crate) fn serve_once(status: &'static str, body: &str) -> (String, JoinHandle<String>) {
    let (listener, base_url) = bind();
    let body = body.to_string();

    let handle = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let head = read_head(&mut stream);
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).expect("write response");
        stream.flush().expect("flush");
        head
    });

    (base_url, handle)
}

/// Accepts one connection and holds it open without answering.
pub(crate) fn serve_stalled(hold: Duration) -> String {
    let (listener, base_url) = bind();

    std::thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let _ = read_head(&mut stream);
            std::thread::sleep(hold);
        }
    });

    base_url
}

/// A base URL nothing is listening on.
pub(crate) fn unreachable_url() -> String {
    let (listener, base_url) = bind();
    drop(listener);
    base_url
}
