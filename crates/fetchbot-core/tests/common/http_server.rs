//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves canned responses per request path. Bodies can be written in pieces
//! with a delay between them, and the declared `Content-Length` can differ
//! from what is actually sent (or be omitted, in which case the connection
//! close ends the body).

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Canned {
    /// Status line tail, e.g. "200 OK".
    pub status: &'static str,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// `Some(n)` sends `Content-Length: n`; `None` omits the header.
    pub declared_length: Option<usize>,
    /// Bytes written per piece.
    pub piece_size: usize,
    /// Pause after each piece.
    pub delay: Duration,
}

impl Canned {
    pub fn ok(body: Vec<u8>) -> Self {
        let len = body.len();
        Self {
            status: "200 OK",
            headers: Vec::new(),
            body,
            declared_length: Some(len),
            piece_size: usize::MAX,
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: &'static str, body: &[u8]) -> Self {
        Self {
            status,
            ..Self::ok(body.to_vec())
        }
    }

    pub fn redirect(location: &str) -> Self {
        Self {
            status: "302 Found",
            headers: vec![("Location".to_string(), location.to_string())],
            ..Self::ok(Vec::new())
        }
    }

    pub fn pieces(mut self, piece_size: usize, delay: Duration) -> Self {
        self.piece_size = piece_size.max(1);
        self.delay = delay;
        self
    }

    pub fn declared(mut self, declared_length: Option<usize>) -> Self {
        self.declared_length = declared_length;
        self
    }
}

/// Serve one response at `/file`. Returns its URL.
pub fn serve(canned: Canned) -> String {
    let base = serve_routes(vec![("/file", canned)]);
    format!("{}file", base)
}

/// Serve several paths. Returns the base URL ending in `/`.
pub fn serve_routes(routes: Vec<(&str, Canned)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let routes: Arc<HashMap<String, Canned>> =
        Arc::new(routes.into_iter().map(|(p, c)| (p.to_string(), c)).collect());
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&routes);
            thread::spawn(move || handle(stream, &routes));
        }
    });
    format!("http://127.0.0.1:{}/", port)
}

fn handle(mut stream: TcpStream, routes: &HashMap<String, Canned>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let path = match read_request_path(&mut stream) {
        Some(p) => p,
        None => return,
    };
    let canned = match routes.get(&path) {
        Some(c) => c,
        None => {
            let _ = stream.write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
            return;
        }
    };

    let mut head = format!("HTTP/1.1 {}\r\nConnection: close\r\n", canned.status);
    if let Some(len) = canned.declared_length {
        head.push_str(&format!("Content-Length: {}\r\n", len));
    }
    for (k, v) in &canned.headers {
        head.push_str(&format!("{}: {}\r\n", k, v));
    }
    head.push_str("\r\n");
    if stream.write_all(head.as_bytes()).is_err() {
        return;
    }
    for piece in canned.body.chunks(canned.piece_size) {
        if stream.write_all(piece).is_err() || stream.flush().is_err() {
            return;
        }
        if !canned.delay.is_zero() {
            thread::sleep(canned.delay);
        }
    }
    let _ = stream.shutdown(std::net::Shutdown::Both);
}

/// Read the request head and return the path of the request line.
fn read_request_path(stream: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.len() > 64 * 1024 {
            return None;
        }
    }
    let head = String::from_utf8_lossy(&buf);
    let line = head.lines().next()?;
    line.split_whitespace().nth(1).map(str::to_string)
}
