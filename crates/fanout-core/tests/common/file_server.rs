//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves a fixed set of paths with GET. Unknown paths get 404. Individual
//! paths can be told to answer 503 for their first N requests.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Default)]
struct Routes {
    bodies: HashMap<String, Vec<u8>>,
    fail_first: HashMap<String, usize>,
    hits: HashMap<String, usize>,
}

/// Handle to a running server. The server runs until the process exits.
#[derive(Clone)]
pub struct FileServer {
    base: String,
    routes: Arc<Mutex<Routes>>,
}

impl FileServer {
    /// Base URL with trailing slash, e.g. "http://127.0.0.1:12345/".
    pub fn base_url(&self) -> &str {
        &self.base
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path.trim_start_matches('/'))
    }

    /// Number of GET requests seen for `path`.
    pub fn hits(&self, path: &str) -> usize {
        let routes = self.routes.lock().unwrap();
        routes.hits.get(path.trim_start_matches('/')).copied().unwrap_or(0)
    }
}

/// Start serving `files` (path without leading slash -> body).
pub fn start(files: Vec<(String, Vec<u8>)>) -> FileServer {
    start_with_failures(files, Vec::new())
}

/// Like `start`, but each `(path, n)` answers 503 to its first `n` requests.
pub fn start_with_failures(files: Vec<(String, Vec<u8>)>, fail_first: Vec<(String, usize)>) -> FileServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let routes = Arc::new(Mutex::new(Routes {
        bodies: files.into_iter().collect(),
        fail_first: fail_first.into_iter().collect(),
        hits: HashMap::new(),
    }));
    let server_routes = Arc::clone(&routes);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&server_routes);
            thread::spawn(move || handle(stream, &routes));
        }
    });
    FileServer {
        base: format!("http://127.0.0.1:{}/", port),
        routes,
    }
}

fn handle(mut stream: TcpStream, routes: &Mutex<Routes>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let mut parts = request.lines().next().unwrap_or("").split_whitespace();
    let method = parts.next().unwrap_or("");
    let path = parts.next().unwrap_or("/").trim_start_matches('/').to_string();
    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        return;
    }

    let reply = {
        let mut routes = routes.lock().unwrap();
        let hit = {
            let h = routes.hits.entry(path.clone()).or_insert(0);
            *h += 1;
            *h
        };
        if routes.fail_first.get(&path).is_some_and(|&n| hit <= n) {
            Reply::Unavailable
        } else {
            match routes.bodies.get(&path) {
                Some(body) => Reply::Body(body.clone()),
                None => Reply::NotFound,
            }
        }
    };

    match reply {
        Reply::Body(body) => {
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(&body);
        }
        Reply::Unavailable => {
            let _ = stream.write_all(b"HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        }
        Reply::NotFound => {
            let _ = stream.write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        }
    }
}

enum Reply {
    Body(Vec<u8>),
    Unavailable,
    NotFound,
}
