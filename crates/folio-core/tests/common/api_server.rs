//! Minimal HTTP/1.1 JSON server for integration tests.
//!
//! Each path replays a scripted list of `(status, body)` responses; the last
//! one repeats. Every request's path and `Authorization` header are recorded.

use std::collections::{HashMap, VecDeque};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub path: String,
    pub authorization: Option<String>,
}

type Routes = HashMap<String, VecDeque<(u16, String)>>;

pub struct ApiServer {
    pub base_url: String,
    hits: Arc<Mutex<Vec<Hit>>>,
}

impl ApiServer {
    pub fn hits(&self) -> Vec<Hit> {
        self.hits.lock().unwrap().clone()
    }

    pub fn hits_for(&self, path: &str) -> usize {
        self.hits().iter().filter(|h| h.path == path).count()
    }
}

/// Starts a server in a background thread. Paths are given without the
/// leading slash, e.g. `"market/trending"`. Unknown paths get 404.
pub fn start(routes: Vec<(&str, Vec<(u16, &str)>)>) -> ApiServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let routes: Routes = routes
        .into_iter()
        .map(|(path, responses)| {
            let responses = responses
                .into_iter()
                .map(|(status, body)| (status, body.to_string()))
                .collect();
            (format!("/{}", path), responses)
        })
        .collect();
    let routes = Arc::new(Mutex::new(routes));
    let hits = Arc::new(Mutex::new(Vec::new()));
    let server_hits = Arc::clone(&hits);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&routes);
            let hits = Arc::clone(&server_hits);
            thread::spawn(move || handle(stream, &routes, &hits));
        }
    });
    ApiServer {
        base_url: format!("http://127.0.0.1:{}/", port),
        hits,
    }
}

fn handle(mut stream: std::net::TcpStream, routes: &Mutex<Routes>, hits: &Mutex<Vec<Hit>>) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(request) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    let (path, authorization) = parse_request(request);
    hits.lock().unwrap().push(Hit {
        path: path.clone(),
        authorization,
    });

    let (status, body) = {
        let mut routes = routes.lock().unwrap();
        match routes.get_mut(&path) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap(),
            None => (404, r#"{"error":"not found"}"#.to_string()),
        }
    };
    let response = format!(
        "HTTP/1.1 {} Scripted\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
}

/// Returns (path, Authorization header value).
fn parse_request(request: &str) -> (String, Option<String>) {
    let mut lines = request.lines();
    let path = lines
        .next()
        .and_then(|l| l.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    let authorization = lines
        .take_while(|l| !l.trim().is_empty())
        .filter_map(|l| l.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("authorization"))
        .map(|(_, value)| value.trim().to_string());
    (path, authorization)
}
