//! Plain-HTTP mock DoH responders for tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use dohscan::ScanConfig;

pub const DNS_MESSAGE: &str = "application/dns-message";

/// How the responder answers one kind of request.
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    Status {
        status: u16,
        content_type: Option<&'static str>,
    },
    /// Read the request, then never answer.
    Hang,
}

impl Reply {
    pub const DOH: Reply = Reply::Status {
        status: 200,
        content_type: Some(DNS_MESSAGE),
    };
    pub const NOT_FOUND: Reply = Reply::Status {
        status: 404,
        content_type: Some("text/html"),
    };

    pub fn status(status: u16, content_type: Option<&'static str>) -> Self {
        Reply::Status {
            status,
            content_type,
        }
    }
}

/// Decides the reply from the method and path of a request.
pub type Router = Arc<dyn Fn(&str, &str) -> Reply + Send + Sync>;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Request target: path plus query string.
    pub target: String,
    /// Lower-cased header names.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or_default()
    }

    pub fn query_param(&self, name: &str) -> Option<String> {
        let (_, query) = self.target.split_once('?')?;
        query.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (key == name).then(|| value.to_string())
        })
    }
}

pub struct MockResponder {
    pub addr: SocketAddr,
    pub requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockResponder {
    /// Answer GET and POST with fixed replies regardless of path.
    pub async fn start(get: Reply, post: Reply) -> Self {
        Self::with_router(Arc::new(move |method: &str, _path: &str| match method {
            "GET" => get,
            "POST" => post,
            _ => Reply::status(405, None),
        }))
        .await
    }

    pub async fn with_router(router: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = requests.clone();
        tokio::spawn(async move {
            loop {
                if let Ok((stream, _)) = listener.accept().await {
                    tokio::spawn(handle(stream, router.clone(), recorded.clone()));
                }
            }
        });

        Self { addr, requests }
    }

    /// `host` part of a candidate pointing at this responder.
    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn handle(
    mut stream: TcpStream,
    router: Router,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
) {
    let Some(request) = read_request(&mut stream).await else {
        return;
    };
    let reply = router(&request.method, request.path());
    recorded.lock().unwrap().push(request);

    match reply {
        Reply::Hang => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Reply::Status {
            status,
            content_type,
        } => {
            let mut response = format!("HTTP/1.1 {} Mock\r\n", status);
            if let Some(content_type) = content_type {
                response.push_str(&format!("Content-Type: {}\r\n", content_type));
            }
            response.push_str("Content-Length: 0\r\nConnection: close\r\n\r\n");
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    }
}

async fn read_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    let head_end = loop {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split(' ');
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();

    let headers: HashMap<String, String> = lines
        .filter_map(|line| {
            let (name, value) = line.split_once(':')?;
            Some((name.trim().to_ascii_lowercase(), value.trim().to_string()))
        })
        .collect();

    let body_len = headers
        .get("content-length")
        .and_then(|len| len.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = buf[head_end..].to_vec();
    while body.len() < body_len {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Some(RecordedRequest {
        method,
        target,
        headers,
        body,
    })
}

/// Scan config for plain-HTTP mocks with a short timeout.
pub fn test_config(output_dir: &std::path::Path, timeout: Duration) -> ScanConfig {
    let mut config = ScanConfig::new(output_dir);
    config.probe.scheme = "http".to_string();
    config.probe.timeout = timeout;
    config.workers = 8;
    config
}

/// Address nothing is listening on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn read_lines(path: &std::path::Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}
