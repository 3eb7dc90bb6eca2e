//! Scripted HTTP/1.1 server for behaviours `httpmock` cannot express:
//! custom reason phrases, dropping the connection after the request, and
//! never answering at all.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketPolicy {
    KeepOpen,
    DisconnectAfterRequest,
    NoResponse,
}

#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub socket_policy: SocketPolicy,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            status: 200,
            reason: "OK".to_string(),
            headers: Vec::new(),
            body: Vec::new(),
            socket_policy: SocketPolicy::KeepOpen,
        }
    }
}

impl MockResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the code and the generic reason phrase for its class.
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self.reason = match status {
            100..=199 => "Informational",
            200..=299 => "OK",
            300..=399 => "Redirection",
            400..=499 => "Client Error",
            500..=599 => "Server Error",
            _ => "Mock Response",
        }
        .to_string();
        self
    }

    pub fn body(mut self, body: &str) -> Self {
        self.body = body.as_bytes().to_vec();
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn socket_policy(mut self, policy: SocketPolicy) -> Self {
        self.socket_policy = policy;
        self
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

pub struct MockWebServer {
    addr: SocketAddr,
    queue: Arc<Mutex<VecDeque<MockResponse>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    shutdown: Arc<AtomicBool>,
}

impl MockWebServer {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let queue = Arc::new(Mutex::new(VecDeque::new()));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let shutdown = Arc::new(AtomicBool::new(false));

        let (q, r, s) = (queue.clone(), requests.clone(), shutdown.clone());
        thread::spawn(move || {
            for stream in listener.incoming() {
                if s.load(Ordering::SeqCst) {
                    break;
                }
                let Ok(stream) = stream else { continue };
                let (q, r, s) = (q.clone(), r.clone(), s.clone());
                thread::spawn(move || serve(stream, q, r, s));
            }
        });

        Self {
            addr,
            queue,
            requests,
            shutdown,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn enqueue(&self, response: MockResponse) {
        self.queue.lock().unwrap().push_back(response);
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn take_request(&self) -> Option<RecordedRequest> {
        let mut requests = self.requests.lock().unwrap();
        if requests.is_empty() {
            None
        } else {
            Some(requests.remove(0))
        }
    }
}

impl Drop for MockWebServer {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        // Wake the accept loop so it sees the flag.
        let _ = TcpStream::connect(self.addr);
    }
}

fn serve(
    stream: TcpStream,
    queue: Arc<Mutex<VecDeque<MockResponse>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    shutdown: Arc<AtomicBool>,
) {
    let Some(request) = read_request(&stream) else {
        return;
    };
    requests.lock().unwrap().push(request);

    let response = queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| MockResponse::new().status(404).body("no response enqueued"));

    let mut stream = stream;
    match response.socket_policy {
        SocketPolicy::DisconnectAfterRequest => {
            let _ = stream.shutdown(Shutdown::Both);
        }
        SocketPolicy::NoResponse => {
            let _ = stream.set_read_timeout(Some(Duration::from_millis(50)));
            let mut buf = [0u8; 64];
            while !shutdown.load(Ordering::SeqCst) {
                match stream.read(&mut buf) {
                    Ok(0) => break,
                    Ok(_) => {}
                    Err(e)
                        if e.kind() == std::io::ErrorKind::WouldBlock
                            || e.kind() == std::io::ErrorKind::TimedOut => {}
                    Err(_) => break,
                }
            }
        }
        SocketPolicy::KeepOpen => {
            let mut head = format!(
                "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n",
                response.status,
                response.reason,
                response.body.len()
            );
            for (name, value) in &response.headers {
                head.push_str(&format!("{}: {}\r\n", name, value));
            }
            head.push_str("\r\n");
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(&response.body);
            let _ = stream.flush();
        }
    }
}

fn read_request(stream: &TcpStream) -> Option<RecordedRequest> {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).ok()? == 0 {
        return None;
    }

    let mut headers = Vec::new();
    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).ok()? == 0 {
            return None;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            let (name, value) = (name.trim().to_string(), value.trim().to_string());
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.parse().unwrap_or(0);
            }
            headers.push((name, value));
        }
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).ok()?;

    Some(RecordedRequest {
        request_line: request_line.trim_end().to_string(),
        headers,
        body,
    })
}
