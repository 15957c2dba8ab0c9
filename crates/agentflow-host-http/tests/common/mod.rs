//! Canned-response HTTP server for exercising the reqwest capabilities.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone)]
pub struct Recorded {
  pub method: String,
  pub path: String,
  pub authorization: Option<String>,
  pub body: Value,
}

pub struct Reply {
  pub status: u16,
  pub body: Value,
}

impl Reply {
  pub fn ok(body: Value) -> Self {
    Self { status: 200, body }
  }

  pub fn status(status: u16, body: Value) -> Self {
    Self { status, body }
  }
}

/// Answers each request with the next reply, one connection per request.
/// Once the replies run out, requests are recorded and left hanging.
pub struct FakeServer {
  pub base_url: String,
  requests: Arc<Mutex<Vec<Recorded>>>,
}

impl FakeServer {
  pub async fn start(replies: Vec<Reply>) -> Self {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let requests = Arc::new(Mutex::new(Vec::new()));

    let seen = requests.clone();
    let mut replies: VecDeque<Reply> = replies.into();
    tokio::spawn(async move {
      while let Ok((mut stream, _)) = listener.accept().await {
        let Some(request) = read_request(&mut stream).await else {
          continue;
        };
        seen.lock().unwrap().push(request);

        match replies.pop_front() {
          Some(reply) => write_reply(&mut stream, reply).await,
          None => {
            tokio::spawn(async move {
              let _held = stream;
              std::future::pending::<()>().await;
            });
          }
        }
      }
    });

    Self { base_url, requests }
  }

  pub fn requests(&self) -> Vec<Recorded> {
    self.requests.lock().unwrap().clone()
  }

  pub async fn wait_for_requests(&self, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
      while self.requests.lock().unwrap().len() < count {
        tokio::time::sleep(Duration::from_millis(5)).await;
      }
    })
    .await
    .expect("server did not receive the expected requests");
  }
}

async fn read_request(stream: &mut TcpStream) -> Option<Recorded> {
  let mut buf = Vec::new();
  let mut chunk = [0u8; 4096];
  let head_end = loop {
    if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
      break pos + 4;
    }
    let n = stream.read(&mut chunk).await.ok()?;
    if n == 0 {
      return None;
    }
    buf.extend_from_slice(&chunk[..n]);
  };

  let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
  let mut lines = head.lines();
  let mut request_line = lines.next()?.split_whitespace();
  let method = request_line.next()?.to_string();
  let path = request_line.next()?.to_string();

  let mut content_length = 0;
  let mut authorization = None;
  for line in lines {
    if let Some((name, value)) = line.split_once(':') {
      match name.trim().to_ascii_lowercase().as_str() {
        "content-length" => content_length = value.trim().parse().unwrap_or(0),
        "authorization" => authorization = Some(value.trim().to_string()),
        _ => {}
      }
    }
  }

  while buf.len() < head_end + content_length {
    let n = stream.read(&mut chunk).await.ok()?;
    if n == 0 {
      return None;
    }
    buf.extend_from_slice(&chunk[..n]);
  }
  let body = serde_json::from_slice(&buf[head_end..head_end + content_length]).unwrap_or(Value::Null);

  Some(Recorded {
    method,
    path,
    authorization,
    body,
  })
}

async fn write_reply(stream: &mut TcpStream, reply: Reply) {
  let body = reply.body.to_string();
  let response = format!(
    "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
    reply.status,
    body.len(),
    body
  );
  let _ = stream.write_all(response.as_bytes()).await;
  let _ = stream.shutdown().await;
}
