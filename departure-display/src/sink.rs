//! Places the rotation can write to.

use crate::error::SinkError;
use async_trait::async_trait;
use chrono::Local;
use serde::Serialize;
use std::time::Duration;
use tracing::trace;

/// Upper bound for a single request to the matrix display.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Something that can show one line of text at a time.
#[async_trait]
pub trait DisplaySink: Send + Sync + 'static {
    /// One-time preparation before the first line is shown.
    ///
    /// # Errors
    ///
    /// Implementations report an unreachable or unhappy display here;
    /// the scheduler logs the failure and proceeds with writes anyway.
    async fn setup(&self) -> Result<(), SinkError>;

    /// Shows `text`, replacing whatever was on the display.
    ///
    /// # Errors
    ///
    /// As with [`DisplaySink::setup`], failures are logged by the scheduler and the rotation continues.
    async fn write(&self, text: &str) -> Result<(), SinkError>;
}

#[derive(Serialize)]
struct ScrollRequest<'a> {
    arg: &'a str,
}

#[derive(Serialize)]
struct TextRequest<'a> {
    text: &'a str,
    time: bool,
}

/// An LED matrix sign driven over HTTP.
#[derive(Debug, Clone)]
pub struct MatrixDisplay {
    client: reqwest::Client,
    base_url: String,
}

impl MatrixDisplay {
    /// Creates a client for the display at `base_url` (e.g. `http://192.168.1.50`).
    ///
    /// # Errors
    ///
    /// Fails only if the HTTP client can't be initialized (ex: no TLS backend).
    pub fn new(base_url: &str) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post<T: Serialize + Sync>(&self, route: &str, body: &T) -> Result<(), SinkError> {
        let url = format!("{}/{route}", self.base_url);
        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        trace!(%url, %status, "Display request completed");

        if status.is_success() {
            Ok(())
        } else {
            Err(SinkError::Status(status))
        }
    }
}

#[async_trait]
impl DisplaySink for MatrixDisplay {
    /// Switches the display to continuous scrolling.
    async fn setup(&self) -> Result<(), SinkError> {
        self.post("scroll", &ScrollRequest { arg: "auto" }).await
    }

    async fn write(&self, text: &str) -> Result<(), SinkError> {
        self.post("text", &TextRequest { text, time: true }).await
    }
}

/// Prints timestamped lines to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleDisplay;

#[async_trait]
impl DisplaySink for ConsoleDisplay {
    async fn setup(&self) -> Result<(), SinkError> {
        Ok(())
    }

    async fn write(&self, text: &str) -> Result<(), SinkError> {
        println!("{}: {text}", Local::now().format("%Y-%m-%dT%H:%M:%S%.6f"));
        Ok(())
    }
}

/// The display a board writes to, chosen once at startup.
#[derive(Debug, Clone)]
pub enum Sink {
    Matrix(MatrixDisplay),
    Console(ConsoleDisplay),
}

impl Sink {
    /// A matrix display if a URL is configured; the console otherwise.
    ///
    /// # Errors
    ///
    /// See [`MatrixDisplay::new`].
    pub fn from_url(display_url: Option<&str>) -> Result<Self, SinkError> {
        Ok(match display_url {
            Some(url) => Sink::Matrix(MatrixDisplay::new(url)?),
            None => Sink::Console(ConsoleDisplay),
        })
    }
}

#[async_trait]
impl DisplaySink for Sink {
    async fn setup(&self) -> Result<(), SinkError> {
        match self {
            Sink::Matrix(display) => display.setup().await,
            Sink::Console(display) => display.setup().await,
        }
    }

    async fn write(&self, text: &str) -> Result<(), SinkError> {
        match self {
            Sink::Matrix(display) => display.write(text).await,
            Sink::Console(display) => display.write(text).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    type Requests = Arc<Mutex<Vec<(String, Value)>>>;

    /// Reads one HTTP request and returns its path and JSON body.
    async fn read_request(stream: &mut TcpStream) -> (String, Value) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        let header_end = loop {
            let n = stream.read(&mut chunk).await.expect("readable");
            assert!(n > 0, "connection closed mid-request");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let path = head
            .split_whitespace()
            .nth(1)
            .expect("request line has a path")
            .to_string();
        let content_length: usize = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse().ok())
                    .flatten()
            })
            .unwrap_or(0);

        while buf.len() < header_end + content_length {
            let n = stream.read(&mut chunk).await.expect("readable");
            assert!(n > 0, "connection closed mid-body");
            buf.extend_from_slice(&chunk[..n]);
        }

        let body = serde_json::from_slice(&buf[header_end..header_end + content_length])
            .expect("JSON body");
        (path, body)
    }

    /// A fake display which fails `/scroll` with a 500 and accepts everything else.
    async fn fake_display() -> (String, Requests) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let requests = Requests::default();

        let recorded = Arc::clone(&requests);
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let (path, body) = read_request(&mut stream).await;
                let status = if path == "/scroll" {
                    "500 Internal Server Error"
                } else {
                    "200 OK"
                };
                recorded.lock().expect("not poisoned").push((path, body));

                let response = format!("HTTP/1.1 {status}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        (format!("http://{addr}/"), requests)
    }

    #[tokio::test]
    async fn matrix_display_requests() {
        let (url, requests) = fake_display().await;
        let display = MatrixDisplay::new(&url).expect("client");

        let setup = display.setup().await;
        assert!(matches!(setup, Err(SinkError::Status(status)) if status.as_u16() == 500));
        display.write("Oslo S 08:03").await.expect("text accepted");

        let requests = requests.lock().expect("not poisoned").clone();
        assert_eq!(
            requests,
            vec![
                ("/scroll".to_string(), json!({"arg": "auto"})),
                ("/text".to_string(), json!({"text": "Oslo S 08:03", "time": true})),
            ]
        );
    }

    #[tokio::test]
    async fn unreachable_display() {
        // Nothing listens on port 9 (discard) locally
        let display = MatrixDisplay::new("http://127.0.0.1:9").expect("client");
        assert!(matches!(display.write("hello").await, Err(SinkError::Http(_))));
    }

    #[tokio::test]
    async fn console_display_needs_no_setup() {
        let console = Sink::Console(ConsoleDisplay);
        console.setup().await.expect("nothing to set up");
        console.write("Oslo S 08:03(!) (+3 min)").await.expect("stdout is writable");
    }

    #[test]
    fn sink_selection() {
        assert!(matches!(Sink::from_url(None), Ok(Sink::Console(_))));
        assert!(matches!(
            Sink::from_url(Some("http://display.local")),
            Ok(Sink::Matrix(_))
        ));
    }
}
