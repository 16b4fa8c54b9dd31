//! Shared utilities for integration testing.

use std::collections::HashMap;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cat_annotator::config::ServiceConfig;
use cat_annotator::http::HttpServer;
use cat_annotator::lifecycle::Shutdown;
use cat_annotator::observability::Tracer;
use cat_annotator::pipeline::FontAsset;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use opentelemetry::Value;
use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider, SpanData};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub const FONT_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/DejaVuSansMono.ttf");

/// A canned upstream response.
#[derive(Clone)]
pub struct Canned {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Canned {
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type: "application/json",
            body: body.into().into_bytes(),
        }
    }

    pub fn png(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: "image/png",
            body,
        }
    }
}

/// Mock upstream serving canned responses by request path.
///
/// Unknown paths get a 404. Every requested path is recorded.
pub struct MockUpstream {
    pub addr: SocketAddr,
    hits: Arc<Mutex<Vec<String>>>,
}

impl MockUpstream {
    pub async fn start(routes: HashMap<&'static str, Canned>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(Mutex::new(Vec::new()));
        let routes = Arc::new(routes);

        let recorded = hits.clone();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let routes = routes.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    let path = read_request_path(&mut socket).await;
                    recorded.lock().unwrap().push(path.clone());

                    let canned = routes.get(path.as_str()).cloned().unwrap_or(Canned {
                        status: 404,
                        content_type: "text/plain",
                        body: b"not found".to_vec(),
                    });
                    let reason = if canned.status == 200 { "OK" } else { "Not Found" };
                    let head = format!(
                        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        canned.status,
                        reason,
                        canned.content_type,
                        canned.body.len()
                    );
                    let _ = socket.write_all(head.as_bytes()).await;
                    let _ = socket.write_all(&canned.body).await;
                    let _ = socket.shutdown().await;
                    tokio::time::sleep(Duration::from_millis(10)).await;
                });
            }
        });

        Self { addr, hits }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }
}

async fn read_request_path(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    let head = String::from_utf8_lossy(&buf);
    head.split_whitespace().nth(1).unwrap_or("/").to_string()
}

/// A solid-colour PNG of the given size.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([200, 180, 160, 255]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image).write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// An address nothing is listening on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Start the service against `search_url`; returns its address.
///
/// The server stops when the returned `Shutdown` is triggered or dropped.
pub async fn start_service(search_url: String, tracer: Tracer) -> (SocketAddr, Shutdown) {
    let mut config = ServiceConfig::default();
    config.photo_api.search_url = search_url;
    config.photo_api.api_key = "test-key".into();
    config.annotation.font_path = FONT_PATH.into();
    config.timeouts.outbound_secs = 2;

    let font = FontAsset::load(FONT_PATH).unwrap();
    let server = HttpServer::new(config, font, tracer).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

/// A tracer whose finished spans land in the returned exporter.
pub fn recording_tracer(verbose: bool) -> (Tracer, InMemorySpanExporter) {
    let exporter = InMemorySpanExporter::default();
    let provider = SdkTracerProvider::builder()
        .with_simple_exporter(exporter.clone())
        .build();
    (Tracer::new(verbose, provider), exporter)
}

pub fn find_span(exporter: &InMemorySpanExporter, name: &str) -> Option<SpanData> {
    exporter
        .get_finished_spans()
        .unwrap()
        .into_iter()
        .find(|s| s.name == name)
}

/// Tagged `error=true`.
pub fn is_error(span: &SpanData) -> bool {
    span.attributes
        .iter()
        .any(|kv| kv.key.as_str() == "error" && kv.value == Value::Bool(true))
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
