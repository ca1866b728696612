// Shared test utilities: a loopback HTTP server for registry and
// download stubs. Not every test binary uses every helper.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request as HyperRequest, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A recorded view of one incoming request, handed to the router.
pub struct StubRequest {
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    /// Zero-based index of this request across the server's lifetime.
    pub sequence: usize,
}

/// A plain-HTTP stub server driven by a routing closure.
///
/// The server counts every request it handles and tracks how many are
/// in flight at once; tests use the counts to assert on caching and
/// concurrency-limit behavior. Aborts on drop.
pub struct StubServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
    hits: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl StubServer {
    /// The `host:port` string clients should use as the registry.
    pub fn registry(&self) -> String {
        format!("127.0.0.1:{}", self.addr.port())
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.addr.port(), path)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// The most requests ever observed in flight at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn spawn_server<F>(router: F) -> StubServer
where
    F: Fn(&StubRequest) -> Response<Full<Bytes>> + Send + Sync + 'static,
{
    spawn_server_with_latency(Duration::ZERO, router).await
}

/// Like [`spawn_server`] but every request is held open for `latency`
/// before answering, so overlapping requests stay observably in flight.
pub async fn spawn_server_with_latency<F>(latency: Duration, router: F) -> StubServer
where
    F: Fn(&StubRequest) -> Response<Full<Bytes>> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = Arc::new(router);
    let hits = Arc::new(AtomicUsize::new(0));
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak_in_flight = Arc::new(AtomicUsize::new(0));
    let hits_for_server = hits.clone();
    let in_flight_for_server = in_flight.clone();
    let peak_for_server = peak_in_flight.clone();

    let handle = tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            let router = router.clone();
            let hits = hits_for_server.clone();
            let in_flight = in_flight_for_server.clone();
            let peak = peak_for_server.clone();

            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req: HyperRequest<hyper::body::Incoming>| {
                    let router = router.clone();
                    let hits = hits.clone();
                    let in_flight = in_flight.clone();
                    let peak = peak.clone();
                    async move {
                        let sequence = hits.fetch_add(1, Ordering::SeqCst);
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        if latency > Duration::ZERO {
                            tokio::time::sleep(latency).await;
                        }
                        let stub = StubRequest {
                            path: req.uri().path().to_string(),
                            query: req.uri().query().map(str::to_string),
                            authorization: req
                                .headers()
                                .get("authorization")
                                .and_then(|v| v.to_str().ok())
                                .map(str::to_string),
                            sequence,
                        };
                        let response = router(&stub);
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        Ok::<_, std::convert::Infallible>(response)
                    }
                });

                let _ = http1::Builder::new().serve_connection(io, service).await;
            });
        }
    });

    StubServer {
        addr,
        handle,
        hits,
        in_flight,
        peak_in_flight,
    }
}

pub fn response(status: StatusCode, body: &[u8]) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .body(Full::new(Bytes::copy_from_slice(body)))
        .unwrap()
}

pub fn json_response(value: serde_json::Value) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(value.to_string())))
        .unwrap()
}

pub fn unauthorized(realm_url: &str, service: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::UNAUTHORIZED)
        .header(
            "WWW-Authenticate",
            format!(r#"Bearer realm="{}", service="{}""#, realm_url, service),
        )
        .body(Full::new(Bytes::from_static(
            br#"{"errors":[{"code":"UNAUTHORIZED","message":"authentication required"}]}"#,
        )))
        .unwrap()
}
