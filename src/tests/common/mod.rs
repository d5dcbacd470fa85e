pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::routing::post;
use axum::Json;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use http::StatusCode;
use serde_json::Value;

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

/// An address nothing listens on.
pub async fn closed_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Unsigned three-segment JWT carrying `exp` and a marker claim.
pub fn sample_jwt(exp: u64, marker: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS512","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"svc","marker":"{}","exp":{}}}"#, marker, exp));
    format!("{}.{}.c2lnbmF0dXJl", header, payload)
}

pub fn id_token_body(token: &str) -> (StatusCode, String) {
    (StatusCode::OK, json!({ "id_token": token }).to_string())
}

pub fn env_for(addr: SocketAddr) -> HashMap<String, String> {
    HashMap::from([
        ("API_JWT_USER".to_string(), "svc".to_string()),
        ("API_JWT_PASS".to_string(), "secret".to_string()),
        ("API_BASE_URL".to_string(), format!("http://{}", addr)),
    ])
}

type Reply = Arc<dyn Fn(usize) -> (StatusCode, String) + Send + Sync>;

/// Stub backend exposing `POST /api/authenticate`.
///
/// `reply` receives the zero-based hit number.
pub struct AuthStub {
    pub addr: SocketAddr,
    pub hits: Arc<AtomicUsize>,
    pub last_body: Arc<Mutex<Option<Value>>>,
    pub handle: JoinHandle<()>,
}

impl AuthStub {
    pub async fn spawn(reply: impl Fn(usize) -> (StatusCode, String) + Send + Sync + 'static) -> Self {
        Self::spawn_with(reply, Duration::ZERO, Router::new()).await
    }

    /// `delay` holds every authentication answer back; `extra` adds backend routes.
    pub async fn spawn_with(
        reply: impl Fn(usize) -> (StatusCode, String) + Send + Sync + 'static,
        delay: Duration,
        extra: Router,
    ) -> Self {
        let reply: Reply = Arc::new(reply);
        let hits = Arc::new(AtomicUsize::new(0));
        let last_body = Arc::new(Mutex::new(None));

        let (hits_c, body_c) = (hits.clone(), last_body.clone());
        let router = Router::new()
            .route(
                "/api/authenticate",
                post(move |Json(body): Json<Value>| {
                    let (reply, hits, last_body) = (reply.clone(), hits_c.clone(), body_c.clone());
                    async move {
                        let n = hits.fetch_add(1, Ordering::SeqCst);
                        *last_body.lock().unwrap() = Some(body);
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                        reply(n)
                    }
                }),
            )
            .merge(extra);

        let (handle, addr) = spawn_axum(router).await;
        Self { addr, hits, last_body, handle }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for AuthStub {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
