use prometheus::{HistogramOpts, Histogram, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Process-wide metrics, created on first use.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE
        .get_or_init(|| async {
            info!("Initializing Metrics ...");
            Metrics::new()
        })
        .await
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Authentication endpoint
    pub auth_requests: IntCounter,
    pub auth_failures: IntCounterVec,
    pub auth_duration: Histogram,

    // Cache
    pub cache_hits: IntCounter,
    pub token_expiry_unix: IntGauge,

    pub up: IntGauge,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("apitoken".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            auth_requests: IntCounter::new("auth_requests_total", "Authentication requests sent").unwrap(),
            auth_failures: IntCounterVec::new(Opts::new("auth_failures_total", "Token acquisition failures by reason"), &["reason"]).unwrap(),
            auth_duration: Histogram::with_opts(HistogramOpts::new("auth_duration_seconds", "Authentication duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0])).unwrap(),

            cache_hits: IntCounter::new("token_cache_hits_total", "Tokens served from cache").unwrap(),
            token_expiry_unix: IntGauge::new("token_expiry_unix_seconds", "Cached token expiry timestamp").unwrap(),

            up: IntGauge::new("up", "1 if service is healthy").unwrap(),

            registry,
        });

        let reg = &metrics.registry;
        reg.register(Box::new(metrics.auth_requests.clone())).unwrap();
        reg.register(Box::new(metrics.auth_failures.clone())).unwrap();
        reg.register(Box::new(metrics.auth_duration.clone())).unwrap();
        reg.register(Box::new(metrics.cache_hits.clone())).unwrap();
        reg.register(Box::new(metrics.token_expiry_unix.clone())).unwrap();
        reg.register(Box::new(metrics.up.clone())).unwrap();

        metrics
    }
}
