use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

use crate::errors::Result;

pub struct MetricsService {
    registry: Registry,
    uploads_total: IntCounter,
    jobs_total: IntCounterVec,
    provider_request_seconds: HistogramVec,
    queue_depth: IntGauge,
}

impl MetricsService {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let uploads_total = IntCounter::with_opts(Opts::new(
            "uploads_total",
            "Asset uploads accepted",
        ))
        .map_err(|e| crate::errors::AppError::Internal(e.into()))?;

        let jobs_total = IntCounterVec::new(
            Opts::new("jobs_total", "Jobs finished, by kind and outcome"),
            &["kind", "outcome"],
        )
        .map_err(|e| crate::errors::AppError::Internal(e.into()))?;

        let provider_request_seconds = HistogramVec::new(
            HistogramOpts::new(
                "provider_request_seconds",
                "Wall time of remote inference calls",
            ),
            &["provider"],
        )
        .map_err(|e| crate::errors::AppError::Internal(e.into()))?;

        let queue_depth = IntGauge::with_opts(Opts::new(
            "queue_depth",
            "Jobs waiting on the broker",
        ))
        .map_err(|e| crate::errors::AppError::Internal(e.into()))?;

        registry
            .register(Box::new(uploads_total.clone()))
            .and_then(|_| registry.register(Box::new(jobs_total.clone())))
            .and_then(|_| registry.register(Box::new(provider_request_seconds.clone())))
            .and_then(|_| registry.register(Box::new(queue_depth.clone())))
            .map_err(|e| crate::errors::AppError::Internal(e.into()))?;

        Ok(Self {
            registry,
            uploads_total,
            jobs_total,
            provider_request_seconds,
            queue_depth,
        })
    }

    pub fn record_upload(&self) {
        self.uploads_total.inc();
    }

    pub fn record_job_outcome(&self, kind: &str, outcome: &str) {
        self.jobs_total.with_label_values(&[kind, outcome]).inc();
    }

    pub fn observe_provider_request(&self, provider: &str, seconds: f64) {
        self.provider_request_seconds
            .with_label_values(&[provider])
            .observe(seconds);
    }

    pub fn set_queue_depth(&self, depth: i64) {
        self.queue_depth.set(depth);
    }

    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| crate::errors::AppError::Internal(e.into()))?;

        String::from_utf8(buffer).map_err(|e| crate::errors::AppError::Internal(e.into()))
    }
}
