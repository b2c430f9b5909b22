use crate::error::Error;
use axum::{extract::State, http::header, response::IntoResponse, routing::get, Router};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
    DEFAULT_BUCKETS,
};
use std::{sync::Arc, time::Duration};

const NAMESPACE: &str = "blockrelay";

const REQUEST_LABEL: &str = "request";
const RESULT_LABEL: &str = "result";
const API_METHOD_LABEL: &str = "method";
const PROVIDER_LABEL: &str = "provider";

#[derive(Copy, Clone, Debug)]
pub enum ApiMethod {
    Register,
    FetchBid,
    UnblindBlock,
}

impl ApiMethod {
    pub const fn as_str(&self) -> &str {
        match self {
            Self::Register => "register",
            Self::FetchBid => "fetch_bid",
            Self::UnblindBlock => "unblind_block",
        }
    }
}

/// Prometheus collectors for one running service, held in their own registry.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    requests: IntCounterVec,
    provider_requests: IntCounterVec,
    provider_timeouts: IntCounterVec,
    provider_request_duration: HistogramVec,
    invalid_bids: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, Error> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("requests_total", "total number of handled builder API requests")
                .namespace(NAMESPACE),
            &[REQUEST_LABEL, RESULT_LABEL],
        )?;
        let provider_requests = IntCounterVec::new(
            Opts::new("provider_requests_total", "total number of requests sent to providers")
                .namespace(NAMESPACE),
            &[API_METHOD_LABEL, PROVIDER_LABEL],
        )?;
        let provider_timeouts = IntCounterVec::new(
            Opts::new("provider_timeouts_total", "total number of provider request timeouts")
                .namespace(NAMESPACE),
            &[API_METHOD_LABEL, PROVIDER_LABEL],
        )?;
        let provider_request_duration = HistogramVec::new(
            HistogramOpts {
                common_opts: Opts::new(
                    "provider_request_duration_seconds",
                    "duration (in seconds) of provider requests",
                )
                .namespace(NAMESPACE),
                buckets: DEFAULT_BUCKETS.to_vec(),
            },
            &[API_METHOD_LABEL, PROVIDER_LABEL],
        )?;
        let invalid_bids = IntCounterVec::new(
            Opts::new("auction_invalid_bids_total", "total number of excluded builder bids")
                .namespace(NAMESPACE),
            &[PROVIDER_LABEL],
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(provider_requests.clone()))?;
        registry.register(Box::new(provider_timeouts.clone()))?;
        registry.register(Box::new(provider_request_duration.clone()))?;
        registry.register(Box::new(invalid_bids.clone()))?;

        Ok(Self {
            registry,
            requests,
            provider_requests,
            provider_timeouts,
            provider_request_duration,
            invalid_bids,
        })
    }

    pub fn record_request<T>(&self, request: &str, result: &Result<T, Error>) {
        let result = if result.is_ok() { "success" } else { "failure" };
        self.requests.with_label_values(&[request, result]).inc();
    }

    pub fn inc_provider_request(&self, method: ApiMethod, provider: &str) {
        self.provider_requests.with_label_values(&[method.as_str(), provider]).inc();
    }

    pub fn inc_provider_timeout(&self, method: ApiMethod, provider: &str) {
        self.provider_timeouts.with_label_values(&[method.as_str(), provider]).inc();
    }

    pub fn observe_provider_duration(&self, method: ApiMethod, provider: &str, elapsed: Duration) {
        self.provider_request_duration
            .with_label_values(&[method.as_str(), provider])
            .observe(elapsed.as_secs_f64());
    }

    pub fn inc_invalid_bid(&self, provider: &str) {
        self.invalid_bids.with_label_values(&[provider]).inc();
    }

    /// Renders every collector in the prometheus text format.
    pub fn encode(&self) -> Result<String, Error> {
        let mut buffer = vec![];
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|err| Error::Internal(err.to_string()))
    }
}

async fn handle_metrics(State(metrics): State<Arc<Metrics>>) -> Result<impl IntoResponse, Error> {
    let body = metrics.encode()?;
    Ok(([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body))
}

/// Serves the registry at `GET /metrics`.
pub fn router(metrics: Arc<Metrics>) -> Router {
    Router::new().route("/metrics", get(handle_metrics)).with_state(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_recorded_values() {
        let metrics = Metrics::new().unwrap();
        metrics.record_request::<()>("fetch_bid", &Ok(()));
        metrics.inc_provider_request(ApiMethod::FetchBid, "relay-a");
        metrics.inc_invalid_bid("relay-a");

        let text = metrics.encode().unwrap();
        assert!(text.contains(r#"blockrelay_requests_total{request="fetch_bid",result="success"} 1"#));
        assert!(text.contains(r#"blockrelay_provider_requests_total{method="fetch_bid",provider="relay-a"} 1"#));
        assert!(text.contains(r#"blockrelay_auction_invalid_bids_total{provider="relay-a"} 1"#));
    }
}
