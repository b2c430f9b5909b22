use crate::{
    blinded_block_provider::BlindedBlockProvider,
    codec::{
        Codec, ContentType, AUCTION_CONTENTS, BUILDER_BIDS, CONSENSUS_VERSION_HEADER,
        SIGNED_BLINDED_BLOCKS,
    },
    error::Error,
    metrics::Metrics,
    registrar::RegistrarKind,
    types::{AuctionRequest, BlockVersion, Versioned},
};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, IntoMakeService},
    Router,
};
use hyper::server::conn::AddrIncoming;
use std::{
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Type alias for the configured axum server
pub type BlockProviderServer = axum::Server<AddrIncoming, IntoMakeService<Router>>;

#[derive(Clone)]
struct AppState<B> {
    provider: B,
    registrar: Option<RegistrarKind>,
    metrics: Option<Arc<Metrics>>,
}

impl<B> AppState<B> {
    fn record<T>(&self, request: &str, result: &Result<T, Error>) {
        if let Some(metrics) = &self.metrics {
            metrics.record_request(request, result);
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn encode_response<T: Versioned>(
    codec: &Codec<T>,
    value: &T,
    headers: &HeaderMap,
) -> Result<Response, Error> {
    let content_type = ContentType::from_accept(header_str(headers, header::ACCEPT.as_str()));
    let body = codec.encode(content_type, value)?;
    let response_headers = [
        (header::CONTENT_TYPE.as_str(), content_type.mime()),
        (CONSENSUS_VERSION_HEADER, value.version().as_str()),
    ];
    Ok((StatusCode::OK, response_headers, body).into_response())
}

async fn handle_status_check() -> impl IntoResponse {
    tracing::debug!("status check");
    StatusCode::OK
}

async fn handle_validator_registration<B>(
    State(state): State<AppState<B>>,
    body: Bytes,
) -> Result<StatusCode, Error> {
    tracing::trace!(size = body.len(), "processing validator registrations");

    let result = match &state.registrar {
        Some(registrar) => registrar.register(body).await,
        None => Err(Error::RegistrationUnsupported),
    };
    state.record("register_validators", &result);
    result.map(|_| StatusCode::OK)
}

async fn handle_fetch_bid<B: BlindedBlockProvider>(
    State(state): State<AppState<B>>,
    Path((slot, parent_hash, public_key)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Result<Response, Error> {
    let result: Result<Response, Error> = async {
        let auction_request = AuctionRequest::from_path(&slot, &parent_hash, &public_key)?;
        tracing::trace!(%auction_request, "fetching best bid");

        match state.provider.fetch_best_bid(&auction_request).await? {
            Some(signed_bid) => encode_response(&BUILDER_BIDS, &signed_bid, &headers),
            None => Ok(StatusCode::NO_CONTENT.into_response()),
        }
    }
    .await;
    state.record("fetch_bid", &result);
    result
}

async fn handle_unblind_block<B: BlindedBlockProvider>(
    State(state): State<AppState<B>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, Error> {
    let result: Result<Response, Error> = async {
        let raw_version = headers.get(CONSENSUS_VERSION_HEADER).ok_or(Error::MissingVersion)?;
        let version = raw_version
            .to_str()
            .map_err(|_| {
                Error::UnknownBlockVersion(String::from_utf8_lossy(raw_version.as_bytes()).into())
            })?
            .parse::<BlockVersion>()?;
        let raw_content_type = headers
            .get(header::CONTENT_TYPE)
            .map(|value| {
                value.to_str().map_err(|_| {
                    let value = String::from_utf8_lossy(value.as_bytes());
                    Error::UnsupportedContentType(value.into())
                })
            })
            .transpose()?;
        let content_type = ContentType::from_header(raw_content_type)?;

        let signed_block = SIGNED_BLINDED_BLOCKS.decode(version, content_type, &body)?;
        tracing::trace!(%version, slot = signed_block.slot(), "unblinding block");

        match state.provider.unblind_block(&signed_block).await? {
            Some(contents) => encode_response(&AUCTION_CONTENTS, &contents, &headers),
            None => Ok(StatusCode::NO_CONTENT.into_response()),
        }
    }
    .await;
    state.record("unblind_block", &result);
    result
}

pub struct Server<B: BlindedBlockProvider> {
    host: Ipv4Addr,
    port: u16,
    provider: B,
    registrar: Option<RegistrarKind>,
    metrics: Option<Arc<Metrics>>,
}

impl<B: BlindedBlockProvider + Clone + Send + Sync + 'static> Server<B> {
    pub fn new(host: Ipv4Addr, port: u16, provider: B) -> Self {
        Self { host, port, provider, registrar: None, metrics: None }
    }

    pub fn with_registrar(mut self, registrar: RegistrarKind) -> Self {
        self.registrar = Some(registrar);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn router(&self) -> Router {
        let state = AppState {
            provider: self.provider.clone(),
            registrar: self.registrar.clone(),
            metrics: self.metrics.clone(),
        };
        Router::new()
            .route("/eth/v1/builder/status", get(handle_status_check))
            .route("/eth/v1/builder/validators", post(handle_validator_registration::<B>))
            .route(
                "/eth/v1/builder/header/:slot/:parenthash/:pubkey",
                get(handle_fetch_bid::<B>),
            )
            .route("/eth/v1/builder/blinded_blocks", post(handle_unblind_block::<B>))
            .with_state(state)
    }

    /// Configures and returns the axum server
    pub fn serve(&self) -> BlockProviderServer {
        let addr = SocketAddr::from((self.host, self.port));
        axum::Server::bind(&addr).serve(self.router().into_make_service())
    }

    /// Spawns the server on a new task returning the handle for it.
    ///
    /// The server stops accepting connections once `shutdown` is cancelled and the task
    /// completes after in-flight requests drain.
    pub fn spawn(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        let server = self.serve();
        let address = server.local_addr();
        tokio::spawn(async move {
            tracing::info!("listening at {address}...");
            let server = server.with_graceful_shutdown(async move { shutdown.cancelled().await });
            if let Err(err) = server.await {
                tracing::error!("error while listening for incoming: {err}")
            }
        })
    }
}
