use crate::{
    auctioneer::Auctioneer,
    config::{Config, RegistrationMode},
    registrar::RelayRegistrar,
    relay_mux::RelayMux,
    scoring::ValueScorer,
    unblinder::Unblinder,
};
use block_relay_rs::{
    blinded_block_provider::Server, metrics, metrics::Metrics, registrar::RegistrarKind,
    BidProvider, BidProviders, Error, Relay, RelayEndpoints,
};
use futures::future::{maybe_done, MaybeDone, OptionFuture};
use std::{
    future::Future,
    net::SocketAddr,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

pub struct Service {
    config: Config,
}

impl Service {
    pub fn from(config: Config) -> Self {
        Self { config }
    }

    /// Spawns the builder API server (and the metrics listener, if configured).
    ///
    /// Every task winds down once `shutdown` is cancelled; the returned handle resolves when
    /// they have drained.
    pub fn spawn(self, shutdown: CancellationToken) -> Result<ServiceHandle, Error> {
        let Self { config } = self;

        let endpoints = RelayEndpoints::from(&config.relays);
        let relays = endpoints.into_iter().map(Relay::from).collect::<Vec<_>>();
        tracing::info!(relays = ?relays, "loaded relays");

        let metrics = Arc::new(Metrics::new()?);
        let providers = relays
            .iter()
            .map(|relay| Arc::new(relay.clone()) as Arc<dyn BidProvider>)
            .collect::<BidProviders>();

        let scorer = Arc::new(ValueScorer::new(config.min_bid));
        let auctioneer = Auctioneer::new(providers.clone(), scorer, config.bid_timeout())
            .with_metrics(metrics.clone());
        let versions = config.versions.clone();
        let unblinder = Unblinder::new(providers, versions, config.unblind_timeout())
            .with_metrics(metrics.clone());
        let relay_mux = RelayMux::new(auctioneer, unblinder, shutdown.clone());

        let mut server =
            Server::new(config.host, config.port, relay_mux).with_metrics(metrics.clone());
        let registrar = RelayRegistrar::new(relays).with_metrics(metrics.clone());
        match config.registration {
            RegistrationMode::Structured => {
                server = server.with_registrar(RegistrarKind::Structured(Arc::new(registrar)));
            }
            RegistrationMode::Passthrough => {
                server = server.with_registrar(RegistrarKind::Passthrough(Arc::new(registrar)));
            }
            RegistrationMode::Disabled => {
                tracing::warn!("validator registrations are disabled");
            }
        }
        let server = server.spawn(shutdown.clone());

        let metrics_server = config.metrics_port.map(|port| {
            let addr = SocketAddr::from((config.host, port));
            tokio::spawn(async move {
                tracing::info!("serving metrics at {addr}...");
                let server = axum::Server::bind(&addr)
                    .serve(metrics::router(metrics).into_make_service())
                    .with_graceful_shutdown(async move { shutdown.cancelled().await });
                if let Err(err) = server.await {
                    tracing::error!("error while serving metrics: {err}");
                }
            })
        });

        Ok(ServiceHandle {
            server: maybe_done(server),
            metrics_server: maybe_done(OptionFuture::from(metrics_server)),
        })
    }
}

/// Contains the handles to the tasks spawned by [`Service::spawn`]
///
/// Resolves once every task has finished.
#[pin_project::pin_project]
pub struct ServiceHandle {
    #[pin]
    server: MaybeDone<JoinHandle<()>>,
    #[pin]
    metrics_server: MaybeDone<OptionFuture<JoinHandle<()>>>,
}

impl Future for ServiceHandle {
    type Output = Result<(), JoinError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut this = self.project();
        let server = this.server.as_mut().poll(cx);
        let metrics_server = this.metrics_server.as_mut().poll(cx);
        if server.is_pending() || metrics_server.is_pending() {
            return Poll::Pending
        }

        let server = this.server.take_output().unwrap_or(Ok(()));
        let metrics_server = this.metrics_server.take_output().flatten().unwrap_or(Ok(()));
        Poll::Ready(server.and(metrics_server))
    }
}
