use async_trait::async_trait;
use axum::body::Bytes;
use block_relay_rs::{
    metrics::{ApiMethod, Metrics},
    registrar::{RegistrationHandler, RegistrationPassthrough},
    types::SignedValidatorRegistration,
    BidProvider, Error, Relay,
};
use futures::future::join_all;
use std::{future::Future, sync::Arc, time::Instant};

/// Forwards validator registrations to every configured relay.
///
/// A batch counts as accepted when at least one relay takes it.
#[derive(Clone)]
pub struct RelayRegistrar {
    relays: Arc<Vec<Relay>>,
    metrics: Option<Arc<Metrics>>,
}

impl RelayRegistrar {
    pub fn new(relays: Vec<Relay>) -> Self {
        Self { relays: Arc::new(relays), metrics: None }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    async fn metered(
        &self,
        relay: &Relay,
        request: impl Future<Output = Result<(), Error>>,
    ) -> Result<(), Error> {
        let id = relay.id();
        if let Some(metrics) = &self.metrics {
            metrics.inc_provider_request(ApiMethod::Register, id);
        }
        let start = Instant::now();
        let response = request.await;
        if let Some(metrics) = &self.metrics {
            metrics.observe_provider_duration(ApiMethod::Register, id, start.elapsed());
        }
        response
    }

    fn collect_failures(&self, responses: Vec<Result<(), Error>>) -> Vec<String> {
        if self.relays.is_empty() {
            return vec!["no relays configured".to_string()]
        }

        let mut failures = vec![];
        for (relay, response) in self.relays.iter().zip(responses) {
            match response {
                Ok(()) => tracing::debug!(%relay, "relay accepted registrations"),
                Err(err) => {
                    tracing::warn!(%relay, %err, "relay rejected registrations");
                    failures.push(format!("{relay}: {err}"));
                }
            }
        }

        if failures.len() == self.relays.len() {
            failures
        } else {
            vec![]
        }
    }
}

#[async_trait]
impl RegistrationPassthrough for RelayRegistrar {
    async fn register_raw(&self, body: Bytes) -> Result<Vec<String>, Error> {
        let responses = join_all(self.relays.iter().map(|relay| {
            self.metered(relay, relay.forward_registrations(body.clone()))
        }))
        .await;
        Ok(self.collect_failures(responses))
    }
}

#[async_trait]
impl RegistrationHandler for RelayRegistrar {
    async fn register_validators(
        &self,
        registrations: &[SignedValidatorRegistration],
    ) -> Result<Vec<String>, Error> {
        let responses = join_all(
            self.relays
                .iter()
                .map(|relay| self.metered(relay, relay.register_validators(registrations))),
        )
        .await;
        Ok(self.collect_failures(responses))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use block_relay_rs::RelayEndpoint;
    use url::Url;

    // nothing listens on the discard port in the test environment
    const UNREACHABLE_RELAY: &str = "http://0x845bd072b7cd566f02faeb0a4033ce9399e42839ced64e8b2adcfc859ed1e8e1a5a293336a49feac6d9a5edb779be53a@127.0.0.1:9";

    fn unreachable_relay() -> Relay {
        let url = Url::parse(UNREACHABLE_RELAY).unwrap();
        Relay::from(RelayEndpoint::try_from(url).unwrap())
    }

    #[tokio::test]
    async fn no_relays_is_an_error() {
        let registrar = RelayRegistrar::new(vec![]);
        let errors = registrar.register_validators(&[]).await.unwrap();
        assert_eq!(errors, vec!["no relays configured".to_string()]);
    }

    #[tokio::test]
    async fn every_relay_failing_is_reported() {
        let registrar = RelayRegistrar::new(vec![unreachable_relay()]);
        let errors = registrar.register_raw(Bytes::from_static(b"[]")).await.unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("http://127.0.0.1:9/"));
    }

    #[tokio::test]
    async fn registrations_are_metered_per_relay() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let registrar =
            RelayRegistrar::new(vec![unreachable_relay()]).with_metrics(metrics.clone());
        registrar.register_validators(&[]).await.unwrap();

        let text = metrics.encode().unwrap();
        let series = r#"provider_requests_total{method="register",provider="http://127.0.0.1:9/"} 1"#;
        assert!(text.contains(series));
    }

    #[test]
    fn one_acceptance_is_enough() {
        let registrar = RelayRegistrar::new(vec![unreachable_relay(), unreachable_relay()]);
        let responses = vec![Err(Error::Internal("unreachable".to_string())), Ok(())];
        assert!(registrar.collect_failures(responses).is_empty());
    }
}
