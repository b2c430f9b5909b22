use crate::{error::Error, types::SignedValidatorRegistration};
use async_trait::async_trait;
use axum::body::Bytes;
use std::sync::Arc;

/// Accepts registration batches exactly as the proposer submitted them.
#[async_trait]
pub trait RegistrationPassthrough: Send + Sync {
    /// Returns one message per rejected registration.
    async fn register_raw(&self, body: Bytes) -> Result<Vec<String>, Error>;
}

/// Accepts decoded registration batches.
#[async_trait]
pub trait RegistrationHandler: Send + Sync {
    /// Returns one message per rejected registration.
    async fn register_validators(
        &self,
        registrations: &[SignedValidatorRegistration],
    ) -> Result<Vec<String>, Error>;
}

/// The registration collaborator, fixed when the server is built.
#[derive(Clone)]
pub enum RegistrarKind {
    Passthrough(Arc<dyn RegistrationPassthrough>),
    Structured(Arc<dyn RegistrationHandler>),
}

impl RegistrarKind {
    /// Hands `body` to the collaborator, decoding it first if required.
    ///
    /// Rejections are reported as [`Error::RegistrationErrors`].
    pub async fn register(&self, body: Bytes) -> Result<(), Error> {
        let errors = match self {
            Self::Passthrough(registrar) => registrar.register_raw(body).await?,
            Self::Structured(registrar) => {
                let registrations: Vec<SignedValidatorRegistration> =
                    serde_json::from_slice(&body)
                        .map_err(|err| Error::InvalidRegistrations(err.to_string()))?;
                tracing::trace!(count = registrations.len(), "processing registrations");
                registrar.register_validators(&registrations).await?
            }
        };

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::RegistrationErrors(errors))
        }
    }
}
