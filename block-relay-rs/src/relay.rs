use crate::{
    bid_provider::{BidProvider, ProviderId},
    blinded_block_provider::Client,
    codec::ContentType,
    error::Error,
    types::{AuctionContents, AuctionRequest, SignedBuilderBid, VersionedSignedBlindedBeaconBlock},
};
use async_trait::async_trait;
use ethereum_consensus::{
    crypto::Error as CryptoError, primitives::BlsPublicKey, serde::try_bytes_from_hex_str,
};
use std::{fmt, ops::Deref};
use url::Url;

#[derive(Clone, Debug)]
pub struct RelayEndpoint {
    url: Url,
    public_key: BlsPublicKey,
}

impl TryFrom<Url> for RelayEndpoint {
    type Error = CryptoError;

    fn try_from(url: Url) -> Result<Self, Self::Error> {
        let public_key = try_bytes_from_hex_str(url.username())?;
        let public_key = BlsPublicKey::try_from(&public_key[..])?;

        Ok(Self { url, public_key })
    }
}

/// A wrapper around a vector of [`RelayEndpoint`]s.
#[derive(Clone, Debug)]
pub struct RelayEndpoints(Vec<RelayEndpoint>);

impl RelayEndpoints {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IntoIterator for RelayEndpoints {
    type Item = RelayEndpoint;
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<T> From<Vec<T>> for RelayEndpoints
where
    T: AsRef<str>,
{
    fn from(value: Vec<T>) -> Self {
        Self::from(value.as_slice())
    }
}

impl<T> From<&Vec<T>> for RelayEndpoints
where
    T: AsRef<str>,
{
    fn from(value: &Vec<T>) -> Self {
        Self::from(value.as_slice())
    }
}

impl<T> From<&[T]> for RelayEndpoints
where
    T: AsRef<str>,
{
    fn from(value: &[T]) -> Self {
        let mut relays = vec![];
        for endpoint in value {
            let e = endpoint.as_ref();
            let url = match Url::parse(e) {
                Ok(url) => url,
                Err(err) => {
                    tracing::error!(%err, %e, "error parsing relay URL from config");
                    continue;
                }
            };
            match RelayEndpoint::try_from(url) {
                Ok(relay) => relays.push(relay),
                Err(err) => {
                    tracing::warn!(%err, %e, "error parsing relay from URL")
                }
            }
        }
        if relays.is_empty() {
            tracing::error!(
                "no relays could be loaded from the configuration; please fix and restart"
            );
        }
        RelayEndpoints(relays)
    }
}

impl fmt::Display for RelayEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.write_str(self.url.as_str())
    }
}

/// A remote relay reached over the builder API.
#[derive(Clone)]
pub struct Relay {
    provider: Client,
    id: ProviderId,
    pub public_key: BlsPublicKey,
    pub endpoint: Url,
}

impl fmt::Debug for Relay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl fmt::Display for Relay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Deref for Relay {
    type Target = Client;

    fn deref(&self) -> &Self::Target {
        &self.provider
    }
}

impl From<RelayEndpoint> for Relay {
    fn from(value: RelayEndpoint) -> Self {
        let RelayEndpoint { url, public_key } = value;
        let provider = Client::new(url.clone());
        // identify relays by where they are reached, never by the key in the user part
        let id = provider.endpoint().to_string();
        Self { provider, id, public_key, endpoint: url }
    }
}

#[async_trait]
impl BidProvider for Relay {
    fn id(&self) -> &str {
        &self.id
    }

    async fn fetch_bid(
        &self,
        auction_request: &AuctionRequest,
    ) -> Result<Option<SignedBuilderBid>, Error> {
        let signed_bid = self.provider.fetch_best_bid(auction_request).await?;
        if let Some(signed_bid) = &signed_bid {
            if signed_bid.public_key() != &self.public_key {
                tracing::warn!(relay = %self, %signed_bid, "bid public key does not match relay");
            }
        }
        Ok(signed_bid)
    }

    async fn unblind_block(
        &self,
        signed_block: &VersionedSignedBlindedBeaconBlock,
    ) -> Result<Option<AuctionContents>, Error> {
        self.provider.unblind_block(signed_block, ContentType::Json).await
    }
}
