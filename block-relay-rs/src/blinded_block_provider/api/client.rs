use crate::{
    codec::{
        envelope_version, Codec, ContentType, AUCTION_CONTENTS, BUILDER_BIDS,
        CONSENSUS_VERSION_HEADER, SIGNED_BLINDED_BLOCKS,
    },
    error::{ApiError, Error},
    types::{
        AuctionContents, AuctionRequest, SignedBuilderBid, SignedValidatorRegistration, Versioned,
        VersionedSignedBlindedBeaconBlock,
    },
};
use axum::body::Bytes;
use reqwest::{header, Response, StatusCode};
use url::Url;

/// A `Client` for a service implementing the builder APIs.
#[derive(Clone, Debug)]
pub struct Client {
    http: reqwest::Client,
    endpoint: Url,
}

impl Client {
    pub fn new(mut endpoint: Url) -> Self {
        // the user part of a relay URL carries its public key, not credentials
        if endpoint.set_username("").is_err() {
            tracing::warn!(%endpoint, "could not strip user info from endpoint");
        }
        Self { http: reqwest::Client::new(), endpoint }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        self.endpoint.join(path).map_err(From::from)
    }

    pub async fn check_status(&self) -> Result<(), Error> {
        let response = self.http.get(self.url("/eth/v1/builder/status")?).send().await?;
        api_error_or_ok(response).await.map(|_| ())
    }

    pub async fn register_validators(
        &self,
        registrations: &[SignedValidatorRegistration],
    ) -> Result<(), Error> {
        let response = self
            .http
            .post(self.url("/eth/v1/builder/validators")?)
            .json(registrations)
            .send()
            .await?;
        api_error_or_ok(response).await.map(|_| ())
    }

    /// Forwards an already encoded registration batch untouched.
    pub async fn forward_registrations(&self, body: Bytes) -> Result<(), Error> {
        let response = self
            .http
            .post(self.url("/eth/v1/builder/validators")?)
            .header(header::CONTENT_TYPE, ContentType::Json.mime())
            .body(body)
            .send()
            .await?;
        api_error_or_ok(response).await.map(|_| ())
    }

    pub async fn fetch_best_bid(
        &self,
        auction_request: &AuctionRequest,
    ) -> Result<Option<SignedBuilderBid>, Error> {
        let target = format!(
            "/eth/v1/builder/header/{}/{}/{}",
            auction_request.slot, auction_request.parent_hash, auction_request.public_key
        );
        let response = self
            .http
            .get(self.url(&target)?)
            .header(header::ACCEPT, ContentType::Json.mime())
            .send()
            .await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None)
        }
        let response = api_error_or_ok(response).await?;
        decode_response(&BUILDER_BIDS, response).await.map(Some)
    }

    pub async fn unblind_block(
        &self,
        signed_block: &VersionedSignedBlindedBeaconBlock,
        content_type: ContentType,
    ) -> Result<Option<AuctionContents>, Error> {
        let body = SIGNED_BLINDED_BLOCKS.encode(content_type, signed_block)?;
        let response = self
            .http
            .post(self.url("/eth/v1/builder/blinded_blocks")?)
            .header(header::CONTENT_TYPE, content_type.mime())
            .header(header::ACCEPT, ContentType::Json.mime())
            .header(CONSENSUS_VERSION_HEADER, signed_block.version().as_str())
            .body(body)
            .send()
            .await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None)
        }
        let response = api_error_or_ok(response).await?;
        decode_response(&AUCTION_CONTENTS, response).await.map(Some)
    }
}

async fn api_error_or_ok(response: Response) -> Result<Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response)
    }

    let body = response.bytes().await?;
    let err = serde_json::from_slice::<ApiError>(&body).unwrap_or_else(|_| ApiError {
        code: status.as_u16(),
        message: String::from_utf8_lossy(&body).into_owned(),
    });
    Err(err.into())
}

/// Decodes a versioned response, taking the fork from the version header when present and
/// from the JSON envelope otherwise.
async fn decode_response<T: Versioned>(codec: &Codec<T>, response: Response) -> Result<T, Error> {
    let headers = response.headers();
    let content_type =
        ContentType::from_header(headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()))?;
    let version = headers
        .get(CONSENSUS_VERSION_HEADER)
        .map(|value| value.to_str().unwrap_or_default().parse())
        .transpose()?;

    let body = response.bytes().await?;
    let version = match version {
        Some(version) => version,
        None if content_type == ContentType::Json => envelope_version(&body)?,
        None => return Err(Error::MissingVersion),
    };
    codec.decode(version, content_type, &body)
}
