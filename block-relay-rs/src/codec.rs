//! Encoding and decoding of fork-dependent builder API payloads.
//!
//! Every payload kind has one table keyed by `(BlockVersion, ContentType)` holding the
//! decoder and encoder for that pair. Supporting a new fork means adding one row per table.
use crate::{
    error::Error,
    types::{
        bellatrix, capella, deneb, electra, AuctionContents, BlockVersion, SignedBuilderBid,
        Versioned, VersionedSignedBlindedBeaconBlock, VersionedValue,
    },
};
use ethereum_consensus::ssz::prelude::{deserialize, serialize, SimpleSerialize};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Name of the header carrying the fork of a request or response body.
pub const CONSENSUS_VERSION_HEADER: &str = "eth-consensus-version";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Ssz,
    Json,
}

impl ContentType {
    pub const fn mime(&self) -> &'static str {
        match self {
            Self::Ssz => "application/octet-stream",
            Self::Json => "application/json",
        }
    }

    /// Reads a `Content-Type` header; an absent header means JSON.
    pub fn from_header(value: Option<&str>) -> Result<Self, Error> {
        value.map_or(Ok(Self::Json), str::parse)
    }

    /// Picks the response encoding for an `Accept` header, falling back to JSON.
    ///
    /// The supported media range with the highest quality wins, the earliest listed on ties.
    /// Ranges with `q=0` are refused and never selected.
    pub fn from_accept(value: Option<&str>) -> Self {
        let mut best: Option<(Self, f32)> = None;
        for media_range in value.into_iter().flat_map(|accept| accept.split(',')) {
            let Ok(content_type) = media_range.parse::<Self>() else { continue };
            let quality = quality(media_range);
            if quality <= 0.0 {
                continue
            }
            if best.map_or(true, |(_, best_quality)| quality > best_quality) {
                best = Some((content_type, quality));
            }
        }
        best.map_or(Self::Json, |(content_type, _)| content_type)
    }
}

// a malformed or missing `q` parameter counts as full quality
fn quality(media_range: &str) -> f32 {
    media_range
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("q"))
        .and_then(|(_, value)| value.trim().parse::<f32>().ok())
        .filter(|quality| quality.is_finite())
        .unwrap_or(1.0)
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

impl FromStr for ContentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let media_type = s.split(';').next().unwrap_or_default().trim();
        if media_type.eq_ignore_ascii_case(Self::Ssz.mime()) {
            Ok(Self::Ssz)
        } else if media_type.eq_ignore_ascii_case(Self::Json.mime()) {
            Ok(Self::Json)
        } else {
            Err(Error::UnsupportedContentType(s.to_string()))
        }
    }
}

/// Links a fork-specific type to the variant of `T` that carries it.
pub trait ForkVariant<T>: Sized {
    const VERSION: BlockVersion;

    fn wrap(self) -> T;

    fn peel(value: &T) -> Option<&Self>;
}

macro_rules! impl_fork_variants {
    ($outer:ident { $($variant:ident => $inner:ty),+ $(,)? }) => {
        $(
            impl ForkVariant<$outer> for $inner {
                const VERSION: BlockVersion = BlockVersion::$variant;

                fn wrap(self) -> $outer {
                    $outer::$variant(self)
                }

                fn peel(value: &$outer) -> Option<&Self> {
                    match value {
                        $outer::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            }
        )+
    };
}

impl_fork_variants!(VersionedSignedBlindedBeaconBlock {
    Bellatrix => bellatrix::SignedBlindedBeaconBlock,
    Capella => capella::SignedBlindedBeaconBlock,
    Deneb => deneb::SignedBlindedBeaconBlock,
    Electra => electra::SignedBlindedBeaconBlock,
});

impl_fork_variants!(SignedBuilderBid {
    Bellatrix => bellatrix::SignedBuilderBid,
    Capella => capella::SignedBuilderBid,
    Deneb => deneb::SignedBuilderBid,
    Electra => electra::SignedBuilderBid,
});

impl_fork_variants!(AuctionContents {
    Bellatrix => bellatrix::ExecutionPayload,
    Capella => capella::ExecutionPayload,
    Deneb => deneb::ExecutionPayloadAndBlobsBundle,
    Electra => electra::ExecutionPayloadAndBlobsBundle,
});

type DecodeFn<T> = fn(&[u8]) -> Result<T, Error>;
type EncodeFn<T> = fn(&T) -> Result<Vec<u8>, Error>;

struct Entry<T> {
    version: BlockVersion,
    content_type: ContentType,
    decode: DecodeFn<T>,
    encode: EncodeFn<T>,
}

/// A dispatch table for one payload kind.
pub struct Codec<T: 'static> {
    entries: &'static [Entry<T>],
}

impl<T: Versioned> Codec<T> {
    fn entry(&self, version: BlockVersion, content_type: ContentType) -> Result<&Entry<T>, Error> {
        self.entries
            .iter()
            .find(|entry| entry.version == version && entry.content_type == content_type)
            .ok_or_else(|| Error::Internal(format!("no {content_type} codec for {version}")))
    }

    pub fn decode(
        &self,
        version: BlockVersion,
        content_type: ContentType,
        bytes: &[u8],
    ) -> Result<T, Error> {
        let entry = self.entry(version, content_type)?;
        (entry.decode)(bytes)
    }

    pub fn encode(&self, content_type: ContentType, value: &T) -> Result<Vec<u8>, Error> {
        let entry = self.entry(value.version(), content_type)?;
        (entry.encode)(value)
    }
}

macro_rules! codec_table {
    ($outer:ty, $decode_json:ident, $encode_json:ident; $($inner:ty),+ $(,)?) => {
        Codec {
            entries: &[$(
                Entry {
                    version: <$inner as ForkVariant<$outer>>::VERSION,
                    content_type: ContentType::Ssz,
                    decode: decode_ssz::<$inner, $outer>,
                    encode: encode_ssz::<$inner, $outer>,
                },
                Entry {
                    version: <$inner as ForkVariant<$outer>>::VERSION,
                    content_type: ContentType::Json,
                    decode: $decode_json::<$inner, $outer>,
                    encode: $encode_json::<$inner, $outer>,
                },
            )+],
        }
    };
}

/// Signed blinded blocks as submitted by proposers; JSON bodies are the bare block.
pub static SIGNED_BLINDED_BLOCKS: Codec<VersionedSignedBlindedBeaconBlock> = codec_table!(
    VersionedSignedBlindedBeaconBlock, decode_json, encode_json;
    bellatrix::SignedBlindedBeaconBlock,
    capella::SignedBlindedBeaconBlock,
    deneb::SignedBlindedBeaconBlock,
    electra::SignedBlindedBeaconBlock,
);

/// Signed builder bids; JSON bodies use the versioned envelope.
pub static BUILDER_BIDS: Codec<SignedBuilderBid> = codec_table!(
    SignedBuilderBid, decode_json_envelope, encode_json_envelope;
    bellatrix::SignedBuilderBid,
    capella::SignedBuilderBid,
    deneb::SignedBuilderBid,
    electra::SignedBuilderBid,
);

/// Unblinded auction contents; JSON bodies use the versioned envelope.
pub static AUCTION_CONTENTS: Codec<AuctionContents> = codec_table!(
    AuctionContents, decode_json_envelope, encode_json_envelope;
    bellatrix::ExecutionPayload,
    capella::ExecutionPayload,
    deneb::ExecutionPayloadAndBlobsBundle,
    electra::ExecutionPayloadAndBlobsBundle,
);

/// Reads the `version` tag of a JSON envelope without decoding its data.
pub fn envelope_version(bytes: &[u8]) -> Result<BlockVersion, Error> {
    #[derive(Deserialize)]
    struct Tag {
        version: String,
    }

    let tag: Tag = serde_json::from_slice(bytes)
        .map_err(|err| Error::Internal(format!("response is missing a version: {err}")))?;
    tag.version.parse()
}

fn peel<I: ForkVariant<T>, T: Versioned>(value: &T) -> Result<&I, Error> {
    I::peel(value)
        .ok_or(Error::VersionMismatch { expected: I::VERSION, provided: value.version() })
}

fn decode_error<I: ForkVariant<T>, T, E: fmt::Display>(err: E) -> Error {
    Error::Decode { version: I::VERSION, reason: err.to_string() }
}

fn encode_error<I: ForkVariant<T>, T, E: fmt::Display>(err: E) -> Error {
    Error::Encode { version: I::VERSION, reason: err.to_string() }
}

fn decode_ssz<I, T>(bytes: &[u8]) -> Result<T, Error>
where
    I: ForkVariant<T> + SimpleSerialize,
{
    deserialize::<I>(bytes).map(I::wrap).map_err(decode_error::<I, T, _>)
}

fn encode_ssz<I, T>(value: &T) -> Result<Vec<u8>, Error>
where
    I: ForkVariant<T> + SimpleSerialize,
    T: Versioned,
{
    let inner = peel::<I, T>(value)?;
    serialize(inner).map_err(encode_error::<I, T, _>)
}

fn decode_json<I, T>(bytes: &[u8]) -> Result<T, Error>
where
    I: ForkVariant<T> + DeserializeOwned,
{
    serde_json::from_slice::<I>(bytes).map(I::wrap).map_err(decode_error::<I, T, _>)
}

fn encode_json<I, T>(value: &T) -> Result<Vec<u8>, Error>
where
    I: ForkVariant<T> + Serialize,
    T: Versioned,
{
    let inner = peel::<I, T>(value)?;
    serde_json::to_vec(inner).map_err(encode_error::<I, T, _>)
}

fn decode_json_envelope<I, T>(bytes: &[u8]) -> Result<T, Error>
where
    I: ForkVariant<T> + DeserializeOwned,
{
    let envelope: VersionedValue<I> =
        serde_json::from_slice(bytes).map_err(decode_error::<I, T, _>)?;
    if envelope.version != I::VERSION {
        return Err(Error::VersionMismatch { expected: I::VERSION, provided: envelope.version })
    }
    Ok(envelope.data.wrap())
}

fn encode_json_envelope<I, T>(value: &T) -> Result<Vec<u8>, Error>
where
    I: ForkVariant<T> + Serialize,
    T: Versioned,
{
    let data = peel::<I, T>(value)?;
    serde_json::to_vec(&VersionedValue { version: I::VERSION, data })
        .map_err(encode_error::<I, T, _>)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethereum_consensus::{
        crypto::SecretKey,
        primitives::{Hash32, U256},
    };

    const CONTENT_TYPES: [ContentType; 2] = [ContentType::Ssz, ContentType::Json];

    fn default_block(version: BlockVersion) -> VersionedSignedBlindedBeaconBlock {
        match version {
            BlockVersion::Bellatrix => {
                VersionedSignedBlindedBeaconBlock::Bellatrix(Default::default())
            }
            BlockVersion::Capella => VersionedSignedBlindedBeaconBlock::Capella(Default::default()),
            BlockVersion::Deneb => VersionedSignedBlindedBeaconBlock::Deneb(Default::default()),
            BlockVersion::Electra => VersionedSignedBlindedBeaconBlock::Electra(Default::default()),
        }
    }

    #[test]
    fn tables_cover_every_version_and_content_type() {
        for version in BlockVersion::ALL {
            for content_type in CONTENT_TYPES {
                assert!(SIGNED_BLINDED_BLOCKS.entry(version, content_type).is_ok());
                assert!(BUILDER_BIDS.entry(version, content_type).is_ok());
                assert!(AUCTION_CONTENTS.entry(version, content_type).is_ok());
            }
        }
    }

    #[test]
    fn blinded_blocks_survive_a_round_trip() {
        for version in BlockVersion::ALL {
            let mut block = default_block(version);
            if let VersionedSignedBlindedBeaconBlock::Deneb(inner) = &mut block {
                inner.message.slot = 12;
            }
            for content_type in CONTENT_TYPES {
                let bytes = SIGNED_BLINDED_BLOCKS.encode(content_type, &block).unwrap();
                let decoded = SIGNED_BLINDED_BLOCKS.decode(version, content_type, &bytes).unwrap();
                assert_eq!(decoded, block);
            }
        }
    }

    #[test]
    fn bids_are_wrapped_in_an_envelope() {
        let bid = SignedBuilderBid::Capella(capella::SignedBuilderBid {
            message: capella::BuilderBid {
                value: U256::from(8),
                public_key: SecretKey::try_from([1u8; 32].as_ref()).unwrap().public_key(),
                ..Default::default()
            },
            signature: Default::default(),
        });
        let bytes = BUILDER_BIDS.encode(ContentType::Json, &bid).unwrap();
        assert_eq!(envelope_version(&bytes).unwrap(), BlockVersion::Capella);

        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["version"], "capella");
        assert_eq!(value["data"]["message"]["value"], "8");

        let decoded = BUILDER_BIDS.decode(BlockVersion::Capella, ContentType::Json, &bytes).unwrap();
        assert_eq!(decoded, bid);
    }

    #[test]
    fn envelope_with_other_version_is_rejected() {
        let contents = AuctionContents::Deneb(Default::default());
        let bytes = AUCTION_CONTENTS.encode(ContentType::Json, &contents).unwrap();
        let err =
            AUCTION_CONTENTS.decode(BlockVersion::Electra, ContentType::Json, &bytes).unwrap_err();
        assert!(matches!(err, Error::Decode { .. } | Error::VersionMismatch { .. }));
    }

    #[test]
    fn auction_contents_survive_a_round_trip() {
        let block_hash = Hash32::try_from([3u8; 32].as_ref()).unwrap();
        let contents = AuctionContents::Electra(electra::ExecutionPayloadAndBlobsBundle {
            execution_payload: electra::ExecutionPayload { block_hash, ..Default::default() },
            blobs_bundle: Default::default(),
        });
        for content_type in CONTENT_TYPES {
            let bytes = AUCTION_CONTENTS.encode(content_type, &contents).unwrap();
            let decoded =
                AUCTION_CONTENTS.decode(BlockVersion::Electra, content_type, &bytes).unwrap();
            assert_eq!(decoded, contents);
        }
    }

    #[test]
    fn garbage_fails_to_decode() {
        let err = SIGNED_BLINDED_BLOCKS
            .decode(BlockVersion::Bellatrix, ContentType::Ssz, &[1, 2, 3])
            .unwrap_err();
        assert!(matches!(err, Error::Decode { version: BlockVersion::Bellatrix, .. }));

        let err = SIGNED_BLINDED_BLOCKS
            .decode(BlockVersion::Deneb, ContentType::Json, b"{}")
            .unwrap_err();
        assert!(matches!(err, Error::Decode { version: BlockVersion::Deneb, .. }));
    }

    #[test]
    fn content_type_parameters_are_ignored() {
        let content_type = ContentType::from_header(Some("application/json; charset=utf-8"));
        assert_eq!(content_type.unwrap(), ContentType::Json);
        assert_eq!(ContentType::from_header(None).unwrap(), ContentType::Json);
        assert_eq!(
            ContentType::from_header(Some("Application/Octet-Stream")).unwrap(),
            ContentType::Ssz
        );
        let err = ContentType::from_header(Some("text/plain")).unwrap_err();
        assert_eq!(err.to_string(), "unsupported content type text/plain");
    }

    #[test]
    fn accept_header_selects_encoding() {
        assert_eq!(ContentType::from_accept(None), ContentType::Json);
        assert_eq!(ContentType::from_accept(Some("*/*")), ContentType::Json);
        assert_eq!(
            ContentType::from_accept(Some("application/octet-stream;q=1.0,application/json;q=0.9")),
            ContentType::Ssz
        );
        assert_eq!(ContentType::from_accept(Some("text/html, application/json")), ContentType::Json);
    }

    #[test]
    fn accept_header_respects_quality() {
        let refused = ContentType::from_accept(Some("application/octet-stream;q=0"));
        assert_eq!(refused, ContentType::Json);
        let refused = ContentType::from_accept(Some("application/octet-stream; q=0.0, */*"));
        assert_eq!(refused, ContentType::Json);

        let preferred =
            ContentType::from_accept(Some("application/json;q=0.5, application/octet-stream"));
        assert_eq!(preferred, ContentType::Ssz);
        let preferred =
            ContentType::from_accept(Some("application/octet-stream;q=0.2, application/json"));
        assert_eq!(preferred, ContentType::Json);
    }
}
