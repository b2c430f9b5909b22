use crate::error::Error;
use serde::de::DeserializeOwned;
use std::{fmt, path::Path};

/// Loads a TOML document from `path` into `T`.
pub fn from_toml_file<P: AsRef<Path> + fmt::Display, T: DeserializeOwned>(
    path: P,
) -> Result<T, Error> {
    tracing::info!("loading config from `{path}`...");

    let data = std::fs::read_to_string(path.as_ref())
        .map_err(|err| Error::Config(format!("could not read `{path}`: {err}")))?;
    toml::from_str(&data).map_err(|err| Error::Config(format!("could not parse TOML: {err}")))
}
