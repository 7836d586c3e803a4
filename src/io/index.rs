//! Index serialization to disk using serde

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use tracing::info;

use crate::errors::FuzzalnError;
use crate::index::FuzzySearchIndex;

pub fn save_index(index: &FuzzySearchIndex, path: impl AsRef<Path>) -> Result<(), FuzzalnError> {
    info!("Storing index to {}", path.as_ref().display());

    let writer = File::create(path.as_ref()).map(BufWriter::new)?;
    bincode::serialize_into(writer, index)?;

    Ok(())
}

pub fn load_index(path: impl AsRef<Path>) -> Result<FuzzySearchIndex, FuzzalnError> {
    info!("Reading index from {}", path.as_ref().display());

    let reader = File::open(path.as_ref())
        .map(BufReader::new)
        .map_err(|source| FuzzalnError::IndexReadError { source })?;
    let index = bincode::deserialize_from(reader)?;

    Ok(index)
}
