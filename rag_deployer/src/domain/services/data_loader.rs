use std::{
    collections::HashMap,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use common::helper::error_chain_fmt;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::domain::entities::{
    query_record::QueryRecord,
    record::{Chunk, Record, RecordId, RecordMetadata},
};

/// Loads the chunks and metadata files and joins them on their id.
///
/// Chunks without metadata are dropped without error, so are metadata entries without a usable id.
/// Other metadata values are checked record by record at upload time.
#[tracing::instrument(
    name = "Loading records",
    skip_all,
    fields(chunks_path = %chunks_path.as_ref().display(), metadata_path = %metadata_path.as_ref().display())
)]
pub fn load(
    chunks_path: impl AsRef<Path>,
    metadata_path: impl AsRef<Path>,
) -> Result<Vec<Record>, DataLoaderError> {
    let chunks: Vec<Chunk> = read_json(chunks_path.as_ref())?;
    let metadata: Vec<JsonValue> = read_json(metadata_path.as_ref())?;

    let nb_chunks = chunks.len();
    let records = join_records(chunks, parse_metadata(metadata));

    info!("Loaded {} records out of {} chunks", records.len(), nb_chunks);
    Ok(records)
}

/// Keeps the metadata entries holding a usable id
pub fn parse_metadata(entries: Vec<JsonValue>) -> Vec<RecordMetadata> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match RecordMetadata::try_from(entry) {
            Ok(metadata) => Some(metadata),
            Err(error) => {
                warn!(?error, index, "Dropping metadata entry");
                None
            }
        })
        .collect()
}

/// Joins chunks with their metadata.
///
/// On duplicated metadata ids the last one wins. The output keeps the chunks order.
pub fn join_records(chunks: Vec<Chunk>, metadata: Vec<RecordMetadata>) -> Vec<Record> {
    let metadata_by_id: HashMap<RecordId, RecordMetadata> = metadata
        .into_iter()
        .map(|metadata| (metadata.id, metadata))
        .collect();

    chunks
        .into_iter()
        .filter_map(|chunk| {
            // Cloned, not removed: several chunks may share a metadata id
            match metadata_by_id.get(&chunk.id) {
                Some(metadata) => Some(Record {
                    content: chunk.content,
                    metadata: metadata.clone(),
                }),
                None => {
                    debug!(chunk_id = chunk.id, "No metadata for chunk, dropping it");
                    None
                }
            }
        })
        .collect()
}

#[tracing::instrument(name = "Loading evaluation queries", skip_all, fields(path = %path.as_ref().display()))]
pub fn load_queries(path: impl AsRef<Path>) -> Result<Vec<QueryRecord>, DataLoaderError> {
    let queries: Vec<QueryRecord> = read_json(path.as_ref())?;

    info!("Loaded {} evaluation queries", queries.len());
    Ok(queries)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoaderError> {
    let file = File::open(path).map_err(|source| DataLoaderError::UnreadableFile {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_reader(BufReader::new(file)).map_err(|source| DataLoaderError::InvalidJson {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(thiserror::Error)]
pub enum DataLoaderError {
    #[error("Could not read file {}", .path.display())]
    UnreadableFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File {} did not contain the expected JSON array", .path.display())]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl std::fmt::Debug for DataLoaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
