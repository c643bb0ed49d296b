use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::message_types::MessageType;
use crate::record_store::{Record, RecordStore};
use crate::traits::{DecodeError, FrameDecoder};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unable to decode flight log: {0}")]
    Decode(#[from] DecodeError),
    #[error("flight log contained no recognized telemetry messages")]
    EmptyLog,
}

/// Accounting for one ingestion run. Not part of the store's correctness
/// contract, but returned alongside it for diagnostics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestStats {
    /// Frames classified into the store.
    pub classified: usize,
    /// Frames the decoder reported as individually broken.
    pub frame_errors: usize,
    /// Frames with a tag outside the tracked set.
    pub unknown: usize,
    /// The unknown tags seen, deduplicated.
    pub unknown_types: BTreeSet<String>,
    /// Stored record count per tracked type.
    pub per_type: Vec<(MessageType, usize)>,
}

/// A fully ingested flight log: the per-type store plus the skipped/unknown
/// frame accounting accumulated while building it.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub store: RecordStore,
    pub stats: IngestStats,
}

/// Best-effort ingestion pipeline over a [`FrameDecoder`].
///
/// Individual broken frames are counted and skipped; ingestion only fails
/// when the decoder cannot produce a stream at all, or when the stream
/// yields nothing classifiable.
pub struct LogIngestor {
    decoder: Arc<dyn FrameDecoder>,
}

impl LogIngestor {
    pub fn new(decoder: Arc<dyn FrameDecoder>) -> Self {
        Self { decoder }
    }

    pub fn decoder_name(&self) -> &str {
        self.decoder.name()
    }

    pub fn ingest(&self, raw: &[u8]) -> Result<IngestReport, IngestError> {
        let frames = self.decoder.decode(raw)?;

        let mut store = RecordStore::new();
        let mut stats = IngestStats::default();

        for frame in frames {
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    debug!("Skipping broken frame: {}", e);
                    stats.frame_errors += 1;
                    continue;
                }
            };

            let Some(msg_type) = MessageType::from_tag(&frame.msg_type) else {
                stats.unknown += 1;
                stats.unknown_types.insert(frame.msg_type);
                continue;
            };

            // Timestamp-less frames land at 0.0 rather than being dropped.
            let mut record = Record::new(frame.timestamp.unwrap_or(0.0));
            record.fields = frame.fields;

            store.push(msg_type, record);
            stats.classified += 1;
        }

        if stats.classified == 0 {
            warn!(
                "Log decoded but held no recognized telemetry ({} broken, {} unknown frames)",
                stats.frame_errors, stats.unknown
            );
            return Err(IngestError::EmptyLog);
        }

        stats.per_type = store.counts();

        info!(
            "Ingested {} records ({} broken frames skipped, {} unknown-type frames dropped)",
            stats.classified, stats.frame_errors, stats.unknown
        );
        if !stats.unknown_types.is_empty() {
            debug!("Unknown message types: {:?}", stats.unknown_types);
        }

        Ok(IngestReport { store, stats })
    }
}
