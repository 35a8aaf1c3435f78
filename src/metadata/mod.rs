//! Metadata Extractor: probes acquired videos.
//!
//! Reads ledger entries only. A role whose ledger slot is null, absent, or
//! holds several files gets no metadata and the prober is never called for
//! it. Probe failures are logged and recorded as `None`.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::adapters::MediaProber;
use crate::domain::{role_path, LedgerEntry, LocalValue, MetadataRecord, VideoProbe, VideoRole};

#[derive(Clone)]
pub struct MetadataExtractor {
    prober: Arc<dyn MediaProber>,
}

impl MetadataExtractor {
    pub fn new(prober: Arc<dyn MediaProber>) -> Self {
        Self { prober }
    }

    /// Probe every video role of one ledger entry
    #[instrument(skip(self, ledger), fields(entry = %ledger.id))]
    pub async fn extract(&self, ledger: &LedgerEntry) -> MetadataRecord {
        let mut record = MetadataRecord::empty(&ledger.id);

        for (role, probe) in record.videos.iter_mut() {
            *probe = self.probe_role(ledger, *role).await;
        }

        record
    }

    async fn probe_role(&self, ledger: &LedgerEntry, role: VideoRole) -> Option<VideoProbe> {
        if let Some(LocalValue::Multiple(files)) = ledger.file(role.slot()) {
            warn!(
                role = role.slot(),
                files = files.len(),
                "Slot holds several files, metadata left empty"
            );
            return None;
        }

        let path = role_path(ledger, role)?;
        match self.prober.probe(&path).await {
            Ok(probe) => {
                debug!(role = role.slot(), duration = probe.duration, "Probed");
                Some(probe)
            }
            Err(e) => {
                warn!(
                    role = role.slot(),
                    path = %path.display(),
                    error = %e,
                    "Could not read video metadata"
                );
                None
            }
        }
    }
}
