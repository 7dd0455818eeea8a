//! Ingest loop
//!
//! Pulls frames from the single live source and pushes each one into the
//! hub in source order. Exhaustion shuts the hub down cleanly; a read
//! failure shuts it down too and is returned as fatal, since the source has
//! no resumption point.

use crate::error::{Error, Result};
use crate::hub::HubHandle;
use crate::media::FrameSource;

/// Totals for a finished ingest run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub frames: u64,
    pub bytes: u64,
}

/// Broadcast every frame of `source` until it is exhausted
pub async fn run_ingest<S: FrameSource>(mut source: S, hub: HubHandle) -> Result<IngestSummary> {
    let mut summary = IngestSummary::default();

    loop {
        match source.next_frame().await {
            Ok(Some(frame)) => {
                summary.frames += 1;
                summary.bytes += frame.size() as u64;
                hub.broadcast(frame).await?;
            }
            Ok(None) => {
                tracing::info!(
                    frames = summary.frames,
                    bytes = summary.bytes,
                    "Frame source exhausted"
                );
                hub.shutdown().await;
                return Ok(summary);
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    frames = summary.frames,
                    "Frame source failed"
                );
                hub.shutdown().await;
                return Err(Error::Source(e));
            }
        }
    }
}
