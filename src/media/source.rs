//! Frame sources feeding the ingest loop

use std::future::Future;

use tokio::sync::mpsc;

use crate::error::SourceError;
use crate::hub::Frame;

/// An ordered sequence of encoded frames
///
/// `Ok(None)` marks clean exhaustion of the source.
pub trait FrameSource {
    fn next_frame(&mut self) -> impl Future<Output = Result<Option<Frame>, SourceError>> + Send;
}

/// Frames pushed by another task, e.g. an in-process encoder
impl FrameSource for mpsc::Receiver<Frame> {
    async fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        Ok(self.recv().await)
    }
}
