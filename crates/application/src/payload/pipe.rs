use actionhub_core::AppResult;
use bytes::Bytes;
use futures::{Stream, StreamExt, stream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::PayloadStream;

/// Bounded producer/consumer bridge between a payload source and a destination.
///
/// A forwarding task pulls from the source and pushes into a channel holding at
/// most `capacity` chunks. The task waits whenever the destination falls behind,
/// and it is aborted as soon as the consuming stream is dropped.
pub struct PayloadPipe;

impl PayloadPipe {
    /// Default number of chunks buffered between source and destination.
    pub const DEFAULT_CAPACITY: usize = 8;

    /// Spawns the forwarding task and returns the consuming side.
    pub fn forward<S>(source: S, capacity: usize) -> PayloadStream
    where
        S: Stream<Item = AppResult<Bytes>> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel(capacity.max(1));

        let task = tokio::spawn(async move {
            let mut source = Box::pin(source);
            while let Some(chunk) = source.next().await {
                let failed = chunk.is_err();
                if sender.send(chunk).await.is_err() {
                    debug!("payload consumer dropped, stopping forwarder");
                    return;
                }
                if failed {
                    return;
                }
            }
        });

        let chunks = stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.map(|chunk| (chunk, receiver))
        });

        PayloadStream::with_forwarder(chunks.boxed(), ForwarderGuard(task))
    }
}

/// Aborts the forwarding task when the consuming stream goes away.
pub(super) struct ForwarderGuard(JoinHandle<()>);

impl Drop for ForwarderGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}
