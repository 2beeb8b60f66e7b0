use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::generator::batch::{random_record, reused_record, should_reuse, Batch};

/// Spawn one producer task. Record generation is plain CPU work, so the task runs on a blocking
/// worker thread rather than competing with the async reactor, and hands batches to the writer
/// through a synchronous `blocking_send` on the shared channel.
///
/// Exits when `cancel` is observed, or when the channel's receiver has been dropped (the
/// orchestrator closes its side once the writer is done, at which point `blocking_send` returns an
/// error).
pub(crate) fn spawn_producer(
    sender: Sender<Batch>,
    lines_per_batch: usize,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        loop {
            if cancel.is_cancelled() {
                return;
            }

            let mut batch: Batch = Vec::with_capacity(lines_per_batch);
            for _ in 0..lines_per_batch {
                if cancel.is_cancelled() {
                    break;
                }
                let mut reuse_index = 0usize;
                if should_reuse(batch.len(), &mut reuse_index) {
                    batch.push(reused_record(&batch[reuse_index]));
                } else {
                    batch.push(random_record());
                }
            }

            if batch.is_empty() {
                return;
            }

            if sender.blocking_send(batch).is_err() {
                return;
            }
            std::thread::yield_now();
        }
    })
}
