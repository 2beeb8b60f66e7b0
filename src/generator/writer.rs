use std::path::PathBuf;

use anyhow::{anyhow, Context};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc::Receiver;
use tokio_util::sync::CancellationToken;

use crate::error::SortError;
use crate::generator::batch::Batch;

const WRITE_BUFFER_BYTES: usize = 64 * 1024;

/// Drain `batches` to `path` until `target_bytes` have been written, signalling `cancel` (shared
/// with the producers) once the target is reached or on error, so that producers always stop even
/// when the writer exits early.
///
/// Progress is logged at most ~20 times over the run, at an interval of
/// `max(target_bytes / 20, 1 MiB)`.
pub(crate) async fn drain_to_file(
    mut batches: Receiver<Batch>,
    path: PathBuf,
    target_bytes: u64,
    cancel: CancellationToken,
) -> Result<(), SortError> {
    if target_bytes == 0 {
        cancel.cancel();
        return Err(SortError::InvalidArgument("target_bytes must be greater than zero".to_string()));
    }

    let result = drain(&mut batches, &path, target_bytes, &cancel).await;
    cancel.cancel();
    result
}

async fn drain(
    batches: &mut Receiver<Batch>,
    path: &std::path::Path,
    target_bytes: u64,
    cancel: &CancellationToken,
) -> Result<(), SortError> {
    let file = File::create(path)
        .await
        .with_context(|| anyhow!("path: {}", path.display()))
        .map_err(|e| SortError::from_io(path, io_error_of(e)))?;
    let mut writer = BufWriter::with_capacity(WRITE_BUFFER_BYTES, file);

    let progress_interval = std::cmp::max(target_bytes / 20, 1024 * 1024);
    let mut next_progress = progress_interval;
    let mut written: u64 = 0;

    while let Some(batch) = batches.recv().await {
        for record in &batch {
            let line = format!("{}\n", record.raw());
            writer
                .write_all(line.as_bytes())
                .await
                .with_context(|| anyhow!("path: {}", path.display()))
                .map_err(|e| SortError::from_io(path, io_error_of(e)))?;
            written += line.len() as u64;
        }

        if written >= next_progress {
            log::info!("generated {written} of {target_bytes} bytes");
            next_progress += progress_interval;
        }

        if written >= target_bytes {
            cancel.cancel();
            break;
        }
    }

    writer
        .flush()
        .await
        .with_context(|| anyhow!("path: {}", path.display()))
        .map_err(|e| SortError::from_io(path, io_error_of(e)))?;
    Ok(())
}

fn io_error_of(error: anyhow::Error) -> std::io::Error {
    match error.downcast::<std::io::Error>() {
        Ok(io_error) => io_error,
        Err(error) => std::io::Error::new(std::io::ErrorKind::Other, error.to_string()),
    }
}
