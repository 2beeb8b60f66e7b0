use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use tokio_util::sync::CancellationToken;

use crate::error::SortError;
use crate::record::Record;

const READ_BUFFER_BYTES: usize = 64 * 1024;

/// Stream `input_path` line by line, accumulating parsed records in memory until the running
/// memory estimate reaches `max_chunk_bytes`, sorting and flushing that chunk to
/// `{temp_dir}/chunk_{i}.tmp`, and repeating until EOF.
///
/// Invalid lines (see [`Record::parse`]) are skipped with a warning and never appear in a chunk.
/// Returns the ordered list of chunk file paths created, or an empty list for an empty or
/// all-invalid input. Checked for cancellation before each line read, before sorting, and before
/// flushing; on cancellation the in-progress (unflushed) chunk is discarded and the chunks already
/// flushed are returned.
pub(crate) fn chunk_input(
    input_path: &Path,
    temp_dir: &Path,
    max_chunk_bytes: u64,
    cancel: &CancellationToken,
) -> Result<Vec<PathBuf>, SortError> {
    let file = File::open(input_path)
        .with_context(|| anyhow!("path: {}", input_path.display()))
        .map_err(|e| SortError::from_io(input_path, io_error_of(e)))?;
    let mut reader = BufReader::with_capacity(READ_BUFFER_BYTES, file);

    let mut chunk: Vec<Record> = Vec::new();
    let mut estimate: u64 = 0;
    let mut chunk_index: usize = 0;
    let mut chunk_paths = Vec::new();

    let mut line = String::new();
    loop {
        if cancel.is_cancelled() {
            log::warn!("chunking cancelled, discarding in-progress chunk");
            return Ok(chunk_paths);
        }

        line.clear();
        let bytes_read = reader
            .read_line(&mut line)
            .with_context(|| anyhow!("path: {}", input_path.display()))
            .map_err(|e| SortError::from_io(input_path, io_error_of(e)))?;
        if bytes_read == 0 {
            break;
        }
        strip_line_terminator(&mut line);

        match Record::parse(&line) {
            Some(record) => {
                estimate += record.memory_estimate() as u64;
                chunk.push(record);
            }
            None => {
                log::warn!("skipping unparseable input line: {line:?}");
            }
        }

        if estimate >= max_chunk_bytes {
            if cancel.is_cancelled() {
                log::warn!("chunking cancelled before flush, discarding in-progress chunk");
                return Ok(chunk_paths);
            }
            let path = flush_chunk(&mut chunk, temp_dir, chunk_index)?;
            chunk_paths.push(path);
            chunk_index += 1;
            estimate = 0;
        }
    }

    if !chunk.is_empty() {
        if cancel.is_cancelled() {
            log::warn!("chunking cancelled before final flush, discarding in-progress chunk");
            return Ok(chunk_paths);
        }
        let path = flush_chunk(&mut chunk, temp_dir, chunk_index)?;
        chunk_paths.push(path);
    }

    Ok(chunk_paths)
}

fn flush_chunk(chunk: &mut Vec<Record>, temp_dir: &Path, index: usize) -> Result<PathBuf, SortError> {
    chunk.sort();

    let path = temp_dir.join(format!("chunk_{index}.tmp"));
    let file = File::create(&path)
        .with_context(|| anyhow!("path: {}", path.display()))
        .map_err(|e| SortError::from_io(&path, io_error_of(e)))?;
    let mut writer = BufWriter::new(file);
    for record in chunk.iter() {
        writeln!(writer, "{}", record.raw())
            .with_context(|| anyhow!("path: {}", path.display()))
            .map_err(|e| SortError::from_io(&path, io_error_of(e)))?;
    }
    writer
        .flush()
        .with_context(|| anyhow!("path: {}", path.display()))
        .map_err(|e| SortError::from_io(&path, io_error_of(e)))?;

    chunk.clear();
    Ok(path)
}

/// Strip a trailing `\n` and an optional preceding `\r`, so input using either line terminator
/// convention is accepted.
fn strip_line_terminator(line: &mut String) {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
}

/// Unwrap the `anyhow::Error` wrapper back down to the underlying `io::Error`, preserving the
/// original error for classification (e.g. disk-full detection) while keeping the context message
/// available through `Display`/`Debug` of the `anyhow::Error` at the call site that produced it.
fn io_error_of(error: anyhow::Error) -> std::io::Error {
    match error.downcast::<std::io::Error>() {
        Ok(io_error) => io_error,
        Err(error) => std::io::Error::new(std::io::ErrorKind::Other, error.to_string()),
    }
}
