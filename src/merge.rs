use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use tokio_util::sync::CancellationToken;

use crate::error::SortError;
use crate::record::Record;

/// A reader over one chunk file, tracking whether it has been exhausted/abandoned.
struct ChunkReader {
    path: PathBuf,
    reader: BufReader<File>,
}

impl ChunkReader {
    fn open(path: PathBuf) -> Result<ChunkReader, SortError> {
        let file = File::open(&path)
            .with_context(|| anyhow!("path: {}", path.display()))
            .map_err(|e| SortError::from_io(&path, io_error_of(e)))?;
        Ok(ChunkReader {
            path,
            reader: BufReader::new(file),
        })
    }

    /// Read and parse the next line. Returns `Ok(None)` at EOF. A line that fails to parse
    /// abandons the remainder of this chunk (returns `Ok(None)`) after logging a warning, per the
    /// documented "drop the reader's tail" behaviour.
    fn next_record(&mut self) -> Result<Option<Record>, SortError> {
        let mut line = String::new();
        let bytes_read = self
            .reader
            .read_line(&mut line)
            .with_context(|| anyhow!("path: {}", self.path.display()))
            .map_err(|e| SortError::from_io(&self.path, io_error_of(e)))?;
        if bytes_read == 0 {
            return Ok(None);
        }
        strip_line_terminator(&mut line);
        match Record::parse(&line) {
            Some(record) => Ok(Some(record)),
            None => {
                if line.is_empty() {
                    // A chunk file never contains blank lines in practice; treat as exhausted.
                    Ok(None)
                } else {
                    log::warn!(
                        "abandoning remainder of chunk {} at unparseable line: {line:?}",
                        self.path.display()
                    );
                    Ok(None)
                }
            }
        }
    }
}

/// A pending element of one chunk: the reader's slot index in the reader table, paired with the
/// current record at the head of that reader. Stored in a min-heap (via `Reverse`) keyed on the
/// record so popping always yields the globally smallest pending record.
struct Cursor {
    reader_id: usize,
    current: Record,
}

impl PartialEq for Cursor {
    fn eq(&self, other: &Self) -> bool {
        self.current == other.current
    }
}

impl Eq for Cursor {}

impl PartialOrd for Cursor {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cursor {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.current.cmp(&other.current)
    }
}

/// Merge `chunk_paths` (each a sorted, newline-delimited file of records) into a single sorted
/// file at `output_path`, via a min-heap of per-chunk cursors.
///
/// An empty `chunk_paths` creates an empty output file and returns. Every opened reader is closed
/// (dropped) on every exit path, including cancellation and error.
pub(crate) fn merge_chunks(
    chunk_paths: &[PathBuf],
    output_path: &Path,
    cancel: &CancellationToken,
) -> Result<(), SortError> {
    let output_file = File::create(output_path)
        .with_context(|| anyhow!("path: {}", output_path.display()))
        .map_err(|e| SortError::from_io(output_path, io_error_of(e)))?;
    let mut writer = BufWriter::new(output_file);

    if chunk_paths.is_empty() {
        return Ok(());
    }

    // Reader handles live in a table indexed by reader_id; closing a cursor is just letting its
    // table slot go to `None`, independent of the heap.
    let mut readers: Vec<Option<ChunkReader>> = Vec::with_capacity(chunk_paths.len());
    let mut heap: BinaryHeap<Reverse<Cursor>> = BinaryHeap::with_capacity(chunk_paths.len());

    for path in chunk_paths {
        let mut reader = ChunkReader::open(path.clone())?;
        match reader.next_record()? {
            Some(current) => {
                let reader_id = readers.len();
                readers.push(Some(reader));
                heap.push(Reverse(Cursor { reader_id, current }));
            }
            None => {
                readers.push(None);
            }
        }
    }

    while let Some(Reverse(Cursor { reader_id, current })) = heap.pop() {
        if cancel.is_cancelled() {
            log::warn!("merge cancelled mid-stream");
            return Err(SortError::Cancelled);
        }

        writeln!(writer, "{}", current.raw())
            .with_context(|| anyhow!("path: {}", output_path.display()))
            .map_err(|e| SortError::from_io(output_path, io_error_of(e)))?;

        // Invariant: a cursor only ever sits in the heap while its reader's table slot is
        // `Some`; the slot is cleared in the same step that would otherwise drop the cursor.
        let Some(reader) = readers[reader_id].as_mut() else {
            unreachable!("heap holds a cursor for reader {reader_id}, but its slot was already closed");
        };
        match reader.next_record()? {
            Some(next) => heap.push(Reverse(Cursor { reader_id, current: next })),
            None => {
                readers[reader_id] = None;
            }
        }
    }

    writer
        .flush()
        .with_context(|| anyhow!("path: {}", output_path.display()))
        .map_err(|e| SortError::from_io(output_path, io_error_of(e)))?;
    Ok(())
}

fn strip_line_terminator(line: &mut String) {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
}

fn io_error_of(error: anyhow::Error) -> std::io::Error {
    match error.downcast::<std::io::Error>() {
        Ok(io_error) => io_error,
        Err(error) => std::io::Error::new(std::io::ErrorKind::Other, error.to_string()),
    }
}
