use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context};
use rlimit::{getrlimit, setrlimit, Resource};
use tokio_util::sync::CancellationToken;

use crate::chunking::chunk_input;
use crate::config::Config;
use crate::error::SortError;
use crate::merge::merge_chunks;

/// Default per-chunk memory budget: 10 MB.
const DEFAULT_CHUNK_SIZE_BYTES: u64 = 10_000_000;

/// Sort a number-prefixed text line file via external merge sort.
///
/// # Examples
/// ```
/// use std::path::PathBuf;
/// use linesort::sort::Sort;
///
/// fn sort_file(input: PathBuf, output: PathBuf) -> Result<(), anyhow::Error> {
///     let mut sort = Sort::new(input, output);
///     sort.with_chunk_size_bytes(50_000_000);
///     sort.sort()?;
///     Ok(())
/// }
/// ```
pub struct Sort {
    input: PathBuf,
    output: PathBuf,
    tmp_dir: Option<PathBuf>,
    chunk_size_bytes: u64,
}

impl Sort {
    /// Create a default Sort definition. Uses a dedicated subdirectory of `std::env::temp_dir()`
    /// for intermediate chunk files unless [`Sort::with_tmp_dir`] overrides it, and a 10 MB
    /// per-chunk memory budget.
    pub fn new(input: PathBuf, output: PathBuf) -> Sort {
        Sort {
            input,
            output,
            tmp_dir: None,
            chunk_size_bytes: DEFAULT_CHUNK_SIZE_BYTES,
        }
    }

    /// Set the directory for intermediate chunk files. It is recommended for large inputs to use
    /// a dedicated directory on the same file system as the output.
    pub fn with_tmp_dir(&mut self, tmp_dir: PathBuf) {
        self.tmp_dir = Some(tmp_dir);
    }

    /// The input will be accumulated into chunks of approximately `chunk_size_bytes`, by the
    /// oversized per-record estimate documented on [`crate::record::Record::memory_estimate`].
    pub fn with_chunk_size_bytes(&mut self, chunk_size_bytes: u64) {
        self.chunk_size_bytes = chunk_size_bytes;
    }

    /// Run the sort to completion, with no means of external cancellation.
    pub fn sort(&self) -> Result<(), SortError> {
        self.sort_cancellable(&CancellationToken::new())
    }

    /// Run the sort, checking `cancel` at chunk and merge boundaries. On cancellation, any
    /// partial output is removed, intermediate chunk files are cleaned up, and `Err(Cancelled)`
    /// is returned rather than a partially sorted file.
    pub fn sort_cancellable(&self, cancel: &CancellationToken) -> Result<(), SortError> {
        if !self.input.is_file() {
            return Err(SortError::InputMissing(self.input.clone()));
        }
        if is_blank(&self.output) {
            return Err(SortError::InvalidArgument(
                "output path must not be empty or whitespace-only".to_string(),
            ));
        }

        let config = self.build_config()?;

        let (current_soft, current_hard) = get_rlimit()?;
        let headroom = 256u64;
        let new_soft = std::cmp::max(current_soft, headroom);
        log::info!("raising rlimit NOFILE from {current_soft} to {new_soft}");
        set_rlimit(new_soft, current_hard)?;

        let result = self.run(&config, cancel);

        log::info!("restoring rlimit NOFILE to {current_soft}");
        if let Err(e) = set_rlimit(current_soft, current_hard) {
            log::warn!("failed to restore rlimit NOFILE: {e}");
        }

        if let Err(e) = cleanup(&config) {
            log::warn!("cleanup after sort failed: {e}");
        }

        match result {
            Ok(chunk_count) => {
                log::info!("sort finished, {chunk_count} chunk(s) merged");
                Ok(())
            }
            Err(e) => {
                if matches!(e, SortError::Cancelled) {
                    if let Err(remove_err) = fs::remove_file(&self.output) {
                        if remove_err.kind() != std::io::ErrorKind::NotFound {
                            log::warn!("failed to remove partial output {}: {remove_err}", self.output.display());
                        }
                    }
                }
                Err(e)
            }
        }
    }

    fn run(&self, config: &Config, cancel: &CancellationToken) -> Result<usize, SortError> {
        log::info!("chunking {}", self.input.display());
        let chunk_paths = chunk_input(&self.input, config.tmp(), config.max_chunk_bytes(), cancel)?;
        if cancel.is_cancelled() {
            return Err(SortError::Cancelled);
        }
        log::info!("merging {} chunk(s) into {}", chunk_paths.len(), self.output.display());
        merge_chunks(&chunk_paths, &self.output, cancel)?;
        Ok(chunk_paths.len())
    }

    fn build_config(&self) -> Result<Config, SortError> {
        let (tmp, tmp_owned) = match &self.tmp_dir {
            Some(dir) => {
                if is_blank(dir) {
                    return Err(SortError::InvalidArgument(
                        "tmp dir path must not be empty or whitespace-only".to_string(),
                    ));
                }
                let owned = !dir.exists();
                fs::create_dir_all(dir)
                    .with_context(|| anyhow!("path: {}", dir.display()))
                    .map_err(|e| SortError::from_io(dir, io_error_of(e)))?;
                (dir.clone(), owned)
            }
            None => {
                let dir = std::env::temp_dir().join(format!("linesort-{}", std::process::id()));
                fs::create_dir_all(&dir)
                    .with_context(|| anyhow!("path: {}", dir.display()))
                    .map_err(|e| SortError::from_io(&dir, io_error_of(e)))?;
                (dir, true)
            }
        };
        Ok(Config::new(tmp, tmp_owned, self.chunk_size_bytes))
    }
}

/// True for an empty path or one whose string form is entirely whitespace.
fn is_blank(path: &std::path::Path) -> bool {
    match path.to_str() {
        Some(s) => s.trim().is_empty(),
        None => path.as_os_str().is_empty(),
    }
}

fn get_rlimit() -> Result<(u64, u64), SortError> {
    getrlimit(Resource::NOFILE)
        .with_context(|| "getrlimit NOFILE")
        .map_err(|e| SortError::InvalidArgument(e.to_string()))
}

fn set_rlimit(soft: u64, hard: u64) -> Result<(), SortError> {
    setrlimit(Resource::NOFILE, soft, hard)
        .with_context(|| format!("setrlimit NOFILE soft={soft} hard={hard}"))
        .map_err(|e| SortError::InvalidArgument(e.to_string()))?;
    Ok(())
}

/// Delete every `chunk_*.tmp` file left in `config.tmp()` (the chunking phase may have flushed
/// several before the merge phase failed or was cancelled), then remove the directory itself if
/// this run created it and it is now empty. Runs on every exit path of [`Sort::sort_cancellable`].
fn cleanup(config: &Config) -> std::io::Result<()> {
    let entries = match fs::read_dir(config.tmp()) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    let mut remaining = 0usize;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with("chunk_") && name.ends_with(".tmp") {
            if let Err(e) = fs::remove_file(entry.path()) {
                log::warn!("failed to remove chunk file {}: {e}", entry.path().display());
                remaining += 1;
            }
        } else {
            remaining += 1;
        }
    }

    if config.tmp_owned() && remaining == 0 {
        fs::remove_dir(config.tmp())?;
    }
    Ok(())
}

fn io_error_of(error: anyhow::Error) -> std::io::Error {
    match error.downcast::<std::io::Error>() {
        Ok(io_error) => io_error,
        Err(error) => std::io::Error::new(std::io::ErrorKind::Other, error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_lines(path: &PathBuf, lines: &[&str]) {
        let mut file = fs::File::create(path).unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
    }

    fn read_lines(path: &PathBuf) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn sorts_a_small_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let output = dir.path().join("out.txt");
        write_lines(&input, &["5. Banana", "1. Apple", "3. Cherry"]);

        let mut sort = Sort::new(input, output.clone());
        sort.with_tmp_dir(dir.path().join("tmp"));
        sort.sort().unwrap();

        assert_eq!(read_lines(&output), vec!["1. Apple", "3. Cherry", "5. Banana"]);
    }

    #[test]
    fn forces_multiple_chunks_and_still_sorts_correctly() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let output = dir.path().join("out.txt");
        let lines: Vec<String> = (0..200).rev().map(|i| format!("{i}. record number {i}")).collect();
        let line_refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
        write_lines(&input, &line_refs);

        let mut sort = Sort::new(input, output.clone());
        sort.with_tmp_dir(dir.path().join("tmp"));
        sort.with_chunk_size_bytes(256);
        sort.sort().unwrap();

        let got = read_lines(&output);
        let mut expected = lines.clone();
        expected.sort();
        assert_eq!(got, expected);
    }

    #[test]
    fn missing_input_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("missing.txt");
        let output = dir.path().join("out.txt");
        let sort = Sort::new(input, output);
        match sort.sort() {
            Err(SortError::InputMissing(_)) => {}
            other => panic!("expected InputMissing, got {other:?}"),
        }
    }

    #[test]
    fn whitespace_only_output_path_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        write_lines(&input, &["1. Apple"]);

        let sort = Sort::new(input, PathBuf::from("   "));
        match sort.sort() {
            Err(SortError::InvalidArgument(_)) => {}
            other => panic!("expected InvalidArgument, got {other:?}"),
        }
    }

    #[test]
    fn whitespace_only_tmp_dir_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let output = dir.path().join("out.txt");
        write_lines(&input, &["1. Apple"]);

        let mut sort = Sort::new(input, output);
        sort.with_tmp_dir(PathBuf::from("   "));
        match sort.sort() {
            Err(SortError::InvalidArgument(_)) => {}
            other => panic!("expected InvalidArgument, got {other:?}"),
        }
    }

    #[test]
    fn cleans_up_owned_temp_dir_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let output = dir.path().join("out.txt");
        write_lines(&input, &["1. Apple"]);
        let tmp_dir = dir.path().join("owned_tmp");

        let mut sort = Sort::new(input, output);
        sort.with_tmp_dir(tmp_dir.clone());
        sort.sort().unwrap();

        assert!(!tmp_dir.exists());
    }

    #[test]
    fn cleans_up_chunk_files_after_merge_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        // output is a directory, so merge's `File::create(output_path)` fails and chunking has
        // already flushed at least one chunk file by then.
        let output = dir.path().join("out_dir");
        fs::create_dir(&output).unwrap();
        let lines: Vec<String> = (0..20).map(|i| format!("{i}. record number {i}")).collect();
        let line_refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
        write_lines(&input, &line_refs);
        let tmp_dir = dir.path().join("owned_tmp");

        let mut sort = Sort::new(input, output);
        sort.with_tmp_dir(tmp_dir.clone());
        sort.with_chunk_size_bytes(64);

        match sort.sort() {
            Err(SortError::Io(_)) | Err(SortError::DiskFull { .. }) => {}
            other => panic!("expected Io, got {other:?}"),
        }
        assert!(!tmp_dir.exists(), "owned temp dir should be removed once its chunk files are gone");
    }

    #[test]
    fn cancellation_before_start_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let output = dir.path().join("out.txt");
        write_lines(&input, &["1. Apple", "2. Banana"]);

        let mut sort = Sort::new(input, output.clone());
        sort.with_tmp_dir(dir.path().join("tmp"));
        let cancel = CancellationToken::new();
        cancel.cancel();

        match sort.sort_cancellable(&cancel) {
            Err(SortError::Cancelled) => {}
            other => panic!("expected Cancelled, got {other:?}"),
        }
        assert!(!output.exists());
    }
}
