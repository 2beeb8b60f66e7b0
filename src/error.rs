use std::path::PathBuf;

/// Error kinds surfaced to callers of the sort and generator engines.
///
/// Internal phases use `anyhow::Context` to attach path/offset information to I/O failures before
/// they are folded into one of these kinds; the CLI binaries map each kind to an exit code.
#[derive(Debug, thiserror::Error)]
pub enum SortError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("input file not found: {0}")]
    InputMissing(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("disk full while writing {path}: {source}")]
    DiskFull {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cancelled")]
    Cancelled,
}

impl SortError {
    /// Re-classify a generic I/O error as [`SortError::DiskFull`] when the platform reports disk
    /// exhaustion, either through `ErrorKind` or through a message substring (some platforms surface
    /// disk-full only via the raw OS error string).
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> SortError {
        if is_disk_full(&source) {
            SortError::DiskFull {
                path: path.into(),
                source,
            }
        } else {
            SortError::Io(source)
        }
    }
}

fn is_disk_full(error: &std::io::Error) -> bool {
    if error.kind() == std::io::ErrorKind::OutOfMemory {
        return true;
    }
    if let Some(code) = error.raw_os_error() {
        // ENOSPC on unix-like platforms, ERROR_DISK_FULL (112) on Windows.
        if code == 28 || code == 112 {
            return true;
        }
    }
    let message = error.to_string().to_lowercase();
    message.contains("no space left on device") || message.contains("disk full")
}
