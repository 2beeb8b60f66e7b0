use std::path::PathBuf;
use std::process::ExitCode;

use linesort::error::SortError;
use linesort::sort::Sort;
use simple_logger::SimpleLogger;
use tokio_util::sync::CancellationToken;

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

const DEFAULT_CHUNK_SIZE_MB: u64 = 2048;

fn usage() -> &'static str {
    "usage: sort <input> <output> [temp_dir] [chunk_size_mb]"
}

#[tokio::main]
async fn main() -> ExitCode {
    SimpleLogger::new().init().unwrap();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        eprintln!("{}", usage());
        return ExitCode::from(1);
    }

    let input = PathBuf::from(&args[0]);
    let output = PathBuf::from(&args[1]);
    let chunk_size_mb: u64 = args
        .get(3)
        .map(|s| s.parse())
        .transpose()
        .unwrap_or(None)
        .unwrap_or(DEFAULT_CHUNK_SIZE_MB);

    let mut sort = Sort::new(input, output);
    if let Some(temp_dir) = args.get(2) {
        sort.with_tmp_dir(PathBuf::from(temp_dir));
    }
    // Decimal MB (1_000_000 bytes), matching the `chunk_size_mb` CLI contract; not MiB.
    sort.with_chunk_size_bytes(chunk_size_mb * 1_000_000);

    let cancel = CancellationToken::new();
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("received Ctrl-C, cancelling sort");
            cancel_for_signal.cancel();
        }
    });

    match tokio::task::spawn_blocking(move || sort.sort_cancellable(&cancel)).await {
        Ok(Ok(())) => ExitCode::from(0),
        Ok(Err(e)) => {
            eprintln!("sort failed: {e}");
            exit_code_for(&e)
        }
        Err(join_err) => {
            eprintln!("sort task panicked: {join_err}");
            ExitCode::from(99)
        }
    }
}

fn exit_code_for(error: &SortError) -> ExitCode {
    match error {
        SortError::InvalidArgument(_) => ExitCode::from(1),
        SortError::InputMissing(_) => ExitCode::from(2),
        SortError::Io(_) | SortError::DiskFull { .. } => ExitCode::from(3),
        SortError::Cancelled => ExitCode::from(4),
    }
}
