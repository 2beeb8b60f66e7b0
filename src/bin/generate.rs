use std::path::PathBuf;
use std::process::ExitCode;

use linesort::generator::generate::Generate;
use simple_logger::SimpleLogger;

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

const DEFAULT_OUTPUT: &str = "generated.txt";
const DEFAULT_TARGET_BYTES: u64 = 20 * 1024 * 1024 * 1024;

#[tokio::main]
async fn main() -> ExitCode {
    SimpleLogger::new().init().unwrap();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let output = args
        .first()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
    let target_bytes: u64 = args
        .get(1)
        .map(|s| s.parse())
        .transpose()
        .unwrap_or(None)
        .unwrap_or(DEFAULT_TARGET_BYTES);

    let mut generate = Generate::new(output);
    generate.with_target_bytes(target_bytes);

    match generate.run().await {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            eprintln!("generate failed: {e}");
            ExitCode::from(1)
        }
    }
}
