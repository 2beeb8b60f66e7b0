use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use crate::error::SortError;
use crate::generator::config::Config;
use crate::generator::producer::spawn_producer;
use crate::generator::writer::drain_to_file;

const DEFAULT_CHANNEL_CAPACITY: usize = 256;
const DEFAULT_LINES_PER_BATCH: usize = 1000;
const DEFAULT_TARGET_BYTES: u64 = 20 * 1024 * 1024 * 1024;

/// Generate a synthetic file of number-prefixed text lines.
///
/// # Examples
/// ```
/// use std::path::PathBuf;
/// use linesort::generator::generate::Generate;
///
/// async fn make_file(output: PathBuf) -> Result<(), anyhow::Error> {
///     let mut generate = Generate::new(output);
///     generate.with_target_bytes(1_000_000);
///     generate.run().await?;
///     Ok(())
/// }
/// ```
pub struct Generate {
    output: PathBuf,
    target_bytes: u64,
    channel_capacity: usize,
    lines_per_batch: usize,
    tasks: usize,
}

impl Generate {
    /// Create a default Generate definition: 20 GiB target, one producer per available CPU core.
    pub fn new(output: PathBuf) -> Generate {
        Generate {
            output,
            target_bytes: DEFAULT_TARGET_BYTES,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            lines_per_batch: DEFAULT_LINES_PER_BATCH,
            tasks: num_cpus::get(),
        }
    }

    pub fn with_target_bytes(&mut self, target_bytes: u64) {
        self.target_bytes = target_bytes;
    }

    pub fn with_channel_capacity(&mut self, channel_capacity: usize) {
        self.channel_capacity = channel_capacity;
    }

    pub fn with_lines_per_batch(&mut self, lines_per_batch: usize) {
        self.lines_per_batch = lines_per_batch;
    }

    /// Set the number of producer tasks. The default is one per available CPU core.
    pub fn with_tasks(&mut self, tasks: usize) {
        self.tasks = tasks;
    }

    /// Run the generation pipeline to completion: spawn producers and the writer, wait for the
    /// producers, close the channel, then wait for the writer.
    pub async fn run(&self) -> Result<(), SortError> {
        if self.output.as_os_str().is_empty() {
            return Err(SortError::InvalidArgument("output path must not be empty".to_string()));
        }
        let config = self.build_config();
        let cancel = CancellationToken::new();

        let (sender, receiver) = tokio::sync::mpsc::channel(config.channel_capacity());

        let mut producers = Vec::with_capacity(config.tasks());
        for _ in 0..config.tasks() {
            producers.push(spawn_producer(sender.clone(), config.lines_per_batch(), cancel.clone()));
        }
        drop(sender);

        let writer = tokio::spawn(drain_to_file(
            receiver,
            config.output().clone(),
            config.target_bytes(),
            cancel.clone(),
        ));

        for producer in producers {
            let _ = producer.await;
        }

        writer
            .await
            .map_err(|e| SortError::InvalidArgument(format!("writer task panicked: {e}")))?
    }

    fn build_config(&self) -> Config {
        Config::new(
            self.output.clone(),
            self.target_bytes,
            self.channel_capacity,
            self.lines_per_batch,
            self.tasks,
        )
    }
}
