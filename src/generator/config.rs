use std::path::PathBuf;

/// Tunables for one generation run, collected by [`crate::generator::generate::Generate`]'s
/// builder the way the sort engine's [`crate::config::Config`] collects [`crate::sort::Sort`]'s.
#[derive(Clone, Debug)]
pub(crate) struct Config {
    output: PathBuf,
    target_bytes: u64,
    channel_capacity: usize,
    lines_per_batch: usize,
    tasks: usize,
}

impl Config {
    pub(crate) fn new(
        output: PathBuf,
        target_bytes: u64,
        channel_capacity: usize,
        lines_per_batch: usize,
        tasks: usize,
    ) -> Config {
        Config {
            output,
            target_bytes,
            channel_capacity,
            lines_per_batch,
            tasks,
        }
    }

    pub(crate) fn output(&self) -> &PathBuf {
        &self.output
    }

    pub(crate) fn target_bytes(&self) -> u64 {
        self.target_bytes
    }

    pub(crate) fn channel_capacity(&self) -> usize {
        self.channel_capacity
    }

    pub(crate) fn lines_per_batch(&self) -> usize {
        self.lines_per_batch
    }

    pub(crate) fn tasks(&self) -> usize {
        self.tasks
    }
}
