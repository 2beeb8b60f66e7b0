//! This crate implements an external merge sort for text files made up of number-prefixed record
//! lines (`{number}. {text}`), plus a synthetic file generator for exercising it.
//!
//! The sort engine streams an input file larger than available memory: it accumulates records into
//! memory-bounded chunks, sorts and flushes each chunk to a temp file, then merges every chunk with
//! a min-heap of cursors to produce the final sorted output. The generator pipeline drives the same
//! record model in reverse, using a bounded producer/consumer channel to synthesize a file of a
//! target size.
//!
//! # Examples
//! ```
//! use std::path::PathBuf;
//! use linesort::sort::Sort;
//!
//! // optimized for use with Jemalloc
//! use tikv_jemallocator::Jemalloc;
//! #[global_allocator]
//! static GLOBAL: Jemalloc = Jemalloc;
//!
//! fn sort_file(input: PathBuf, output: PathBuf, tmp: PathBuf) -> Result<(), anyhow::Error> {
//!     let mut sort = Sort::new(input, output);
//!
//!     // set the directory for intermediate results. The default is a dedicated subdirectory of
//!     // std::env::temp_dir(), however, for large files it is recommended to provide a directory
//!     // on the same file system as the output result.
//!     sort.with_tmp_dir(tmp);
//!
//!     Ok(sort.sort()?)
//! }
//! ```
//!

pub(crate) mod chunking;
pub(crate) mod config;
pub(crate) mod merge;

pub mod error;
pub mod generator;
pub mod record;
pub mod sort;
