//! Error types for weight lookups and configuration loading.

use std::path::PathBuf;

use thiserror::Error;

/// Non-fatal lookup errors reported by the weight table.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MixError {
    /// An index lookup fell outside the table.
    #[error("invalid index {index} (table has {len} entries)")]
    InvalidIndex {
        /// The requested index.
        index: usize,
        /// Number of entries in the table.
        len: usize,
    },
    /// A source lookup found no entry for the source.
    #[error("invalid child: {name}")]
    UnknownSource {
        /// Name of the source, or `"(destroyed)"`.
        name: String,
    },
}

/// Errors raised while loading a mixer configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The contents are not a valid mixer configuration.
    #[error("failed to parse mixer config: {0}")]
    Parse(#[from] toml::de::Error),
}
