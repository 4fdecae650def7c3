//! Monitor errors

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{op} failed: {source}")]
    Ioctl {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("cannot map the usbmon ring: {0}")]
    Map(#[source] io::Error),

    #[error("record at offset {offset} overruns the {size} byte ring")]
    BadOffset { offset: usize, size: usize },

    #[error("record needs {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },
}

/// Configuration file errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

pub type Result<T> = core::result::Result<T, MonitorError>;
