use std::num::ParseIntError;
use std::path::PathBuf;

use crate::fsutil;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    FileOpen(#[from] fsutil::FileOpenError),

    #[error("failed to read line for file `{path}`: {source}")]
    ReadLine {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid pid at line {line} of `{path}`: '{value}': {source}")]
    InvalidPid {
        path: PathBuf,
        line: usize,
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("invalid pod QoS class: {0}")]
    InvalidQosClass(String),
}

pub type Result<T> = std::result::Result<T, Error>;
