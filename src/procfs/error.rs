//! Structured errors for the `/proc` readers.
//!
//! Every variant carries the path of the file that was being read, so a caller
//! that logs and skips a PID still knows which source deviated from the
//! expected schema. [`Error::kind`] folds the variants into the three coarse
//! classes callers branch on.

use std::num::ParseIntError;
use std::path::PathBuf;

use crate::fsutil;

/// Coarse classification of a [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The file could not be read or its content deviates from the kernel schema.
    Internal,
    /// An expected marker line or section is absent.
    NotFound,
    /// The content is structurally present but malformed.
    InvalidArgument,
}

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

    #[error("file `{path}` is empty")]
    Empty { path: PathBuf },

    #[error("incorrect number of fields in `{path}`: expected at least {expected}, found {found}")]
    TooFewFields {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    #[error("invalid process name field in `{path}`: `{field}`")]
    InvalidProcessName { path: PathBuf, field: String },

    #[error("invalid value for `{field}` in `{path}`: '{value}': {source}")]
    InvalidValue {
        path: PathBuf,
        field: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("invalid value for '{key}' in `{path}` at line {line}: '{value}': {source}")]
    InvalidKeyValue {
        path: PathBuf,
        key: String,
        value: String,
        line: usize,
        #[source]
        source: ParseIntError,
    },

    #[error("value of `{field}` in `{path}` is out of range")]
    Overflow { path: PathBuf, field: &'static str },

    #[error("could not find the `cpu` line in `{path}`")]
    MissingCpuLine { path: PathBuf },

    #[error("proc path `{path}` returns incorrect result `{line}`")]
    InvalidUidLine { path: PathBuf, line: String },

    #[error("NStgid line in `{path}` is invalid: `{line}`")]
    InvalidNamespacePidLine { path: PathBuf, line: String },

    #[error("failed to read symlink `{path}`: {source}")]
    ReadSymlink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Returns the coarse class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingCpuLine { .. } => ErrorKind::NotFound,
            Error::InvalidNamespacePidLine { .. } => ErrorKind::InvalidArgument,
            Error::FileOpen(_)
            | Error::ReadLine { .. }
            | Error::Empty { .. }
            | Error::TooFewFields { .. }
            | Error::InvalidProcessName { .. }
            | Error::InvalidValue { .. }
            | Error::InvalidKeyValue { .. }
            | Error::Overflow { .. }
            | Error::InvalidUidLine { .. }
            | Error::ReadSymlink { .. } => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
