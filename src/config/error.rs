use std::path::PathBuf;

use crate::fsutil;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid value for `{var}`: `{value}`")]
    InvalidValue { var: &'static str, value: String },

    #[error("`{name}` must be greater than zero")]
    Zero { name: &'static str },

    #[error(transparent)]
    FileOpen(#[from] fsutil::FileOpenError),

    #[error("failed to parse uptime from `{path}`: `{content}`")]
    InvalidUptime { path: PathBuf, content: String },

    #[error("system clock is before the UNIX epoch: {0}")]
    Clock(#[from] std::time::SystemTimeError),
}

pub type Result<T> = std::result::Result<T, Error>;
