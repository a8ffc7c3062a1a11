use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

/// Error that occurs when opening a file fails.
#[derive(Debug, thiserror::Error)]
#[error("failed to open file `{path}`: {source}")]
pub struct FileOpenError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Opens a file at the given path and wraps it in a [`BufReader`].
///
/// The handle lives only as long as the returned reader, so callers that read
/// once and drop it never keep a descriptor past the call.
///
/// # Errors
///
/// Returns a [`FileOpenError`] if the file cannot be opened.
///
/// # Example
/// ```no_run
/// # use podstat::fsutil;
/// let reader = fsutil::open_file_reader("/proc/self/stat")?;
/// # Ok::<(), fsutil::FileOpenError>(())
/// ```
pub fn open_file_reader(path: impl AsRef<Path>) -> Result<BufReader<File>, FileOpenError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| FileOpenError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

/// Reads the whole file at `path` into a string.
///
/// # Errors
///
/// Returns a [`FileOpenError`] if the file cannot be opened or read.
pub fn read_to_string(path: impl AsRef<Path>) -> Result<String, FileOpenError> {
    let path = path.as_ref();
    std::fs::read_to_string(path).map_err(|source| FileOpenError {
        path: path.to_path_buf(),
        source,
    })
}
