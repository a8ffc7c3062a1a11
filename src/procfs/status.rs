//! Identity information from `/proc/<pid>/status`.
//!
//! ```text
//! Name:   apache2
//! Umask:  0022
//! State:  S (sleeping)
//! ...
//! Uid:    33      33      33      33
//! ...
//! NStgid: 2578    1
//! ```

use std::path::Path;

use serde::Serialize;

use super::{Error, Result};

const UID_PREFIX: &str = "Uid:";
/// Label plus real, effective, saved set and filesystem UID.
const UID_FIELD_COUNT: usize = 5;

const NS_TGID_PREFIX: &str = "NStgid:";

/// User identities of a process. The values are kept in their textual form.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ProcUids {
    pub real: String,
    pub effective: String,
    pub saved_set: String,
    pub filesystem: String,
}

/// Returns the first line of `content` starting with `prefix`, or `""`.
fn line_with_prefix<'a>(content: &'a str, prefix: &str) -> &'a str {
    content
        .lines()
        .find(|line| line.starts_with(prefix))
        .unwrap_or_default()
}

fn split_fields(line: &str) -> Vec<&str> {
    line.split(['\t', ' ']).filter(|f| !f.is_empty()).collect()
}

impl ProcUids {
    /// Extracts the `Uid:` line from `status` content.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUidLine`] unless the line holds exactly the label
    /// and four values. A missing line is reported the same way, with an empty line.
    pub fn from_status(content: &str, origin: &Path) -> Result<Self> {
        let line = line_with_prefix(content, UID_PREFIX);
        let fields = split_fields(line);
        if fields.len() != UID_FIELD_COUNT {
            return Err(Error::InvalidUidLine {
                path: origin.to_path_buf(),
                line: line.to_string(),
            });
        }

        Ok(Self {
            real: fields[1].to_string(),
            effective: fields[2].to_string(),
            saved_set: fields[3].to_string(),
            filesystem: fields[4].to_string(),
        })
    }
}

/// Extracts the namespace-local thread group ids from the `NStgid:` line.
///
/// The first id is the one in the reader's namespace; a process that lives in
/// a nested PID namespace has one more id per level.
///
/// # Errors
///
/// Returns [`Error::InvalidNamespacePidLine`] if the line is missing or holds no id.
pub fn namespace_pids_from_status(content: &str, origin: &Path) -> Result<Vec<String>> {
    let line = line_with_prefix(content, NS_TGID_PREFIX);
    let fields = split_fields(line);
    if fields.len() < 2 {
        return Err(Error::InvalidNamespacePidLine {
            path: origin.to_path_buf(),
            line: line.to_string(),
        });
    }
    Ok(fields[1..].iter().map(|f| f.to_string()).collect())
}
