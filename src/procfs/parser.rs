//! Shared parsing building blocks for `/proc` files.
//!
//! The central piece is [`KeyValueStat`], a data-driven extractor for files made
//! of `key: value [unit]` lines such as `/proc/<pid>/io` and `/proc/meminfo`.
//! A record type declares which keys it understands and how to store them; one
//! generic scan routine then serves every such schema.
//!
//! # Example: Implementing `KeyValueStat`
//!
//! ```rust
//! use std::collections::HashMap;
//! use std::path::Path;
//! use std::sync::LazyLock;
//! use podstat::procfs::KeyValueStat;
//!
//! #[derive(Default)]
//! struct Vm {
//!     peak: u64,
//! }
//!
//! static SETTERS: LazyLock<HashMap<&'static str, fn(&mut Vm, u64)>> = LazyLock::new(|| {
//!     let mut m: HashMap<&'static str, fn(&mut Vm, u64)> = HashMap::new();
//!     m.insert("VmPeak:", |vm, v| vm.peak = v);
//!     m
//! });
//!
//! impl KeyValueStat for Vm {
//!     const VALUE_MULTIPLIER: u64 = 1024;
//!
//!     fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)> {
//!         &SETTERS
//!     }
//! }
//!
//! let mut vm = Vm::default();
//! vm.read_key_values(&mut "VmPeak:   2 kB\n".as_bytes(), Path::new("status")).unwrap();
//! assert_eq!(vm.peak, 2048);
//! ```

use std::collections::{HashMap, HashSet};
use std::io::BufRead;
use std::path::Path;

use super::{Error, Result};

/// Minimum number of whitespace-separated tokens on a key-value line (key, value).
const KEY_VALUE_MIN_FIELDS: usize = 2;
/// Maximum number of tokens on a key-value line (key, value, unit).
const KEY_VALUE_MAX_FIELDS: usize = 3;

/// A trait for records that are filled from `key: value [unit]` files.
///
/// Implementors provide the map of recognized keys (spelled exactly as they
/// appear in the file, trailing `:` included) to setter functions, and a
/// multiplier applied to every matched value before it is stored.
pub trait KeyValueStat
where
    Self: 'static,
{
    /// Factor applied to each parsed value, e.g. `1024` for files reporting kB.
    const VALUE_MULTIPLIER: u64;

    /// Returns the map of recognized keys and the setters that store their values.
    fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)>;

    /// Fills `self` from a key-value formatted buffer.
    ///
    /// Lines that do not have two or three tokens are skipped, as are keys
    /// missing from [`KeyValueStat::field_handlers`]. Scanning stops as soon as
    /// every recognized key has been stored. Setters overwrite, so reading the
    /// same content twice yields the same record.
    ///
    /// # Arguments
    /// * `buf` - A buffered reader for the input stream.
    /// * `origin` - Logical origin of the data, used in error messages.
    ///
    /// # Errors
    /// Returns [`Error::ReadLine`] if reading fails, [`Error::InvalidKeyValue`]
    /// if a recognized key carries a value that is not an integer, and
    /// [`Error::Overflow`] if the scaled value does not fit in a `u64`.
    fn read_key_values<R: BufRead>(&mut self, buf: &mut R, origin: &Path) -> Result<()> {
        let handlers = Self::field_handlers();
        let mut seen_keys = HashSet::with_capacity(handlers.len());

        let mut line = String::new();
        let mut lineno = 0;
        while read_line(buf, &mut line, origin)? != 0 {
            lineno += 1;
            let mut parts = line.split_whitespace();
            let field_count = parts.clone().count();

            if (KEY_VALUE_MIN_FIELDS..=KEY_VALUE_MAX_FIELDS).contains(&field_count) {
                if let (Some(key), Some(val)) = (parts.next(), parts.next()) {
                    if let Some((k, handler)) = handlers.get_key_value(key) {
                        let parsed = val.parse::<u64>().map_err(|source| Error::InvalidKeyValue {
                            path: origin.to_path_buf(),
                            key: key.to_string(),
                            value: val.to_string(),
                            line: lineno,
                            source,
                        })?;
                        handler(self, scale(parsed, Self::VALUE_MULTIPLIER, *k, origin)?);
                        seen_keys.insert(*k);

                        if seen_keys.len() == handlers.len() {
                            break;
                        }
                    }
                }
            }

            line.clear();
        }

        Ok(())
    }
}

/// Reads one line into `line`, attaching `origin` to any I/O error.
pub(super) fn read_line<R: BufRead>(
    buf: &mut R,
    line: &mut String,
    origin: &Path,
) -> Result<usize> {
    buf.read_line(line).map_err(|source| Error::ReadLine {
        path: origin.to_path_buf(),
        source,
    })
}

/// Reads the first line of `buf`, failing with [`Error::Empty`] if there is none.
pub(super) fn read_first_line<R: BufRead>(buf: &mut R, origin: &Path) -> Result<String> {
    let mut line = String::new();
    if read_line(buf, &mut line, origin)? == 0 {
        return Err(Error::Empty {
            path: origin.to_path_buf(),
        });
    }
    Ok(line)
}

/// Fails with [`Error::TooFewFields`] unless `fields` holds at least `expected` entries.
///
/// Only a lower bound is enforced, since newer kernels append fields.
pub(super) fn ensure_min_fields(fields: &[&str], expected: usize, origin: &Path) -> Result<()> {
    if fields.len() < expected {
        return Err(Error::TooFewFields {
            path: origin.to_path_buf(),
            expected,
            found: fields.len(),
        });
    }
    Ok(())
}

/// Parses `fields[index]` as an unsigned integer, naming it `field` on failure.
///
/// Callers must have checked the field count beforehand.
pub(super) fn parse_field(
    fields: &[&str],
    index: usize,
    field: &'static str,
    origin: &Path,
) -> Result<u64> {
    let value = fields[index];
    value.parse::<u64>().map_err(|source| Error::InvalidValue {
        path: origin.to_path_buf(),
        field,
        value: value.to_string(),
        source,
    })
}

/// Multiplies `value` by a unit `factor`, failing with [`Error::Overflow`]
/// instead of wrapping.
pub(super) fn scale(value: u64, factor: u64, field: &'static str, origin: &Path) -> Result<u64> {
    value.checked_mul(factor).ok_or_else(|| Error::Overflow {
        path: origin.to_path_buf(),
        field,
    })
}
