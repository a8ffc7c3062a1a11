//! Host-specific parameters needed to decode pseudo-filesystem data.
//!
//! The readers never probe the host themselves: kernel tick rate, page size,
//! the wall-clock time of boot and the mount points are resolved once, here,
//! and handed to the readers at construction.

mod error;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub use error::{Error, Result};

use crate::fsutil;

pub const PROC_PATH_VAR: &str = "PODSTAT_PROC_PATH";
pub const SYSFS_PATH_VAR: &str = "PODSTAT_SYSFS_PATH";
pub const KERNEL_TICKS_PER_SECOND_VAR: &str = "PODSTAT_KERNEL_TICKS_PER_SECOND";
pub const PAGE_SIZE_VAR: &str = "PODSTAT_PAGE_SIZE";
pub const CLOCK_REALTIME_OFFSET_VAR: &str = "PODSTAT_CLOCK_REALTIME_OFFSET_NS";

const DEFAULT_PROC_PATH: &str = "/proc";
const DEFAULT_SYSFS_PATH: &str = "/sys/fs";
/// `USER_HZ` on every mainstream Linux architecture.
const DEFAULT_KERNEL_TICKS_PER_SECOND: u64 = 100;
pub const DEFAULT_PAGE_SIZE: u64 = 4096;

const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Resolved configuration shared by the proc and cgroup readers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    proc_path: PathBuf,
    sysfs_path: PathBuf,
    kernel_ticks_per_second: u64,
    page_size: u64,
    clock_realtime_offset_ns: u64,
}

impl Config {
    /// Creates a configuration from already resolved values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Zero`] if `kernel_ticks_per_second` or `page_size` is zero.
    pub fn new(
        proc_path: impl Into<PathBuf>,
        sysfs_path: impl Into<PathBuf>,
        kernel_ticks_per_second: u64,
        page_size: u64,
        clock_realtime_offset_ns: u64,
    ) -> Result<Self> {
        if kernel_ticks_per_second == 0 {
            return Err(Error::Zero {
                name: "kernel_ticks_per_second",
            });
        }
        if page_size == 0 {
            return Err(Error::Zero { name: "page_size" });
        }

        Ok(Self {
            proc_path: proc_path.into(),
            sysfs_path: sysfs_path.into(),
            kernel_ticks_per_second,
            page_size,
            clock_realtime_offset_ns,
        })
    }

    /// Builds the configuration from `PODSTAT_*` environment variables.
    ///
    /// Unset variables fall back to the defaults of a regular Linux host. When
    /// no clock offset is given, it is derived from `<proc>/uptime`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] for a variable that is not a number,
    /// [`Error::Zero`] for a zero tick rate or page size, and the errors of
    /// [`clock_realtime_offset_ns`] when the offset has to be derived.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var_os(var))
    }

    fn from_lookup(lookup: impl Fn(&'static str) -> Option<OsString>) -> Result<Self> {
        let proc_path = lookup(PROC_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROC_PATH));
        let sysfs_path = lookup(SYSFS_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SYSFS_PATH));

        let kernel_ticks_per_second = parse_var(&lookup, KERNEL_TICKS_PER_SECOND_VAR)?
            .unwrap_or(DEFAULT_KERNEL_TICKS_PER_SECOND);
        let page_size = parse_var(&lookup, PAGE_SIZE_VAR)?.unwrap_or(DEFAULT_PAGE_SIZE);
        let clock_realtime_offset_ns = match parse_var(&lookup, CLOCK_REALTIME_OFFSET_VAR)? {
            Some(offset) => offset,
            None => clock_realtime_offset_ns(&proc_path)?,
        };

        Self::new(
            proc_path,
            sysfs_path,
            kernel_ticks_per_second,
            page_size,
            clock_realtime_offset_ns,
        )
    }

    pub fn proc_path(&self) -> &Path {
        &self.proc_path
    }

    pub fn sysfs_path(&self) -> &Path {
        &self.sysfs_path
    }

    pub fn kernel_ticks_per_second(&self) -> u64 {
        self.kernel_ticks_per_second
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn clock_realtime_offset_ns(&self) -> u64 {
        self.clock_realtime_offset_ns
    }

    /// Nanoseconds per kernel tick, `1e9 / kernel_ticks_per_second`.
    pub fn ns_per_kernel_tick(&self) -> u64 {
        NANOS_PER_SECOND / self.kernel_ticks_per_second
    }
}

fn parse_var(
    lookup: &impl Fn(&'static str) -> Option<OsString>,
    var: &'static str,
) -> Result<Option<u64>> {
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    let value = raw.to_string_lossy();
    value
        .trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| Error::InvalidValue {
            var,
            value: value.into_owned(),
        })
}

/// Derives the wall-clock time of boot in nanoseconds since the UNIX epoch.
///
/// Process start times are reported relative to boot; adding this offset turns
/// them into wall-clock timestamps. The offset is `now - uptime`, with uptime
/// read from the first field of `<proc_path>/uptime`.
///
/// # Errors
///
/// - [`Error::FileOpen`] if the uptime file cannot be read.
/// - [`Error::InvalidUptime`] if its first field is not a number of seconds.
/// - [`Error::Clock`] if the system clock is set before the epoch.
pub fn clock_realtime_offset_ns(proc_path: impl AsRef<Path>) -> Result<u64> {
    let path = proc_path.as_ref().join("uptime");
    let content = fsutil::read_to_string(&path)?;
    let uptime_ns = parse_uptime_ns(&content).ok_or_else(|| Error::InvalidUptime {
        path: path.clone(),
        content: content.trim().to_string(),
    })?;

    let now_ns = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
    let now_ns = u64::try_from(now_ns).unwrap_or(u64::MAX);
    Ok(now_ns.saturating_sub(uptime_ns))
}

/// Parses the `<seconds>.<hundredths>` uptime field into nanoseconds.
fn parse_uptime_ns(content: &str) -> Option<u64> {
    let field = content.split_whitespace().next()?;
    let (secs, frac) = field.split_once('.').unwrap_or((field, ""));
    let secs = secs.parse::<u64>().ok()?;

    let mut frac_ns = 0u64;
    let mut scale = NANOS_PER_SECOND / 10;
    for digit in frac.chars().take(9) {
        frac_ns += u64::from(digit.to_digit(10)?) * scale;
        scale /= 10;
    }

    secs.checked_mul(NANOS_PER_SECOND)?.checked_add(frac_ns)
}
