//! Typed readers for the process information pseudo-filesystem (`/proc`).
//!
//! [`ProcParser`] exposes one read operation per statistic source and owns all
//! unit conversions:
//!
//! - `<pid>/stat` → [`ProcessStats`] (ticks → ns, pages → bytes)
//! - `<pid>/io` → the I/O fields of [`ProcessStats`]
//! - `<pid>/net/dev` → [`NetworkStats`], summed over tracked interfaces
//! - `stat` and `meminfo` → [`SystemStats`] (kB → bytes)
//! - `<pid>/status` → [`ProcUids`] and namespace PIDs
//! - `<pid>/cmdline`, `<pid>/fd/<fd>`
//!
//! Every file is opened, read and closed within a single call. Most readers
//! return an [`Error`] on the first anomaly; [`ProcParser::cmdline`] and
//! [`ProcParser::start_time_ticks`] instead fall back to an empty string and
//! `0`, since a process that exits mid-scan is expected there.
//!
//! The parsing logic itself lives in reader-based functions
//! (e.g. [`ProcessStats::from_stat_reader`]) that can be fed from any
//! [`std::io::BufRead`].

mod error;
mod net;
mod parser;
mod process;
mod status;
mod system;

use std::path::{Path, PathBuf};

pub use error::{Error, ErrorKind, Result};
pub use net::NetworkStats;
pub use parser::KeyValueStat;
pub use process::{ProcessStats, cmdline_from_bytes, start_time_ticks};
pub use status::{ProcUids, namespace_pids_from_status};
pub use system::SystemStats;

use crate::config::Config;
use crate::fsutil;

/// Reads statistics below a `/proc` mount.
///
/// The conversion parameters are fixed at construction; the parser holds no
/// other state and can be shared freely between threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcParser {
    proc_base_path: PathBuf,
    ns_per_kernel_tick: u64,
    clock_realtime_offset_ns: u64,
    bytes_per_page: u64,
}

impl ProcParser {
    /// Creates a parser from a resolved [`Config`].
    pub fn new(config: &Config) -> Self {
        Self::with_params(
            config.proc_path(),
            config.ns_per_kernel_tick(),
            config.clock_realtime_offset_ns(),
            config.page_size(),
        )
    }

    /// Creates a parser from explicit conversion parameters.
    ///
    /// # Arguments
    ///
    /// * `proc_base_path` - Mount point of the process pseudo-filesystem, usually `/proc`.
    /// * `ns_per_kernel_tick` - `1e9 / ticks_per_second`.
    /// * `clock_realtime_offset_ns` - Wall clock time of boot, in ns since the epoch.
    /// * `bytes_per_page` - Page size in bytes.
    pub fn with_params(
        proc_base_path: impl Into<PathBuf>,
        ns_per_kernel_tick: u64,
        clock_realtime_offset_ns: u64,
        bytes_per_page: u64,
    ) -> Self {
        Self {
            proc_base_path: proc_base_path.into(),
            ns_per_kernel_tick,
            clock_realtime_offset_ns,
            bytes_per_page,
        }
    }

    pub fn proc_base_path(&self) -> &Path {
        &self.proc_base_path
    }

    pub fn ns_per_kernel_tick(&self) -> u64 {
        self.ns_per_kernel_tick
    }

    pub fn clock_realtime_offset_ns(&self) -> u64 {
        self.clock_realtime_offset_ns
    }

    pub fn bytes_per_page(&self) -> u64 {
        self.bytes_per_page
    }

    fn pid_path(&self, pid: u32) -> PathBuf {
        self.proc_base_path.join(pid.to_string())
    }

    /// Parses `<base>/<pid>/stat`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened (e.g. the process exited) or if its
    /// content does not match the expected schema; see
    /// [`ProcessStats::from_stat_reader`].
    pub fn parse_process_stat(&self, pid: u32) -> Result<ProcessStats> {
        let path = self.pid_path(pid).join("stat");
        let mut buf = fsutil::open_file_reader(&path)?;
        ProcessStats::from_stat_reader(
            &mut buf,
            &path,
            self.ns_per_kernel_tick,
            self.bytes_per_page,
        )
    }

    /// Parses `<base>/<pid>/net/dev`, summing all interfaces that are not ignored.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened, an interface line is short, or a
    /// counter is not an integer. No partial sums are returned.
    pub fn parse_network_stats(&self, pid: u32) -> Result<NetworkStats> {
        let path = self.pid_path(pid).join("net/dev");
        let mut buf = fsutil::open_file_reader(&path)?;
        NetworkStats::from_reader(&mut buf, &path)
    }

    /// Fills the I/O fields of `out` from `<base>/<pid>/io`.
    ///
    /// Only `rchar`, `wchar`, `read_bytes` and `write_bytes` are touched.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened or a recognized value is not an integer.
    pub fn parse_process_io(&self, pid: u32, out: &mut ProcessStats) -> Result<()> {
        let path = self.pid_path(pid).join("io");
        let mut buf = fsutil::open_file_reader(&path)?;
        out.read_key_values(&mut buf, &path)
    }

    /// Fills the CPU fields of `out` from `<base>/stat`.
    ///
    /// # Errors
    ///
    /// Returns an error of kind [`ErrorKind::NotFound`] if the file has no
    /// aggregate `cpu` line, and [`ErrorKind::Internal`] for any other failure.
    pub fn parse_system_cpu(&self, out: &mut SystemStats) -> Result<()> {
        let path = self.proc_base_path.join("stat");
        let mut buf = fsutil::open_file_reader(&path)?;
        out.read_cpu(&mut buf, &path)
    }

    /// Fills the memory fields of `out` from `<base>/meminfo`, in bytes.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened or a recognized value is not an integer.
    pub fn parse_mem_info(&self, out: &mut SystemStats) -> Result<()> {
        let path = self.proc_base_path.join("meminfo");
        let mut buf = fsutil::open_file_reader(&path)?;
        out.read_key_values(&mut buf, &path)
    }

    /// Reads `stat` and `io` of a process into one record.
    pub fn read_process_stats(&self, pid: u32) -> Result<ProcessStats> {
        let mut stats = self.parse_process_stat(pid)?;
        self.parse_process_io(pid, &mut stats)?;
        Ok(stats)
    }

    /// Reads the CPU and memory sections of a whole-system snapshot.
    pub fn read_system_stats(&self) -> Result<SystemStats> {
        let mut stats = SystemStats::default();
        self.parse_system_cpu(&mut stats)?;
        self.parse_mem_info(&mut stats)?;
        Ok(stats)
    }

    /// Returns the command line of `pid` with arguments separated by spaces.
    ///
    /// An unreadable file yields an empty string: the process has exited or is
    /// not accessible.
    pub fn cmdline(&self, pid: u32) -> String {
        let path = self.pid_path(pid).join("cmdline");
        match std::fs::read(&path) {
            Ok(raw) => cmdline_from_bytes(&raw),
            Err(err) => {
                log::debug!("failed to read `{}`: {err}", path.display());
                String::new()
            }
        }
    }

    /// Returns the start time of `pid` in kernel ticks since boot, or `0` on any failure.
    pub fn start_time_ticks(&self, pid: u32) -> u64 {
        start_time_ticks(self.pid_path(pid))
    }

    /// Resolves the file descriptor link `<base>/<pid>/fd/<fd>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadSymlink`] if the link cannot be read.
    pub fn read_fd_link(&self, pid: u32, fd: u32) -> Result<PathBuf> {
        let path = self.pid_path(pid).join("fd").join(fd.to_string());
        std::fs::read_link(&path).map_err(|source| Error::ReadSymlink { path, source })
    }

    /// Reads the real, effective, saved set and filesystem UIDs from `<base>/<pid>/status`.
    pub fn read_uids(&self, pid: u32) -> Result<ProcUids> {
        let path = self.pid_path(pid).join("status");
        let content = fsutil::read_to_string(&path)?;
        ProcUids::from_status(&content, &path)
    }

    /// Reads the chain of namespace-local PIDs from the `NStgid:` line of `<base>/<pid>/status`.
    pub fn read_namespace_pids(&self, pid: u32) -> Result<Vec<String>> {
        let path = self.pid_path(pid).join("status");
        let content = fsutil::read_to_string(&path)?;
        namespace_pids_from_status(&content, &path)
    }
}
