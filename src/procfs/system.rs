//! Whole-machine statistics from `/proc/stat` and `/proc/meminfo`.
//!
//! ```text
//! cpu  248758 4995 78314 12965346 10040 0 5498 0 0 0
//! cpu0 43574 817 13011 2159486 994 0 1022 0 0 0
//! ...
//! MemTotal:       65652452 kB
//! MemFree:        19170960 kB
//! ...
//! ```

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;
use std::sync::LazyLock;

use serde::Serialize;

use super::parser::{self, KeyValueStat};
use super::{Error, Result};

const STAT_CPU_NUM_FIELDS: usize = 11;
const STAT_CPU_UTIME_FIELD: usize = 1;
const STAT_CPU_KTIME_FIELD: usize = 3;

/// `meminfo` reports kilobytes whenever a unit is present.
const KB_TO_BYTE_MULTIPLIER: u64 = 1024;

/// Resource usage snapshot of the whole machine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SystemStats {
    /// Aggregate user time from the `cpu` line, as reported.
    pub cpu_utime_ns: u64,
    /// Aggregate system time from the `cpu` line, as reported.
    pub cpu_ktime_ns: u64,

    /// `MemTotal`, in bytes.
    pub mem_total_bytes: u64,
    /// `MemFree`, in bytes.
    pub mem_free_bytes: u64,
    /// `MemAvailable`, in bytes.
    pub mem_available_bytes: u64,
    /// `Buffers`, in bytes.
    pub mem_buffer_bytes: u64,
    /// `Cached`, in bytes.
    pub mem_cached_bytes: u64,
    /// `SwapCached`, in bytes.
    pub mem_swap_cached_bytes: u64,
    /// `Active`, in bytes.
    pub mem_active_bytes: u64,
    /// `Inactive`, in bytes.
    pub mem_inactive_bytes: u64,
}

impl SystemStats {
    /// Fills the CPU fields from the aggregate `cpu` line of a `/proc/stat` buffer.
    ///
    /// Per-core lines (`cpu0`, `cpu1`, ...) are not considered and scanning
    /// stops at the first aggregate line. The values are stored without tick
    /// conversion.
    ///
    /// # Errors
    ///
    /// - [`Error::TooFewFields`] if the `cpu` line has fewer than 11 fields.
    /// - [`Error::InvalidValue`] if the user or system time is not an integer.
    /// - [`Error::MissingCpuLine`] if no `cpu` line exists.
    pub fn read_cpu<R: BufRead>(&mut self, buf: &mut R, origin: &Path) -> Result<()> {
        let mut line = String::new();
        while parser::read_line(buf, &mut line, origin)? != 0 {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.first() == Some(&"cpu") {
                parser::ensure_min_fields(&fields, STAT_CPU_NUM_FIELDS, origin)?;
                let ktime = parser::parse_field(&fields, STAT_CPU_KTIME_FIELD, "system", origin)?;
                let utime = parser::parse_field(&fields, STAT_CPU_UTIME_FIELD, "user", origin)?;
                self.cpu_ktime_ns = ktime;
                self.cpu_utime_ns = utime;
                return Ok(());
            }
            line.clear();
        }

        Err(Error::MissingCpuLine {
            path: origin.to_path_buf(),
        })
    }

    fn set_mem_total_bytes(&mut self, v: u64) {
        self.mem_total_bytes = v;
    }

    fn set_mem_free_bytes(&mut self, v: u64) {
        self.mem_free_bytes = v;
    }

    fn set_mem_available_bytes(&mut self, v: u64) {
        self.mem_available_bytes = v;
    }

    fn set_mem_buffer_bytes(&mut self, v: u64) {
        self.mem_buffer_bytes = v;
    }

    fn set_mem_cached_bytes(&mut self, v: u64) {
        self.mem_cached_bytes = v;
    }

    fn set_mem_swap_cached_bytes(&mut self, v: u64) {
        self.mem_swap_cached_bytes = v;
    }

    fn set_mem_active_bytes(&mut self, v: u64) {
        self.mem_active_bytes = v;
    }

    fn set_mem_inactive_bytes(&mut self, v: u64) {
        self.mem_inactive_bytes = v;
    }
}

type Setter = fn(&mut SystemStats, u64);

static MEMINFO_SETTERS: LazyLock<HashMap<&'static str, Setter>> = LazyLock::new(|| {
    let mut m: HashMap<&'static str, Setter> = HashMap::with_capacity(8);

    m.insert("MemTotal:", SystemStats::set_mem_total_bytes);
    m.insert("MemFree:", SystemStats::set_mem_free_bytes);
    m.insert("MemAvailable:", SystemStats::set_mem_available_bytes);
    m.insert("Buffers:", SystemStats::set_mem_buffer_bytes);
    m.insert("Cached:", SystemStats::set_mem_cached_bytes);
    m.insert("SwapCached:", SystemStats::set_mem_swap_cached_bytes);
    m.insert("Active:", SystemStats::set_mem_active_bytes);
    m.insert("Inactive:", SystemStats::set_mem_inactive_bytes);

    m
});

impl KeyValueStat for SystemStats {
    const VALUE_MULTIPLIER: u64 = KB_TO_BYTE_MULTIPLIER;

    fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)> {
        &MEMINFO_SETTERS
    }
}
