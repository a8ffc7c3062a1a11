//! Per-process statistics from `/proc/<pid>/stat`, `/proc/<pid>/io` and `/proc/<pid>/cmdline`.
//!
//! `stat` is a single line of at least 52 whitespace-separated fields. The
//! process name in field 1 is wrapped in parentheses and may itself contain
//! spaces, so it is located by the first `(` and the last `)` of the line
//! before the remaining fields are split.
//!
//! ```text
//! 4602 (ibazel) S 3260 4602 3260 34818 4602 1077936128 1799 174589 55 68 8 23 ...
//! ```
//!
//! CPU times are reported in kernel ticks and RSS in pages; both are converted
//! on parse so a [`ProcessStats`] always holds nanoseconds and bytes.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;
use std::sync::LazyLock;

use serde::Serialize;

use super::parser::{self, KeyValueStat};
use super::{Error, Result};
use crate::fsutil;

/// Minimum number of fields in `/proc/<pid>/stat`.
const STAT_NUM_FIELDS: usize = 52;

const STAT_PID_FIELD: usize = 0;
const STAT_PROCESS_NAME_FIELD: usize = 1;
const STAT_MINOR_FAULTS_FIELD: usize = 9;
const STAT_MAJOR_FAULTS_FIELD: usize = 11;
const STAT_UTIME_FIELD: usize = 13;
const STAT_KTIME_FIELD: usize = 14;
const STAT_NUM_THREADS_FIELD: usize = 19;
const STAT_START_TIME_FIELD: usize = 21;
const STAT_VSIZE_FIELD: usize = 22;
const STAT_RSS_FIELD: usize = 23;

/// Resource usage of a single process at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ProcessStats {
    /// Process id as reported by the kernel.
    pub pid: u32,
    /// Command name without the enclosing parentheses.
    pub process_name: String,
    /// Minor page faults.
    pub minor_faults: u64,
    /// Major page faults.
    pub major_faults: u64,
    /// Time spent in user mode, in nanoseconds.
    pub utime_ns: u64,
    /// Time spent in kernel mode, in nanoseconds.
    pub ktime_ns: u64,
    /// Number of threads.
    pub num_threads: u64,
    /// Virtual memory size in bytes.
    pub vsize_bytes: u64,
    /// Resident set size in bytes.
    pub rss_bytes: u64,
    /// Bytes read via read-like syscalls, from `io`.
    pub rchar_bytes: u64,
    /// Bytes written via write-like syscalls, from `io`.
    pub wchar_bytes: u64,
    /// Bytes fetched from the storage layer, from `io`.
    pub read_bytes: u64,
    /// Bytes sent to the storage layer, from `io`.
    pub write_bytes: u64,
}

impl ProcessStats {
    /// Parses the single line of a `/proc/<pid>/stat` file.
    ///
    /// # Arguments
    ///
    /// * `buf` - Buffered reader over the `stat` content.
    /// * `origin` - Path the content was read from, used in error messages.
    /// * `ns_per_kernel_tick` - Nanoseconds per kernel tick, applied to utime and ktime.
    /// * `bytes_per_page` - Page size in bytes, applied to RSS.
    ///
    /// # Errors
    ///
    /// - [`Error::Empty`] if there is no line to read.
    /// - [`Error::TooFewFields`] if the line holds fewer than 52 fields.
    /// - [`Error::InvalidProcessName`] if the name field is not a non-empty parenthesized name.
    /// - [`Error::InvalidValue`] if any numeric field fails to parse.
    /// - [`Error::Overflow`] if a converted time or size does not fit in a `u64`.
    ///
    /// Nothing is returned unless every field parsed.
    pub fn from_stat_reader<R: BufRead>(
        buf: &mut R,
        origin: &Path,
        ns_per_kernel_tick: u64,
        bytes_per_page: u64,
    ) -> Result<Self> {
        let line = parser::read_first_line(buf, origin)?;
        let fields = split_stat_fields(&line);
        parser::ensure_min_fields(&fields, STAT_NUM_FIELDS, origin)?;

        let pid = fields[STAT_PID_FIELD]
            .parse::<u32>()
            .map_err(|source| Error::InvalidValue {
                path: origin.to_path_buf(),
                field: "pid",
                value: fields[STAT_PID_FIELD].to_string(),
                source,
            })?;

        let name_field = fields[STAT_PROCESS_NAME_FIELD];
        let process_name = strip_parentheses(name_field).ok_or_else(|| {
            Error::InvalidProcessName {
                path: origin.to_path_buf(),
                field: name_field.to_string(),
            }
        })?;

        let utime_ticks = parser::parse_field(&fields, STAT_UTIME_FIELD, "utime", origin)?;
        let ktime_ticks = parser::parse_field(&fields, STAT_KTIME_FIELD, "stime", origin)?;
        let rss_pages = parser::parse_field(&fields, STAT_RSS_FIELD, "rss", origin)?;

        Ok(Self {
            pid,
            process_name: process_name.to_string(),
            minor_faults: parser::parse_field(&fields, STAT_MINOR_FAULTS_FIELD, "minflt", origin)?,
            major_faults: parser::parse_field(&fields, STAT_MAJOR_FAULTS_FIELD, "majflt", origin)?,
            utime_ns: parser::scale(utime_ticks, ns_per_kernel_tick, "utime", origin)?,
            ktime_ns: parser::scale(ktime_ticks, ns_per_kernel_tick, "stime", origin)?,
            num_threads: parser::parse_field(
                &fields,
                STAT_NUM_THREADS_FIELD,
                "num_threads",
                origin,
            )?,
            vsize_bytes: parser::parse_field(&fields, STAT_VSIZE_FIELD, "vsize", origin)?,
            rss_bytes: parser::scale(rss_pages, bytes_per_page, "rss", origin)?,
            ..Self::default()
        })
    }

    fn set_rchar_bytes(&mut self, v: u64) {
        self.rchar_bytes = v;
    }

    fn set_wchar_bytes(&mut self, v: u64) {
        self.wchar_bytes = v;
    }

    fn set_read_bytes(&mut self, v: u64) {
        self.read_bytes = v;
    }

    fn set_write_bytes(&mut self, v: u64) {
        self.write_bytes = v;
    }
}

type Setter = fn(&mut ProcessStats, u64);

static IO_SETTERS: LazyLock<HashMap<&'static str, Setter>> = LazyLock::new(|| {
    let mut m: HashMap<&'static str, Setter> = HashMap::with_capacity(4);

    m.insert("rchar:", ProcessStats::set_rchar_bytes);
    m.insert("wchar:", ProcessStats::set_wchar_bytes);
    m.insert("read_bytes:", ProcessStats::set_read_bytes);
    m.insert("write_bytes:", ProcessStats::set_write_bytes);

    m
});

/// `/proc/<pid>/io` reports plain byte counts.
impl KeyValueStat for ProcessStats {
    const VALUE_MULTIPLIER: u64 = 1;

    fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)> {
        &IO_SETTERS
    }
}

/// Splits a `stat` line into fields, keeping a parenthesized name as one field.
///
/// Falls back to plain whitespace splitting when the line has no `(...)` pair,
/// which then fails the name check downstream.
fn split_stat_fields(line: &str) -> Vec<&str> {
    match (line.find('('), line.rfind(')')) {
        (Some(open), Some(close)) if open < close => {
            let mut fields = Vec::with_capacity(STAT_NUM_FIELDS);
            fields.extend(line[..open].split_whitespace());
            fields.push(&line[open..=close]);
            fields.extend(line[close + 1..].split_whitespace());
            fields
        }
        _ => line.split_whitespace().collect(),
    }
}

/// Returns the name inside `(name)`, or `None` for `()` or an unwrapped field.
fn strip_parentheses(field: &str) -> Option<&str> {
    if field.len() <= 2 {
        return None;
    }
    field.strip_prefix('(')?.strip_suffix(')')
}

/// Reads the start time field (in kernel ticks since boot) from `stat` content.
pub(super) fn start_time_ticks_from_reader<R: BufRead>(buf: &mut R, origin: &Path) -> Result<u64> {
    let line = parser::read_first_line(buf, origin)?;
    let fields = split_stat_fields(&line);
    parser::ensure_min_fields(&fields, STAT_NUM_FIELDS, origin)?;
    parser::parse_field(&fields, STAT_START_TIME_FIELD, "starttime", origin)
}

/// Returns the start time in kernel ticks of the process rooted at `proc_pid_path`
/// (e.g. `/proc/42`).
///
/// This is a best-effort accessor for liveness checks: any failure, including a
/// process that already exited, yields `0` instead of an error.
pub fn start_time_ticks(proc_pid_path: impl AsRef<Path>) -> u64 {
    let path = proc_pid_path.as_ref().join("stat");
    let ticks = fsutil::open_file_reader(&path)
        .map_err(Error::from)
        .and_then(|mut buf| start_time_ticks_from_reader(&mut buf, &path));
    match ticks {
        Ok(ticks) => ticks,
        Err(err) => {
            log::debug!("falling back to zero start time: {err}");
            0
        }
    }
}

/// Turns a raw `cmdline` blob into a space separated command line.
///
/// Newlines are dropped, a single trailing NUL is removed and every remaining
/// NUL becomes a space, since processes separate their arguments with either.
pub fn cmdline_from_bytes(raw: &[u8]) -> String {
    let mut cmdline: Vec<u8> = raw.iter().copied().filter(|&b| b != b'\n').collect();
    if cmdline.last() == Some(&0) {
        cmdline.pop();
    }
    for b in cmdline.iter_mut().filter(|b| **b == 0) {
        *b = b' ';
    }
    String::from_utf8_lossy(&cmdline).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::procfs::ErrorKind;

    const NS_PER_TICK: u64 = 10_000_000;
    const PAGE_SIZE: u64 = 4096;

    // Taken from a live system, trailing fields included.
    const STAT_LINE: &str = "4602 (ibazel) S 3260 4602 3260 34818 4602 1077936128 1799 174589 \
55 68 8 23 106 72 20 0 13 0 14329 114384896 2577 18446744073709551615 \
4194304 7917379 140730842479232 0 0 0 1006254592 0 2143420159 0 0 0 17 \
3 0 0 3 0 0 12193792 12432192 34951168 140730842488151 140730842488200 \
140730842488200 140730842492896 0\n";

    fn origin() -> &'static Path {
        Path::new("/proc/4602/stat")
    }

    fn parse(line: &str) -> Result<ProcessStats> {
        ProcessStats::from_stat_reader(&mut line.as_bytes(), origin(), NS_PER_TICK, PAGE_SIZE)
    }

    #[test]
    fn test_parse_complete_stat() {
        let stats = parse(STAT_LINE).unwrap();
        assert_eq!(stats.pid, 4602);
        assert_eq!(stats.process_name, "ibazel");
        assert_eq!(stats.minor_faults, 1799);
        assert_eq!(stats.major_faults, 55);
        assert_eq!(stats.utime_ns, 8 * NS_PER_TICK);
        assert_eq!(stats.ktime_ns, 23 * NS_PER_TICK);
        assert_eq!(stats.num_threads, 13);
        assert_eq!(stats.vsize_bytes, 114_384_896);
        assert_eq!(stats.rss_bytes, 2577 * PAGE_SIZE);
        assert_eq!(stats.rchar_bytes, 0);
    }

    #[test]
    fn test_process_name_with_spaces() {
        let line = STAT_LINE.replace("(ibazel)", "(foo bar)");
        let stats = parse(&line).unwrap();
        assert_eq!(stats.process_name, "foo bar");
        assert_eq!(stats.num_threads, 13);
        assert_eq!(stats.rss_bytes, 2577 * PAGE_SIZE);
    }

    #[test]
    fn test_process_name_with_parentheses() {
        let line = STAT_LINE.replace("(ibazel)", "(a) b)");
        let stats = parse(&line).unwrap();
        assert_eq!(stats.process_name, "a) b");
        assert_eq!(stats.utime_ns, 8 * NS_PER_TICK);
    }

    #[test]
    fn test_empty_process_name() {
        let line = STAT_LINE.replace("(ibazel)", "()");
        let err = parse(&line).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        match err {
            Error::InvalidProcessName { field, .. } => assert_eq!(field, "()"),
            _ => panic!("Expected InvalidProcessName error"),
        }
    }

    #[test]
    fn test_unwrapped_process_name() {
        let line = STAT_LINE.replace("(ibazel)", "ibazel");
        let err = parse(&line).unwrap_err();
        assert!(matches!(err, Error::InvalidProcessName { .. }));
    }

    #[test]
    fn test_too_few_fields() {
        let err = parse("4602 (ibazel) S 3260 4602\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        match err {
            Error::TooFewFields {
                expected, found, ..
            } => {
                assert_eq!(expected, STAT_NUM_FIELDS);
                assert_eq!(found, 5);
            }
            _ => panic!("Expected TooFewFields error"),
        }
    }

    #[test]
    fn test_invalid_number_fails_whole_record() {
        let line = STAT_LINE.replace(" 114384896 ", " 11438x896 ");
        let err = parse(&line).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        match err {
            Error::InvalidValue { field, value, .. } => {
                assert_eq!(field, "vsize");
                assert_eq!(value, "11438x896");
            }
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_converted_value_out_of_range() {
        let line = STAT_LINE.replace(" 2577 ", " 9223372036854775807 ");
        let err = parse(&line).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        match err {
            Error::Overflow { field, path } => {
                assert_eq!(field, "rss");
                assert_eq!(path, origin());
            }
            _ => panic!("Expected Overflow error"),
        }

        let line = STAT_LINE.replace(" 8 23 ", " 18446744073709551615 23 ");
        let err = parse(&line).unwrap_err();
        assert!(matches!(err, Error::Overflow { field: "utime", .. }));
    }

    #[test]
    fn test_empty_stat() {
        let err = parse("").unwrap_err();
        assert!(matches!(err, Error::Empty { .. }));
    }

    #[test]
    fn test_parse_io() {
        let data = "\
rchar: 5405203
wchar: 1239158
syscr: 10608
syscw: 3141
read_bytes: 17838080
write_bytes: 634880
cancelled_write_bytes: 192512
";
        let mut stats = ProcessStats::default();
        stats
            .read_key_values(&mut data.as_bytes(), Path::new("/proc/1/io"))
            .unwrap();
        assert_eq!(stats.rchar_bytes, 5_405_203);
        assert_eq!(stats.wchar_bytes, 1_239_158);
        assert_eq!(stats.read_bytes, 17_838_080);
        assert_eq!(stats.write_bytes, 634_880);
        assert_eq!(stats.utime_ns, 0);
    }

    #[test]
    fn test_start_time_ticks_from_reader() {
        let ticks = start_time_ticks_from_reader(&mut STAT_LINE.as_bytes(), origin()).unwrap();
        assert_eq!(ticks, 14329);
    }

    #[test]
    fn test_start_time_ticks_missing_process() {
        assert_eq!(start_time_ticks("/definitely/does/not/exist/42"), 0);
    }

    #[test]
    fn test_start_time_ticks_short_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("stat"), "4602 (ibazel) S 3260\n").unwrap();
        assert_eq!(start_time_ticks(dir.path()), 0);

        std::fs::write(dir.path().join("stat"), STAT_LINE).unwrap();
        assert_eq!(start_time_ticks(dir.path()), 14329);
    }

    #[test]
    fn test_cmdline_null_separated() {
        let raw = b"/usr/lib/at-spi2-core/at-spi2-registryd\0--use-gnome-session\0";
        assert_eq!(
            cmdline_from_bytes(raw),
            "/usr/lib/at-spi2-core/at-spi2-registryd --use-gnome-session"
        );
    }

    #[test]
    fn test_cmdline_space_separated() {
        let raw = b"nginx: worker process\0";
        assert_eq!(cmdline_from_bytes(raw), "nginx: worker process");
    }

    #[test]
    fn test_cmdline_only_one_trailing_null_is_stripped() {
        assert_eq!(cmdline_from_bytes(b"a\0b\0\0"), "a b ");
        assert_eq!(cmdline_from_bytes(b"a\nb\n"), "ab");
        assert_eq!(cmdline_from_bytes(b""), "");
    }
}
