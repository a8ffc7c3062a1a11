use std::io::BufRead;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{Error, PodQosClass, Result};
use crate::config::{self, Config};
use crate::fsutil;
use crate::procfs::ProcParser;

/// Identity and lifecycle information of a process inside a container.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PidMetadata {
    pub pid: u32,
    /// Wall-clock start time in nanoseconds since the UNIX epoch.
    pub start_time_ns: u64,
    /// Command line with arguments separated by spaces.
    pub cmdline_args: String,
}

/// Resolves Kubernetes pods and containers to their cgroup directories and
/// reads the processes that belong to them.
///
/// Only the cgroup v1 `cpu,cpuacct` hierarchy laid out by kubelet is
/// understood. Per-process details come from the wrapped [`ProcParser`].
#[derive(Debug, Clone)]
pub struct CGroupMetadataReader {
    sysfs_path: PathBuf,
    proc_parser: ProcParser,
}

impl CGroupMetadataReader {
    /// Creates a reader.
    ///
    /// # Arguments
    ///
    /// * `sysfs_path` - Base of the sysfs mount that contains `cgroup/`, usually `/sys/fs`.
    /// * `proc_path` - Mount point of the matching process pseudo-filesystem.
    /// * `ns_per_kernel_tick` - `1e9 / ticks_per_second`.
    /// * `clock_realtime_offset_ns` - Wall clock time of boot, in ns since the epoch.
    pub fn new(
        sysfs_path: impl Into<PathBuf>,
        proc_path: impl Into<PathBuf>,
        ns_per_kernel_tick: u64,
        clock_realtime_offset_ns: u64,
    ) -> Self {
        Self {
            sysfs_path: sysfs_path.into(),
            proc_parser: ProcParser::with_params(
                proc_path,
                ns_per_kernel_tick,
                clock_realtime_offset_ns,
                config::DEFAULT_PAGE_SIZE,
            ),
        }
    }

    /// Creates a reader from a resolved [`Config`].
    pub fn from_config(config: &Config) -> Self {
        Self {
            sysfs_path: config.sysfs_path().to_path_buf(),
            proc_parser: ProcParser::new(config),
        }
    }

    /// Returns the parser used for per-process reads.
    ///
    /// A reader built with [`CGroupMetadataReader::new`] has no configured page
    /// size; its parser uses [`config::DEFAULT_PAGE_SIZE`]. Use
    /// [`CGroupMetadataReader::from_config`] when RSS values matter.
    pub fn proc_parser(&self) -> &ProcParser {
        &self.proc_parser
    }

    /// Builds the path of the `cgroup.procs` file of a container.
    ///
    /// ```
    /// # use std::path::PathBuf;
    /// # use podstat::cgroup::{CGroupMetadataReader, PodQosClass};
    /// assert_eq!(
    ///     CGroupMetadataReader::cgroup_proc_file_path("/sys/fs", PodQosClass::Burstable, "abcd", "c123"),
    ///     PathBuf::from("/sys/fs/cgroup/cpu,cpuacct/kubepods/burstable/podabcd/c123/cgroup.procs"),
    /// );
    /// ```
    pub fn cgroup_proc_file_path(
        sysfs_path: impl AsRef<Path>,
        qos_class: PodQosClass,
        pod_uid: &str,
        container_id: &str,
    ) -> PathBuf {
        let mut path = sysfs_path.as_ref().join("cgroup/cpu,cpuacct/kubepods");
        if let Some(segment) = qos_class.path_segment() {
            path.push(segment);
        }
        path.push(format!("pod{pod_uid}"));
        path.push(container_id);
        path.push("cgroup.procs");
        path
    }

    /// Lists the PIDs of a container in the order the kernel reports them.
    ///
    /// # Errors
    ///
    /// - [`Error::FileOpen`] if the container's `cgroup.procs` cannot be opened.
    /// - [`Error::ReadLine`] if reading the file fails.
    /// - [`Error::InvalidPid`] if a line is not a PID.
    pub fn read_pid_list(
        &self,
        qos_class: PodQosClass,
        pod_uid: &str,
        container_id: &str,
    ) -> Result<Vec<u32>> {
        let path =
            Self::cgroup_proc_file_path(&self.sysfs_path, qos_class, pod_uid, container_id);
        let mut buf = fsutil::open_file_reader(&path)?;
        pid_list_from_reader(&mut buf, &path)
    }

    /// Reads the start time and command line of `pid`.
    ///
    /// Both sources are best effort: a process that vanished reports a start
    /// time of boot and an empty command line rather than an error. A start
    /// time beyond the `u64` range saturates at `u64::MAX`.
    pub fn read_pid_metadata(&self, pid: u32) -> Result<PidMetadata> {
        let start_time_ticks = self.proc_parser.start_time_ticks(pid);
        let start_time_ns = start_time_ticks
            .saturating_mul(self.proc_parser.ns_per_kernel_tick())
            .saturating_add(self.proc_parser.clock_realtime_offset_ns());

        Ok(PidMetadata {
            pid,
            start_time_ns,
            cmdline_args: self.proc_parser.cmdline(pid),
        })
    }
}

/// Parses a `cgroup.procs` buffer, one PID per line, preserving file order.
///
/// Blank lines are skipped.
pub fn pid_list_from_reader<R: BufRead>(buf: &mut R, origin: &Path) -> Result<Vec<u32>> {
    let mut pids = Vec::new();
    let mut line = String::new();
    let mut lineno = 0;

    while buf.read_line(&mut line).map_err(|source| Error::ReadLine {
        path: origin.to_path_buf(),
        source,
    })? != 0
    {
        lineno += 1;
        let value = line.trim();
        if !value.is_empty() {
            let pid = value.parse::<u32>().map_err(|source| Error::InvalidPid {
                path: origin.to_path_buf(),
                line: lineno,
                value: value.to_string(),
                source,
            })?;
            pids.push(pid);
        }
        line.clear();
    }

    Ok(pids)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    /// Stat line of pid 32391 with a start time of 80019809 ticks.
    const STAT_32391: &str = "32391 (slack) S 1 32391 32391 0 -1 1077936128 48719 0 0 0 \
2541 774 0 0 20 0 33 0 80019809 1005617152 41152 18446744073709551615 \
1 1 0 0 0 0 0 4096 1098993405 0 0 0 17 2 0 0 0 0 0 0 0 0 0 0 0 0 0\n";

    const STAT_79690: &str = "79690 (at-spi2-registr) S 1 79690 79690 0 -1 4194560 289 0 0 0 \
0 0 0 0 20 0 3 0 2000 164429824 1721 18446744073709551615 \
1 1 0 0 0 0 0 0 0 0 0 0 17 6 0 0 0 0 0 0 0 0 0 0 0 0 0\n";

    struct Fixture {
        _dir: tempfile::TempDir,
        reader: CGroupMetadataReader,
    }

    /// Lays out a sysfs tree with one best effort container and a proc tree
    /// with two processes.
    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let sysfs = dir.path().join("sysfs1");
        let proc = dir.path().join("proc1");

        let container = sysfs.join("cgroup/cpu,cpuacct/kubepods/besteffort/podabcd/c123");
        fs::create_dir_all(&container).unwrap();
        fs::write(container.join("cgroup.procs"), "123\n456\n789\n").unwrap();

        fs::create_dir_all(proc.join("32391")).unwrap();
        fs::write(proc.join("32391/stat"), STAT_32391).unwrap();
        fs::write(
            proc.join("32391/cmdline"),
            "/usr/lib/slack/slack --force-device-scale-factor=1.5 --high-dpi-support=1\0",
        )
        .unwrap();

        fs::create_dir_all(proc.join("79690")).unwrap();
        fs::write(proc.join("79690/stat"), STAT_79690).unwrap();
        fs::write(
            proc.join("79690/cmdline"),
            b"/usr/lib/at-spi2-core/at-spi2-registryd\0--use-gnome-session\0",
        )
        .unwrap();

        let reader = CGroupMetadataReader::new(&sysfs, &proc, 100, 128);
        Fixture { _dir: dir, reader }
    }

    #[test]
    fn test_read_pid_list() {
        let fixture = fixture();
        let pids = fixture
            .reader
            .read_pid_list(PodQosClass::BestEffort, "abcd", "c123")
            .unwrap();
        assert_eq!(pids, vec![123, 456, 789]);
    }

    #[test]
    fn test_read_pid_list_missing_container() {
        let fixture = fixture();
        let err = fixture
            .reader
            .read_pid_list(PodQosClass::Guaranteed, "abcd", "c123")
            .unwrap_err();
        match err {
            Error::FileOpen(err) => assert!(
                err.path
                    .ends_with("cgroup/cpu,cpuacct/kubepods/podabcd/c123/cgroup.procs")
            ),
            _ => panic!("Expected FileOpen error"),
        }
    }

    #[test]
    fn test_pid_list_keeps_file_order() {
        let data = "789\n\n123\n456\n";
        let pids = pid_list_from_reader(&mut data.as_bytes(), Path::new("cgroup.procs")).unwrap();
        assert_eq!(pids, vec![789, 123, 456]);
    }

    #[test]
    fn test_pid_list_invalid_line() {
        let data = "123\nabc\n";
        let err =
            pid_list_from_reader(&mut data.as_bytes(), Path::new("cgroup.procs")).unwrap_err();
        match err {
            Error::InvalidPid { line, value, .. } => {
                assert_eq!(line, 2);
                assert_eq!(value, "abc");
            }
            _ => panic!("Expected InvalidPid error"),
        }
    }

    #[test]
    fn test_read_pid_metadata() {
        let fixture = fixture();
        let md = fixture.reader.read_pid_metadata(32391).unwrap();
        assert_eq!(md.pid, 32391);
        // Start time from the file * 100 + 128.
        assert_eq!(md.start_time_ns, 8_001_981_028);
        assert_eq!(
            md.cmdline_args,
            "/usr/lib/slack/slack --force-device-scale-factor=1.5 --high-dpi-support=1"
        );
    }

    #[test]
    fn test_read_pid_metadata_null_separated() {
        let fixture = fixture();
        let md = fixture.reader.read_pid_metadata(79690).unwrap();
        assert_eq!(md.start_time_ns, 2000 * 100 + 128);
        assert_eq!(
            md.cmdline_args,
            "/usr/lib/at-spi2-core/at-spi2-registryd --use-gnome-session"
        );
    }

    #[test]
    fn test_read_pid_metadata_exited_process() {
        let fixture = fixture();
        let md = fixture.reader.read_pid_metadata(1).unwrap();
        assert_eq!(
            md,
            PidMetadata {
                pid: 1,
                start_time_ns: 128,
                cmdline_args: String::new(),
            }
        );
    }

    #[test]
    fn test_read_pid_metadata_saturates() {
        let fixture = fixture();
        let proc = fixture.reader.proc_parser().proc_base_path().to_path_buf();
        fs::create_dir_all(proc.join("555")).unwrap();
        fs::write(
            proc.join("555/stat"),
            STAT_79690
                .replacen("79690", "555", 1)
                .replace(" 2000 ", " 18446744073709551615 "),
        )
        .unwrap();

        let md = fixture.reader.read_pid_metadata(555).unwrap();
        assert_eq!(md.start_time_ns, u64::MAX);
        assert_eq!(md.cmdline_args, "");
    }

    #[test]
    fn test_cgroup_proc_file_path() {
        assert_eq!(
            CGroupMetadataReader::cgroup_proc_file_path(
                "/pl/sys",
                PodQosClass::Burstable,
                "abcd",
                "c123"
            ),
            PathBuf::from("/pl/sys/cgroup/cpu,cpuacct/kubepods/burstable/podabcd/c123/cgroup.procs")
        );
        assert_eq!(
            CGroupMetadataReader::cgroup_proc_file_path(
                "/pl/sys",
                PodQosClass::BestEffort,
                "abcd",
                "c123"
            ),
            PathBuf::from(
                "/pl/sys/cgroup/cpu,cpuacct/kubepods/besteffort/podabcd/c123/cgroup.procs"
            )
        );
        assert_eq!(
            CGroupMetadataReader::cgroup_proc_file_path(
                "/pl/sys",
                PodQosClass::Guaranteed,
                "abcd",
                "c123"
            ),
            PathBuf::from("/pl/sys/cgroup/cpu,cpuacct/kubepods/podabcd/c123/cgroup.procs")
        );
    }

    #[test]
    fn test_from_config() {
        let config = Config::new("/host/proc", "/host/sys/fs", 100, 4096, 7).unwrap();
        let reader = CGroupMetadataReader::from_config(&config);
        assert_eq!(reader.proc_parser().proc_base_path(), Path::new("/host/proc"));
        assert_eq!(reader.proc_parser().clock_realtime_offset_ns(), 7);
        assert_eq!(reader.proc_parser().ns_per_kernel_tick(), 10_000_000);
    }
}
