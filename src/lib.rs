//! podstat: typed access to process, system and container statistics exposed
//! by the Linux `/proc` and cgroup pseudo-filesystems.
//!
//! The readers are synchronous and stateless. Every call opens, reads and
//! closes its own files, so a single reader can be shared between threads.

use std::io::Write;

use cgroup::{CGroupMetadataReader, PodQosClass};
use config::Config;
use error::ResultOkLogExt;
use procfs::ProcParser;

pub mod cgroup;
pub mod config;
pub mod error;
pub mod fsutil;
pub mod procfs;

pub const POD_QOS_VAR: &str = "PODSTAT_POD_QOS";
pub const POD_UID_VAR: &str = "PODSTAT_POD_UID";
pub const CONTAINER_ID_VAR: &str = "PODSTAT_CONTAINER_ID";

/// Container selected through the environment for PID listing.
struct ContainerSelector {
    qos_class: PodQosClass,
    pod_uid: String,
    container_id: String,
}

/// Reads the container selector from the environment.
///
/// All three variables must be set; otherwise no container is selected.
fn container_from_env() -> cgroup::Result<Option<ContainerSelector>> {
    let (Ok(qos), Ok(pod_uid), Ok(container_id)) = (
        std::env::var(POD_QOS_VAR),
        std::env::var(POD_UID_VAR),
        std::env::var(CONTAINER_ID_VAR),
    ) else {
        return Ok(None);
    };

    Ok(Some(ContainerSelector {
        qos_class: qos.parse()?,
        pod_uid,
        container_id,
    }))
}

/// Runs a single snapshot.
///
/// Resolves the [`Config`] from the environment and writes JSON lines to
/// stdout. PIDs are taken from the command line arguments; a PID that cannot be
/// read (typically because the process exited) is logged and skipped.
///
/// # Errors
///
/// Possible errors include:
/// - Invalid `PODSTAT_*` configuration variables.
/// - An unreadable system snapshot (`<proc>/stat`, `<proc>/meminfo`).
/// - An unknown `PODSTAT_POD_QOS` or unreadable `cgroup.procs` of the selected container.
/// - Failure to write to stdout.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    log::debug!("Configuration: {config:?}");

    let parser = ProcParser::new(&config);
    let reader = CGroupMetadataReader::from_config(&config);
    let mut out = std::io::stdout().lock();

    let system = parser.read_system_stats()?;
    writeln!(out, "{}", serde_json::json!({ "system": system }))?;

    for arg in std::env::args().skip(1) {
        let Ok(pid) = arg.parse::<u32>() else {
            log::warn!("Skipping invalid pid `{arg}`");
            continue;
        };
        let Some(process) = parser.read_process_stats(pid).ok_log() else {
            continue;
        };
        let record = serde_json::json!({
            "pid": pid,
            "process": process,
            "network": parser.parse_network_stats(pid).ok_log(),
            "uids": parser.read_uids(pid).ok_log(),
            "namespace_pids": parser.read_namespace_pids(pid).ok_log(),
            "metadata": reader.read_pid_metadata(pid).ok_log(),
        });
        writeln!(out, "{record}")?;
    }

    if let Some(container) = container_from_env()? {
        let pids = reader.read_pid_list(
            container.qos_class,
            &container.pod_uid,
            &container.container_id,
        )?;
        log::trace!(
            "Found {} pids in container {}",
            pids.len(),
            container.container_id
        );
        let record = serde_json::json!({
            "qos_class": container.qos_class,
            "pod_uid": container.pod_uid,
            "container_id": container.container_id,
            "pids": pids,
        });
        writeln!(out, "{record}")?;
    }

    Ok(())
}
