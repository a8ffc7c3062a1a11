//! Mapping of Kubernetes pods and containers onto the cgroup filesystem.
//!
//! kubelet places every container below
//! `<sysfs>/cgroup/cpu,cpuacct/kubepods`, with an extra directory for the
//! `burstable` and `besteffort` [`PodQosClass`]es. [`CGroupMetadataReader`]
//! resolves that path, lists the PIDs from the container's `cgroup.procs` and
//! combines them with per-process data from `/proc`.
//!
//! # Platform Requirements
//!
//! - Linux with the cgroup v1 `cpu,cpuacct` controller mounted.
//! - Read access to the sysfs cgroup tree and to `/proc/<pid>`.
mod error;
mod qos;
mod reader;

pub use error::{Error, Result};
pub use qos::PodQosClass;
pub use reader::{CGroupMetadataReader, PidMetadata, pid_list_from_reader};
