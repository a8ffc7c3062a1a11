use std::io::BufRead;
use std::path::Path;

use serde::Serialize;

use super::parser;
use super::{Error, Result};

/// Aggregated network counters across the tracked interfaces of a network
/// namespace, as reported in `/proc/<pid>/net/dev`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct NetworkStats {
    /// Bytes received.
    pub rx_bytes: u64,
    /// Packets received.
    pub rx_packets: u64,
    /// Receive errors.
    pub rx_errs: u64,
    /// Dropped packets while receiving.
    pub rx_drops: u64,

    /// Bytes transmitted.
    pub tx_bytes: u64,
    /// Packets transmitted.
    pub tx_packets: u64,
    /// Transmit errors.
    pub tx_errs: u64,
    /// Dropped packets while transmitting.
    pub tx_drops: u64,
}

impl NetworkStats {
    /// Adds two sets of counters, returning `None` if any sum overflows.
    pub fn checked_add(&self, rhs: &Self) -> Option<Self> {
        Some(Self {
            rx_bytes: self.rx_bytes.checked_add(rhs.rx_bytes)?,
            rx_packets: self.rx_packets.checked_add(rhs.rx_packets)?,
            rx_errs: self.rx_errs.checked_add(rhs.rx_errs)?,
            rx_drops: self.rx_drops.checked_add(rhs.rx_drops)?,
            tx_bytes: self.tx_bytes.checked_add(rhs.tx_bytes)?,
            tx_packets: self.tx_packets.checked_add(rhs.tx_packets)?,
            tx_errs: self.tx_errs.checked_add(rhs.tx_errs)?,
            tx_drops: self.tx_drops.checked_add(rhs.tx_drops)?,
        })
    }
}

/// Interfaces starting with one of these prefixes are virtual, bridge or
/// loopback devices and would double count workload traffic.
const IGNORED_INTERFACE_PREFIXES: [&str; 3] = ["v", "docker", "lo"];

const NET_DEV_HEADER_LINES: usize = 2;
/// Interface name plus 16 counters.
const NET_DEV_NUM_FIELDS: usize = 17;

const NET_DEV_RX_BYTES_FIELD: usize = 1;
const NET_DEV_RX_PACKETS_FIELD: usize = 2;
const NET_DEV_RX_ERRS_FIELD: usize = 3;
const NET_DEV_RX_DROP_FIELD: usize = 4;
const NET_DEV_TX_BYTES_FIELD: usize = 9;
const NET_DEV_TX_PACKETS_FIELD: usize = 10;
const NET_DEV_TX_ERRS_FIELD: usize = 11;
const NET_DEV_TX_DROP_FIELD: usize = 12;

/// Splits an interface line into the interface name followed by its counters.
///
/// The kernel pads the name but large receive counters can run straight into
/// the `:` separator (`eth0:123456789`), so the name is split off at the colon.
fn split_interface_line(line: &str) -> Vec<&str> {
    match line.split_once(':') {
        Some((iface, data)) => {
            let mut fields = Vec::with_capacity(NET_DEV_NUM_FIELDS);
            fields.push(iface.trim());
            fields.extend(data.split_whitespace());
            fields
        }
        None => line.split_whitespace().collect(),
    }
}

/// Returns `true` if the interface matches any prefix in `IGNORED_INTERFACE_PREFIXES`.
fn is_ignored_interface(iface: &str) -> bool {
    IGNORED_INTERFACE_PREFIXES
        .iter()
        .any(|prefix| iface.starts_with(prefix))
}

fn stats_from_fields(fields: &[&str], origin: &Path) -> Result<NetworkStats> {
    Ok(NetworkStats {
        rx_bytes: parser::parse_field(fields, NET_DEV_RX_BYTES_FIELD, "rx_bytes", origin)?,
        rx_packets: parser::parse_field(fields, NET_DEV_RX_PACKETS_FIELD, "rx_packets", origin)?,
        rx_errs: parser::parse_field(fields, NET_DEV_RX_ERRS_FIELD, "rx_errs", origin)?,
        rx_drops: parser::parse_field(fields, NET_DEV_RX_DROP_FIELD, "rx_drop", origin)?,
        tx_bytes: parser::parse_field(fields, NET_DEV_TX_BYTES_FIELD, "tx_bytes", origin)?,
        tx_packets: parser::parse_field(fields, NET_DEV_TX_PACKETS_FIELD, "tx_packets", origin)?,
        tx_errs: parser::parse_field(fields, NET_DEV_TX_ERRS_FIELD, "tx_errs", origin)?,
        tx_drops: parser::parse_field(fields, NET_DEV_TX_DROP_FIELD, "tx_drop", origin)?,
    })
}

impl NetworkStats {
    /// Parses and sums the tracked interfaces of a `net/dev` file.
    ///
    /// The first two lines are headers. Every following line must carry an
    /// interface name and at least 16 counters; interfaces in the ignore list
    /// are skipped before their counters are looked at.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TooFewFields`] for a short interface line,
    /// [`Error::InvalidValue`] for a malformed counter and [`Error::Overflow`]
    /// if a sum does not fit in a `u64`. No partial sum is returned.
    pub fn from_reader<R: BufRead>(buf: &mut R, origin: &Path) -> Result<Self> {
        let mut stat = NetworkStats::default();
        let mut line = String::new();

        for _ in 0..NET_DEV_HEADER_LINES {
            parser::read_line(buf, &mut line, origin)?;
            line.clear();
        }

        while parser::read_line(buf, &mut line, origin)? != 0 {
            let fields = split_interface_line(&line);
            parser::ensure_min_fields(&fields, NET_DEV_NUM_FIELDS, origin)?;

            let iface = fields[0];
            if is_ignored_interface(iface) {
                log::trace!("skipping interface {iface} in {}", origin.display());
            } else {
                let iface_stat = stats_from_fields(&fields, origin)?;
                stat = stat.checked_add(&iface_stat).ok_or_else(|| Error::Overflow {
                    path: origin.to_path_buf(),
                    field: "net/dev total",
                })?;
            }
            line.clear();
        }

        Ok(stat)
    }
}
