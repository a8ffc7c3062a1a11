/// Entry point of the `podstat` snapshot tool.
///
/// Prints one JSON document per line on stdout: the system snapshot, one
/// record per PID given as argument and, when a container is configured, its
/// PID list.
///
/// # Examples
///
/// ```bash
/// RUST_LOG=debug PODSTAT_PROC_PATH=/rootfs/proc cargo run -- 1 4602
/// ```
fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    podstat::run()
}
