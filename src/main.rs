/// Entry point for the OCI lifecycle sensor.
///
/// Watches the container runtime's state directory and prints one JSON object per container
/// lifecycle transition to stdout.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the container directory cannot be
/// watched.
///
/// # Examples
///
/// ```bash
/// RUST_LOG=debug OCI_CONTAINER_DIR=/run/containerd/io.containerd.runtime.v2.task/moby cargo run
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    oci_lifecycle_sensor::run().await
}
