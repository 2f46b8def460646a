//! Logging initialization

/// Initialize the logging system
///
/// Uses env_logger with `info` for this crate and `warn` for wgpu internals.
/// Override with RUST_LOG environment variable.
///
/// # Example
/// ```
/// skinrig::core::logging::init();
/// log::info!("Viewer started");
/// ```
pub fn init() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info,wgpu_core=warn,wgpu_hal=warn"),
    )
    .try_init();
}
