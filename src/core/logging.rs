//! Logging initialization

/// Initialize the logging system
///
/// Uses env_logger with default filter level of `info`.
/// Override with RUST_LOG environment variable.
///
/// # Example
/// ```
/// chunkworld::core::logging::init();
/// log::info!("World opened");
/// ```
pub fn init() {
    // A second init (e.g. from tests) is harmless
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).try_init();
}
